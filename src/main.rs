//! Tile-Search: a headless 2048 player.
//!
//! ## Usage
//!
//! - `tile-search` - Show a demo
//! - `tile-search play` - Run self-play games and print statistics
//! - `tile-search suggest <board>` - Print the move chosen for a board
//! - `tile-search demo` - Run the demo

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use tile_search::board::Board;
use tile_search::constants::{DEFAULT_DEPTH, DEFAULT_SIZE, MAX_GAME_MOVES};
use tile_search::game::{Game, GameStats, Summary};
use tile_search::search::{Algorithm, SearchConfig, choose_move_seeded};

/// Tile-Search: bounded-depth search for the game 2048
#[derive(Parser)]
#[command(name = "tile-search")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play headless games and report statistics
    Play {
        /// Search procedure
        #[arg(short, long, value_enum, default_value = "expectimax")]
        algorithm: AlgorithmArg,

        /// Search depth (expectibetter may deepen on crowded boards)
        #[arg(short, long, default_value_t = DEFAULT_DEPTH)]
        depth: u32,

        /// Disable end-game deepening
        #[arg(long)]
        no_deepening: bool,

        /// Board size
        #[arg(long, default_value_t = DEFAULT_SIZE)]
        size: usize,

        /// Number of games
        #[arg(short, long, default_value_t = 1)]
        games: u32,

        /// Random seed of the first game; later games use seed + i
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Maximum moves per game
        #[arg(short, long, default_value_t = MAX_GAME_MOVES)]
        max_moves: u64,

        /// Print the board after each move
        #[arg(long)]
        verbose: bool,
    },
    /// Print the move chosen for a board such as "2 2 4 4/0 0 0 0/0 0 0 0/0 0 0 0"
    Suggest {
        /// Board rows separated by '/', cells by spaces or commas
        board: String,

        #[arg(short, long, value_enum, default_value = "expectimax")]
        algorithm: AlgorithmArg,

        #[arg(short, long, default_value_t = DEFAULT_DEPTH)]
        depth: u32,

        /// Seed for the randomised variants
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Run a short demo game
    Demo,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Adversarial tile spawns
    Minimax,
    /// Probability-weighted tile spawns
    Expectimax,
    /// Expectimax with random move overrides
    ExpectimaxEpsilon,
    /// Expectimax with a depth-5 short-circuit on open boards
    Expectibetter,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Minimax => Algorithm::Minimax,
            AlgorithmArg::Expectimax => Algorithm::Expectimax,
            AlgorithmArg::ExpectimaxEpsilon => Algorithm::ExpectimaxEpsilon,
            AlgorithmArg::Expectibetter => Algorithm::ExpectiBetter,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Play {
            algorithm,
            depth,
            no_deepening,
            size,
            games,
            seed,
            max_moves,
            verbose,
        }) => {
            if size == 0 {
                bail!("board size must be positive");
            }
            let mut config = SearchConfig::for_algorithm(algorithm.into()).with_depth(depth);
            if no_deepening {
                config = config.with_deepening(None);
            }
            run_games(config, size, games, seed, max_moves, verbose);
        }
        Some(Commands::Suggest {
            board,
            algorithm,
            depth,
            seed,
        }) => {
            let board: Board = board
                .parse()
                .with_context(|| format!("invalid board {board:?}"))?;
            suggest(&board, algorithm.into(), depth, seed);
        }
        Some(Commands::Demo) | None => run_demo(),
    }

    Ok(())
}

fn run_games(
    config: SearchConfig,
    size: usize,
    games: u32,
    seed: u64,
    max_moves: u64,
    verbose: bool,
) {
    let mut all = Vec::with_capacity(games as usize);
    for i in 0..games {
        let mut game = Game::new(size, config, seed.wrapping_add(i as u64));
        let stats = if verbose {
            play_verbose(&mut game, max_moves)
        } else {
            game.run(max_moves)
        };
        println!("game {}: {stats}", i + 1);
        all.push(stats);
    }
    if all.len() > 1 {
        println!("{}", Summary::from_games(&all));
    }
}

fn play_verbose(game: &mut Game, max_moves: u64) -> GameStats {
    println!("{}", game.board());
    while game.moves_made() < max_moves {
        let Some(outcome) = game.step() else { break };
        match outcome.best_move {
            Some(mv) => println!(
                "move {}: {mv} (score {:.2}, nodes {})",
                game.moves_made(),
                outcome.score,
                outcome.nodes_expanded
            ),
            None => println!("no move available"),
        }
        println!("{}", game.board());
    }
    game.stats()
}

fn suggest(board: &Board, algorithm: Algorithm, depth: u32, seed: Option<u64>) {
    let outcome = choose_move_seeded(board, depth, algorithm, seed);
    match outcome.best_move {
        Some(mv) => println!("{mv}"),
        None => println!("none"),
    }
    println!("score: {:.4}", outcome.score);
    println!("nodes expanded: {}", outcome.nodes_expanded);
}

fn run_demo() {
    println!("Tile-Search: 2048 game-tree search\n");

    let config = SearchConfig::for_algorithm(Algorithm::Expectimax).with_depth(3);
    let mut game = Game::new(DEFAULT_SIZE, config, 2048);
    println!("Initial board:\n{}", game.board());

    println!("Playing 50 moves with expectimax at depth 3...");
    let stats = game.run(50);
    println!("{}", game.board());
    println!("{stats}");
}
