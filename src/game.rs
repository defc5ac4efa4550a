//! Headless self-play driver and end-of-game statistics.
//!
//! A [`Game`] owns the board, a seeded random source and a [`SearchConfig`].
//! Each [`Game::step`] searches, applies the chosen move, spawns a tile and
//! checks for game over. [`GameStats`] is the diagnostics record a
//! statistics collector consumes; nothing here writes to files or stdout.

use std::fmt;

use fastrand::Rng;
use log::info;

use crate::board::{Board, apply_move, is_terminal, new_board, place_random_tile};
use crate::constants::SCORED_TILES;
use crate::search::{Algorithm, SearchConfig, SearchOutcome};

// =============================================================================
// Statistics
// =============================================================================

/// Sum of the tiles whose value is in [`SCORED_TILES`].
pub fn tile_score(board: &Board) -> u64 {
    board
        .tiles()
        .iter()
        .filter(|&&v| SCORED_TILES.contains(&v))
        .map(|&v| v as u64)
        .sum()
}

/// Summary of one finished (or capped) game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStats {
    pub algorithm: Algorithm,
    pub moves: u64,
    pub score: u64,
    pub nodes_expanded: u64,
    pub max_tile: u32,
    /// 2048 tiles, with each 4096 counted twice
    pub tiles_2048: usize,
    pub tiles_1024: usize,
    pub tiles_512: usize,
    pub tiles_128: usize,
    pub tiles_64: usize,
}

impl GameStats {
    pub fn collect(board: &Board, algorithm: Algorithm, moves: u64, nodes_expanded: u64) -> Self {
        Self {
            algorithm,
            moves,
            score: tile_score(board),
            nodes_expanded,
            max_tile: board.max_tile(),
            tiles_2048: board.count_tiles(2048) + board.count_tiles(4096) * 2,
            tiles_1024: board.count_tiles(1024),
            tiles_512: board.count_tiles(512),
            tiles_128: board.count_tiles(128),
            tiles_64: board.count_tiles(64),
        }
    }
}

impl fmt::Display for GameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} moves={} score={} nodes={} max={} [2048:{} 1024:{} 512:{} 128:{} 64:{}]",
            self.algorithm,
            self.moves,
            self.score,
            self.nodes_expanded,
            self.max_tile,
            self.tiles_2048,
            self.tiles_1024,
            self.tiles_512,
            self.tiles_128,
            self.tiles_64
        )
    }
}

/// Aggregate over several games.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub games: usize,
    pub mean_score: f64,
    pub mean_moves: f64,
    pub total_nodes: u64,
    pub best_tile: u32,
}

impl Summary {
    pub fn from_games(games: &[GameStats]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let n = games.len() as f64;
        Self {
            games: games.len(),
            mean_score: games.iter().map(|g| g.score as f64).sum::<f64>() / n,
            mean_moves: games.iter().map(|g| g.moves as f64).sum::<f64>() / n,
            total_nodes: games.iter().map(|g| g.nodes_expanded).sum(),
            best_tile: games.iter().map(|g| g.max_tile).max().unwrap_or(0),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "games={} mean_score={:.1} mean_moves={:.1} nodes={} best_tile={}",
            self.games, self.mean_score, self.mean_moves, self.total_nodes, self.best_tile
        )
    }
}

// =============================================================================
// Game
// =============================================================================

/// A self-playing game.
pub struct Game {
    board: Board,
    rng: Rng,
    config: SearchConfig,
    moves_made: u64,
    nodes_expanded: u64,
    over: bool,
}

impl Game {
    /// Start a game on a fresh `size` x `size` board with two spawned tiles.
    pub fn new(size: usize, config: SearchConfig, seed: u64) -> Self {
        let mut rng = Rng::with_seed(seed);
        let board = new_board(size, &mut rng);
        Self::with_rng(board, config, rng)
    }

    /// Continue from an existing board.
    pub fn from_board(board: Board, config: SearchConfig, seed: u64) -> Self {
        Self::with_rng(board, config, Rng::with_seed(seed))
    }

    fn with_rng(board: Board, config: SearchConfig, rng: Rng) -> Self {
        let over = is_terminal(&board);
        Self {
            board,
            rng,
            config,
            moves_made: 0,
            nodes_expanded: 0,
            over,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn moves_made(&self) -> u64 {
        self.moves_made
    }

    /// Nodes expanded over every search so far.
    pub fn nodes_expanded(&self) -> u64 {
        self.nodes_expanded
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Search, apply the chosen move, spawn a tile.
    ///
    /// The move is applied even if it leaves the board unchanged (epsilon
    /// exploration and the pruned short-circuit can pick such a move); a
    /// tile is still spawned. The game ends when the search yields no move
    /// or the board becomes terminal. Returns `None` once the game is over.
    pub fn step(&mut self) -> Option<SearchOutcome> {
        if self.over {
            return None;
        }
        let outcome = self.config.choose_move(&self.board, &mut self.rng);
        self.nodes_expanded += outcome.nodes_expanded;

        match outcome.best_move {
            Some(mv) => {
                self.moves_made += 1;
                self.board = apply_move(&self.board, mv);
                place_random_tile(&mut self.board, &mut self.rng);
                self.over = is_terminal(&self.board);
            }
            None => self.over = true,
        }
        Some(outcome)
    }

    /// Play until game over or `max_moves` moves.
    pub fn run(&mut self, max_moves: u64) -> GameStats {
        while self.moves_made < max_moves && self.step().is_some() {}
        let stats = self.stats();
        info!("game finished: {stats}");
        stats
    }

    pub fn stats(&self) -> GameStats {
        GameStats::collect(
            &self.board,
            self.config.algorithm,
            self.moves_made,
            self.nodes_expanded,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(algorithm: Algorithm) -> SearchConfig {
        SearchConfig::for_algorithm(algorithm).with_depth(2)
    }

    #[test]
    fn test_new_game_has_two_tiles() {
        let game = Game::new(4, config(Algorithm::Expectimax), 42);
        assert_eq!(game.board().empty_cell_count(), 14);
        assert_eq!(game.moves_made(), 0);
        assert!(!game.is_over());
    }

    #[test]
    fn test_game_determinism() {
        for alg in Algorithm::ALL {
            let mut a = Game::new(4, config(alg), 7);
            let mut b = Game::new(4, config(alg), 7);
            let sa = a.run(30);
            let sb = b.run(30);
            assert_eq!(sa, sb, "{alg}");
            assert_eq!(a.board(), b.board(), "{alg}");
        }
    }

    #[test]
    fn test_run_respects_move_cap() {
        let mut game = Game::new(4, config(Algorithm::Expectimax), 1);
        let stats = game.run(10);
        assert_eq!(stats.moves, 10);
        assert!(stats.nodes_expanded > 0);
        assert_eq!(stats.nodes_expanded, game.nodes_expanded());
    }

    #[test]
    fn test_step_accumulates_nodes() {
        let mut game = Game::new(4, config(Algorithm::Minimax), 3);
        let first = game.step().unwrap();
        let second = game.step().unwrap();
        assert_eq!(game.nodes_expanded(), first.nodes_expanded + second.nodes_expanded);
        assert_eq!(game.moves_made(), 2);
    }

    #[test]
    fn test_terminal_board_is_over() {
        let board =
            Board::from_rows(&[[2u32, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        let mut game = Game::from_board(board, config(Algorithm::Expectimax), 0);
        assert!(game.is_over());
        assert_eq!(game.step(), None);
        assert_eq!(game.run(100).moves, 0);
    }

    #[test]
    fn test_game_plays_to_the_end() {
        let config = SearchConfig::for_algorithm(Algorithm::Expectimax).with_depth(1);
        let mut game = Game::new(3, config, 11);
        let stats = game.run(10_000);
        assert!(game.is_over());
        assert!(is_terminal(game.board()));
        assert!(stats.moves > 0);
    }

    #[test]
    fn test_tile_score_and_counts() {
        let board = Board::from_rows(&[
            [2048u32, 4096, 8192, 0],
            [1024, 512, 128, 64],
            [64, 2, 4, 0],
            [0, 0, 0, 0],
        ])
        .unwrap();
        // 8192 is not a scored tile.
        assert_eq!(tile_score(&board), 2048 + 4096 + 1024 + 512 + 128 + 64 + 64 + 2 + 4);

        let stats = GameStats::collect(&board, Algorithm::ExpectiBetter, 12, 345);
        assert_eq!(stats.tiles_2048, 3);
        assert_eq!(stats.tiles_1024, 1);
        assert_eq!(stats.tiles_512, 1);
        assert_eq!(stats.tiles_128, 1);
        assert_eq!(stats.tiles_64, 2);
        assert_eq!(stats.max_tile, 8192);
        assert!(stats.to_string().starts_with("expectibetter moves=12"));
    }

    #[test]
    fn test_summary() {
        let board = Board::from_rows(&[[2u32, 0], [0, 4]]).unwrap();
        let a = GameStats::collect(&board, Algorithm::Minimax, 10, 100);
        let b = GameStats::collect(&board, Algorithm::Minimax, 20, 50);
        let summary = Summary::from_games(&[a, b]);
        assert_eq!(summary.games, 2);
        assert_eq!(summary.mean_moves, 15.0);
        assert_eq!(summary.mean_score, 6.0);
        assert_eq!(summary.total_nodes, 150);
        assert_eq!(summary.best_tile, 4);
        assert_eq!(Summary::from_games(&[]), Summary::default());
    }
}
