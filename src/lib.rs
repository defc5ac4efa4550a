//! Tile-Search: a headless 2048 engine with bounded-depth game-tree search.
//!
//! The crate provides the board transitions of the sliding-tile game and
//! four search procedures that pick a move for a given board and depth,
//! reporting the backed-up score and the number of nodes expanded.
//!
//! ## Modules
//!
//! - [`constants`] - Spawn probabilities, search parameters, depth policy
//! - [`board`] - Board representation, moves, spawning, terminal detection
//! - [`eval`] - Static heuristic used at search leaves
//! - [`search`] - Minimax, expectimax, epsilon-exploring and pruned expectimax
//! - [`game`] - Self-play driver and end-of-game statistics
//!
//! ## Example
//!
//! ```
//! use fastrand::Rng;
//! use tile_search::board::{Board, apply_move};
//! use tile_search::search::{Algorithm, choose_move};
//!
//! let board: Board = "2 2 4 4/0 0 0 0/0 0 0 0/0 0 0 0".parse().unwrap();
//! let mut rng = Rng::with_seed(42);
//!
//! let outcome = choose_move(&board, 3, Algorithm::Expectimax, &mut rng);
//! let mv = outcome.best_move.expect("board is not terminal");
//! println!("{mv} after {} nodes", outcome.nodes_expanded);
//! let next = apply_move(&board, mv);
//! assert_ne!(next, board);
//! ```

pub mod board;
pub mod constants;
pub mod eval;
pub mod game;
pub mod search;

pub use board::{Board, Move, apply_move, is_terminal, spawn_tile};
pub use eval::evaluate;
pub use search::{Algorithm, SearchConfig, SearchOutcome, choose_move};
