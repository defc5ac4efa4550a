//! Constants for board geometry, tile spawning, and search parameters.
//!
//! Everything tunable about the engine lives here so the search and driver
//! code never carries bare magic numbers.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board size (NxN). The engine accepts any N >= 1 at runtime.
pub const DEFAULT_SIZE: usize = 4;

/// Number of tiles placed on an empty board when a game starts.
pub const INITIAL_TILES: usize = 2;

/// Largest tile a `u32` cell can hold. Two of them never merge.
pub const MAX_TILE: u32 = 1 << 31;

// =============================================================================
// Tile Spawning
// =============================================================================

/// Probability that a spawned tile is a 2 (otherwise it is a 4).
pub const SPAWN_PROB_TWO: f64 = 0.9;

/// Probability that a spawned tile is a 4.
pub const SPAWN_PROB_FOUR: f64 = 0.1;

/// Values a spawn ply branches over, in enumeration order.
pub const SPAWN_VALUES: [u32; 2] = [2, 4];

// =============================================================================
// Search Parameters
// =============================================================================

/// Default search depth used by the driver.
pub const DEFAULT_DEPTH: u32 = 5;

/// Hard cap on accepted search depth. Deeper requests are clamped.
pub const MAX_SEARCH_DEPTH: u32 = 10;

/// Upper end of the epsilon schedule for exploring expectimax.
pub const EPSILON_MAX: f64 = 0.3;

/// Depth-scaled reduction of the epsilon schedule.
///
/// `epsilon = EPSILON_MAX - EPSILON_MIN * (depth / 10)`.
pub const EPSILON_MIN: f64 = 0.2;

/// Depth at which the pruned expectimax short-circuits on open boards.
pub const PRUNE_DEPTH: u32 = 5;

/// The pruned expectimax short-circuits when more than this many cells are empty.
pub const PRUNE_EMPTY_THRESHOLD: usize = 6;

/// Score reported by the pruned expectimax short-circuit.
///
/// Not on the same scale as `evaluate`.
pub const PRUNE_SENTINEL_SCORE: f64 = -1.0;

// =============================================================================
// Depth Selection (deepening near the end game)
// =============================================================================

/// Depth used once the board is crowded and the max tile is large.
pub const DEEP_DEPTH: u32 = 7;

/// Minimum max tile for deepening to kick in.
pub const DEEP_MIN_MAX_TILE: u32 = 1024;

/// Deepening requires strictly fewer empty cells than this.
pub const DEEP_MAX_EMPTY: usize = 4;

// =============================================================================
// Self-Play Driver
// =============================================================================

/// Default cap on moves per self-play game.
pub const MAX_GAME_MOVES: u64 = 100_000;

/// Tile values that contribute to the end-of-game tile score.
pub const SCORED_TILES: [u32; 12] = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096];
