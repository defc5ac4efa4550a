//! Bounded-depth game-tree search over 2048 boards.
//!
//! Every variant alternates a *player* ply, which tries the four moves in
//! the fixed order left, right, up, down and keeps the best, with a *spawn*
//! ply that models the random tile insertion:
//!
//! - [`minimax`] - the spawn ply is adversarial and keeps the minimum
//! - [`expectimax`] - the spawn ply averages over every (cell, value) pair
//! - [`expectimax_epsilon`] - expectimax whose player ply may override its
//!   chosen move with a uniformly random one
//! - [`expecti_better`] - expectimax that gives up at a fixed depth on open
//!   boards and counts nodes per explored branch
//!
//! A node counter is threaded through the recursion by value in
//! [`SearchContext`] and handed back in [`SearchOutcome`].
//!
//! ## Score arithmetic
//!
//! The expectimax spawn ply weights each branch by 0.9 (tile 2) or 0.1
//! (tile 4), sums over all cells, and divides by `2 * empty_cells`. That is
//! half the textbook expectation. Absolute scores are therefore not
//! comparable with a standard expectimax; move ranking within one search is
//! unaffected because every spawn ply is scaled the same way.

use std::fmt;
use std::str::FromStr;

use fastrand::Rng;
use log::{debug, warn};

use crate::board::{Board, Move, is_terminal};
use crate::constants::{
    DEEP_DEPTH, DEEP_MAX_EMPTY, DEEP_MIN_MAX_TILE, DEFAULT_DEPTH, EPSILON_MAX, EPSILON_MIN,
    MAX_SEARCH_DEPTH, PRUNE_DEPTH, PRUNE_EMPTY_THRESHOLD, PRUNE_SENTINEL_SCORE, SPAWN_PROB_FOUR,
    SPAWN_PROB_TWO, SPAWN_VALUES,
};
use crate::eval::evaluate;

// =============================================================================
// Types
// =============================================================================

/// The search procedures a driver can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Minimax,
    Expectimax,
    ExpectimaxEpsilon,
    ExpectiBetter,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Minimax,
        Algorithm::Expectimax,
        Algorithm::ExpectimaxEpsilon,
        Algorithm::ExpectiBetter,
    ];

    /// Name used in statistics and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Minimax => "minimax",
            Algorithm::Expectimax => "expectimax",
            Algorithm::ExpectimaxEpsilon => "expectimax_epsilon",
            Algorithm::ExpectiBetter => "expectibetter",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAlgorithmError(pub String);

impl fmt::Display for ParseAlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown algorithm {:?}", self.0)
    }
}

impl std::error::Error for ParseAlgorithmError {}

impl FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "minimax" => Ok(Algorithm::Minimax),
            "expectimax" => Ok(Algorithm::Expectimax),
            "expectimaxepsilon" | "epsilon" => Ok(Algorithm::ExpectimaxEpsilon),
            "expectibetter" | "pruned" => Ok(Algorithm::ExpectiBetter),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

/// Which side acts at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ply {
    /// The agent picks one of the four moves
    Player,
    /// A 2 or 4 appears on an empty cell
    Spawn,
}

impl Ply {
    #[inline]
    fn next(self) -> Ply {
        match self {
            Ply::Player => Ply::Spawn,
            Ply::Spawn => Ply::Player,
        }
    }
}

/// Result of a search: the backed-up score, the move that produced it, and
/// the node counter after the search.
///
/// `best_move` is `None` at depth 0, on a terminal board, and at spawn plies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub score: f64,
    pub best_move: Option<Move>,
    pub nodes_expanded: u64,
}

/// Per-node search state: remaining depth, side to act, and the running
/// node counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchContext {
    pub depth: u32,
    pub ply: Ply,
    pub nodes: u64,
}

impl SearchContext {
    pub fn new(depth: u32, ply: Ply, nodes: u64) -> Self {
        Self { depth, ply, nodes }
    }

    /// A player-to-move root with a zeroed counter.
    pub fn root(depth: u32) -> Self {
        Self::new(depth, Ply::Player, 0)
    }

    /// This node with the counter bumped once.
    #[inline]
    fn expand(self) -> Self {
        Self {
            nodes: self.nodes + 1,
            ..self
        }
    }

    /// Context for a child one ply deeper. Only called when `depth > 0`.
    #[inline]
    fn child(self, nodes: u64) -> Self {
        Self {
            depth: self.depth - 1,
            ply: self.ply.next(),
            nodes,
        }
    }
}

// =============================================================================
// Shared plies
// =============================================================================

#[inline]
fn leaf(board: &Board, nodes: u64) -> SearchOutcome {
    SearchOutcome {
        score: evaluate(board),
        best_move: None,
        nodes_expanded: nodes,
    }
}

#[inline]
fn is_leaf(board: &Board, depth: u32) -> bool {
    depth == 0 || is_terminal(board)
}

/// Probability weight of a spawned value.
#[inline]
fn spawn_weight(value: u32) -> f64 {
    if value == 2 {
        SPAWN_PROB_TWO
    } else {
        SPAWN_PROB_FOUR
    }
}

/// Player ply: best non-no-op move, first one wins ties.
fn maximize<F>(board: &Board, ctx: SearchContext, mut recurse: F) -> SearchOutcome
where
    F: FnMut(&Board, SearchContext) -> SearchOutcome,
{
    let mut nodes = ctx.nodes;
    let mut best: Option<(f64, Move)> = None;

    for mv in Move::ALL {
        let next = mv.apply(board);
        if next == *board {
            continue;
        }
        let child = recurse(&next, ctx.child(nodes));
        nodes = child.nodes_expanded;
        if best.is_none_or(|(score, _)| child.score > score) {
            best = Some((child.score, mv));
        }
    }

    match best {
        Some((score, mv)) => SearchOutcome {
            score,
            best_move: Some(mv),
            nodes_expanded: nodes,
        },
        None => leaf(board, nodes),
    }
}

/// Probabilistic spawn ply shared by the expectimax family.
///
/// `branch_cost` is added to the counter before each (cell, value) branch.
fn expect_spawn<F>(
    board: &Board,
    ctx: SearchContext,
    branch_cost: u64,
    mut recurse: F,
) -> SearchOutcome
where
    F: FnMut(&Board, SearchContext) -> SearchOutcome,
{
    let empty = board.empty_cells();
    if empty.is_empty() {
        return leaf(board, ctx.nodes);
    }

    let mut nodes = ctx.nodes;
    let mut total = 0.0;
    for &cell in &empty {
        for value in SPAWN_VALUES {
            nodes += branch_cost;
            let child = recurse(&board.with_tile(cell, value), ctx.child(nodes));
            nodes = child.nodes_expanded;
            total += child.score * spawn_weight(value);
        }
    }

    SearchOutcome {
        score: total / (empty.len() * SPAWN_VALUES.len()) as f64,
        best_move: None,
        nodes_expanded: nodes,
    }
}

// =============================================================================
// Minimax
// =============================================================================

/// Minimax with an adversarial spawn ply: the opponent places the single
/// worst (cell, value) for the player.
pub fn minimax(board: &Board, ctx: SearchContext) -> SearchOutcome {
    let ctx = ctx.expand();
    if is_leaf(board, ctx.depth) {
        return leaf(board, ctx.nodes);
    }

    match ctx.ply {
        Ply::Player => maximize(board, ctx, minimax),
        Ply::Spawn => {
            let empty = board.empty_cells();
            if empty.is_empty() {
                return leaf(board, ctx.nodes);
            }
            let mut nodes = ctx.nodes;
            let mut worst = f64::INFINITY;
            for &cell in &empty {
                for value in SPAWN_VALUES {
                    let child = minimax(&board.with_tile(cell, value), ctx.child(nodes));
                    nodes = child.nodes_expanded;
                    worst = worst.min(child.score);
                }
            }
            SearchOutcome {
                score: worst,
                best_move: None,
                nodes_expanded: nodes,
            }
        }
    }
}

// =============================================================================
// Expectimax
// =============================================================================

/// Expectimax. Every call counts as one node.
pub fn expectimax(board: &Board, ctx: SearchContext) -> SearchOutcome {
    let ctx = ctx.expand();
    if is_leaf(board, ctx.depth) {
        return leaf(board, ctx.nodes);
    }

    match ctx.ply {
        Ply::Player => maximize(board, ctx, expectimax),
        Ply::Spawn => expect_spawn(board, ctx, 0, expectimax),
    }
}

// =============================================================================
// Epsilon-exploring expectimax
// =============================================================================

/// Exploration rate at a given remaining depth.
pub fn epsilon(depth: u32) -> f64 {
    EPSILON_MAX - EPSILON_MIN * (depth as f64 / 10.0)
}

/// Expectimax whose player ply draws once per candidate move and, when the
/// draw falls under [`epsilon`], replaces the recorded move with one of the
/// four moves at random (no-ops included).
///
/// The override happens inside the move loop, so the last triggering draw
/// decides the move regardless of which candidate scored best. The score is
/// always the true maximum. Spawn plies hand off to plain [`expectimax`], so
/// exploration only happens at the player ply this is called on.
pub fn expectimax_epsilon(board: &Board, ctx: SearchContext, rng: &mut Rng) -> SearchOutcome {
    let ctx = ctx.expand();
    if is_leaf(board, ctx.depth) {
        return leaf(board, ctx.nodes);
    }

    match ctx.ply {
        Ply::Player => {
            let eps = epsilon(ctx.depth);
            let mut nodes = ctx.nodes;
            let mut best_score = f64::NEG_INFINITY;
            let mut best_move = None;

            for mv in Move::ALL {
                let next = mv.apply(board);
                if next == *board {
                    continue;
                }
                let child = expectimax_epsilon(&next, ctx.child(nodes), rng);
                nodes = child.nodes_expanded;
                if child.score > best_score {
                    best_score = child.score;
                    best_move = Some(mv);
                }
                if rng.f64() < eps {
                    best_move = Move::from_index(rng.usize(..Move::ALL.len()));
                }
            }

            if best_move.is_none() {
                return leaf(board, nodes);
            }
            SearchOutcome {
                score: best_score,
                best_move,
                nodes_expanded: nodes,
            }
        }
        Ply::Spawn => expect_spawn(board, ctx, 0, expectimax),
    }
}

// =============================================================================
// Pruned expectimax
// =============================================================================

/// Expectimax with a fixed-depth short-circuit.
///
/// At depth [`PRUNE_DEPTH`] with more than [`PRUNE_EMPTY_THRESHOLD`] empty
/// cells the node returns [`PRUNE_SENTINEL_SCORE`] and a random choice of
/// left or up without expanding anything. When this happens below the root
/// (root depth above `PRUNE_DEPTH`), the sentinel is compared against real
/// evaluations by the parent ply.
///
/// Nodes are counted once per move tried (no-ops included) and once per
/// (cell, value) spawn branch; leaves and the short-circuit add nothing.
pub fn expecti_better(board: &Board, ctx: SearchContext, rng: &mut Rng) -> SearchOutcome {
    if is_leaf(board, ctx.depth) {
        return leaf(board, ctx.nodes);
    }
    if ctx.depth == PRUNE_DEPTH && board.empty_cell_count() > PRUNE_EMPTY_THRESHOLD {
        const OPENING: [Move; 2] = [Move::Left, Move::Up];
        return SearchOutcome {
            score: PRUNE_SENTINEL_SCORE,
            best_move: Some(OPENING[rng.usize(..OPENING.len())]),
            nodes_expanded: ctx.nodes,
        };
    }

    match ctx.ply {
        Ply::Player => {
            let mut nodes = ctx.nodes;
            let mut best: Option<(f64, Move)> = None;
            for mv in Move::ALL {
                let next = mv.apply(board);
                nodes += 1;
                if next == *board {
                    continue;
                }
                let child = expecti_better(&next, ctx.child(nodes), rng);
                nodes = child.nodes_expanded;
                if best.is_none_or(|(score, _)| child.score > score) {
                    best = Some((child.score, mv));
                }
            }
            match best {
                Some((score, mv)) => SearchOutcome {
                    score,
                    best_move: Some(mv),
                    nodes_expanded: nodes,
                },
                None => leaf(board, nodes),
            }
        }
        Ply::Spawn => expect_spawn(board, ctx, 1, |b, c| expecti_better(b, c, &mut *rng)),
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Run one algorithm from an arbitrary context.
pub fn search(
    board: &Board,
    ctx: SearchContext,
    algorithm: Algorithm,
    rng: &mut Rng,
) -> SearchOutcome {
    match algorithm {
        Algorithm::Minimax => minimax(board, ctx),
        Algorithm::Expectimax => expectimax(board, ctx),
        Algorithm::ExpectimaxEpsilon => expectimax_epsilon(board, ctx, rng),
        Algorithm::ExpectiBetter => expecti_better(board, ctx, rng),
    }
}

pub(crate) fn clamp_depth(depth: u32) -> u32 {
    if depth > MAX_SEARCH_DEPTH {
        warn!("search depth {depth} clamped to {MAX_SEARCH_DEPTH}");
        MAX_SEARCH_DEPTH
    } else {
        depth
    }
}

/// Pick a move for `board` with the player to act.
///
/// The node counter starts at zero, so `nodes_expanded` is the cost of this
/// call alone.
pub fn choose_move(
    board: &Board,
    depth: u32,
    algorithm: Algorithm,
    rng: &mut Rng,
) -> SearchOutcome {
    let depth = clamp_depth(depth);
    let outcome = search(board, SearchContext::root(depth), algorithm, rng);
    debug!(
        "{algorithm} depth={depth} score={:.3} move={:?} nodes={}",
        outcome.score, outcome.best_move, outcome.nodes_expanded
    );
    outcome
}

/// [`choose_move`] with a private random source, seeded when `seed` is given.
pub fn choose_move_seeded(
    board: &Board,
    depth: u32,
    algorithm: Algorithm,
    seed: Option<u64>,
) -> SearchOutcome {
    let mut rng = match seed {
        Some(seed) => Rng::with_seed(seed),
        None => Rng::new(),
    };
    choose_move(board, depth, algorithm, &mut rng)
}

// =============================================================================
// Configuration
// =============================================================================

/// Raise the search depth on crowded boards with a large max tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deepening {
    /// Depth to use when the rule fires
    pub depth: u32,
    /// Fires only when the max tile is at least this
    pub min_max_tile: u32,
    /// Fires only when fewer than this many cells are empty
    pub max_empty: usize,
}

impl Default for Deepening {
    fn default() -> Self {
        Self {
            depth: DEEP_DEPTH,
            min_max_tile: DEEP_MIN_MAX_TILE,
            max_empty: DEEP_MAX_EMPTY,
        }
    }
}

impl Deepening {
    pub fn applies(&self, board: &Board) -> bool {
        board.max_tile() >= self.min_max_tile && board.empty_cell_count() < self.max_empty
    }
}

/// Algorithm and depth policy used by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub algorithm: Algorithm,
    pub depth: u32,
    pub deepening: Option<Deepening>,
}

impl SearchConfig {
    /// Default depth; deepening is on for [`Algorithm::ExpectiBetter`] only.
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        let deepening = match algorithm {
            Algorithm::ExpectiBetter => Some(Deepening::default()),
            _ => None,
        };
        Self {
            algorithm,
            depth: DEFAULT_DEPTH,
            deepening,
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_deepening(mut self, deepening: Option<Deepening>) -> Self {
        self.deepening = deepening;
        self
    }

    /// Depth to search `board` at.
    pub fn depth_for(&self, board: &Board) -> u32 {
        match self.deepening {
            Some(rule) if rule.applies(board) => rule.depth,
            _ => self.depth,
        }
    }

    /// Search `board` with this configuration.
    pub fn choose_move(&self, board: &Board, rng: &mut Rng) -> SearchOutcome {
        choose_move(board, self.depth_for(board), self.algorithm, rng)
    }
}

// =============================================================================
// Tests
// =============================================================================
