//! Static board evaluation used at every search leaf.
//!
//! The score rewards open space scaled by the magnitude of the largest tile
//! and penalises tiles, the largest one in particular, that sit far from the
//! top-left corner:
//!
//! ```text
//! empty * log2(max) - sum(log2(v) * (row + col)) - (row_max + col_max) * log2(max)
//! ```

use crate::board::Board;

/// `log2` of a tile value. Callers never pass 0.
#[inline]
fn log2(value: u32) -> f64 {
    (value as f64).log2()
}

/// Open-space term: empty cell count scaled by `log2(max)`.
pub fn open_space(board: &Board) -> f64 {
    board.empty_cell_count() as f64 * log2(board.max_tile())
}

/// Corner distance of every non-zero tile, weighted by its magnitude.
pub fn smoothness_penalty(board: &Board) -> f64 {
    let mut penalty = 0.0;
    for (row, values) in board.rows().enumerate() {
        for (col, &v) in values.iter().enumerate() {
            if v != 0 {
                penalty += log2(v) * (row + col) as f64;
            }
        }
    }
    penalty
}

/// Corner distance of the first max tile in row-major order, scaled by `log2(max)`.
pub fn max_tile_placement(board: &Board) -> f64 {
    let (row, col) = board.max_tile_cell();
    (row + col) as f64 * log2(board.max_tile())
}

/// Heuristic value of `board`; higher is better.
///
/// An all-empty board has no max tile magnitude and scores its empty cell
/// count.
pub fn evaluate(board: &Board) -> f64 {
    if board.max_tile() == 0 {
        return board.empty_cell_count() as f64;
    }
    open_space(board) - smoothness_penalty(board) - max_tile_placement(board)
}
