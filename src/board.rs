//! Board representation and the pure transition functions over it.
//!
//! A [`Board`] is an NxN grid of tile values stored row-major in a flat
//! vector. Empty cells are 0; every other cell holds a power of two >= 2.
//!
//! All transitions are built from four primitives:
//! - [`compress`] - left-pack the non-zero tiles of every row
//! - [`merge`] - one left-to-right pass doubling equal neighbours (in place)
//! - [`reverse`] - mirror every row
//! - [`transpose`] - swap rows and columns
//!
//! `move_left` is `compress . merge . compress`; the other three directions
//! are conjugates of it by `reverse` and `transpose`.

use std::fmt;
use std::str::FromStr;

use fastrand::Rng;

use crate::constants::{INITIAL_TILES, MAX_TILE, SPAWN_PROB_TWO};

/// A cell coordinate as `(row, col)`.
pub type Cell = (usize, usize);

// =============================================================================
// Errors
// =============================================================================

/// Reasons a grid of numbers is not a valid board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// No rows at all
    Empty,
    /// A row whose length differs from the number of rows
    NotSquare { row: usize, len: usize, size: usize },
    /// A non-zero tile that is not a power of two >= 2
    InvalidTile { row: usize, col: usize, value: u32 },
    /// A cell that could not be read as a number
    BadCell(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::Empty => write!(f, "board has no rows"),
            BoardError::NotSquare { row, len, size } => {
                write!(f, "row {row} has {len} cells, expected {size}")
            }
            BoardError::InvalidTile { row, col, value } => {
                write!(f, "tile {value} at ({row}, {col}) is not 0 or a power of two >= 2")
            }
            BoardError::BadCell(cell) => write!(f, "cannot parse cell {cell:?}"),
        }
    }
}

impl std::error::Error for BoardError {}

/// Error returned when a move name is not one of the four directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoveError(pub String);

impl fmt::Display for ParseMoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown move {:?} (expected left, right, up or down)", self.0)
    }
}

impl std::error::Error for ParseMoveError {}

// =============================================================================
// Board
// =============================================================================

/// Whether `value` may sit in a cell.
#[inline]
pub fn is_valid_tile(value: u32) -> bool {
    value == 0 || (value >= 2 && value.is_power_of_two())
}

/// A square grid of tiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    cells: Vec<u32>,
}

impl Board {
    /// Create an all-zero board of the given size.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn empty(size: usize) -> Self {
        assert!(size > 0, "board size must be positive");
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Build a board from rows, validating shape and tile values.
    pub fn from_rows<R: AsRef<[u32]>>(rows: &[R]) -> Result<Self, BoardError> {
        let size = rows.len();
        if size == 0 {
            return Err(BoardError::Empty);
        }
        let mut cells = Vec::with_capacity(size * size);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != size {
                return Err(BoardError::NotSquare {
                    row,
                    len: values.len(),
                    size,
                });
            }
            for (col, &value) in values.iter().enumerate() {
                if !is_valid_tile(value) {
                    return Err(BoardError::InvalidTile { row, col, value });
                }
                cells.push(value);
            }
        }
        Ok(Self { size, cells })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    /// Tile at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[self.idx(row, col)]
    }

    /// Overwrite the tile at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        let i = self.idx(row, col);
        self.cells[i] = value;
    }

    /// A copy of this board with one cell replaced.
    pub fn with_tile(&self, (row, col): Cell, value: u32) -> Board {
        let mut next = self.clone();
        next.set(row, col, value);
        next
    }

    /// Iterate over the rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.cells.chunks_exact(self.size)
    }

    /// Copy the board out as nested rows, the interchange format for a view layer.
    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.rows().map(<[u32]>::to_vec).collect()
    }

    /// Number of cells holding 0.
    pub fn empty_cell_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Largest tile on the board (0 for an all-empty board).
    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Position of the first cell, in row-major order, holding the max tile.
    pub fn max_tile_cell(&self) -> Cell {
        let max = self.max_tile();
        let i = self.cells.iter().position(|&v| v == max).unwrap_or(0);
        (i / self.size, i % self.size)
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == 0)
            .map(|(i, _)| (i / self.size, i % self.size))
            .collect()
    }

    /// Number of cells holding exactly `value`.
    pub fn count_tiles(&self, value: u32) -> usize {
        self.cells.iter().filter(|&&v| v == value).count()
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> &[u32] {
        &self.cells
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for &v in row {
                if v == 0 {
                    write!(f, "{:>6}", ".")?;
                } else {
                    write!(f, "{v:>6}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parse a board from text.
///
/// Rows are separated by `/` or newlines, cells by whitespace or commas.
/// A `.` reads as an empty cell, so the `Display` output parses back.
impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows = Vec::new();
        for line in s.split(['/', '\n']) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|cell| !cell.is_empty())
                .map(|cell| match cell {
                    "." => Ok(0),
                    _ => cell
                        .parse::<u32>()
                        .map_err(|_| BoardError::BadCell(cell.to_string())),
                })
                .collect::<Result<Vec<u32>, _>>()?;
            rows.push(row);
        }
        Board::from_rows(rows.as_slice())
    }
}

// =============================================================================
// Primitives
// =============================================================================

/// Mirror every row.
pub fn reverse(board: &Board) -> Board {
    let mut out = board.clone();
    for row in out.cells.chunks_exact_mut(board.size) {
        row.reverse();
    }
    out
}

/// Matrix transpose.
pub fn transpose(board: &Board) -> Board {
    let n = board.size;
    let mut out = Board::empty(n);
    for row in 0..n {
        for col in 0..n {
            out.set(col, row, board.get(row, col));
        }
    }
    out
}

/// Left-pack the non-zero tiles of every row, keeping their order.
pub fn compress(board: &Board) -> Board {
    let n = board.size;
    let mut out = Board::empty(n);
    for (row, values) in board.rows().enumerate() {
        let mut pos = 0;
        for &v in values {
            if v != 0 {
                out.set(row, pos, v);
                pos += 1;
            }
        }
    }
    out
}

/// Whether two neighbouring cells combine. [`MAX_TILE`] pairs stay put.
#[inline]
fn mergeable(a: u32, b: u32) -> bool {
    a != 0 && a == b && a < MAX_TILE
}

/// One left-to-right pass per row: `cell[c] == cell[c+1] != 0` doubles
/// `cell[c]` and zeroes `cell[c+1]`. A merged tile is never merged again
/// in the same pass.
pub fn merge(board: &mut Board) {
    let n = board.size;
    for row in board.cells.chunks_exact_mut(n) {
        for c in 0..n.saturating_sub(1) {
            if mergeable(row[c], row[c + 1]) {
                row[c] *= 2;
                row[c + 1] = 0;
            }
        }
    }
}

// =============================================================================
// Moves
// =============================================================================

pub fn move_left(board: &Board) -> Board {
    let mut packed = compress(board);
    merge(&mut packed);
    compress(&packed)
}

pub fn move_right(board: &Board) -> Board {
    reverse(&move_left(&reverse(board)))
}

pub fn move_up(board: &Board) -> Board {
    transpose(&move_left(&transpose(board)))
}

pub fn move_down(board: &Board) -> Board {
    transpose(&move_right(&transpose(board)))
}

/// Transition for each move, indexed by `Move as usize`.
const TRANSITIONS: [fn(&Board) -> Board; 4] = [move_left, move_right, move_up, move_down];

/// One of the four sliding directions.
///
/// The discriminant order (left, right, up, down) is the iteration order of
/// every search; ties between equal scores keep the earlier move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Move {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
}

impl Move {
    /// All moves in canonical search order.
    pub const ALL: [Move; 4] = [Move::Left, Move::Right, Move::Up, Move::Down];

    /// Convert an index (0=Left, 1=Right, 2=Up, 3=Down) to a move.
    pub fn from_index(i: usize) -> Option<Move> {
        Move::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Move::Left => "left",
            Move::Right => "right",
            Move::Up => "up",
            Move::Down => "down",
        }
    }

    /// Apply this move to a board.
    #[inline]
    pub fn apply(self, board: &Board) -> Board {
        TRANSITIONS[self as usize](board)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Ok(Move::Left),
            "right" | "r" => Ok(Move::Right),
            "up" | "u" => Ok(Move::Up),
            "down" | "d" => Ok(Move::Down),
            _ => Err(ParseMoveError(s.to_string())),
        }
    }
}

/// Apply `mv` to `board`, returning the successor.
#[inline]
pub fn apply_move(board: &Board, mv: Move) -> Board {
    mv.apply(board)
}

// =============================================================================
// Spawning and Terminal Detection
// =============================================================================

/// Place a 2 (90%) or 4 (10%) on a uniformly chosen empty cell.
///
/// Returns the cell written, or `None` if the board is full.
pub fn place_random_tile(board: &mut Board, rng: &mut Rng) -> Option<Cell> {
    let empty = board.empty_cells();
    if empty.is_empty() {
        return None;
    }
    let (row, col) = empty[rng.usize(..empty.len())];
    let value = if rng.f64() < SPAWN_PROB_TWO { 2 } else { 4 };
    board.set(row, col, value);
    Some((row, col))
}

/// A copy of `board` with one random tile spawned. No-op on a full board.
pub fn spawn_tile(board: &Board, rng: &mut Rng) -> Board {
    let mut next = board.clone();
    place_random_tile(&mut next, rng);
    next
}

/// A fresh game board: all zeros plus two spawned tiles.
pub fn new_board(size: usize, rng: &mut Rng) -> Board {
    let mut board = Board::empty(size);
    for _ in 0..INITIAL_TILES {
        place_random_tile(&mut board, rng);
    }
    board
}

/// True iff no cell is empty and no row- or column-adjacent pair can merge.
pub fn is_terminal(board: &Board) -> bool {
    if board.empty_cell_count() > 0 {
        return false;
    }
    let n = board.size;
    for row in 0..n {
        for col in 0..n {
            let v = board.get(row, col);
            if col + 1 < n && mergeable(v, board.get(row, col + 1)) {
                return false;
            }
            if row + 1 < n && mergeable(v, board.get(row + 1, col)) {
                return false;
            }
        }
    }
    true
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[[u32; 4]]) -> Board {
        Board::from_rows(rows).unwrap()
    }

    fn single_row(row: [u32; 4]) -> Board {
        board(&[row, [0; 4], [0; 4], [0; 4]])
    }

    fn first_row(b: &Board) -> Vec<u32> {
        b.rows().next().unwrap().to_vec()
    }

    // -------------------------------------------------------------------------
    // Primitive tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_compress_simple() {
        let b = compress(&single_row([0, 2, 0, 4]));
        assert_eq!(first_row(&b), vec![2, 4, 0, 0]);
    }

    #[test]
    fn test_compress_all_zeros() {
        let b = compress(&Board::empty(4));
        assert_eq!(b, Board::empty(4));
    }

    #[test]
    fn test_merge_in_place_no_compress() {
        let mut b = single_row([2, 2, 2, 0]);
        merge(&mut b);
        assert_eq!(first_row(&b), vec![4, 0, 2, 0]);
    }

    #[test]
    fn test_largest_tile_does_not_merge() {
        let mut b = single_row([MAX_TILE, MAX_TILE, 2, 2]);
        merge(&mut b);
        assert_eq!(first_row(&b), vec![MAX_TILE, MAX_TILE, 4, 0]);

        // Four 2^30 tiles merge once into two MAX_TILE tiles, then stop.
        let half = MAX_TILE / 2;
        let b = Board::from_rows(&[[half, half], [half, half]]).unwrap();
        let left = move_left(&b);
        assert_eq!(left, Board::from_rows(&[[MAX_TILE, 0], [MAX_TILE, 0]]).unwrap());
        assert_eq!(move_up(&left), left);
        assert_eq!(move_down(&left), left);
    }

    #[test]
    fn test_merge_does_not_cascade() {
        let mut b = single_row([4, 4, 8, 0]);
        merge(&mut b);
        assert_eq!(first_row(&b), vec![8, 0, 8, 0]);
    }

    #[test]
    fn test_reverse_rows() {
        let b = reverse(&single_row([2, 4, 8, 16]));
        assert_eq!(first_row(&b), vec![16, 8, 4, 2]);
    }

    #[test]
    fn test_transpose() {
        let b = transpose(&single_row([2, 4, 8, 16]));
        assert_eq!(b.get(0, 0), 2);
        assert_eq!(b.get(1, 0), 4);
        assert_eq!(b.get(2, 0), 8);
        assert_eq!(b.get(3, 0), 16);
        assert_eq!(transpose(&b), single_row([2, 4, 8, 16]));
    }

    // -------------------------------------------------------------------------
    // Move tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_move_left_two_pairs() {
        let b = move_left(&single_row([2, 2, 4, 4]));
        assert_eq!(first_row(&b), vec![4, 8, 0, 0]);
    }

    #[test]
    fn test_move_left_no_double_merge() {
        assert_eq!(first_row(&move_left(&single_row([2, 2, 2, 2]))), vec![4, 4, 0, 0]);
        assert_eq!(first_row(&move_left(&single_row([4, 2, 2, 0]))), vec![4, 4, 0, 0]);
        assert_eq!(first_row(&move_left(&single_row([2, 0, 2, 0]))), vec![4, 0, 0, 0]);
    }

    #[test]
    fn test_all_directions() {
        let b = board(&[[2, 2, 0, 0], [0, 4, 4, 0], [2, 0, 2, 0], [8, 8, 8, 8]]);
        assert_eq!(
            move_left(&b),
            board(&[[4, 0, 0, 0], [8, 0, 0, 0], [4, 0, 0, 0], [16, 16, 0, 0]])
        );
        assert_eq!(
            move_right(&b),
            board(&[[0, 0, 0, 4], [0, 0, 0, 8], [0, 0, 0, 4], [0, 0, 16, 16]])
        );

        let v = board(&[[2, 0, 2, 8], [2, 4, 0, 8], [0, 4, 2, 8], [0, 0, 0, 8]]);
        assert_eq!(
            move_up(&v),
            board(&[[4, 8, 4, 16], [0, 0, 0, 16], [0, 0, 0, 0], [0, 0, 0, 0]])
        );
        assert_eq!(
            move_down(&v),
            board(&[[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 16], [4, 8, 4, 16]])
        );
    }

    #[test]
    fn test_move_apply_matches_functions() {
        let b = board(&[[2, 0, 2, 8], [2, 4, 0, 8], [0, 4, 2, 8], [0, 0, 0, 8]]);
        assert_eq!(apply_move(&b, Move::Left), move_left(&b));
        assert_eq!(apply_move(&b, Move::Right), move_right(&b));
        assert_eq!(apply_move(&b, Move::Up), move_up(&b));
        assert_eq!(apply_move(&b, Move::Down), move_down(&b));
    }

    #[test]
    fn test_move_does_not_touch_input() {
        let b = single_row([2, 2, 0, 0]);
        let before = b.clone();
        let _ = move_left(&b);
        assert_eq!(b, before);
    }

    #[test]
    fn test_move_on_non_default_size() {
        let b = Board::from_rows(&[[2u32, 2, 2], [0, 0, 0], [4, 0, 4]]).unwrap();
        let expected = Board::from_rows(&[[4u32, 2, 0], [0, 0, 0], [8, 0, 0]]).unwrap();
        assert_eq!(move_left(&b), expected);
    }

    // -------------------------------------------------------------------------
    // Move enum tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_move_order_and_index() {
        assert_eq!(Move::ALL, [Move::Left, Move::Right, Move::Up, Move::Down]);
        for (i, mv) in Move::ALL.iter().enumerate() {
            assert_eq!(Move::from_index(i), Some(*mv));
        }
        assert_eq!(Move::from_index(4), None);
    }

    #[test]
    fn test_move_parse() {
        assert_eq!("left".parse::<Move>(), Ok(Move::Left));
        assert_eq!("R".parse::<Move>(), Ok(Move::Right));
        assert_eq!(" Up ".parse::<Move>(), Ok(Move::Up));
        assert_eq!("d".parse::<Move>(), Ok(Move::Down));
        assert!("diagonal".parse::<Move>().is_err());
    }

    // -------------------------------------------------------------------------
    // Spawn tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_spawn_adds_exactly_one_tile() {
        let mut rng = Rng::with_seed(7);
        let b = single_row([2, 0, 0, 0]);
        let next = spawn_tile(&b, &mut rng);
        assert_eq!(next.empty_cell_count(), b.empty_cell_count() - 1);
        assert!(next.tiles().iter().all(|&v| matches!(v, 0 | 2 | 4)));
    }

    #[test]
    fn test_spawn_on_full_board_is_noop() {
        let mut rng = Rng::with_seed(7);
        let full = board(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert_eq!(spawn_tile(&full, &mut rng), full);
    }

    #[test]
    fn test_spawn_determinism() {
        let a = new_board(4, &mut Rng::with_seed(12345));
        let b = new_board(4, &mut Rng::with_seed(12345));
        assert_eq!(a, b);
        assert_eq!(a.empty_cell_count(), 14);
    }

    // -------------------------------------------------------------------------
    // Terminal detection tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_terminal_checkerboard() {
        let b = board(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(is_terminal(&b));
    }

    #[test]
    fn test_terminal_with_largest_tile_pair() {
        let b = Board::from_rows(&[[MAX_TILE, MAX_TILE], [2, 4]]).unwrap();
        assert!(is_terminal(&b));
        for mv in Move::ALL {
            assert_eq!(apply_move(&b, mv), b);
        }
    }

    #[test]
    fn test_not_terminal_with_empty_cell() {
        assert!(!is_terminal(&single_row([2, 2, 4, 4])));
    }

    #[test]
    fn test_not_terminal_horizontal_pair() {
        let b = board(&[[2, 2, 4, 8], [4, 8, 16, 32], [8, 16, 32, 64], [16, 32, 64, 128]]);
        assert!(!is_terminal(&b));
    }

    #[test]
    fn test_not_terminal_vertical_pair() {
        let b = board(&[[2, 4, 8, 16], [2, 8, 16, 32], [4, 16, 32, 64], [8, 32, 64, 128]]);
        assert!(!is_terminal(&b));
    }

    // -------------------------------------------------------------------------
    // Queries and parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_queries() {
        let b = board(&[[0, 2, 0, 4], [0, 0, 1024, 0], [0, 0, 0, 0], [1024, 0, 0, 0]]);
        assert_eq!(b.empty_cell_count(), 12);
        assert_eq!(b.max_tile(), 1024);
        assert_eq!(b.max_tile_cell(), (1, 2));
        assert_eq!(b.empty_cells()[0], (0, 0));
        assert_eq!(b.empty_cells()[1], (0, 2));
        assert_eq!(b.count_tiles(1024), 2);
    }

    #[test]
    fn test_parse_board() {
        let b: Board = "2 2 4 4/0 0 0 0/0 0 0 0/0 0 0 0".parse().unwrap();
        assert_eq!(b, single_row([2, 2, 4, 4]));
        let b: Board = "2,0\n., 4".parse().unwrap();
        assert_eq!(b, Board::from_rows(&[[2u32, 0], [0, 4]]).unwrap());
    }

    #[test]
    fn test_display_parses_back() {
        let b = board(&[[0, 2, 0, 4], [0, 0, 1024, 0], [0, 0, 0, 0], [8, 0, 0, 0]]);
        let text = b.to_string();
        assert_eq!(text.parse::<Board>().unwrap(), b);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Board>(), Err(BoardError::Empty));
        assert_eq!(
            "2 2/0".parse::<Board>(),
            Err(BoardError::NotSquare { row: 1, len: 1, size: 2 })
        );
        assert_eq!(
            "3 0/0 0".parse::<Board>(),
            Err(BoardError::InvalidTile { row: 0, col: 0, value: 3 })
        );
        assert_eq!(
            "1 0/0 0".parse::<Board>(),
            Err(BoardError::InvalidTile { row: 0, col: 0, value: 1 })
        );
        assert_eq!("x 0/0 0".parse::<Board>(), Err(BoardError::BadCell("x".to_string())));
    }
}
