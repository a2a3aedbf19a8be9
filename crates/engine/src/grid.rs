//! Fixed-size grid snapshot.
//!
//! A `Grid` is a value: every edit produces a new `Grid` and a published
//! snapshot is never mutated in place. This makes snapshots safe to hand
//! out to readers and cheap to store in the undo history.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::cell_ref::CellRef;

/// Dimension bounds. Columns stop at 52 so column labels stay within two
/// letters (A..Z, AA..AZ).
pub const MIN_ROWS: usize = 5;
pub const MAX_ROWS: usize = 100;
pub const MIN_COLS: usize = 5;
pub const MAX_COLS: usize = 52;

pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 20;

/// A rows × cols grid with every coordinate present.
///
/// Cells are stored row-major; iteration order is the stable generation
/// order consumers may rely on for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a blank grid, clamping dimensions to the supported range.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.clamp(MIN_ROWS, MAX_ROWS);
        let cols = cols.clamp(MIN_COLS, MAX_COLS);
        Self {
            rows,
            cols,
            cells: vec![Cell::blank(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the reference falls inside this grid.
    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn get(&self, cell: CellRef) -> Option<&Cell> {
        self.index(cell).map(|i| &self.cells[i])
    }

    pub(crate) fn get_mut(&mut self, cell: CellRef) -> Option<&mut Cell> {
        self.index(cell).map(move |i| &mut self.cells[i])
    }

    /// Iterate all cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (CellRef::new(i / self.cols, i % self.cols), cell))
    }

    fn index(&self, cell: CellRef) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.row * self.cols + cell.col)
        } else {
            None
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_blank() {
        let grid = Grid::new(10, 8);
        assert_eq!(grid.rows(), 10);
        assert_eq!(grid.cols(), 8);
        assert!(grid.iter().all(|(_, cell)| *cell == Cell::blank()));
        assert_eq!(grid.iter().count(), 80);
    }

    #[test]
    fn test_dimension_clamping() {
        let tiny = Grid::new(1, 1);
        assert_eq!(tiny.rows(), MIN_ROWS);
        assert_eq!(tiny.cols(), MIN_COLS);

        let huge = Grid::new(1000, 1000);
        assert_eq!(huge.rows(), MAX_ROWS);
        assert_eq!(huge.cols(), MAX_COLS);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let grid = Grid::new(10, 10);
        assert!(grid.get(CellRef::new(9, 9)).is_some());
        assert!(grid.get(CellRef::new(10, 0)).is_none());
        assert!(grid.get(CellRef::new(0, 10)).is_none());
    }

    #[test]
    fn test_iter_row_major_order() {
        let grid = Grid::new(5, 5);
        let refs: Vec<String> = grid.iter().take(7).map(|(r, _)| r.to_string()).collect();
        assert_eq!(refs, vec!["A1", "B1", "C1", "D1", "E1", "A2", "B2"]);
    }

    #[test]
    fn test_mutation_does_not_leak_into_clones() {
        let mut grid = Grid::new(5, 5);
        let snapshot = grid.clone();
        grid.get_mut(CellRef::new(0, 0)).unwrap().raw = "5".to_string();

        assert_eq!(snapshot.get(CellRef::new(0, 0)).unwrap().raw, "");
        assert_ne!(grid, snapshot);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut grid = Grid::new(5, 5);
        grid.get_mut(CellRef::new(1, 2)).unwrap().raw = "=A1+1".to_string();

        let json = serde_json::to_string(&grid).unwrap();
        let parsed: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, grid);
    }
}
