//! Public editing surface: a grid plus its undo history.
//!
//! `Spreadsheet` is the single entry point UI layers talk to. Every
//! operation runs to completion before returning and swaps the current grid
//! for a freshly computed one — published snapshots are never mutated, so a
//! reader holding the previous grid always sees a consistent state.
//!
//! Errors never cross this surface; they are absorbed into cell state and
//! rendered through `display`.

use crate::cell::Cell;
use crate::cell_ref::CellRef;
use crate::grid::Grid;
use crate::history::History;
use crate::recalc::{recalc, RecalcReport};

/// A live spreadsheet: current grid state and bounded edit history.
#[derive(Debug, Clone)]
pub struct Spreadsheet {
    grid: Grid,
    history: History,
}

impl Spreadsheet {
    /// Create a blank spreadsheet. Dimensions are clamped to the supported
    /// range (rows 5..=100, cols 5..=52). History starts at the blank grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        let grid = Grid::new(rows, cols);
        let history = History::new(grid.clone());
        Self { grid, history }
    }

    /// The current snapshot.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Set a cell's raw text and recalculate everything affected.
    ///
    /// A no-op when the text equals the cell's current raw text or the
    /// reference is outside the grid: the state is unchanged and no history
    /// entry is recorded. Otherwise one new snapshot is produced and
    /// recorded, and the report for the pass is returned.
    pub fn edit_cell(&mut self, cell: CellRef, raw: &str) -> RecalcReport {
        match self.grid.get(cell) {
            None => return RecalcReport::new(),
            Some(current) if current.raw == raw => return RecalcReport::new(),
            Some(_) => {}
        }

        let mut working = self.grid.clone();
        if let Some(state) = working.get_mut(cell) {
            state.raw = raw.to_string();
            state.error = None;
        }

        let (next, report) = recalc(&working, cell);
        self.grid = next;
        self.history.record(self.grid.clone());
        report
    }

    /// Step back to the previous snapshot. Returns false (and changes
    /// nothing) when already at the oldest retained state.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(grid) => {
                self.grid = grid.clone();
                true
            }
            None => false,
        }
    }

    /// Step forward to the next snapshot. Returns false (and changes
    /// nothing) when already at the newest state.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(grid) => {
                self.grid = grid.clone();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Change the grid dimensions.
    ///
    /// A dimension change regenerates a blank grid and resets history to
    /// that single snapshot. A no-op when the clamped dimensions equal the
    /// current ones.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let fresh = Grid::new(rows, cols);
        if fresh.rows() == self.grid.rows() && fresh.cols() == self.grid.cols() {
            return;
        }
        self.grid = fresh;
        self.history.reset(self.grid.clone());
    }

    /// Display string for a cell: its error code if set, its value
    /// otherwise. Empty for out-of-grid references.
    pub fn display(&self, cell: CellRef) -> String {
        self.grid.get(cell).map(Cell::display).unwrap_or_default()
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new(crate::grid::DEFAULT_ROWS, crate::grid::DEFAULT_COLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellError, Value};
    use crate::history::HISTORY_CAP;

    fn cell(id: &str) -> CellRef {
        CellRef::parse(id).unwrap()
    }

    fn sheet_with(entries: &[(&str, &str)]) -> Spreadsheet {
        let mut sheet = Spreadsheet::new(10, 10);
        for (id, raw) in entries {
            sheet.edit_cell(cell(id), raw);
        }
        sheet
    }

    fn value_of(sheet: &Spreadsheet, id: &str) -> &Value {
        &sheet.grid().get(cell(id)).unwrap().value
    }

    #[test]
    fn test_edit_and_display() {
        let sheet = sheet_with(&[("A1", "5"), ("B1", "=A1*2")]);
        assert_eq!(sheet.display(cell("A1")), "5");
        assert_eq!(sheet.display(cell("B1")), "10");
        assert_eq!(sheet.display(cell("C1")), "");
    }

    #[test]
    fn test_error_display() {
        let sheet = sheet_with(&[("A1", "10"), ("B1", "=A1/0"), ("C1", "=C1")]);
        assert_eq!(sheet.display(cell("B1")), "#DIV/0!");
        assert_eq!(sheet.display(cell("C1")), "#CIRCULAR");
    }

    #[test]
    fn test_same_text_edit_is_a_no_op() {
        let mut sheet = sheet_with(&[("A1", "5")]);
        let before = sheet.history.snapshot_count();

        let report = sheet.edit_cell(cell("A1"), "5");
        assert_eq!(report.cells_recomputed, 0);
        assert_eq!(sheet.history.snapshot_count(), before);
        assert_eq!(*value_of(&sheet, "A1"), Value::Number(5.0));
    }

    #[test]
    fn test_out_of_grid_edit_is_a_no_op() {
        let mut sheet = Spreadsheet::new(10, 10);
        let report = sheet.edit_cell(CellRef::new(50, 50), "5");
        assert_eq!(report.cells_recomputed, 0);
        assert_eq!(sheet.history.snapshot_count(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut sheet = sheet_with(&[("A1", "1"), ("A1", "2")]);
        let newest = sheet.grid().clone();

        assert!(sheet.can_undo());
        assert!(sheet.undo());
        assert_eq!(*value_of(&sheet, "A1"), Value::Number(1.0));

        assert!(sheet.redo());
        assert_eq!(*sheet.grid(), newest);
    }

    #[test]
    fn test_undo_redo_boundaries_idempotent() {
        let mut sheet = Spreadsheet::new(10, 10);
        assert!(!sheet.undo());
        assert!(!sheet.redo());

        sheet.edit_cell(cell("A1"), "1");
        assert!(sheet.undo());
        assert!(!sheet.undo());
        assert!(sheet.redo());
        assert!(!sheet.redo());
    }

    #[test]
    fn test_undo_restores_dependents() {
        let mut sheet = sheet_with(&[("A1", "5"), ("B1", "=A1*2"), ("A1", "7")]);
        assert_eq!(*value_of(&sheet, "B1"), Value::Number(14.0));

        sheet.undo();
        assert_eq!(*value_of(&sheet, "B1"), Value::Number(10.0));
        assert_eq!(*value_of(&sheet, "A1"), Value::Number(5.0));
    }

    #[test]
    fn test_edit_after_undo_discards_redo() {
        let mut sheet = sheet_with(&[("A1", "1"), ("A1", "2")]);
        sheet.undo();
        sheet.edit_cell(cell("A1"), "3");

        assert!(!sheet.can_redo());
        assert_eq!(*value_of(&sheet, "A1"), Value::Number(3.0));
        sheet.undo();
        assert_eq!(*value_of(&sheet, "A1"), Value::Number(1.0));
    }

    #[test]
    fn test_history_bound_on_repeated_edits() {
        // 51 edits to the same cell: the cap keeps 50 snapshots and the
        // undo floor is the state after the 2nd edit.
        let mut sheet = Spreadsheet::new(10, 10);
        for i in 1..=51 {
            sheet.edit_cell(cell("A1"), &i.to_string());
        }
        assert_eq!(sheet.history.snapshot_count(), HISTORY_CAP);

        let mut undos = 0;
        while sheet.undo() {
            undos += 1;
        }
        assert_eq!(undos, HISTORY_CAP - 1);
        assert_eq!(*value_of(&sheet, "A1"), Value::Number(2.0));
    }

    #[test]
    fn test_cycle_absorbed_not_thrown() {
        let mut sheet = sheet_with(&[("A1", "=B1+1")]);
        let report = sheet.edit_cell(cell("B1"), "=A1+1");
        assert!(report.had_cycles);
        assert_eq!(
            sheet.grid().get(cell("A1")).unwrap().error,
            Some(CellError::Circular)
        );
        assert_eq!(
            sheet.grid().get(cell("B1")).unwrap().error,
            Some(CellError::Circular)
        );
    }

    #[test]
    fn test_resize_resets_content_and_history() {
        let mut sheet = sheet_with(&[("A1", "5"), ("B1", "=A1")]);
        sheet.resize(12, 12);

        assert_eq!(sheet.grid().rows(), 12);
        assert_eq!(sheet.grid().cols(), 12);
        assert_eq!(sheet.display(cell("A1")), "");
        assert!(!sheet.can_undo());
        assert!(!sheet.can_redo());
    }

    #[test]
    fn test_resize_to_same_dimensions_is_a_no_op() {
        let mut sheet = sheet_with(&[("A1", "5")]);
        sheet.resize(10, 10);
        assert_eq!(sheet.display(cell("A1")), "5");
        assert!(sheet.can_undo());
    }

    #[test]
    fn test_resize_clamps() {
        let mut sheet = Spreadsheet::new(10, 10);
        sheet.resize(1000, 1000);
        assert_eq!(sheet.grid().rows(), crate::grid::MAX_ROWS);
        assert_eq!(sheet.grid().cols(), crate::grid::MAX_COLS);
    }

    #[test]
    fn test_default_dimensions() {
        let sheet = Spreadsheet::default();
        assert_eq!(sheet.grid().rows(), 20);
        assert_eq!(sheet.grid().cols(), 20);
    }
}
