//! # Spreadsheet Grid Module
//!
//! The grid model consumed by the extraction pipeline: cells, rows, merged regions and the
//! `Sheet`/`Workbook` traits a grid provider implements. Reading physical file formats is left
//! to the provider; `MemorySheet` and `MemoryWorkbook` hold grids that are already materialized.
pub mod cell;
pub mod criteria;
pub mod merged;
pub mod range;
pub mod reference;
pub mod sheet;

use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::range::MergedRegion;

/// A physical row: its 0-based index and the cells present in it, ordered by column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    index: usize,
    cells: Vec<Cell>,
}

impl Row {
    /// Creates a row from its cells. Cells are sorted by column; a later cell replaces an
    /// earlier one in the same column.
    pub fn new(index: usize, cells: Vec<Cell>) -> Self {
        let mut row = Self { index, cells: Vec::with_capacity(cells.len()) };
        for cell in cells {
            row.insert(cell);
        }
        row
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Cells present in the row, left to right.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the cell at a column. Missing cells are absent, never a synthesized blank.
    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&col, |cell| cell.col)
            .ok()
            .map(|index| &self.cells[index])
    }

    pub(crate) fn insert(&mut self, mut cell: Cell) {
        cell.row = self.index;
        match self.cells.binary_search_by_key(&cell.col, |it| it.col) {
            Ok(index) => self.cells[index] = cell,
            Err(index) => self.cells.insert(index, cell),
        }
    }

    /// Returns true if no cell holds a non-whitespace value.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

/// A sheet exposed by a grid provider.
pub trait Sheet {
    /// Returns the sheet name
    fn name(&self) -> &str;

    /// Returns true if the sheet is hidden in the workbook
    fn is_hidden(&self) -> bool;

    /// Returns the index of the last row, or None for an empty sheet
    fn last_row(&self) -> Option<usize>;

    /// Returns the row at an index; rows may be absent
    fn row(&self, index: usize) -> Option<&Row>;

    /// Returns the merged rectangular regions of the sheet
    fn merged_regions(&self) -> &[MergedRegion];

    /// Iterates the present rows in ascending order.
    fn rows(&self) -> Box<dyn Iterator<Item = &Row> + '_> {
        match self.last_row() {
            Some(last_row) => Box::new((0..=last_row).filter_map(move |index| self.row(index))),
            None => Box::new(std::iter::empty()),
        }
    }
}

/// A workbook exposed by a grid provider.
pub trait Workbook {
    /// Returns the workbook name, if the provider knows one
    fn name(&self) -> Option<&str>;

    /// Returns the sheets in workbook order
    fn sheets(&self) -> Vec<&dyn Sheet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_keeps_cells_sorted() {
        let row = Row::new(3, vec![Cell::new(0, 2, "c"), Cell::new(0, 0, "a"), Cell::new(0, 2, "C")]);
        assert_eq!(row.index(), 3);
        assert_eq!(row.cells().len(), 2);
        assert_eq!(row.cell(0).map(|cell| cell.row), Some(3));
        assert_eq!(row.cell(2).and_then(Cell::string_value), Some("C"));
        assert_eq!(row.cell(1), None);
    }

    #[test]
    fn blank_rows() {
        assert!(Row::new(0, vec![Cell::blank(0, 0), Cell::new(0, 1, "  ")]).is_blank());
        assert!(!Row::new(0, vec![Cell::new(0, 1, 0.0)]).is_blank());
    }
}
