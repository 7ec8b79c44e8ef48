use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::Row;
use crate::spreadsheet::Sheet;
use std::collections::HashMap;

/// Maps every position inside a merged region to the region's top-left cell.
///
/// Built once per sheet. Regions whose top-left cell is missing or blank are left out, so
/// their positions resolve to the physical cells instead.
#[derive(Debug, Default)]
pub struct MergedCells<'a> {
    cells: HashMap<(usize, usize), &'a Cell>,
}

impl<'a> MergedCells<'a> {
    pub fn new(sheet: &'a dyn Sheet) -> Self {
        let mut cells = HashMap::new();
        for region in sheet.merged_regions() {
            let (row, col) = region.representative();
            let representative = sheet
                .row(row)
                .and_then(|row| row.cell(col))
                .filter(|cell| !cell.is_blank());
            if let Some(representative) = representative {
                cells.extend(region.positions().map(|position| (position, representative)));
            }
        }
        Self { cells }
    }

    /// Returns the representative cell of the merged region covering (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<&'a Cell> {
        self.cells.get(&(row, col)).copied()
    }

    /// Returns the representative cell if the position is merged, else the physical cell.
    pub fn resolve(&self, row: &'a Row, col: usize) -> Option<&'a Cell> {
        self.get(row.index(), col).or_else(|| row.cell(col))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::MemorySheet;

    fn sheet() -> MemorySheet {
        let mut sheet = MemorySheet::new("merged");
        sheet.push_row(0, ["group", "", "", "single"]);
        sheet.push_row(1, ["a", "b", "c", "d"]);
        sheet.push_row(2, ["x", "", "", ""]);
        sheet.merge_range("A1:C1").unwrap();
        sheet.merge_range("D1:D2").unwrap();
        sheet.merge_range("B3:D3").unwrap();
        sheet
    }

    #[test]
    fn every_interior_cell_maps_to_representative() {
        let sheet = sheet();
        let merged = MergedCells::new(&sheet);

        for col in 0..3 {
            assert_eq!(merged.get(0, col).map(Cell::to_string), Some("group".to_owned()));
        }
        assert_eq!(merged.get(1, 3).map(Cell::to_string), Some("single".to_owned()));
        assert_eq!(merged.get(1, 0), None);
        assert_eq!(merged.get(5, 5), None);
    }

    #[test]
    fn blank_representative_is_skipped() {
        let sheet = sheet();
        let merged = MergedCells::new(&sheet);
        assert_eq!(merged.get(2, 1), None);
        assert_eq!(merged.get(2, 2), None);
    }

    #[test]
    fn resolve_falls_back_to_physical_cell() {
        let sheet = sheet();
        let merged = MergedCells::new(&sheet);
        let row = sheet.row(1).unwrap();
        assert_eq!(merged.resolve(row, 3).map(Cell::to_string), Some("single".to_owned()));
        assert_eq!(merged.resolve(row, 1).map(Cell::to_string), Some("b".to_owned()));
        assert_eq!(merged.resolve(row, 9), None);
    }
}
