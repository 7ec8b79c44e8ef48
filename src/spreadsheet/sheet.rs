use crate::error::RefineryError;
use crate::error::ResultMessage;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::range::MergedRegion;
use crate::spreadsheet::range::RangeError;
use crate::spreadsheet::Row;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;
use std::collections::BTreeMap;

/// An in-memory sheet, filled cell by cell by whoever materialized the grid.
#[derive(Clone, Debug, Default)]
pub struct MemorySheet {
    /// Sheet name
    name: String,
    /// Whether the sheet is hidden in its workbook
    hidden: bool,
    /// Present rows keyed by row index
    rows: BTreeMap<usize, Row>,
    /// Merged regions, never overlapping
    merged_regions: Vec<MergedRegion>,
}

impl MemorySheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Returns true if the sheet contains no cells.
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|row| row.cells().is_empty())
    }

    /// Adds a cell to the sheet, replacing any cell at the same position.
    pub fn push(&mut self, cell: Cell) {
        self.rows
            .entry(cell.row)
            .or_insert_with(|| Row::new(cell.row, Vec::new()))
            .insert(cell);
    }

    /// Adds one cell per value at columns 0, 1, 2... of a row.
    pub fn push_row<I, V>(&mut self, row: usize, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        for (col, value) in values.into_iter().enumerate() {
            self.push(Cell::new(row, col, value));
        }
    }

    /// Registers a merged region, rejecting overlaps with existing ones.
    pub fn merge(&mut self, region: MergedRegion) -> Result<(), RangeError> {
        if self.merged_regions.iter().any(|existing| existing.overlaps(&region)) {
            Err(RangeError::Overlap(region))?
        }
        self.merged_regions.push(region);
        Ok(())
    }

    /// Registers a merged region given as an A1 range such as "B2:D2".
    pub fn merge_range(&mut self, range: &str) -> Result<(), RefineryError> {
        let region = MergedRegion::try_from(range).map_err(RefineryError::from);
        self.merge(region.with_prefix("Invalid merged range")?)?;
        Ok(())
    }
}

impl Sheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn last_row(&self) -> Option<usize> {
        self.rows.keys().next_back().copied()
    }

    fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(&index)
    }

    fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged_regions
    }

    fn rows(&self) -> Box<dyn Iterator<Item = &Row> + '_> {
        Box::new(self.rows.values())
    }
}

/// An in-memory workbook holding sheets in workbook order.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorkbook {
    name: Option<String>,
    sheets: Vec<MemorySheet>,
}

impl MemoryWorkbook {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_owned),
            sheets: Vec::new(),
        }
    }

    pub fn push(&mut self, sheet: MemorySheet) {
        self.sheets.push(sheet);
    }

    pub fn with_sheet(mut self, sheet: MemorySheet) -> Self {
        self.push(sheet);
        self
    }
}

impl Workbook for MemoryWorkbook {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn sheets(&self) -> Vec<&dyn Sheet> {
        self.sheets.iter().map(|sheet| sheet as &dyn Sheet).collect()
    }
}
