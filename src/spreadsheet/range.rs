use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::row_to_index;
use regex::Regex;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Errors related to merged region parsing and validation.
#[derive(Error, Debug, PartialEq)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),

    #[error("Range bounds are inverted: rows {first_row}..{last_row}, columns {first_col}..{last_col}")]
    InvertedBounds { first_row: usize, last_row: usize, first_col: usize, last_col: usize },

    #[error("Merged region {0} overlaps an existing merged region")]
    Overlap(MergedRegion),
}

/// A rectangular block of cells sharing the value of its top-left cell.
/// All bounds are 0-based and inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MergedRegion {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl MergedRegion {
    pub fn new(first_row: usize, last_row: usize, first_col: usize, last_col: usize) -> Result<Self, RangeError> {
        if first_row > last_row || first_col > last_col {
            Err(RangeError::InvertedBounds { first_row, last_row, first_col, last_col })?
        }
        Ok(Self { first_row, last_row, first_col, last_col })
    }

    /// Position of the representative (top-left) cell.
    pub fn representative(&self) -> (usize, usize) {
        (self.first_row, self.first_col)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn overlaps(&self, other: &MergedRegion) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// Iterates every (row, col) position inside the region, row by row.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |row| (self.first_col..=self.last_col).map(move |col| (row, col)))
    }
}

impl TryFrom<&str> for MergedRegion {
    type Error = RangeError;

    /// Parses an Excel-style range string (e.g., "B2:C5"). A single cell ("A1") is a 1x1 region.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]+)(\d+)(:([A-Z]+)(\d+))?$").expect("Hardcode regex pattern");
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let bound = |index: usize, fallback: usize, parse: fn(&str) -> Option<usize>| {
            captures
                .get(index)
                .or_else(|| captures.get(fallback))
                .map(|matcher| matcher.as_str())
                .and_then(parse)
                .ok_or(RangeError::FormatError(value.to_owned()))
        };
        MergedRegion::new(
            bound(2, 2, row_to_index)?,
            bound(5, 2, row_to_index)?,
            bound(1, 1, col_to_index)?,
            bound(4, 1, col_to_index)?,
        )
    }
}

impl FromStr for MergedRegion {
    type Err = RangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MergedRegion::try_from(value)
    }
}

impl Display for MergedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            index_to_reference(self.first_row, self.first_col),
            index_to_reference(self.last_row, self.last_col)
        )
    }
}
