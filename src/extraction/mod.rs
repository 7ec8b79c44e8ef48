//! # Extraction Pipeline
//!
//! Workbook → sheet → table → row traversal. Row strategies plug in through [`RowParser`] and
//! read cells through [`RowContext`].
use crate::header::resolver::ColumnIndexMap;
use crate::header::HeaderMatcher;
use crate::parser::CellParser;
use crate::parser::CellParserError;
use crate::parser::DateTimeCellParser;
use crate::parser::DateTimeFormatCellParser;
use crate::parser::DoubleCellParser;
use crate::parser::IntCellParser;
use crate::parser::NumberLocale;
use crate::parser::StringCellParser;
use crate::record::Metadata;
use crate::record::ParsedRecord;
use crate::record::Record;
use crate::record::TypedRecord;
use crate::record::Value;
use crate::record::ROW_NUMBER;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::merged::MergedCells;
use crate::spreadsheet::Row;
use chrono::NaiveDateTime;

pub mod locator;
pub mod sheet;
pub mod table;
pub mod workbook;

/// Caller-defined conversion of table rows into records.
///
/// Only `to_record` is mandatory. Errors returned from it are registered against the row, which
/// then falls back to a denormalized record.
pub trait RowParser<R> {
    fn to_record(&self, row: &RowContext<'_>) -> anyhow::Result<ParsedRecord<R>>;

    /// Rows for which this returns true produce nothing.
    fn skip(&self, _row: &RowContext<'_>) -> bool {
        false
    }

    /// Whether `current` belongs to the same group as the record right before it.
    fn should_group(&self, _current: &TypedRecord<R>, _previous: &TypedRecord<R>) -> bool {
        false
    }

    /// Completes a grouped record from its predecessor, e.g. a date only given on the first row.
    fn backfill(&self, current: TypedRecord<R>, _previous: &TypedRecord<R>) -> TypedRecord<R> {
        current
    }

    /// Whether typed records keep a denormalized snapshot of their row.
    fn store_raw_data(&self) -> bool {
        true
    }
}

/// Emits every row as a denormalized record.
#[derive(Copy, Clone, Debug, Default)]
pub struct GenericRowParser;

impl<R> RowParser<R> for GenericRowParser {
    fn to_record(&self, row: &RowContext<'_>) -> anyhow::Result<ParsedRecord<R>> {
        Ok(ParsedRecord::Denormalized(row.all_data()))
    }

    fn store_raw_data(&self) -> bool {
        false
    }
}

/// Everything a row strategy can see about the row it converts.
pub struct RowContext<'a> {
    pub(crate) sheet_name: &'a str,
    pub(crate) row: &'a Row,
    pub(crate) columns: &'a ColumnIndexMap,
    pub(crate) all_headers: &'a [(String, usize)],
    pub(crate) merged: &'a MergedCells<'a>,
    pub(crate) metadata: &'a Metadata,
    pub(crate) divider: Option<&'a str>,
    pub(crate) locale: NumberLocale,
}

impl<'a> RowContext<'a> {
    pub fn row(&self) -> &'a Row {
        self.row
    }

    /// 1-based row number
    pub fn row_number(&self) -> usize {
        self.row.index() + 1
    }

    pub fn sheet_name(&self) -> &'a str {
        self.sheet_name
    }

    pub fn metadata(&self) -> &'a Metadata {
        self.metadata
    }

    /// Text of the nearest divider row above this one, if any.
    pub fn divider(&self) -> Option<&'a str> {
        self.divider
    }

    /// Column bound to the matcher in the header row.
    pub fn column(&self, matcher: &HeaderMatcher) -> Option<usize> {
        self.columns.get(matcher)
    }

    /// Cell at a column, seen through merged regions.
    pub fn cell_at(&self, col: usize) -> Option<&'a Cell> {
        self.merged.resolve(self.row, col)
    }

    pub fn cell(&self, matcher: &HeaderMatcher) -> Option<&'a Cell> {
        self.column(matcher).and_then(|col| self.cell_at(col))
    }

    /// Metadata, current divider, every named header column with a value, and `row_number`.
    pub fn all_data(&self) -> Record {
        let mut data = self.metadata.all_data(self.divider);
        for (name, col) in self.all_headers {
            if let Some(value) = self.cell_at(*col).and_then(Value::from_cell) {
                data.insert(name.clone(), value);
            }
        }
        data.insert(ROW_NUMBER.to_owned(), Value::from(self.row_number()));
        data
    }

    fn required<P: CellParser>(&self, parser: &P, matcher: &HeaderMatcher) -> Result<P::Output, CellParserError> {
        parser.parse(self.cell(matcher)).map_err(|error| match self.column(matcher) {
            Some(col) => error.at_column(matcher.name(), col),
            None => CellParserError {
                column_name: Some(matcher.name().to_owned()),
                ..error
            },
        })
    }

    pub fn required_string(&self, matcher: &HeaderMatcher) -> Result<String, CellParserError> {
        self.required(&StringCellParser, matcher)
    }

    pub fn optional_string(&self, matcher: &HeaderMatcher) -> Option<String> {
        StringCellParser.try_parse(self.cell(matcher))
    }

    pub fn required_double(&self, matcher: &HeaderMatcher) -> Result<f64, CellParserError> {
        self.required(&DoubleCellParser::new(self.locale), matcher)
    }

    pub fn optional_double(&self, matcher: &HeaderMatcher) -> Option<f64> {
        DoubleCellParser::new(self.locale).try_parse(self.cell(matcher))
    }

    pub fn required_integer(&self, matcher: &HeaderMatcher) -> Result<i64, CellParserError> {
        self.required(&IntCellParser::new(self.locale), matcher)
    }

    pub fn optional_integer(&self, matcher: &HeaderMatcher) -> Option<i64> {
        IntCellParser::new(self.locale).try_parse(self.cell(matcher))
    }

    pub fn required_datetime(&self, matcher: &HeaderMatcher) -> Result<NaiveDateTime, CellParserError> {
        self.required(&DateTimeCellParser, matcher)
    }

    pub fn optional_datetime(&self, matcher: &HeaderMatcher) -> Option<NaiveDateTime> {
        DateTimeCellParser.try_parse(self.cell(matcher))
    }

    /// Reads a date-formatted cell, or text in the given `chrono` format.
    pub fn required_datetime_with_format(
        &self,
        matcher: &HeaderMatcher,
        format: &str,
    ) -> Result<NaiveDateTime, CellParserError> {
        self.required(&DateTimeFormatCellParser::new(format), matcher)
    }

    pub fn optional_datetime_with_format(&self, matcher: &HeaderMatcher, format: &str) -> Option<NaiveDateTime> {
        DateTimeFormatCellParser::new(format).try_parse(self.cell(matcher))
    }
}
