//! # Extraction Definitions
//!
//! Declarative description of what to pull out of a workbook: which sheets, which tables inside
//! them, which header columns, and which loose key/value cells become metadata.
use crate::extraction::GenericRowParser;
use crate::extraction::RowParser;
use crate::header::HeaderMatcher;
use crate::parser::NumberLocale;
use crate::record::Value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::criteria::SheetFilter;
use std::fmt::Debug;

/// Turns the value cell of a metadata lookup into a metadata value.
pub type MetadataExtractor = Box<dyn Fn(&Cell) -> anyhow::Result<Value>>;

/// Where the value of a metadata entry sits relative to its key cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueLocation {
    PreviousRow,
    NextRow,
    PreviousCell,
    SameCell,
    NextCell,
}

impl ValueLocation {
    /// Position of the value cell for a key cell at (row, col), if it is inside the grid.
    pub fn resolve(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        match self {
            Self::PreviousRow => Some((row.checked_sub(1)?, col)),
            Self::NextRow => Some((row + 1, col)),
            Self::PreviousCell => Some((row, col.checked_sub(1)?)),
            Self::SameCell => Some((row, col)),
            Self::NextCell => Some((row, col + 1)),
        }
    }
}

/// A key/value pair found somewhere in the sheet, outside of any table.
pub struct MetadataEntry {
    name: String,
    key: String,
    location: ValueLocation,
    extractor: MetadataExtractor,
}

impl MetadataEntry {
    /// Looks for the first cell containing `key` and stores the cell at `location` under `name`.
    ///
    /// The value is coerced like any table cell; cells that coerce to nothing store their text.
    pub fn new(name: &str, key: &str, location: ValueLocation) -> Self {
        Self {
            name: name.to_owned(),
            key: key.to_owned(),
            location,
            extractor: Box::new(|cell: &Cell| Ok(Value::from_cell(cell).unwrap_or_else(|| Value::from(cell.to_string())))),
        }
    }

    /// Replaces the value extractor. An error from it aborts the whole workbook.
    pub fn extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&Cell) -> anyhow::Result<Value> + 'static,
    {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn location(&self) -> ValueLocation {
        self.location
    }

    pub(crate) fn extract(&self, cell: &Cell) -> anyhow::Result<Value> {
        (self.extractor)(cell)
    }
}

impl Debug for MetadataEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataEntry")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

fn push_unique(matchers: &mut Vec<HeaderMatcher>, additions: Vec<HeaderMatcher>) {
    for matcher in additions {
        if !matchers.contains(&matcher) {
            matchers.push(matcher);
        }
    }
}

/// One table inside a sheet.
pub struct TableSpec<R> {
    required: Vec<HeaderMatcher>,
    optional: Vec<HeaderMatcher>,
    ignored: Vec<HeaderMatcher>,
    anchor: Option<String>,
    has_divider: bool,
    allowed_dividers: Vec<HeaderMatcher>,
    row_parser: Box<dyn RowParser<R>>,
}

impl<R> TableSpec<R> {
    /// A table recognized by its required header columns, emitting denormalized records.
    ///
    /// A table without required columns has no header row to find; it is reported as a table
    /// fault and yields no records.
    pub fn new(required: Vec<HeaderMatcher>) -> Self {
        let mut spec = Self {
            required: Vec::new(),
            optional: Vec::new(),
            ignored: Vec::new(),
            anchor: None,
            has_divider: false,
            allowed_dividers: Vec::new(),
            row_parser: Box::new(GenericRowParser),
        };
        push_unique(&mut spec.required, required);
        spec
    }

    pub fn optional(mut self, matchers: Vec<HeaderMatcher>) -> Self {
        push_unique(&mut self.optional, matchers);
        self
    }

    /// Columns left out of the records and of uncaptured header reporting.
    pub fn ignored(mut self, matchers: Vec<HeaderMatcher>) -> Self {
        push_unique(&mut self.ignored, matchers);
        self
    }

    /// Literal text, matched case-insensitively, that marks the start of the table.
    pub fn anchor(mut self, anchor: &str) -> Self {
        self.anchor = Some(anchor.to_owned());
        self
    }

    pub fn with_divider(mut self, has_divider: bool) -> Self {
        self.has_divider = has_divider;
        self
    }

    /// Divider rows must match one of these to update the current divider.
    pub fn allowed_dividers(mut self, matchers: Vec<HeaderMatcher>) -> Self {
        push_unique(&mut self.allowed_dividers, matchers);
        self
    }

    pub fn row_parser(mut self, row_parser: impl RowParser<R> + 'static) -> Self {
        self.row_parser = Box::new(row_parser);
        self
    }

    pub fn required_matchers(&self) -> &[HeaderMatcher] {
        &self.required
    }

    pub fn optional_matchers(&self) -> &[HeaderMatcher] {
        &self.optional
    }

    pub fn ignored_matchers(&self) -> &[HeaderMatcher] {
        &self.ignored
    }

    pub fn allowed_divider_matchers(&self) -> &[HeaderMatcher] {
        &self.allowed_dividers
    }

    /// Required then optional matchers, without duplicates.
    pub fn all_matchers(&self) -> Vec<HeaderMatcher> {
        let mut matchers = self.required.clone();
        push_unique(&mut matchers, self.optional.clone());
        matchers
    }

    pub fn anchor_text(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn has_divider(&self) -> bool {
        self.has_divider
    }

    pub fn parser(&self) -> &dyn RowParser<R> {
        self.row_parser.as_ref()
    }
}

impl<R> Debug for TableSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSpec")
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("ignored", &self.ignored)
            .field("anchor", &self.anchor)
            .field("has_divider", &self.has_divider)
            .field("allowed_dividers", &self.allowed_dividers)
            .finish_non_exhaustive()
    }
}

/// Tables and metadata of the sheets accepted by a filter.
#[derive(Debug)]
pub struct SheetSpec<R> {
    filter: SheetFilter,
    tables: Vec<TableSpec<R>>,
    metadata: Vec<MetadataEntry>,
}

impl<R> SheetSpec<R> {
    pub fn new(filter: SheetFilter, tables: Vec<TableSpec<R>>) -> Self {
        Self {
            filter,
            tables,
            metadata: Vec::new(),
        }
    }

    pub fn metadata(mut self, entry: MetadataEntry) -> Self {
        self.metadata.push(entry);
        self
    }

    pub fn filter(&self) -> &SheetFilter {
        &self.filter
    }

    pub fn tables(&self) -> &[TableSpec<R>] {
        &self.tables
    }

    pub fn metadata_entries(&self) -> &[MetadataEntry] {
        &self.metadata
    }
}

/// Top-level definition. Each sheet uses the first sheet spec whose filter accepts it.
#[derive(Debug)]
pub struct WorkbookSpec<R> {
    sheets: Vec<SheetSpec<R>>,
    include_hidden: bool,
    locale: NumberLocale,
}

impl<R> WorkbookSpec<R> {
    pub fn new(sheets: Vec<SheetSpec<R>>) -> Self {
        Self {
            sheets,
            include_hidden: false,
            locale: NumberLocale::default(),
        }
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Separators used by numeric field parsers when numbers are stored as text.
    pub fn locale(mut self, locale: NumberLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn sheets(&self) -> &[SheetSpec<R>] {
        &self.sheets
    }

    pub fn includes_hidden(&self) -> bool {
        self.include_hidden
    }

    pub fn number_locale(&self) -> NumberLocale {
        self.locale
    }
}
