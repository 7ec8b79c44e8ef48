//! # Sheet Refinery
//!
//! Extracts records from semi-structured spreadsheet grids: sheets holding one or more tables,
//! header rows that are not on the first line, merged header cells, divider rows and free-form
//! metadata around the tables.
//!
//! ## Features
//!
//! - **Table discovery**: Tables start at an anchor text or at their header row and run until
//!   the next table starts
//! - **Header matching**: Exact, substring, regex, merged and priority-ordered header matchers
//! - **Row strategies**: Denormalized key/value records by default, or typed records built by a
//!   caller-supplied [`RowParser`] with grouping and backfill
//! - **Partial failure**: Cell, table and sheet problems are collected as warnings while the
//!   rest of the workbook keeps parsing; only unexpected errors abort
//!
//! ## Usage
//!
//! Describe the workbook with a [`WorkbookSpec`], materialize its grid as a [`Workbook`] (for
//! instance a [`MemoryWorkbook`]) and call [`extract`]. The returned [`Extraction`] carries the
//! records and an [`ExceptionCollector`] with everything that went wrong.
mod error;

pub mod definition;
pub mod exception;
pub mod extraction;
pub mod header;
pub mod parser;
pub mod record;
pub mod spreadsheet;

pub use crate::definition::MetadataEntry;
pub use crate::definition::SheetSpec;
pub use crate::definition::TableSpec;
pub use crate::definition::ValueLocation;
pub use crate::definition::WorkbookSpec;
pub use crate::error::RefineryError;
pub use crate::exception::ExceptionCollector;
pub use crate::exception::ExceptionRecord;
pub use crate::exception::Fault;
pub use crate::exception::Location;
pub use crate::exception::Severity;
pub use crate::extraction::workbook::extract;
pub use crate::extraction::workbook::Extraction;
pub use crate::extraction::workbook::WorkbookParser;
pub use crate::extraction::GenericRowParser;
pub use crate::extraction::RowContext;
pub use crate::extraction::RowParser;
pub use crate::header::HeaderMatcher;
pub use crate::parser::CellParserError;
pub use crate::parser::NumberLocale;
pub use crate::record::Metadata;
pub use crate::record::ParsedRecord;
pub use crate::record::Record;
pub use crate::record::TypedRecord;
pub use crate::record::Value;
pub use crate::spreadsheet::cell::Cell;
pub use crate::spreadsheet::cell::CellValue;
pub use crate::spreadsheet::criteria::SheetFilter;
pub use crate::spreadsheet::sheet::MemorySheet;
pub use crate::spreadsheet::sheet::MemoryWorkbook;
pub use crate::spreadsheet::Sheet;
pub use crate::spreadsheet::Workbook;
