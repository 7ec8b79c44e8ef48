//! # Exception Collector
//!
//! Append-only log of structured failures. Extraction keeps going after a fault is registered,
//! so callers get partial results plus this log and must check [`ExceptionCollector::has_critical`]
//! before trusting that the result set is complete.
use crate::parser::CellParserError;
use crate::record::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

/// Ordered from most to least severe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// Where a fault happened. Row numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub sheet_name: String,
    pub row_number: Option<usize>,
}

impl Location {
    pub fn sheet(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_owned(),
            row_number: None,
        }
    }

    pub fn row(sheet_name: &str, row_number: usize) -> Self {
        Self {
            sheet_name: sheet_name.to_owned(),
            row_number: Some(row_number),
        }
    }
}

/// A header-row column no matcher claimed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncapturedHeader {
    pub name: String,
    /// 0-based column index
    pub index: usize,
}

/// Every unclaimed column of one table; never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncapturedHeaders(Vec<UncapturedHeader>);

impl UncapturedHeaders {
    pub fn new(headers: Vec<UncapturedHeader>) -> Option<Self> {
        (!headers.is_empty()).then_some(Self(headers))
    }

    pub fn headers(&self) -> &[UncapturedHeader] {
        &self.0
    }
}

impl Display for UncapturedHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<String> = self.0.iter().map(|it| format!("{} @ {}", it.name, it.index + 1)).collect();
        write!(f, "{}", entries.join(", "))
    }
}

/// Named faults raised while extracting.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Fault {
    #[error(transparent)]
    CellParser(#[from] CellParserError),

    #[error("{0}")]
    TableParser(String),

    #[error("{0}")]
    SheetParser(String),

    #[error("{0}")]
    UncapturedHeaders(UncapturedHeaders),

    /// Anything the extraction did not anticipate.
    #[error("{0}")]
    Uncategorized(String),
}

impl Fault {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CellParser(_) => "CellParserException",
            Self::TableParser(_) => "TableParserException",
            Self::SheetParser(_) => "SheetParserException",
            Self::UncapturedHeaders(_) => "UncapturedHeadersException",
            Self::Uncategorized(_) => "UncategorizedException",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Uncategorized(_) => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

/// One registered fault.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionRecord {
    pub fault: Fault,
    pub location: Option<Location>,
}

impl ExceptionRecord {
    pub fn kind(&self) -> &'static str {
        self.fault.kind()
    }

    pub fn severity(&self) -> Severity {
        self.fault.severity()
    }

    pub fn message(&self) -> String {
        self.fault.to_string()
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Severity::Critical
    }
}

/// Collects faults for one parse invocation.
#[derive(Clone, Debug, Default)]
pub struct ExceptionCollector {
    records: Vec<ExceptionRecord>,
}

impl ExceptionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fault: impl Into<Fault>, location: Option<Location>) {
        let record = ExceptionRecord {
            fault: fault.into(),
            location,
        };
        let sheet = record.location.as_ref().map(|location| location.sheet_name.as_str());
        let row = record.location.as_ref().and_then(|location| location.row_number);
        match record.severity() {
            Severity::Critical => tracing::error!(kind = record.kind(), sheet, row, "{}", record.fault),
            Severity::Warning => tracing::warn!(kind = record.kind(), sheet, row, "{}", record.fault),
        }
        self.records.push(record);
    }

    /// Registers an error raised by caller code.
    ///
    /// Named faults keep their kind; anything else becomes a critical uncategorized entry.
    pub fn register_error(&mut self, error: anyhow::Error, location: Option<Location>) {
        let error = match error.downcast::<Fault>() {
            Ok(fault) => return self.register(fault, location),
            Err(error) => error,
        };
        match error.downcast::<CellParserError>() {
            Ok(fault) => self.register(fault, location),
            Err(error) => self.register(Fault::Uncategorized(format!("{:#}", error)), location),
        }
    }

    pub fn has_critical(&self) -> bool {
        self.records.iter().any(ExceptionRecord::is_critical)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in registration order.
    pub fn records(&self) -> &[ExceptionRecord] {
        &self.records
    }

    /// Flattens every record into a map, critical entries first.
    ///
    /// Keys are `kind`, `severity` and `message`, plus `sheetName` and `rowNumber` when the
    /// record is located.
    pub fn export(&self) -> Vec<BTreeMap<String, Value>> {
        let mut records: Vec<&ExceptionRecord> = self.records.iter().collect();
        records.sort_by_key(|record| record.severity());
        records
            .into_iter()
            .map(|record| {
                let mut data = BTreeMap::new();
                data.insert("kind".to_owned(), Value::from(record.kind()));
                data.insert("severity".to_owned(), Value::from(record.severity().to_string()));
                data.insert("message".to_owned(), Value::from(record.message()));
                if let Some(location) = &record.location {
                    data.insert("sheetName".to_owned(), Value::from(location.sheet_name.as_str()));
                    if let Some(row_number) = location.row_number {
                        data.insert("rowNumber".to_owned(), Value::from(row_number));
                    }
                }
                data
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserKind;
    use anyhow::anyhow;

    #[test]
    fn uncaptured_headers_message() {
        let headers = UncapturedHeaders::new(vec![
            UncapturedHeader {
                name: "note".to_owned(),
                index: 3,
            },
            UncapturedHeader {
                name: "extra".to_owned(),
                index: 5,
            },
        ])
        .unwrap();
        assert_eq!(Fault::UncapturedHeaders(headers).to_string(), "note @ 4, extra @ 6");
        assert_eq!(UncapturedHeaders::new(vec![]), None);
    }

    #[test]
    fn register_error_keeps_named_faults() {
        let mut collector = ExceptionCollector::new();
        let cell_error = CellParserError {
            parser: ParserKind::Double,
            column_name: Some("number".to_owned()),
            column_index: Some(1),
            cell_value: None,
        };
        collector.register_error(anyhow::Error::new(cell_error), Some(Location::row("Sheet1", 3)));
        collector.register_error(anyhow::Error::new(Fault::TableParser("no header".to_owned())), None);
        collector.register_error(anyhow!("boom"), Some(Location::sheet("Sheet1")));

        let kinds: Vec<&str> = collector.records().iter().map(ExceptionRecord::kind).collect();
        assert_eq!(kinds, vec!["CellParserException", "TableParserException", "UncategorizedException"]);
        assert!(collector.has_critical());
        assert_eq!(collector.len(), 3);
    }

    #[test]
    fn export_puts_critical_first() {
        let mut collector = ExceptionCollector::new();
        assert!(collector.is_empty());
        collector.register(Fault::SheetParser("Could not locate any tables".to_owned()), Some(Location::sheet("a")));
        collector.register(Fault::Uncategorized("boom".to_owned()), None);
        collector.register(Fault::TableParser("missing".to_owned()), Some(Location::row("b", 7)));

        let exported = collector.export();
        assert_eq!(exported.len(), 3);
        assert_eq!(exported[0].get("severity"), Some(&Value::from("CRITICAL")));
        assert_eq!(exported[0].get("sheetName"), None);
        assert_eq!(exported[1].get("kind"), Some(&Value::from("SheetParserException")));
        assert_eq!(exported[1].get("rowNumber"), None);
        assert_eq!(exported[2].get("rowNumber"), Some(&Value::Integer(7)));
        assert_eq!(exported[2].get("message"), Some(&Value::from("missing")));
    }
}
