//! # Records
//!
//! Typed cell values, per-sheet metadata and the records emitted for every extracted row.
use crate::parser::whole_number;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt::Display;
use uuid::Uuid;

pub const WORKBOOK_NAME: &str = "workbook_name";
pub const SPREADSHEET_NAME: &str = "spreadsheet_name";
pub const ANCHOR: &str = "anchor";
pub const DIVIDER: &str = "divider";
pub const ROW_NUMBER: &str = "row_number";

/// Name to value view of a row. Absent values are left out, never stored as null.
pub type Record = BTreeMap<String, Value>;

/// A typed value coerced from a cell or supplied as metadata.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Coerces a cell, using the cached result for formulas.
    ///
    /// Date-formatted numbers become date/times, whole numbers become integers and strings are
    /// trimmed. Blank, whitespace-only and error cells yield `None`.
    pub fn from_cell(cell: &Cell) -> Option<Value> {
        match cell.effective_type() {
            CellType::Number => {
                if let Some(datetime) = cell.datetime_value() {
                    return Some(Value::DateTime(datetime));
                }
                let number = cell.number_value()?;
                Some(whole_number(number).map(Value::Integer).unwrap_or(Value::Float(number)))
            }
            CellType::Boolean => cell.boolean_value().map(Value::Boolean),
            CellType::String => {
                let text = cell.string_value()?.trim();
                (!text.is_empty()).then(|| Value::String(text.to_owned()))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

/// Immutable per-sheet key/value bag.
///
/// The current divider is not stored here: it changes row by row and is passed alongside.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    data: BTreeMap<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the entry added or replaced.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.get(SPREADSHEET_NAME).and_then(Value::as_str)
    }

    pub fn workbook_name(&self) -> Option<&str> {
        self.get(WORKBOOK_NAME).and_then(Value::as_str)
    }

    pub fn anchor(&self) -> Option<&str> {
        self.get(ANCHOR).and_then(Value::as_str)
    }

    /// Every entry, plus `divider` when one is current.
    pub fn all_data(&self, divider: Option<&str>) -> Record {
        let mut data = self.data.clone();
        if let Some(divider) = divider {
            data.insert(DIVIDER.to_owned(), Value::from(divider));
        }
        data
    }
}

/// A record built by a custom row strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedRecord<R> {
    pub value: R,
    /// Denormalized snapshot of the source row, if the strategy keeps one.
    pub raw_data: Option<Record>,
    /// Shared by consecutive records the strategy grouped together.
    pub group_id: Option<Uuid>,
}

impl<R> TypedRecord<R> {
    pub fn new(value: R) -> Self {
        Self {
            value,
            raw_data: None,
            group_id: None,
        }
    }
}

/// One extracted row.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedRecord<R> {
    /// Every resolvable column plus metadata. Also the fallback when a row strategy fails.
    Denormalized(Record),
    Typed(TypedRecord<R>),
}

impl<R> ParsedRecord<R> {
    pub fn typed(value: R) -> Self {
        ParsedRecord::Typed(TypedRecord::new(value))
    }

    pub fn as_denormalized(&self) -> Option<&Record> {
        match self {
            ParsedRecord::Denormalized(record) => Some(record),
            ParsedRecord::Typed(_) => None,
        }
    }

    pub fn as_typed(&self) -> Option<&TypedRecord<R>> {
        match self {
            ParsedRecord::Typed(record) => Some(record),
            ParsedRecord::Denormalized(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<Uuid> {
        self.as_typed().and_then(|record| record.group_id)
    }
}
