use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use std::fmt::Display;

/// Number formats that decide how a numeric cell value is interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum NumberFormat {
    #[default]
    General,
    /// Date/time values stored as numbers from 1900 epoch
    DateTime1900,
    /// Date values stored as numbers from 1900 epoch
    Date1900,
    /// Time values stored as numbers from 1900 epoch
    Time1900,
    /// Date/time values stored as numbers from 1904 epoch
    DateTime1904,
    /// Date values stored as numbers from 1904 epoch
    Date1904,
    /// Time values stored as numbers from 1904 epoch
    Time1904,
}

impl NumberFormat {
    /// Maps built-in Excel number format IDs to a number format.
    pub fn from_builtin_id(id: u32, is_1904: bool) -> Self {
        match id {
            22 => if is_1904 { Self::DateTime1904 } else { Self::DateTime1900 },
            14..=17 => if is_1904 { Self::Date1904 } else { Self::Date1900 },
            18..=21 | 45..=47 => if is_1904 { Self::Time1904 } else { Self::Time1900 },
            _ => Self::General,
        }
    }

    /// Parses a custom number format code (e.g. "yyyy-mm-dd hh:mm").
    /// Literals, escapes and bracketed sections are ignored.
    pub fn from_format_code(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::DateTime1900,
            (true, true, true) => Self::DateTime1904,
            (true, false, false) => Self::Date1900,
            (true, false, true) => Self::Date1904,
            (false, true, false) => Self::Time1900,
            (false, true, true) => Self::Time1904,
            (false, false, _) => Self::General,
        }
    }

    /// Returns true for every date, date/time or time format.
    pub fn is_date(&self) -> bool {
        *self != Self::General
    }

    /// Returns true if serial numbers count from the 1904 epoch.
    pub fn is_1904(&self) -> bool {
        matches!(self, Self::DateTime1904 | Self::Date1904 | Self::Time1904)
    }
}

/// Type tags a cell can report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellType {
    Blank,
    String,
    Number,
    Boolean,
    Error,
    /// Formula cell; the cached result carries the effective type
    Formula,
}

/// Raw content of a cell. For formula cells this is the last computed result.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Blank,
    String(String),
    Number(f64),
    Boolean(bool),
    /// Error literal such as "#DIV/0!"
    Error(String),
}

impl CellValue {
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Blank => CellType::Blank,
            CellValue::String(_) => CellType::String,
            CellValue::Number(_) => CellType::Number,
            CellValue::Boolean(_) => CellType::Boolean,
            CellValue::Error(_) => CellType::Error,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// Represents a single cell in a spreadsheet with position, value and number format.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell value, or the cached result of its formula
    pub value: CellValue,
    /// Formula text, if the cell holds a formula
    pub formula: Option<String>,
    /// Number format applied to numeric values
    pub format: NumberFormat,
}

impl Cell {
    pub fn new(row: usize, col: usize, value: impl Into<CellValue>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
            formula: None,
            format: NumberFormat::General,
        }
    }

    pub fn blank(row: usize, col: usize) -> Self {
        Self::new(row, col, CellValue::Blank)
    }

    /// Creates a date-formatted numeric cell in the 1900 date system.
    pub fn date(row: usize, col: usize, datetime: NaiveDateTime) -> Self {
        let format = if datetime.num_seconds_from_midnight() == 0 {
            NumberFormat::Date1900
        } else {
            NumberFormat::DateTime1900
        };
        Self::new(row, col, to_serial(datetime, false)).with_format(format)
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    /// Marks the cell as a formula whose cached result is the current value.
    pub fn with_formula(mut self, formula: &str) -> Self {
        self.formula = Some(formula.to_owned());
        self
    }

    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Returns the reported type tag; formula cells report `Formula`.
    pub fn cell_type(&self) -> CellType {
        if self.formula.is_some() {
            CellType::Formula
        } else {
            self.value.cell_type()
        }
    }

    /// Returns the type of the value itself, resolving formulas to their cached result.
    pub fn effective_type(&self) -> CellType {
        self.value.cell_type()
    }

    /// Returns true for numeric values carrying a date, date/time or time format.
    pub fn is_date_formatted(&self) -> bool {
        matches!(self.value, CellValue::Number(_)) && self.format.is_date()
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            CellValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn number_value(&self) -> Option<f64> {
        match self.value {
            CellValue::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn boolean_value(&self) -> Option<bool> {
        match self.value {
            CellValue::Boolean(value) => Some(value),
            _ => None,
        }
    }

    /// Converts a date-formatted numeric value to a date/time.
    pub fn datetime_value(&self) -> Option<NaiveDateTime> {
        match self.value {
            CellValue::Number(value) if self.format.is_date() => from_serial(value, self.format.is_1904()),
            _ => None,
        }
    }

    /// Returns true if the cell is blank or only holds whitespace.
    pub fn is_blank(&self) -> bool {
        match &self.value {
            CellValue::Blank => true,
            CellValue::String(value) => value.trim().is_empty(),
            _ => false,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            CellValue::Blank => Ok(()),
            CellValue::String(value) | CellValue::Error(value) => write!(f, "{}", value),
            CellValue::Boolean(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
            CellValue::Number(value) => match self.datetime_value() {
                Some(datetime) => match self.format {
                    NumberFormat::Date1900 | NumberFormat::Date1904 => write!(f, "{}", datetime.format("%Y-%m-%d")),
                    NumberFormat::Time1900 | NumberFormat::Time1904 => write!(f, "{}", datetime.format("%H:%M:%S")),
                    _ => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
                },
                None => write!(f, "{}", value),
            },
        }
    }
}

/// Day zero of the 1900 date system, as used by modern spreadsheet applications.
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("NaiveDate Literal")
}

/// Largest serial a spreadsheet can hold as a date: 9999-12-31.
const MAX_SERIAL: f64 = 2_958_465.0;

/// Converts an Excel serial number to a date/time.
/// Handles the Lotus 1-2-3 leap year bug for the 1900 epoch.
/// Serials outside `0..=9999-12-31` have no date.
pub fn from_serial(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1_462
    } else if days < 60 {
        1
    } else {
        0
    };
    let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
    let midnight = epoch()
        .checked_add_signed(Duration::try_days(days.checked_add(offset)?)?)?
        .and_hms_opt(0, 0, 0)?;
    midnight.checked_add_signed(Duration::milliseconds(milliseconds))
}

/// Converts a date/time to an Excel serial number.
pub fn to_serial(datetime: NaiveDateTime, is_1904: bool) -> f64 {
    let mut days = (datetime.date() - epoch()).num_days();
    if is_1904 {
        days -= 1_462;
    } else if days <= 60 {
        days -= 1;
    }
    let time = datetime.time();
    let seconds = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    days as f64 + seconds / 86_400f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn number_format_from_code() {
        assert_eq!(NumberFormat::from_format_code("yyyy-mm-dd", false), NumberFormat::Date1900);
        assert_eq!(NumberFormat::from_format_code("dd/mm/yyyy hh:mm", true), NumberFormat::DateTime1904);
        assert_eq!(NumberFormat::from_format_code("hh:mm:ss", false), NumberFormat::Time1900);
        assert_eq!(NumberFormat::from_format_code("#,##0.00", false), NumberFormat::General);
        assert_eq!(NumberFormat::from_format_code("[Red]0.00\"days\"", false), NumberFormat::General);
    }

    #[test]
    fn number_format_from_builtin_id() {
        assert_eq!(NumberFormat::from_builtin_id(14, false), NumberFormat::Date1900);
        assert_eq!(NumberFormat::from_builtin_id(22, true), NumberFormat::DateTime1904);
        assert_eq!(NumberFormat::from_builtin_id(2, false), NumberFormat::General);
    }

    #[test]
    fn serial_conversion() {
        assert_eq!(from_serial(1.0, false), Some(datetime(1900, 1, 1, 0, 0)));
        assert_eq!(from_serial(61.0, false), Some(datetime(1900, 3, 1, 0, 0)));
        assert_eq!(from_serial(44197.5, false), Some(datetime(2021, 1, 1, 12, 0)));
        assert_eq!(from_serial(0.0, true), Some(datetime(1904, 1, 1, 0, 0)));
        assert_eq!(from_serial(-1.0, false), None);

        let value = datetime(2021, 6, 15, 8, 30);
        assert_eq!(from_serial(to_serial(value, false), false), Some(value));
        assert_eq!(from_serial(to_serial(value, true), true), Some(value));
    }

    #[test]
    fn out_of_range_serial_has_no_date() {
        assert_eq!(from_serial(2_958_465.0, false), Some(datetime(9999, 12, 31, 0, 0)));
        assert_eq!(from_serial(2_958_466.0, false), None);
        assert_eq!(from_serial(1e300, true), None);
        assert_eq!(from_serial(9.3e18, false), None);
        assert_eq!(from_serial(f64::NAN, false), None);

        let cell = Cell::new(0, 0, 1e300).with_format(NumberFormat::Date1904);
        assert!(cell.is_date_formatted());
        assert_eq!(cell.datetime_value(), None);
        assert_eq!(cell.to_string(), format!("{}", 1e300));
    }

    #[test]
    fn formula_cell_reports_cached_type() {
        let cell = Cell::new(0, 0, 3.0).with_formula("1+2");
        assert_eq!(cell.cell_type(), CellType::Formula);
        assert_eq!(cell.effective_type(), CellType::Number);
    }

    #[test]
    fn display() {
        assert_eq!(Cell::new(0, 0, 3.0).to_string(), "3");
        assert_eq!(Cell::new(0, 0, 3.25).to_string(), "3.25");
        assert_eq!(Cell::new(0, 0, true).to_string(), "TRUE");
        assert_eq!(Cell::date(0, 0, datetime(2021, 1, 1, 0, 0)).to_string(), "2021-01-01");
        assert_eq!(Cell::date(0, 0, datetime(2021, 1, 1, 9, 5)).to_string(), "2021-01-01 09:05:00");
        assert_eq!(Cell::blank(0, 0).to_string(), "");
        assert_eq!(Cell::new(2, 1, "x").reference(), "B3");
    }
}
