//! # Field Parsers
//!
//! Typed accessors over single cells. `try_parse` never fails and returns `None` for absent or
//! unparsable input, `parse` turns that into a [`CellParserError`].
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::fmt::Display;
use thiserror::Error;

/// Identifies which field parser failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParserKind {
    String,
    Double,
    Integer,
    DateTime,
    DateTimeFormat,
}

impl Display for ParserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "StringCellParser",
            Self::Double => "DoubleCellParser",
            Self::Integer => "IntCellParser",
            Self::DateTime => "DateTimeCellParser",
            Self::DateTimeFormat => "DateTimeFormatCellParser",
        };
        write!(f, "{}", name)
    }
}

/// A required field was empty or held a value its parser could not read.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error(
    "{} failed to parse field '{}' at column index {}: {}",
    .parser,
    or_unknown(.column_name),
    or_unknown(.column_index),
    reason(.cell_value)
)]
pub struct CellParserError {
    pub parser: ParserKind,
    pub column_name: Option<String>,
    pub column_index: Option<usize>,
    /// Offending text; `None` when the cell was empty.
    pub cell_value: Option<String>,
}

fn or_unknown<T: Display>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_else(|| "unknown".to_owned())
}

fn reason(cell_value: &Option<String>) -> String {
    match cell_value {
        Some(value) => format!("Invalid value '{}'", value),
        None => "Cell is empty".to_owned(),
    }
}

impl CellParserError {
    pub fn new(parser: ParserKind, cell: Option<&Cell>) -> Self {
        Self {
            parser,
            column_name: None,
            column_index: None,
            cell_value: cell.filter(|cell| !cell.is_blank()).map(ToString::to_string),
        }
    }

    /// Attaches the resolved column the failing cell was read from.
    pub fn at_column(mut self, name: &str, index: usize) -> Self {
        self.column_name = Some(name.to_owned());
        self.column_index = Some(index);
        self
    }
}

/// Separators used when numbers arrive as text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NumberLocale {
    pub decimal_separator: char,
    pub grouping_separator: Option<char>,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            grouping_separator: Some(','),
        }
    }
}

impl NumberLocale {
    pub fn new(decimal_separator: char, grouping_separator: Option<char>) -> Self {
        Self {
            decimal_separator,
            grouping_separator,
        }
    }

    /// Rewrites localized number text into the form Rust's parsers accept.
    fn normalize(&self, text: &str) -> String {
        text.trim()
            .chars()
            .filter(|c| Some(*c) != self.grouping_separator && !c.is_whitespace())
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    pub fn parse_f64(&self, text: &str) -> Option<f64> {
        let normalized = self.normalize(text);
        if normalized.is_empty() {
            return None;
        }
        normalized.parse::<f64>().ok().filter(|value| value.is_finite())
    }

    pub fn parse_i64(&self, text: &str) -> Option<i64> {
        self.normalize(text).parse::<i64>().ok()
    }
}

/// A typed accessor over a possibly missing cell.
pub trait CellParser {
    type Output;

    fn kind(&self) -> ParserKind;

    fn try_parse(&self, cell: Option<&Cell>) -> Option<Self::Output>;

    fn parse(&self, cell: Option<&Cell>) -> Result<Self::Output, CellParserError> {
        self.try_parse(cell).ok_or_else(|| CellParserError::new(self.kind(), cell))
    }
}

fn is_plain_number(cell: &Cell) -> bool {
    cell.effective_type() == CellType::Number && !cell.is_date_formatted()
}

/// Trimmed text of any non-blank cell.
#[derive(Copy, Clone, Debug, Default)]
pub struct StringCellParser;

impl CellParser for StringCellParser {
    type Output = String;

    fn kind(&self) -> ParserKind {
        ParserKind::String
    }

    fn try_parse(&self, cell: Option<&Cell>) -> Option<String> {
        let text = cell?.to_string();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_owned())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct DoubleCellParser {
    locale: NumberLocale,
}

impl DoubleCellParser {
    pub fn new(locale: NumberLocale) -> Self {
        Self { locale }
    }
}

impl CellParser for DoubleCellParser {
    type Output = f64;

    fn kind(&self) -> ParserKind {
        ParserKind::Double
    }

    fn try_parse(&self, cell: Option<&Cell>) -> Option<f64> {
        let cell = cell?;
        if is_plain_number(cell) {
            return cell.number_value();
        }
        match cell.effective_type() {
            CellType::String => self.locale.parse_f64(cell.string_value()?),
            _ => None,
        }
    }
}

/// Whole numbers only; a number with a fractional part is rejected, never rounded.
#[derive(Copy, Clone, Debug, Default)]
pub struct IntCellParser {
    locale: NumberLocale,
}

impl IntCellParser {
    pub fn new(locale: NumberLocale) -> Self {
        Self { locale }
    }
}

impl CellParser for IntCellParser {
    type Output = i64;

    fn kind(&self) -> ParserKind {
        ParserKind::Integer
    }

    fn try_parse(&self, cell: Option<&Cell>) -> Option<i64> {
        let cell = cell?;
        if is_plain_number(cell) {
            return cell.number_value().and_then(whole_number);
        }
        match cell.effective_type() {
            CellType::String => self.locale.parse_i64(cell.string_value()?),
            _ => None,
        }
    }
}

/// Returns the value as an integer if it has no fractional part and fits in an i64.
pub(crate) fn whole_number(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Date-formatted numeric cells only.
#[derive(Copy, Clone, Debug, Default)]
pub struct DateTimeCellParser;

impl CellParser for DateTimeCellParser {
    type Output = NaiveDateTime;

    fn kind(&self) -> ParserKind {
        ParserKind::DateTime
    }

    fn try_parse(&self, cell: Option<&Cell>) -> Option<NaiveDateTime> {
        let cell = cell?;
        match cell.effective_type() {
            CellType::Number => cell.datetime_value(),
            _ => None,
        }
    }
}

/// Date-formatted numeric cells, or text in a `chrono` format such as `"%d/%m/%Y"`.
///
/// Text that only carries a date is read as midnight of that day.
#[derive(Clone, Debug)]
pub struct DateTimeFormatCellParser {
    format: String,
}

impl DateTimeFormatCellParser {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_owned(),
        }
    }
}

impl CellParser for DateTimeFormatCellParser {
    type Output = NaiveDateTime;

    fn kind(&self) -> ParserKind {
        ParserKind::DateTimeFormat
    }

    fn try_parse(&self, cell: Option<&Cell>) -> Option<NaiveDateTime> {
        let cell = cell?;
        if cell.effective_type() == CellType::Number && cell.is_date_formatted() {
            return cell.datetime_value();
        }
        let text = cell.to_string();
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, &self.format).ok().or_else(|| {
            NaiveDate::parse_from_str(text, &self.format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::NumberFormat;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn string_parser_trims_and_rejects_blank() {
        let parser = StringCellParser;
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "  abc "))), Some("abc".to_owned()));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, 3.0))), Some("3".to_owned()));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "   "))), None);
        assert_eq!(parser.try_parse(None), None);
    }

    #[test]
    fn integer_parser_never_rounds() {
        let parser = IntCellParser::default();
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, 3.0))), Some(3));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, 3.14))), None);
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, " 1,204 "))), Some(1204));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "12.5"))), None);
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, true))), None);
    }

    #[test]
    fn double_parser_reads_localized_text() {
        let parser = DoubleCellParser::default();
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, 3.14))), Some(3.14));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "1,234.5"))), Some(1234.5));

        let european = DoubleCellParser::new(NumberLocale::new(',', Some('.')));
        assert_eq!(european.try_parse(Some(&Cell::new(0, 0, "1.234,5"))), Some(1234.5));

        let date = Cell::new(0, 0, 45000.0).with_format(NumberFormat::Date1900);
        assert_eq!(parser.try_parse(Some(&date)), None);
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "n/a"))), None);
    }

    #[test]
    fn datetime_parser_requires_date_format() {
        let parser = DateTimeCellParser;
        let value = datetime(2021, 3, 4, 10, 30);
        assert_eq!(parser.try_parse(Some(&Cell::date(0, 0, value))), Some(value));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, 44259.0))), None);
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "2021-03-04"))), None);
    }

    #[test]
    fn datetime_format_parser_falls_back_to_date() {
        let parser = DateTimeFormatCellParser::new("%d/%m/%Y");
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "04/03/2021"))), Some(datetime(2021, 3, 4, 0, 0)));
        assert_eq!(parser.try_parse(Some(&Cell::new(0, 0, "2021-03-04"))), None);

        let parser = DateTimeFormatCellParser::new("%Y-%m-%d %H:%M");
        assert_eq!(
            parser.try_parse(Some(&Cell::new(0, 0, "2021-03-04 10:30"))),
            Some(datetime(2021, 3, 4, 10, 30))
        );
        let value = datetime(2020, 1, 1, 0, 0);
        assert_eq!(parser.try_parse(Some(&Cell::date(0, 0, value))), Some(value));
    }

    #[test]
    fn required_parse_reports_reason() {
        let error = IntCellParser::default().parse(Some(&Cell::new(3, 2, "abc"))).unwrap_err();
        let error = error.at_column("number", 2);
        assert_eq!(
            error.to_string(),
            "IntCellParser failed to parse field 'number' at column index 2: Invalid value 'abc'"
        );

        let error = StringCellParser.parse(Some(&Cell::blank(0, 0))).unwrap_err();
        assert_eq!(
            error.to_string(),
            "StringCellParser failed to parse field 'unknown' at column index unknown: Cell is empty"
        );
    }
}
