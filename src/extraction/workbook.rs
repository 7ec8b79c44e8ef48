use crate::definition::SheetSpec;
use crate::definition::WorkbookSpec;
use crate::exception::ExceptionCollector;
use crate::extraction::sheet::SheetParser;
use crate::record::ParsedRecord;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;

/// Records of a workbook parse together with everything that went wrong on the way.
#[derive(Debug)]
pub struct Extraction<R> {
    pub records: Vec<ParsedRecord<R>>,
    pub exceptions: ExceptionCollector,
}

/// Parses a workbook with a fresh exception collector.
pub fn extract<R>(spec: &WorkbookSpec<R>, workbook: &dyn Workbook) -> Extraction<R> {
    let mut exceptions = ExceptionCollector::new();
    let records = WorkbookParser::new(spec).parse(workbook, &mut exceptions);
    Extraction { records, exceptions }
}

/// Walks the sheets of a workbook depth first and flattens their records.
pub struct WorkbookParser<'a, R> {
    spec: &'a WorkbookSpec<R>,
}

impl<'a, R> WorkbookParser<'a, R> {
    pub fn new(spec: &'a WorkbookSpec<R>) -> Self {
        Self { spec }
    }

    /// Returns the records of every selected sheet, in workbook order.
    ///
    /// An unexpected error, such as a failing sheet filter, is registered as critical and the
    /// whole parse yields no records, including those of sheets already parsed.
    pub fn parse(&self, workbook: &dyn Workbook, collector: &mut ExceptionCollector) -> Vec<ParsedRecord<R>> {
        match self.try_parse(workbook, collector) {
            Ok(records) => records,
            Err(error) => {
                collector.register_error(error, None);
                Vec::new()
            }
        }
    }

    fn try_parse(&self, workbook: &dyn Workbook, collector: &mut ExceptionCollector) -> anyhow::Result<Vec<ParsedRecord<R>>> {
        let mut records = Vec::new();
        for sheet in workbook.sheets() {
            if sheet.is_hidden() && !self.spec.includes_hidden() {
                tracing::trace!(sheet = sheet.name(), "hidden sheet skipped");
                continue;
            }
            let Some(sheet_spec) = self.resolve_sheet_spec(sheet)? else {
                continue;
            };
            let _span = tracing::debug_span!("sheet", name = sheet.name()).entered();
            let parser = SheetParser::new(sheet_spec, sheet, workbook.name(), self.spec.number_locale());
            records.extend(parser.parse(collector)?);
        }
        Ok(records)
    }

    /// The first sheet spec whose filter accepts the sheet.
    fn resolve_sheet_spec(&self, sheet: &dyn Sheet) -> anyhow::Result<Option<&'a SheetSpec<R>>> {
        for spec in self.spec.sheets() {
            if spec.filter().accept(sheet.name())? {
                return Ok(Some(spec));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TableSpec;
    use crate::exception::Location;
    use crate::exception::Severity;
    use crate::extraction::RowContext;
    use crate::extraction::RowParser;
    use crate::header::HeaderMatcher;
    use crate::record::Record;
    use crate::record::Value;
    use crate::spreadsheet::cell::Cell;
    use crate::spreadsheet::cell::NumberFormat;
    use crate::spreadsheet::criteria::SheetFilter;
    use crate::spreadsheet::sheet::MemorySheet;
    use crate::spreadsheet::sheet::MemoryWorkbook;
    use anyhow::anyhow;
    use chrono::NaiveDate;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn date(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn simple_sheet() -> MemorySheet {
        let mut sheet = MemorySheet::new("Sheet1");
        sheet.push_row(0, ["string", "number", "date", "optional_str"]);
        sheet.push_row(1, ["a", "1", "", "x"]);
        sheet.push(Cell::date(1, 2, date(1)));
        sheet.push_row(2, ["b", "2", "", ""]);
        sheet.push(Cell::date(2, 2, date(2)));
        sheet.push_row(3, ["c", "three", "", "z"]);
        sheet.push(Cell::date(3, 2, date(3)));
        sheet
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Simple {
        string: String,
        number: f64,
        date: NaiveDateTime,
        optional_str: String,
    }

    struct SimpleParser {
        string: HeaderMatcher,
        number: HeaderMatcher,
        date: HeaderMatcher,
        optional_str: HeaderMatcher,
    }

    impl SimpleParser {
        fn new() -> Self {
            Self {
                string: HeaderMatcher::exact("string"),
                number: HeaderMatcher::exact("number"),
                date: HeaderMatcher::exact("date"),
                optional_str: HeaderMatcher::exact("optional_str"),
            }
        }
    }

    impl RowParser<Simple> for SimpleParser {
        fn to_record(&self, row: &RowContext<'_>) -> anyhow::Result<ParsedRecord<Simple>> {
            Ok(ParsedRecord::typed(Simple {
                string: row.required_string(&self.string)?,
                number: row.required_double(&self.number)?,
                date: row.required_datetime(&self.date)?,
                optional_str: row.required_string(&self.optional_str)?,
            }))
        }
    }

    fn simple_spec() -> WorkbookSpec<Simple> {
        let parser = SimpleParser::new();
        let table = TableSpec::new(vec![parser.string.clone(), parser.number.clone(), parser.date.clone()])
            .optional(vec![parser.optional_str.clone()])
            .row_parser(parser);
        WorkbookSpec::new(vec![SheetSpec::new(SheetFilter::All, vec![table])])
    }

    #[test]
    fn required_field_failures_keep_every_row() {
        let workbook = MemoryWorkbook::new(None).with_sheet(simple_sheet());
        let extraction = extract(&simple_spec(), &workbook);

        assert_eq!(extraction.records.len(), 3);
        assert!(!extraction.exceptions.has_critical());
        let located: Vec<(&str, Severity, Option<usize>)> = extraction
            .exceptions
            .records()
            .iter()
            .map(|record| (record.kind(), record.severity(), record.location.as_ref().and_then(|it| it.row_number)))
            .collect();
        assert_eq!(
            located,
            vec![
                ("CellParserException", Severity::Warning, Some(3)),
                ("CellParserException", Severity::Warning, Some(4)),
            ]
        );

        let first = extraction.records[0].as_typed().unwrap();
        assert_eq!(
            first.value,
            Simple {
                string: "a".to_owned(),
                number: 1.0,
                date: date(1),
                optional_str: "x".to_owned(),
            }
        );
        assert_eq!(first.raw_data.as_ref().and_then(|data| data.get("row_number")), Some(&Value::Integer(2)));

        let fallback = extraction.records[2].as_denormalized().unwrap();
        assert_eq!(fallback.get("number"), Some(&Value::from("three")));
        assert_eq!(fallback.get("date"), Some(&Value::DateTime(date(3))));
    }

    #[test]
    fn ignored_columns_stay_out_of_records() {
        let workbook = MemoryWorkbook::new(None).with_sheet(simple_sheet());
        let table = TableSpec::new(vec![HeaderMatcher::exact("string"), HeaderMatcher::exact("number")])
            .ignored(vec![HeaderMatcher::exact("optional_str"), HeaderMatcher::exact("date")]);
        let spec: WorkbookSpec<()> = WorkbookSpec::new(vec![SheetSpec::new(SheetFilter::All, vec![table])]);
        let extraction = extract(&spec, &workbook);

        assert!(extraction.exceptions.is_empty());
        let records: Vec<&Record> = extraction.records.iter().filter_map(ParsedRecord::as_denormalized).collect();
        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            let keys: Vec<&str> = record.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["number", "row_number", "spreadsheet_name", "string"]);
            assert_eq!(record.get("row_number"), Some(&Value::from(i + 2)));
        }
        assert_eq!(records[0].get("number"), Some(&Value::from("1")));
    }

    fn orders_sheet(name: &str) -> MemorySheet {
        let mut sheet = MemorySheet::new(name);
        sheet.push_row(0, ["Orders"]);
        sheet.push_row(1, ["id", "qty"]);
        sheet.push_row(2, ["1", "5"]);
        sheet.push_row(4, ["Returns"]);
        sheet.push_row(5, ["ref", "reason"]);
        sheet.push_row(6, ["1", "damaged"]);
        sheet
    }

    fn orders_only(name: &str) -> MemorySheet {
        let mut sheet = MemorySheet::new(name);
        sheet.push_row(0, ["Orders"]);
        sheet.push_row(1, ["id", "qty"]);
        sheet.push_row(2, ["1", "5"]);
        sheet
    }

    fn orders_table() -> TableSpec<()> {
        TableSpec::new(vec![HeaderMatcher::exact("id"), HeaderMatcher::exact("qty")]).anchor("orders")
    }

    #[test]
    fn anchored_tables_are_isolated() {
        let returns = TableSpec::new(vec![HeaderMatcher::exact("id"), HeaderMatcher::exact("reason")]).anchor("returns");
        let spec = WorkbookSpec::new(vec![SheetSpec::new(SheetFilter::All, vec![orders_table(), returns])]);
        let workbook = MemoryWorkbook::new(Some("trades.xlsx")).with_sheet(orders_sheet("March"));
        let extraction = extract(&spec, &workbook);

        assert_eq!(extraction.records.len(), 1);
        let record = extraction.records[0].as_denormalized().unwrap();
        assert_eq!(record.get("anchor"), Some(&Value::from("orders")));
        assert_eq!(record.get("workbook_name"), Some(&Value::from("trades.xlsx")));
        assert_eq!(record.get("qty"), Some(&Value::from("5")));

        let exceptions = extraction.exceptions.records();
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].kind(), "TableParserException");
        assert_eq!(exceptions[0].location, Some(Location::row("March", 5)));
    }

    #[test]
    fn sheet_selection() {
        let spec = WorkbookSpec::new(vec![
            SheetSpec::new(SheetFilter::patterns(&["Q*"]).unwrap(), vec![orders_table()]),
            SheetSpec::new(SheetFilter::All, vec![TableSpec::new(vec![HeaderMatcher::exact("missing")])]),
        ]);
        let workbook = MemoryWorkbook::new(None)
            .with_sheet(orders_only("Q1"))
            .with_sheet(orders_only("Q2").hidden(true))
            .with_sheet(orders_only("Notes"));

        let extraction = extract(&spec, &workbook);
        let sheets: Vec<String> = extraction
            .records
            .iter()
            .filter_map(|record| record.as_denormalized()?.get("spreadsheet_name").map(ToString::to_string))
            .collect();
        assert_eq!(sheets, vec!["Q1"]);
        let messages: Vec<String> = extraction.exceptions.records().iter().map(|record| record.message()).collect();
        assert_eq!(messages, vec!["Could not locate any tables"]);

        let extraction = extract(&spec.include_hidden(true), &workbook);
        assert_eq!(extraction.records.len(), 2);
    }

    #[test]
    fn failing_sheet_filter_aborts_workbook() {
        let spec = WorkbookSpec::new(vec![SheetSpec::new(
            SheetFilter::predicate(|name| match name {
                "broken" => Err(anyhow!("cannot evaluate sheet '{}'", name)),
                _ => Ok(true),
            }),
            vec![orders_table()],
        )]);
        let workbook = MemoryWorkbook::new(None)
            .with_sheet(orders_only("good"))
            .with_sheet(orders_only("broken"));
        let extraction = extract(&spec, &workbook);

        assert!(extraction.records.is_empty());
        assert!(extraction.exceptions.has_critical());
        let exported = extraction.exceptions.export();
        assert_eq!(exported[0].get("kind"), Some(&Value::from("UncategorizedException")));
        assert_eq!(exported[0].get("message"), Some(&Value::from("cannot evaluate sheet 'broken'")));
        assert_eq!(exported[0].get("sheetName"), None);
    }

    #[test]
    fn out_of_range_date_stays_a_number() {
        let mut sheet = MemorySheet::new("dates");
        sheet.push_row(0, ["name", "when"]);
        sheet.push_row(1, ["a", ""]);
        sheet.push(Cell::new(1, 1, 1e300).with_format(NumberFormat::Date1904));
        let workbook = MemoryWorkbook::new(None).with_sheet(sheet);
        let table = TableSpec::new(vec![HeaderMatcher::exact("name"), HeaderMatcher::exact("when")]);
        let spec: WorkbookSpec<()> = WorkbookSpec::new(vec![SheetSpec::new(SheetFilter::All, vec![table])]);
        let extraction = extract(&spec, &workbook);

        assert!(extraction.exceptions.is_empty());
        assert_eq!(extraction.records.len(), 1);
        let record = extraction.records[0].as_denormalized().unwrap();
        assert_eq!(record.get("when"), Some(&Value::Float(1e300)));
    }
}
