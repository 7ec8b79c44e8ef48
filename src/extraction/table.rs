use crate::definition::TableSpec;
use crate::exception::ExceptionCollector;
use crate::exception::Fault;
use crate::exception::Location;
use crate::exception::UncapturedHeader;
use crate::exception::UncapturedHeaders;
use crate::extraction::locator::TableBounds;
use crate::extraction::RowContext;
use crate::header::resolver::ColumnIndexMap;
use crate::header::resolver::HeaderRowResolver;
use crate::parser::NumberLocale;
use crate::record::Metadata;
use crate::record::ParsedRecord;
use crate::record::TypedRecord;
use crate::record::ANCHOR;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::merged::MergedCells;
use crate::spreadsheet::Row;
use crate::spreadsheet::Sheet;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Table rows once the exact header row is known. `min_row <= header_row <= max_row`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableSpan {
    pub min_row: usize,
    pub header_row: usize,
    pub max_row: usize,
}

/// Extracts the records of one located table.
pub struct TableExtractor<'a, R> {
    sheet: &'a dyn Sheet,
    spec: &'a TableSpec<R>,
    metadata: Metadata,
    merged: &'a MergedCells<'a>,
    resolver: HeaderRowResolver<'a>,
    locale: NumberLocale,
}

impl<'a, R> TableExtractor<'a, R> {
    pub fn new(
        sheet: &'a dyn Sheet,
        spec: &'a TableSpec<R>,
        metadata: &Metadata,
        merged: &'a MergedCells<'a>,
        locale: NumberLocale,
    ) -> Self {
        let metadata = match spec.anchor_text() {
            Some(anchor) => metadata.clone().with(ANCHOR, anchor),
            None => metadata.clone(),
        };
        Self {
            sheet,
            spec,
            metadata,
            merged,
            resolver: HeaderRowResolver::new(merged),
            locale,
        }
    }

    /// Extracts the table's records. Table-level problems are registered and yield no records.
    pub fn extract(&self, bounds: TableBounds, collector: &mut ExceptionCollector) -> Vec<ParsedRecord<R>> {
        if self.spec.required_matchers().is_empty() {
            let fault = Fault::TableParser(format!(
                "No required columns defined for anchor:{}",
                self.spec.anchor_text().unwrap_or("none")
            ));
            collector.register(fault, Some(Location::row(self.sheet.name(), bounds.min_row + 1)));
            return Vec::new();
        }
        let Some(header_row) = self.find_header_row(bounds) else {
            let fault = Fault::TableParser(format!(
                "No table header found for anchor:{} and reqCols:[{}]",
                self.spec.anchor_text().unwrap_or("none"),
                self.spec
                    .required_matchers()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            collector.register(fault, Some(Location::row(self.sheet.name(), bounds.min_row + 1)));
            return Vec::new();
        };
        let span = TableSpan {
            min_row: bounds.min_row,
            header_row: header_row.index(),
            max_row: bounds.max_row,
        };
        tracing::debug!(sheet = self.sheet.name(), header_row = span.header_row + 1, max_row = span.max_row + 1, "table header resolved");

        let columns = self.resolver.resolve(header_row, &self.spec.all_matchers());
        let all_headers = self.map_all_headers(header_row);
        self.check_uncaptured_headers(&columns, &all_headers, span, collector);

        let tracked: BTreeSet<usize> = all_headers.iter().map(|(_, col)| *col).collect();
        let mut records = Vec::new();
        let mut divider: Option<String> = None;
        for index in span.header_row + 1..=span.max_row {
            let Some(row) = self.sheet.row(index) else {
                continue;
            };
            let context = RowContext {
                sheet_name: self.sheet.name(),
                row,
                columns: &columns,
                all_headers: &all_headers,
                merged: self.merged,
                metadata: &self.metadata,
                divider: divider.as_deref(),
                locale: self.locale,
            };
            divider = self.process_row(context, &tracked, divider.clone(), &mut records, collector);
        }
        records
    }

    /// Handles one row and returns the divider in effect for the rows after it.
    fn process_row(
        &self,
        context: RowContext<'_>,
        tracked: &BTreeSet<usize>,
        divider: Option<String>,
        records: &mut Vec<ParsedRecord<R>>,
        collector: &mut ExceptionCollector,
    ) -> Option<String> {
        let row = context.row();
        if !self.is_extractable(row) {
            tracing::trace!(sheet = self.sheet.name(), row = context.row_number(), "row skipped");
            return divider;
        }
        if self.spec.has_divider() {
            if let Some(cell) = divider_cell(row, tracked) {
                if self.is_allowed_divider(cell) {
                    let text = cell.to_string();
                    tracing::debug!(sheet = self.sheet.name(), row = context.row_number(), divider = text.as_str(), "divider");
                    return Some(text);
                }
                return divider;
            }
        }
        let parser = self.spec.parser();
        if parser.skip(&context) {
            tracing::trace!(sheet = self.sheet.name(), row = context.row_number(), "row skipped by row parser");
            return divider;
        }

        match parser.to_record(&context) {
            Ok(ParsedRecord::Typed(mut record)) => {
                if parser.store_raw_data() {
                    record.raw_data = Some(context.all_data());
                }
                self.push_typed(records, record);
            }
            Ok(record) => records.push(record),
            Err(error) => {
                collector.register_error(error, Some(Location::row(self.sheet.name(), context.row_number())));
                records.push(ParsedRecord::Denormalized(context.all_data()));
            }
        }
        divider
    }

    /// Appends a typed record, grouping it with the previous typed record when the row parser
    /// asks for it.
    fn push_typed(&self, records: &mut Vec<ParsedRecord<R>>, current: TypedRecord<R>) {
        let parser = self.spec.parser();
        if let Some(ParsedRecord::Typed(previous)) = records.last_mut() {
            if parser.should_group(&current, previous) {
                let raw_data = current.raw_data.clone();
                let group_id = *previous.group_id.get_or_insert_with(Uuid::new_v4);
                let mut grouped = parser.backfill(current, previous);
                grouped.raw_data = raw_data;
                grouped.group_id = Some(group_id);
                records.push(ParsedRecord::Typed(grouped));
                return;
            }
        }
        records.push(ParsedRecord::Typed(current));
    }

    fn find_header_row(&self, bounds: TableBounds) -> Option<&'a Row> {
        (bounds.min_row..=bounds.max_row)
            .filter_map(|index| self.sheet.row(index))
            .find(|row| self.resolver.is_header_row(row, self.spec.required_matchers()))
    }

    /// Names every header column: merged cells get `<text>_<column>`, string cells their text.
    /// Columns matched by an ignored matcher are left out.
    fn map_all_headers(&self, header_row: &Row) -> Vec<(String, usize)> {
        let mut headers: Vec<(String, usize)> = Vec::new();
        for cell in header_row.cells() {
            let name = match self.merged.get(header_row.index(), cell.col) {
                Some(representative) if !self.is_ignored(representative) => {
                    Some(format!("{}_{}", representative, cell.col + 1))
                }
                _ => match cell.string_value() {
                    Some(text) if !text.is_empty() && !self.is_ignored(cell) => {
                        Some(text.to_owned())
                    }
                    _ => None,
                },
            };
            if let Some(name) = name {
                match headers.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(entry) => entry.1 = cell.col,
                    None => headers.push((name, cell.col)),
                }
            }
        }
        headers
    }

    fn is_ignored(&self, cell: &Cell) -> bool {
        self.spec.ignored_matchers().iter().any(|matcher| matcher.matches(cell))
    }

    /// Reports every named header column no matcher claimed, as a single warning.
    fn check_uncaptured_headers(
        &self,
        columns: &ColumnIndexMap,
        all_headers: &[(String, usize)],
        span: TableSpan,
        collector: &mut ExceptionCollector,
    ) {
        let claimed = columns.columns();
        let uncaptured = all_headers
            .iter()
            .filter(|(_, col)| !claimed.contains(col))
            .map(|(name, col)| UncapturedHeader {
                name: name.clone(),
                index: *col,
            })
            .collect();
        if let Some(headers) = UncapturedHeaders::new(uncaptured) {
            collector.register(
                Fault::UncapturedHeaders(headers),
                Some(Location::row(self.sheet.name(), span.header_row + 1)),
            );
        }
    }

    /// Rows with some non-blank cell that do not repeat the header.
    fn is_extractable(&self, row: &Row) -> bool {
        !row.is_blank() && !self.resolver.is_header_row(row, self.spec.required_matchers())
    }

    fn is_allowed_divider(&self, cell: &Cell) -> bool {
        let allowed = self.spec.allowed_divider_matchers();
        allowed.is_empty() || allowed.iter().any(|matcher| matcher.matches(cell))
    }
}

/// The only non-blank tracked cell of a row, if there is exactly one.
fn divider_cell<'r>(row: &'r Row, tracked: &BTreeSet<usize>) -> Option<&'r Cell> {
    let mut cells = row
        .cells()
        .iter()
        .filter(|cell| !cell.is_blank() && tracked.contains(&cell.col));
    let first = cells.next()?;
    cells.next().is_none().then_some(first)
}
