use crate::definition::TableSpec;
use crate::exception::Fault;
use crate::header::resolver::HeaderRowResolver;
use crate::spreadsheet::Row;
use crate::spreadsheet::Sheet;

/// Rows a table owns, from its start row to the row before the next table starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableBounds {
    pub min_row: usize,
    pub max_row: usize,
}

/// Finds where each table of a sheet starts and how far it runs.
pub struct TableLocator<'a> {
    sheet: &'a dyn Sheet,
    resolver: HeaderRowResolver<'a>,
}

impl<'a> TableLocator<'a> {
    pub fn new(sheet: &'a dyn Sheet, resolver: HeaderRowResolver<'a>) -> Self {
        Self { sheet, resolver }
    }

    /// Locates every table that starts somewhere in the sheet, in row order.
    ///
    /// Each row starts at most one table: the first table definition, in order, that has
    /// not started yet and accepts the row. Fails if no table starts at all.
    pub fn locate<'s, R>(&self, specs: &'s [TableSpec<R>]) -> Result<Vec<(&'s TableSpec<R>, TableBounds)>, Fault> {
        let mut started = vec![false; specs.len()];
        let mut starts: Vec<(&'s TableSpec<R>, usize)> = Vec::new();
        for row in self.sheet.rows() {
            let candidate = specs
                .iter()
                .enumerate()
                .find(|(i, spec)| !started[*i] && self.starts_table(row, spec));
            if let Some((i, spec)) = candidate {
                tracing::debug!(sheet = self.sheet.name(), row = row.index() + 1, anchor = spec.anchor_text(), "table start located");
                started[i] = true;
                starts.push((spec, row.index()));
            }
        }
        if starts.is_empty() {
            return Err(Fault::SheetParser("Could not locate any tables".to_owned()));
        }

        let last_row = self.sheet.last_row().unwrap_or_default();
        let bounds = starts
            .iter()
            .enumerate()
            .map(|(i, (spec, min_row))| {
                let max_row = match starts.get(i + 1) {
                    Some((_, next)) => next - 1,
                    None => last_row.max(*min_row),
                };
                (*spec, TableBounds { min_row: *min_row, max_row })
            })
            .collect();
        Ok(bounds)
    }

    /// An anchored table starts at a row containing its anchor that is not its header row; an
    /// unanchored one starts at its header row.
    fn starts_table<R>(&self, row: &Row, spec: &TableSpec<R>) -> bool {
        match spec.anchor_text() {
            Some(anchor) => {
                let anchor = anchor.to_lowercase();
                let contains_anchor = row
                    .cells()
                    .iter()
                    .filter_map(|cell| cell.string_value())
                    .any(|text| text.trim().to_lowercase().contains(&anchor));
                contains_anchor && !self.resolver.is_header_row(row, spec.required_matchers())
            }
            None => self.resolver.is_header_row(row, spec.required_matchers()),
        }
    }
}
