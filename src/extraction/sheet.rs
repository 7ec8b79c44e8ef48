use crate::definition::MetadataEntry;
use crate::definition::SheetSpec;
use crate::exception::ExceptionCollector;
use crate::exception::Fault;
use crate::exception::Location;
use crate::extraction::locator::TableLocator;
use crate::extraction::table::TableExtractor;
use crate::header::resolver::HeaderRowResolver;
use crate::parser::NumberLocale;
use crate::record::Metadata;
use crate::record::ParsedRecord;
use crate::record::SPREADSHEET_NAME;
use crate::record::WORKBOOK_NAME;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::merged::MergedCells;
use crate::spreadsheet::Sheet;

/// Extracts every table of one sheet.
pub struct SheetParser<'a, R> {
    spec: &'a SheetSpec<R>,
    sheet: &'a dyn Sheet,
    workbook_name: Option<&'a str>,
    locale: NumberLocale,
}

impl<'a, R> SheetParser<'a, R> {
    pub fn new(spec: &'a SheetSpec<R>, sheet: &'a dyn Sheet, workbook_name: Option<&'a str>, locale: NumberLocale) -> Self {
        Self {
            spec,
            sheet,
            workbook_name,
            locale,
        }
    }

    /// Returns the sheet's records.
    ///
    /// Named faults drop the sheet and are registered against it. Any other error is returned
    /// and ends the whole workbook parse.
    pub fn parse(&self, collector: &mut ExceptionCollector) -> anyhow::Result<Vec<ParsedRecord<R>>> {
        match self.try_parse(collector) {
            Ok(records) => Ok(records),
            Err(error) => match error.downcast::<Fault>() {
                Ok(fault) => {
                    collector.register(fault, Some(Location::sheet(self.sheet.name())));
                    Ok(Vec::new())
                }
                Err(error) => Err(error),
            },
        }
    }

    fn try_parse(&self, collector: &mut ExceptionCollector) -> anyhow::Result<Vec<ParsedRecord<R>>> {
        let metadata = self.extract_metadata()?;
        let merged = MergedCells::new(self.sheet);
        let locator = TableLocator::new(self.sheet, HeaderRowResolver::new(&merged));
        let tables = locator.locate(self.spec.tables())?;

        let mut records = Vec::new();
        for (table, bounds) in tables {
            let extractor = TableExtractor::new(self.sheet, table, &metadata, &merged, self.locale);
            records.extend(extractor.extract(bounds, collector));
        }
        Ok(records)
    }

    /// Base metadata: sheet name, workbook name when known, and every metadata entry.
    fn extract_metadata(&self) -> anyhow::Result<Metadata> {
        let mut metadata = Metadata::new().with(SPREADSHEET_NAME, self.sheet.name());
        if let Some(workbook_name) = self.workbook_name {
            metadata = metadata.with(WORKBOOK_NAME, workbook_name);
        }
        for entry in self.spec.metadata_entries() {
            let cell = self.find_value_cell(entry)?;
            metadata = metadata.with(entry.name(), entry.extract(cell)?);
        }
        Ok(metadata)
    }

    fn find_value_cell(&self, entry: &MetadataEntry) -> Result<&'a Cell, Fault> {
        let key_cell = self
            .sheet
            .rows()
            .flat_map(|row| row.cells())
            .find(|cell| cell.to_string().contains(entry.key()))
            .ok_or_else(|| Fault::SheetParser(format!("Could not find metadata key '{}'", entry.key())))?;
        entry
            .location()
            .resolve(key_cell.row, key_cell.col)
            .and_then(|(row, col)| self.sheet.row(row)?.cell(col))
            .ok_or_else(|| {
                Fault::SheetParser(format!(
                    "Could not find metadata value for key '{}' at {:?}",
                    entry.key(),
                    entry.location()
                ))
            })
    }
}
