use crate::error::RustySubtableError;
use crate::error::ResultMessage;
use crate::spreadsheet::cell::is_empty_row;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::Row;
use crate::spreadsheet::open_spreadsheet;
use crate::subtable::assembler::assemble;
use crate::subtable::options::ExtractMode;
use crate::subtable::options::ExtractOptions;
use crate::subtable::segmenter::has_marker;
use crate::subtable::segmenter::segment;
use crate::subtable::StructuredTable;
use crate::subtable::SubtableError;
use log::debug;
use log::info;
use log::warn;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Produces the raw rows of one file, without interpreting any header.
pub(crate) trait RawSheetSource {
    fn read(&self, file_name: &str) -> Result<Vec<Row>, RustySubtableError>;
}

/// Reads the first sheet of an Excel or OpenDocument workbook.
pub(crate) struct SpreadsheetSource {
    pub(crate) error_as_null: bool,
}

impl RawSheetSource for SpreadsheetSource {
    fn read(&self, file_name: &str) -> Result<Vec<Row>, RustySubtableError> {
        let mut spreadsheet = open_spreadsheet(file_name)?;
        let sheet = spreadsheet.read_first_sheet(self.error_as_null)?;
        if sheet.is_empty() {
            warn!("Sheet '{}' of '{}' is empty", sheet.name, spreadsheet.name());
        } else {
            debug!("Read sheet '{}' of '{}'", sheet.name, spreadsheet.name());
        }
        Ok(sheet.into_rows())
    }
}

/// Running total of extracted subtables, shared by every file of a run
#[derive(Debug, Default)]
pub(crate) struct ExtractionCounter(AtomicUsize);

impl ExtractionCounter {
    pub(crate) fn add(&self, count: usize) {
        self.0.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Reads, segments and assembles the tables of one file at a time.
pub(crate) struct FileProcessor<S: RawSheetSource> {
    source: S,
    options: ExtractOptions,
    counter: ExtractionCounter,
}

impl FileProcessor<SpreadsheetSource> {
    pub(crate) fn for_spreadsheets(options: ExtractOptions) -> Result<Self, SubtableError> {
        let source = SpreadsheetSource { error_as_null: options.error_as_null };
        Self::new(source, options)
    }
}

impl<S: RawSheetSource> FileProcessor<S> {
    pub(crate) fn new(source: S, options: ExtractOptions) -> Result<Self, SubtableError> {
        options.validate()?;
        Ok(Self {
            source,
            options,
            counter: ExtractionCounter::default(),
        })
    }

    pub(crate) fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Subtables extracted so far
    pub(crate) fn extracted(&self) -> usize {
        self.counter.get()
    }

    /// Returns the tables of one file in sheet order.
    /// Read failures name the file; malformed blocks name the file and block.
    pub(crate) fn process(&self, file_name: &str) -> Result<Vec<StructuredTable>, RustySubtableError> {
        let rows = self.source.read(file_name).with_prefix(file_name)?;
        let tables = match &self.options.mode {
            ExtractMode::Subtables { marker: Some(marker) } => self.extract_subtables(file_name, rows, marker)?,
            ExtractMode::Subtables { marker: None } => Err(SubtableError::Configuration)?,
            ExtractMode::Raw { skip_empty_rows, skip_first_row } => {
                self.extract_raw(rows, *skip_empty_rows, *skip_first_row)
            }
        };
        self.counter.add(tables.len());
        info!("Extracted {} tables from '{}'", tables.len(), file_name);
        Ok(tables)
    }

    fn extract_subtables(&self, file_name: &str, rows: Vec<Row>, marker: &CellValue) -> Result<Vec<StructuredTable>, SubtableError> {
        let blocks = segment(rows, has_marker(marker), is_empty_row);
        blocks.into_iter()
            .enumerate()
            .map(|(index, block)| {
                debug!("Subtable {} of '{}' has {} data rows", index + 1, file_name, block.data_len());
                assemble(block, self.options.transform.as_ref()).map_err(|source| SubtableError::Format {
                    file: file_name.to_owned(),
                    block: index + 1,
                    source,
                })
            })
            .collect()
    }

    /// Whole sheet as a single table with generated labels.
    fn extract_raw(&self, rows: Vec<Row>, skip_empty_rows: bool, skip_first_row: bool) -> Vec<StructuredTable> {
        let rows: Vec<Row> = rows.into_iter()
            .skip(if skip_first_row { 1 } else { 0 })
            .filter(|row| !skip_empty_rows || !is_empty_row(row))
            .collect();
        if rows.is_empty() {
            return Vec::new();
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or_default();
        let columns = (1..=width).map(|index| format!("column{index}")).collect();
        let rows = rows.into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        let table = StructuredTable::new(columns, rows);
        match &self.options.transform {
            Some(transform) => vec![transform(table)],
            None => vec![table],
        }
    }
}
