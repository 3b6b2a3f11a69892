//! # Spreadsheet Reading Module
//!
//! Reads the first worksheet of an Excel (.xlsx, .xlsm, .xlam) or OpenDocument
//! (.ods) file into a raw matrix of cell values, without interpreting any row
//! as a header.
use crate::error::RustySubtableError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    #[error("Missing part '{0}' in spreadsheet")]
    FileError(String),

    #[error("Spreadsheet '{0}' contains no worksheet")]
    SpreadsheetEmptyError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Unsupported spreadsheet format '{0}'")]
    UnsupportedFormatError(String),

    #[error("Error value '{3}' in cell '{2}' of sheet '{1}' in '{0}'")]
    CellValueError(String, String, String, String),

    #[error("Shared string {0} is out of range, the workbook has {1}")]
    SharedStringError(usize, usize),
}

/// Common interface of the supported workbook formats.
pub(crate) trait Spreadsheet {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Reads every non-empty cell of the first worksheet.
    /// Error cells fail the read unless `error_as_null` turns them into empty cells.
    fn read_first_sheet(&mut self, error_as_null: bool) -> Result<Sheet, RustySubtableError>;
}

/// Opens a spreadsheet, choosing the reader from the file extension.
pub(crate) fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, RustySubtableError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|extension| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xlam") => Ok(Box::new(XlsxSpreadsheet::open(file_name)?)),
        Some("ods") => Ok(Box::new(OdsSpreadsheet::open(file_name)?)),
        _ => Err(SpreadsheetError::UnsupportedFormatError(file_name.to_owned()))?,
    }
}

/// Opens the file through [`UnifiedReader`] and refuses encrypted containers.
pub(crate) fn open_reader(file_name: &str) -> Result<UnifiedReader, RustySubtableError> {
    let mut reader = UnifiedReader::new(file_name)?;
    if reader.is_compound_file()? {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }
    Ok(reader)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_unsupported_format() {
        let error = open_spreadsheet("data/legacy.xls").err().unwrap();
        assert!(matches!(
            error,
            RustySubtableError::SpreadsheetError(SpreadsheetError::UnsupportedFormatError(_))
        ));
    }

    #[test]
    fn open_encrypted_workbook() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("locked.xlsx");
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.resize(512, 0);
        std::fs::write(&path, bytes).unwrap();

        let error = open_spreadsheet(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(
            error,
            RustySubtableError::SpreadsheetError(SpreadsheetError::SpreadsheetPasswordProtectedError(_))
        ));
    }
}
