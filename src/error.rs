use thiserror::Error;

/// Main error type for the Rusty Subtable extension.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub(crate) enum RustySubtableError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    GlobError(#[from] glob::GlobError),

    // Third-party library errors
    #[error("{0}")]
    DuckDBError(#[from] duckdb::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    UnifiedReaderError(#[from] crate::helpers::reader::UnifiedReaderError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),

    // Subtable module errors
    #[error("{0}")]
    SubtableError(#[from] crate::subtable::SubtableError),

    // Database module errors
    #[error("{0}")]
    ColumnError(#[from] crate::database::column::ColumnError),

    // Extension module errors
    #[error("{0}")]
    ExtensionError(#[from] crate::extension::ExtensionError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RustySubtableError> {
    /// Prefixes read errors with the file they came from.
    /// Subtable errors already name their file and pass through untouched.
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e {
            RustySubtableError::SubtableError(_) => e,
            _ => RustySubtableError::WithContextError(format!("{}: {}", message, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtable::SubtableError;

    #[test]
    fn with_prefix_names_file() {
        let result: Result<(), RustySubtableError> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into());
        let error = result.with_prefix("data/a.xlsx").unwrap_err();
        assert_eq!(error.to_string(), "data/a.xlsx: missing");
    }

    #[test]
    fn with_prefix_keeps_subtable_errors() {
        let result: Result<(), RustySubtableError> = Err(SubtableError::Configuration.into());
        let error = result.with_prefix("data/a.xlsx").unwrap_err();
        assert!(matches!(error, RustySubtableError::SubtableError(SubtableError::Configuration)));
    }
}
