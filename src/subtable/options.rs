use crate::spreadsheet::cell::CellValue;
use crate::subtable::SubtableError;
use crate::subtable::Transform;

/// Extensions read when no allow-list is given
pub(crate) const DEFAULT_EXTENSIONS: [&str; 3] = [".xlsx", ".xlsm", ".ods"];

/// How the rows of a sheet become tables
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ExtractMode {
    /// Split the sheet at every row holding the marker value
    Subtables { marker: Option<CellValue> },
    /// Take the whole sheet as one table labelled `column1..N`
    Raw {
        skip_empty_rows: bool,
        skip_first_row: bool,
    },
}

impl Default for ExtractMode {
    fn default() -> Self {
        ExtractMode::Subtables { marker: None }
    }
}

/// Settings of one extraction run
#[derive(Clone)]
pub(crate) struct ExtractOptions {
    pub(crate) mode: ExtractMode,
    /// Case-sensitive file name suffixes to read
    pub(crate) extensions: Vec<String>,
    pub(crate) transform: Option<Transform>,
    /// Turn error cells into empty cells instead of failing the read
    pub(crate) error_as_null: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            mode: ExtractMode::default(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|extension| extension.to_string()).collect(),
            transform: None,
            error_as_null: false,
        }
    }
}

impl ExtractOptions {
    pub(crate) fn subtables(marker: CellValue) -> Self {
        Self {
            mode: ExtractMode::Subtables { marker: Some(marker) },
            ..Self::default()
        }
    }

    /// Subtable mode needs a marker, otherwise no row could ever start a table.
    pub(crate) fn validate(&self) -> Result<(), SubtableError> {
        match &self.mode {
            ExtractMode::Subtables { marker: None } => Err(SubtableError::Configuration),
            _ => Ok(()),
        }
    }

    pub(crate) fn accepts(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|extension| file_name.ends_with(extension.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_marker_is_a_configuration_error() {
        assert!(matches!(ExtractOptions::default().validate(), Err(SubtableError::Configuration)));
        assert!(ExtractOptions::subtables(CellValue::from("Id")).validate().is_ok());

        let raw = ExtractOptions {
            mode: ExtractMode::Raw { skip_empty_rows: true, skip_first_row: false },
            ..ExtractOptions::default()
        };
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn extension_filter_is_case_sensitive() {
        let options = ExtractOptions::default();
        assert!(options.accepts("data/a.xlsx"));
        assert!(options.accepts("data/b.ods"));
        assert!(!options.accepts("data/c.XLSX"));
        assert!(!options.accepts("data/notes.txt"));
        assert!(!options.accepts("data/xlsx"));
    }
}
