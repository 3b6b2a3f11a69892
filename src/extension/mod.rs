//! # Extension Core Module
//!
//! Parameter handling shared by the `read_subtables` and `analyze_subtables`
//! table functions, plus the conversion of SQL parameters into extraction options.
use crate::error::RustySubtableError;
use crate::spreadsheet::cell::CellValue;
use crate::subtable::options::ExtractMode;
use crate::subtable::options::ExtractOptions;
use crate::subtable::options::DEFAULT_EXTENSIONS;
use crate::subtable::transform::chain;
use crate::subtable::transform::copy_cell;
use crate::subtable::transform::drop_empty_columns;
use crate::subtable::Transform;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use regex::Regex;
use thiserror::Error;

pub(crate) mod analyze_subtables;
pub(crate) mod read_subtables;
mod writer;

/// Rows per output chunk of both table functions
pub(crate) const CHUNK_SIZE: usize = 2048;

/// Row range of the `chunk`-th output chunk over `len` rows, empty past the end
pub(crate) fn chunk_range(chunk: usize, len: usize) -> std::ops::Range<usize> {
    let lower = chunk.saturating_mul(CHUNK_SIZE).min(len);
    lower..len.min(lower + CHUNK_SIZE)
}

#[derive(Error, Debug)]
pub(crate) enum ExtensionError {
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },
}

impl ExtensionError {
    fn invalid(name: &str, message: impl Into<String>) -> Self {
        ExtensionError::InvalidParameter {
            name: name.to_owned(),
            message: message.into(),
        }
    }
}

/// Positional parameter of a table function
pub(crate) trait Param<T> {
    fn kind() -> LogicalTypeHandle;

    fn read(bind: &BindInfo, index: u64) -> Result<T, RustySubtableError>;
}

/// Named parameter of a table function
pub(crate) trait NamedParam<T> {
    /// Returns the parameter name as used in SQL
    fn name() -> &'static str;

    fn kind() -> LogicalTypeHandle;

    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Returns `None` when the parameter is not given
    fn read(bind: &BindInfo) -> Result<Option<T>, RustySubtableError>;
}

/// Root directory, file, glob pattern or URL to read
pub(crate) struct PathParam;

impl Param<String> for PathParam {
    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo, index: u64) -> Result<String, RustySubtableError> {
        let path = bind.get_parameter(index).to_string();
        if path.trim().is_empty() {
            Err(ExtensionError::invalid("path", "path is empty"))?
        }
        Ok(path)
    }
}

macro_rules! named_param {
    ($param:ident, $name:literal, $type:ty, $logical:ident, $parse:expr) => {
        pub(crate) struct $param;

        impl NamedParam<$type> for $param {
            fn name() -> &'static str {
                $name
            }

            fn kind() -> LogicalTypeHandle {
                LogicalTypeHandle::from(LogicalTypeId::$logical)
            }

            fn read(bind: &BindInfo) -> Result<Option<$type>, RustySubtableError> {
                bind.get_named_parameter(Self::name())
                    .map(|value| $parse(Self::name(), value))
                    .transpose()
            }
        }
    };
}

fn read_varchar(_: &str, value: duckdb::vtab::Value) -> Result<String, RustySubtableError> {
    Ok(value.to_string())
}

/// Header marker in the type it was given in SQL: `header := 2024` matches numeric cells.
fn read_marker(_: &str, value: duckdb::vtab::Value) -> Result<CellValue, RustySubtableError> {
    Ok(marker_from(value.logical_type_id(), value.to_string()))
}

fn marker_from(kind: LogicalTypeId, text: String) -> CellValue {
    let parsed = match kind {
        LogicalTypeId::Boolean => parse_bool(HeaderParam::name(), &text).ok().map(CellValue::Boolean),
        LogicalTypeId::Tinyint
        | LogicalTypeId::Smallint
        | LogicalTypeId::Integer
        | LogicalTypeId::Bigint
        | LogicalTypeId::Hugeint
        | LogicalTypeId::UTinyint
        | LogicalTypeId::USmallint
        | LogicalTypeId::UInteger
        | LogicalTypeId::UBigint
        | LogicalTypeId::UHugeint
        | LogicalTypeId::IntegerLiteral
        | LogicalTypeId::Float
        | LogicalTypeId::Double
        | LogicalTypeId::Decimal => text.trim().parse::<f64>().ok().map(CellValue::Number),
        LogicalTypeId::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok().map(CellValue::Date),
        LogicalTypeId::Timestamp => NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f").ok().map(CellValue::DateTime),
        LogicalTypeId::Time => NaiveTime::parse_from_str(&text, "%H:%M:%S%.f").ok().map(CellValue::Time),
        _ => None,
    };
    parsed.unwrap_or(CellValue::Text(text))
}

fn read_bool(name: &str, value: duckdb::vtab::Value) -> Result<bool, RustySubtableError> {
    Ok(parse_bool(name, &value.to_string())?)
}

fn read_row(name: &str, value: duckdb::vtab::Value) -> Result<usize, RustySubtableError> {
    let row = value.to_int64();
    usize::try_from(row).map_err(|_| ExtensionError::invalid(name, format!("row {row} is negative")).into())
}

named_param!(HeaderParam, "header", CellValue, Any, read_marker);
named_param!(ModeParam, "mode", String, Varchar, read_varchar);
named_param!(ExtensionsParam, "extensions", String, Varchar, read_varchar);
named_param!(DropEmptyColumnsParam, "drop_empty_columns", bool, Boolean, read_bool);
named_param!(CopyColumnParam, "copy_column", String, Varchar, read_varchar);
named_param!(CopyFromRowParam, "copy_from_row", usize, Bigint, read_row);
named_param!(CopyToRowParam, "copy_to_row", usize, Bigint, read_row);
named_param!(ErrorAsNullParam, "error_as_null", bool, Boolean, read_bool);
named_param!(SkipEmptyRowsParam, "skip_empty_rows", bool, Boolean, read_bool);
named_param!(SkipFirstRowParam, "skip_first_row", bool, Boolean, read_bool);

/// Named parameters understood by both table functions
pub(crate) fn named_parameter_definitions() -> Vec<(String, LogicalTypeHandle)> {
    vec![
        HeaderParam::definition(),
        ModeParam::definition(),
        ExtensionsParam::definition(),
        DropEmptyColumnsParam::definition(),
        CopyColumnParam::definition(),
        CopyFromRowParam::definition(),
        CopyToRowParam::definition(),
        ErrorAsNullParam::definition(),
        SkipEmptyRowsParam::definition(),
        SkipFirstRowParam::definition(),
    ]
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ExtensionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(ExtensionError::invalid(name, format!("'{value}' is not a boolean"))),
    }
}

/// Splits an extension list such as `.xlsx, .ods` and adds missing dots.
fn parse_extensions(value: &str) -> Result<Vec<String>, ExtensionError> {
    let separator = Regex::new(r"[,;\s]+").expect("Hardcode regex pattern");
    let extensions: Vec<String> = separator
        .split(value.trim())
        .filter(|extension| !extension.is_empty())
        .map(|extension| match extension.starts_with('.') {
            true => extension.to_owned(),
            false => format!(".{extension}"),
        })
        .collect();
    if extensions.is_empty() {
        Err(ExtensionError::invalid(ExtensionsParam::name(), "no extension given"))
    } else {
        Ok(extensions)
    }
}

/// Parameters common to both table functions
#[derive(Default)]
pub(crate) struct ExtractParameters {
    pub(crate) path: String,
    header: Option<CellValue>,
    mode: Option<String>,
    extensions: Option<String>,
    drop_empty_columns: Option<bool>,
    copy_column: Option<String>,
    copy_from_row: Option<usize>,
    copy_to_row: Option<usize>,
    error_as_null: Option<bool>,
    skip_empty_rows: Option<bool>,
    skip_first_row: Option<bool>,
}

impl TryFrom<&BindInfo> for ExtractParameters {
    type Error = RustySubtableError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        Ok(ExtractParameters {
            path: PathParam::read(bind, 0)?,
            header: HeaderParam::read(bind)?,
            mode: ModeParam::read(bind)?,
            extensions: ExtensionsParam::read(bind)?,
            drop_empty_columns: DropEmptyColumnsParam::read(bind)?,
            copy_column: CopyColumnParam::read(bind)?,
            copy_from_row: CopyFromRowParam::read(bind)?,
            copy_to_row: CopyToRowParam::read(bind)?,
            error_as_null: ErrorAsNullParam::read(bind)?,
            skip_empty_rows: SkipEmptyRowsParam::read(bind)?,
            skip_first_row: SkipFirstRowParam::read(bind)?,
        })
    }
}

impl TryFrom<&ExtractParameters> for ExtractOptions {
    type Error = ExtensionError;

    fn try_from(parameters: &ExtractParameters) -> Result<Self, Self::Error> {
        let mode = match parameters.mode.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("subtables") => ExtractMode::Subtables {
                marker: parameters.header.clone(),
            },
            Some("raw") => ExtractMode::Raw {
                skip_empty_rows: parameters.skip_empty_rows.unwrap_or(false),
                skip_first_row: parameters.skip_first_row.unwrap_or(false),
            },
            Some(mode) => Err(ExtensionError::invalid(
                ModeParam::name(),
                format!("'{mode}' is neither 'subtables' nor 'raw'"),
            ))?,
        };

        let extensions = match &parameters.extensions {
            Some(extensions) => parse_extensions(extensions)?,
            None => DEFAULT_EXTENSIONS.iter().map(|extension| extension.to_string()).collect(),
        };

        let mut transforms = Vec::<Transform>::new();
        if let Some(column) = &parameters.copy_column {
            transforms.push(copy_cell(
                column,
                parameters.copy_from_row.unwrap_or(1),
                parameters.copy_to_row.unwrap_or(0),
            ));
        } else if parameters.copy_from_row.is_some() || parameters.copy_to_row.is_some() {
            Err(ExtensionError::invalid(CopyColumnParam::name(), "copy rows given without a column"))?
        }
        if parameters.drop_empty_columns.unwrap_or(false) {
            transforms.push(drop_empty_columns());
        }
        let transform = match transforms.len() {
            0 => None,
            1 => transforms.pop(),
            _ => Some(chain(transforms)),
        };

        Ok(ExtractOptions {
            mode,
            extensions,
            transform,
            error_as_null: parameters.error_as_null.unwrap_or(false),
        })
    }
}
