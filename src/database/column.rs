use crate::spreadsheet::cell::CellValue;
use crate::subtable::CombinedTable;
use duckdb::core::LogicalTypeId;
use std::collections::HashSet;
use thiserror::Error;

/// Errors related to column values
#[derive(Error, Debug)]
pub(crate) enum ColumnError {
    #[error("Value '{1}' does not fit column '{0}' of type {2}")]
    ValueError(String, String, &'static str),
}

/// Output column types of the combined table
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Varchar,
    Timestamp,
    Date,
    Time,
}

/// An output column with a unique name and its type
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Column {
    pub(crate) name: String,
    pub(crate) kind: ColumnType,
}

impl ColumnType {
    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::BigInt => "bigint",
            ColumnType::Double => "double",
            ColumnType::Varchar => "varchar",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
        }
    }

    /// Type a single value asks for, `None` for empty cells.
    pub(crate) fn from(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Empty => None,
            CellValue::Text(text) if text.is_empty() => None,
            CellValue::Boolean(_) => Some(ColumnType::Boolean),
            CellValue::Number(number) if Self::is_integer(*number) => Some(ColumnType::BigInt),
            CellValue::Number(_) => Some(ColumnType::Double),
            CellValue::Text(_) => Some(ColumnType::Varchar),
            CellValue::DateTime(_) => Some(ColumnType::Timestamp),
            CellValue::Date(_) => Some(ColumnType::Date),
            CellValue::Time(_) => Some(ColumnType::Time),
        }
    }

    pub(crate) const fn to_logical_type_id(&self) -> LogicalTypeId {
        match self {
            Self::Boolean => LogicalTypeId::Boolean,
            Self::BigInt => LogicalTypeId::Bigint,
            Self::Double => LogicalTypeId::Double,
            Self::Varchar => LogicalTypeId::Varchar,
            Self::Timestamp => LogicalTypeId::Timestamp,
            Self::Date => LogicalTypeId::Date,
            Self::Time => LogicalTypeId::Time,
        }
    }

    /// Whole numbers that survive the round trip through i64
    fn is_integer(number: f64) -> bool {
        number.fract() == 0.0 && number.abs() < 9.0e15
    }

    /// Detects the most specific common type of the candidates.
    /// Falls back to VARCHAR if types are inconsistent or empty.
    pub(crate) fn detect(types: impl IntoIterator<Item = Option<ColumnType>>) -> ColumnType {
        let types: Vec<ColumnType> = types.into_iter().flatten().collect();
        if types.is_empty() {
            ColumnType::Varchar
        } else if types.iter().all(|kind| *kind == ColumnType::Boolean) {
            ColumnType::Boolean
        } else if types.iter().all(|kind| *kind == ColumnType::BigInt) {
            ColumnType::BigInt
        } else if types.iter().all(ColumnType::is_float) {
            ColumnType::Double
        } else if types.iter().all(|kind| *kind == ColumnType::Date) {
            ColumnType::Date
        } else if types.iter().all(|kind| *kind == ColumnType::Time) {
            ColumnType::Time
        } else if types.iter().all(ColumnType::is_datetime) {
            ColumnType::Timestamp
        } else {
            ColumnType::Varchar
        }
    }

    #[inline]
    fn is_float(&self) -> bool {
        matches!(self, ColumnType::BigInt | ColumnType::Double)
    }

    #[inline]
    fn is_datetime(&self) -> bool {
        matches!(self, ColumnType::Timestamp | ColumnType::Date)
    }
}

impl Column {
    /// One typed column per combined column, with names usable in SQL.
    pub(crate) fn infer(table: &CombinedTable) -> Vec<Column> {
        unique_names(&table.columns)
            .into_iter()
            .enumerate()
            .map(|(index, name)| Column {
                name,
                kind: ColumnType::detect(table.rows.iter().map(|row| row.get(index).and_then(ColumnType::from))),
            })
            .collect()
    }
}

/// Names blank labels `columnN` and suffixes repeated ones (`Val`, `Val_1`).
pub(crate) fn unique_names(labels: &[String]) -> Vec<String> {
    let mut used = HashSet::<String>::new();
    labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let base = match label.trim() {
                "" => format!("column{}", index + 1),
                label => label.to_owned(),
            };
            let mut name = base.clone();
            let mut suffix = 0usize;
            while used.contains(&name.to_lowercase()) {
                suffix += 1;
                name = format!("{base}_{suffix}");
            }
            used.insert(name.to_lowercase());
            name
        })
        .collect()
}
