//! # Subtable Extraction Module
//!
//! Finds the independent tables stacked inside one sheet, turns each of them
//! into a structured table and unions the tables of many files into one
//! combined table.
//!
//! The flow is strictly downstream:
//! directory → file → raw rows → subtable blocks → structured tables → combined table.
use crate::spreadsheet::cell::Row;
use std::sync::Arc;
use thiserror::Error;

pub(crate) mod assembler;
pub(crate) mod directory;
pub(crate) mod merger;
pub(crate) mod options;
pub(crate) mod processor;
pub(crate) mod segmenter;
pub(crate) mod transform;

/// Repair step applied to every assembled table.
/// Its result replaces the table as is.
pub(crate) type Transform = Arc<dyn Fn(StructuredTable) -> StructuredTable + Send + Sync>;

#[derive(Error, Debug)]
pub(crate) enum SubtableError {
    #[error("Subtable {block} of '{file}' is malformed: {source}")]
    Format {
        file: String,
        block: usize,
        source: AssembleError,
    },

    #[error("No header marker configured for subtable mode")]
    Configuration,

    #[error("No subtable found in '{0}'")]
    EmptyResult(String),
}

#[derive(Error, Debug, PartialEq)]
pub(crate) enum AssembleError {
    #[error("data row {row} has {found} cells but the header has {expected}")]
    ArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("block has no header row")]
    MissingHeader,
}

/// Contiguous rows of one logical table. The first row is the header row.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct RawSubtableBlock {
    pub(crate) rows: Vec<Row>,
}

impl RawSubtableBlock {
    pub(crate) fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Number of data rows below the header
    pub(crate) fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// Column labels plus positional data rows.
/// Labels are not required to be unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct StructuredTable {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Row>,
}

impl StructuredTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Position of the first column with the given label
    pub(crate) fn position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == label)
    }
}

/// Union of all structured tables of a run, in file, then table, then row order.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CombinedTable {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Row>,
}

impl CombinedTable {
    pub(crate) fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
