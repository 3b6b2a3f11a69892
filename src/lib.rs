//! # DuckDB Subtable Extension
//!
//! A DuckDB extension for reading spreadsheets that stack several tables in
//! one sheet. Every row holding the header marker starts a new table; the
//! tables of all files below a directory are unioned by column name into one
//! result.
//!
//! ## Features
//!
//! - **Formats**: Excel (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`),
//!   local or remote through DuckDB's `read_blob`
//! - **Subtable detection**: the marker may sit in any column of a header row;
//!   rows before the first header and empty rows are ignored
//! - **Repairs**: drop all-empty columns and copy a known cell between rows
//!   before tables are merged
//! - **Raw mode**: concatenate whole sheets with generated column names
//! - **Typed output**: BOOLEAN, BIGINT, DOUBLE, TIMESTAMP, DATE and TIME
//!   columns are inferred from the combined data
//!
//! ## Table Functions
//!
//! - `read_subtables`: the combined table of all subtables below a path
//! - `analyze_subtables`: one row per subtable with its file, labels and size
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod database;
mod error;
mod extension;
mod helpers;
mod spreadsheet;
mod subtable;

use crate::extension::analyze_subtables::AnalyzeSubtablesTableFunction;
use crate::extension::read_subtables::ReadSubtablesTableFunction;
use anyhow::Context;
use anyhow::Result;
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;

/// Extension entry point for DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    connection
        .register_table_function::<ReadSubtablesTableFunction>("read_subtables")
        .context("Failed to register read_subtables table function")?;
    connection
        .register_table_function::<AnalyzeSubtablesTableFunction>("analyze_subtables")
        .context("Failed to register analyze_subtables table function")?;
    Ok(())
}
