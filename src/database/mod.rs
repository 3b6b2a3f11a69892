//! Mapping of combined tables onto DuckDB column types
pub(crate) mod column;
