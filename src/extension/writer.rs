//! Writes combined table cells into DuckDB vectors.

use crate::database::column::Column;
use crate::database::column::ColumnError;
use crate::database::column::ColumnType;
use crate::error::RustySubtableError;
use crate::spreadsheet::cell::CellValue;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Timelike;
use duckdb::core::FlatVector;
use duckdb::core::Inserter;
use libduckdb_sys::duckdb_date;
use libduckdb_sys::duckdb_time;
use libduckdb_sys::duckdb_timestamp;

/// Physical value of one output cell, checked against its column type
#[derive(Debug, PartialEq)]
enum Slot {
    Null,
    Varchar(String),
    Boolean(bool),
    BigInt(i64),
    Double(f64),
    Timestamp(i64),
    Date(i32),
    Time(i64),
}

/// Values that do not fit the column type are reported, not coerced.
fn to_slot(column: &Column, value: &CellValue) -> Result<Slot, ColumnError> {
    if value.is_empty() {
        return Ok(Slot::Null);
    }
    Ok(match (column.kind, value) {
        (ColumnType::Varchar, value) => Slot::Varchar(value.to_string()),
        (ColumnType::Boolean, CellValue::Boolean(value)) => Slot::Boolean(*value),
        (ColumnType::BigInt, CellValue::Number(value)) => Slot::BigInt(*value as i64),
        (ColumnType::Double, CellValue::Number(value)) => Slot::Double(*value),
        (ColumnType::Timestamp, CellValue::DateTime(value)) => Slot::Timestamp(value.and_utc().timestamp_micros()),
        (ColumnType::Timestamp, CellValue::Date(value)) => {
            Slot::Timestamp(value.and_time(NaiveTime::MIN).and_utc().timestamp_micros())
        }
        (ColumnType::Date, CellValue::Date(value)) => Slot::Date(days_since_epoch(value)),
        (ColumnType::Time, CellValue::Time(value)) => Slot::Time(micros_since_midnight(value)),
        (kind, value) => Err(ColumnError::ValueError(column.name.to_owned(), value.to_string(), kind.as_str()))?,
    })
}

/// Writes one value, `NULL` for empty cells.
pub(super) fn write_to_vector(column: &Column, value: &CellValue, vector: &mut FlatVector, row: usize) -> Result<(), RustySubtableError> {
    match to_slot(column, value)? {
        Slot::Null => vector.set_null(row),
        Slot::Varchar(value) => vector.insert(row, value.as_str()),
        Slot::Boolean(value) => write_primitive(vector, row, value),
        Slot::BigInt(value) => write_primitive(vector, row, value),
        Slot::Double(value) => write_primitive(vector, row, value),
        Slot::Timestamp(micros) => write_primitive(vector, row, duckdb_timestamp { micros }),
        Slot::Date(days) => write_primitive(vector, row, duckdb_date { days }),
        Slot::Time(micros) => write_primitive(vector, row, duckdb_time { micros }),
    }
    Ok(())
}

/// Writes a primitive value directly to a vector using pointer arithmetic.
/// `T` must match the physical type of the vector and `index` must be below its capacity.
pub(super) fn write_primitive<T>(vector: &mut FlatVector, index: usize, value: T) {
    debug_assert!(index < vector.capacity());
    unsafe {
        let pointer: *mut T = vector.as_mut_ptr();
        std::ptr::write(pointer.add(index), value);
    }
}

fn days_since_epoch(date: &NaiveDate) -> i32 {
    (*date - NaiveDate::default()).num_days() as i32
}

fn micros_since_midnight(time: &NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1_000_000 + (time.nanosecond() / 1_000) as i64
}
