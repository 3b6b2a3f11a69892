use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// A single raw cell value. No coercion happens after reading.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// One row of a raw sheet or structured table, addressed by position.
pub(crate) type Row = Vec<CellValue>;

impl CellValue {
    /// Returns true for a missing value.
    /// Blank text counts as missing, matching what spreadsheet tools display.
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

/// Returns true if every cell of the row is empty.
pub(crate) fn is_empty_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_empty)
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(value) => write!(f, "{}", value),
            CellValue::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => write!(f, "{}", *value as i64),
            CellValue::Number(value) => write!(f, "{}", value),
            CellValue::Text(value) => write!(f, "{}", value),
            CellValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            CellValue::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
        }
    }
}

/// How a numeric cell is displayed, derived from its number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum NumberFormat {
    #[default]
    Number,
    DateTime,
    Date,
    Time,
}

impl NumberFormat {
    /// Parses built-in Excel number format IDs.
    pub(crate) fn parse_builtin_number_format_id(id: &str) -> Option<Self> {
        match id {
            "22" => Some(Self::DateTime),
            "14" | "15" | "16" | "17" => Some(Self::Date),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time),
            _ => None,
        }
    }

    /// Parses custom number format strings, looking for date/time tokens
    /// outside of literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::DateTime,
            (true, false) => Self::Date,
            (false, true) => Self::Time,
            (false, false) => Self::Number,
        }
    }

    /// Converts a serial number into a cell value of this format.
    /// Serials that fall outside chrono's range stay numbers.
    pub(crate) fn to_cell_value(self, serial: f64, is_1904: bool) -> CellValue {
        if self == Self::Number {
            return CellValue::Number(serial);
        }
        match serial_to_datetime(serial, is_1904) {
            Some(datetime) => match self {
                Self::DateTime => CellValue::DateTime(datetime),
                Self::Date => CellValue::Date(datetime.date()),
                _ => CellValue::Time(datetime.time()),
            },
            None => CellValue::Number(serial),
        }
    }
}

/// Converts an Excel serial number to a date time.
/// Handles the Lotus 1-2-3 leap year bug for the 1900 epoch.
fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let mut days = serial.trunc() as i64;
    if !is_1904 && days < 60 {
        days += 1;
    }
    let micros = (serial.fract() * 86_400_000_000f64).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::microseconds(micros))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_numbers() {
        assert_eq!(CellValue::Number(21.0).to_string(), "21");
        assert_eq!(CellValue::Number(0.25).to_string(), "0.25");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Boolean(true).to_string(), "true");
    }

    #[test]
    fn empty_cells_and_rows() {
        assert!(CellValue::Text(String::new()).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(is_empty_row(&[CellValue::Empty, CellValue::from("")]));
        assert!(!is_empty_row(&[CellValue::Empty, CellValue::from("x")]));
        assert!(is_empty_row(&[]));
    }

    #[test]
    fn custom_number_formats() {
        assert_eq!(NumberFormat::parse_custom_number_format("yyyy-mm-dd"), NumberFormat::Date);
        assert_eq!(NumberFormat::parse_custom_number_format("hh:mm:ss"), NumberFormat::Time);
        assert_eq!(NumberFormat::parse_custom_number_format("yyyy-mm-dd hh:mm"), NumberFormat::DateTime);
        assert_eq!(NumberFormat::parse_custom_number_format("[Red]0.00"), NumberFormat::Number);
        assert_eq!(NumberFormat::parse_custom_number_format("0.0\" days\""), NumberFormat::Number);
    }

    #[test]
    fn serial_dates() {
        let date = NumberFormat::Date.to_cell_value(45000.0, false);
        assert_eq!(date, CellValue::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()));

        let date = NumberFormat::Date.to_cell_value(1.0, false);
        assert_eq!(date, CellValue::Date(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()));

        let date = NumberFormat::Date.to_cell_value(0.0, true);
        assert_eq!(date, CellValue::Date(NaiveDate::from_ymd_opt(1904, 1, 1).unwrap()));

        let time = NumberFormat::Time.to_cell_value(0.5, false);
        assert_eq!(time, CellValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));

        assert_eq!(NumberFormat::Date.to_cell_value(-1.0, false), CellValue::Number(-1.0));
    }
}
