use crate::error::RustySubtableError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::open_reader;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Cell;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use iso8601_duration::Duration as IsoDuration;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Covered cells are the hidden part of merged cells
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
const SPACE: QName = QName(b"text:s");

#[derive(Error, Debug)]
pub(crate) enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,

    #[error("Invalid {0} value '{1}'")]
    ValueError(&'static str, String),
}

/// Kind of a table cell, from its `office:value-type` attribute
#[derive(Copy, Clone, Debug, PartialEq)]
enum CellKind {
    Empty,
    Number,
    Boolean,
    Date,
    Time,
    Text,
    Error,
}

pub(crate) struct OdsSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<UnifiedReader>,
}

impl OdsSpreadsheet {
    pub(crate) fn open(file_name: &str) -> Result<Self, RustySubtableError> {
        let reader = open_reader(file_name)?;
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_first_sheet(&mut self, error_as_null: bool) -> Result<Sheet, RustySubtableError> {
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_owned()))?;

        let mut sheet_name = None::<String>;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                sheet_name = Some(event.get_attribute_value("table:name")?.unwrap_or_default().to_string());
                break;
            }
        });
        let Some(sheet_name) = sheet_name else {
            return Err(SpreadsheetError::SpreadsheetEmptyError(self.name.to_owned()).into());
        };
        let mut sheet = Sheet::new(&self.name, &sheet_name);

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellKind::Empty;
        let mut value = String::new();
        let mut text_context = false;
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if event.name() == TABLE_ROW => row += row_count,
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
                let is_error = event.get_attribute_value("calcext:value-type")?
                    .map(|it| it == "error")
                    .unwrap_or(false);
                kind = match event.get_attribute_value("office:value-type")?.as_deref() {
                    _ if is_error => CellKind::Error,
                    Some("boolean") => {
                        value.push_str(&event.get_attribute_value("office:boolean-value")?.unwrap_or_default());
                        CellKind::Boolean
                    }
                    Some("date") => {
                        value.push_str(&event.get_attribute_value("office:date-value")?.unwrap_or_default());
                        CellKind::Date
                    }
                    Some("time") => {
                        value.push_str(&event.get_attribute_value("office:time-value")?.unwrap_or_default());
                        CellKind::Time
                    }
                    Some("string") => CellKind::Text,
                    Some(_) => {
                        value.push_str(&event.get_attribute_value("office:value")?.unwrap_or_default());
                        CellKind::Number
                    }
                    None => CellKind::Empty,
                };
                text_context = matches!(kind, CellKind::Text | CellKind::Error);
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind == CellKind::Error && !error_as_null {
                    Err(SpreadsheetError::CellValueError(
                        sheet.file_name.to_owned(),
                        sheet.name.to_owned(),
                        index_to_reference(row, col),
                        value.to_owned(),
                    ))?
                }
                if !matches!(kind, CellKind::Empty | CellKind::Error) && !value.is_empty() {
                    let cell_value = to_cell_value(kind, &value)?;
                    for row_offset in 0..row_count {
                        for col_offset in 0..col_count {
                            sheet.push(Cell {
                                row: row + row_offset,
                                col: col + col_offset,
                                value: cell_value.clone(),
                            });
                        }
                    }
                }
                col += col_count;
                text_context = false;
                comment_context = false;
            }
            Event::Start(event) if text_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if text_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if text_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if text_context && !comment_context && event.name() == SPACE => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                value.extend(std::iter::repeat_n(' ', count));
            }
            Event::Text(event) if text_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if text_context && !comment_context => value.push_bytes_ref(&event)?,
        });
        Ok(sheet)
    }
}

/// Converts the attribute or text content of a typed cell into a value
fn to_cell_value(kind: CellKind, value: &str) -> Result<CellValue, RustySubtableError> {
    let cell_value = match kind {
        CellKind::Number => CellValue::Number(value.trim().parse::<f64>()?),
        CellKind::Boolean => CellValue::Boolean(value != "false" && value != "0"),
        CellKind::Date if value.contains('T') => {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(CellValue::DateTime)
                .map_err(|_| OdsError::ValueError("date", value.to_owned()))?
        }
        CellKind::Date => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(CellValue::Date)
                .map_err(|_| OdsError::ValueError("date", value.to_owned()))?
        }
        CellKind::Time => {
            let duration = value
                .parse::<IsoDuration>()
                .map_err(|_| OdsError::ValueError("time", value.to_owned()))?;
            let seconds = duration.second.trunc() as u32;
            let nanoseconds = (duration.second.fract() * 1e9).round() as u32;
            NaiveTime::from_hms_nano_opt(duration.hour as u32 % 24, duration.minute as u32, seconds, nanoseconds)
                .map(CellValue::Time)
                .ok_or_else(|| OdsError::ValueError("time", value.to_owned()))?
        }
        CellKind::Text => CellValue::Text(value.to_owned()),
        CellKind::Empty | CellKind::Error => CellValue::Empty,
    };
    Ok(cell_value)
}

/// Validates the mimetype entry when the archive carries one
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), RustySubtableError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Looks for encryption data in the manifest
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, RustySubtableError> {
    let Some(mut reader) = zip.xml_reader("META-INF/manifest.xml")? else {
        return Ok(false);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:encryption-data") => return Ok(true),
    });
    Ok(false)
}
