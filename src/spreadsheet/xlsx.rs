use crate::error::RustySubtableError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::open_reader;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Cell;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Kind of a worksheet cell, from its `t` attribute
#[derive(Copy, Clone, Debug, PartialEq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    IsoDateTime,
    Error,
}

pub(crate) struct XlsxSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Number format per cell style index
    number_formats: Vec<NumberFormat>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    is_1904: bool,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str) -> Result<XlsxSpreadsheet, RustySubtableError> {
        let reader = open_reader(file_name)?;
        let mut zip = ZipArchive::new(reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            number_formats,
            sheets,
            is_1904,
        })
    }

    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustySubtableError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }

    /// Turns the raw text of a cell into a value according to its kind and style.
    fn to_cell_value(&self, kind: CellKind, style: Option<usize>, value: String, shared_strings: &[String]) -> Result<CellValue, RustySubtableError> {
        let value = match kind {
            CellKind::SharedString => {
                let index = value.trim().parse::<usize>()?;
                match shared_strings.get(index) {
                    Some(text) => CellValue::Text(text.to_owned()),
                    None => Err(SpreadsheetError::SharedStringError(index, shared_strings.len()))?,
                }
            }
            CellKind::InlineString => CellValue::Text(value),
            CellKind::Boolean => CellValue::Boolean(value.trim() == "1" || value.trim() == "true"),
            CellKind::IsoDateTime => parse_iso_datetime(&value).unwrap_or(CellValue::Text(value)),
            CellKind::Number => {
                let number = value.trim().parse::<f64>()?;
                let format = style
                    .and_then(|index| self.number_formats.get(index))
                    .copied()
                    .unwrap_or_default();
                format.to_cell_value(number, self.is_1904)
            }
            CellKind::Error => CellValue::Empty,
        };
        Ok(value)
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn read_first_sheet(&mut self, error_as_null: bool) -> Result<Sheet, RustySubtableError> {
        let shared_strings = self.load_shared_strings()?;
        let (sheet_name, zip_path) = self.sheets[0].clone();
        let mut sheet = Sheet::new(&self.name, &sheet_name);

        let mut cells = Vec::<(usize, usize, CellKind, Option<usize>, String)>::new();
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellKind::Number;
        let mut style = None::<usize>;
        let mut value = String::new();
        let mut reader = self.zip.xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                    row_count = number.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                value.clear();
                kind = event.get_attribute_value("t")?.map(|t| {
                    match t.as_ref() {
                        "inlineStr" | "str" => CellKind::InlineString,
                        "s" => CellKind::SharedString,
                        "d" => CellKind::IsoDateTime,
                        "b" => CellKind::Boolean,
                        "e" => CellKind::Error,
                        _ => CellKind::Number,
                    }
                }).unwrap_or(CellKind::Number);
                style = event.get_attribute_value("s")?
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<usize>())
                    .transpose()?;
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    cells.push((row, col, kind, style, std::mem::take(&mut value)));
                }
            }
        });
        drop(reader);

        for (row, col, kind, style, value) in cells {
            if kind == CellKind::Error && !error_as_null {
                return Err(SpreadsheetError::CellValueError(
                    sheet.file_name.to_owned(),
                    sheet.name.to_owned(),
                    index_to_reference(row, col),
                    value,
                ).into());
            }
            let value = self.to_cell_value(kind, style, value, &shared_strings)?;
            sheet.push(Cell { row, col, value });
        }
        Ok(sheet)
    }
}

/// Parses an ISO 8601 date or date time from a `t="d"` cell.
fn parse_iso_datetime(value: &str) -> Option<CellValue> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(CellValue::DateTime)
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(CellValue::Date)
    }
}

/// Loads worksheet relationships as a map of relationship id to zip path
fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, RustySubtableError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the archive
fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads worksheet names and paths from workbook.xml, along with the date system
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), RustySubtableError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads the number format of every cell style from styles.xml
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<NumberFormat>, RustySubtableError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, NumberFormat>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), NumberFormat::parse_custom_number_format(&format));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(event.get_attribute_value("numFmtId")?.unwrap_or_default().to_string());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberFormat::parse_builtin_number_format_id(id))
                .unwrap_or(NumberFormat::Number)
        })
        .collect())
}

/// Reads string content up to `end_tag`, skipping phonetic annotations
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, UnifiedReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, RustySubtableError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures::sheet_data;
    use crate::spreadsheet::fixtures::write_xlsx;
    use crate::spreadsheet::fixtures::write_zip;
    use crate::spreadsheet::fixtures::xlsx_parts;
    use crate::spreadsheet::open_spreadsheet;

    fn read(parts: Vec<(&str, String)>, error_as_null: bool) -> Result<Vec<Vec<CellValue>>, RustySubtableError> {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("book.xlsx");
        write_zip(&path, &parts);
        let mut spreadsheet = open_spreadsheet(path.to_str().unwrap())?;
        Ok(spreadsheet.read_first_sheet(error_as_null)?.into_rows())
    }

    #[test]
    fn read_first_sheet_only() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("book.xlsx");
        write_xlsx(&path, &[
            vec!["Id", "Val"],
            vec!["1", "a"],
            vec![],
            vec!["2", "b"],
        ]);
        let mut spreadsheet = open_spreadsheet(path.to_str().unwrap()).unwrap();
        let sheet = spreadsheet.read_first_sheet(false).unwrap();
        assert_eq!(sheet.name, "Data");

        let rows = sheet.into_rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec![CellValue::from("Id"), CellValue::from("Val")]);
        assert_eq!(rows[1], vec![CellValue::Number(1.0), CellValue::from("a")]);
        assert_eq!(rows[2], vec![CellValue::Empty, CellValue::Empty]);
        assert_eq!(rows[3], vec![CellValue::Number(2.0), CellValue::from("b")]);
    }

    #[test]
    fn read_shared_strings_booleans_and_dates() {
        let mut parts = xlsx_parts(concat!(
            r#"<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1" t="b"><v>1</v></c></row>"#,
            r#"<row r="2"><c r="A2" s="1"><v>45000</v></c><c r="B2" t="d"><v>2024-02-29T08:30:00</v></c></row>"#,
        ));
        parts.push(("xl/sharedStrings.xml", concat!(
            r#"<sst><si><t>skip</t></si><si><r><t>Food</t></r><r><t>Code</t></r><rPh><t>x</t></rPh></si></sst>"#,
        ).to_owned()));
        parts.push(("xl/styles.xml", concat!(
            r#"<styleSheet><numFmts><numFmt numFmtId="164" formatCode="yyyy/mm/dd"/></numFmts>"#,
            r#"<cellXfs><xf numFmtId="0"/><xf numFmtId="164"/></cellXfs></styleSheet>"#,
        ).to_owned()));

        let rows = read(parts, false).unwrap();
        assert_eq!(rows[0], vec![CellValue::from("FoodCode"), CellValue::Boolean(true)]);
        assert_eq!(rows[1][0], CellValue::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()));
        assert_eq!(rows[1][1], CellValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(8, 30, 0).unwrap()
        ));
    }

    #[test]
    fn read_cells_without_references() {
        let parts = xlsx_parts(r#"<row><c t="inlineStr"><is><t>a</t></is></c><c><v>2</v></c></row><row><c><v>3</v></c></row>"#);
        let rows = read(parts, false).unwrap();
        assert_eq!(rows, vec![
            vec![CellValue::from("a"), CellValue::Number(2.0)],
            vec![CellValue::Number(3.0), CellValue::Empty],
        ]);
    }

    #[test]
    fn error_cells() {
        let data = r#"<row r="1"><c r="A1"><v>1</v></c><c r="B1" t="e"><v>#DIV/0!</v></c></row>"#;
        let error = read(xlsx_parts(data), false).unwrap_err();
        assert!(matches!(
            &error,
            RustySubtableError::SpreadsheetError(SpreadsheetError::CellValueError(_, _, reference, value))
                if reference == "B1" && value == "#DIV/0!"
        ));

        let rows = read(xlsx_parts(data), true).unwrap();
        assert_eq!(rows, vec![vec![CellValue::Number(1.0)]]);
    }

    #[test]
    fn shared_string_out_of_range() {
        let mut parts = xlsx_parts(r#"<row r="1"><c r="A1" t="s"><v>5</v></c></row>"#);
        parts.push(("xl/sharedStrings.xml", r#"<sst><si><t>only</t></si></sst>"#.to_owned()));
        let error = read(parts, false).unwrap_err();
        assert!(matches!(
            error,
            RustySubtableError::SpreadsheetError(SpreadsheetError::SharedStringError(5, 1))
        ));
    }

    #[test]
    fn missing_workbook_part() {
        let parts = vec![("xl/worksheets/sheet1.xml", sheet_data(&[vec!["a"]]))];
        assert!(read(parts, false).is_err());
    }
}
