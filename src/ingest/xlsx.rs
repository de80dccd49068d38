//! Minimal `.xlsx` reader for the ingestion job.
//!
//! Reads the first worksheet of a workbook archive into a row-major grid of
//! cell strings, resolving shared and inline strings. Row and column gaps in
//! the sheet are preserved as empty cells so row indices stay stable.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Bound on decompressed bytes read from a single archive entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Bound on cells parsed per sheet.
const MAX_CELLS: usize = 100_000;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to read workbook: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid workbook archive: {0}")]
    Archive(String),
    #[error("worksheet XML error: {0}")]
    Xml(String),
    #[error("workbook contains no worksheets")]
    NoWorksheet,
}

/// Read the first worksheet of an `.xlsx` file as a grid of cell strings.
/// The first row is the header row.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, WorkbookError> {
    let bytes = std::fs::read(path)?;
    rows_from_bytes(&bytes)
}

pub fn rows_from_bytes(bytes: &[u8]) -> Result<Vec<Vec<String>>, WorkbookError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| WorkbookError::Archive(e.to_string()))?;

    // Workbooks without any string cells legitimately omit this entry.
    let shared_strings = match read_entry(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(_) => Vec::new(),
    };

    let sheet_name = first_worksheet_name(&archive).ok_or(WorkbookError::NoWorksheet)?;
    let sheet_xml = read_entry(&mut archive, &sheet_name)?;
    parse_sheet_grid(&sheet_xml, &shared_strings)
}

fn read_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, WorkbookError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| WorkbookError::Archive(e.to_string()))?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(WorkbookError::Archive(format!(
            "entry {} exceeds size limit",
            name
        )));
    }
    Ok(out)
}

/// The lowest-numbered `xl/worksheets/sheetN.xml` entry.
fn first_worksheet_name<R: Read + Seek>(archive: &zip::ZipArchive<R>) -> Option<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names.into_iter().next()
}

/// Collect shared strings, concatenating rich-text runs within one `<si>`.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, WorkbookError> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_t => {
                let text = t.unescape().map_err(|e| WorkbookError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(WorkbookError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    Number,
    Shared,
    InlineStr,
    FormulaStr,
    Boolean,
}

fn parse_sheet_grid(xml: &[u8], shared: &[String]) -> Result<Vec<Vec<String>>, WorkbookError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut current_row: Vec<String> = Vec::new();
    let mut row_number: Option<usize> = None;
    let mut in_row = false;
    let mut cell_kind = CellKind::Number;
    let mut cell_col = 0usize;
    let mut next_col = 0usize;
    let mut in_v = false;
    let mut in_inline_t = false;
    let mut cell_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    current_row = Vec::new();
                    row_number = parse_row_number(&e);
                    next_col = 0;
                }
                b"c" if in_row => {
                    if cell_count >= MAX_CELLS {
                        push_row(&mut rows, row_number, std::mem::take(&mut current_row));
                        return Ok(rows);
                    }
                    cell_count += 1;
                    let (kind, col) = read_cell_attrs(&e, next_col);
                    cell_kind = kind;
                    cell_col = col;
                    next_col = col + 1;
                }
                b"v" => in_v = true,
                b"t" if cell_kind == CellKind::InlineStr => in_inline_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                // A valueless cell still advances the column cursor.
                b"c" if in_row => {
                    let (_, col) = read_cell_attrs(&e, next_col);
                    next_col = col + 1;
                }
                b"row" => {
                    push_row(&mut rows, parse_row_number(&e), Vec::new());
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_v || in_inline_t => {
                let text = t
                    .unescape()
                    .map_err(|e| WorkbookError::Xml(e.to_string()))?
                    .into_owned();
                let value = match cell_kind {
                    CellKind::Shared => text
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared.get(i))
                        .cloned()
                        .unwrap_or_default(),
                    CellKind::Boolean => {
                        if text.trim() == "1" {
                            "TRUE".to_string()
                        } else {
                            "FALSE".to_string()
                        }
                    }
                    CellKind::Number | CellKind::InlineStr | CellKind::FormulaStr => text,
                };
                place_cell(&mut current_row, cell_col, value);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_inline_t = false,
                b"c" => cell_kind = CellKind::Number,
                b"row" => {
                    in_row = false;
                    push_row(&mut rows, row_number, std::mem::take(&mut current_row));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(WorkbookError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// Append a row at its 1-based sheet position, padding skipped rows with
/// empty ones so downstream row indices match the sheet.
fn push_row(rows: &mut Vec<Vec<String>>, row_number: Option<usize>, row: Vec<String>) {
    if let Some(n) = row_number {
        while rows.len() + 1 < n {
            rows.push(Vec::new());
        }
    }
    rows.push(row);
}

fn parse_row_number(e: &BytesStart) -> Option<usize> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() == b"r" {
            String::from_utf8_lossy(&attr.value).trim().parse().ok()
        } else {
            None
        }
    })
}

fn read_cell_attrs(e: &BytesStart, default_col: usize) -> (CellKind, usize) {
    let mut kind = CellKind::Number;
    let mut col = default_col;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"t" => {
                kind = match attr.value.as_ref() {
                    b"s" => CellKind::Shared,
                    b"inlineStr" => CellKind::InlineStr,
                    b"str" => CellKind::FormulaStr,
                    b"b" => CellKind::Boolean,
                    _ => CellKind::Number,
                }
            }
            b"r" => {
                if let Some(c) = column_index(&String::from_utf8_lossy(&attr.value)) {
                    col = c;
                }
            }
            _ => {}
        }
    }
    (kind, col)
}

/// 0-based column index from a cell reference like `B12`.
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: Vec<char> = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

/// Place a value at a column, padding gaps; rich-text runs for the same
/// cell are concatenated.
fn place_cell(row: &mut Vec<String>, col: usize, value: String) {
    while row.len() <= col {
        row.push(String::new());
    }
    if row[col].is_empty() {
        row[col] = value;
    } else {
        row[col].push_str(&value);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    /// Build a minimal single-sheet workbook with inline-string cells.
    pub fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
        let mut sheet =
            String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><worksheet><sheetData>");
        for (i, row) in rows.iter().enumerate() {
            sheet.push_str(&format!("<row r=\"{}\">", i + 1));
            for (j, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                sheet.push_str(&format!(
                    "<c r=\"{}{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    column_letter(j),
                    i + 1,
                    escape(cell)
                ));
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");
        archive_with_sheet(&sheet)
    }

    pub fn archive_with_sheet(sheet_xml: &str) -> Vec<u8> {
        archive_with_entries(&[("xl/worksheets/sheet1.xml", sheet_xml)])
    }

    pub fn archive_with_entries(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(name.to_string(), options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn column_letter(col: usize) -> char {
        (b'A' + col as u8) as char
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{archive_with_entries, archive_with_sheet, workbook_bytes};
    use super::*;

    #[test]
    fn reads_shared_string_and_numeric_cells() {
        let shared = "<?xml version=\"1.0\"?><sst>\
            <si><t>District</t></si>\
            <si><t>Deaths</t></si>\
            <si><t>Swat</t></si>\
        </sst>";
        let sheet = "<?xml version=\"1.0\"?><worksheet><sheetData>\
            <row r=\"1\">\
              <c r=\"A1\" t=\"s\"><v>0</v></c>\
              <c r=\"B1\" t=\"s\"><v>1</v></c>\
            </row>\
            <row r=\"2\">\
              <c r=\"A2\" t=\"s\"><v>2</v></c>\
              <c r=\"B2\"><v>12</v></c>\
            </row>\
        </sheetData></worksheet>";
        let bytes = archive_with_entries(&[
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let rows = rows_from_bytes(&bytes).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["District".to_string(), "Deaths".to_string()],
                vec!["Swat".to_string(), "12".to_string()],
            ]
        );
    }

    #[test]
    fn reads_inline_string_cells() {
        let rows = rows_from_bytes(&workbook_bytes(&[
            &["Name", "Status"],
            &["Peshawar Road", "Damaged"],
        ]))
        .unwrap();
        assert_eq!(rows[1], vec!["Peshawar Road".to_string(), "Damaged".to_string()]);
    }

    #[test]
    fn concatenates_rich_text_runs_in_shared_strings() {
        let shared = "<?xml version=\"1.0\"?><sst>\
            <si><r><t>Relief </t></r><r><t>Camps</t></r></si>\
        </sst>";
        let sheet = "<?xml version=\"1.0\"?><worksheet><sheetData>\
            <row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c></row>\
        </sheetData></worksheet>";
        let bytes = archive_with_entries(&[
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let rows = rows_from_bytes(&bytes).unwrap();
        assert_eq!(rows[0][0], "Relief Camps");
    }

    #[test]
    fn preserves_column_gaps() {
        let sheet = "<?xml version=\"1.0\"?><worksheet><sheetData>\
            <row r=\"1\"><c r=\"C1\"><v>99</v></c></row>\
        </sheetData></worksheet>";
        let rows = rows_from_bytes(&archive_with_sheet(sheet)).unwrap();
        assert_eq!(rows[0], vec!["".to_string(), "".to_string(), "99".to_string()]);
    }

    #[test]
    fn preserves_row_gaps_as_empty_rows() {
        let sheet = "<?xml version=\"1.0\"?><worksheet><sheetData>\
            <row r=\"1\"><c r=\"A1\"><v>1</v></c></row>\
            <row r=\"3\"><c r=\"A3\"><v>3</v></c></row>\
        </sheetData></worksheet>";
        let rows = rows_from_bytes(&archive_with_sheet(sheet)).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2][0], "3");
    }

    #[test]
    fn boolean_cells_render_as_true_false() {
        let sheet = "<?xml version=\"1.0\"?><worksheet><sheetData>\
            <row r=\"1\">\
              <c r=\"A1\" t=\"b\"><v>1</v></c>\
              <c r=\"B1\" t=\"b\"><v>0</v></c>\
            </row>\
        </sheetData></worksheet>";
        let rows = rows_from_bytes(&archive_with_sheet(sheet)).unwrap();
        assert_eq!(rows[0], vec!["TRUE".to_string(), "FALSE".to_string()]);
    }

    #[test]
    fn rejects_non_archive_input() {
        let err = rows_from_bytes(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, WorkbookError::Archive(_)));
    }

    #[test]
    fn archive_without_worksheets_is_an_error() {
        let bytes = archive_with_entries(&[("xl/sharedStrings.xml", "<sst/>")]);
        let err = rows_from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, WorkbookError::NoWorksheet));
    }

    #[test]
    fn column_index_handles_multi_letter_references() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("B12"), Some(1));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("42"), None);
    }
}
