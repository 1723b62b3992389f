//! Row-by-row record reading for spreadsheet and CSV files.

use std::fs::File;
use std::path::PathBuf;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use horoscope_shared::{CellValue, HoroscopeError, Record, Result, SourceFile};
use tracing::{debug, warn};

/// Sheet preferred over the first one when a workbook contains it.
pub const PREFERRED_SHEET: &str = "сотрудники";

/// Open a source file and return a lazy iterator over its data rows.
///
/// Errors cover opening and header parsing only; the caller decides whether
/// they are fatal. Fully blank rows are skipped.
pub fn read_records(source: &SourceFile) -> Result<RecordIter> {
    match source.extension().as_deref() {
        Some("csv") => Ok(RecordIter::Delimited(CsvRows::open(source)?)),
        _ => Ok(RecordIter::Sheet(SheetRows::open(source)?)),
    }
}

/// Records of one source file, in row order.
pub enum RecordIter {
    Sheet(SheetRows),
    Delimited(CsvRows),
}

impl Iterator for RecordIter {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        match self {
            Self::Sheet(rows) => rows.next(),
            Self::Delimited(rows) => rows.next(),
        }
    }
}

// ---------------------------------------------------------------------------
// Spreadsheets (xlsx, xlsm, xls, ods)
// ---------------------------------------------------------------------------

/// Rows of the selected worksheet. The first row of the used range is the header.
pub struct SheetRows {
    headers: Vec<String>,
    range: Range<Data>,
    next_row: usize,
}

impl SheetRows {
    fn open(source: &SourceFile) -> Result<Self> {
        let path = source.path();
        let mut workbook =
            open_workbook_auto(path).map_err(|e| HoroscopeError::read(path, e.to_string()))?;

        let names = workbook.sheet_names();
        let sheet = names
            .iter()
            .find(|name| name.as_str() == PREFERRED_SHEET)
            .or_else(|| names.first())
            .cloned()
            .ok_or_else(|| HoroscopeError::read(path, "workbook contains no sheets"))?;

        debug!(file = %source, %sheet, "selected worksheet");

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| HoroscopeError::read(path, format!("sheet '{sheet}': {e}")))?;

        let headers = unique_headers(
            (0..range.width())
                .map(|col| {
                    let name = range
                        .get((0, col))
                        .map(|cell| cell.to_string().trim().to_string())
                        .unwrap_or_default();
                    header_or_placeholder(name, col)
                })
                .collect(),
        );

        Ok(Self {
            headers,
            range,
            next_row: 1,
        })
    }
}

impl Iterator for SheetRows {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while self.next_row < self.range.height() {
            let row = self.next_row;
            self.next_row += 1;

            let record = Record::new(
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(col, name)| {
                        let value = self
                            .range
                            .get((row, col))
                            .map_or(CellValue::Empty, sheet_cell);
                        (name.clone(), value)
                    })
                    .collect(),
            );

            if !record.is_blank() {
                return Some(record);
            }
        }
        None
    }
}

/// Convert a worksheet cell into a [`CellValue`].
fn sheet_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Float(dt.as_f64()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or(CellValue::Float(dt.as_f64()), CellValue::DateTime),
        Data::DateTimeIso(s) => {
            parse_iso_datetime(s).unwrap_or_else(|| CellValue::String(s.clone()))
        }
        Data::DurationIso(s) => CellValue::String(s.clone()),
        // Formula errors (#N/A, #DIV/0!) carry no usable value.
        Data::Error(_) => CellValue::Empty,
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Rows of a CSV file with a header line.
pub struct CsvRows {
    path: PathBuf,
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<File>,
    finished: bool,
}

impl CsvRows {
    fn open(source: &SourceFile) -> Result<Self> {
        let path = source.path();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| HoroscopeError::read(path, e.to_string()))?;

        let headers = unique_headers(
            reader
                .headers()
                .map_err(|e| HoroscopeError::read(path, format!("header: {e}")))?
                .iter()
                .enumerate()
                .map(|(col, name)| header_or_placeholder(name.trim().to_string(), col))
                .collect(),
        );

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records: reader.into_records(),
            finished: false,
        })
    }
}

impl Iterator for CsvRows {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while !self.finished {
            let row = match self.records.next()? {
                Ok(row) => row,
                Err(e) => {
                    warn!(file = %self.path.display(), error = %e, "malformed CSV row, stopping file");
                    self.finished = true;
                    return None;
                }
            };

            let record = Record::new(
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(col, name)| {
                        let value = row.get(col).map_or(CellValue::Empty, csv_cell);
                        (name.clone(), value)
                    })
                    .collect(),
            );

            if !record.is_blank() {
                return Some(record);
            }
        }
        None
    }
}

/// CSV cells are text; blanks are absent and ISO dates are lifted to dates.
fn csv_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    parse_iso_datetime(trimmed).unwrap_or_else(|| CellValue::String(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn header_or_placeholder(name: String, col: usize) -> String {
    if name.is_empty() {
        format!("column_{}", col + 1)
    } else {
        name
    }
}

/// Suffix repeated header names with `.1`, `.2`, ... so every column keeps its own name.
fn unique_headers(names: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut unique = name.clone();
        let mut n = 1;
        while seen.contains(&unique) {
            unique = format!("{name}.{n}");
            n += 1;
        }
        seen.push(unique);
    }
    seen
}

/// Parse `YYYY-MM-DD` with an optional time part.
fn parse_iso_datetime(s: &str) -> Option<CellValue> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(CellValue::Date(date));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(CellValue::DateTime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &std::path::Path, name: &str, content: &str) -> SourceFile {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        SourceFile::new(path)
    }

    /// Write a workbook whose sheets hold string rows; empty strings leave the cell unset.
    fn write_workbook(dir: &std::path::Path, name: &str, sheets: Vec<(&str, Vec<Vec<&str>>)>) -> SourceFile {
        let path = dir.join(name);
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for (sheet_name, rows) in sheets {
            let sheet = workbook.add_worksheet();
            sheet.set_name(sheet_name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if !value.is_empty() {
                        sheet.write_string(r as u32, c as u16, *value).unwrap();
                    }
                }
            }
        }
        workbook.save(&path).unwrap();
        SourceFile::new(path)
    }

    #[test]
    fn workbook_prefers_employee_sheet() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_workbook(
            tmp.path(),
            "staff.xlsx",
            vec![
                ("Лист1", vec![vec!["ИО"], vec!["не тот лист"]]),
                (
                    PREFERRED_SHEET,
                    vec![vec!["ИО", "Город чист"], vec!["Иванов И.И.", "Москва"]],
                ),
            ],
        );

        let records: Vec<Record> = read_records(&source).unwrap().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ИО"), Some(&CellValue::from("Иванов И.И.")));
        assert_eq!(records[0].get("Город чист"), Some(&CellValue::from("Москва")));
    }

    #[test]
    fn workbook_falls_back_to_first_sheet() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_workbook(
            tmp.path(),
            "staff.xlsx",
            vec![
                ("A", vec![vec!["ИО"], vec!["из первого"]]),
                ("B", vec![vec!["ИО"], vec!["из второго"]]),
            ],
        );

        let records: Vec<Record> = read_records(&source).unwrap().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ИО"), Some(&CellValue::from("из первого")));
    }

    #[test]
    fn workbook_dates_empty_cells_and_blank_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("staff.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(PREFERRED_SHEET).unwrap();
        sheet.write_string(0, 0, "ИО").unwrap();
        sheet.write_string(0, 1, "День рождения").unwrap();
        sheet.write_string(0, 2, "Город чист").unwrap();
        sheet.write_string(0, 3, "Город чист").unwrap();

        let birthday = rust_xlsxwriter::ExcelDateTime::from_ymd(1985, 4, 2).unwrap();
        let date_format = rust_xlsxwriter::Format::new().set_num_format("dd.mm.yyyy");
        sheet.write_string(1, 0, "Иванов И.И.").unwrap();
        sheet
            .write_datetime_with_format(1, 1, &birthday, &date_format)
            .unwrap();
        sheet.write_string(1, 2, "Москва").unwrap();
        sheet.write_string(1, 3, "Moscow").unwrap();
        // Row 2 stays blank.
        sheet.write_string(3, 0, "Петров П.П.").unwrap();
        workbook.save(&path).unwrap();

        let records: Vec<Record> = read_records(&SourceFile::new(path)).unwrap().collect();
        assert_eq!(records.len(), 2);

        let birthday = NaiveDate::from_ymd_opt(1985, 4, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            records[0].get("День рождения"),
            Some(&CellValue::DateTime(birthday))
        );
        assert_eq!(records[0].get("Город чист.1"), Some(&CellValue::from("Moscow")));

        assert_eq!(records[1].get("ИО"), Some(&CellValue::from("Петров П.П.")));
        assert_eq!(records[1].get("День рождения"), Some(&CellValue::Empty));
        assert_eq!(records[1].get("Город чист"), Some(&CellValue::Empty));
    }

    #[test]
    fn csv_rows_become_records() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_file(
            tmp.path(),
            "staff.csv",
            "ИО,День рождения,Город чист\n\
             Иванов И.И.,1985-04-02,Москва\n\
             Петров П.П.,,\n",
        );

        let records: Vec<Record> = read_records(&source).unwrap().collect();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.get("ИО"), Some(&CellValue::from("Иванов И.И.")));
        assert_eq!(
            first.get("День рождения"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(1985, 4, 2).unwrap()))
        );

        let second = &records[1];
        assert_eq!(second.get("Город чист"), Some(&CellValue::Empty));
        assert_eq!(second.get("День рождения"), Some(&CellValue::Empty));
    }

    #[test]
    fn csv_blank_rows_skipped_and_short_rows_padded() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_file(tmp.path(), "staff.csv", "a,b,c\n1,2,3\n,,\n4\n");

        let records: Vec<Record> = read_records(&source).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("a"), Some(&CellValue::from("4")));
        assert_eq!(records[1].get("c"), Some(&CellValue::Empty));
    }

    #[test]
    fn csv_empty_header_gets_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_file(tmp.path(), "staff.csv", "ИО,\nx,y\n");

        let records: Vec<Record> = read_records(&source).unwrap().collect();
        assert_eq!(records[0].get("column_2"), Some(&CellValue::from("y")));
    }

    #[test]
    fn csv_duplicate_headers_are_suffixed() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_file(
            tmp.path(),
            "staff.csv",
            "ИО,Город чист,Город чист,Город чист\nA,X,Y,Z\n",
        );

        let records: Vec<Record> = read_records(&source).unwrap().collect();
        let names: Vec<&str> = records[0].iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["ИО", "Город чист", "Город чист.1", "Город чист.2"]);
        assert_eq!(records[0].get("Город чист"), Some(&CellValue::from("X")));
        assert_eq!(records[0].get("Город чист.1"), Some(&CellValue::from("Y")));
        assert_eq!(records[0].get("Город чист.2"), Some(&CellValue::from("Z")));
    }

    #[test]
    fn unique_headers_skips_taken_suffixes() {
        let names = vec!["a".to_string(), "a.1".to_string(), "a".to_string(), "a".to_string()];
        assert_eq!(unique_headers(names), vec!["a", "a.1", "a.2", "a.3"]);
    }

    #[test]
    fn missing_file_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = SourceFile::new(tmp.path().join("gone.xlsx"));
        assert!(matches!(
            read_records(&source),
            Err(HoroscopeError::Read { .. })
        ));
    }

    #[test]
    fn corrupt_workbook_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = write_file(tmp.path(), "broken.xlsx", "this is not a zip archive");
        let err = read_records(&source).err().expect("corrupt workbook must fail");
        assert!(err.to_string().contains("broken.xlsx"));
    }

    #[test]
    fn sheet_cells_convert() {
        assert_eq!(sheet_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(sheet_cell(&Data::Int(7)), CellValue::Int(7));
        assert_eq!(sheet_cell(&Data::Float(1.5)), CellValue::Float(1.5));
        assert_eq!(
            sheet_cell(&Data::String(" Москва ".into())),
            CellValue::String(" Москва ".into())
        );
        assert_eq!(
            sheet_cell(&Data::DateTimeIso("1985-04-02".into())),
            CellValue::Date(NaiveDate::from_ymd_opt(1985, 4, 2).unwrap())
        );
        assert_eq!(
            sheet_cell(&Data::Error(calamine::CellErrorType::NA)),
            CellValue::Empty
        );
    }

    #[test]
    fn iso_datetime_parsing() {
        assert!(matches!(
            parse_iso_datetime("2024-01-31T10:15:00"),
            Some(CellValue::DateTime(_))
        ));
        assert!(matches!(
            parse_iso_datetime("2024-01-31 10:15:00"),
            Some(CellValue::DateTime(_))
        ));
        assert_eq!(parse_iso_datetime("31.01.2024"), None);
        assert_eq!(parse_iso_datetime("Москва"), None);
    }
}
