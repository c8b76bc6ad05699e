//! Tabular input: CSV/TSV via `csv`, spreadsheets via `calamine`.
//!
//! The first row is the header. Rows keep their spreadsheet row number
//! (header = row 1) so that validation errors point at what the user sees.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use ecrisk_model::{PredictError, RawValue};

/// Input file flavour, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited(u8),
    Workbook,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self, PredictError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(InputFormat::Delimited(b',')),
            "tsv" | "tab" => Ok(InputFormat::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(InputFormat::Workbook),
            _ => Err(PredictError::InputRead {
                origin: path.display().to_string(),
                reason: format!(
                    "unsupported input format '{ext}' \
                     (expected csv, tsv, xlsx, xlsm, xlsb, xls or ods)"
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Worksheet to read; the first sheet when unset.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Spreadsheet row number.
    pub number: usize,
    pub cells: Vec<RawValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub origin: String,
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Build a table from numbered raw rows; the first row is the header.
    pub fn from_raw_rows<I>(origin: &str, raw_rows: I) -> Result<Self, PredictError>
    where
        I: IntoIterator<Item = (usize, Vec<RawValue>)>,
    {
        let input_err = |reason: String| PredictError::InputRead {
            origin: origin.to_string(),
            reason,
        };

        let mut raw_rows = raw_rows.into_iter();
        let (_, header_cells) = raw_rows
            .next()
            .ok_or_else(|| input_err("file is empty".into()))?;
        let headers: Vec<String> = header_cells
            .iter()
            .map(|c| c.as_text().into_owned())
            .collect();

        let mut seen = HashSet::new();
        for h in headers.iter().filter(|h| !h.is_empty()) {
            if !seen.insert(h.as_str()) {
                return Err(input_err(format!("duplicate column '{h}'")));
            }
        }
        if seen.is_empty() {
            return Err(input_err("header row has no column names".into()));
        }

        let mut rows = Vec::new();
        for (number, mut cells) in raw_rows {
            if cells.iter().all(is_blank) {
                continue;
            }
            if cells.len() > headers.len() {
                if cells[headers.len()..].iter().any(|c| !is_blank(c)) {
                    return Err(input_err(format!(
                        "row {number} has {} fields but the header has {}",
                        cells.len(),
                        headers.len()
                    )));
                }
                cells.truncate(headers.len());
            }
            cells.resize(headers.len(), RawValue::Empty);
            rows.push(TableRow { number, cells });
        }
        if rows.is_empty() {
            return Err(input_err("contains no data rows".into()));
        }

        Ok(Self {
            origin: origin.to_string(),
            headers,
            rows,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell<'t>(&'t self, row: &'t TableRow, name: &str) -> Option<&'t RawValue> {
        self.column_index(name).and_then(|i| row.cells.get(i))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_blank(cell: &RawValue) -> bool {
    match cell {
        RawValue::Empty => true,
        RawValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Read a patient table, picking the parser from the file extension.
pub fn read_table(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Table, PredictError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let table = match InputFormat::from_path(path)? {
        InputFormat::Delimited(delimiter) => {
            let file = std::fs::File::open(path).map_err(|e| PredictError::InputRead {
                origin: origin.clone(),
                reason: e.to_string(),
            })?;
            read_delimited(file, delimiter, &origin)?
        }
        InputFormat::Workbook => read_workbook(path, options.sheet.as_deref())?,
    };
    log::info!(
        "read {} data row(s) and {} column(s) from {origin}",
        table.rows.len(),
        table.headers.len()
    );
    Ok(table)
}

/// Parse delimited text from any reader.
pub fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    origin: &str,
) -> Result<Table, PredictError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut raw_rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let record = rec.map_err(|e| PredictError::InputRead {
            origin: origin.to_string(),
            reason: format!("failed reading row {}: {e}", idx + 1),
        })?;
        let cells = record
            .iter()
            .map(|field| RawValue::Text(field.to_string()))
            .collect();
        raw_rows.push((idx + 1, cells));
    }
    Table::from_raw_rows(origin, raw_rows)
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table, PredictError> {
    let origin = path.display().to_string();
    let input_err = |reason: String| PredictError::InputRead {
        origin: origin.clone(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| input_err(e.to_string()))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| input_err("workbook has no sheets".into()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| input_err(format!("sheet '{sheet_name}': {e}")))?;
    log::debug!("reading sheet '{sheet_name}' of {origin}");

    let first_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let raw_rows = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i, row.iter().map(cell_from_data).collect()));
    Table::from_raw_rows(&origin, raw_rows)
}

/// Convert a spreadsheet cell. Error cells such as `#N/A` count as empty.
pub fn cell_from_data(data: &Data) -> RawValue {
    match data {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::String(s) => RawValue::Text(s.clone()),
        other => RawValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            InputFormat::from_path(Path::new("a/b.CSV")).unwrap(),
            InputFormat::Delimited(b',')
        );
        assert_eq!(
            InputFormat::from_path(Path::new("cohort.xlsx")).unwrap(),
            InputFormat::Workbook
        );
        let err = InputFormat::from_path(Path::new("cohort.pkl")).unwrap_err();
        assert_eq!(err.kind(), "InputReadError");
    }

    #[test]
    fn delimited_rows_keep_spreadsheet_numbers() {
        let text = "id,Age\nP1,61\n,\nP2,70\n";
        let table = read_delimited(text.as_bytes(), b',', "mem.csv").unwrap();
        assert_eq!(table.headers, vec!["id", "Age"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].number, 2);
        assert_eq!(table.rows[1].number, 4);
        assert_eq!(
            table.cell(&table.rows[1], "Age"),
            Some(&RawValue::Text("70".into()))
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let table = read_delimited("a\tb\tc\n1\t2\n".as_bytes(), b'\t', "mem.tsv").unwrap();
        assert_eq!(table.rows[0].cells[2], RawValue::Empty);
    }

    #[test]
    fn long_rows_with_data_are_rejected() {
        let err = read_delimited("a,b\n1,2,3\n".as_bytes(), b',', "mem.csv").unwrap_err();
        assert!(err.to_string().contains("row 2 has 3 fields"));
        assert!(read_delimited("a,b\n1,2,\n".as_bytes(), b',', "mem.csv").is_ok());
    }

    #[test]
    fn duplicate_and_empty_inputs() {
        let err = read_delimited("a, a\n1,2\n".as_bytes(), b',', "mem.csv").unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));

        let err = read_delimited("".as_bytes(), b',', "mem.csv").unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = read_delimited("a,b\n".as_bytes(), b',', "mem.csv").unwrap_err();
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn spreadsheet_cells_convert() {
        assert_eq!(cell_from_data(&Data::Int(3)), RawValue::Number(3.0));
        assert_eq!(cell_from_data(&Data::Float(2.5)), RawValue::Number(2.5));
        assert_eq!(
            cell_from_data(&Data::String("T2".into())),
            RawValue::Text("T2".into())
        );
        assert_eq!(cell_from_data(&Data::Empty), RawValue::Empty);
        assert_eq!(cell_from_data(&Data::Bool(true)), RawValue::Bool(true));
    }
}
