// Excel file import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import reads one worksheet as a table: the first row of the used range is
// the header. Export writes a single sheet with a bold, frozen header row.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use pricecheck_recon::{Table, Value};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use crate::{normalize_headers, write_atomically, IoError};

/// Excel's hard row limit, header included.
const MAX_ROWS: usize = 1_048_576;

/// Read `sheet` (or the first worksheet) from a spreadsheet file.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Table, IoError> {
    let spreadsheet_err = |message: String| IoError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| spreadsheet_err(format!("failed to open spreadsheet: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| spreadsheet_err(format!("sheet '{name}' not found")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| spreadsheet_err("file contains no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| spreadsheet_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| IoError::NoHeader {
        path: path.to_path_buf(),
    })?;
    let mut table = Table::new(normalize_headers(header.iter().map(header_text)));

    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_null) {
            continue;
        }
        table.push_row(values);
    }

    tracing::trace!(sheet = %sheet_name, rows = table.len(), "read worksheet");
    Ok(table)
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Serial date number, 1900 date system assumed.
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(format!("#{e:?}")),
    }
}

/// Write `table` as a single-sheet workbook.
pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    if table.len() + 1 > MAX_ROWS {
        return Err(IoError::Write {
            path: path.to_path_buf(),
            message: format!(
                "{} rows exceed the worksheet limit of {}",
                table.len(),
                MAX_ROWS - 1
            ),
        });
    }

    write_atomically(path, |partial| {
        let mut xlsx_workbook = XlsxWorkbook::new();
        let worksheet = xlsx_workbook.add_worksheet();
        let header_format = Format::new().set_bold();

        for (col, name) in table.headers().iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, name, &header_format)
                .map_err(|e| format!("failed to write header '{name}': {e}"))?;
        }

        for (row_idx, row) in table.rows().iter().enumerate() {
            let row32 = (row_idx + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                let col16 = col as u16;
                match value {
                    Value::Null => {}
                    Value::Number(n) => {
                        worksheet
                            .write_number(row32, col16, *n)
                            .map_err(|e| format!("failed to write row {}: {e}", row_idx + 1))?;
                    }
                    Value::Text(s) => {
                        worksheet
                            .write_string(row32, col16, s)
                            .map_err(|e| format!("failed to write row {}: {e}", row_idx + 1))?;
                    }
                }
            }
        }

        if !table.headers().is_empty() {
            worksheet
                .set_freeze_panes(1, 0)
                .map_err(|e| format!("failed to freeze header: {e}"))?;
        }

        xlsx_workbook
            .save(partial)
            .map_err(|e| format!("failed to save XLSX file: {e}"))
    })
}
