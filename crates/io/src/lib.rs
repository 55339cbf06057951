// Dataset IO: load price list / catalog tables, save result tables

pub mod csv;
pub mod error;
pub mod xlsx;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use pricecheck_recon::config::{CsvOptions, DataFormat};
use pricecheck_recon::Table;

pub use error::IoError;

/// Format knobs shared by loading and saving.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Field separator for `.csv` / `.txt` files. `.tsv` always uses tab.
    pub separator: u8,
    /// WHATWG encoding label for delimited text.
    pub encoding: String,
    /// Worksheet to read; first sheet when `None`.
    pub sheet: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            separator: b';',
            encoding: "utf-8".into(),
            sheet: None,
        }
    }
}

impl From<&CsvOptions> for TableOptions {
    fn from(csv: &CsvOptions) -> Self {
        Self {
            separator: csv.separator_byte(),
            encoding: csv.encoding.clone(),
            sheet: None,
        }
    }
}

/// What a save wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Load a table, choosing the reader from the file extension.
pub fn load_table(path: &Path, options: &TableOptions) -> Result<Table, IoError> {
    let start = Instant::now();
    let table = match DataFormat::from_path(path) {
        Some(DataFormat::Csv) => csv::import(path, options.separator, &options.encoding)?,
        Some(DataFormat::Tsv) => csv::import(path, b'\t', &options.encoding)?,
        Some(DataFormat::Spreadsheet) => xlsx::import(path, options.sheet.as_deref())?,
        None => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.headers().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded table"
    );
    Ok(table)
}

/// Save a table. `.csv`/`.tsv`/`.txt` destinations get delimited text and
/// `.xlsx` gets a workbook. Any other extension is rejected before writing.
pub fn save_table(table: &Table, path: &Path, options: &TableOptions) -> Result<SaveReport, IoError> {
    let start = Instant::now();
    match DataFormat::for_output(path) {
        Some(DataFormat::Csv) => csv::export(table, path, options.separator)?,
        Some(DataFormat::Tsv) => csv::export(table, path, b'\t')?,
        Some(DataFormat::Spreadsheet) => xlsx::export(table, path)?,
        None => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }
    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "saved table"
    );
    Ok(SaveReport {
        path: path.to_path_buf(),
        rows: table.len(),
        columns: table.headers().len(),
    })
}

/// Header cleanup shared by the readers: blank names become `Unnamed: N`,
/// repeated names get `.1`, `.2`, ... suffixes so every column stays
/// addressable by name.
pub(crate) fn normalize_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::new();
    for (i, name) in raw.into_iter().enumerate() {
        let name = name.trim().to_string();
        let base = if name.is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };
        let count = seen.entry(base.clone()).or_insert(0);
        let unique = if *count == 0 {
            base.clone()
        } else {
            format!("{base}.{count}")
        };
        *count += 1;
        headers.push(unique);
    }
    headers
}

/// Write to `<dest>.partial` and rename into place, so a failed write never
/// leaves a truncated file under the destination name.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), IoError>
where
    F: FnOnce(&Path) -> Result<(), String>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let result = write(&partial).and_then(|()| {
        std::fs::rename(&partial, path).map_err(|e| e.to_string())
    });
    if let Err(message) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(IoError::Write {
            path: path.to_path_buf(),
            message,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_blank_and_duplicates() {
        let h = normalize_headers(
            ["Код", "", " Статус ", "Код", "Код"].map(String::from),
        );
        assert_eq!(h, vec!["Код", "Unnamed: 1", "Статус", "Код.1", "Код.2"]);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_table(Path::new("prices.pdf"), &TableOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat { .. }));
    }

    #[test]
    fn save_refuses_read_only_spreadsheet_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new(vec!["Код".into()]);
        for name in ["report.ods", "report.xls", "report.pdf"] {
            let dest = dir.path().join(name);
            let err = save_table(&table, &dest, &TableOptions::default()).unwrap_err();
            assert!(matches!(err, IoError::UnsupportedFormat { .. }), "{name}");
            assert!(!dest.exists(), "{name}");
        }
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.xlsx");
        let err = write_atomically(&dest, |partial| {
            std::fs::write(partial, b"half").map_err(|e| e.to_string())?;
            Err("disk full".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(!dest.exists());
        assert!(!dir.path().join("out.xlsx.partial").exists());
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out/result.xlsx");
        write_atomically(&dest, |partial| {
            std::fs::write(partial, b"ok").map_err(|e| e.to_string())
        })
        .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ok");
    }
}
