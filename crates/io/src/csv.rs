// CSV/TSV import/export

use std::path::Path;

use encoding_rs::Encoding;
use pricecheck_recon::{Table, Value};

use crate::{normalize_headers, write_atomically, IoError};

/// Read a delimited file. The first record is the header row; every
/// following record becomes one table row, padded or truncated to the
/// header width.
pub fn import(path: &Path, delimiter: u8, encoding: &str) -> Result<Table, IoError> {
    let content = read_file_decoded(path, encoding)?;
    import_from_string(&content, delimiter).map_err(|e| match e {
        ParseError::Csv(source) => IoError::Csv {
            path: path.to_path_buf(),
            source,
        },
        ParseError::NoHeader => IoError::NoHeader {
            path: path.to_path_buf(),
        },
    })
}

/// Read file and decode it to UTF-8.
///
/// A leading BOM is dropped. For the `utf-8` label, bytes that are not valid
/// UTF-8 are decoded as Windows-1251 instead (the usual encoding of
/// spreadsheet-exported Cyrillic CSVs); any other label is decoded as named.
pub fn read_file_decoded(path: &Path, label: &str) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| IoError::Encoding {
        path: path.to_path_buf(),
        label: label.to_string(),
    })?;

    if encoding != encoding_rs::UTF_8 {
        let (decoded, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            tracing::warn!(
                path = %path.display(),
                encoding = encoding.name(),
                "some bytes could not be decoded and were replaced"
            );
        }
        return Ok(decoded.into_owned());
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes[..]);
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => {
            tracing::warn!(
                path = %path.display(),
                "file is not valid UTF-8, reading it as Windows-1251"
            );
            let (decoded, _, _) = encoding_rs::WINDOWS_1251.decode(bytes);
            Ok(decoded.into_owned())
        }
    }
}

enum ParseError {
    Csv(csv::Error),
    NoHeader,
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Table, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(ParseError::Csv)?,
        None => return Err(ParseError::NoHeader),
    };
    let mut table = Table::new(normalize_headers(header.iter().map(str::to_string)));

    for result in records {
        let record = result.map_err(ParseError::Csv)?;
        // Fully blank lines carry no data.
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(Value::parse_cell).collect());
    }
    Ok(table)
}

/// Write the header row followed by every data row.
pub fn export(table: &Table, path: &Path, delimiter: u8) -> Result<(), IoError> {
    write_atomically(path, |partial| {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(partial)
            .map_err(|e| e.to_string())?;

        writer.write_record(table.headers()).map_err(|e| e.to_string())?;
        for row in table.rows() {
            let record: Vec<String> = row.iter().map(Value::to_string).collect();
            writer.write_record(&record).map_err(|e| e.to_string())?;
        }

        writer.flush().map_err(|e| e.to_string())?;
        Ok(())
    })
}
