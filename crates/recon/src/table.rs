//! In-memory tabular dataset: ordered headers, ordered rows of tagged scalars.
//!
//! Loaders in `pricecheck-io` produce [`Table`]s; the engine only reads them.

use std::collections::{BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Null,
}

impl Value {
    /// Loader helper: empty cell → `Null`, everything else → `Text`.
    pub fn parse_cell(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Null
        } else {
            Self::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell. Text is accepted when it parses after
    /// trimming; a single `,` decimal separator is tolerated (`"2,5"`).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    return None;
                }
                t.parse::<f64>()
                    .ok()
                    .or_else(|| t.replacen(',', ".", 1).parse::<f64>().ok())
                    .filter(|n| n.is_finite())
            }
            Self::Null => None,
        }
    }

    /// Canonical identifier form. Integral numbers drop the fraction so a
    /// spreadsheet `101.0` and a CSV `"101"` name the same item.
    pub fn key(&self) -> Option<String> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s.clone()),
            Self::Text(_) | Self::Null => None,
            Self::Number(n) => Some(format_number(*n)),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with `Null`, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.headers.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell lookup by column name. Unknown column → `None`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Distinct identifiers in `column`. Null cells are skipped.
    pub fn identifiers(&self, column: &str) -> BTreeSet<String> {
        let Some(col) = self.column_index(column) else {
            return BTreeSet::new();
        };
        self.rows.iter().filter_map(|r| r[col].key()).collect()
    }

    /// Identifier → row positions, in dataset order.
    pub fn index_by(&self, column: &str) -> KeyIndex {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        if let Some(col) = self.column_index(column) {
            for (i, row) in self.rows.iter().enumerate() {
                if let Some(key) = row[col].key() {
                    positions.entry(key).or_default().push(i);
                }
            }
        }
        KeyIndex { positions }
    }

    /// Copy of this table keeping only rows accepted by `keep`.
    pub fn select<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(RowRef<'_>) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|r| {
                keep(RowRef {
                    headers: &self.headers,
                    values: r.as_slice(),
                })
            })
            .cloned()
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Copy of the rows at `positions`, in the order given.
    pub fn take(&self, positions: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: positions
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |values| RowRef {
            headers: &self.headers,
            values,
        })
    }
}

/// Borrowed view of one row with by-name access.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    headers: &'a [String],
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Cell for `column`, or `None` when the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Identifier → row positions.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    positions: HashMap<String, Vec<usize>>,
}

impl KeyIndex {
    pub fn rows_for(&self, key: &str) -> &[usize] {
        self.positions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}
