//! Alias expressions: `"101 + 102"` on a site row says the row stands for
//! price list items 101 and 102 together.

use std::collections::{HashMap, HashSet};

use crate::table::{Table, Value};

/// Split an alias expression on `+` and trim each component.
/// Empty components are kept so callers can reject them.
pub fn split_alias(expr: &str) -> Vec<&str> {
    expr.split('+').map(str::trim).collect()
}

/// Alias expressions of the site catalog, indexed once per run.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    by_id: HashMap<String, Vec<String>>,
    components: HashSet<String>,
}

impl AliasIndex {
    /// Index `alias_column` of `target` by the identifiers in `id_column`.
    /// Returns `None` when the alias column does not exist.
    ///
    /// A numeric cell is a one-component expression in its canonical key
    /// form (spreadsheets store a lone `101` as a number).
    pub fn build(target: &Table, id_column: &str, alias_column: &str) -> Option<Self> {
        if !target.has_column(alias_column) {
            return None;
        }

        let mut index = AliasIndex::default();
        for row in target.iter() {
            let expr = match row.get(alias_column) {
                Some(Value::Text(s)) => s.clone(),
                Some(cell) => match cell.key() {
                    Some(k) => k,
                    None => continue,
                },
                None => continue,
            };
            for component in split_alias(&expr) {
                if !component.is_empty() {
                    index.components.insert(component.to_string());
                }
            }
            if let Some(id) = row.get(id_column).and_then(Value::key) {
                index.by_id.entry(id).or_default().push(expr);
            }
        }
        Some(index)
    }

    /// Expressions attached to the site rows carrying `id`.
    pub fn expressions_for(&self, id: &str) -> &[String] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when `id` is a component of any expression in the catalog.
    pub fn mentions(&self, id: &str) -> bool {
        self.components.contains(id)
    }
}
