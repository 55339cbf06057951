use crate::config::ExclusionRule;
use crate::model::FilterOutcome;
use crate::table::{RowRef, Table, Value};

/// Column names the filter reads.
#[derive(Debug, Clone, Copy)]
pub struct FilterColumns<'a> {
    pub delete: &'a str,
    pub status: &'a str,
    pub stock: &'a str,
}

/// Keep the candidate rows that pass the delete-flag check and that no
/// exclusion rule fires on. Row order is preserved; input is not touched.
pub fn filter(
    candidates: &Table,
    rules: &[ExclusionRule],
    columns: &FilterColumns<'_>,
    not_deleted: &str,
) -> FilterOutcome {
    let mut excluded_as_deleted = 0;
    let mut excluded_by_rules = 0;

    let kept = candidates.select(|row| {
        if !base_condition(row, columns.delete, not_deleted) {
            excluded_as_deleted += 1;
            return false;
        }
        if excluded(row, rules, columns) {
            excluded_by_rules += 1;
            return false;
        }
        true
    });

    FilterOutcome {
        kept,
        excluded_as_deleted,
        excluded_by_rules,
    }
}

/// Delete flag is absent, null, or equal to the not-deleted sentinel.
pub fn base_condition(row: RowRef<'_>, delete_column: &str, not_deleted: &str) -> bool {
    match row.get(delete_column).and_then(Value::key) {
        None => true,
        Some(flag) => flag == not_deleted,
    }
}

/// True when any rule fires. Rules are OR-ed.
pub fn excluded(row: RowRef<'_>, rules: &[ExclusionRule], columns: &FilterColumns<'_>) -> bool {
    rules.iter().any(|rule| rule_fires(rule, row, columns))
}

pub fn rule_fires(rule: &ExclusionRule, row: RowRef<'_>, columns: &FilterColumns<'_>) -> bool {
    let Some(status) = row.get(columns.status).and_then(Value::key) else {
        return false;
    };
    if !rule.status.contains(&status) {
        return false;
    }
    let stock = row.get(columns.stock).and_then(Value::as_number);
    rule.stock_bound().holds(stock)
}
