use std::collections::BTreeSet;

use crate::config::ReconConfig;
use crate::model::{ReconOutputs, ReconciliationResult};
use crate::table::{Table, Value};

/// Rows of `table` whose identifier in `column` is one of `ids`, in
/// dataset order. Rows sharing an identifier are all kept.
pub fn rows_with_ids(table: &Table, column: &str, ids: &BTreeSet<String>) -> Table {
    let index = table.index_by(column);
    let mut positions: Vec<usize> = ids
        .iter()
        .flat_map(|id| index.rows_for(id))
        .copied()
        .collect();
    positions.sort_unstable();
    table.take(&positions)
}

/// Slice both datasets into the three result tables.
///
/// `candidates` are the price list rows missing on the site before
/// filtering and `missing_on_site` is what the filter kept of them. New
/// items are taken from `candidates` so that exclusion rules never hide
/// new inventory.
pub fn assemble(
    config: &ReconConfig,
    target: &Table,
    result: &ReconciliationResult,
    candidates: &Table,
    missing_on_site: Table,
) -> ReconOutputs {
    let c = &config.columns;
    let new_status = config.sentinels.new_item_status.as_str();

    let new_items = candidates
        .select(|row| row.get(&c.status_column).and_then(Value::key).as_deref() == Some(new_status));

    let missing_in_price = rows_with_ids(target, &c.site_column, &result.missing_in_reference);

    ReconOutputs {
        missing_on_site,
        new_items,
        missing_in_price,
    }
}
