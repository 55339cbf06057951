use std::collections::BTreeSet;

use crate::alias::{split_alias, AliasIndex};
use crate::assemble::{assemble, rows_with_ids};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::filter::{filter, FilterColumns};
use crate::model::{AliasMode, ReconStats, ReconciliationResult, RunOutcome};
use crate::report::Reporter;
use crate::table::Table;

/// Run a full reconciliation: schema check, key reconciliation, exclusion
/// filter, result assembly.
pub fn run(
    config: &ReconConfig,
    reference: &Table,
    target: &Table,
    reporter: &dyn Reporter,
) -> Result<RunOutcome, ReconError> {
    config.check_schema(reference, target)?;
    let c = &config.columns;

    reporter.info(&format!(
        "Comparing data: {} price list rows, {} site rows",
        reference.len(),
        target.len()
    ));

    let reference_ids = reference.identifiers(&c.price_column);
    let target_ids = target.identifiers(&c.site_column);

    let aliases = AliasIndex::build(target, &c.site_column, &c.secondary_match_column);
    if aliases.is_none() {
        reporter.warn(&format!(
            "Column '{}' not found in site catalog. Skipping secondary comparison.",
            c.secondary_match_column
        ));
    }

    let result = reconcile(&reference_ids, &target_ids, aliases.as_ref(), reporter);

    reporter.info("Applying filters");
    let candidates = rows_with_ids(reference, &c.price_column, &result.missing_in_target);
    let columns = FilterColumns {
        delete: &c.delete_column,
        status: &c.status_column,
        stock: &c.stock_column,
    };
    let filtered = filter(
        &candidates,
        &config.filter_rules.exclude_if,
        &columns,
        &config.sentinels.not_deleted,
    );
    reporter.info(&format!(
        "Filtered missing on site: {} kept, {} deleted, {} excluded by rules",
        filtered.kept.len(),
        filtered.excluded_as_deleted,
        filtered.excluded_by_rules
    ));

    let outputs = assemble(config, target, &result, &candidates, filtered.kept);

    let stats = ReconStats {
        run_at: chrono::Utc::now().to_rfc3339(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        reference_rows: reference.len(),
        target_rows: target.len(),
        alias_mode: result.alias_mode,
        raw_missing_in_reference: result.raw_missing_in_reference,
        raw_missing_in_target: result.raw_missing_in_target,
        secondary_matches: result.secondary_match_count,
        missing_in_reference: result.missing_in_reference.len(),
        missing_in_target: result.missing_in_target.len(),
        missing_on_target_filtered: outputs.missing_on_site.len(),
        new_items: outputs.new_items.len(),
        excluded_as_deleted: filtered.excluded_as_deleted,
        excluded_by_rules: filtered.excluded_by_rules,
    };

    Ok(RunOutcome {
        reconciliation: result,
        outputs,
        stats,
    })
}

/// Two-phase key reconciliation.
///
/// Phase one is plain set difference in both directions. Phase two, when
/// `aliases` is available, resolves leftovers through alias expressions:
///
/// * a site identifier resolves when one of its expressions names only
///   price list identifiers (every component must exist);
/// * a price list identifier resolves when it is a component of any
///   expression in the catalog.
pub fn reconcile(
    reference_ids: &BTreeSet<String>,
    target_ids: &BTreeSet<String>,
    aliases: Option<&AliasIndex>,
    reporter: &dyn Reporter,
) -> ReconciliationResult {
    let raw_in_reference: BTreeSet<String> =
        target_ids.difference(reference_ids).cloned().collect();
    let raw_in_target: BTreeSet<String> =
        reference_ids.difference(target_ids).cloned().collect();

    reporter.info(&format!(
        "Initial mismatches: {} (missing in price: {}, missing on site: {})",
        raw_in_reference.len() + raw_in_target.len(),
        raw_in_reference.len(),
        raw_in_target.len()
    ));

    let raw_missing_in_reference = raw_in_reference.len();
    let raw_missing_in_target = raw_in_target.len();

    let result = match aliases {
        None => ReconciliationResult {
            missing_in_reference: raw_in_reference,
            missing_in_target: raw_in_target,
            secondary_match_count: 0,
            raw_missing_in_reference,
            raw_missing_in_target,
            resolved_in_reference: 0,
            resolved_in_target: 0,
            alias_mode: AliasMode::Degraded,
        },
        Some(aliases) => {
            let (resolved, missing_in_reference): (Vec<String>, Vec<String>) = raw_in_reference
                .into_iter()
                .partition(|id| resolves_by_components(id, aliases, reference_ids));
            let resolved_in_reference = resolved.len();

            let (resolved, missing_in_target): (Vec<String>, Vec<String>) =
                raw_in_target.into_iter().partition(|id| aliases.mentions(id));
            let resolved_in_target = resolved.len();

            ReconciliationResult {
                missing_in_reference: missing_in_reference.into_iter().collect(),
                missing_in_target: missing_in_target.into_iter().collect(),
                secondary_match_count: resolved_in_reference + resolved_in_target,
                raw_missing_in_reference,
                raw_missing_in_target,
                resolved_in_reference,
                resolved_in_target,
                alias_mode: AliasMode::Enabled,
            }
        }
    };

    reporter.info(&format!(
        "Secondary matches found: {}",
        result.secondary_match_count
    ));
    reporter.info(&format!(
        "Final missing in price: {}",
        result.missing_in_reference.len()
    ));
    reporter.info(&format!(
        "Final missing on site: {}",
        result.missing_in_target.len()
    ));

    result
}

/// Any of the site rows for `id` carries an expression whose components
/// are all price list identifiers. Empty components never match.
fn resolves_by_components(id: &str, aliases: &AliasIndex, reference_ids: &BTreeSet<String>) -> bool {
    aliases.expressions_for(id).iter().any(|expr| {
        split_alias(expr)
            .into_iter()
            .all(|component| !component.is_empty() && reference_ids.contains(component))
    })
}
