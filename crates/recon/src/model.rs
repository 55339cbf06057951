use std::collections::BTreeSet;

use serde::Serialize;

use crate::table::Table;

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Whether the alias pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasMode {
    Enabled,
    /// Alias column absent from the site catalog; primary difference only.
    Degraded,
}

impl std::fmt::Display for AliasMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Outcome of the two-phase key reconciliation. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Site identifiers with no price list counterpart.
    pub missing_in_reference: BTreeSet<String>,
    /// Price list identifiers with no site counterpart.
    pub missing_in_target: BTreeSet<String>,
    /// Identifiers resolved through alias expressions, both directions.
    pub secondary_match_count: usize,
    pub raw_missing_in_reference: usize,
    pub raw_missing_in_target: usize,
    pub resolved_in_reference: usize,
    pub resolved_in_target: usize,
    pub alias_mode: AliasMode,
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Filter output plus how many candidates each stage dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub kept: Table,
    pub excluded_as_deleted: usize,
    pub excluded_by_rules: usize,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The three result tables of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconOutputs {
    /// Price list rows missing on the site, after exclusion rules.
    pub missing_on_site: Table,
    /// Price list rows missing on the site whose status marks them new.
    pub new_items: Table,
    /// Site rows missing from the price list.
    pub missing_in_price: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconStats {
    pub run_at: String,
    pub engine_version: String,
    pub reference_rows: usize,
    pub target_rows: usize,
    pub alias_mode: AliasMode,
    pub raw_missing_in_reference: usize,
    pub raw_missing_in_target: usize,
    pub secondary_matches: usize,
    pub missing_in_reference: usize,
    pub missing_in_target: usize,
    pub missing_on_target_filtered: usize,
    pub new_items: usize,
    pub excluded_as_deleted: usize,
    pub excluded_by_rules: usize,
}

impl ReconStats {
    /// True when any table a manager has to act on is non-empty.
    pub fn has_actionable(&self) -> bool {
        self.missing_on_target_filtered > 0 || self.new_items > 0 || self.missing_in_reference > 0
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub reconciliation: ReconciliationResult,
    pub outputs: ReconOutputs,
    pub stats: ReconStats,
}
