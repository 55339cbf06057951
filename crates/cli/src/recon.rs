//! `pricecheck run`, `validate`, `defaults`: config-driven reconciliation of
//! a price list against a site catalog.

use std::path::{Path, PathBuf};
use std::time::Instant;

use pricecheck_io::{load_table, save_table, IoError, TableOptions};
use pricecheck_recon::{ReconConfig, ReconError, ReconOutputs, ReconStats, Table, TracingReporter};

use crate::exit_codes::{EXIT_CONFIG, EXIT_LOAD, EXIT_MISMATCH, EXIT_SAVE};
use crate::CliError;

const RELATIVE_PATHS_HINT: &str = "paths in the config are relative to the config file";

/// Flags of `pricecheck run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub json: bool,
    pub summary: Option<PathBuf>,
    pub strict: bool,
    pub dry_run: bool,
    pub out_dir: Option<PathBuf>,
    pub sheet: Option<String>,
}

/// Every file a run touches, resolved against the config file's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub price: PathBuf,
    pub site: PathBuf,
    pub missing_on_site: PathBuf,
    pub missing_in_price: PathBuf,
    pub new_items: PathBuf,
}

impl RunPaths {
    pub fn resolve(config: &ReconConfig, config_path: &Path, out_dir: Option<&Path>) -> Self {
        let base = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let out = out_dir.unwrap_or(base);
        let o = &config.output_files;
        Self {
            price: base.join(&config.price_file_path),
            site: base.join(&config.site_file_path),
            missing_on_site: out.join(&o.missing_on_site),
            missing_in_price: out.join(&o.missing_in_price),
            new_items: out.join(&o.new_items),
        }
    }
}

fn config_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::MissingColumn { .. } => {
            Some("check the `columns` section against the dataset headers")
        }
        ReconError::ConfigRead { .. } => {
            Some("pass the config path explicitly: pricecheck run path/to/paths.json")
        }
        _ => None,
    };
    let cli_err = CliError::new(EXIT_CONFIG, err.to_string());
    match hint {
        Some(hint) => cli_err.with_hint(hint),
        None => cli_err,
    }
}

fn load_err(err: IoError) -> CliError {
    let hint = match &err {
        IoError::Read { .. } => Some(format!(
            "{} was resolved relative to the config file's directory",
            err.path().display()
        )),
        IoError::Encoding { .. } => {
            Some("set csv.encoding to a WHATWG label such as windows-1251".to_string())
        }
        _ => None,
    };
    let cli_err = CliError::new(EXIT_LOAD, err.to_string());
    match hint {
        Some(hint) => cli_err.with_hint(hint),
        None => cli_err,
    }
}

fn save_err(err: IoError) -> CliError {
    let dir = err
        .path()
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let hint = format!("check that {} is writable or pass --out-dir", dir.display());
    CliError::new(EXIT_SAVE, err.to_string()).with_hint(hint)
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config = ReconConfig::load(path).map_err(config_err)?;
    tracing::info!(config = %path.display(), "configuration loaded");
    Ok(config)
}

fn load_dataset(path: &Path, options: &TableOptions, label: &str) -> Result<Table, CliError> {
    let table = load_table(path, options).map_err(load_err)?;
    tracing::info!(
        "Loaded {label}: {} rows, {} columns ({})",
        table.len(),
        table.headers().len(),
        path.display()
    );
    Ok(table)
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(config_path: PathBuf, options: RunOptions) -> Result<(), CliError> {
    let start = Instant::now();
    tracing::info!("Starting price list reconciliation");

    let config = load_config(&config_path)?;
    let paths = RunPaths::resolve(&config, &config_path, options.out_dir.as_deref());
    let table_options = TableOptions {
        sheet: options.sheet.clone(),
        ..TableOptions::from(&config.csv)
    };

    let reference = load_dataset(&paths.price, &table_options, "price list")?;
    let target = load_dataset(&paths.site, &table_options, "site catalog")?;

    let outcome = pricecheck_recon::run(&config, &reference, &target, &TracingReporter)
        .map_err(config_err)?;

    if options.dry_run {
        tracing::info!("Dry run: result files not written");
    } else {
        save_outputs(&outcome.outputs, &paths, &table_options)?;
    }

    emit_stats(&outcome.stats, options.json, options.summary.as_deref())?;

    tracing::info!(
        "Reconciliation completed in {:.2} seconds",
        start.elapsed().as_secs_f64()
    );

    if options.strict && outcome.stats.has_actionable() {
        let s = &outcome.stats;
        return Err(CliError::new(
            EXIT_MISMATCH,
            format!(
                "{} missing on site, {} new, {} missing in price list",
                s.missing_on_target_filtered, s.new_items, s.missing_in_reference
            ),
        ));
    }
    Ok(())
}

/// Write the result tables. The new-items table is skipped when empty; the
/// other two are written even when empty.
pub fn save_outputs(
    outputs: &ReconOutputs,
    paths: &RunPaths,
    options: &TableOptions,
) -> Result<(), CliError> {
    let mut saved = Vec::new();
    for (table, path) in [
        (&outputs.missing_on_site, &paths.missing_on_site),
        (&outputs.missing_in_price, &paths.missing_in_price),
    ] {
        saved.push(save_table(table, path, options).map_err(save_err)?);
    }

    if outputs.new_items.is_empty() {
        tracing::info!("No new items; {} not written", paths.new_items.display());
    } else {
        saved.push(save_table(&outputs.new_items, &paths.new_items, options).map_err(save_err)?);
    }

    let listing: Vec<String> = saved
        .iter()
        .map(|r| format!("{} ({} rows)", r.path.display(), r.rows))
        .collect();
    tracing::info!("Results saved: {}", listing.join(", "));
    Ok(())
}

fn emit_stats(stats: &ReconStats, json: bool, summary: Option<&Path>) -> Result<(), CliError> {
    if !json && summary.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(stats)
        .map_err(|e| CliError::new(EXIT_SAVE, format!("JSON serialization error: {e}")))?;

    if let Some(path) = summary {
        std::fs::write(path, format!("{json_str}\n")).map_err(|e| {
            CliError::new(EXIT_SAVE, format!("cannot write summary {}: {e}", path.display()))
        })?;
        tracing::info!("Summary written to {}", path.display());
    }
    if json {
        println!("{json_str}");
    }
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

/// Check the config and that both datasets load with the bound columns.
pub fn cmd_validate(config_path: PathBuf, sheet: Option<String>) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let paths = RunPaths::resolve(&config, &config_path, None);
    let table_options = TableOptions {
        sheet,
        ..TableOptions::from(&config.csv)
    };

    for path in [&paths.price, &paths.site] {
        if !path.is_file() {
            return Err(CliError::new(
                EXIT_LOAD,
                format!("input file not found: {}", path.display()),
            )
            .with_hint(RELATIVE_PATHS_HINT));
        }
    }

    let reference = load_dataset(&paths.price, &table_options, "price list")?;
    let target = load_dataset(&paths.site, &table_options, "site catalog")?;
    config.check_schema(&reference, &target).map_err(config_err)?;

    if !target.has_column(&config.columns.secondary_match_column) {
        tracing::warn!(
            "Column '{}' not found in site catalog; runs will skip secondary comparison",
            config.columns.secondary_match_column
        );
    }
    tracing::info!("Configuration is valid");
    Ok(())
}

// ============================================================================
// defaults
// ============================================================================

/// Print the fully defaulted configuration, built-in rule set included.
pub fn cmd_defaults() -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(&ReconConfig::default())
        .map_err(|e| CliError::new(EXIT_CONFIG, format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    Ok(())
}
