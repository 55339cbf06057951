use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Dataset, ReconError};
use crate::table::Table;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section is optional in the document and falls
/// back to the defaults below; only the two input paths are mandatory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub price_file_path: String,
    #[serde(default)]
    pub site_file_path: String,
    #[serde(default)]
    pub columns: ColumnBindings,
    #[serde(default)]
    pub sentinels: Sentinels,
    #[serde(default)]
    pub filter_rules: FilterRules,
    #[serde(default)]
    pub csv: CsvOptions,
    #[serde(default)]
    pub output_files: OutputFiles,
}

// ---------------------------------------------------------------------------
// Column bindings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnBindings {
    /// Identifier column of the price list.
    pub price_column: String,
    /// Identifier column of the site catalog.
    pub site_column: String,
    /// `+`-joined alias column of the site catalog. Optional in the data.
    pub secondary_match_column: String,
    pub delete_column: String,
    pub stock_column: String,
    pub status_column: String,
}

impl Default for ColumnBindings {
    fn default() -> Self {
        Self {
            price_column: "Код".into(),
            site_column: "IE_XML_ID".into(),
            secondary_match_column: "IP_PROP2090".into(),
            delete_column: "Удалить".into(),
            stock_column: "Главный Склад".into(),
            status_column: "Статус".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Sentinels {
    /// Delete-flag value meaning "keep this row".
    pub not_deleted: String,
    /// Status that marks an item as new inventory.
    pub new_item_status: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            not_deleted: "Нет".into(),
            new_item_status: "Новинка".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Exclusion rules
// ---------------------------------------------------------------------------

/// `filter_rules` section. When the whole section is missing the built-in
/// rule set applies; an explicit empty `exclude_if` list disables exclusion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterRules {
    #[serde(default)]
    pub exclude_if: Vec<ExclusionRule>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            exclude_if: default_rules(),
        }
    }
}

/// One exclusion predicate: status in `status` and the stock bound holds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExclusionRule {
    pub status: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_less_than: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_equals: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StockBound {
    LessThan(f64),
    Equals(f64),
    Any,
}

impl ExclusionRule {
    pub fn new<I, S>(status: I, stock: StockBound) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (stock_less_than, stock_equals) = match stock {
            StockBound::LessThan(n) => (Some(n), None),
            StockBound::Equals(n) => (None, Some(n)),
            StockBound::Any => (None, None),
        };
        Self {
            status: status.into_iter().map(Into::into).collect(),
            stock_less_than,
            stock_equals,
        }
    }

    /// `stock_less_than` wins when both are set; `validate` rejects that case.
    pub fn stock_bound(&self) -> StockBound {
        match (self.stock_less_than, self.stock_equals) {
            (Some(n), _) => StockBound::LessThan(n),
            (None, Some(n)) => StockBound::Equals(n),
            (None, None) => StockBound::Any,
        }
    }
}

impl StockBound {
    /// A missing stock value only satisfies the unbounded predicate.
    pub fn holds(&self, stock: Option<f64>) -> bool {
        match (self, stock) {
            (Self::Any, _) => true,
            (Self::LessThan(bound), Some(s)) => s < *bound,
            (Self::Equals(bound), Some(s)) => s == *bound,
            (_, None) => false,
        }
    }
}

/// Rules applied when the config has no `filter_rules` section.
pub fn default_rules() -> Vec<ExclusionRule> {
    vec![
        ExclusionRule::new(
            ["Под заказ", "Снят с производства", "Нет в наличии"],
            StockBound::LessThan(10.0),
        ),
        ExclusionRule::new(["Акция"], StockBound::LessThan(5.0)),
        ExclusionRule::new(["На складе"], StockBound::Equals(0.0)),
    ]
}

// ---------------------------------------------------------------------------
// CSV + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsvOptions {
    pub separator: String,
    /// WHATWG encoding label, e.g. `utf-8` or `windows-1251`.
    pub encoding: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ";".into(),
            encoding: "utf-8".into(),
        }
    }
}

impl CsvOptions {
    /// Separator as a single byte. Only meaningful after validation.
    pub fn separator_byte(&self) -> u8 {
        self.separator.as_bytes().first().copied().unwrap_or(b';')
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputFiles {
    pub missing_on_site: String,
    pub missing_in_price: String,
    pub new_items: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            missing_on_site: "missing_on_site.xlsx".into(),
            missing_in_price: "missing_in_price.xlsx".into(),
            new_items: "new_items.xlsx".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Data formats
// ---------------------------------------------------------------------------

/// Table file format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Delimited text using the configured separator.
    Csv,
    /// Tab-separated text.
    Tsv,
    /// Any workbook calamine can open.
    Spreadsheet,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Format results are written in. Only `.xlsx` is produced for
    /// workbooks; other spreadsheet extensions are read-only.
    pub fn for_output(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Spreadsheet),
            _ => Self::from_path(path).filter(|f| *f != Self::Spreadsheet),
        }
    }
}

/// Lexical form used to tell whether two configured paths name the same
/// file: `.` components dropped, `a/../` folded.
fn normalize_path(path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in Path::new(path.trim()).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// Read a config file, picking the syntax from its extension.
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReconError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Self::from_json(&text),
            Some("toml") => Self::from_toml(&text),
            _ => Err(ReconError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        // Some editors save JSON with a BOM.
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let config: ReconConfig =
            serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (field, path) in [
            ("price_file_path", &self.price_file_path),
            ("site_file_path", &self.site_file_path),
        ] {
            if path.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} is required")));
            }
            let path = PathBuf::from(path);
            if DataFormat::from_path(&path).is_none() {
                return Err(ReconError::UnsupportedFormat { path });
            }
        }

        let c = &self.columns;
        for (field, name) in [
            ("price_column", &c.price_column),
            ("site_column", &c.site_column),
            ("secondary_match_column", &c.secondary_match_column),
            ("delete_column", &c.delete_column),
            ("stock_column", &c.stock_column),
            ("status_column", &c.status_column),
        ] {
            if name.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "columns.{field} must not be empty"
                )));
            }
        }

        for (i, rule) in self.filter_rules.exclude_if.iter().enumerate() {
            if rule.status.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "filter rule #{}: status list is empty",
                    i + 1
                )));
            }
            if rule.stock_less_than.is_some() && rule.stock_equals.is_some() {
                return Err(ReconError::ConfigValidation(format!(
                    "filter rule #{}: set either stock_less_than or stock_equals, not both",
                    i + 1
                )));
            }
            let bound = rule.stock_less_than.or(rule.stock_equals);
            if bound.is_some_and(|b| !b.is_finite()) {
                return Err(ReconError::ConfigValidation(format!(
                    "filter rule #{}: stock bound must be a finite number",
                    i + 1
                )));
            }
        }

        if self.csv.separator.len() != 1 || !self.csv.separator.is_ascii() {
            return Err(ReconError::ConfigValidation(format!(
                "csv.separator must be a single ASCII character, got {:?}",
                self.csv.separator
            )));
        }
        if encoding_rs::Encoding::for_label(self.csv.encoding.as_bytes()).is_none() {
            return Err(ReconError::ConfigValidation(format!(
                "csv.encoding: unknown encoding label '{}'",
                self.csv.encoding
            )));
        }

        let o = &self.output_files;
        let outputs = [
            ("missing_on_site", &o.missing_on_site),
            ("missing_in_price", &o.missing_in_price),
            ("new_items", &o.new_items),
        ];
        let mut seen: BTreeSet<PathBuf> = [&self.price_file_path, &self.site_file_path]
            .into_iter()
            .map(|p| normalize_path(p))
            .collect();
        for (field, path) in outputs {
            if path.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "output_files.{field} must not be empty"
                )));
            }
            if DataFormat::for_output(Path::new(path)).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "output_files.{field}: '{path}' must end in .xlsx, .csv, .tsv or .txt"
                )));
            }
            if !seen.insert(normalize_path(path)) {
                return Err(ReconError::ConfigValidation(format!(
                    "output_files.{field}: '{path}' must be distinct from the inputs and the other outputs"
                )));
            }
        }

        Ok(())
    }

    /// Check the loaded datasets carry every column the run needs. The
    /// alias column is optional: without it the run is degraded, not broken.
    pub fn check_schema(&self, reference: &Table, target: &Table) -> Result<(), ReconError> {
        let c = &self.columns;
        for column in [
            &c.price_column,
            &c.delete_column,
            &c.stock_column,
            &c.status_column,
        ] {
            if !reference.has_column(column) {
                return Err(ReconError::MissingColumn {
                    dataset: Dataset::Reference,
                    column: column.clone(),
                });
            }
        }
        if !target.has_column(&c.site_column) {
            return Err(ReconError::MissingColumn {
                dataset: Dataset::Target,
                column: c.site_column.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
