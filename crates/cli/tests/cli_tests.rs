// Black-box tests for the `pricecheck` binary: exit codes, result files,
// and the --json stdout contract.
//
// Run with: cargo test -p pricecheck-cli --test cli_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn pricecheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pricecheck"));
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("PRICECHECK_LOG_FILE");
    cmd
}

const PRICE_CSV: &str = "\
Код;Наименование;Удалить;Главный Склад;Статус
101;Болт М6;Нет;20;На складе
102;Гайка М6;Нет;0;На складе
103;Шайба;Нет;3;Акция
104;Винт;Да;50;На складе
105;Шуруп;Нет;7;Новинка
106;Дюбель;;12;Под заказ
";

const SITE_CSV: &str = "\
IE_XML_ID;IP_PROP2090
101;
205;107 + 108
206;101 + 102
";

/// Workspace with both datasets and a config writing CSV results.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self::with_data(PRICE_CSV, SITE_CSV)
    }

    fn with_data(price: &str, site: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("price.csv"), price).unwrap();
        std::fs::write(dir.path().join("site.csv"), site).unwrap();
        let fx = Self { dir };
        fx.write_config(
            r#"{
                "price_file_path": "price.csv",
                "site_file_path": "site.csv",
                "output_files": {
                    "missing_on_site": "out/missing_on_site.csv",
                    "missing_in_price": "out/missing_in_price.csv",
                    "new_items": "out/new_items.csv"
                }
            }"#,
        );
        fx
    }

    fn write_config(&self, body: &str) {
        std::fs::write(self.config(), body).unwrap();
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("paths.json")
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("cannot read {rel}: {e}"))
    }

    fn run(&self, extra: &[&str]) -> Output {
        let config = self.config();
        let mut args = vec!["run", config.to_str().unwrap()];
        args.extend_from_slice(extra);
        pricecheck().args(&args).output().expect("pricecheck run")
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_code(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "unexpected exit status\nstderr:\n{}",
        stderr(output)
    );
}

/// Assert stdout is exactly one JSON value.
fn assert_single_json(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed)
        .unwrap_or_else(|e| panic!("stdout must be one JSON value.\nerror: {e}\nstdout:\n{trimmed}"))
}

// ===========================================================================
// pricecheck run
// ===========================================================================

#[test]
fn run_writes_filtered_result_tables() {
    let fx = Fixture::new();
    let out = fx.run(&[]);
    assert_code(&out, 0);

    // 102 resolves through 206's alias, 103 is a promo below threshold,
    // 104 is flagged deleted.
    assert_eq!(
        fx.read("out/missing_on_site.csv"),
        "Код;Наименование;Удалить;Главный Склад;Статус\n\
         105;Шуруп;Нет;7;Новинка\n\
         106;Дюбель;;12;Под заказ\n"
    );
    assert_eq!(
        fx.read("out/new_items.csv"),
        "Код;Наименование;Удалить;Главный Склад;Статус\n105;Шуруп;Нет;7;Новинка\n"
    );
    assert_eq!(
        fx.read("out/missing_in_price.csv"),
        "IE_XML_ID;IP_PROP2090\n205;107 + 108\n"
    );
    assert!(!fx.path("out/missing_on_site.csv.partial").exists());
}

#[test]
fn run_logs_progress_to_stderr() {
    let fx = Fixture::new();
    let out = fx.run(&[]);
    assert_code(&out, 0);
    let err = stderr(&out);
    for needle in [
        "Initial mismatches: 7",
        "Secondary matches found: 2",
        "Final missing in price: 1",
        "Final missing on site: 4",
        "Applying filters",
        "Results saved",
        "Reconciliation completed in",
    ] {
        assert!(err.contains(needle), "stderr lacks {needle:?}:\n{err}");
    }
}

#[test]
fn run_json_stdout_contract() {
    let fx = Fixture::new();
    let out = fx.run(&["--json"]);
    assert_code(&out, 0);

    let stats = assert_single_json(&out.stdout);
    assert_eq!(stats["reference_rows"], 6);
    assert_eq!(stats["target_rows"], 3);
    assert_eq!(stats["alias_mode"], "enabled");
    assert_eq!(stats["raw_missing_in_target"], 5);
    assert_eq!(stats["raw_missing_in_reference"], 2);
    assert_eq!(stats["secondary_matches"], 2);
    assert_eq!(stats["missing_in_target"], 4);
    assert_eq!(stats["missing_in_reference"], 1);
    assert_eq!(stats["excluded_as_deleted"], 1);
    assert_eq!(stats["excluded_by_rules"], 1);
    assert_eq!(stats["missing_on_target_filtered"], 2);
    assert_eq!(stats["new_items"], 1);
    assert!(stats["run_at"].is_string());
}

#[test]
fn run_summary_file_matches_stdout_shape() {
    let fx = Fixture::new();
    let summary = fx.path("stats.json");
    let out = fx.run(&["--summary", summary.to_str().unwrap()]);
    assert_code(&out, 0);
    assert!(out.stdout.is_empty(), "no --json, nothing on stdout");

    let stats: serde_json::Value = serde_json::from_str(&fx.read("stats.json")).unwrap();
    assert_eq!(stats["new_items"], 1);
}

#[test]
fn run_skips_empty_new_items_table() {
    let fx = Fixture::with_data(
        "Код;Удалить;Главный Склад;Статус\n1;Нет;5;На складе\n",
        "IE_XML_ID\n1\n2\n",
    );
    let out = fx.run(&[]);
    assert_code(&out, 0);

    assert!(!fx.path("out/new_items.csv").exists());
    // The other two are written even when empty.
    assert_eq!(fx.read("out/missing_on_site.csv"), "Код;Удалить;Главный Склад;Статус\n");
    assert_eq!(fx.read("out/missing_in_price.csv"), "IE_XML_ID\n2\n");
    assert!(stderr(&out).contains("not found in site catalog"), "degraded mode warns");
}

#[test]
fn run_dry_run_writes_nothing() {
    let fx = Fixture::new();
    let out = fx.run(&["--dry-run", "--json"]);
    assert_code(&out, 0);
    assert_single_json(&out.stdout);
    assert!(!fx.path("out").exists());
}

#[test]
fn run_out_dir_redirects_results() {
    let fx = Fixture::new();
    let dest = fx.path("reports");
    let out = fx.run(&["--out-dir", dest.to_str().unwrap()]);
    assert_code(&out, 0);
    assert!(dest.join("out/missing_on_site.csv").exists());
    assert!(!fx.path("out").exists());
}

#[test]
fn run_default_outputs_are_xlsx() {
    let fx = Fixture::new();
    fx.write_config(r#"{ "price_file_path": "price.csv", "site_file_path": "site.csv" }"#);
    let out = fx.run(&[]);
    assert_code(&out, 0);
    for name in ["missing_on_site.xlsx", "missing_in_price.xlsx", "new_items.xlsx"] {
        let bytes = std::fs::read(fx.path(name)).unwrap();
        assert!(bytes.starts_with(b"PK"), "{name} should be a zip container");
    }
}

#[test]
fn run_toml_config() {
    let fx = Fixture::new();
    std::fs::write(
        fx.path("paths.toml"),
        r#"
price_file_path = "price.csv"
site_file_path = "site.csv"

[output_files]
missing_on_site = "a.csv"
missing_in_price = "b.csv"
new_items = "c.csv"

[[filter_rules.exclude_if]]
status = ["Новинка"]
"#,
    )
    .unwrap();
    let config = fx.path("paths.toml");
    let out = pricecheck()
        .args(["run", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_code(&out, 0);
    // Only the custom rule applies: 103 (promo) stays, 105 (new) is excluded
    // from the filtered table but still listed as a new item.
    assert_eq!(
        fx.read("a.csv"),
        "Код;Наименование;Удалить;Главный Склад;Статус\n\
         103;Шайба;Нет;3;Акция\n\
         106;Дюбель;;12;Под заказ\n"
    );
    assert!(fx.read("c.csv").contains("105;Шуруп"));
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn strict_exits_1_on_actionable_results() {
    let fx = Fixture::new();
    let out = fx.run(&["--strict"]);
    assert_code(&out, 1);
    assert!(stderr(&out).contains("2 missing on site, 1 new, 1 missing in price list"));
    // Results are still written.
    assert!(fx.path("out/missing_on_site.csv").exists());
}

#[test]
fn strict_exits_0_when_datasets_agree() {
    let fx = Fixture::with_data(
        "Код;Удалить;Главный Склад;Статус\n1;Нет;5;На складе\n",
        "IE_XML_ID;IP_PROP2090\n1;\n",
    );
    assert_code(&fx.run(&["--strict"]), 0);
}

#[test]
fn missing_column_exits_3() {
    let fx = Fixture::with_data("Код;Удалить;Главный Склад\n1;Нет;5\n", SITE_CSV);
    let out = fx.run(&[]);
    assert_code(&out, 3);
    let err = stderr(&out);
    assert!(err.contains("price list: missing column 'Статус'"), "{err}");
    assert!(err.contains("hint:"));
    assert!(!fx.path("out").exists(), "nothing written on failure");
}

#[test]
fn invalid_config_exits_3() {
    let fx = Fixture::new();
    fx.write_config(r#"{ "price_file_path": "price.csv" "#);
    assert_code(&fx.run(&[]), 3);

    fx.write_config(r#"{ "price_file_path": "price.csv", "site_file_path": "" }"#);
    let out = fx.run(&[]);
    assert_code(&out, 3);
    assert!(stderr(&out).contains("site_file_path is required"));
}

#[test]
fn missing_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let out = pricecheck()
        .current_dir(dir.path())
        .arg("run")
        .output()
        .unwrap();
    assert_code(&out, 3);
    assert!(stderr(&out).contains("paths.json"));
}

#[test]
fn missing_input_exits_4() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.path("site.csv")).unwrap();
    let out = fx.run(&[]);
    assert_code(&out, 4);
    assert!(stderr(&out).contains("site.csv"));
}

#[test]
fn unwritable_output_exits_5() {
    let fx = Fixture::new();
    // A regular file where the output directory should be.
    std::fs::write(fx.path("out"), "not a directory").unwrap();
    assert_code(&fx.run(&[]), 5);
}

#[test]
fn unknown_flag_exits_2() {
    let out = pricecheck().args(["run", "--no-such-flag"]).output().unwrap();
    assert_code(&out, 2);
}

// ===========================================================================
// validate / defaults / logging
// ===========================================================================

#[test]
fn validate_accepts_good_setup() {
    let fx = Fixture::new();
    let config = fx.config();
    let out = pricecheck()
        .args(["validate", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_code(&out, 0);
    assert!(stderr(&out).contains("Configuration is valid"));
    assert!(!fx.path("out").exists());
}

#[test]
fn validate_reports_missing_column_and_file() {
    let fx = Fixture::with_data(PRICE_CSV, "id\n1\n");
    let config = fx.config();
    let out = pricecheck()
        .args(["validate", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_code(&out, 3);
    assert!(stderr(&out).contains("site catalog: missing column 'IE_XML_ID'"));

    std::fs::remove_file(fx.path("price.csv")).unwrap();
    let out = pricecheck()
        .args(["validate", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_code(&out, 4);
}

#[test]
fn defaults_prints_builtin_rules() {
    let out = pricecheck().arg("defaults").output().unwrap();
    assert_code(&out, 0);
    let config = assert_single_json(&out.stdout);
    let rules = config["filter_rules"]["exclude_if"].as_array().unwrap();
    assert_eq!(rules.len(), 3);
    assert_eq!(config["columns"]["site_column"], "IE_XML_ID");
    assert_eq!(config["csv"]["separator"], ";");
    assert_eq!(config["output_files"]["new_items"], "new_items.xlsx");
}

#[test]
fn log_file_receives_records() {
    let fx = Fixture::new();
    let log = fx.path("logs/run.log");
    assert_code(&fx.run(&["--log-file", log.to_str().unwrap()]), 0);
    assert_code(&fx.run(&["--log-file", log.to_str().unwrap(), "--log-format", "json"]), 0);

    let text = std::fs::read_to_string(&log).unwrap();
    assert_eq!(text.matches("Reconciliation completed in").count(), 2, "file is appended");
    let last = text.lines().last().unwrap();
    let record: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(record["level"], "INFO");
}

#[test]
fn log_file_rolls_over_by_size() {
    let fx = Fixture::new();
    let log = fx.path("run.log");
    let args = [
        "--log-file",
        log.to_str().unwrap(),
        "--log-max-bytes",
        "300",
        "--log-backups",
        "2",
    ];
    assert_code(&fx.run(&args), 0);
    assert_code(&fx.run(&args), 0);

    assert!(fx.path("run.log.1").exists());
    assert!(fx.path("run.log.2").exists());
    assert!(!fx.path("run.log.3").exists(), "only two backups kept");
    let current = std::fs::read_to_string(&log).unwrap();
    assert!(current.contains("Reconciliation completed in"), "{current}");
}

#[test]
fn quiet_suppresses_progress() {
    let fx = Fixture::new();
    let out = fx.run(&["-q"]);
    assert_code(&out, 0);
    assert!(!stderr(&out).contains("Applying filters"));
}
