//! `pricecheck-recon`: price list vs site catalog reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the mismatch
//! sets and the three result tables. File formats live in `pricecheck-io`.

pub mod alias;
pub mod assemble;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod report;
pub mod table;

pub use config::ReconConfig;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use model::{ReconOutputs, ReconStats, ReconciliationResult, RunOutcome};
pub use report::{MemoryReporter, Reporter, TracingReporter};
pub use table::{Table, Value};
