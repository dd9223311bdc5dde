//! Question bank loading and live reconciliation.

mod loader;
mod merge;

pub use loader::{LoadReport, load_bank, load_bank_strict};
pub use merge::{MergeOutcome, merge_running};
