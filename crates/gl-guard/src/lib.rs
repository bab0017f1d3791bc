//! Transactional safety net for GeoLingua.
//!
//! Wraps operation execution in three layers of protection:
//! - **Prevention** — pluggable risk rules and command validation that
//!   decide whether an operation may run at all.
//! - **Transaction log** — every attempt recorded, optionally with a
//!   full state snapshot for rollback, under a retention policy.
//! - **Error log** — an append-only error/action timeline whose
//!   aggregated statistics feed the risk rules.
//!
//! Both persisted logs recover from corruption by backing up the bad
//! file and starting empty; a broken log file is never fatal.

pub mod error_log;
mod persist;
pub mod prevention;
pub mod system;
pub mod transaction;

// Re-export key types for convenience
pub use error_log::{ErrorAnalysis, ErrorLog, ErrorStatistics, TimelineRecord};
pub use prevention::{Applicability, RiskEngine, RiskRule};
pub use system::{GuardSystem, ValidationOutcome};
pub use transaction::{TransactionLog, TransactionRecord};
