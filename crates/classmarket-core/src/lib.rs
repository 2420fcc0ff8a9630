//! classmarket-core: the two administrative operations over the store
//!
//! - [`report::StoreReport`]: read-only consistency snapshot
//! - [`reassign::run_reassignment`]: retire one class and repoint every
//!   dependent onto a freshly created replacement
//!
//! Both operate through the `classmarket-state` data-access layer and
//! share its failure model: no retries, no rollback, errors surface to
//! the caller after cleanup.

pub mod reassign;
pub mod report;
mod telemetry;

pub use reassign::{
    run_reassignment, ReassignJournal, ReassignOutcome, ReassignSpec, ReassignStep,
};
pub use report::{EntityCounts, StoreReport, RECENT_PURCHASE_LIMIT};
pub use telemetry::init_tracing;
