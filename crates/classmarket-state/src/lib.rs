//! classmarket-state: SurrealDB persistence for the classmarket store
//!
//! This crate is the data-access layer shared by the report and
//! reassignment operations. It handles all I/O with SurrealDB and exposes
//! typed accessors for the five entity collections.
//!
//! ## Key Components
//!
//! - `StoreHandle`: manages the connection and collection operations
//! - `StoreConfig`: environment-driven connection configuration
//! - Schema records: `ClassRecord`, `StudentRecord`, `TeacherRecord`,
//!   `ProductRecord`, `PurchaseRecord`
//! - `ClassRef`: resolved-reference variant (resolved / unassigned /
//!   dangling)
//! - `PasswordHash`: salted credential hashing; reports only ever see a
//!   presence flag

mod credential;
mod error;
mod handle;
mod schema;

pub use credential::{credential_flag, PasswordHash};
pub use error::StoreError;
pub use handle::{
    Dependent, Match, ResolvedProduct, ResolvedStudent, ResolvedTeacher, StoreConfig, StoreHandle,
};
pub use schema::{
    ClassRecord, ClassRef, ProductRecord, PurchaseRecord, PurchaseStatus, StudentRecord,
    TeacherRecord,
};

/// Result type for classmarket-state operations
pub type Result<T> = std::result::Result<T, StoreError>;
