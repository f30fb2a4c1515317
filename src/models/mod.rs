//! Domain models for the migration runner.

pub mod migration;
pub mod outcome;

// Re-export commonly used types
pub use migration::{MigrationDef, MigrationPayload, MigrationPlan};
pub use outcome::{CheckOutcome, ExecResponse, MigrationOutcome, RunReport, exit_codes};
