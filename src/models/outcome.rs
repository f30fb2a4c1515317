//! Results of remote calls and migration runs.

use super::migration::MigrationPayload;

/// Process exit statuses.
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    /// Remote error, transport failure, or unknown migration
    pub const REMOTE: u8 = 1;
    pub const CONFIG: u8 = 2;
    pub const PAYLOAD: u8 = 3;
    /// `exec_sql` is missing on the target, whatever the fallback policy
    pub const PROCEDURE_UNAVAILABLE: u8 = 4;
}

/// Classified response from one `exec_sql` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResponse {
    /// Call succeeded; body as returned by the procedure
    Ok(serde_json::Value),
    /// The service or the SQL reported an error
    Failed(String),
    /// The procedure does not exist on the target
    ProcedureMissing(String),
}

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Success,
    /// Remote error message
    RemoteError(String),
    /// `exec_sql` is unavailable; carries the steps that were not applied
    ProcedureUnavailable(Vec<MigrationPayload>),
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Exit status for this outcome. Every failure maps to non-zero.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => exit_codes::SUCCESS,
            Self::RemoteError(_) => exit_codes::REMOTE,
            Self::ProcedureUnavailable(_) => exit_codes::PROCEDURE_UNAVAILABLE,
        }
    }
}

/// Everything the CLI needs to report a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: MigrationOutcome,
    /// All step payloads, in order
    pub payloads: Vec<MigrationPayload>,
    /// Number of steps the service accepted
    pub applied: usize,
}

impl RunReport {
    /// Steps that were not applied, starting with the one that failed.
    pub fn unapplied(&self) -> &[MigrationPayload] {
        &self.payloads[self.applied.min(self.payloads.len())..]
    }

    /// The step that failed, if any.
    pub fn failed_step(&self) -> Option<&MigrationPayload> {
        if self.outcome.is_success() {
            None
        } else {
            self.payloads.get(self.applied)
        }
    }
}

/// Outcome of the read-only connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The REST endpoint answered with a success status
    Reachable { status: u16, rows: Option<usize> },
    /// The endpoint answered but refused the request
    Rejected { status: u16, message: String },
}

impl CheckOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Reachable { .. } => exit_codes::SUCCESS,
            Self::Rejected { .. } => exit_codes::REMOTE,
        }
    }
}
