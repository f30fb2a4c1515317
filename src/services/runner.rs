//! The migration runner.
//!
//! Loads every step of a plan, then submits the steps one at a time, stopping
//! at the first step the service rejects. Nothing is retried and no state is
//! kept between runs; idempotence is whatever the SQL itself provides.

use tracing::{debug, info, warn};

use crate::error::{MigrateError, MigrateResult};
use crate::models::{ExecResponse, MigrationOutcome, MigrationPayload, MigrationPlan, RunReport};
use crate::services::payload::PayloadSource;
use crate::services::rpc_client::SqlExecutor;

/// Applies loaded migration payloads through an executor.
pub struct MigrationRunner<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(executor: &'a dyn SqlExecutor) -> Self {
        Self { executor }
    }

    /// Apply payloads in order.
    ///
    /// A transport failure before anything was applied is returned as is;
    /// after that it becomes [`MigrateError::Interrupted`] so the progress is
    /// not lost.
    pub async fn apply(&self, payloads: Vec<MigrationPayload>) -> MigrateResult<RunReport> {
        let mut applied = 0;
        let mut outcome = MigrationOutcome::Success;

        for payload in &payloads {
            if payload.is_empty() {
                warn!("{} contains no SQL; submitting anyway", payload.path.display());
            }

            info!(
                "Submitting {} ({} bytes, sha256 {})",
                payload.path.display(),
                payload.len(),
                payload.short_digest()
            );

            let response = match self.executor.exec_sql(&payload.sql).await {
                Ok(response) => response,
                Err(err) if applied > 0 => {
                    warn!(
                        "{} not sent after {} step(s) were applied: {}",
                        payload.path.display(),
                        applied,
                        err
                    );
                    return Err(MigrateError::Interrupted {
                        step: payload.file_name(),
                        applied,
                        total: payloads.len(),
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            };

            match response {
                ExecResponse::Ok(body) => {
                    debug!("exec_sql returned: {}", body);
                    applied += 1;
                }
                ExecResponse::Failed(message) => {
                    warn!("{} rejected: {}", payload.path.display(), message);
                    outcome = MigrationOutcome::RemoteError(message);
                    break;
                }
                ExecResponse::ProcedureMissing(message) => {
                    warn!("exec_sql unavailable: {}", message);
                    outcome = MigrationOutcome::ProcedureUnavailable(payloads[applied..].to_vec());
                    break;
                }
            }
        }

        Ok(RunReport {
            outcome,
            payloads,
            applied,
        })
    }
}

/// Read every step file of `plan` from `source`.
pub fn load_payloads(
    source: &dyn PayloadSource,
    plan: &MigrationPlan,
) -> MigrateResult<Vec<MigrationPayload>> {
    plan.steps
        .iter()
        .map(|path| {
            source
                .read(path)
                .map(|sql| MigrationPayload::new(path.clone(), sql))
                .map_err(|source| MigrateError::Payload {
                    path: path.clone(),
                    source,
                })
        })
        .collect()
}
