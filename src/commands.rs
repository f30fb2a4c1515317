//! Command implementations behind the CLI.
//!
//! Configuration is resolved here, once, from an injected variable lookup and
//! then passed down. Nothing below this layer reads the environment.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{self, AccessLevel, Config, ConfigError, FallbackPolicy, vars};
use crate::error::MigrateResult;
use crate::migration::Catalog;
use crate::models::{MigrationPlan, exit_codes};
use crate::services::connectivity::ConnectivityCheck;
use crate::services::payload::{BundledPayloadSource, PayloadSource};
use crate::services::report;
use crate::services::rpc_client::SqlExecutor;
use crate::services::runner::{MigrationRunner, load_payloads};

/// Command-line overrides for environment settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub sql_dir: Option<PathBuf>,
    pub fallback: Option<FallbackPolicy>,
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    /// Build the configuration with overrides taking the place of their
    /// variables, so a flag also replaces an invalid environment value.
    pub fn resolve<L>(&self, lookup: L, access: AccessLevel) -> Result<Config, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let layered = |name: &str| match name {
            vars::FALLBACK => self.fallback.map(|f| f.to_string()).or_else(|| lookup(name)),
            vars::TIMEOUT_SECS => self
                .timeout_secs
                .map(|s| s.to_string())
                .or_else(|| lookup(name)),
            _ => lookup(name),
        };

        let mut config = Config::from_lookup(layered, access)?;
        if let Some(dir) = &self.sql_dir {
            config.sql_dir = Some(dir.clone());
        }
        Ok(config)
    }

    /// SQL directory for commands that need no credentials.
    pub fn sql_dir<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.sql_dir
            .clone()
            .or_else(|| config::sql_dir_from_lookup(lookup))
    }
}

/// Where catalog steps are read from: `fs` when a SQL directory is
/// configured, the bundled copies otherwise.
fn catalog_source<'a>(sql_dir: Option<&Path>, fs: &'a dyn PayloadSource) -> &'a dyn PayloadSource {
    match sql_dir {
        Some(_) => fs,
        None => &BundledPayloadSource,
    }
}

/// What to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A catalog migration
    Named(String),
    /// An ad-hoc SQL file
    File(PathBuf),
}

/// Apply a migration.
///
/// Order is fixed: configuration, then file reads, then the executor is
/// created and steps are submitted. A configuration problem therefore never
/// touches the filesystem or the network.
pub async fn apply<L, C, E>(
    lookup: L,
    overrides: &Overrides,
    target: &Target,
    source: &dyn PayloadSource,
    connect: C,
    out: &mut dyn Write,
) -> MigrateResult<u8>
where
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Config) -> MigrateResult<E>,
    E: SqlExecutor,
{
    let config = overrides.resolve(lookup, AccessLevel::ServiceRole)?;

    let (plan, source) = match target {
        Target::Named(name) => {
            let sql_dir = config.sql_dir.as_deref();
            (
                Catalog::builtin().plan(name, sql_dir)?,
                catalog_source(sql_dir, source),
            )
        }
        Target::File(path) => (MigrationPlan::single_file(path), source),
    };

    let payloads = load_payloads(source, &plan)?;
    report::print_banner(out, &config, &plan, &payloads)?;

    let executor = connect(&config)?;
    let run = MigrationRunner::new(&executor).apply(payloads).await?;

    info!(
        "{} finished: {:?} ({} of {} steps applied)",
        plan.name,
        run.outcome,
        run.applied,
        run.payloads.len()
    );

    Ok(report::present_run(out, &config, &plan, &run)?)
}

/// Print a catalog migration's SQL without submitting it.
pub fn show<L>(
    lookup: L,
    overrides: &Overrides,
    name: &str,
    source: &dyn PayloadSource,
    out: &mut dyn Write,
) -> MigrateResult<u8>
where
    L: Fn(&str) -> Option<String>,
{
    let sql_dir = overrides.sql_dir(&lookup);
    let plan = Catalog::builtin().plan(name, sql_dir.as_deref())?;
    let payloads = load_payloads(catalog_source(sql_dir.as_deref(), source), &plan)?;
    report::print_sql(out, &payloads)?;
    Ok(exit_codes::SUCCESS)
}

/// List catalog migrations.
pub fn list<L>(lookup: L, overrides: &Overrides, out: &mut dyn Write) -> MigrateResult<u8>
where
    L: Fn(&str) -> Option<String>,
{
    report::print_catalog(
        out,
        &Catalog::builtin(),
        overrides.sql_dir(&lookup).as_deref(),
    )?;
    Ok(exit_codes::SUCCESS)
}

/// Read-only connectivity check with the anon key.
pub async fn check<L>(
    lookup: L,
    overrides: &Overrides,
    table: Option<&str>,
    out: &mut dyn Write,
) -> MigrateResult<u8>
where
    L: Fn(&str) -> Option<String>,
{
    let config = overrides.resolve(lookup, AccessLevel::Anon)?;

    let check = ConnectivityCheck::new(&config, table)?;
    writeln!(out, "  Checking {} ...", check.endpoint())?;
    let outcome = check.run().await?;

    Ok(report::present_check(out, &config, &outcome)?)
}
