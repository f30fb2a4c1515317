//! Console output for operators.
//!
//! Every function writes to an `io::Write` so the binary can pass stdout and
//! tests can pass a buffer. [`present_run`] is the one place that decides how
//! an outcome is shown and which exit status it maps to.

use std::io::{self, Write};
use std::path::Path;

use crate::config::{Config, EXEC_SQL_FUNCTION, FallbackPolicy};
use crate::migration::{Catalog, EXEC_SQL_BOOTSTRAP, EXEC_SQL_BOOTSTRAP_NAME};
use crate::models::{CheckOutcome, MigrationOutcome, MigrationPayload, MigrationPlan, RunReport};

const RULE: &str = "════════════════════════════════════════════════════════════════";

/// Header printed before anything is submitted.
pub fn print_banner(
    out: &mut dyn Write,
    config: &Config,
    plan: &MigrationPlan,
    payloads: &[MigrationPayload],
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  Migration: {} ({})", plan.title, plan.name)?;
    writeln!(out, "  Target:    {}", config.host())?;
    writeln!(out, "{}", RULE)?;
    for (i, payload) in payloads.iter().enumerate() {
        writeln!(
            out,
            "  [{}/{}] {}  {} bytes  sha256 {}",
            i + 1,
            payloads.len(),
            payload.file_name(),
            payload.len(),
            payload.short_digest()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

/// Print the result of a run and return the process exit status.
pub fn present_run(
    out: &mut dyn Write,
    config: &Config,
    plan: &MigrationPlan,
    report: &RunReport,
) -> io::Result<u8> {
    match (&report.outcome, config.fallback) {
        (MigrationOutcome::Success, _) => print_success(out, plan, report)?,
        (MigrationOutcome::RemoteError(message), FallbackPolicy::Manual) => {
            print_remote_error(out, report, message)?;
            print_manual_instructions(out, config, report.unapplied())?;
        }
        (MigrationOutcome::RemoteError(message), FallbackPolicy::Fail) => {
            print_remote_error(out, report, message)?;
            writeln!(out, "  Fix the cause and re-run the whole migration.")?;
        }
        (MigrationOutcome::ProcedureUnavailable(pending), FallbackPolicy::Manual) => {
            writeln!(
                out,
                "  ⚠️  The {} procedure is not available on {}.",
                EXEC_SQL_FUNCTION,
                config.host()
            )?;
            print_manual_instructions(out, config, pending)?;
        }
        (MigrationOutcome::ProcedureUnavailable(_), FallbackPolicy::Fail) => {
            print_procedure_unavailable(out, config)?;
        }
    }
    Ok(report.outcome.exit_code())
}

fn print_success(out: &mut dyn Write, plan: &MigrationPlan, report: &RunReport) -> io::Result<()> {
    writeln!(
        out,
        "  ✅ {} applied ({}/{} steps).",
        plan.title,
        report.applied,
        report.payloads.len()
    )?;
    if !plan.summary.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Sets up:")?;
        for line in &plan.summary {
            writeln!(out, "    - {}", line)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn print_remote_error(out: &mut dyn Write, report: &RunReport, message: &str) -> io::Result<()> {
    let step = report
        .failed_step()
        .map(MigrationPayload::file_name)
        .unwrap_or_else(|| "migration".to_string());
    writeln!(out, "  ❌ {} failed: {}", step, message)?;
    if report.applied > 0 {
        writeln!(
            out,
            "  {} of {} steps were applied before the failure.",
            report.applied,
            report.payloads.len()
        )?;
    }
    Ok(())
}

fn print_procedure_unavailable(out: &mut dyn Write, config: &Config) -> io::Result<()> {
    writeln!(
        out,
        "  ❌ The {} procedure is not available on {}.",
        EXEC_SQL_FUNCTION,
        config.host()
    )?;
    writeln!(out)?;
    match &config.sql_dir {
        Some(dir) => writeln!(
            out,
            "  Create it once by running {} in the SQL editor",
            dir.join(EXEC_SQL_BOOTSTRAP).display()
        )?,
        None => writeln!(
            out,
            "  Create it once by running {} in the SQL editor",
            EXEC_SQL_BOOTSTRAP
        )?,
    }
    writeln!(
        out,
        "  (print it with `migrate-rpc show {}`),",
        EXEC_SQL_BOOTSTRAP_NAME
    )?;
    writeln!(
        out,
        "  or re-run with --fallback manual to print this migration's SQL."
    )?;
    if let Some(url) = config.sql_editor_url() {
        writeln!(out, "  SQL editor: {}", url)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Print the SQL an operator has to paste into the web SQL editor.
pub fn print_manual_instructions(
    out: &mut dyn Write,
    config: &Config,
    payloads: &[MigrationPayload],
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  Manual steps")?;
    writeln!(out, "{}", RULE)?;
    match config.sql_editor_url() {
        Some(url) => writeln!(out, "  1. Open the SQL editor: {}", url)?,
        None => writeln!(out, "  1. Open the SQL editor of your project dashboard.")?,
    }
    writeln!(
        out,
        "  2. Paste and run the SQL below, one block at a time, in order."
    )?;
    writeln!(out)?;
    print_sql(out, payloads)?;
    writeln!(
        out,
        "  ⚠️  Nothing above was applied automatically. This run exits with a failure status."
    )?;
    writeln!(out)?;
    Ok(())
}

/// Print payloads verbatim between markers.
pub fn print_sql(out: &mut dyn Write, payloads: &[MigrationPayload]) -> io::Result<()> {
    for payload in payloads {
        writeln!(out, "-- ──── BEGIN {} ────", payload.file_name())?;
        out.write_all(payload.sql.as_bytes())?;
        if !payload.sql.ends_with('\n') {
            writeln!(out)?;
        }
        writeln!(out, "-- ──── END {} ────", payload.file_name())?;
        writeln!(out)?;
    }
    Ok(())
}

/// List registered migrations.
pub fn print_catalog(
    out: &mut dyn Write,
    catalog: &Catalog,
    sql_dir: Option<&Path>,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{:<22} {:<22} {}", "NAME", "TITLE", "FILES")?;
    writeln!(out, "{}", "─".repeat(80))?;
    for def in catalog.iter() {
        writeln!(
            out,
            "{:<22} {:<22} {}",
            def.name,
            def.title,
            def.steps.join(", ")
        )?;
    }
    writeln!(out)?;
    match sql_dir {
        Some(dir) => writeln!(out, "SQL directory: {}", dir.display())?,
        None => writeln!(
            out,
            "SQL files: bundled with migrate-rpc (override with --sql-dir or MIGRATE_SQL_DIR)"
        )?,
    }
    writeln!(out)?;
    Ok(())
}

/// Print the connectivity check result and return the process exit status.
pub fn present_check(
    out: &mut dyn Write,
    config: &Config,
    outcome: &CheckOutcome,
) -> io::Result<u8> {
    match outcome {
        CheckOutcome::Reachable { status, rows } => {
            writeln!(
                out,
                "  ✅ Connected to {} with the {} key (HTTP {}).",
                config.host(),
                config.access,
                status
            )?;
            if let Some(rows) = rows {
                writeln!(out, "  Query returned {} row(s).", rows)?;
            }
        }
        CheckOutcome::Rejected { status, message } => {
            writeln!(
                out,
                "  ❌ {} rejected the request (HTTP {}): {}",
                config.host(),
                status,
                message
            )?;
            if *status == 401 || *status == 403 {
                writeln!(
                    out,
                    "  Check that the {} key belongs to this project.",
                    config.access
                )?;
            }
        }
    }
    Ok(outcome.exit_code())
}
