//! migrate-rpc - apply SQL migrations through the `exec_sql` RPC endpoint.
//!
//! Usage:
//!   migrate-rpc list
//!   migrate-rpc show ticket-timeline
//!   migrate-rpc apply feedback-queue [--fallback manual]
//!   migrate-rpc run path/to/fix.sql
//!   migrate-rpc check [--table tickets]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use migrate_rpc_lib::commands::{self, Overrides, Target};
use migrate_rpc_lib::config::{FallbackPolicy, vars};
use migrate_rpc_lib::error::MigrateError;
use migrate_rpc_lib::services::{FsPayloadSource, RestRpcClient};

#[derive(Debug, Parser)]
#[command(
    name = "migrate-rpc",
    version,
    about = "Apply SQL migrations through the exec_sql RPC endpoint"
)]
struct Cli {
    /// Read catalog SQL from this directory instead of the bundled copies [env: MIGRATE_SQL_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    sql_dir: Option<PathBuf>,

    /// What to do when exec_sql is unavailable: fail or manual [env: MIGRATE_FALLBACK]
    #[arg(long, global = true, value_name = "POLICY", value_parser = parse_fallback)]
    fallback: Option<FallbackPolicy>,

    /// Request timeout in seconds [env: MIGRATE_TIMEOUT_SECS, default: 30]
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: Option<u64>,

    /// Log request details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered migrations
    #[command(alias = "ls")]
    List,
    /// Print a migration's SQL without running it
    Show { name: String },
    /// Apply a registered migration
    Apply { name: String },
    /// Apply an ad-hoc SQL file
    Run { file: PathBuf },
    /// Read-only connectivity check with the anon key
    Check {
        /// Select one row from this table instead of fetching the API root
        #[arg(long)]
        table: Option<String>,
    },
}

fn parse_fallback(s: &str) -> Result<FallbackPolicy, String> {
    FallbackPolicy::parse(s).ok_or_else(|| format!("'{}' is not 'fail' or 'manual'", s))
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "warn,migrate_rpc=debug,migrate_rpc_lib=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = Overrides {
        sql_dir: cli.sql_dir,
        fallback: cli.fallback,
        timeout_secs: cli.timeout_secs,
    };
    let lookup = |name: &str| std::env::var(name).ok();
    let mut stdout = std::io::stdout().lock();

    let result = match cli.command {
        Command::List => commands::list(lookup, &overrides, &mut stdout),
        Command::Show { name } => {
            commands::show(lookup, &overrides, &name, &FsPayloadSource, &mut stdout)
        }
        Command::Apply { name } => {
            commands::apply(
                lookup,
                &overrides,
                &Target::Named(name),
                &FsPayloadSource,
                RestRpcClient::new,
                &mut stdout,
            )
            .await
        }
        Command::Run { file } => {
            commands::apply(
                lookup,
                &overrides,
                &Target::File(file),
                &FsPayloadSource,
                RestRpcClient::new,
                &mut stdout,
            )
            .await
        }
        Command::Check { table } => {
            commands::check(lookup, &overrides, table.as_deref(), &mut stdout).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            print_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn print_error(error: &MigrateError) {
    eprintln!();
    eprintln!("Error: {}", error);
    match error {
        MigrateError::Config(_) => {
            eprintln!();
            eprintln!("Please check your environment variables (or .env file):");
            eprintln!(
                "  - {}: project URL, e.g. https://<project-ref>.supabase.co",
                vars::URL
            );
            eprintln!(
                "  - {}: service-role key, needed by apply and run",
                vars::SERVICE_ROLE_KEY
            );
            eprintln!("  - {}: anon key, needed by check", vars::ANON_KEY);
            eprintln!("  - Values must not be the template placeholders");
        }
        MigrateError::Payload { .. } => {
            eprintln!();
            eprintln!(
                "Check the path, or point {} / --sql-dir at the SQL directory.",
                vars::SQL_DIR
            );
        }
        MigrateError::Transport { .. } => {
            eprintln!();
            eprintln!("Nothing was retried. Check {} and your network, then re-run.", vars::URL);
        }
        MigrateError::Interrupted { applied, .. } => {
            eprintln!();
            eprintln!(
                "The first {} step(s) were applied and are not rolled back.",
                applied
            );
            eprintln!("Re-run once the endpoint is reachable; catalog migrations are safe to apply again.");
        }
        MigrateError::UnknownMigration(_) | MigrateError::Output(_) => {}
    }
    eprintln!();
}
