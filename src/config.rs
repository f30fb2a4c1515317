//! Runner configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use secrecy::SecretString;

/// Name of the remote procedure that executes arbitrary SQL.
pub const EXEC_SQL_FUNCTION: &str = "exec_sql";

/// Environment variable names.
pub mod vars {
    pub const URL: &str = "SUPABASE_URL";
    pub const URL_PUBLIC: &str = "NEXT_PUBLIC_SUPABASE_URL";
    pub const SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
    pub const ANON_KEY: &str = "SUPABASE_ANON_KEY";
    pub const ANON_KEY_PUBLIC: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";
    pub const SQL_DIR: &str = "MIGRATE_SQL_DIR";
    pub const FALLBACK: &str = "MIGRATE_FALLBACK";
    pub const TIMEOUT_SECS: &str = "MIGRATE_TIMEOUT_SECS";
}

/// Default values.
pub mod defaults {
    pub const TIMEOUT_SECS: u64 = 30;

    /// Values shipped in `.env.example` templates. A configuration still
    /// carrying one of these was never filled in.
    pub const PLACEHOLDERS: &[&str] = &[
        "your-project-url",
        "your-supabase-url",
        "https://your-project.supabase.co",
        "https://your-project-ref.supabase.co",
        "your-service-role-key",
        "your-anon-key",
        "your-supabase-anon-key",
        "your-supabase-service-role-key",
    ];
}

/// Which credential an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Administrative key, required for anything that mutates the schema.
    ServiceRole,
    /// Public key, enough for the read-only connectivity check.
    Anon,
}

impl AccessLevel {
    /// Environment variables consulted for this level, in priority order.
    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            Self::ServiceRole => &[vars::SERVICE_ROLE_KEY],
            Self::Anon => &[vars::ANON_KEY, vars::ANON_KEY_PUBLIC],
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceRole => write!(f, "service-role"),
            Self::Anon => write!(f, "anon"),
        }
    }
}

/// What to do when the `exec_sql` procedure does not exist on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Report the failure and exit.
    #[default]
    Fail,
    /// Print the SQL with instructions for pasting it into the web SQL editor,
    /// then exit with a failure status.
    Manual,
}

impl FallbackPolicy {
    /// Parse policy from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail" | "strict" => Some(Self::Fail),
            "manual" | "print" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service base URL (e.g. `https://abcd.supabase.co`)
    pub endpoint_url: Url,
    /// Credential sent as `apikey` and bearer token
    pub credential: SecretString,
    /// Which kind of key `credential` holds
    pub access: AccessLevel,
    /// Directory that catalog step files are read from; `None` uses the
    /// copies bundled into the binary
    pub sql_dir: Option<PathBuf>,
    /// Behavior when `exec_sql` is missing on the target
    pub fallback: FallbackPolicy,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Config {
    /// Load configuration through a variable lookup, usually the process
    /// environment.
    ///
    /// Variables:
    /// - `SUPABASE_URL` (or `NEXT_PUBLIC_SUPABASE_URL`): service base URL - REQUIRED
    /// - `SUPABASE_SERVICE_ROLE_KEY`: admin key - REQUIRED for service-role access
    /// - `SUPABASE_ANON_KEY` (or `NEXT_PUBLIC_SUPABASE_ANON_KEY`): REQUIRED for anon access
    /// - `MIGRATE_SQL_DIR`: read catalog SQL from this directory (default: bundled copies)
    /// - `MIGRATE_FALLBACK`: `fail` or `manual` (default: fail)
    /// - `MIGRATE_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    ///
    /// Every problem is collected so the operator sees all of them at once.
    pub fn from_lookup<F>(lookup: F, access: AccessLevel) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        let endpoint_url = match first_set(&lookup, &[vars::URL, vars::URL_PUBLIC]) {
            None => {
                errors.push(format!("{} is not set", vars::URL));
                None
            }
            Some((name, value)) if is_placeholder(&value) => {
                errors.push(format!(
                    "{} is still the placeholder '{}'. Set your project URL.",
                    name, value
                ));
                None
            }
            Some((name, value)) => match parse_endpoint(&value) {
                Ok(url) => Some(url),
                Err(reason) => {
                    errors.push(format!("{} is not a valid URL: {}", name, reason));
                    None
                }
            },
        };

        let key_vars = access.key_vars();
        let credential = match first_set(&lookup, key_vars) {
            None => {
                errors.push(format!("{} is not set", key_vars[0]));
                None
            }
            Some((name, value)) if is_placeholder(&value) => {
                errors.push(format!(
                    "{} is still a placeholder value. Set the {} key from your project settings.",
                    name, access
                ));
                None
            }
            Some((_, value)) => Some(SecretString::from(value)),
        };

        let fallback = match lookup(vars::FALLBACK).filter(|v| !v.trim().is_empty()) {
            None => FallbackPolicy::default(),
            Some(value) => FallbackPolicy::parse(&value).unwrap_or_else(|| {
                errors.push(format!(
                    "{} must be 'fail' or 'manual', got '{}'",
                    vars::FALLBACK,
                    value
                ));
                FallbackPolicy::default()
            }),
        };

        let timeout_secs = match lookup(vars::TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            None => defaults::TIMEOUT_SECS,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    errors.push(format!(
                        "{} must be a positive number of seconds, got '{}'",
                        vars::TIMEOUT_SECS,
                        value
                    ));
                    defaults::TIMEOUT_SECS
                }
            },
        };

        let sql_dir = sql_dir_from_lookup(&lookup);

        match (endpoint_url, credential) {
            (Some(endpoint_url), Some(credential)) if errors.is_empty() => Ok(Config {
                endpoint_url,
                credential,
                access,
                sql_dir,
                fallback,
                timeout: Duration::from_secs(timeout_secs),
            }),
            _ => Err(ConfigError::Invalid(errors)),
        }
    }

    /// Host part of the endpoint, for display.
    pub fn host(&self) -> &str {
        self.endpoint_url.host_str().unwrap_or("<unknown host>")
    }

    /// Full URL of the `exec_sql` RPC endpoint.
    pub fn rpc_url(&self) -> Result<Url, ConfigError> {
        self.rest_url(&format!("rpc/{}", EXEC_SQL_FUNCTION))
    }

    /// Resolve a path below `/rest/v1/`.
    pub fn rest_url(&self, path: &str) -> Result<Url, ConfigError> {
        self.endpoint_url
            .join(&format!("rest/v1/{}", path))
            .map_err(|e| ConfigError::InvalidValue(format!("cannot build REST URL: {}", e)))
    }

    /// Project reference for hosted projects (`<ref>.supabase.co`).
    pub fn project_ref(&self) -> Option<&str> {
        let host = self.endpoint_url.host_str()?;
        let project = host.strip_suffix(".supabase.co")?;
        (!project.is_empty() && !project.contains('.')).then_some(project)
    }

    /// Link to the web SQL editor, when the project is hosted.
    pub fn sql_editor_url(&self) -> Option<String> {
        self.project_ref()
            .map(|r| format!("https://supabase.com/dashboard/project/{}/sql/new", r))
    }
}

/// SQL directory from `MIGRATE_SQL_DIR`, if set.
///
/// Needs no credentials, so commands that only read files can use it.
pub fn sql_dir_from_lookup<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(vars::SQL_DIR)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// First variable in `names` that is set to a non-blank value.
fn first_set<F>(lookup: &F, names: &[&'static str]) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| (*name, v))
    })
}

/// Check a value against the template placeholders.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim().trim_end_matches('/');
    defaults::PLACEHOLDERS
        .iter()
        .any(|p| value.eq_ignore_ascii_case(p))
}

/// Parse a base URL, normalizing it to end with `/` so joins keep any path prefix.
fn parse_endpoint(value: &str) -> Result<Url, String> {
    let mut url = Url::parse(value).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Invalid(Vec<String>),
}
