//! Migration definitions, resolved plans, and loaded payloads.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Catalog entry for one feature migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationDef {
    /// Name used on the command line
    pub name: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// SQL files applied in order, by file name
    pub steps: &'static [&'static str],
    /// What the migration sets up, printed after a successful run
    pub summary: &'static [&'static str],
}

/// A migration with its step files resolved to paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub name: String,
    pub title: String,
    pub steps: Vec<PathBuf>,
    pub summary: Vec<String>,
}

impl MigrationPlan {
    /// Resolve a catalog entry against a SQL directory. Without one, steps
    /// stay bare file names, which name the bundled copies.
    pub fn from_def(def: &MigrationDef, sql_dir: Option<&Path>) -> Self {
        MigrationPlan {
            name: def.name.to_string(),
            title: def.title.to_string(),
            steps: def
                .steps
                .iter()
                .map(|s| match sql_dir {
                    Some(dir) => dir.join(s),
                    None => PathBuf::from(s),
                })
                .collect(),
            summary: def.summary.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Plan for an ad-hoc SQL file.
    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "adhoc".to_string());

        MigrationPlan {
            title: format!("SQL file {}", path.display()),
            name,
            steps: vec![path],
            summary: Vec::new(),
        }
    }
}

/// Verbatim text of one SQL step file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPayload {
    pub path: PathBuf,
    pub sql: String,
}

impl MigrationPayload {
    pub fn new(path: impl Into<PathBuf>, sql: String) -> Self {
        Self {
            path: path.into(),
            sql,
        }
    }

    /// SHA-256 of the payload, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Short form of [`digest`](Self::digest) for console output.
    pub fn short_digest(&self) -> String {
        self.digest()[..12].to_string()
    }

    /// File name for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn len(&self) -> usize {
        self.sql.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }
}
