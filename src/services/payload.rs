//! Loading SQL payloads.

use std::io;
use std::path::Path;

use crate::migration::bundled_sql;

/// Source of SQL step text.
pub trait PayloadSource: Send + Sync {
    /// Read the full text at `path`.
    fn read(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads payloads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPayloadSource;

impl PayloadSource for FsPayloadSource {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Serves the catalog SQL compiled into the binary, by file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledPayloadSource;

impl PayloadSource for BundledPayloadSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(bundled_sql)
            .map(str::to_string)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not bundled with migrate-rpc"))
    }
}
