//! JSON-array result store.
//!
//! `append` reads the existing array (absent file = empty), pushes the new
//! report and writes the whole array back. Entries are kept as raw JSON on
//! the way through, so records this build does not understand survive.
//!
//! Single writer only: there is no locking between processes.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tlm_core::LatencyReport;
use tracing::{debug, info};

use crate::error::{PersistenceError, PersistenceResult};

/// Write `value` as pretty JSON to `path` via a temporary file and rename.
///
/// Creates the parent directory if needed.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> PersistenceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);
    let result = (|| -> PersistenceResult<()> {
        let mut file = File::create(&tmp_path)?;
        serde_json::to_writer_pretty(&mut file, value)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "results.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// File-backed collection of latency reports.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw entries in file order. An absent or empty file is an empty array.
    ///
    /// # Errors
    /// `PersistenceError::Corrupt` if the file holds anything but a JSON array.
    pub fn read_raw(&self) -> PersistenceResult<Vec<Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(PersistenceError::Corrupt {
                path: self.path.clone(),
                reason: format!("top-level value is {}", json_kind(&other)),
            }),
            Err(e) => Err(PersistenceError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// All entries decoded as reports.
    pub fn read_all(&self) -> PersistenceResult<Vec<LatencyReport>> {
        self.read_raw()?
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(PersistenceError::from))
            .collect()
    }

    /// Append one report. Returns the collection size after the write.
    ///
    /// A corrupt file is left untouched and reported as an error.
    pub fn append(&self, report: &LatencyReport) -> PersistenceResult<usize> {
        let mut entries = self.read_raw()?;
        entries.push(serde_json::to_value(report)?);
        write_json_atomic(&self.path, &entries)?;

        debug!(path = %self.path.display(), run_id = %report.run_id, "Report appended");
        info!(
            path = %self.path.display(),
            total = entries.len(),
            "Results saved"
        );
        Ok(entries.len())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
