//! Whole-file JSON-array persistence with corruption recovery.
//!
//! Both logs use the same contract: read-existing, modify-in-memory,
//! write-full-file. A file that fails to parse is renamed to a
//! timestamped backup and treated as empty — never fatal at startup.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use gl_intent::GlResult;

/// Load a JSON array file, backing up and resetting on corruption.
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> GlResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents = fs::read_to_string(path)?;
    match serde_json::from_str(&contents) {
        Ok(records) => Ok(records),
        Err(err) => {
            let backup = format!("{}.bak.{}", path.display(), Utc::now().timestamp());
            tracing::warn!(
                path = %path.display(),
                backup = %backup,
                %err,
                "log file corrupt, backing up and starting empty"
            );
            if let Err(rename_err) = fs::rename(path, &backup) {
                tracing::error!(%rename_err, "failed to back up corrupt log file");
            }
            Ok(Vec::new())
        }
    }
}

/// Write a full JSON array file. Failures are logged, not propagated —
/// a failed save must not take the pipeline down.
pub fn write_json_array<T: Serialize>(path: &Path, records: &[T]) {
    let json = match serde_json::to_string_pretty(records) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "failed to serialize log records");
            return;
        }
    };
    if let Err(err) = fs::write(path, json) {
        tracing::error!(path = %path.display(), %err, "failed to write log file");
    }
}
