//! Structured error/action logging.
//!
//! Errors and user actions share one append-only timeline so that
//! error patterns can be correlated with the operations that preceded
//! them. Records are never mutated after append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gl_intent::intent::ParamMap;
use gl_intent::GlResult;

use crate::persist;

/// One entry on the error/action timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum TimelineRecord {
    Error {
        timestamp: DateTime<Utc>,
        error_type: String,
        error_message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
        #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
        context: ParamMap,
    },
    Action {
        timestamp: DateTime<Utc>,
        action_type: String,
        details: serde_json::Value,
    },
}

impl TimelineRecord {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Error { timestamp, .. } | Self::Action { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Aggregated statistics for one error type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorTypeStats {
    pub count: usize,
    pub percentage: f64,
    pub preceding_operations: HashMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_common_preceding_operation: Option<String>,
}

/// Aggregated error statistics across the timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStatistics {
    pub total_errors: usize,
    pub error_types: HashMap<String, ErrorTypeStats>,
}

/// Deeper pattern analysis of the error timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub total_errors: usize,
    pub unique_error_types: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_common_error_type: Option<String>,
    pub most_common_error_count: usize,
    /// Errors per hour of day (UTC).
    pub hour_distribution: [usize; 24],
    pub peak_hour: usize,
}

/// Append-only error/action log backed by one JSON-array file.
pub struct ErrorLog {
    path: PathBuf,
    records: Mutex<Vec<TimelineRecord>>,
}

impl ErrorLog {
    /// Open (or create) the log under `dir`. A corrupt existing file is
    /// backed up and the log starts empty.
    pub fn open(dir: &Path) -> GlResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("error_log.json");
        let records = persist::load_json_array(&path)?;
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Log an error with contextual information.
    pub fn log_error(
        &self,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
        traceback: Option<String>,
        context: ParamMap,
    ) {
        let error_type = error_type.into();
        let error_message = error_message.into();
        tracing::error!(%error_type, "{error_message}");

        let record = TimelineRecord::Error {
            timestamp: Utc::now(),
            error_type,
            error_message,
            traceback,
            context,
        };
        self.append(record);
    }

    /// Log a user action for correlation with later errors.
    pub fn log_action(&self, action_type: impl Into<String>, details: serde_json::Value) {
        let action_type = action_type.into();
        tracing::info!(%action_type, "action logged");

        let record = TimelineRecord::Action {
            timestamp: Utc::now(),
            action_type,
            details,
        };
        self.append(record);
    }

    /// Append one record and persist the full file as a single unit.
    fn append(&self, record: TimelineRecord) {
        let mut records = self.records.lock().expect("error log mutex poisoned");
        records.push(record);
        persist::write_json_array(&self.path, &records);
    }

    /// All errors of a given type.
    pub fn errors_by_type(&self, error_type: &str) -> Vec<TimelineRecord> {
        self.records
            .lock()
            .expect("error log mutex poisoned")
            .iter()
            .filter(|r| matches!(r, TimelineRecord::Error { error_type: t, .. } if t == error_type))
            .cloned()
            .collect()
    }

    /// The most recent errors (actions are skipped).
    pub fn recent_errors(&self, count: usize) -> Vec<TimelineRecord> {
        let records = self.records.lock().expect("error log mutex poisoned");
        let errors: Vec<TimelineRecord> = records.iter().filter(|r| r.is_error()).cloned().collect();
        let start = errors.len().saturating_sub(count);
        errors[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("error log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate error statistics, including which operations most
    /// commonly precede each error type — the risk engine's input.
    pub fn statistics(&self) -> ErrorStatistics {
        let records = self.records.lock().expect("error log mutex poisoned");
        let errors: Vec<&TimelineRecord> = records.iter().filter(|r| r.is_error()).collect();
        let total = errors.len();

        let mut error_types: HashMap<String, ErrorTypeStats> = HashMap::new();
        for record in &errors {
            let TimelineRecord::Error {
                error_type, context, ..
            } = record
            else {
                continue;
            };
            let stats = error_types.entry(error_type.clone()).or_default();
            stats.count += 1;
            if let Some(op) = context.get("preceding_operation").and_then(|v| v.as_str()) {
                *stats.preceding_operations.entry(op.to_string()).or_insert(0) += 1;
            }
        }

        for stats in error_types.values_mut() {
            stats.percentage = (stats.count as f64 / total.max(1) as f64) * 100.0;
            stats.most_common_preceding_operation = stats
                .preceding_operations
                .iter()
                .max_by_key(|(_, count)| **count)
                .map(|(op, _)| op.clone());
        }

        ErrorStatistics {
            total_errors: total,
            error_types,
        }
    }

    /// Deeper analysis: dominant error type and temporal distribution.
    pub fn analyze(&self) -> ErrorAnalysis {
        use chrono::Timelike;

        let records = self.records.lock().expect("error log mutex poisoned");
        let errors: Vec<&TimelineRecord> = records.iter().filter(|r| r.is_error()).collect();

        let mut by_type: HashMap<&str, usize> = HashMap::new();
        let mut hour_distribution = [0usize; 24];
        for record in &errors {
            if let TimelineRecord::Error {
                error_type,
                timestamp,
                ..
            } = record
            {
                *by_type.entry(error_type.as_str()).or_insert(0) += 1;
                hour_distribution[timestamp.hour() as usize] += 1;
            }
        }

        let most_common = by_type.iter().max_by_key(|(_, count)| **count);
        let peak_hour = hour_distribution
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(hour, _)| hour)
            .unwrap_or(0);

        ErrorAnalysis {
            total_errors: errors.len(),
            unique_error_types: by_type.len(),
            most_common_error_type: most_common.map(|(t, _)| t.to_string()),
            most_common_error_count: most_common.map(|(_, c)| *c).unwrap_or(0),
            hour_distribution,
            peak_hour,
        }
    }
}
