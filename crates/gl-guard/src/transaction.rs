//! Transaction logging with state snapshots and rollback.
//!
//! Every operation attempt becomes a permanent history record; state
//! snapshots are kept only for the newest N transactions. Pruning
//! removes the snapshot blob but never the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use gl_intent::intent::ParamMap;
use gl_intent::GlResult;

use crate::persist;

/// Default number of state snapshots retained.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 10;

/// Serialized results above this size are replaced with a sentinel.
const MAX_RESULT_BYTES: usize = 256 * 1024;

/// One logged operation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique id: time prefix + short operation hash, sortable.
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub operation_type: String,
    pub parameters: ParamMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// True only while a backing snapshot blob exists on disk.
    pub has_state_snapshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
}

/// Transaction log over a directory: `transaction_log.json` plus one
/// blob per snapshot under `states/`.
pub struct TransactionLog {
    log_path: PathBuf,
    state_dir: PathBuf,
    max_snapshots: usize,
    records: Mutex<Vec<TransactionRecord>>,
    sequence: AtomicU64,
}

impl TransactionLog {
    /// Open (or create) the log under `dir`. A corrupt log file is
    /// backed up and the log starts empty — required recovery contract.
    pub fn open(dir: &Path, max_snapshots: usize) -> GlResult<Self> {
        fs::create_dir_all(dir)?;
        let state_dir = dir.join("states");
        fs::create_dir_all(&state_dir)?;

        let log_path = dir.join("transaction_log.json");
        let records = persist::load_json_array(&log_path)?;

        Ok(Self {
            log_path,
            state_dir,
            max_snapshots: max_snapshots.max(1),
            records: Mutex::new(records),
            sequence: AtomicU64::new(0),
        })
    }

    fn snapshot_path(&self, state_id: &str) -> PathBuf {
        self.state_dir.join(format!("{state_id}.bin"))
    }

    fn next_transaction_id(&self, operation_type: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(operation_type.as_bytes());
        hasher.update(seq.to_le_bytes());
        let digest = hasher.finalize();
        let short: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
        format!("tx_{}_{short}", Utc::now().timestamp())
    }

    /// Log an operation attempt, optionally with a state snapshot.
    ///
    /// A failed snapshot write is logged and the transaction is still
    /// recorded, just without a usable snapshot. Returns the new
    /// transaction id.
    pub fn log_operation(
        &self,
        operation_type: &str,
        parameters: ParamMap,
        result: Option<Value>,
        state_data: Option<&Value>,
    ) -> String {
        let transaction_id = self.next_transaction_id(operation_type);

        let result = result.map(|value| {
            match serde_json::to_vec(&value) {
                Ok(bytes) if bytes.len() > MAX_RESULT_BYTES => {
                    Value::String("Result exists but is too large to record".into())
                }
                Ok(_) => value,
                Err(_) => Value::String("Result exists but is not serializable".into()),
            }
        });

        let mut record = TransactionRecord {
            transaction_id: transaction_id.clone(),
            timestamp: Utc::now(),
            operation_type: operation_type.to_string(),
            parameters,
            result,
            has_state_snapshot: false,
            state_id: None,
        };

        if let Some(state) = state_data {
            let state_id = format!("state_{transaction_id}");
            match serde_json::to_vec(state)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    fs::write(self.snapshot_path(&state_id), bytes).map_err(|e| e.to_string())
                }) {
                Ok(()) => {
                    record.has_state_snapshot = true;
                    record.state_id = Some(state_id);
                    tracing::info!(%transaction_id, "saved state snapshot");
                }
                Err(err) => {
                    tracing::error!(%transaction_id, %err, "failed to save state snapshot");
                }
            }
        }

        let mut records = self.records.lock().expect("transaction log mutex poisoned");
        records.push(record);
        if state_data.is_some() {
            self.prune_snapshots(&mut records);
        }
        persist::write_json_array(&self.log_path, &records);

        transaction_id
    }

    /// Keep only the newest `max_snapshots` snapshot blobs. Pruned
    /// transactions stay in history with `has_state_snapshot` flipped.
    fn prune_snapshots(&self, records: &mut [TransactionRecord]) {
        let mut snapshot_indices: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_state_snapshot)
            .map(|(i, _)| i)
            .collect();
        snapshot_indices.sort_by(|a, b| records[*b].timestamp.cmp(&records[*a].timestamp));

        for &index in snapshot_indices.iter().skip(self.max_snapshots) {
            let record = &mut records[index];
            if let Some(ref state_id) = record.state_id {
                let path = self.snapshot_path(state_id);
                if path.exists()
                    && let Err(err) = fs::remove_file(&path)
                {
                    tracing::error!(%state_id, %err, "failed to remove old state snapshot");
                }
                tracing::info!(%state_id, "pruned state snapshot");
            }
            record.has_state_snapshot = false;
        }
    }

    /// Load a transaction's state snapshot. A missing blob corrects the
    /// record's flag on the spot and returns None.
    pub fn get_state_snapshot(&self, transaction_id: &str) -> Option<Value> {
        let mut records = self.records.lock().expect("transaction log mutex poisoned");
        let record = records
            .iter_mut()
            .find(|r| r.transaction_id == transaction_id)?;

        if !record.has_state_snapshot {
            tracing::warn!(transaction_id, "transaction has no state snapshot");
            return None;
        }
        let state_id = record.state_id.clone()?;
        let path = self.snapshot_path(&state_id);

        if !path.exists() {
            tracing::warn!(transaction_id, "state snapshot file missing, correcting record");
            record.has_state_snapshot = false;
            persist::write_json_array(&self.log_path, &records);
            return None;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(transaction_id, %err, "failed to read state snapshot");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::error!(transaction_id, %err, "state snapshot corrupt");
                None
            }
        }
    }

    /// The newest transaction whose snapshot still loads, skipping over
    /// missing or corrupt snapshots.
    pub fn get_latest_state_snapshot(&self) -> Option<(String, Value)> {
        let mut candidates: Vec<(String, DateTime<Utc>)> = {
            let records = self.records.lock().expect("transaction log mutex poisoned");
            records
                .iter()
                .filter(|r| r.has_state_snapshot)
                .map(|r| (r.transaction_id.clone(), r.timestamp))
                .collect()
        };
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        for (transaction_id, _) in candidates {
            if let Some(state) = self.get_state_snapshot(&transaction_id) {
                return Some((transaction_id, state));
            }
        }
        None
    }

    /// The state needed to roll back to a specific transaction.
    pub fn rollback_to_transaction(&self, transaction_id: &str) -> Option<Value> {
        self.get_state_snapshot(transaction_id)
    }

    /// The most recent operations, oldest first.
    pub fn recent_operations(&self, count: usize) -> Vec<TransactionRecord> {
        let records = self.records.lock().expect("transaction log mutex poisoned");
        let start = records.len().saturating_sub(count);
        records[start..].to_vec()
    }

    /// All operations of a given type.
    pub fn find_by_operation(&self, operation_type: &str) -> Vec<TransactionRecord> {
        self.records
            .lock()
            .expect("transaction log mutex poisoned")
            .iter()
            .filter(|r| r.operation_type == operation_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("transaction log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
