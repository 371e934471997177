use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::CreateError;

/// Store-assigned record id. Numeric ids on the wire are kept in decimal form.
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Completed | RecordStatus::Failed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processing => "processing",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        };
        f.write_str(token)
    }
}

/// A job row as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: JobId,
    pub wallet_address: String,
    pub status: RecordStatus,
    #[serde(default, alias = "stats_json", skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("completed job {id} has no result payload")]
    MissingResult { id: JobId },
}

impl JobRecord {
    /// Rejects rows whose status and payload disagree.
    pub fn ensure_well_formed(&self) -> Result<(), RecordError> {
        if self.status == RecordStatus::Completed && self.result.is_none() {
            return Err(RecordError::MissingResult {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Insert payload for a new job row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJob {
    pub wallet_address: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the poll loop reads on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub wallet: String,
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    ChangeFeed,
    Poll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A producer observed a record.
    Snapshot { source: Source, record: JobRecord },
    /// Outcome of a "most recent record for wallet" lookup.
    Rediscovered {
        wallet: String,
        record: Option<JobRecord>,
    },
    JobCreated { request: u64, record: JobRecord },
    CreateFailed { request: u64, error: CreateError },
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<JobId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_legacy_payload_key_and_numeric_id() {
        let raw = r#"{
            "id": 42,
            "wallet_address": "W1",
            "status": "completed",
            "stats_json": {"persona": "whale"},
            "created_at": "2025-12-01T10:00:00Z"
        }"#;

        let record: JobRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.status, RecordStatus::Completed);
        assert_eq!(record.result, Some(serde_json::json!({"persona": "whale"})));
        assert!(record.ensure_well_formed().is_ok());
    }

    #[test]
    fn completed_without_result_is_malformed() {
        let raw = r#"{
            "id": "a1",
            "wallet_address": "W1",
            "status": "completed",
            "created_at": "2025-12-01T10:00:00Z"
        }"#;

        let record: JobRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(
            record.ensure_well_formed(),
            Err(RecordError::MissingResult {
                id: "a1".to_string()
            })
        );
    }

    #[test]
    fn unknown_status_token_is_rejected() {
        let raw = r#"{"id": "a1", "wallet_address": "W1", "status": "queued",
            "created_at": "2025-12-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<JobRecord>(raw).is_err());
    }
}
