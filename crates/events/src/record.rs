//! Journal records and hash chain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use trustcircle_core::MemberId;
use trustcircle_ledger::{Command, LedgerConfig};

/// `prev_hash` of the first record
pub const GENESIS_HASH: &str = "GENESIS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPayload {
    /// First record: fixes the admin and the configuration for replay
    Genesis { admin: MemberId, config: LedgerConfig },
    Command(Command),
}

/// One committed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub sequence: u64,
    pub prev_hash: String,
    pub hash: String,
    /// Ledger time the command ran at; replay pins the clock here
    pub timestamp: DateTime<Utc>,
    pub caller: MemberId,
    pub correlation_id: String,
    pub payload: RecordPayload,
}

impl JournalRecord {
    /// Build a record linked to `prev_hash` and seal it with its hash
    pub fn seal(
        sequence: u64,
        prev_hash: impl Into<String>,
        timestamp: DateTime<Utc>,
        caller: MemberId,
        correlation_id: impl Into<String>,
        payload: RecordPayload,
    ) -> Self {
        let mut record = Self {
            sequence,
            prev_hash: prev_hash.into(),
            hash: String::new(),
            timestamp,
            caller,
            correlation_id: correlation_id.into(),
            payload,
        };
        record.hash = calculate_record_hash(&record);
        record
    }

    pub fn command(&self) -> Option<&Command> {
        match &self.payload {
            RecordPayload::Command(cmd) => Some(cmd),
            RecordPayload::Genesis { .. } => None,
        }
    }
}

/// SHA256 of record content (excluding the hash field itself)
pub fn calculate_record_hash(record: &JournalRecord) -> String {
    let mut hasher = Sha256::new();

    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    hasher.update(record.timestamp.to_rfc3339().as_bytes());
    hasher.update(record.caller.as_str().as_bytes());
    hasher.update(record.correlation_id.as_bytes());
    // Struct and enum fields serialize in declaration order, so this is stable
    hasher.update(
        serde_json::to_string(&record.payload)
            .unwrap_or_default()
            .as_bytes(),
    );

    hex::encode(hasher.finalize())
}

/// Verify hash chain integrity
pub fn verify_chain(records: &[JournalRecord]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut expected_sequence = 1;

    for record in records {
        if record.sequence != expected_sequence {
            return Err(ChainError::InvalidSequence {
                expected: expected_sequence,
                actual: record.sequence,
            });
        }

        if record.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: prev_hash,
                actual: record.prev_hash.clone(),
            });
        }

        let calculated = calculate_record_hash(record);
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: record.sequence,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }

        prev_hash = record.hash.clone();
        expected_sequence += 1;
    }

    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}
