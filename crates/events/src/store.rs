//! Append-only journal writer with daily file rotation

use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use trustcircle_core::MemberId;

use crate::error::EventError;
use crate::reader::JournalReader;
use crate::record::{JournalRecord, RecordPayload, GENESIS_HASH};

/// Append-only JSONL journal.
///
/// Files are named `YYYY-MM-DD.jsonl` after the record's ledger timestamp,
/// so lexical file order is replay order.
pub struct JournalStore {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    last_sequence: u64,
    last_hash: String,
}

impl JournalStore {
    /// Open (or create) a journal directory and position at its head
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let (last_sequence, last_hash) = match JournalReader::from_directory(&base_path)?.last_record()? {
            Some(record) => (record.sequence, record.hash),
            None => (0, GENESIS_HASH.to_string()),
        };

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
            last_sequence,
            last_hash,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_empty(&self) -> bool {
        self.last_sequence == 0
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Seal the next record onto the chain and write it
    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        caller: MemberId,
        correlation_id: impl Into<String>,
        payload: RecordPayload,
    ) -> Result<JournalRecord, EventError> {
        let record = JournalRecord::seal(
            self.last_sequence + 1,
            self.last_hash.clone(),
            timestamp,
            caller,
            correlation_id,
            payload,
        );

        let date = record.timestamp.format("%Y-%m-%d").to_string();
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(&record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        debug!(sequence = record.sequence, file = %date, "journal record appended");
        self.last_sequence = record.sequence;
        self.last_hash = record.hash.clone();
        Ok(record)
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
