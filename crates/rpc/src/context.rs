//! Application context - wires the ledger to its journal

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use trustcircle_advisor::{AdvisorConfig, AdvisoryService, InMemoryProfileStore, RuleBasedScorer};
use trustcircle_core::{Clock, ManualClock, MemberId};
use trustcircle_events::{verify_chain, JournalReader, JournalRecord, JournalStore, RecordPayload};
use trustcircle_ledger::{Command, LedgerConfig, LedgerEvent, TrustLedger};

/// Application context
///
/// The journal is the Source of Truth. On startup every record is replayed
/// with the clock pinned to the record's timestamp, so the rebuilt ledger is
/// identical to the one that wrote the journal.
pub struct AppContext {
    ledger: Option<TrustLedger>,
    journal: JournalStore,
    clock: Arc<ManualClock>,
    advisor: AdvisoryService,
    journal_path: PathBuf,
    last_timestamp: Option<DateTime<Utc>>,
}

impl AppContext {
    /// Open the data directory and replay its journal
    pub async fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let journal_path = data_path.as_ref().join("journal");
        std::fs::create_dir_all(&journal_path)?;

        let records = JournalReader::from_directory(&journal_path)?.read_all()?;
        verify_chain(&records)?;

        let clock = Arc::new(ManualClock::default());
        let ledger = Self::replay(&records, &clock)?;
        let journal = JournalStore::open(&journal_path)?;

        let advisor = AdvisoryService::new(
            Arc::new(RuleBasedScorer::new()),
            Arc::new(InMemoryProfileStore::new()),
            clock.clone(),
            AdvisorConfig::default(),
        );

        info!(records = records.len(), path = %journal_path.display(), "journal replayed");

        Ok(Self {
            ledger,
            journal,
            clock,
            advisor,
            journal_path,
            last_timestamp: records.last().map(|r| r.timestamp),
        })
    }

    /// Swap in an advisor with a different configuration
    pub fn with_advisor_config(mut self, config: AdvisorConfig) -> Self {
        self.advisor = AdvisoryService::new(
            Arc::new(RuleBasedScorer::new()),
            Arc::new(InMemoryProfileStore::new()),
            self.clock.clone(),
            config,
        );
        self
    }

    fn replay(
        records: &[JournalRecord],
        clock: &Arc<ManualClock>,
    ) -> Result<Option<TrustLedger>, anyhow::Error> {
        let mut ledger: Option<TrustLedger> = None;

        for record in records {
            clock.set(record.timestamp);
            match &record.payload {
                RecordPayload::Genesis { admin, config } => {
                    if ledger.is_some() {
                        anyhow::bail!("duplicate genesis record at seq {}", record.sequence);
                    }
                    ledger = Some(TrustLedger::new(config.clone(), admin.clone(), clock.clone()));
                }
                RecordPayload::Command(command) => {
                    let Some(ledger) = ledger.as_mut() else {
                        anyhow::bail!("record {} precedes genesis", record.sequence);
                    };
                    ledger.execute(&record.caller, command).map_err(|e| {
                        anyhow::anyhow!("replay of seq {} ({}) failed: {}", record.sequence, command.name(), e)
                    })?;
                    debug!(sequence = record.sequence, op = command.name(), "replayed");
                }
            }
        }

        Ok(ledger)
    }

    /// Move ledger time to `at`. Time never moves backwards past the last
    /// journaled record.
    pub fn advance_to(&mut self, at: DateTime<Utc>) -> Result<(), CommitError> {
        if let Some(last) = self.last_timestamp {
            if at < last {
                return Err(CommitError::ClockRegression { last, requested: at });
            }
        }
        self.clock.set(at);
        Ok(())
    }

    /// Pin ledger time for a read-only invocation to the later of `at` and
    /// the last journaled record. Nothing is written, so no regression check.
    pub fn view_at(&mut self, at: DateTime<Utc>) {
        let at = self.last_timestamp.map_or(at, |last| at.max(last));
        self.clock.set(at);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Write the genesis record and create the ledger
    pub fn init(
        &mut self,
        admin: MemberId,
        config: LedgerConfig,
        correlation_id: &str,
    ) -> Result<JournalRecord, CommitError> {
        if self.ledger.is_some() {
            return Err(CommitError::AlreadyInitialized(self.journal.last_sequence()));
        }
        config.validate().map_err(CommitError::InvalidConfig)?;

        let timestamp = self.clock.now();
        let record = self.journal.append(
            timestamp,
            admin.clone(),
            correlation_id,
            RecordPayload::Genesis {
                admin: admin.clone(),
                config: config.clone(),
            },
        )?;

        self.ledger = Some(TrustLedger::new(config, admin, self.clock.clone()));
        self.last_timestamp = Some(timestamp);
        Ok(record)
    }

    /// Commit a command
    ///
    /// Flow: Execute on a staged copy → Append → Swap in
    pub async fn commit(
        &mut self,
        caller: &MemberId,
        command: Command,
        correlation_id: &str,
    ) -> Result<(JournalRecord, LedgerEvent), CommitError> {
        let ledger = self.ledger.as_ref().ok_or(CommitError::NotInitialized)?;

        // 1. Validate by running against a copy; rejected commands stop here
        let mut staged = ledger.clone();
        let event = staged.execute(caller, &command)?;

        // 2. Append to the journal (Source of Truth)
        let timestamp = self.clock.now();
        let record = self.journal.append(
            timestamp,
            caller.clone(),
            correlation_id,
            RecordPayload::Command(command),
        )?;

        // 3. Publish the new state
        self.ledger = Some(staged);
        self.last_timestamp = Some(timestamp);

        Ok((record, event))
    }

    pub fn ledger(&self) -> Result<&TrustLedger, CommitError> {
        self.ledger.as_ref().ok_or(CommitError::NotInitialized)
    }

    pub fn advisor(&self) -> &AdvisoryService {
        &self.advisor
    }

    /// Re-read the journal from disk and verify its hash chain
    pub fn audit(&self) -> Result<usize, anyhow::Error> {
        let records = JournalReader::from_directory(&self.journal_path)?.read_all()?;
        verify_chain(&records)?;
        Ok(records.len())
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn is_initialized(&self) -> bool {
        self.ledger.is_some()
    }

    pub fn last_sequence(&self) -> u64 {
        self.journal.last_sequence()
    }
}

/// Errors during commit
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Ledger not initialized (run `init` first)")]
    NotInitialized,

    #[error("Ledger already initialized (sequence = {0})")]
    AlreadyInitialized(u64),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Time {requested} is before the last journaled record at {last}")]
    ClockRegression {
        last: DateTime<Utc>,
        requested: DateTime<Utc>,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] trustcircle_ledger::LedgerError),

    #[error("Journal error: {0}")]
    Journal(#[from] trustcircle_events::EventError),
}
