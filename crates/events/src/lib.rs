//! TrustCircle Events - JSONL command journal
//!
//! Every committed command is appended to a daily JSONL file, chained by
//! SHA-256 hashes. The journal is the Source of Truth: the in-memory ledger
//! is rebuilt on startup by replaying it.

pub mod error;
pub mod reader;
pub mod record;
pub mod store;

pub use error::EventError;
pub use reader::JournalReader;
pub use record::{calculate_record_hash, verify_chain, ChainError, JournalRecord, RecordPayload, GENESIS_HASH};
pub use store::JournalStore;
