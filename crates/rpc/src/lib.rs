//! TrustCircle RPC - CLI orchestrator
//!
//! This crate provides the CLI binary, the journal-backed application
//! context and the command handlers.

pub mod commands;
pub mod context;

pub use context::{AppContext, CommitError};
