//! MemberId - Wallet-style member identifiers
//!
//! Members are keyed by the wallet address they sign with. We keep the key
//! opaque but normalized, so `0xAbC` and `0xabc` address the same member.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum identifier length (an EVM address is 42 chars, leave headroom)
pub const MAX_MEMBER_ID_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemberIdError {
    #[error("Empty member id")]
    Empty,

    #[error("Member id too long (max {MAX_MEMBER_ID_LEN} chars): {0}")]
    TooLong(String),

    #[error("Invalid member id format: {0}")]
    InvalidFormat(String),
}

/// A validated, lowercase member identifier.
///
/// # Examples
/// ```
/// use trustcircle_core::MemberId;
///
/// let a: MemberId = "0xAbC123".parse().unwrap();
/// let b: MemberId = "0xabc123".parse().unwrap();
/// assert_eq!(a, b);
///
/// assert!("".parse::<MemberId>().is_err());
/// assert!("has space".parse::<MemberId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    pub fn new(raw: &str) -> Result<Self, MemberIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MemberIdError::Empty);
        }
        if trimmed.len() > MAX_MEMBER_ID_LEN {
            return Err(MemberIdError::TooLong(trimmed.to_string()));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(MemberIdError::InvalidFormat(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MemberId {
    type Err = MemberIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MemberId {
    type Error = MemberIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        id.0
    }
}
