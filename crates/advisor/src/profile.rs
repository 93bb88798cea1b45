//! Advisory profiles and their store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use trustcircle_core::MemberId;

use crate::error::AdvisorError;
use crate::scorer::AdvisoryReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryProfile {
    pub member: MemberId,
    pub report: AdvisoryReport,
    pub needs_manual_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub refresh_count: u32,
}

/// Document store for advisory profiles, keyed by member
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, member: &MemberId) -> Result<Option<AdvisoryProfile>, AdvisorError>;

    /// Fails if a profile for the member already exists
    async fn create(&self, profile: AdvisoryProfile) -> Result<(), AdvisorError>;

    /// Fails if no profile for the member exists
    async fn update(&self, profile: AdvisoryProfile) -> Result<(), AdvisorError>;
}

/// Profile store held in memory
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<MemberId, AdvisoryProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, member: &MemberId) -> Result<Option<AdvisoryProfile>, AdvisorError> {
        Ok(self.profiles.read().unwrap().get(member).cloned())
    }

    async fn create(&self, profile: AdvisoryProfile) -> Result<(), AdvisorError> {
        let mut profiles = self.profiles.write().unwrap();
        if profiles.contains_key(&profile.member) {
            return Err(AdvisorError::ProfileExists(profile.member));
        }
        profiles.insert(profile.member.clone(), profile);
        Ok(())
    }

    async fn update(&self, profile: AdvisoryProfile) -> Result<(), AdvisorError> {
        let mut profiles = self.profiles.write().unwrap();
        match profiles.get_mut(&profile.member) {
            Some(existing) => {
                *existing = profile;
                Ok(())
            }
            None => Err(AdvisorError::ProfileNotFound(profile.member)),
        }
    }
}
