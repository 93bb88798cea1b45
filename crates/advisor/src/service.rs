//! Advisory service: score a member with a bounded wait and upsert the profile

use std::sync::Arc;
use tracing::{info, warn};
use trustcircle_core::{Clock, MemberId};

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::profile::{AdvisoryProfile, ProfileStore};
use crate::scorer::{AdvisoryInput, AdvisoryScorer};

pub struct AdvisoryService {
    scorer: Arc<dyn AdvisoryScorer>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    config: AdvisorConfig,
}

impl AdvisoryService {
    pub fn new(
        scorer: Arc<dyn AdvisoryScorer>,
        profiles: Arc<dyn ProfileStore>,
        clock: Arc<dyn Clock>,
        config: AdvisorConfig,
    ) -> Self {
        Self {
            scorer,
            profiles,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Score `input` and create or update the member's profile.
    ///
    /// A scorer that exceeds `timeout_ms` leaves any existing profile untouched.
    pub async fn refresh(&self, input: AdvisoryInput) -> Result<AdvisoryProfile, AdvisorError> {
        let report = tokio::time::timeout(self.config.timeout(), self.scorer.score(&input))
            .await
            .map_err(|_| {
                warn!(member = %input.member, scorer = self.scorer.name(), "advisory scoring timed out");
                AdvisorError::Timeout {
                    member: input.member.clone(),
                    timeout_ms: self.config.timeout_ms,
                }
            })??;

        let now = self.clock.now();
        let needs_manual_review = self.config.needs_review(report.tier);

        let profile = match self.profiles.get(&input.member).await? {
            Some(existing) => {
                let profile = AdvisoryProfile {
                    member: input.member.clone(),
                    report,
                    needs_manual_review,
                    created_at: existing.created_at,
                    updated_at: now,
                    refresh_count: existing.refresh_count + 1,
                };
                self.profiles.update(profile.clone()).await?;
                profile
            }
            None => {
                let profile = AdvisoryProfile {
                    member: input.member.clone(),
                    report,
                    needs_manual_review,
                    created_at: now,
                    updated_at: now,
                    refresh_count: 1,
                };
                self.profiles.create(profile.clone()).await?;
                profile
            }
        };

        info!(
            member = %profile.member,
            total = profile.report.total,
            tier = %profile.report.tier,
            review = profile.needs_manual_review,
            "advisory profile refreshed"
        );
        Ok(profile)
    }

    pub async fn profile(&self, member: &MemberId) -> Result<Option<AdvisoryProfile>, AdvisorError> {
        self.profiles.get(member).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::InMemoryProfileStore;
    use crate::scorer::{AdvisoryReport, RiskTier, RuleBasedScorer};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::time::Duration as StdDuration;
    use trustcircle_core::ManualClock;

    struct SlowScorer;

    #[async_trait]
    impl AdvisoryScorer for SlowScorer {
        async fn score(&self, input: &AdvisoryInput) -> Result<AdvisoryReport, AdvisorError> {
            tokio::time::sleep(StdDuration::from_millis(500)).await;
            RuleBasedScorer.score(input).await
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn input(verified: bool) -> AdvisoryInput {
        AdvisoryInput {
            member: MemberId::new("alice").unwrap(),
            wallet_age_days: 10,
            prior_loans: 0,
            repaid_loans: 0,
            verified,
            in_circle: true,
        }
    }

    fn service(scorer: Arc<dyn AdvisoryScorer>, timeout_ms: u64) -> (AdvisoryService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()));
        let config = AdvisorConfig {
            timeout_ms,
            ..AdvisorConfig::default()
        };
        let service = AdvisoryService::new(
            scorer,
            Arc::new(InMemoryProfileStore::new()),
            clock.clone(),
            config,
        );
        (service, clock)
    }

    #[tokio::test]
    async fn test_refresh_creates_then_updates() {
        let (service, clock) = service(Arc::new(RuleBasedScorer), 500);

        // 0 + 5 + 0 + 10
        let first = service.refresh(input(false)).await.unwrap();
        assert_eq!(first.report.total, 15);
        assert_eq!(first.report.tier, RiskTier::High);
        assert!(first.needs_manual_review);
        assert_eq!(first.refresh_count, 1);

        clock.advance(Duration::days(1));
        let second = service.refresh(input(true)).await.unwrap();
        assert_eq!(second.report.total, 25);
        assert!(!second.needs_manual_review);
        assert_eq!(second.refresh_count, 2);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);

        let stored = service.profile(&second.member).await.unwrap().unwrap();
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn test_refresh_times_out() {
        let (service, _) = service(Arc::new(SlowScorer), 20);

        let result = service.refresh(input(true)).await;
        assert!(matches!(result, Err(AdvisorError::Timeout { timeout_ms: 20, .. })));

        let member = MemberId::new("alice").unwrap();
        assert!(service.profile(&member).await.unwrap().is_none());
    }
}
