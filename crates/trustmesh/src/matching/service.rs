//! Host side of the matching API.
//!
//! Candidates are always scored through the privacy filter, with the
//! opportunity's creator as the viewer. Results are cached per candidate so
//! reads keep working when the opportunity source is down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::engine::{MatchResult, MatchingEngine};
use super::opportunity::{Opportunity, OpportunityStatus, OpportunityUpdate};
use crate::identity::IdentityId;
use crate::privacy::{PartialProfile, PrivacyService};
use crate::{Error, Result};

/// Where opportunities come from.
#[async_trait]
pub trait OpportunitySource: Send + Sync {
    async fn opportunities(&self) -> Result<Vec<Opportunity>>;
}

/// In-process opportunity store.
#[derive(Default)]
pub struct MemoryOpportunitySource {
    items: RwLock<HashMap<String, Opportunity>>,
    offline: AtomicBool,
}

impl MemoryOpportunitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    /// Insert or replace an opportunity. Replacing someone else's, or a
    /// closed one, is refused. Status only moves through
    /// [`transition`](Self::transition): a replacement keeps the stored
    /// status and a new opportunity must start out matchable.
    pub async fn publish(&self, actor: &IdentityId, mut opportunity: Opportunity) -> Result<()> {
        if &opportunity.creator != actor {
            return Err(Error::NotOwner { actor: actor.clone(), resource: format!("opportunity {}", opportunity.id) });
        }
        let mut items = self.items.write().await;
        match items.get(&opportunity.id) {
            Some(existing) if &existing.creator != actor => {
                return Err(Error::NotOwner { actor: actor.clone(), resource: format!("opportunity {}", existing.id) });
            }
            Some(existing) if !existing.status.is_matchable() => {
                return Err(Error::OpportunityClosed(existing.id.clone()));
            }
            Some(existing) => opportunity.status = existing.status,
            None if !opportunity.status.is_matchable() => {
                return Err(Error::OpportunityClosed(opportunity.id.clone()));
            }
            None => {}
        }
        items.insert(opportunity.id.clone(), opportunity);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Opportunity> {
        self.items.read().await.get(id).cloned().ok_or_else(|| Error::OpportunityNotFound(id.to_string()))
    }

    pub async fn update(&self, actor: &IdentityId, id: &str, update: OpportunityUpdate) -> Result<()> {
        let mut items = self.items.write().await;
        let opportunity = items.get_mut(id).ok_or_else(|| Error::OpportunityNotFound(id.to_string()))?;
        opportunity.update(actor, update)
    }

    pub async fn transition(&self, actor: &IdentityId, id: &str, status: OpportunityStatus) -> Result<()> {
        let mut items = self.items.write().await;
        let opportunity = items.get_mut(id).ok_or_else(|| Error::OpportunityNotFound(id.to_string()))?;
        opportunity.transition(actor, status)
    }
}

#[async_trait]
impl OpportunitySource for MemoryOpportunitySource {
    async fn opportunities(&self) -> Result<Vec<Opportunity>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::MatchServiceUnavailable("opportunity source offline".into()));
        }
        Ok(self.items.read().await.values().cloned().collect())
    }
}

/// One candidate's views, one per opportunity it is scored against.
type ScoringJob = Vec<(PartialProfile, Opportunity)>;

pub struct MatchService {
    engine: Arc<MatchingEngine>,
    privacy: Arc<PrivacyService>,
    source: Arc<dyn OpportunitySource>,
    cache: RwLock<HashMap<IdentityId, Vec<MatchResult>>>,
}

impl MatchService {
    pub fn new(engine: Arc<MatchingEngine>, privacy: Arc<PrivacyService>, source: Arc<dyn OpportunitySource>) -> Self {
        Self { engine, privacy, source, cache: RwLock::new(HashMap::new()) }
    }

    async fn matchable_opportunities(&self) -> Result<Vec<Opportunity>> {
        let mut opportunities = self.source.opportunities().await?;
        opportunities.retain(|o| o.status.is_matchable());
        opportunities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(opportunities)
    }

    /// Each opportunity sees the candidate filtered for its creator.
    fn job_for(&self, candidate: &IdentityId, opportunities: &[Opportunity]) -> Result<ScoringJob> {
        opportunities
            .iter()
            .map(|o| -> Result<(PartialProfile, Opportunity)> {
                Ok((self.privacy.view(candidate, &o.creator)?, o.clone()))
            })
            .collect()
    }

    async fn run(&self, jobs: HashMap<IdentityId, ScoringJob>) -> Result<HashMap<IdentityId, Vec<MatchResult>>> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            jobs.into_iter()
                .map(|(candidate, job)| {
                    let mut results: Vec<_> = job.iter().map(|(view, o)| engine.score(view, o)).collect();
                    results.sort_by(|a, b| {
                        b.total_score.cmp(&a.total_score).then_with(|| a.opportunity_id.cmp(&b.opportunity_id))
                    });
                    (candidate, results)
                })
                .collect::<HashMap<_, _>>()
        })
        .await
        .map_err(|e| Error::MatchServiceUnavailable(format!("scoring task failed: {e}")))
    }

    /// Rescore every known candidate. Returns how many were scored.
    pub async fn recompute_all(&self) -> Result<usize> {
        let opportunities = self.matchable_opportunities().await?;
        let mut jobs = HashMap::new();
        for candidate in self.privacy.profile_owners() {
            let job = self.job_for(&candidate, &opportunities)?;
            jobs.insert(candidate, job);
        }

        let results = self.run(jobs).await?;
        let count = results.len();
        self.cache.write().await.extend(results);
        info!(candidates = count, opportunities = opportunities.len(), "Recomputed matches");
        Ok(count)
    }

    /// Rescore one candidate, e.g. after a profile or settings change.
    pub async fn on_profile_update(&self, candidate: &IdentityId) -> Result<Vec<MatchResult>> {
        let opportunities = self.matchable_opportunities().await?;
        let job = self.job_for(candidate, &opportunities)?;
        let mut results = self.run(HashMap::from([(candidate.clone(), job)])).await?;
        let scored = results.remove(candidate).unwrap_or_default();
        self.cache.write().await.insert(candidate.clone(), scored.clone());
        Ok(scored)
    }

    /// Best matches for a candidate, highest first. Falls back to the last
    /// cached results when fresh scoring is not possible.
    pub async fn get_matches(&self, candidate: &IdentityId, limit: usize) -> Result<Vec<MatchResult>> {
        let results = match self.on_profile_update(candidate).await {
            Ok(results) => results,
            Err(e @ Error::ProfileNotFound(_)) => return Err(e),
            Err(e) => self.cached_or(candidate, e).await?,
        };
        Ok(results.into_iter().take(limit).collect())
    }

    pub async fn get_match_detail(&self, candidate: &IdentityId, opportunity_id: &str) -> Result<MatchResult> {
        self.get_matches(candidate, usize::MAX)
            .await?
            .into_iter()
            .find(|r| r.opportunity_id == opportunity_id)
            .ok_or_else(|| Error::OpportunityNotFound(opportunity_id.to_string()))
    }

    async fn cached_or(&self, candidate: &IdentityId, cause: Error) -> Result<Vec<MatchResult>> {
        match self.cache.read().await.get(candidate) {
            Some(results) => {
                warn!(candidate = %candidate, error = %cause, "Serving cached matches");
                Ok(results.clone())
            }
            None => Err(Error::MatchServiceUnavailable(cause.to_string())),
        }
    }

    /// Run [`recompute_all`](Self::recompute_all) every `interval` until the
    /// handle is aborted.
    pub fn spawn_scheduler(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.recompute_all().await {
                    error!("Scheduled match recompute failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingConfig;
    use crate::matching::graph::MemoryConnectionGraph;
    use crate::privacy::{AvailabilityWindow, DisclosureLevel, FieldValue, Profile, ProfileField};

    struct Fixture {
        service: Arc<MatchService>,
        privacy: Arc<PrivacyService>,
        source: Arc<MemoryOpportunitySource>,
    }

    async fn fixture() -> Fixture {
        let privacy = Arc::new(PrivacyService::new());
        let source = Arc::new(MemoryOpportunitySource::new());
        let engine =
            Arc::new(MatchingEngine::new(Arc::new(MemoryConnectionGraph::new()), &MatchingConfig::default()).unwrap());

        let dan: IdentityId = "dan".into();
        let profile = Profile::new(dan.clone())
            .with(ProfileField::Skills, FieldValue::Tags(vec!["rust".into()]))
            .unwrap();
        privacy.put_profile(&dan, profile).unwrap();
        privacy.set_field_level(&dan, &dan, ProfileField::Skills, DisclosureLevel::Connections).unwrap();

        let carol: IdentityId = "carol".into();
        let window = AvailabilityWindow::new(0, 10).unwrap();
        source
            .publish(&carol, Opportunity::new("a", carol.clone(), "dev", window).with_skills(["rust"]))
            .await
            .unwrap();
        source
            .publish(&carol, Opportunity::new("b", carol.clone(), "dev", window).with_skills(["go"]))
            .await
            .unwrap();

        let service = Arc::new(MatchService::new(engine, Arc::clone(&privacy), source.clone()));
        Fixture { service, privacy, source }
    }

    #[tokio::test]
    async fn test_scoring_respects_creator_tier() {
        let f = fixture().await;
        let dan: IdentityId = "dan".into();

        let hidden = f.service.get_match_detail(&dan, "a").await.unwrap();
        assert_eq!(hidden.dimension_scores.skill, 0.0);

        f.privacy
            .set_connection_tier(&dan, &dan, &"carol".into(), crate::privacy::ConnectionTier::Connection)
            .unwrap();
        let visible = f.service.get_match_detail(&dan, "a").await.unwrap();
        assert_eq!(visible.dimension_scores.skill, 1.0);
        assert!(visible.total_score > hidden.total_score);
    }

    #[tokio::test]
    async fn test_matches_sorted_and_limited() {
        let f = fixture().await;
        let dan: IdentityId = "dan".into();
        f.privacy.set_field_level(&dan, &dan, ProfileField::Skills, DisclosureLevel::Public).unwrap();

        let matches = f.service.get_matches(&dan, 10).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].opportunity_id, "a");
        assert!(matches[0].total_score >= matches[1].total_score);
        assert_eq!(f.service.get_matches(&dan, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_opportunities_skipped() {
        let f = fixture().await;
        f.source.transition(&"carol".into(), "b", OpportunityStatus::Closed).await.unwrap();
        let matches = f.service.get_matches(&"dan".into(), 10).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].opportunity_id, "a");
    }

    #[tokio::test]
    async fn test_outage_falls_back_to_cache() {
        let f = fixture().await;
        let dan: IdentityId = "dan".into();

        f.source.set_online(false);
        let result = f.service.get_matches(&dan, 10).await;
        assert!(matches!(result, Err(Error::MatchServiceUnavailable(_))));

        f.source.set_online(true);
        assert_eq!(f.service.recompute_all().await.unwrap(), 1);
        f.source.set_online(false);
        assert_eq!(f.service.get_matches(&dan, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_candidate() {
        let f = fixture().await;
        let result = f.service.get_matches(&"ghost".into(), 10).await;
        assert!(matches!(result, Err(Error::ProfileNotFound(_))));
    }

    #[tokio::test]
    async fn test_foreign_publish_refused() {
        let f = fixture().await;
        let window = AvailabilityWindow::new(0, 1).unwrap();
        let forged = Opportunity::new("c", "carol".into(), "dev", window);
        let result = f.source.publish(&"mallory".into(), forged).await;
        assert!(matches!(result, Err(Error::NotOwner { .. })));
    }

    #[tokio::test]
    async fn test_republish_cannot_change_status() {
        let f = fixture().await;
        let carol: IdentityId = "carol".into();
        let window = AvailabilityWindow::new(0, 10).unwrap();

        f.source.transition(&carol, "a", OpportunityStatus::InProgress).await.unwrap();
        let mut reopened = Opportunity::new("a", carol.clone(), "renamed", window);
        reopened.status = OpportunityStatus::Open;
        f.source.publish(&carol, reopened).await.unwrap();
        let stored = f.source.get("a").await.unwrap();
        assert_eq!(stored.category, "renamed");
        assert_eq!(stored.status, OpportunityStatus::InProgress);

        f.source.transition(&carol, "b", OpportunityStatus::Closed).await.unwrap();
        let result = f.source.publish(&carol, Opportunity::new("b", carol.clone(), "dev", window)).await;
        assert!(matches!(result, Err(Error::OpportunityClosed(_))));
        assert_eq!(f.source.get("b").await.unwrap().status, OpportunityStatus::Closed);

        let mut archived = Opportunity::new("c", carol.clone(), "dev", window);
        archived.status = OpportunityStatus::Archived;
        let result = f.source.publish(&carol, archived).await;
        assert!(matches!(result, Err(Error::OpportunityClosed(_))));
        assert!(matches!(f.source.get("c").await, Err(Error::OpportunityNotFound(_))));
    }

    #[tokio::test]
    async fn test_scheduler_fills_cache() {
        let f = fixture().await;
        let handle = Arc::clone(&f.service).spawn_scheduler(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        f.source.set_online(false);
        assert_eq!(f.service.get_matches(&"dan".into(), 10).await.unwrap().len(), 2);
    }
}
