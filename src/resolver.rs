//! The resolution driver.
//!
//! Walks parsed references in ordinal order, queries the registry for each
//! one, scores the candidates and appends a [`ResolutionRecord`] to the
//! mapping store before moving on. Requests are strictly sequential and
//! paced by a fixed pause.
//!
//! Resuming reads the store's highest ordinal and only processes references
//! above it, so records already on disk are never re-queried or rewritten.

use crate::error::{Result, ResolveError};
use crate::rate_limit::RateLimiter;
use crate::registry::Registry;
use crate::score::{select_best, DEFAULT_MIN_SCORE};
use crate::store::MappingStore;
use crate::types::{Decision, MatchedWork, Reference, ResolutionRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Where a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPoint {
    /// Process every reference, appending to whatever the store holds.
    #[default]
    Fresh,
    /// Continue after the highest ordinal already in the store.
    Resume,
    /// Process only references above this ordinal.
    After(u32),
}

/// Settings for a resolution run.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Minimum score for an accepted match (inclusive).
    pub min_score: u32,
    /// Candidates requested per reference.
    pub rows: u32,
    /// Pause between registry requests.
    pub pause: Duration,
    /// Maximum references processed in this run.
    pub limit: Option<usize>,
    pub start: StartPoint,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            rows: 7,
            pause: Duration::from_millis(250),
            limit: None,
            start: StartPoint::Fresh,
        }
    }
}

impl ResolveConfig {
    pub fn with_min_score(mut self, min_score: u32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_start(mut self, start: StartPoint) -> Self {
        self.start = start;
        self
    }

    /// Check the settings before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(ResolveError::Config(
                "candidate count (rows) must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a run stopped before exhausting its references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    /// The registry query for `ordinal` failed; nothing was stored for it,
    /// so a resumed run retries it.
    RegistryUnavailable { ordinal: u32, message: String },
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegistryUnavailable { ordinal, message } => {
                write!(f, "registry unavailable at idx={}: {}", ordinal, message)
            }
        }
    }
}

/// Outcome counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ordinal the run started after.
    pub start_after: u32,
    /// References persisted in this run.
    pub attempted: usize,
    pub accepted: usize,
    pub low_confidence: usize,
    pub no_match: usize,
    /// Highest ordinal persisted in this run.
    pub last_ordinal: Option<u32>,
    pub halted: Option<HaltReason>,
}

impl RunSummary {
    fn count(&mut self, record: &ResolutionRecord) {
        self.attempted += 1;
        self.last_ordinal = Some(record.ordinal);
        match record.decision {
            Decision::Accepted => self.accepted += 1,
            Decision::LowConfidence => self.low_confidence += 1,
            Decision::NoMatch => self.no_match += 1,
        }
    }
}

/// Sequential reference resolver over a registry and a mapping store.
///
/// # Example
///
/// ```
/// # async fn example() -> refdoi::error::Result<()> {
/// use refdoi::{MemoryStore, MockRegistry, ResolveConfig, Resolver};
///
/// let references = refdoi::parse_references("[1] A. Author, Chem. Rev. 2010, 110, 111.");
/// let registry = MockRegistry::new();
/// let mut store = MemoryStore::new();
///
/// let mut resolver = Resolver::new(&registry, &mut store, ResolveConfig::default());
/// let summary = resolver.run(&references).await?;
/// assert_eq!(summary.no_match, 1);
/// # Ok(())
/// # }
/// ```
pub struct Resolver<R, S> {
    registry: R,
    store: S,
    config: ResolveConfig,
    limiter: RateLimiter,
}

impl<R: Registry, S: MappingStore> Resolver<R, S> {
    pub fn new(registry: R, store: S, config: ResolveConfig) -> Self {
        let limiter = RateLimiter::new(config.pause);
        Self {
            registry,
            store,
            config,
            limiter,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ordinal after which this run starts, logging how it was chosen.
    fn start_after(&self) -> Result<u32> {
        match self.config.start {
            StartPoint::After(ordinal) => {
                tracing::info!(start_after = ordinal, "starting after explicit idx");
                Ok(ordinal)
            }
            StartPoint::Resume => {
                let max = self.store.max_ordinal()?.unwrap_or(0);
                tracing::info!(start_after = max, "resuming after highest stored idx");
                Ok(max)
            }
            StartPoint::Fresh => {
                let existing = self.store.load()?;
                if let (Some(lo), Some(hi)) = (
                    existing.iter().map(|r| r.ordinal).min(),
                    existing.iter().map(|r| r.ordinal).max(),
                ) {
                    tracing::warn!(
                        existing = existing.len(),
                        min_idx = lo,
                        max_idx = hi,
                        "fresh run on a non-empty mapping store; records will be appended without de-duplication"
                    );
                } else {
                    tracing::info!("fresh run");
                }
                Ok(0)
            }
        }
    }

    /// Resolve every pending reference. `references` must be sorted by
    /// ordinal, as returned by [`parse_references`](crate::parse_references).
    ///
    /// Registry failures halt the run without writing a record for the
    /// failing reference. Store failures abort with an error; everything
    /// appended before the failure stays on disk.
    pub async fn run(&mut self, references: &[Reference]) -> Result<RunSummary> {
        self.config.validate()?;

        let start_after = self.start_after()?;
        let mut seen = HashSet::new();
        let pending: Vec<&Reference> = references
            .iter()
            .filter(|r| r.ordinal > start_after)
            .filter(|r| {
                let first = seen.insert(r.ordinal);
                if !first {
                    tracing::warn!(ordinal = r.ordinal, "duplicate ordinal in reference list, skipping");
                }
                first
            })
            .take(self.config.limit.unwrap_or(usize::MAX))
            .collect();

        let total = pending.len();
        tracing::info!(
            registry = self.registry.name(),
            pending = total,
            pause_ms = self.limiter.pause().as_millis() as u64,
            "resolving references"
        );
        let mut summary = RunSummary {
            start_after,
            ..Default::default()
        };

        for reference in pending {
            self.limiter.acquire().await;

            let candidates = match self.registry.query(reference, self.config.rows).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(
                        registry = self.registry.name(),
                        ordinal = reference.ordinal,
                        error = %e,
                        "registry query failed, stopping run"
                    );
                    summary.halted = Some(HaltReason::RegistryUnavailable {
                        ordinal: reference.ordinal,
                        message: e.to_string(),
                    });
                    break;
                }
            };

            let selection = select_best(reference, &candidates, self.config.min_score);
            let record = ResolutionRecord {
                ordinal: reference.ordinal,
                raw_text: reference.raw_text.clone(),
                score: selection.score,
                decision: selection.decision,
                identifier: selection
                    .best
                    .filter(|_| selection.decision == Decision::Accepted)
                    .map(|c| c.doi.clone()),
                matched: selection.best.map(MatchedWork::from),
            };

            self.store.append(&record)?;
            summary.count(&record);

            tracing::debug!(
                ordinal = record.ordinal,
                candidates = candidates.len(),
                score = record.score,
                decision = %record.decision,
                "reference resolved"
            );
            if summary.attempted % 10 == 0 || summary.attempted == total {
                tracing::info!(
                    "[{}/{}] ordinal={} score={} decision={} identifier={}",
                    summary.attempted,
                    total,
                    record.ordinal,
                    record.score,
                    record.decision,
                    record.identifier.as_deref().unwrap_or("")
                );
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MockRegistry;
    use crate::store::MemoryStore;
    use crate::types::Candidate;

    fn reference(ordinal: u32) -> Reference {
        Reference {
            ordinal,
            raw_text: format!("[{}] A. Author, Chem. Rev. 2010, {}, 111.", ordinal, ordinal),
            authors: vec!["Author".to_string()],
            year: Some(2010),
            journal: Some("Chem. Rev".to_string()),
            volume: Some(ordinal.to_string()),
            page_or_article: Some("111".to_string()),
        }
    }

    fn exact(ordinal: u32) -> Candidate {
        Candidate {
            doi: format!("10.1021/cr{}", ordinal),
            container_title: Some("Chemical Reviews".to_string()),
            year: Some(2010),
            volume: Some(ordinal.to_string()),
            page: Some("111-131".to_string()),
            ..Default::default()
        }
    }

    fn config() -> ResolveConfig {
        ResolveConfig::default().with_pause(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_run_persists_every_reference() {
        let refs: Vec<Reference> = (1..=3).map(reference).collect();
        let registry = MockRegistry::new()
            .with_candidates(1, vec![exact(1)])
            .with_candidates(2, vec![Candidate {
                doi: "10.1/weak".to_string(),
                year: Some(2010),
                ..Default::default()
            }]);
        let mut store = MemoryStore::new();

        let summary = Resolver::new(&registry, &mut store, config())
            .run(&refs)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.low_confidence, 1);
        assert_eq!(summary.no_match, 1);
        assert_eq!(summary.last_ordinal, Some(3));
        assert!(summary.halted.is_none());

        let records = store.records();
        assert_eq!(records[0].identifier.as_deref(), Some("10.1021/cr1"));
        assert_eq!(records[0].score, 60);
        assert_eq!(records[1].decision, Decision::LowConfidence);
        assert_eq!(records[1].identifier, None);
        assert!(records[1].matched.is_some());
        assert_eq!(records[2].decision, Decision::NoMatch);
        assert!(records[2].matched.is_none());
    }

    #[tokio::test]
    async fn test_resume_skips_stored_ordinals() {
        let refs: Vec<Reference> = (1..=4).map(reference).collect();
        let registry = MockRegistry::new();
        let mut store = MemoryStore::new();

        Resolver::new(&registry, &mut store, config().with_limit(Some(2)))
            .run(&refs)
            .await
            .unwrap();
        let summary = Resolver::new(&registry, &mut store, config().with_start(StartPoint::Resume))
            .run(&refs)
            .await
            .unwrap();

        assert_eq!(summary.start_after, 2);
        assert_eq!(summary.attempted, 2);
        assert_eq!(registry.calls(), vec![1, 2, 3, 4]);
        let ordinals: Vec<u32> = store.records().iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_explicit_start_overrides_resume() {
        let refs: Vec<Reference> = (1..=5).map(reference).collect();
        let registry = MockRegistry::new();
        let mut store = MemoryStore::new();

        let summary = Resolver::new(&registry, &mut store, config().with_start(StartPoint::After(3)))
            .run(&refs)
            .await
            .unwrap();
        assert_eq!(summary.start_after, 3);
        assert_eq!(registry.calls(), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_fresh_run_appends_without_dedup() {
        let refs: Vec<Reference> = (1..=2).map(reference).collect();
        let registry = MockRegistry::new();
        let mut store = MemoryStore::new();

        Resolver::new(&registry, &mut store, config()).run(&refs).await.unwrap();
        Resolver::new(&registry, &mut store, config()).run(&refs).await.unwrap();
        let ordinals: Vec<u32> = store.records().iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 1, 2]);
    }

    #[tokio::test]
    async fn test_registry_failure_halts_and_resume_retries() {
        let refs: Vec<Reference> = (1..=3).map(reference).collect();
        let registry = MockRegistry::new()
            .with_candidates(2, vec![exact(2)])
            .failing_first(2, 1);
        let mut store = MemoryStore::new();

        let first = Resolver::new(&registry, &mut store, config())
            .run(&refs)
            .await
            .unwrap();
        assert_eq!(first.attempted, 1);
        assert!(matches!(
            first.halted,
            Some(HaltReason::RegistryUnavailable { ordinal: 2, .. })
        ));
        assert_eq!(store.records().len(), 1);

        let second = Resolver::new(&registry, &mut store, config().with_start(StartPoint::Resume))
            .run(&refs)
            .await
            .unwrap();
        assert!(second.halted.is_none());
        assert_eq!(second.accepted, 1);
        let ordinals: Vec<u32> = store.records().iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_duplicate_ordinals_resolved_once() {
        let refs = vec![reference(1), reference(1), reference(2)];
        let registry = MockRegistry::new();
        let mut store = MemoryStore::new();

        let summary = Resolver::new(&registry, &mut store, config()).run(&refs).await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(registry.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let refs = vec![reference(1)];
        let registry = MockRegistry::new().with_candidates(1, vec![exact(1)]);
        let mut store = MemoryStore::new();

        Resolver::new(&registry, &mut store, config().with_min_score(61))
            .run(&refs)
            .await
            .unwrap();
        assert_eq!(store.records()[0].decision, Decision::LowConfidence);
    }

    #[tokio::test]
    async fn test_zero_rows_rejected() {
        let registry = MockRegistry::new();
        let mut store = MemoryStore::new();
        let err = Resolver::new(&registry, &mut store, config().with_rows(0))
            .run(&[reference(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Config(_)));
        assert!(registry.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced() {
        let refs: Vec<Reference> = (1..=3).map(reference).collect();
        let registry = MockRegistry::new();
        let mut store = MemoryStore::new();

        let start = tokio::time::Instant::now();
        Resolver::new(
            &registry,
            &mut store,
            config().with_pause(Duration::from_millis(250)),
        )
        .run(&refs)
        .await
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_owned_store_readable_after_run() {
        let refs: Vec<Reference> = (1..=2).map(reference).collect();
        let registry = MockRegistry::new().with_candidates(2, vec![exact(2)]);

        let mut resolver = Resolver::new(&registry, MemoryStore::new(), config());
        resolver.run(&refs).await.unwrap();

        let records = resolver.store().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].identifier.as_deref(), Some("10.1021/cr2"));
    }
}
