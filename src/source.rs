//! Genetic material sources.
//!
//! A material source hands out fresh references, answers candidate queries
//! and accepts published records. The stabilizer only talks to this trait.
//! [`InMemorySource`] is the in-process implementation used by tests,
//! benchmarks and embedders without a persistent store.

use crate::arena::GcArena;
use crate::config::SourceConfig;
use crate::core::GcRef;
use crate::error::{ConfigurationError, PublishError};
use crate::fingerprint::HashValue;
use crate::gc::GeneticCode;
use crate::query::{MatchTier, Query};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Provider of references and candidate GCs.
///
/// All methods take `&self`; implementations synchronize internally.
pub trait MaterialSource {
    /// A reference never handed out before by this source.
    fn next_reference(&self) -> GcRef;

    /// Candidates answering `query`, never an excluded one. Empty if the
    /// ladder is exhausted.
    fn select(&self, query: &Query) -> Vec<GeneticCode>;

    /// Published record with this reference.
    fn get(&self, reference: GcRef) -> Option<GeneticCode>;

    /// Publishes records, all or none.
    fn publish(&self, records: Vec<GeneticCode>) -> Result<(), PublishError>;
}

impl<S: MaterialSource + ?Sized> MaterialSource for &S {
    fn next_reference(&self) -> GcRef {
        (**self).next_reference()
    }

    fn select(&self, query: &Query) -> Vec<GeneticCode> {
        (**self).select(query)
    }

    fn get(&self, reference: GcRef) -> Option<GeneticCode> {
        (**self).get(reference)
    }

    fn publish(&self, records: Vec<GeneticCode>) -> Result<(), PublishError> {
        (**self).publish(records)
    }
}

/// Counters kept by an [`InMemorySource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetrics {
    /// Queries answered.
    pub queries: u64,
    /// Queries with no candidate at any tier.
    pub misses: u64,
    /// Answers per tier, in `MatchTier::LADDER` order.
    pub tier_hits: [u64; 4],
    /// Records accepted.
    pub published: u64,
    /// Publish calls refused.
    pub rejected: u64,
}

impl SourceMetrics {
    fn record_hit(&mut self, tier: MatchTier) {
        self.queries += 1;
        if let Some(i) = MatchTier::LADDER.iter().position(|t| *t == tier) {
            self.tier_hits[i] += 1;
        }
    }

    fn record_miss(&mut self) {
        self.queries += 1;
        self.misses += 1;
    }
}

/// In-memory material source.
#[derive(Debug)]
pub struct InMemorySource {
    next: AtomicI64,
    pool: RwLock<GcArena>,
    metrics: Mutex<SourceMetrics>,
    config: SourceConfig,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySource {
    /// Empty source with the default ladder. References start at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
            pool: RwLock::new(GcArena::new()),
            metrics: Mutex::new(SourceMetrics::default()),
            config: SourceConfig::default(),
        }
    }

    /// Empty source with a custom selection policy.
    pub fn with_config(config: SourceConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config, ..Self::new() })
    }

    /// Selection policy.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Number of published records.
    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    /// Whether nothing is published.
    pub fn is_empty(&self) -> bool {
        self.pool.read().is_empty()
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> SourceMetrics {
        self.metrics.lock().clone()
    }

    /// References of published records whose graph has this signature.
    pub fn find_by_signature(&self, signature: &HashValue) -> Vec<GcRef> {
        let pool = self.pool.read();
        pool.with_signature(signature)
            .iter()
            .filter_map(|h| pool.get(*h).map(GeneticCode::reference))
            .collect()
    }

    /// Published ancestors of `reference`, nearest first.
    pub fn lineage(&self, reference: GcRef) -> Vec<GcRef> {
        let pool = self.pool.read();
        let Some(start) = pool.handle_of(reference) else {
            return Vec::new();
        };
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(h) = queue.pop_front() {
            for parent in pool.parents(h) {
                if seen.insert(parent) {
                    if let Some(gc) = pool.get(parent) {
                        out.push(gc.reference());
                    }
                    queue.push_back(parent);
                }
            }
        }
        out
    }

    /// Answering tier and its candidates, or `None` if the ladder is exhausted.
    pub fn select_tier(&self, query: &Query) -> Option<(MatchTier, Vec<GeneticCode>)> {
        let pool = self.pool.read();
        let found = self.config.ladder.iter().copied().find_map(|tier| {
            let hits: Vec<GeneticCode> = pool
                .iter()
                .map(|(_, gc)| gc)
                .filter(|gc| !query.is_excluded(gc.reference()))
                .filter(|gc| tier.matches(query, &gc.interface()))
                .cloned()
                .collect();
            (!hits.is_empty()).then_some((tier, hits))
        });
        drop(pool);

        let mut metrics = self.metrics.lock();
        match &found {
            Some((tier, hits)) => {
                metrics.record_hit(*tier);
                debug!(tier = %tier, candidates = hits.len(), "query answered");
            }
            None => {
                metrics.record_miss();
                debug!(outputs = ?query.outputs, "query exhausted the ladder");
            }
        }
        found
    }

    fn check(pool: &GcArena, batch: &[GeneticCode]) -> Result<(), PublishError> {
        let mut fresh = BTreeSet::new();
        for gc in batch {
            let reference = gc.reference();
            if pool.contains(reference) || !fresh.insert(reference) {
                return Err(PublishError::Duplicate(reference));
            }
            if !gc.is_stable() {
                return Err(PublishError::Unstable(reference));
            }
            gc.graph()
                .validate()
                .map_err(|source| PublishError::Invalid { reference, source })?;
        }
        Ok(())
    }
}

impl MaterialSource for InMemorySource {
    fn next_reference(&self) -> GcRef {
        GcRef::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn select(&self, query: &Query) -> Vec<GeneticCode> {
        self.select_tier(query).map(|(_, hits)| hits).unwrap_or_default()
    }

    fn get(&self, reference: GcRef) -> Option<GeneticCode> {
        self.pool.read().get_by_ref(reference).cloned()
    }

    fn publish(&self, records: Vec<GeneticCode>) -> Result<(), PublishError> {
        let mut pool = self.pool.write();
        if let Err(err) = Self::check(&pool, &records) {
            self.metrics.lock().rejected += 1;
            return Err(err);
        }
        let count = records.len() as u64;
        for gc in records {
            pool.push(gc).map_err(|gc| PublishError::Duplicate(gc.reference()))?;
        }
        self.metrics.lock().published += count;
        debug!(count, total = pool.len(), "published records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EndpointClass, EpType, Row};
    use crate::graph::{GcGraph, InternalGraph};

    fn t(raw: u32) -> EpType {
        EpType::new(raw)
    }

    fn codon(source: &InMemorySource, inputs: &[EpType], wiring: &[u16]) -> GeneticCode {
        let graph = GcGraph::leaf(inputs, wiring).expect("legal leaf");
        GeneticCode::codon(source.next_reference(), graph)
    }

    #[test]
    fn references_are_fresh() {
        let source = InMemorySource::new();
        let a = source.next_reference();
        let b = source.next_reference();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn select_answers_at_the_first_matching_tier() {
        let source = InMemorySource::new();
        let exact = codon(&source, &[t(1)], &[0]);
        let loose = codon(&source, &[t(1), t(2)], &[1, 0]);
        source.publish(vec![exact.clone(), loose]).expect("publish");

        let q = Query::new(vec![t(1)]).with_inputs(vec![t(1)]);
        let (tier, hits) = source.select_tier(&q).expect("match");
        assert_eq!(tier, MatchTier::Exact);
        assert_eq!(hits, vec![exact.clone()]);

        let q = q.excluding([exact.reference()]);
        assert!(source.select(&q).is_empty());
        assert_eq!(source.metrics().misses, 1);
    }

    #[test]
    fn publish_is_all_or_nothing() {
        let source = InMemorySource::new();
        let good = codon(&source, &[t(1)], &[0]);
        let open = InternalGraph::new()
            .with_sources(Row::I, &[t(1)])
            .with_destinations(Row::O, &[t(2)]);
        let open = GcGraph::new(open).expect("legal rows");
        assert_eq!(open.internal().row_len(Row::O, EndpointClass::Destination), 1);
        let bad = GeneticCode::codon(source.next_reference(), open);
        let bad_ref = bad.reference();

        assert_eq!(source.publish(vec![good.clone(), bad]), Err(PublishError::Unstable(bad_ref)));
        assert!(source.is_empty());
        source.publish(vec![good.clone()]).expect("publish");
        assert_eq!(source.publish(vec![good.clone()]), Err(PublishError::Duplicate(good.reference())));
        assert_eq!(source.metrics().rejected, 2);
        assert_eq!(source.get(good.reference()), Some(good));
    }

    #[test]
    fn duplicates_within_a_batch_are_refused() {
        let source = InMemorySource::new();
        let gc = codon(&source, &[t(1)], &[0]);
        let other = codon(&source, &[t(2)], &[0]);
        assert_eq!(
            source.publish(vec![gc.clone(), other, gc.clone()]),
            Err(PublishError::Duplicate(gc.reference()))
        );
        assert!(source.is_empty());
        assert_eq!(source.metrics().published, 0);
    }

    #[test]
    fn signature_and_lineage_lookups() {
        let source = InMemorySource::new();
        let a = codon(&source, &[t(1)], &[0]);
        let b = codon(&source, &[t(1)], &[0]);
        let child = GeneticCode::compose(
            source.next_reference(),
            Some(a.reference()),
            None,
            crate::gc::Lineage::of(a.reference(), b.reference()),
            GcGraph::wrapping(&a.interface()),
        );
        source.publish(vec![a.clone(), b.clone(), child.clone()]).expect("publish");
        assert_eq!(source.find_by_signature(&a.signature()), vec![a.reference(), b.reference()]);
        assert_eq!(source.lineage(child.reference()), vec![a.reference(), b.reference()]);
        assert!(source.lineage(GcRef::new(-1)).is_empty());
    }

    #[test]
    fn custom_ladder_must_be_valid() {
        assert!(InMemorySource::with_config(SourceConfig { ladder: vec![] }).is_err());
        let strict = InMemorySource::with_config(SourceConfig { ladder: vec![MatchTier::Exact] })
            .expect("valid");
        let gc = codon(&strict, &[t(1), t(2)], &[1, 0]);
        strict.publish(vec![gc]).expect("publish");
        // Only an unordered match exists.
        assert!(strict.select(&Query::new(vec![t(1), t(2)])).is_empty());
    }
}
