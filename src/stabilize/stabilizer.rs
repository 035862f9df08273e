//! Recursive stabilization with in-flight reference rewriting.
//!
//! A pass holds every record it creates "in flight" until the end. Each work
//! item inserts one record into another; when the result is unstable, the
//! resolver picks a candidate and a repair item is queued for it. A repair's
//! result supersedes its target: the target leaves the in-flight set and
//! every reference to it (substructure slots, lineage, pending items, the
//! final reference) is rewritten to the result. At the end the final record
//! and every remaining in-flight record are stable; the latter are returned
//! as byproducts for the caller to publish.

use super::worklist::{WorkItem, WorkQueue};
use crate::config::StabilizerConfig;
use crate::core::GcRef;
use crate::error::{ConfigurationError, GraphIssue, ResolutionFailed, StabilizeError, ValidationFailed};
use crate::gc::{GeneticCode, Lineage};
use crate::insertion::{compose, insert_graph, InsertCase, InsertionRow};
use crate::resolver;
use crate::source::MaterialSource;
use crate::trace::{StabilizationTrace, TraceStep};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Output of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stabilized {
    /// The stabilized record.
    pub gc: GeneticCode,
    /// Other records created by the pass, all stable, by reference.
    pub byproducts: BTreeMap<GcRef, GeneticCode>,
    /// Every insertion performed, in order.
    pub trace: StabilizationTrace,
}

impl Stabilized {
    /// The record and its byproducts, byproducts first.
    pub fn records(&self) -> impl Iterator<Item = &GeneticCode> {
        self.byproducts.values().chain(std::iter::once(&self.gc))
    }

    /// Publishes the byproducts and the record. Returns the record.
    ///
    /// An unchanged record (nothing was inserted) is not published again.
    pub fn publish_to<S: MaterialSource + ?Sized>(
        self,
        source: &S,
    ) -> Result<GeneticCode, crate::error::PublishError> {
        let mut records: Vec<GeneticCode> = self.byproducts.into_values().collect();
        if !self.trace.is_empty() {
            records.push(self.gc.clone());
        }
        source.publish(records)?;
        Ok(self.gc)
    }
}

/// Drives stabilization and insertion passes against one material source.
pub struct Stabilizer<'s, S: MaterialSource + ?Sized> {
    source: &'s S,
    config: StabilizerConfig,
    rng: StdRng,
}

impl<'s, S: MaterialSource + ?Sized> Stabilizer<'s, S> {
    /// Stabilizer with default bounds and an entropy seed.
    pub fn new(source: &'s S) -> Self {
        Self { source, config: StabilizerConfig::default(), rng: StdRng::from_entropy() }
    }

    /// Stabilizer with explicit bounds and seeding.
    pub fn with_config(source: &'s S, config: StabilizerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { source, config, rng })
    }

    /// Active configuration.
    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Makes `target` stable by inserting material from the source.
    ///
    /// A stable target is returned unchanged with no byproducts. Otherwise the
    /// returned record has a fresh reference and `target`'s lineage.
    pub fn stabilize(&mut self, target: GeneticCode) -> Result<Stabilized, StabilizeError> {
        if target.is_stable() {
            target.graph().validate()?;
            return Ok(Stabilized { gc: target, byproducts: BTreeMap::new(), trace: StabilizationTrace::new() });
        }
        debug!(target = %target.reference(), "stabilizing");
        let mut pass = Pass::new(self.source, &self.config, &mut self.rng, target.reference());
        let seed = target.clone();
        pass.in_flight.insert(target.reference(), target);
        if let Some(item) = pass.repair_item(&seed, 1)? {
            pass.queue.push_front(item);
        }
        pass.run()
    }

    /// Inserts `insert` into `target` above `row` and stabilizes the result.
    ///
    /// Neither input record is modified; the result is a new record whose
    /// lineage is `(target, insert)`.
    pub fn insert(
        &mut self,
        target: GeneticCode,
        insert: GeneticCode,
        row: InsertionRow,
    ) -> Result<Stabilized, StabilizeError> {
        debug!(target = %target.reference(), insert = %insert.reference(), row = %row, "inserting");
        let item = WorkItem::request(target.reference(), insert.reference(), row);
        let mut pass = Pass::new(self.source, &self.config, &mut self.rng, target.reference());
        pass.external.insert(target.reference(), target);
        pass.external.insert(insert.reference(), insert);
        pass.queue.push_front(item);
        pass.run()
    }
}

/// State of one pass.
struct Pass<'p, S: ?Sized, R: ?Sized> {
    source: &'p S,
    config: &'p StabilizerConfig,
    rng: &'p mut R,
    /// Caller-owned records; read, never rewritten.
    external: BTreeMap<GcRef, GeneticCode>,
    /// Records created (or adopted) by the pass.
    in_flight: BTreeMap<GcRef, GeneticCode>,
    queue: WorkQueue,
    /// Candidates already tried per record; follows reference rewrites.
    tried: BTreeMap<GcRef, BTreeSet<GcRef>>,
    final_ref: GcRef,
    trace: StabilizationTrace,
    steps: usize,
}

impl<'p, S, R> Pass<'p, S, R>
where
    S: MaterialSource + ?Sized,
    R: Rng + ?Sized,
{
    fn new(source: &'p S, config: &'p StabilizerConfig, rng: &'p mut R, final_ref: GcRef) -> Self {
        Self {
            source,
            config,
            rng,
            external: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            queue: WorkQueue::new(),
            tried: BTreeMap::new(),
            final_ref,
            trace: StabilizationTrace::new(),
            steps: 0,
        }
    }

    fn run(mut self) -> Result<Stabilized, StabilizeError> {
        while let Some(item) = self.queue.pop_front() {
            self.steps += 1;
            if self.steps > self.config.max_steps {
                return Err(ResolutionFailed::StepLimitExceeded { limit: self.config.max_steps }.into());
            }
            self.process(item)?;
        }
        self.finish()
    }

    fn lookup(&self, reference: GcRef) -> Result<&GeneticCode, StabilizeError> {
        self.in_flight
            .get(&reference)
            .or_else(|| self.external.get(&reference))
            .ok_or(StabilizeError::MissingRecord(reference))
    }

    /// Resolves `owner` and wraps the chosen candidate in a fresh embryo.
    /// `None` if `owner` is stable.
    fn repair_item(&mut self, owner: &GeneticCode, depth: usize) -> Result<Option<WorkItem>, StabilizeError> {
        if owner.is_stable() {
            return Ok(None);
        }
        if depth > self.config.max_depth {
            return Err(ResolutionFailed::DepthExceeded { depth, limit: self.config.max_depth }.into());
        }
        let owner_ref = owner.reference();
        let exclude = self.tried.get(&owner_ref).cloned().unwrap_or_default();
        let Some(resolution) = resolver::resolve(self.source, owner, &exclude, &mut *self.rng)? else {
            return Ok(None);
        };
        let candidate = resolution.candidate.reference();
        self.tried.entry(owner_ref).or_default().insert(candidate);

        let embryo = GeneticCode::embryo(self.source.next_reference(), &resolution.candidate);
        let item = WorkItem::repair(owner_ref, embryo.reference(), resolution.row, depth);
        trace!(owner = %owner_ref, candidate = %candidate, embryo = %embryo.reference(), depth, "queued repair");
        self.in_flight.insert(embryo.reference(), embryo);
        Ok(Some(item))
    }

    fn process(&mut self, item: WorkItem) -> Result<(), StabilizeError> {
        let target = self.lookup(item.target)?.clone();
        let insert = self.lookup(item.insert)?.clone();
        let case = InsertCase::for_graph(item.row, target.graph());
        debug!(
            case = %case,
            row = %item.row,
            target = %target.reference(),
            insert = %insert.reference(),
            depth = item.depth,
            "applying insertion"
        );

        let graphs = insert_graph(case, item.row, target.graph(), insert.graph(), &mut *self.rng)?;
        let lineage = if item.replaces_target {
            Lineage::inherited(&target)
        } else {
            Lineage::of(target.reference(), insert.reference())
        };
        let source = self.source;
        let composition = compose(case, &target, &insert, graphs, lineage, || source.next_reference());
        let result = composition.result;
        let formed = composition.formed;
        let result_ref = result.reference();

        self.trace.record_step(TraceStep {
            case,
            row: item.row,
            target: target.reference(),
            insert: insert.reference(),
            result: result_ref,
            formed: formed.as_ref().map(GeneticCode::reference),
            depth: item.depth,
            pre_fingerprint: target.signature(),
            post_fingerprint: result.signature(),
            stable: result.is_stable(),
        });

        if item.replaces_target {
            self.in_flight.remove(&target.reference());
            self.rewrite(target.reference(), result_ref);
        } else {
            self.final_ref = result_ref;
        }

        // A formed record shares the exclusions of the record it came from.
        if let Some(f) = &formed {
            let inherited = self.tried.get(&result_ref).cloned().unwrap_or_default();
            self.tried.insert(f.reference(), inherited);
        }

        let mut pending = Vec::with_capacity(2);
        pending.extend(self.repair_item(&result, item.depth + 1)?);
        if let Some(f) = &formed {
            pending.extend(self.repair_item(f, item.depth + 1)?);
        }
        self.in_flight.insert(result_ref, result);
        if let Some(f) = formed {
            self.in_flight.insert(f.reference(), f);
        }
        // The formed record's repair is pushed last and so runs first.
        for p in pending {
            self.queue.push_front(p);
        }
        Ok(())
    }

    /// Replaces every in-flight occurrence of `old` by `new`.
    fn rewrite(&mut self, old: GcRef, new: GcRef) {
        let records = self
            .in_flight
            .values_mut()
            .map(|gc| gc.rewrite_reference(old, new))
            .filter(|changed| *changed)
            .count();
        let items = self.queue.rewrite_reference(old, new);
        if self.final_ref == old {
            self.final_ref = new;
        }
        if let Some(tried) = self.tried.remove(&old) {
            self.tried.entry(new).or_default().extend(tried);
        }
        trace!(old = %old, new = %new, records, items, "rewrote reference");
    }

    fn finish(mut self) -> Result<Stabilized, StabilizeError> {
        let gc = self
            .in_flight
            .remove(&self.final_ref)
            .ok_or(StabilizeError::MissingRecord(self.final_ref))?;
        let open: Vec<GraphIssue> = std::iter::once(&gc)
            .chain(self.in_flight.values())
            .flat_map(|r| r.graph().unconnected())
            .map(GraphIssue::Unconnected)
            .collect();
        if !open.is_empty() {
            return Err(ValidationFailed { issues: open }.into());
        }
        debug!(
            gc = %gc.reference(),
            steps = self.trace.step_count(),
            byproducts = self.in_flight.len(),
            "stabilized"
        );
        Ok(Stabilized { gc, byproducts: self.in_flight, trace: self.trace })
    }
}
