//! Traceability for stabilization passes.
//!
//! Every processed work item leaves one [`TraceStep`]: the case applied, the
//! records involved, and the fingerprints of the target graph before and the
//! result graph after. A trace is enough to audit which insertions produced
//! a stabilized GC and in what order.

use crate::core::GcRef;
use crate::fingerprint::HashValue;
use crate::insertion::{InsertCase, InsertionRow};

/// One processed work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Case applied.
    pub case: InsertCase,
    /// Row inserted above.
    pub row: InsertionRow,
    /// Record rewritten.
    pub target: GcRef,
    /// Record inserted.
    pub insert: GcRef,
    /// Record produced.
    pub result: GcRef,
    /// Formed record, for cases 4 to 10.
    pub formed: Option<GcRef>,
    /// Resolution depth; 0 for the requested insertion.
    pub depth: usize,
    /// Fingerprint of the target graph.
    pub pre_fingerprint: HashValue,
    /// Fingerprint of the result graph.
    pub post_fingerprint: HashValue,
    /// Whether the result graph was stable.
    pub stable: bool,
}

/// Ordered record of a stabilization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilizationTrace {
    steps: Vec<TraceStep>,
}

impl StabilizationTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn record_step(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether no insertion was performed.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in processing order.
    pub fn steps(&self) -> impl Iterator<Item = &TraceStep> {
        self.steps.iter()
    }

    /// Step at `index`.
    pub fn get_step(&self, index: usize) -> Option<&TraceStep> {
        self.steps.get(index)
    }

    /// Cases applied, in processing order.
    pub fn cases(&self) -> Vec<InsertCase> {
        self.steps.iter().map(|s| s.case).collect()
    }

    /// Number of steps driven by resolution rather than by the caller.
    pub fn resolutions(&self) -> usize {
        self.steps.iter().filter(|s| s.depth > 0).count()
    }

    /// Deepest resolution reached.
    pub fn max_depth(&self) -> usize {
        self.steps.iter().map(|s| s.depth).max().unwrap_or(0)
    }

    /// Every reference the pass minted, in minting order.
    pub fn minted(&self) -> Vec<GcRef> {
        self.steps
            .iter()
            .flat_map(|s| s.formed.into_iter().chain(std::iter::once(s.result)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(depth: usize, formed: Option<i64>, result: i64) -> TraceStep {
        TraceStep {
            case: if formed.is_some() { InsertCase::FormAboveO } else { InsertCase::FillB },
            row: InsertionRow::O,
            target: GcRef::new(1),
            insert: GcRef::new(2),
            result: GcRef::new(result),
            formed: formed.map(GcRef::new),
            depth,
            pre_fingerprint: HashValue::zero(),
            post_fingerprint: HashValue::zero(),
            stable: true,
        }
    }

    #[test]
    fn summaries() {
        let mut trace = StabilizationTrace::new();
        assert!(trace.is_empty());
        trace.record_step(step(0, None, 10));
        trace.record_step(step(1, Some(11), 12));
        trace.record_step(step(2, None, 13));
        assert_eq!(trace.step_count(), 3);
        assert_eq!(trace.resolutions(), 2);
        assert_eq!(trace.max_depth(), 2);
        assert_eq!(trace.cases(), vec![InsertCase::FillB, InsertCase::FormAboveO, InsertCase::FillB]);
        assert_eq!(trace.minted(), [10, 11, 12, 13].map(GcRef::new).to_vec());
    }
}
