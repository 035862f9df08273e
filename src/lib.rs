//! gcsplice: insertion and steady-state stabilization of genetic-code graphs.
//!
//! A genetic code (GC) is a typed dataflow graph arranged in rows. Inputs
//! enter at row `I`, constants live in row `C`, up to two sub-GCs occupy rows
//! `A` and `B`, and results leave through row `O` (or `P` when a condition in
//! row `F` selects between two output sets). This crate provides:
//! - Graph storage with pure row transforms, normalization and validation.
//! - The twelve insertion cases that splice one GC into another while keeping
//!   the target's interface.
//! - Steady-state resolution: when an insertion leaves destinations open, a
//!   material source is queried for a GC that can feed them, and the repair is
//!   applied recursively until every record is stable.
//!
//! # Example
//!
//! ```
//! use gcsplice::prelude::*;
//!
//! let source = InMemorySource::new();
//! let t = EpType::new(1);
//! let target = GeneticCode::codon(source.next_reference(), GcGraph::leaf(&[t], &[0]).unwrap());
//! let insert = GeneticCode::codon(source.next_reference(), GcGraph::leaf(&[t], &[0]).unwrap());
//!
//! let out = insert_gc(&source, target.clone(), insert.clone(), InsertionRow::I).unwrap();
//! assert!(out.gc.is_stable());
//! assert_eq!(out.gc.interface(), target.interface());
//! assert_eq!(out.gc.gca(), Some(insert.reference()));
//! ```

pub mod arena;
pub mod config;
pub mod core;
pub mod error;
pub mod fingerprint;
pub mod gc;
pub mod graph;
pub mod insertion;
pub mod interface;
pub mod query;
pub mod resolver;
pub mod rules;
pub mod source;
pub mod stabilize;
pub mod trace;

pub use crate::core::{EpType, GcRef, Row, RowSet};
pub use crate::error::{ConfigurationError, PublishError, ResolutionFailed, StabilizeError, ValidationFailed};
pub use crate::gc::GeneticCode;
pub use crate::graph::GcGraph;
pub use crate::stabilize::{Stabilized, Stabilizer};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::arena::{GcArena, GcHandle};
    pub use crate::config::{SourceConfig, StabilizerConfig};
    pub use crate::core::{EndpointClass, EndpointKey, EndpointRef, EpType, GcRef, Row, RowSet};
    pub use crate::error::{
        ConfigurationError, GraphIssue, PublishError, ResolutionFailed, StabilizeError, ValidationFailed,
    };
    pub use crate::fingerprint::HashValue;
    pub use crate::gc::{GeneticCode, Lineage};
    pub use crate::graph::{AppGraph, GcGraph, InternalGraph};
    pub use crate::insertion::{InsertCase, InsertionRow};
    pub use crate::interface::Interface;
    pub use crate::query::{MatchTier, Query};
    pub use crate::source::{InMemorySource, MaterialSource};
    pub use crate::stabilize::{insert as insert_gc, stabilize, Stabilized, Stabilizer};
    pub use crate::trace::{StabilizationTrace, TraceStep};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    fn t(raw: u32) -> EpType {
        EpType::new(raw)
    }

    #[test]
    fn prelude_covers_a_full_pass() {
        let source = InMemorySource::new();
        let constant = GeneticCode::codon(
            source.next_reference(),
            GcGraph::constant(&[("42", t(2))]).expect("legal constant"),
        );
        source.publish(vec![constant]).expect("publish");

        let open = InternalGraph::new()
            .with_sources(Row::I, &[t(1)])
            .with_destinations(Row::O, &[t(2)]);
        let target = GeneticCode::codon(source.next_reference(), GcGraph::new(open).expect("legal"));

        let mut stabilizer =
            Stabilizer::with_config(&source, StabilizerConfig::seeded(3)).expect("valid config");
        let out = stabilizer.stabilize(target.clone()).expect("stabilizes");
        let gc = out.publish_to(&source).expect("publish");
        assert!(gc.is_stable());
        assert_eq!(gc.interface(), target.interface());
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn stable_input_needs_no_material() {
        let source = InMemorySource::new();
        let gc = GeneticCode::codon(source.next_reference(), GcGraph::leaf(&[t(4), t(5)], &[1, 0]).expect("legal"));
        let out = stabilize(&source, gc.clone()).expect("stable");
        assert_eq!(out.gc, gc);
        assert_eq!(source.metrics().queries, 0);
    }
}
