//! Genetic-code records.
//!
//! A record pairs a graph with its identity (`reference`), the references of
//! the GCs occupying its rows `A` and `B`, and its lineage (the two GCs it was
//! created from).

use crate::core::GcRef;
use crate::fingerprint::HashValue;
use crate::graph::GcGraph;
use crate::interface::Interface;

/// The two GCs a record was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Lineage {
    /// First ancestor.
    pub a: Option<GcRef>,
    /// Second ancestor.
    pub b: Option<GcRef>,
}

impl Lineage {
    /// Lineage of a record produced by inserting `insert` into `target`.
    pub fn of(target: GcRef, insert: GcRef) -> Self {
        Self { a: Some(target), b: Some(insert) }
    }

    /// Lineage carried over from a record being superseded.
    pub fn inherited(from: &GeneticCode) -> Self {
        Self { a: from.ancestor_a, b: from.ancestor_b }
    }
}

/// A genetic code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneticCode {
    reference: GcRef,
    gca: Option<GcRef>,
    gcb: Option<GcRef>,
    ancestor_a: Option<GcRef>,
    ancestor_b: Option<GcRef>,
    graph: GcGraph,
}

impl GeneticCode {
    /// A codon: a record with no substructure and no lineage.
    pub fn codon(reference: GcRef, graph: GcGraph) -> Self {
        Self { reference, gca: None, gcb: None, ancestor_a: None, ancestor_b: None, graph }
    }

    /// A record with every field given.
    pub fn compose(
        reference: GcRef,
        gca: Option<GcRef>,
        gcb: Option<GcRef>,
        lineage: Lineage,
        graph: GcGraph,
    ) -> Self {
        Self { reference, gca, gcb, ancestor_a: lineage.a, ancestor_b: lineage.b, graph }
    }

    /// A fresh record wrapping `candidate` in row `A`.
    ///
    /// The embryo has the candidate's interface, so it can be inserted in the
    /// candidate's place while keeping the candidate itself untouched.
    pub fn embryo(reference: GcRef, candidate: &GeneticCode) -> Self {
        let lineage = Lineage { a: Some(candidate.reference), b: None };
        let graph = GcGraph::wrapping(&candidate.interface());
        Self::compose(reference, Some(candidate.reference), None, lineage, graph)
    }

    /// Copy of this record under a new reference.
    pub fn derive(&self, reference: GcRef) -> Self {
        Self { reference, ..self.clone() }
    }

    /// Identity.
    #[inline]
    pub fn reference(&self) -> GcRef {
        self.reference
    }

    /// GC occupying row `A`.
    #[inline]
    pub fn gca(&self) -> Option<GcRef> {
        self.gca
    }

    /// GC occupying row `B`.
    #[inline]
    pub fn gcb(&self) -> Option<GcRef> {
        self.gcb
    }

    /// First ancestor.
    #[inline]
    pub fn ancestor_a(&self) -> Option<GcRef> {
        self.ancestor_a
    }

    /// Second ancestor.
    #[inline]
    pub fn ancestor_b(&self) -> Option<GcRef> {
        self.ancestor_b
    }

    /// Both ancestors.
    pub fn lineage(&self) -> Lineage {
        Lineage::inherited(self)
    }

    /// The graph.
    #[inline]
    pub fn graph(&self) -> &GcGraph {
        &self.graph
    }

    /// Input and output types.
    pub fn interface(&self) -> Interface {
        self.graph.interface()
    }

    /// Whether the record has no substructure.
    pub fn is_codon(&self) -> bool {
        self.gca.is_none() && self.gcb.is_none()
    }

    /// Whether the graph is stable.
    pub fn is_stable(&self) -> bool {
        self.graph.is_stable()
    }

    /// Fingerprint of the graph.
    pub fn signature(&self) -> HashValue {
        self.graph.fingerprint()
    }

    /// Substructure and lineage references, present ones only.
    pub fn references(&self) -> impl Iterator<Item = GcRef> {
        [self.gca, self.gcb, self.ancestor_a, self.ancestor_b].into_iter().flatten()
    }

    /// Replaces every substructure and lineage occurrence of `old` by `new`.
    /// Returns whether anything changed.
    pub(crate) fn rewrite_reference(&mut self, old: GcRef, new: GcRef) -> bool {
        let mut changed = false;
        for slot in [&mut self.gca, &mut self.gcb, &mut self.ancestor_a, &mut self.ancestor_b] {
            if *slot == Some(old) {
                *slot = Some(new);
                changed = true;
            }
        }
        changed
    }
}
