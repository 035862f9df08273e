//! Append-only arena of published genetic codes.
//!
//! Provides `GcHandle` (a dense, total-orderable slot index) and `GcArena`
//! (contiguous storage with lookup by reference and by graph signature).
//!
//! # Determinism
//! - `GcHandle` ordering is by its inner `u32`, which is publication order.
//! - Iteration order over records is publication order.
//! - Records are never removed, so handles stay valid for the arena's life.

use crate::core::GcRef;
use crate::fingerprint::HashValue;
use crate::gc::GeneticCode;
use std::collections::HashMap;
use std::fmt;

/// Dense record identifier inside one arena.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GcHandle(u32);

impl GcHandle {
    /// Returns the raw `u32` index.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcHandle({})", self.0)
    }
}

/// Contiguous storage for published records.
#[derive(Debug, Clone, Default)]
pub struct GcArena {
    records: Vec<GeneticCode>,
    by_ref: HashMap<GcRef, GcHandle>,
    by_signature: HashMap<HashValue, Vec<GcHandle>>,
}

impl GcArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the arena holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record with this reference is stored.
    #[inline]
    pub fn contains(&self, reference: GcRef) -> bool {
        self.by_ref.contains_key(&reference)
    }

    /// Appends a record. Returns the record back if its reference is taken.
    pub fn push(&mut self, gc: GeneticCode) -> Result<GcHandle, GeneticCode> {
        if self.contains(gc.reference()) {
            return Err(gc);
        }
        let handle = GcHandle(self.records.len() as u32);
        self.by_ref.insert(gc.reference(), handle);
        self.by_signature.entry(gc.signature()).or_default().push(handle);
        self.records.push(gc);
        Ok(handle)
    }

    /// Record stored at `handle`.
    #[inline]
    pub fn get(&self, handle: GcHandle) -> Option<&GeneticCode> {
        self.records.get(handle.0 as usize)
    }

    /// Handle of the record with this reference.
    #[inline]
    pub fn handle_of(&self, reference: GcRef) -> Option<GcHandle> {
        self.by_ref.get(&reference).copied()
    }

    /// Record with this reference.
    pub fn get_by_ref(&self, reference: GcRef) -> Option<&GeneticCode> {
        self.handle_of(reference).and_then(|h| self.get(h))
    }

    /// Handles of records whose graph has this signature, in publication order.
    pub fn with_signature(&self, signature: &HashValue) -> &[GcHandle] {
        self.by_signature.get(signature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Handles of the stored ancestors of the record at `handle`.
    pub fn parents(&self, handle: GcHandle) -> Vec<GcHandle> {
        self.get(handle)
            .map(|gc| {
                [gc.ancestor_a(), gc.ancestor_b()]
                    .into_iter()
                    .flatten()
                    .filter_map(|r| self.handle_of(r))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates over all records in publication order.
    pub fn iter(&self) -> impl Iterator<Item = (GcHandle, &GeneticCode)> {
        self.records.iter().enumerate().map(|(idx, gc)| (GcHandle(idx as u32), gc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EpType;
    use crate::gc::Lineage;
    use crate::graph::GcGraph;

    fn codon(raw: i64, typ: u32) -> GeneticCode {
        let graph = GcGraph::leaf(&[EpType::new(typ)], &[0]).expect("legal leaf");
        GeneticCode::codon(GcRef::new(raw), graph)
    }

    #[test]
    fn arena_basic() {
        let mut arena = GcArena::new();
        assert!(arena.is_empty());
        let h1 = arena.push(codon(10, 1)).expect("fresh reference");
        assert_eq!(h1.as_u32(), 0);
        let h2 = arena.push(codon(11, 1)).expect("fresh reference");
        assert_eq!(h2.as_u32(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.handle_of(GcRef::new(11)), Some(h2));
        assert!(arena.push(codon(10, 2)).is_err());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn signature_index_groups_identical_graphs() {
        let mut arena = GcArena::new();
        let a = arena.push(codon(1, 1)).expect("fresh");
        let _ = arena.push(codon(2, 2)).expect("fresh");
        let c = arena.push(codon(3, 1)).expect("fresh");
        let sig = codon(99, 1).signature();
        assert_eq!(arena.with_signature(&sig), &[a, c]);
    }

    #[test]
    fn parents_follow_lineage() {
        let mut arena = GcArena::new();
        let a = arena.push(codon(1, 1)).expect("fresh");
        let child = GeneticCode::compose(
            GcRef::new(5),
            None,
            None,
            Lineage::of(GcRef::new(1), GcRef::new(404)),
            codon(0, 1).graph().clone(),
        );
        let h = arena.push(child).expect("fresh");
        // The unpublished ancestor is skipped.
        assert_eq!(arena.parents(h), vec![a]);
    }
}
