//! Endpoint-indexed graph representation.
//!
//! `InternalGraph` maps `(row, class, index)` keys to endpoints. Destination
//! references are authoritative: a destination names the source feeding it,
//! and every source's list of consumers is derived from those names by
//! [`InternalGraph::completed`].
//!
//! Row transforms (`moved`, `embedded`, `with_sources`, `connected`,
//! `without_row`) are pure. They return a new graph and leave their
//! operand untouched, so one target can be reused across trial insertions.
//!
//! # Invariants
//! - Iteration order is key order: row, then class, then index.
//! - After completion, every source's `refs` lists exactly the destinations
//!   naming it, in key order.

use crate::core::{Endpoint, EndpointClass, EndpointKey, EndpointRef, EpType, Row, RowSet};
use crate::interface::Interface;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Endpoint-indexed graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InternalGraph {
    endpoints: BTreeMap<EndpointKey, Endpoint>,
}

#[inline]
fn row_range(row: Row, class: EndpointClass) -> RangeInclusive<EndpointKey> {
    EndpointKey { row, class, index: 0 }..=EndpointKey { row, class, index: u16::MAX }
}

impl InternalGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self { endpoints: BTreeMap::new() }
    }

    /// Number of endpoints.
    #[inline]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the graph has no endpoints.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Looks up an endpoint.
    #[inline]
    pub fn get(&self, key: &EndpointKey) -> Option<&Endpoint> {
        self.endpoints.get(key)
    }

    /// All endpoints in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Adds or replaces an endpoint. Returns the endpoint it replaced.
    pub fn insert(&mut self, endpoint: Endpoint) -> Option<Endpoint> {
        self.endpoints.insert(endpoint.key(), endpoint)
    }

    /// Endpoints of one row and class, in index order.
    pub fn row(&self, row: Row, class: EndpointClass) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.range(row_range(row, class)).map(|(_, ep)| ep)
    }

    /// Number of endpoints in one row and class.
    pub fn row_len(&self, row: Row, class: EndpointClass) -> usize {
        self.row(row, class).count()
    }

    /// Types of one row and class, in index order.
    pub fn row_types(&self, row: Row, class: EndpointClass) -> Vec<EpType> {
        self.row(row, class).map(|ep| ep.typ).collect()
    }

    /// Rows holding at least one endpoint.
    pub fn rows(&self) -> RowSet {
        self.endpoints.keys().map(|key| key.row).collect()
    }

    /// Whether `row` holds at least one endpoint.
    pub fn has_row(&self, row: Row) -> bool {
        self.row(row, EndpointClass::Source).next().is_some()
            || self.row(row, EndpointClass::Destination).next().is_some()
    }

    /// Input types (row `I` sources) and output types (row `O` destinations).
    pub fn interface(&self) -> Interface {
        Interface::new(
            self.row_types(Row::I, EndpointClass::Source),
            self.row_types(Row::O, EndpointClass::Destination),
        )
    }

    /// Non-`U` destinations without a feeder, in key order.
    pub fn unconnected(&self) -> Vec<EndpointKey> {
        self.endpoints
            .values()
            .filter(|ep| ep.class == EndpointClass::Destination && ep.row != Row::U)
            .filter(|ep| !ep.is_connected())
            .map(Endpoint::key)
            .collect()
    }

    // ------------------------------------------------------------------
    // Pure transforms
    // ------------------------------------------------------------------

    /// Relabels every endpoint of row `from` as row `to`, and every reference
    /// to `from` as a reference to `to`.
    pub fn moved(&self, from: Row, to: Row) -> Self {
        let endpoints = self
            .endpoints
            .values()
            .map(|ep| {
                let mut ep = ep.clone();
                if ep.row == from {
                    ep.row = to;
                }
                for r in ep.refs.iter_mut().filter(|r| r.row == from) {
                    r.row = to;
                }
                (ep.key(), ep)
            })
            .collect();
        Self { endpoints }
    }

    /// Replaces row `row` with a substructure slot for a GC of interface
    /// `iface`: unconnected destinations typed by its inputs and sources typed
    /// by its outputs.
    ///
    /// References other rows hold into `row` are kept; completion drops any
    /// that no longer land on an endpoint of the same type.
    pub fn embedded(&self, row: Row, iface: &Interface) -> Self {
        let mut graph = self.clone();
        graph.remove_row(row);
        graph.add_destinations(row, &iface.inputs);
        graph.add_sources(row, &iface.outputs);
        graph
    }

    /// Adds unconnected sources to `row` after any it already has.
    pub fn with_sources(&self, row: Row, types: &[EpType]) -> Self {
        let mut graph = self.clone();
        graph.add_sources(row, types);
        graph
    }

    /// Adds unconnected destinations to `row` after any it already has.
    pub fn with_destinations(&self, row: Row, types: &[EpType]) -> Self {
        let mut graph = self.clone();
        graph.add_destinations(row, types);
        graph
    }

    /// Connects destination `dst` to source `src`, replacing any previous
    /// feeder. Returns the graph unchanged if either endpoint is missing or
    /// the types differ.
    pub fn connected(&self, dst: EndpointKey, src: EndpointRef) -> Self {
        let mut graph = self.clone();
        graph.connect(dst, src);
        graph
    }

    /// Copy with reference completion applied.
    pub fn completed(&self) -> Self {
        let mut graph = self.clone();
        graph.complete_references();
        graph
    }

    /// Copy without row `row`.
    pub fn without_row(&self, row: Row) -> Self {
        let mut graph = self.clone();
        graph.remove_row(row);
        graph
    }

    // ------------------------------------------------------------------
    // In-place primitives
    // ------------------------------------------------------------------

    pub(crate) fn add_sources(&mut self, row: Row, types: &[EpType]) {
        let start = self.row_len(row, EndpointClass::Source);
        for (offset, typ) in types.iter().enumerate() {
            let index = (start + offset) as u16;
            self.insert(Endpoint::source(row, index, *typ));
        }
    }

    pub(crate) fn add_destinations(&mut self, row: Row, types: &[EpType]) {
        let start = self.row_len(row, EndpointClass::Destination);
        for (offset, typ) in types.iter().enumerate() {
            let index = (start + offset) as u16;
            self.insert(Endpoint::destination(row, index, *typ));
        }
    }

    pub(crate) fn remove_row(&mut self, row: Row) {
        self.endpoints.retain(|key, _| key.row != row);
    }

    /// Connects `dst` to `src`, keeping both sides consistent.
    ///
    /// Returns `false` (and changes nothing) if `dst` is not a destination,
    /// either endpoint is missing, or the types differ.
    pub(crate) fn connect(&mut self, dst: EndpointKey, src: EndpointRef) -> bool {
        let src_key = src.key_from(EndpointClass::Destination);
        let (Some(d), Some(s)) = (self.endpoints.get(&dst), self.endpoints.get(&src_key)) else {
            return false;
        };
        if dst.class != EndpointClass::Destination || d.typ != s.typ {
            return false;
        }
        let dst_ref = EndpointRef::new(dst.row, dst.index);
        if let Some(old) = d.feeder() {
            if let Some(prev) = self.endpoints.get_mut(&old.key_from(EndpointClass::Destination)) {
                prev.refs.retain(|r| *r != dst_ref);
            }
        }
        if let Some(d) = self.endpoints.get_mut(&dst) {
            d.refs = vec![src];
        }
        if let Some(s) = self.endpoints.get_mut(&src_key) {
            if !s.refs.contains(&dst_ref) {
                s.refs.push(dst_ref);
            }
        }
        true
    }

    /// Makes every connection two-sided.
    ///
    /// Destination feeders that point at a missing source, or at a source of
    /// a different type, are dropped; destinations keep at most one feeder.
    /// Source consumer lists are then rebuilt from the surviving feeders.
    pub(crate) fn complete_references(&mut self) {
        let feeders: Vec<(EndpointKey, Option<EndpointRef>)> = self
            .endpoints
            .values()
            .filter(|ep| ep.class == EndpointClass::Destination)
            .map(|ep| {
                let keep = ep.feeder().filter(|src| {
                    self.endpoints
                        .get(&src.key_from(EndpointClass::Destination))
                        .is_some_and(|s| s.typ == ep.typ)
                });
                (ep.key(), keep)
            })
            .collect();
        for ep in self.endpoints.values_mut() {
            if ep.class == EndpointClass::Source {
                ep.refs.clear();
            }
        }
        for (dst, keep) in feeders {
            if let Some(d) = self.endpoints.get_mut(&dst) {
                d.refs = keep.into_iter().collect();
            }
            if let Some(src) = keep {
                if let Some(s) = self.endpoints.get_mut(&src.key_from(EndpointClass::Destination)) {
                    s.refs.push(EndpointRef::new(dst.row, dst.index));
                }
            }
        }
    }

    /// Adds a row `U` destination for every source no other destination
    /// names, in key order. Any existing row `U` is rebuilt.
    pub(crate) fn collect_unused(&mut self) {
        self.remove_row(Row::U);
        let used: BTreeSet<EndpointKey> = self
            .endpoints
            .values()
            .filter_map(Endpoint::feeder)
            .map(|src| src.key_from(EndpointClass::Destination))
            .collect();
        let unused: Vec<(EndpointRef, EpType)> = self
            .endpoints
            .values()
            .filter(|ep| ep.class == EndpointClass::Source && !used.contains(&ep.key()))
            .map(|ep| (ep.to_ref(), ep.typ))
            .collect();
        for (index, (src, typ)) in unused.into_iter().enumerate() {
            self.insert(Endpoint::connected(Row::U, index as u16, typ, src));
        }
        self.complete_references();
    }
}

impl FromIterator<Endpoint> for InternalGraph {
    fn from_iter<T: IntoIterator<Item = Endpoint>>(iter: T) -> Self {
        let mut graph = InternalGraph::new();
        for ep in iter {
            graph.insert(ep);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: u32) -> EpType {
        EpType::new(raw)
    }

    /// `I(t1, t2) -> A(t1 -> t3) -> O(t3)`.
    fn chain() -> InternalGraph {
        InternalGraph::new()
            .with_sources(Row::I, &[t(1), t(2)])
            .embedded(Row::A, &Interface::new(vec![t(1)], vec![t(3)]))
            .with_destinations(Row::O, &[t(3)])
            .connected(EndpointKey::destination(Row::A, 0), EndpointRef::new(Row::I, 0))
            .connected(EndpointKey::destination(Row::O, 0), EndpointRef::new(Row::A, 0))
    }

    #[test]
    fn row_queries() {
        let g = chain();
        assert_eq!(g.len(), 5);
        assert_eq!(g.rows(), RowSet::of(&[Row::I, Row::A, Row::O]));
        assert_eq!(g.row_types(Row::I, EndpointClass::Source), vec![t(1), t(2)]);
        assert_eq!(g.interface(), Interface::new(vec![t(1), t(2)], vec![t(3)]));
        assert!(g.unconnected().is_empty());
    }

    #[test]
    fn transforms_leave_the_operand_untouched() {
        let g = chain();
        let before = g.clone();
        let _ = g.moved(Row::A, Row::B);
        let _ = g.embedded(Row::A, &Interface::new(vec![t(2)], vec![t(3)]));
        let _ = g.without_row(Row::O);
        let _ = g.connected(EndpointKey::destination(Row::A, 0), EndpointRef::new(Row::I, 1));
        let _ = g.with_sources(Row::I, &[t(4)]);
        assert_eq!(g, before);
    }

    #[test]
    fn moving_a_row_rewrites_references() {
        let g = chain().moved(Row::A, Row::B);
        assert!(!g.has_row(Row::A));
        let out = g.get(&EndpointKey::destination(Row::O, 0)).map(|ep| ep.feeder());
        assert_eq!(out, Some(Some(EndpointRef::new(Row::B, 0))));
        let src = g.get(&EndpointKey::source(Row::B, 0)).map(|ep| ep.refs.clone());
        assert_eq!(src, Some(vec![EndpointRef::new(Row::O, 0)]));
    }

    #[test]
    fn connect_rejects_type_mismatch_and_moves_consumers() {
        let g = chain();
        let same = g.connected(EndpointKey::destination(Row::A, 0), EndpointRef::new(Row::I, 1));
        assert_eq!(same, g);

        let g = InternalGraph::new()
            .with_sources(Row::I, &[t(1), t(1)])
            .with_destinations(Row::O, &[t(1)])
            .connected(EndpointKey::destination(Row::O, 0), EndpointRef::new(Row::I, 0))
            .connected(EndpointKey::destination(Row::O, 0), EndpointRef::new(Row::I, 1));
        assert!(g.get(&EndpointKey::source(Row::I, 0)).is_some_and(|ep| ep.refs.is_empty()));
        assert!(g.get(&EndpointKey::source(Row::I, 1)).is_some_and(|ep| ep.is_connected()));
    }

    #[test]
    fn completion_drops_dangling_and_mistyped_feeders() {
        let g = chain()
            .embedded(Row::A, &Interface::new(vec![t(1)], vec![t(4)]))
            .completed();
        // O0 pointed at a t3 source that is now t4.
        assert_eq!(g.unconnected(), vec![
            EndpointKey::destination(Row::A, 0),
            EndpointKey::destination(Row::O, 0),
        ]);
        assert!(g.row(Row::I, EndpointClass::Source).all(|ep| ep.refs.is_empty()));
    }

    #[test]
    fn unused_sources_are_collected_in_key_order() {
        let mut g = chain();
        g.collect_unused();
        let unused: Vec<_> = g
            .row(Row::U, EndpointClass::Destination)
            .map(|ep| ep.feeder())
            .collect();
        assert_eq!(unused, vec![Some(EndpointRef::new(Row::I, 1))]);
        let again = {
            let mut h = g.clone();
            h.collect_unused();
            h
        };
        assert_eq!(again, g);
    }
}
