//! Validated GC graph: the internal graph plus the structural rules.

use crate::core::{Endpoint, EndpointClass, EndpointKey, EndpointRef, EpType, Row, RowSet};
use crate::error::{ConfigurationError, GraphIssue, ValidationFailed};
use crate::fingerprint::{graph_fingerprint, HashValue};
use crate::graph::{AppGraph, InternalGraph};
use crate::interface::Interface;
use crate::rules;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

/// A GC graph whose rows form a legal structure.
///
/// Construction checks the row set and endpoint placement only. Connection
/// defects are reported by [`GcGraph::validate`], and missing connections by
/// [`GcGraph::is_stable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GcGraph {
    graph: InternalGraph,
}

impl GcGraph {
    /// Wraps an internal graph, checking its row set and endpoint placement.
    ///
    /// Row `U` is rebuilt from the sources nothing else consumes, so a graph
    /// with every destination connected comes back stable and unchanged by
    /// [`GcGraph::normalize`].
    pub fn new(graph: InternalGraph) -> Result<Self, ConfigurationError> {
        let rows = graph.rows();
        if !rules::is_legal(rows) {
            return Err(ConfigurationError::IllegalRowSet(rows));
        }
        if let Some(ep) = graph.iter().find(|ep| !rules::allows(ep.row, ep.class)) {
            return Err(ConfigurationError::IllegalEndpoint { row: ep.row, class: ep.class });
        }
        let mut graph = graph.without_row(Row::U);
        graph.collect_unused();
        Ok(Self { graph })
    }

    /// Wraps a graph produced by the insertion algebra; checked by validation.
    pub(crate) fn from_internal_unchecked(graph: InternalGraph) -> Self {
        Self { graph }
    }

    /// Rebuilds a graph from its application view.
    pub fn from_app(app: &AppGraph) -> Result<Self, ConfigurationError> {
        Self::new(app.to_internal())
    }

    /// A codon: inputs typed `inputs`, output `k` wired to input `wiring[k]`.
    pub fn leaf(inputs: &[EpType], wiring: &[u16]) -> Result<Self, ConfigurationError> {
        let mut graph = InternalGraph::new().with_sources(Row::I, inputs);
        for (k, &from) in wiring.iter().enumerate() {
            let typ = inputs.get(from as usize).copied().ok_or_else(|| {
                ConfigurationError::InvalidConfig(format!(
                    "output {k} wired to input {from} of {}",
                    inputs.len()
                ))
            })?;
            graph.insert(Endpoint::connected(Row::O, k as u16, typ, EndpointRef::new(Row::I, from)));
        }
        graph.collect_unused();
        Self::new(graph)
    }

    /// A codon producing constants: output `k` is `constants[k]`.
    pub fn constant(constants: &[(&str, EpType)]) -> Result<Self, ConfigurationError> {
        let mut graph = InternalGraph::new();
        for (k, (literal, typ)) in constants.iter().enumerate() {
            graph.insert(Endpoint::constant(k as u16, *typ, *literal));
            graph.insert(Endpoint::connected(Row::O, k as u16, *typ, EndpointRef::new(Row::C, k as u16)));
        }
        Self::new(graph)
    }

    /// Graph wrapping a GC of interface `iface` in row `A`, inputs passed
    /// straight through and outputs exposed.
    pub fn wrapping(iface: &Interface) -> Self {
        let mut graph = InternalGraph::new()
            .with_sources(Row::I, &iface.inputs)
            .embedded(Row::A, iface)
            .with_destinations(Row::O, &iface.outputs);
        for k in 0..iface.inputs.len() as u16 {
            graph.connect(EndpointKey::destination(Row::A, k), EndpointRef::new(Row::I, k));
        }
        for k in 0..iface.outputs.len() as u16 {
            graph.connect(EndpointKey::destination(Row::O, k), EndpointRef::new(Row::A, k));
        }
        graph.collect_unused();
        Self { graph }
    }

    /// The underlying endpoint graph.
    #[inline]
    pub fn internal(&self) -> &InternalGraph {
        &self.graph
    }

    /// Consumes the wrapper.
    pub fn into_internal(self) -> InternalGraph {
        self.graph
    }

    /// Rows present.
    pub fn rows(&self) -> RowSet {
        self.graph.rows()
    }

    /// Whether `row` is present.
    pub fn has_row(&self, row: Row) -> bool {
        self.graph.has_row(row)
    }

    /// Input and output types.
    pub fn interface(&self) -> Interface {
        self.graph.interface()
    }

    /// Non-`U` destinations without a feeder.
    pub fn unconnected(&self) -> Vec<EndpointKey> {
        self.graph.unconnected()
    }

    /// Whether every non-`U` destination has a feeder.
    pub fn is_stable(&self) -> bool {
        self.unconnected().is_empty()
    }

    /// Structural fingerprint.
    pub fn fingerprint(&self) -> HashValue {
        graph_fingerprint(&self.graph)
    }

    /// Application view. Requires every destination to be connected.
    pub fn app_view(&self) -> Result<AppGraph, ValidationFailed> {
        AppGraph::from_internal(&self.graph)
    }

    /// Connects what can be connected and accounts for unused sources.
    ///
    /// 1. Row `U` is discarded.
    /// 2. Each unconnected destination, in key order, takes a uniformly random
    ///    source of identical type from a row it can see. Destinations with no
    ///    such source stay unconnected.
    /// 3. Every source nothing consumes gets one row `U` destination.
    ///
    /// Returns whether the graph is stable afterwards. Normalizing a stable
    /// graph leaves it unchanged.
    pub fn normalize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let mut graph = self.graph.without_row(Row::U);
        let has_f = graph.has_row(Row::F);
        for key in graph.unconnected() {
            let Some(typ) = graph.get(&key).map(|ep| ep.typ) else {
                continue;
            };
            let candidates: Vec<EndpointRef> = rules::visible_sources(key.row, has_f)
                .iter()
                .flat_map(|row| graph.row(*row, EndpointClass::Source))
                .filter(|src| src.typ == typ)
                .map(Endpoint::to_ref)
                .collect();
            if let Some(src) = candidates.choose(rng) {
                trace!(dst = %key, src = %src, "normalize connected");
                graph.connect(key, *src);
            }
        }
        graph.collect_unused();
        self.graph = graph;
        self.is_stable()
    }

    /// Every structural defect, in a deterministic order.
    pub fn issues(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();
        let g = &self.graph;
        let rows = g.rows();
        let has_f = rows.contains(Row::F);

        if !rules::is_legal(rows) {
            issues.push(GraphIssue::IllegalRowSet(rows));
        }

        for row in Row::ALL {
            for class in [EndpointClass::Source, EndpointClass::Destination] {
                let contiguous = g.row(row, class).enumerate().all(|(i, ep)| ep.index as usize == i);
                if !contiguous {
                    issues.push(GraphIssue::NonContiguous { row, class });
                }
            }
        }

        for ep in g.iter() {
            let key = ep.key();
            if !rules::allows(ep.row, ep.class) {
                issues.push(GraphIssue::IllegalEndpoint(key));
            }
            if ep.literal.is_some() != (ep.row == Row::C) {
                issues.push(GraphIssue::Literal(key));
            }
            match ep.class {
                EndpointClass::Destination => check_destination(g, ep, has_f, &mut issues),
                EndpointClass::Source => check_source(g, ep, &mut issues),
            }
        }

        if has_f {
            let o = g.row_types(Row::O, EndpointClass::Destination);
            let p = g.row_types(Row::P, EndpointClass::Destination);
            if o != p {
                issues.push(GraphIssue::OutputMirror);
            }
        }
        issues
    }

    /// Checks every structural invariant. Unconnected destinations are not a
    /// defect; they make the graph unstable.
    pub fn validate(&self) -> Result<(), ValidationFailed> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailed { issues })
        }
    }
}

fn check_destination(g: &InternalGraph, ep: &Endpoint, has_f: bool, issues: &mut Vec<GraphIssue>) {
    let key = ep.key();
    if ep.refs.len() > 1 {
        issues.push(GraphIssue::MultipleFeeders(key));
    }
    let Some(src) = ep.feeder() else {
        return;
    };
    let src_key = src.key_from(EndpointClass::Destination);
    let Some(peer) = g.get(&src_key) else {
        issues.push(GraphIssue::DanglingReference { from: key, to: src_key });
        return;
    };
    if peer.typ != ep.typ {
        issues.push(GraphIssue::TypeMismatch { dst: key, dst_type: ep.typ, src_type: peer.typ });
    }
    if !rules::can_feed(src.row, ep.row, has_f) {
        issues.push(GraphIssue::InvisibleSource { dst: key, src_row: src.row });
    }
    if !peer.refs.contains(&ep.to_ref()) {
        issues.push(GraphIssue::OneSidedConnection(key));
    }
}

fn check_source(g: &InternalGraph, ep: &Endpoint, issues: &mut Vec<GraphIssue>) {
    let key = ep.key();
    if ep.refs.is_empty() {
        issues.push(GraphIssue::Unreferenced(key));
    }
    for r in &ep.refs {
        let dst_key = r.key_from(EndpointClass::Source);
        match g.get(&dst_key) {
            None => issues.push(GraphIssue::DanglingReference { from: key, to: dst_key }),
            Some(dst) if dst.feeder() != Some(ep.to_ref()) => {
                issues.push(GraphIssue::OneSidedConnection(key))
            }
            Some(_) => {}
        }
    }
}
