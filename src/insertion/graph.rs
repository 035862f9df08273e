//! Graph-level insertion.
//!
//! Every case builds its output from pure transforms of the target graph,
//! then wires the new rows with two helpers:
//! - `align`: destination `k` takes source `k` of another row when both exist
//!   with the same type and the destination is still open.
//! - `splice`: each destination takes the first not-yet-spliced source of the
//!   same type from a range of another row, replacing any earlier feeder.
//!
//! Whatever stays open afterwards is left to normalization. Each produced
//! graph is then validated, and the result must keep the target's interface.

use super::{FormPlan, InsertCase, InsertionRow};
use crate::core::{EndpointClass, EndpointKey, EndpointRef, Row};
use crate::error::{GraphIssue, StabilizeError, ValidationFailed};
use crate::graph::{GcGraph, InternalGraph};
use crate::interface::Interface;
use rand::Rng;
use std::collections::BTreeSet;
use tracing::trace;

/// Graphs produced by one insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOutcome {
    /// Rewritten target. Same interface as the target.
    pub result: GcGraph,
    /// Formed GC, for cases 4 to 10.
    pub formed: Option<GcGraph>,
}

/// Inserts `insert` into `target` according to `case`.
///
/// Both produced graphs are normalized and validated. Unconnected
/// destinations may remain; they are left to the resolver.
pub fn insert_graph<R: Rng + ?Sized>(
    case: InsertCase,
    row: InsertionRow,
    target: &GcGraph,
    insert: &GcGraph,
    rng: &mut R,
) -> Result<GraphOutcome, StabilizeError> {
    let t = target.internal().without_row(Row::U);
    let t_iface = target.interface();
    let n = insert.interface();
    let has_f = t.has_row(Row::F);

    let (result, formed) = match case.plan() {
        Some(plan) => {
            let (result, formed) = form(&t, &n, plan);
            (result, Some(formed))
        }
        None => {
            let result = match case {
                InsertCase::Stack => stack(&t_iface, &n),
                InsertCase::StackBelow => stack_below(&t_iface, &n),
                InsertCase::FillA => fill_a(&t, &n),
                InsertCase::DisplaceA => displace_a(&t, &n),
                _ => fill_b(&t, &n, row, has_f),
            };
            (result, None)
        }
    };

    let result = finish(result, rng)?;
    let formed = formed.map(|f| finish(f, rng)).transpose()?;
    let outcome = GraphOutcome { result, formed };
    check_outcome(case, &t_iface, &n, &outcome)?;
    Ok(outcome)
}

fn finish<R: Rng + ?Sized>(graph: InternalGraph, rng: &mut R) -> Result<GcGraph, ValidationFailed> {
    let mut graph = GcGraph::from_internal_unchecked(graph.completed());
    let stable = graph.normalize(rng);
    trace!(rows = %graph.rows(), stable, "insertion graph normalized");
    graph.validate()?;
    Ok(graph)
}

fn check_outcome(
    case: InsertCase,
    target: &Interface,
    insert: &Interface,
    outcome: &GraphOutcome,
) -> Result<(), ValidationFailed> {
    let found = outcome.result.interface();
    if found != *target {
        return Err(ValidationFailed::single(GraphIssue::InterfaceChanged {
            expected: target.clone(),
            found,
        }));
    }
    let (graph, row) = match (case.plan(), &outcome.formed) {
        (Some(plan), Some(formed)) => (formed, plan.insert_slot()),
        (None, None) => (&outcome.result, insert_row(case)),
        _ => return Err(ValidationFailed::single(GraphIssue::MissingInsert(Row::A))),
    };
    let g = graph.internal();
    let present = Interface::new(
        g.row_types(row, EndpointClass::Destination),
        g.row_types(row, EndpointClass::Source),
    );
    if present != *insert {
        return Err(ValidationFailed::single(GraphIssue::MissingInsert(row)));
    }
    Ok(())
}

/// Result row holding the insert for the non-forming cases.
fn insert_row(case: InsertCase) -> Row {
    match case {
        InsertCase::StackBelow | InsertCase::FillB => Row::B,
        _ => Row::A,
    }
}

// ----------------------------------------------------------------------
// Wiring helpers
// ----------------------------------------------------------------------

/// `dst[k] <- src[k]` for each open destination with a same-typed peer.
fn align(g: &mut InternalGraph, dst: Row, src: Row) {
    let open: Vec<EndpointKey> = g
        .row(dst, EndpointClass::Destination)
        .filter(|ep| !ep.is_connected())
        .map(|ep| ep.key())
        .collect();
    for key in open {
        g.connect(key, EndpointRef::new(src, key.index));
    }
}

/// Splices `dst` from sources `src[from..]`, each source used at most once.
fn splice(g: &mut InternalGraph, dst: Row, src: Row, from: u16) {
    let dsts: Vec<EndpointKey> = g.row(dst, EndpointClass::Destination).map(|ep| ep.key()).collect();
    let mut taken = BTreeSet::new();
    for key in dsts {
        let Some(typ) = g.get(&key).map(|ep| ep.typ) else {
            continue;
        };
        let pick = g
            .row(src, EndpointClass::Source)
            .find(|ep| ep.index >= from && ep.typ == typ && !taken.contains(&ep.index))
            .map(|ep| ep.to_ref());
        if let Some(r) = pick {
            taken.insert(r.index);
            g.connect(key, r);
        }
    }
}

/// `dst[k] <- src[from + k]` for every destination of `dst`.
fn feed(g: &mut InternalGraph, dst: Row, src: Row, from: u16) {
    let count = g.row_len(dst, EndpointClass::Destination) as u16;
    for k in 0..count {
        g.connect(EndpointKey::destination(dst, k), EndpointRef::new(src, from + k));
    }
}

/// `dst[at + k] <- src[k]` for every source of `src`.
fn link_row(g: &mut InternalGraph, dst: Row, at: u16, src: Row) {
    let count = g.row_len(src, EndpointClass::Source) as u16;
    for k in 0..count {
        g.connect(EndpointKey::destination(dst, at + k), EndpointRef::new(src, k));
    }
}

// ----------------------------------------------------------------------
// Cases 0, 11: stacking
// ----------------------------------------------------------------------

fn stack(t: &Interface, n: &Interface) -> InternalGraph {
    let mut g = InternalGraph::new()
        .with_sources(Row::I, &t.inputs)
        .embedded(Row::A, n)
        .embedded(Row::B, t)
        .with_destinations(Row::O, &t.outputs);
    align(&mut g, Row::A, Row::I);
    splice(&mut g, Row::B, Row::A, 0);
    align(&mut g, Row::B, Row::I);
    align(&mut g, Row::O, Row::B);
    g
}

fn stack_below(t: &Interface, n: &Interface) -> InternalGraph {
    let mut g = InternalGraph::new()
        .with_sources(Row::I, &t.inputs)
        .embedded(Row::A, t)
        .embedded(Row::B, n)
        .with_destinations(Row::O, &t.outputs);
    align(&mut g, Row::A, Row::I);
    splice(&mut g, Row::B, Row::A, 0);
    splice(&mut g, Row::O, Row::B, 0);
    align(&mut g, Row::O, Row::A);
    g
}

// ----------------------------------------------------------------------
// Cases 1, 2, 3: filling an empty substructure row
// ----------------------------------------------------------------------

fn fill_a(t: &InternalGraph, n: &Interface) -> InternalGraph {
    let mut g = t.embedded(Row::A, n);
    align(&mut g, Row::A, Row::I);
    g
}

fn displace_a(t: &InternalGraph, n: &Interface) -> InternalGraph {
    let mut g = t.moved(Row::A, Row::B).embedded(Row::A, n);
    align(&mut g, Row::A, Row::I);
    splice(&mut g, Row::B, Row::A, 0);
    g
}

fn fill_b(t: &InternalGraph, n: &Interface, row: InsertionRow, has_f: bool) -> InternalGraph {
    let mut g = t.embedded(Row::B, n);
    if has_f {
        align(&mut g, Row::B, Row::I);
    } else {
        splice(&mut g, Row::B, Row::A, 0);
    }
    let downstream = match (row, has_f) {
        (InsertionRow::O, _) | (InsertionRow::P, false) => Some(Row::O),
        (InsertionRow::P, true) => Some(Row::P),
        _ => None,
    };
    if let Some(d) = downstream {
        splice(&mut g, d, Row::B, 0);
    }
    g
}

// ----------------------------------------------------------------------
// Cases 4 to 10: forming
// ----------------------------------------------------------------------

/// Builds `(result, formed)`.
///
/// The formed GC merges the prior row and the insert. Its inputs are the
/// prior row's inputs followed by the insert's, and its outputs the prior
/// row's outputs followed by the insert's, so its interface depends on those
/// two rows alone. In the result the replaced row becomes the formed GC: the
/// prior share of its destinations keeps the prior feeders, existing
/// consumers of the prior outputs keep their indices, and the insert's share
/// is left to normalization.
fn form(t: &InternalGraph, n: &Interface, plan: FormPlan) -> (InternalGraph, InternalGraph) {
    let replaced = plan.replaced;
    let prior = Interface::new(
        t.row_types(replaced, EndpointClass::Destination),
        t.row_types(replaced, EndpointClass::Source),
    );
    let p_in = prior.inputs.len() as u16;
    let p_out = prior.outputs.len() as u16;
    let mut f_inputs = prior.inputs.clone();
    f_inputs.extend_from_slice(&n.inputs);
    let mut f_outputs = prior.outputs.clone();
    f_outputs.extend_from_slice(&n.outputs);

    // Formed GC.
    let prior_slot = plan.prior_slot();
    let insert_slot = plan.insert_slot();
    let mut f = InternalGraph::new()
        .with_sources(Row::I, &f_inputs)
        .embedded(prior_slot, &prior)
        .embedded(insert_slot, n)
        .with_destinations(Row::O, &f_outputs);
    feed(&mut f, prior_slot, Row::I, 0);
    feed(&mut f, insert_slot, Row::I, p_in);
    link_row(&mut f, Row::O, 0, prior_slot);
    link_row(&mut f, Row::O, p_out, insert_slot);
    splice(&mut f, Row::B, Row::A, 0);

    // Result.
    let f_iface = Interface::new(f_inputs, f_outputs);
    let mut r = t.embedded(replaced, &f_iface).completed();
    for k in 0..p_in {
        let key = EndpointKey::destination(replaced, k);
        if let Some(src) = t.get(&key).and_then(|ep| ep.feeder()) {
            r.connect(key, src);
        }
    }
    if let Some(d) = plan.downstream {
        splice(&mut r, d, replaced, p_out);
    }
    (r, f)
}
