//! Steady-state resolution: picking a GC that can feed open destinations.
//!
//! For an unstable graph the resolver selects the lowest row (in row order)
//! holding an unconnected destination, and asks the material source for a GC
//! that produces the types of that row's open destinations while consuming
//! only types visible to that row. One candidate is drawn uniformly at random
//! from the answering tier.

use crate::core::{EndpointClass, GcRef, Row};
use crate::error::{ResolutionFailed, StabilizeError};
use crate::gc::GeneticCode;
use crate::graph::GcGraph;
use crate::insertion::InsertionRow;
use crate::query::Query;
use crate::rules;
use crate::source::MaterialSource;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Row the candidate is inserted above.
    pub row: InsertionRow,
    /// Query the candidate answered.
    pub query: Query,
    /// Chosen candidate.
    pub candidate: GeneticCode,
}

/// Row to repair and the query for it, or `None` for a stable graph.
///
/// The query's outputs are the types of the row's open destinations in index
/// order; its inputs are the types of every source the row can see.
pub fn plan_query(graph: &GcGraph) -> Option<(Row, Query)> {
    let open = graph.unconnected();
    let row = open.iter().map(|key| key.row).min()?;
    let g = graph.internal();
    let outputs = open
        .iter()
        .filter(|key| key.row == row)
        .filter_map(|key| g.get(key).map(|ep| ep.typ))
        .collect();
    let inputs = rules::visible_sources(row, graph.has_row(Row::F))
        .iter()
        .flat_map(|r| g.row_types(*r, EndpointClass::Source))
        .collect();
    Some((row, Query::new(outputs).with_inputs(inputs)))
}

/// Finds a candidate to insert into `owner`, skipping `exclude`.
///
/// Fails with [`ResolutionFailed::NoCandidate`] when the source has nothing,
/// and with a configuration error if the open row cannot take an insertion.
/// A stable `owner` yields `Ok(None)`.
pub fn resolve<S, R>(
    source: &S,
    owner: &GeneticCode,
    exclude: &BTreeSet<GcRef>,
    rng: &mut R,
) -> Result<Option<Resolution>, StabilizeError>
where
    S: MaterialSource + ?Sized,
    R: Rng + ?Sized,
{
    let Some((row, query)) = plan_query(owner.graph()) else {
        return Ok(None);
    };
    let insertion_row = InsertionRow::try_from(row)?;
    let query = query.excluding(exclude.iter().copied());
    let candidates = source.select(&query);
    let Some(candidate) = candidates.choose(rng).cloned() else {
        warn!(owner = %owner.reference(), row = %row, outputs = ?query.outputs, "no candidate");
        return Err(ResolutionFailed::NoCandidate { owner: owner.reference(), row, outputs: query.outputs }.into());
    };
    debug!(
        owner = %owner.reference(),
        row = %row,
        candidate = %candidate.reference(),
        pool = candidates.len(),
        "resolved"
    );
    Ok(Some(Resolution { row: insertion_row, query, candidate }))
}
