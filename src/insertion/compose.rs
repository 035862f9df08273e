//! Record-level insertion: which GC ends up in which row.

use super::graph::GraphOutcome;
use super::InsertCase;
use crate::core::{GcRef, Row};
use crate::gc::{GeneticCode, Lineage};

/// Records produced by one insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// Rewritten target.
    pub result: GeneticCode,
    /// Formed GC, for cases 4 to 10.
    pub formed: Option<GeneticCode>,
}

/// Wraps the graphs of an insertion into records.
///
/// `next_ref` mints the references of the new records; the formed record, if
/// any, is minted first. Both records get `lineage`.
pub fn compose(
    case: InsertCase,
    target: &GeneticCode,
    insert: &GeneticCode,
    graphs: GraphOutcome,
    lineage: Lineage,
    mut next_ref: impl FnMut() -> GcRef,
) -> Composition {
    let t = Some(target.reference());
    let i = Some(insert.reference());

    let formed = match (case.plan(), graphs.formed) {
        (Some(plan), Some(graph)) => {
            let prior = match plan.replaced {
                Row::A => target.gca(),
                _ => target.gcb(),
            };
            let (gca, gcb) = if plan.insert_upper { (i, prior) } else { (prior, i) };
            Some(GeneticCode::compose(next_ref(), gca, gcb, lineage, graph))
        }
        _ => None,
    };
    let f = formed.as_ref().map(GeneticCode::reference);

    let (gca, gcb) = match (case, case.plan()) {
        (InsertCase::Stack, _) => (i, t),
        (InsertCase::StackBelow, _) => (t, i),
        (InsertCase::FillA, _) => (i, target.gcb()),
        (InsertCase::DisplaceA, _) => (i, target.gca()),
        (_, Some(plan)) if plan.replaced == Row::B => (target.gca(), f),
        (_, Some(_)) => (f, target.gcb()),
        (_, None) => (target.gca(), i),
    };
    let result = GeneticCode::compose(next_ref(), gca, gcb, lineage, graphs.result);
    Composition { result, formed }
}
