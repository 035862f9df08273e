//! Stabilization passes.
//!
//! [`Stabilizer`] owns the random state and bounds; the free functions run a
//! single pass with default configuration.

pub mod stabilizer;
pub mod worklist;

pub use stabilizer::{Stabilized, Stabilizer};
pub use worklist::{WorkItem, WorkQueue};

use crate::error::StabilizeError;
use crate::gc::GeneticCode;
use crate::insertion::InsertionRow;
use crate::source::MaterialSource;

/// Stabilizes `target` with default bounds.
pub fn stabilize<S>(source: &S, target: GeneticCode) -> Result<Stabilized, StabilizeError>
where
    S: MaterialSource + ?Sized,
{
    Stabilizer::new(source).stabilize(target)
}

/// Inserts `insert` into `target` above `row` with default bounds.
pub fn insert<S>(
    source: &S,
    target: GeneticCode,
    insert: GeneticCode,
    row: InsertionRow,
) -> Result<Stabilized, StabilizeError>
where
    S: MaterialSource + ?Sized,
{
    Stabilizer::new(source).insert(target, insert, row)
}
