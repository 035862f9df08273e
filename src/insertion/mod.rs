//! Insertion algebra.
//!
//! Inserting GC `N` into target `T` "above row R" is one of twelve cases, a
//! pure function of R and which of rows `A`, `B`, `F` the target has:
//!
//! | Id | Case         | When                          |
//! |----|--------------|-------------------------------|
//! | 0  | `Stack`      | R = I                         |
//! | 11 | `StackBelow` | R = Z                         |
//! | 1  | `FillA`      | no A                          |
//! | 2  | `DisplaceA`  | A, no B, no F, R = A          |
//! | 3  | `FillB`      | A, no B, R = B/O/P (not O with F) |
//! | 4  | `FormAboveA` | A, B, no F, R = A             |
//! | 5  | `FormAboveB` | A, B, no F, R = B             |
//! | 6  | `FormAboveO` | A, B, no F, R = O/P           |
//! | 7  | `CondAboveA` | F, A, R = A                   |
//! | 8  | `CondAboveO` | F, A, R = O                   |
//! | 9  | `CondAboveB` | F, B, R = B                   |
//! | 10 | `CondAboveP` | F, B, R = P                   |
//!
//! Cases 4 to 10 "form" a new GC: one of the target's substructures is
//! replaced by a GC holding the prior substructure and the insert.
//! [`FormPlan`] says which one, where the insert goes, and which downstream
//! row picks up the insert's outputs.
//!
//! Row assignment lives in [`graph`]; record-level composition in [`compose`].

pub mod compose;
pub mod graph;

use crate::core::Row;
use crate::error::ConfigurationError;
use crate::graph::GcGraph;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use compose::{compose, Composition};
pub use graph::{insert_graph, GraphOutcome};

/// Row above which a GC is inserted.
///
/// `Z` is a virtual row below the target's outputs: the target runs first and
/// the insert after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InsertionRow {
    /// Above the inputs: the insert runs before the whole target.
    I,
    /// Above row `A`.
    A,
    /// Above row `B`.
    B,
    /// Above the outputs.
    O,
    /// Above the alternate outputs.
    P,
    /// Below the outputs: the insert runs after the whole target.
    Z,
}

impl InsertionRow {
    /// Every insertion row.
    pub const ALL: [InsertionRow; 6] = [
        InsertionRow::I,
        InsertionRow::A,
        InsertionRow::B,
        InsertionRow::O,
        InsertionRow::P,
        InsertionRow::Z,
    ];

    /// The graph row, `None` for `Z`.
    pub const fn row(self) -> Option<Row> {
        match self {
            InsertionRow::I => Some(Row::I),
            InsertionRow::A => Some(Row::A),
            InsertionRow::B => Some(Row::B),
            InsertionRow::O => Some(Row::O),
            InsertionRow::P => Some(Row::P),
            InsertionRow::Z => None,
        }
    }
}

impl TryFrom<Row> for InsertionRow {
    type Error = ConfigurationError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        match row {
            Row::I => Ok(InsertionRow::I),
            Row::A => Ok(InsertionRow::A),
            Row::B => Ok(InsertionRow::B),
            Row::O => Ok(InsertionRow::O),
            Row::P => Ok(InsertionRow::P),
            Row::C | Row::F | Row::U => Err(ConfigurationError::IllegalInsertionRow(row)),
        }
    }
}

impl fmt::Display for InsertionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row() {
            Some(row) => write!(f, "{}", row),
            None => write!(f, "Z"),
        }
    }
}

/// The twelve insertion cases.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InsertCase {
    /// Insert in `A`, whole target in `B`.
    Stack = 0,
    /// Insert fills the empty row `A`.
    FillA = 1,
    /// Target's `A` moves to `B`; insert takes `A`.
    DisplaceA = 2,
    /// Insert fills the empty row `B`.
    FillB = 3,
    /// `A` becomes a formed GC `{insert, prior A}`.
    FormAboveA = 4,
    /// `A` becomes a formed GC `{prior A, insert}`.
    FormAboveB = 5,
    /// `B` becomes a formed GC `{prior B, insert}`.
    FormAboveO = 6,
    /// With a condition, `A` becomes `{insert, prior A}`.
    CondAboveA = 7,
    /// With a condition, `A` becomes `{prior A, insert}`.
    CondAboveO = 8,
    /// With a condition, `B` becomes `{insert, prior B}`.
    CondAboveB = 9,
    /// With a condition, `B` becomes `{prior B, insert}`.
    CondAboveP = 10,
    /// Whole target in `A`, insert in `B`.
    StackBelow = 11,
}

/// How a forming case rebuilds the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormPlan {
    /// Target row replaced by the formed GC (`A` or `B`).
    pub replaced: Row,
    /// Whether the insert occupies the formed GC's row `A` (runs first).
    pub insert_upper: bool,
    /// Target row whose destinations are re-spliced from the insert's outputs.
    pub downstream: Option<Row>,
}

impl FormPlan {
    /// Formed-GC row holding the insert.
    pub const fn insert_slot(&self) -> Row {
        if self.insert_upper {
            Row::A
        } else {
            Row::B
        }
    }

    /// Formed-GC row holding the replaced substructure.
    pub const fn prior_slot(&self) -> Row {
        if self.insert_upper {
            Row::B
        } else {
            Row::A
        }
    }
}

impl InsertCase {
    /// Every case, by id.
    pub const ALL: [InsertCase; 12] = [
        InsertCase::Stack,
        InsertCase::FillA,
        InsertCase::DisplaceA,
        InsertCase::FillB,
        InsertCase::FormAboveA,
        InsertCase::FormAboveB,
        InsertCase::FormAboveO,
        InsertCase::CondAboveA,
        InsertCase::CondAboveO,
        InsertCase::CondAboveB,
        InsertCase::CondAboveP,
        InsertCase::StackBelow,
    ];

    /// Selects the case for inserting above `row` into a target with the given
    /// rows.
    pub fn resolve(row: InsertionRow, has_a: bool, has_b: bool, has_f: bool) -> InsertCase {
        use InsertionRow as R;
        match row {
            R::I => InsertCase::Stack,
            R::Z => InsertCase::StackBelow,
            _ if !has_a => InsertCase::FillA,
            r if !has_b => match (r, has_f) {
                (R::A, false) => InsertCase::DisplaceA,
                (R::A, true) => InsertCase::CondAboveA,
                (R::O, true) => InsertCase::CondAboveO,
                _ => InsertCase::FillB,
            },
            r if !has_f => match r {
                R::A => InsertCase::FormAboveA,
                R::B => InsertCase::FormAboveB,
                _ => InsertCase::FormAboveO,
            },
            r => match r {
                R::A => InsertCase::CondAboveA,
                R::O => InsertCase::CondAboveO,
                R::B => InsertCase::CondAboveB,
                _ => InsertCase::CondAboveP,
            },
        }
    }

    /// Selects the case for inserting above `row` into `target`.
    pub fn for_graph(row: InsertionRow, target: &GcGraph) -> InsertCase {
        Self::resolve(row, target.has_row(Row::A), target.has_row(Row::B), target.has_row(Row::F))
    }

    /// Numeric id, `0..=11`.
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Plan for the forming cases, `None` otherwise.
    pub const fn plan(self) -> Option<FormPlan> {
        let (replaced, insert_upper, downstream) = match self {
            InsertCase::FormAboveA => (Row::A, true, None),
            InsertCase::FormAboveB => (Row::A, false, Some(Row::B)),
            InsertCase::FormAboveO => (Row::B, false, Some(Row::O)),
            InsertCase::CondAboveA => (Row::A, true, None),
            InsertCase::CondAboveO => (Row::A, false, Some(Row::O)),
            InsertCase::CondAboveB => (Row::B, true, None),
            InsertCase::CondAboveP => (Row::B, false, Some(Row::P)),
            _ => return None,
        };
        Some(FormPlan { replaced, insert_upper, downstream })
    }

    /// Whether the case creates a formed GC.
    pub const fn forms(self) -> bool {
        self.plan().is_some()
    }
}

impl fmt::Display for InsertCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}
