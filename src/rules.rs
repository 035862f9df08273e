//! Structural rules for GC graphs.
//!
//! The rules fix three things:
//! - which rows may hold which endpoint classes;
//! - which row combinations form a legal graph (the catalogue);
//! - which source rows each destination row may connect to. Visibility
//!   depends only on whether the graph has a condition row `F`.
//!
//! Rows `I`, `C` and `U` are optional in every legal graph and are ignored
//! when a row set is matched against the catalogue.

use crate::core::{EndpointClass, Row, RowSet};

/// Rows that may hold source endpoints.
pub const SOURCE_ROWS: [Row; 4] = [Row::A, Row::B, Row::C, Row::I];

/// Rows that may hold destination endpoints.
pub const DESTINATION_ROWS: [Row; 6] = [Row::A, Row::B, Row::F, Row::O, Row::P, Row::U];

/// Rows that never affect whether a row set is legal.
const OPTIONAL_ROWS: RowSet = RowSet::of(&[Row::I, Row::C, Row::U]);

/// Structural cores of every legal graph.
///
/// A graph is legal iff its row set, minus `I`, `C` and `U`, is one of these.
pub const LEGAL_ROW_SETS: [RowSet; 7] = [
    RowSet::of(&[Row::O]),
    RowSet::of(&[Row::A, Row::O]),
    RowSet::of(&[Row::A, Row::B, Row::O]),
    RowSet::of(&[Row::F, Row::O, Row::P]),
    RowSet::of(&[Row::A, Row::F, Row::O, Row::P]),
    RowSet::of(&[Row::B, Row::F, Row::O, Row::P]),
    RowSet::of(&[Row::A, Row::B, Row::F, Row::O, Row::P]),
];

/// Whether `rows` is in the legal catalogue.
pub fn is_legal(rows: RowSet) -> bool {
    let core = rows.without(OPTIONAL_ROWS);
    LEGAL_ROW_SETS.contains(&core)
}

/// Whether `row` may hold endpoints of `class`.
pub fn allows(row: Row, class: EndpointClass) -> bool {
    match class {
        EndpointClass::Source => SOURCE_ROWS.contains(&row),
        EndpointClass::Destination => DESTINATION_ROWS.contains(&row),
    }
}

/// Source rows visible to destinations in `row`.
///
/// Returns an empty slice for rows that hold no destinations, and for `F`
/// and `P` in a graph without a condition.
pub fn visible_sources(row: Row, has_f: bool) -> &'static [Row] {
    match (row, has_f) {
        (Row::A, _) => &[Row::I, Row::C],
        (Row::B, false) => &[Row::I, Row::C, Row::A],
        (Row::B, true) => &[Row::I, Row::C],
        (Row::F, true) => &[Row::I],
        (Row::O, false) => &[Row::I, Row::C, Row::A, Row::B],
        (Row::O, true) => &[Row::I, Row::C, Row::A],
        (Row::P, true) => &[Row::I, Row::C, Row::B],
        (Row::U, _) => &[Row::I, Row::C, Row::A, Row::B],
        _ => &[],
    }
}

/// Whether a destination in `dst` may connect to a source in `src`.
#[inline]
pub fn can_feed(src: Row, dst: Row, has_f: bool) -> bool {
    visible_sources(dst, has_f).contains(&src)
}
