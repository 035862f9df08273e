//! Core data structures for genetic-code graphs.
//!
//! A GC graph is a set of typed endpoints grouped into rows. Source endpoints
//! (rows `I`, `C`, `A`, `B`) provide values; destination endpoints (rows `A`,
//! `B`, `F`, `O`, `P`, `U`) consume exactly one value each. Rows `A` and `B`
//! carry both classes: their destinations are the inputs of a substructure GC
//! and their sources are its outputs.
//!
//! # Citations
//! - Strongly typed GP: Montana, "Strongly Typed Genetic Programming" (1995)
//! - Cartesian GP: Miller & Thomson, "Cartesian Genetic Programming" (2000)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a genetic code.
///
/// Assigned once by a material source's reference generator. Within a
/// stabilization pass a reference may be superseded; only the reference of a
/// published record is durable.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GcRef(i64);

impl GcRef {
    /// Creates a reference from its raw value.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw `i64` value.
    #[inline]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for GcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcRef({})", self.0)
    }
}

/// Type identifier carried by an endpoint.
///
/// Compatibility is exact equality; there is no subtyping.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpType(u32);

impl EpType {
    /// Creates a type identifier from its raw value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` value.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A named slot-class of a GC graph.
///
/// The declaration order is the total order used when the resolver picks an
/// insertion row: `A < B < C < F < I < O < P < U`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Row {
    /// First substructure (GCA).
    A,
    /// Second substructure (GCB).
    B,
    /// Constants.
    C,
    /// Condition selecting between the `O` and `P` paths.
    F,
    /// Inputs.
    I,
    /// Outputs.
    O,
    /// Alternate outputs taken when the condition is false.
    P,
    /// Collector for sources nothing else consumes.
    U,
}

impl Row {
    /// Every row, in order.
    pub const ALL: [Row; 8] = [Row::A, Row::B, Row::C, Row::F, Row::I, Row::O, Row::P, Row::U];

    /// Single-letter name of the row.
    pub const fn as_char(self) -> char {
        match self {
            Row::A => 'A',
            Row::B => 'B',
            Row::C => 'C',
            Row::F => 'F',
            Row::I => 'I',
            Row::O => 'O',
            Row::P => 'P',
            Row::U => 'U',
        }
    }

    /// Parses a single-letter row name.
    pub fn from_char(c: char) -> Option<Self> {
        Row::ALL.into_iter().find(|row| row.as_char() == c)
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Compact set of rows.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowSet(u8);

impl RowSet {
    /// The empty set.
    pub const EMPTY: RowSet = RowSet(0);

    /// Builds a set from a slice of rows (usable in constants).
    pub const fn of(rows: &[Row]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < rows.len() {
            bits |= rows[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Whether `row` is a member.
    #[inline]
    pub const fn contains(&self, row: Row) -> bool {
        self.0 & row.bit() != 0
    }

    /// Adds `row` to the set.
    #[inline]
    pub fn insert(&mut self, row: Row) {
        self.0 |= row.bit();
    }

    /// Returns the set with every member of `other` removed.
    #[inline]
    pub const fn without(&self, other: RowSet) -> RowSet {
        RowSet(self.0 & !other.0)
    }

    /// Whether the set has no members.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in row order.
    pub fn iter(&self) -> impl Iterator<Item = Row> + '_ {
        Row::ALL.into_iter().filter(move |row| self.contains(*row))
    }
}

impl FromIterator<Row> for RowSet {
    fn from_iter<T: IntoIterator<Item = Row>>(iter: T) -> Self {
        let mut set = RowSet::EMPTY;
        for row in iter {
            set.insert(row);
        }
        set
    }
}

impl fmt::Display for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for row in self.iter() {
            write!(f, "{}", row)?;
        }
        write!(f, "}}")
    }
}

/// Direction of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EndpointClass {
    /// Provides a value; may feed any number of destinations.
    Source,
    /// Consumes a value; holds at most one connection.
    Destination,
}

impl EndpointClass {
    /// The class at the other end of a connection.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            EndpointClass::Source => EndpointClass::Destination,
            EndpointClass::Destination => EndpointClass::Source,
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointClass::Source => write!(f, "s"),
            EndpointClass::Destination => write!(f, "d"),
        }
    }
}

/// Key of an endpoint inside a graph.
///
/// Ordering is `(row, class, index)` so that all endpoints of one row and
/// class form a contiguous, index-ordered range of a sorted map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointKey {
    /// Row of the endpoint.
    pub row: Row,
    /// Direction of the endpoint.
    pub class: EndpointClass,
    /// Position within the row and class.
    pub index: u16,
}

impl EndpointKey {
    /// Key of a source endpoint.
    #[inline]
    pub const fn source(row: Row, index: u16) -> Self {
        Self { row, class: EndpointClass::Source, index }
    }

    /// Key of a destination endpoint.
    #[inline]
    pub const fn destination(row: Row, index: u16) -> Self {
        Self { row, class: EndpointClass::Destination, index }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.row, self.class, self.index)
    }
}

/// One side of a connection as seen from the other side.
///
/// The class is implied: a reference held by a destination names a source and
/// vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    /// Row of the peer endpoint.
    pub row: Row,
    /// Index of the peer endpoint.
    pub index: u16,
}

impl EndpointRef {
    /// Creates a reference.
    #[inline]
    pub const fn new(row: Row, index: u16) -> Self {
        Self { row, index }
    }

    /// Key of the peer, given the class of the endpoint holding this reference.
    #[inline]
    pub const fn key_from(&self, holder: EndpointClass) -> EndpointKey {
        EndpointKey { row: self.row, class: holder.opposite(), index: self.index }
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.index)
    }
}

/// A typed connection point.
///
/// # Invariants
/// - A destination holds at most one reference, to a source of identical type.
/// - Only row `C` endpoints carry a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Row of the endpoint.
    pub row: Row,
    /// Position within the row and class.
    pub index: u16,
    /// Value type.
    pub typ: EpType,
    /// Direction.
    pub class: EndpointClass,
    /// Connected peers.
    pub refs: Vec<EndpointRef>,
    /// Constant value for row `C` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Endpoint {
    /// Creates an unconnected source endpoint.
    pub fn source(row: Row, index: u16, typ: EpType) -> Self {
        Self { row, index, typ, class: EndpointClass::Source, refs: Vec::new(), literal: None }
    }

    /// Creates an unconnected destination endpoint.
    pub fn destination(row: Row, index: u16, typ: EpType) -> Self {
        Self { row, index, typ, class: EndpointClass::Destination, refs: Vec::new(), literal: None }
    }

    /// Creates a destination endpoint connected to `src`.
    pub fn connected(row: Row, index: u16, typ: EpType, src: EndpointRef) -> Self {
        Self { row, index, typ, class: EndpointClass::Destination, refs: vec![src], literal: None }
    }

    /// Creates a row `C` constant.
    pub fn constant(index: u16, typ: EpType, literal: impl Into<String>) -> Self {
        Self {
            row: Row::C,
            index,
            typ,
            class: EndpointClass::Source,
            refs: Vec::new(),
            literal: Some(literal.into()),
        }
    }

    /// Key of this endpoint.
    #[inline]
    pub fn key(&self) -> EndpointKey {
        EndpointKey { row: self.row, class: self.class, index: self.index }
    }

    /// Whether this endpoint is a source.
    #[inline]
    pub fn is_source(&self) -> bool {
        self.class == EndpointClass::Source
    }

    /// Whether this endpoint has at least one connection.
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.refs.is_empty()
    }

    /// The source feeding this destination, if any.
    #[inline]
    pub fn feeder(&self) -> Option<EndpointRef> {
        match self.class {
            EndpointClass::Destination => self.refs.first().copied(),
            EndpointClass::Source => None,
        }
    }

    /// This endpoint as a reference from the other side.
    #[inline]
    pub fn to_ref(&self) -> EndpointRef {
        EndpointRef::new(self.row, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_total_order() {
        let mut rows = vec![Row::P, Row::I, Row::O, Row::F, Row::C, Row::B, Row::A];
        rows.sort();
        assert_eq!(rows, vec![Row::A, Row::B, Row::C, Row::F, Row::I, Row::O, Row::P]);
    }

    #[test]
    fn row_chars_round_trip() {
        for row in Row::ALL {
            assert_eq!(Row::from_char(row.as_char()), Some(row));
        }
        assert_eq!(Row::from_char('Z'), None);
    }

    #[test]
    fn row_set_membership() {
        let set = RowSet::of(&[Row::I, Row::A, Row::O]);
        assert!(set.contains(Row::A));
        assert!(!set.contains(Row::B));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Row::A, Row::I, Row::O]);
        assert_eq!(set.without(RowSet::of(&[Row::I])), RowSet::of(&[Row::A, Row::O]));
        assert_eq!(set.to_string(), "{AIO}");
    }

    #[test]
    fn keys_group_by_row_then_class() {
        let a = EndpointKey::source(Row::A, 5);
        let b = EndpointKey::destination(Row::A, 0);
        let c = EndpointKey::source(Row::B, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn feeder_only_for_destinations() {
        let src = Endpoint::source(Row::I, 0, EpType::new(1));
        assert_eq!(src.feeder(), None);
        let dst = Endpoint::connected(Row::O, 0, EpType::new(1), src.to_ref());
        assert_eq!(dst.feeder(), Some(EndpointRef::new(Row::I, 0)));
        assert_eq!(dst.key().to_string(), "Od0");
    }
}
