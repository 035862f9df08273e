//! Error types for graph construction, insertion and stabilization.
//!
//! Three failure classes:
//! - [`ConfigurationError`]: the caller asked for something illegal (a row set
//!   outside the catalogue, an insertion above a source-only row, a bad
//!   configuration value). Fatal.
//! - [`ValidationFailed`]: a produced graph broke a structural invariant.
//!   This is a defect in the insertion algebra and is never swallowed.
//! - [`ResolutionFailed`]: no candidate could repair an unstable graph. This
//!   is the expected, recoverable outcome of an impossible composition.

use crate::core::{EndpointClass, EndpointKey, EpType, GcRef, Row, RowSet};
use crate::interface::Interface;
use thiserror::Error;

/// The caller requested an illegal structure or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The graph's rows are not in the legal catalogue.
    #[error("illegal row set {0}")]
    IllegalRowSet(RowSet),

    /// An endpoint class was placed on a row that cannot hold it.
    #[error("row {row} cannot hold {class:?} endpoints")]
    IllegalEndpoint {
        /// Offending row.
        row: Row,
        /// Offending class.
        class: EndpointClass,
    },

    /// Nothing can be inserted above this row.
    #[error("insertion above row {0} is not defined")]
    IllegalInsertionRow(Row),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A single structural defect found by graph validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    /// Row set outside the catalogue.
    IllegalRowSet(RowSet),
    /// Endpoint on a row that cannot hold its class.
    IllegalEndpoint(EndpointKey),
    /// Destination with more than one connection.
    MultipleFeeders(EndpointKey),
    /// Reference to an endpoint that does not exist.
    DanglingReference {
        /// Endpoint holding the reference.
        from: EndpointKey,
        /// Missing peer.
        to: EndpointKey,
    },
    /// Connection between endpoints of different types.
    TypeMismatch {
        /// Destination side.
        dst: EndpointKey,
        /// Destination type.
        dst_type: EpType,
        /// Source type.
        src_type: EpType,
    },
    /// Connection from a source row the destination cannot see.
    InvisibleSource {
        /// Destination side.
        dst: EndpointKey,
        /// Source row.
        src_row: Row,
    },
    /// The two sides of a connection disagree.
    OneSidedConnection(EndpointKey),
    /// Indices of a row and class are not `0..n`.
    NonContiguous {
        /// Row with the gap.
        row: Row,
        /// Class with the gap.
        class: EndpointClass,
    },
    /// Source that nothing references, not even row `U`.
    Unreferenced(EndpointKey),
    /// Rows `O` and `P` carry different types.
    OutputMirror,
    /// Literal on a non-constant endpoint, or a constant without one.
    Literal(EndpointKey),
    /// Destination without a feeder where a stable graph is required.
    Unconnected(EndpointKey),
    /// An insertion changed the interface of the graph it rewrote.
    InterfaceChanged {
        /// Interface before the insertion.
        expected: Interface,
        /// Interface after it.
        found: Interface,
    },
    /// The inserted GC's interface is not present at its row.
    MissingInsert(Row),
}

/// A produced graph failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("graph failed validation with {} issue(s): {issues:?}", issues.len())]
pub struct ValidationFailed {
    /// Every defect found.
    pub issues: Vec<GraphIssue>,
}

impl ValidationFailed {
    /// Wraps a single issue.
    pub fn single(issue: GraphIssue) -> Self {
        Self { issues: vec![issue] }
    }
}

/// No candidate could repair an unstable graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailed {
    /// The match ladder was exhausted.
    #[error("no candidate provides {outputs:?} above row {row} of {owner}")]
    NoCandidate {
        /// GC being repaired.
        owner: GcRef,
        /// Selected insertion row.
        row: Row,
        /// Types the candidate had to provide.
        outputs: Vec<EpType>,
    },

    /// Resolutions nested deeper than the configured bound.
    #[error("resolution depth {depth} exceeds limit {limit}")]
    DepthExceeded {
        /// Depth reached.
        depth: usize,
        /// Configured bound.
        limit: usize,
    },

    /// The pass processed more work items than the configured bound.
    #[error("stabilization exceeded {limit} steps")]
    StepLimitExceeded {
        /// Configured bound.
        limit: usize,
    },
}

/// Failure of a stabilization or insertion pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StabilizeError {
    /// Recoverable: the composition is currently impossible.
    #[error(transparent)]
    Resolution(#[from] ResolutionFailed),

    /// Internal invariant violation.
    #[error(transparent)]
    Validation(#[from] ValidationFailed),

    /// Illegal request.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A work item named a record the pass does not hold.
    #[error("work item references unknown record {0}")]
    MissingRecord(GcRef),
}

impl StabilizeError {
    /// Whether the caller may retry with different material.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StabilizeError::Resolution(_))
    }
}

/// A record was refused by a material source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Only stable graphs may be published.
    #[error("record {0} has an unstable graph")]
    Unstable(GcRef),

    /// The reference is already taken.
    #[error("record {0} is already published")]
    Duplicate(GcRef),

    /// The graph failed validation.
    #[error("record {reference} is invalid: {source}")]
    Invalid {
        /// Offending record.
        reference: GcRef,
        /// Validation detail.
        source: ValidationFailed,
    },
}
