//! Ordered input/output interfaces.
//!
//! The interface of a GC graph is the ordered list of its input types (row
//! `I` sources) and output types (row `O` destinations). When a GC occupies
//! row `A` or `B` of another graph, that row's destinations carry the
//! interface's inputs and its sources carry the outputs.

use crate::core::EpType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Input and output types of a GC, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interface {
    /// Types consumed, by input index.
    pub inputs: Vec<EpType>,
    /// Types produced, by output index.
    pub outputs: Vec<EpType>,
}

impl Interface {
    /// Creates an interface.
    pub fn new(inputs: Vec<EpType>, outputs: Vec<EpType>) -> Self {
        Self { inputs, outputs }
    }

    /// `(inputs, outputs)` counts.
    #[inline]
    pub fn arity(&self) -> (usize, usize) {
        (self.inputs.len(), self.outputs.len())
    }

    /// Distinct input types.
    pub fn input_set(&self) -> BTreeSet<EpType> {
        self.inputs.iter().copied().collect()
    }

    /// Distinct output types.
    pub fn output_set(&self) -> BTreeSet<EpType> {
        self.outputs.iter().copied().collect()
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |types: &[EpType]| {
            types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
        };
        write!(f, "({}) -> ({})", join(&self.inputs), join(&self.outputs))
    }
}
