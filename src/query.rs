//! Candidate queries and the match ladder.
//!
//! A query asks for GCs that produce some output types, optionally consuming
//! only types from a given set. Matching is tried in tiers from strict to
//! loose; a source answers with the first tier that has any match.
//!
//! | Tier        | Outputs                        | Inputs (when constrained)      |
//! |-------------|--------------------------------|--------------------------------|
//! | `Exact`     | same sequence                  | same sequence                  |
//! | `Unordered` | same multiset                  | same multiset                  |
//! | `Subset`    | every wanted type is produced  | every consumed type is allowed |
//! | `Overlap`   | some wanted type is produced   | every consumed type is allowed |

use crate::core::{EpType, GcRef};
use crate::interface::Interface;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One rung of the match ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchTier {
    /// Ordered equality.
    Exact,
    /// Multiset equality.
    Unordered,
    /// Candidate covers the wanted outputs within the allowed inputs.
    Subset,
    /// Candidate produces at least one wanted output within the allowed inputs.
    Overlap,
}

impl MatchTier {
    /// Default ladder, strict to loose.
    pub const LADDER: [MatchTier; 4] =
        [MatchTier::Exact, MatchTier::Unordered, MatchTier::Subset, MatchTier::Overlap];

    /// Whether a candidate with interface `candidate` answers `query` at this
    /// tier. Candidates without outputs never match.
    pub fn matches(&self, query: &Query, candidate: &Interface) -> bool {
        if candidate.outputs.is_empty() {
            return false;
        }
        match self {
            MatchTier::Exact => {
                candidate.outputs == query.outputs
                    && query.inputs.as_ref().map_or(true, |inputs| candidate.inputs == *inputs)
            }
            MatchTier::Unordered => {
                sorted(&candidate.outputs) == sorted(&query.outputs)
                    && query
                        .inputs
                        .as_ref()
                        .map_or(true, |inputs| sorted(&candidate.inputs) == sorted(inputs))
            }
            MatchTier::Subset => {
                query.output_set().is_subset(&candidate.output_set()) && query.admits(candidate)
            }
            MatchTier::Overlap => {
                !query.output_set().is_disjoint(&candidate.output_set()) && query.admits(candidate)
            }
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchTier::Exact => "exact",
            MatchTier::Unordered => "unordered",
            MatchTier::Subset => "subset",
            MatchTier::Overlap => "overlap",
        };
        write!(f, "{name}")
    }
}

fn sorted(types: &[EpType]) -> Vec<EpType> {
    let mut v = types.to_vec();
    v.sort_unstable();
    v
}

/// Request for candidate GCs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Types the candidate should produce, in order.
    pub outputs: Vec<EpType>,
    /// Types the candidate may consume; `None` means unconstrained.
    pub inputs: Option<Vec<EpType>>,
    /// References never returned.
    #[serde(default)]
    pub exclude: BTreeSet<GcRef>,
}

impl Query {
    /// Query for candidates producing `outputs`.
    pub fn new(outputs: Vec<EpType>) -> Self {
        Self { outputs, inputs: None, exclude: BTreeSet::new() }
    }

    /// Restricts candidates to consuming only `inputs`.
    pub fn with_inputs(mut self, inputs: Vec<EpType>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Excludes the given references.
    pub fn excluding(mut self, refs: impl IntoIterator<Item = GcRef>) -> Self {
        self.exclude.extend(refs);
        self
    }

    /// Whether `reference` is excluded.
    #[inline]
    pub fn is_excluded(&self, reference: GcRef) -> bool {
        self.exclude.contains(&reference)
    }

    /// Distinct wanted output types.
    pub fn output_set(&self) -> BTreeSet<EpType> {
        self.outputs.iter().copied().collect()
    }

    /// Whether every type `candidate` consumes is allowed.
    pub fn admits(&self, candidate: &Interface) -> bool {
        match &self.inputs {
            None => true,
            Some(allowed) => {
                let allowed: BTreeSet<EpType> = allowed.iter().copied().collect();
                candidate.input_set().is_subset(&allowed)
            }
        }
    }

    /// First tier of `ladder` at which `candidate` matches.
    pub fn tier_of(&self, ladder: &[MatchTier], candidate: &Interface) -> Option<MatchTier> {
        ladder.iter().copied().find(|tier| tier.matches(self, candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: u32) -> EpType {
        EpType::new(raw)
    }

    fn iface(inputs: &[u32], outputs: &[u32]) -> Interface {
        Interface::new(inputs.iter().map(|r| t(*r)).collect(), outputs.iter().map(|r| t(*r)).collect())
    }

    #[test]
    fn ladder_loosens_step_by_step() {
        let q = Query::new(vec![t(1), t(2)]).with_inputs(vec![t(3), t(4)]);
        let ladder = MatchTier::LADDER;
        assert_eq!(q.tier_of(&ladder, &iface(&[3, 4], &[1, 2])), Some(MatchTier::Exact));
        assert_eq!(q.tier_of(&ladder, &iface(&[4, 3], &[2, 1])), Some(MatchTier::Unordered));
        assert_eq!(q.tier_of(&ladder, &iface(&[4], &[2, 1, 5])), Some(MatchTier::Subset));
        assert_eq!(q.tier_of(&ladder, &iface(&[3], &[2])), Some(MatchTier::Overlap));
        assert_eq!(q.tier_of(&ladder, &iface(&[9], &[1, 2])), None);
        assert_eq!(q.tier_of(&ladder, &iface(&[3], &[7])), None);
    }

    #[test]
    fn unconstrained_inputs_admit_anything() {
        let q = Query::new(vec![t(1)]);
        assert!(MatchTier::Exact.matches(&q, &iface(&[8, 9], &[1])));
    }

    #[test]
    fn candidates_without_outputs_never_match() {
        let q = Query::new(vec![]);
        assert!(!MatchTier::Exact.matches(&q, &iface(&[], &[])));
    }

    #[test]
    fn exclusions() {
        let q = Query::new(vec![t(1)]).excluding([GcRef::new(4)]);
        assert!(q.is_excluded(GcRef::new(4)));
        assert!(!q.is_excluded(GcRef::new(5)));
    }
}
