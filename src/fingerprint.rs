//! Deterministic structural hashing of GC graphs.
//!
//! A graph fingerprint is a domain-separated SHA-256 over a canonical byte
//! encoding of the graph: endpoints in key order, each contributing its key,
//! type, feeder (destinations only) and literal. Source consumer lists are
//! derived data and are not hashed, so two graphs with the same connections
//! hash equally whether or not their references have been completed.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use crate::core::{EndpointClass, Row};
use crate::graph::InternalGraph;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 256-bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Creates a zero hash (all zeros).
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Creates a hash from a raw byte array.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw byte array.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes SHA-256 of the given data with domain separation.
    ///
    /// The hashed message is `b"GCS:<domain>:v1" || len(data) as u64 LE || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"GCS:");
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// No feeder.
const NO_FEEDER: u8 = 0xff;

fn row_byte(row: Row) -> u8 {
    row.as_char() as u8
}

/// Canonical byte encoding hashed by [`graph_fingerprint`].
pub fn canonical_bytes(graph: &InternalGraph) -> Vec<u8> {
    let mut data = Vec::with_capacity(graph.len() * 16);
    data.extend_from_slice(&(graph.len() as u64).to_le_bytes());
    for ep in graph.iter() {
        data.push(row_byte(ep.row));
        data.push(match ep.class {
            EndpointClass::Source => b's',
            EndpointClass::Destination => b'd',
        });
        data.extend_from_slice(&ep.index.to_le_bytes());
        data.extend_from_slice(&ep.typ.as_u32().to_le_bytes());
        match ep.feeder() {
            Some(src) => {
                data.push(row_byte(src.row));
                data.extend_from_slice(&src.index.to_le_bytes());
            }
            None => {
                data.push(NO_FEEDER);
                data.extend_from_slice(&0u16.to_le_bytes());
            }
        }
        match &ep.literal {
            Some(lit) => {
                data.extend_from_slice(&(lit.len() as u64).to_le_bytes());
                data.extend_from_slice(lit.as_bytes());
            }
            None => data.extend_from_slice(&u64::MAX.to_le_bytes()),
        }
    }
    data
}

/// Computes a deterministic fingerprint of a graph.
///
/// Policy note: the fingerprint is representation-sensitive. Two graphs that
/// differ only by a permutation of a row's indices hash differently.
pub fn graph_fingerprint(graph: &InternalGraph) -> HashValue {
    HashValue::hash_with_domain(b"GC_GRAPH", &canonical_bytes(graph))
}
