//! Remnants collected during one burial.

use crate::reaper::task::ObjectKind;
use crate::storage::Entry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sampled bytes standing in for one destroyed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remnant {
    pub path: PathBuf,
    pub kind: ObjectKind,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

/// Remnants in finalization (post-order) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemnantDigest {
    remnants: Vec<Remnant>,
}

impl RemnantDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, remnant: Remnant) {
        self.remnants.push(remnant);
    }

    /// Append another digest, keeping both orders.
    pub fn extend(&mut self, other: RemnantDigest) {
        self.remnants.extend(other.remnants);
    }

    /// Keep only the remnants matching `predicate`.
    pub fn retain(&mut self, mut predicate: impl FnMut(&Remnant) -> bool) {
        self.remnants.retain(|r| predicate(r));
    }

    pub fn len(&self) -> usize {
        self.remnants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remnants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Remnant> {
        self.remnants.iter()
    }

    /// Log entries for every remnant, in order.
    pub fn entries(&self) -> Vec<Entry> {
        self.remnants
            .iter()
            .flat_map(|r| Entry::from_remnant(&r.bytes))
            .collect()
    }

    /// All remnant bytes concatenated, for the raw sink.
    pub fn flatten(&self) -> Vec<u8> {
        self.remnants
            .iter()
            .flat_map(|r| r.bytes.iter().copied())
            .collect()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
