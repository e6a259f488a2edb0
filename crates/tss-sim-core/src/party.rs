//! Party identities and the shared peer context
//!
//! Every participant in an operation is identified by a [`PartyId`]: a
//! 1-based index, a display moniker, and a [`SortKey`]. The sort key defines
//! both identity equality and the canonical participant ordering, so every
//! participant sees the identical [`PeerContext`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Totally ordered key identifying a party (derived from its index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SortKey(u128);

impl SortKey {
    /// Derive the sort key for a party index
    pub fn from_index(index: usize) -> Self {
        Self(index as u128)
    }

    /// Raw integer value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u128>()
            .map(SortKey)
            .map_err(|e| Error::Deserialization(format!("invalid sort key {s:?}: {e}")))
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for SortKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Identity of one participant
///
/// Equality, hashing and ordering only consider the sort key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyId {
    index: usize,
    moniker: String,
    key: SortKey,
}

impl PartyId {
    /// Create a new party identity
    pub fn new(index: usize, moniker: impl Into<String>, key: SortKey) -> Self {
        Self {
            index,
            moniker: moniker.into(),
            key,
        }
    }

    /// 1-based party index (also the share evaluation point)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Display label
    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    /// Sort key
    pub fn key(&self) -> SortKey {
        self.key
    }
}

impl PartialEq for PartyId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PartyId {}

impl Hash for PartyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for PartyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PartyId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.index, self.moniker)
    }
}

/// Build `n` identities with indices `1..=n`, in ascending sort-key order
pub fn build_party_ids(n: usize) -> Vec<PartyId> {
    let mut parties: Vec<PartyId> = (1..=n)
        .map(|index| PartyId::new(index, index.to_string(), SortKey::from_index(index)))
        .collect();
    parties.sort();
    parties
}

/// Canonical ordered participant list shared by every engine of an operation
#[derive(Debug, Clone)]
pub struct PeerContext {
    parties: Vec<PartyId>,
}

impl PeerContext {
    /// Build a context, sorting the parties and rejecting colliding sort keys
    pub fn new(mut parties: Vec<PartyId>) -> Result<Self> {
        if parties.is_empty() {
            return Err(Error::InvalidConfig("peer context needs at least one party".into()));
        }

        parties.sort();
        if let Some(pair) = parties.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::InvalidConfig(format!(
                "duplicate sort key {} in peer context",
                pair[0].key()
            )));
        }

        Ok(Self { parties })
    }

    /// Parties in ascending sort-key order
    pub fn parties(&self) -> &[PartyId] {
        &self.parties
    }

    /// Number of parties
    pub fn len(&self) -> usize {
        self.parties.len()
    }

    /// Whether the context is empty (never true for a constructed context)
    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    /// Position of a party in the canonical ordering
    pub fn position(&self, party: &PartyId) -> Option<usize> {
        self.parties.binary_search(party).ok()
    }

    /// Look up the full identity registered for a sort key
    pub fn get(&self, key: SortKey) -> Option<&PartyId> {
        self.parties
            .binary_search_by(|p| p.key().cmp(&key))
            .ok()
            .map(|pos| &self.parties[pos])
    }

    /// Party at a position
    pub fn at(&self, position: usize) -> Option<&PartyId> {
        self.parties.get(position)
    }

    /// Whether the party belongs to this context
    pub fn contains(&self, party: &PartyId) -> bool {
        self.position(party).is_some()
    }
}
