//! Per-entity revision numbering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Local version number of an entity, bumped on every local change.
///
/// An entity that has never been modified has no revision (`None`), so the
/// optional form `Option<RevisionId>` is what records and results carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    /// The revision assigned by the first local change.
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The revision following `prev`: 1 for an unset revision, otherwise `prev + 1`.
#[must_use]
pub fn next_revision_id(prev: Option<RevisionId>) -> RevisionId {
    prev.map_or(RevisionId::FIRST, |id| RevisionId(id.0.saturating_add(1)))
}

/// Two revisions match when both are unset or both are set to the same value.
#[must_use]
pub fn revision_ids_match(a: Option<RevisionId>, b: Option<RevisionId>) -> bool {
    a == b
}
