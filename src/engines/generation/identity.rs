use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, strictly increasing genome identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenomeId(pub u64);

impl GenomeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out genome ids.
///
/// Owned by whoever builds populations (the engine); ids are never reused,
/// not even across a reset of the search.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    next: u64,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn allocate(&mut self) -> GenomeId {
        let id = GenomeId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to `allocate` will return.
    pub fn peek(&self) -> GenomeId {
        GenomeId(self.next)
    }
}
