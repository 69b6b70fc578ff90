//! Parsed representations of network and cosmetic filter rules, and their matching logic.

pub mod cosmetic;
pub mod network;
pub mod network_matchers;

use std::collections::HashMap;

use thiserror::Error;

use crate::utils::Hash;

type RandomState = std::hash::BuildHasherDefault<seahash::SeaHasher>;

/// Common interface of parsed filters, used to deduplicate and index them.
pub trait Filter {
    /// Hash of the semantic content of the filter. Two lines parsing to the same filter share
    /// an id.
    fn get_id(&self) -> Hash;
    /// Token hashes usable as index keys for the filter.
    fn get_tokens(&self) -> Vec<Hash>;
    /// The line the filter was parsed from, if it was parsed in debug mode.
    fn raw_line(&self) -> Option<&str>;
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("filter `{new}` has the same id {id} as `{existing}`")]
pub struct FilterCollision {
    pub id: Hash,
    pub existing: String,
    pub new: String,
}

/// Keeps track of the filters seen so far by id, to tell duplicates from id collisions between
/// semantically different filters.
#[derive(Debug, Default)]
pub struct CollisionMap {
    seen: HashMap<Hash, String, RandomState>,
}

impl CollisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `filter`. Duplicates of a filter recorded before are accepted; a different filter
    /// with the same id is reported and not recorded.
    pub fn record<F: Filter + ToString>(&mut self, filter: &F) -> Result<(), FilterCollision> {
        let id = filter.get_id();
        let line = filter.to_string();
        match self.seen.get(&id) {
            Some(existing) if *existing != line => Err(FilterCollision {
                id,
                existing: existing.clone(),
                new: line,
            }),
            Some(_) => Ok(()),
            None => {
                self.seen.insert(id, line);
                Ok(())
            }
        }
    }

    pub fn contains(&self, id: Hash) -> bool {
        self.seen.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
