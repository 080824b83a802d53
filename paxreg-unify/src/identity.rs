//! Identity keys and ingestion-time lookup indexes
//!
//! A record is matched to an existing profile in a fixed order:
//! 1. exact identity key,
//! 2. the source's fallback index (name pair or loyalty number),
//! 3. otherwise a new profile is created.
//!
//! Changing this order changes which duplicates are caught here and which
//! are left for the cluster merger.

use paxreg_common::normalize::{normalize_document, normalize_loyalty, normalize_name};
use std::collections::HashMap;

/// Position of a profile in the consolidation arena
pub type ProfileId = usize;

/// Normalized (first name, last name, birth date, primary document) tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub document: String,
}

impl IdentityKey {
    /// Derive a key from raw field values
    pub fn derive(first: &str, last: &str, birth: &str, document: &str) -> Self {
        Self {
            first_name: normalize_name(first),
            last_name: normalize_name(last),
            birth_date: birth.trim().to_string(),
            document: normalize_document(document),
        }
    }

    /// Key for name-only sources: `(first, last, "", "")`
    pub fn name_only(first: &str, last: &str) -> Self {
        Self::derive(first, last, "", "")
    }

    /// Key for sources identified only by a loyalty number: `("", "", "", number)`
    pub fn loyalty_only(number: &str) -> Self {
        Self {
            document: normalize_loyalty(number),
            ..Self::derive("", "", "", "")
        }
    }

    /// Normalized (first, last) pair
    pub fn name_pair(&self) -> (String, String) {
        (self.first_name.clone(), self.last_name.clone())
    }

    /// True when no component carries a value
    pub fn is_empty(&self) -> bool {
        self.first_name.is_empty()
            && self.last_name.is_empty()
            && self.birth_date.is_empty()
            && self.document.is_empty()
    }
}

/// Secondary index a source may consult after an exact-key miss
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// Exact key only
    None,
    /// First profile registered with the same normalized name pair
    NamePair,
    /// First profile that registered this normalized loyalty number
    Loyalty(String),
}

/// The three lookup indexes used during one consolidation run
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_key: HashMap<IdentityKey, ProfileId>,
    by_name: HashMap<(String, String), ProfileId>,
    by_loyalty: HashMap<String, ProfileId>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an existing profile: exact key first, then the fallback index
    pub fn lookup(&self, key: &IdentityKey, fallback: &Fallback) -> Option<ProfileId> {
        if let Some(id) = self.by_key.get(key) {
            return Some(*id);
        }

        match fallback {
            Fallback::None => None,
            Fallback::NamePair => {
                if key.first_name.is_empty() && key.last_name.is_empty() {
                    return None;
                }
                self.by_name.get(&key.name_pair()).copied()
            }
            Fallback::Loyalty(number) => {
                let number = normalize_loyalty(number);
                if number.is_empty() {
                    return None;
                }
                self.by_loyalty.get(&number).copied()
            }
        }
    }

    /// Register a newly created profile under its key and name pair
    ///
    /// The name pair keeps its first registration.
    pub fn register(&mut self, key: IdentityKey, id: ProfileId) {
        if !key.first_name.is_empty() || !key.last_name.is_empty() {
            self.by_name.entry(key.name_pair()).or_insert(id);
        }
        self.by_key.insert(key, id);
    }

    /// Bind an additional key to an existing profile (fallback hit)
    pub fn alias(&mut self, key: IdentityKey, id: ProfileId) {
        self.by_key.entry(key).or_insert(id);
    }

    /// Record that a profile carries a loyalty number; first registration wins
    pub fn register_loyalty(&mut self, number: &str, id: ProfileId) {
        let number = normalize_loyalty(number);
        if !number.is_empty() {
            self.by_loyalty.entry(number).or_insert(id);
        }
    }
}
