use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceType;
use crate::temporal::Timestamp;

/// Immutable point-in-time copy of a ledger.
///
/// This is both the durable persistence format (`{"items": {...},
/// "lastUpdated": n}`) and the payload of every snapshot push. Entries with
/// a quantity of zero may be present; they are equivalent to absence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    items: BTreeMap<ResourceType, u64>,
    #[serde(rename = "lastUpdated")]
    last_updated: Timestamp,
}

impl Snapshot {
    pub fn new(items: BTreeMap<ResourceType, u64>, last_updated: Timestamp) -> Self {
        Self {
            items,
            last_updated,
        }
    }

    /// An empty snapshot stamped `last_updated`.
    pub fn empty(last_updated: Timestamp) -> Self {
        Self::new(BTreeMap::new(), last_updated)
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    /// Quantity held for `resource`; zero when absent.
    pub fn quantity(&self, resource: &ResourceType) -> u64 {
        self.items.get(resource).copied().unwrap_or(0)
    }

    /// Plain `(type, quantity)` enumeration, including zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceType, u64)> {
        self.items.iter().map(|(r, q)| (r, *q))
    }

    /// Entries with a positive quantity.
    pub fn stocked(&self) -> impl Iterator<Item = (&ResourceType, u64)> {
        self.iter().filter(|(_, q)| *q > 0)
    }

    pub fn items(&self) -> &BTreeMap<ResourceType, u64> {
        &self.items
    }

    /// Number of resource types with an entry, zero entries included.
    pub fn type_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocked().next().is_none()
    }

    /// Sum of every quantity.
    pub fn total_units(&self) -> u64 {
        self.items.values().sum()
    }

    pub fn into_items(self) -> BTreeMap<ResourceType, u64> {
        self.items
    }
}
