use std::collections::BTreeMap;
use std::num::NonZeroU32;

use cw_types::{
    OperationResult, ResourceAttributes, ResourceCatalog, ResourceType, Snapshot, Timestamp,
};

use crate::inventory::SourceInventory;

/// Units moved into the ledger by [`Ledger::deposit_all`], per resource type.
pub type Deposited = BTreeMap<ResourceType, u64>;

/// The authoritative resource ledger of one world.
///
/// Maps resource types to quantities and carries the time of the last
/// successful mutation. Entries that reach zero are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    items: BTreeMap<ResourceType, u64>,
    last_updated: Timestamp,
    dirty: bool,
}

impl Ledger {
    /// An empty ledger created at `created`.
    pub fn new(created: Timestamp) -> Self {
        Self {
            items: BTreeMap::new(),
            last_updated: created,
            dirty: false,
        }
    }

    /// Rebuild a ledger from a persisted snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let last_updated = snapshot.last_updated();
        Self {
            items: snapshot.into_items(),
            last_updated,
            dirty: false,
        }
    }

    /// Precondition shared by every deposit and withdrawal.
    pub fn validate(attributes: &ResourceAttributes) -> OperationResult {
        if !attributes.is_stackable() {
            OperationResult::NotStackable
        } else if !attributes.is_simple {
            OperationResult::NotSimple
        } else {
            OperationResult::Success
        }
    }

    /// Move exactly `count` plain units of `resource` from `inventory`.
    ///
    /// Fails with `NotInInventory` when the inventory holds fewer than
    /// `count` plain units; nothing is touched in that case.
    pub fn deposit_by_type<I, C>(
        &mut self,
        catalog: &C,
        inventory: &mut I,
        resource: &ResourceType,
        count: NonZeroU32,
    ) -> OperationResult
    where
        I: SourceInventory + ?Sized,
        C: ResourceCatalog + ?Sized,
    {
        let verdict = Self::validate(&catalog.default_attributes(resource));
        if !verdict.is_success() {
            return verdict;
        }

        let wanted = count.get();
        let available: u64 = (0..inventory.size())
            .filter_map(|i| inventory.slot_at(i))
            .filter(|stack| stack.is_plain(resource))
            .map(|stack| u64::from(stack.quantity))
            .sum();
        if available < u64::from(wanted) {
            return OperationResult::NotInInventory;
        }

        let mut remaining = wanted;
        for index in 0..inventory.size() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = inventory.slot_at(index) else {
                continue;
            };
            if !stack.is_plain(resource) {
                continue;
            }
            let taken = stack.quantity.min(remaining);
            inventory.shrink(index, taken);
            remaining -= taken;
        }

        self.credit(resource, u64::from(wanted));
        self.touch();
        OperationResult::Success
    }

    /// Move every eligible slot of `inventory` into the ledger.
    ///
    /// Slots failing [`validate`](Self::validate) stay where they are. An
    /// empty result means nothing changed.
    pub fn deposit_all<I, C>(&mut self, catalog: &C, inventory: &mut I) -> Deposited
    where
        I: SourceInventory + ?Sized,
        C: ResourceCatalog + ?Sized,
    {
        let mut deposited = Deposited::new();
        for index in 0..inventory.size() {
            let Some(stack) = inventory.slot_at(index) else {
                continue;
            };
            if stack.is_empty() || !Self::validate(&catalog.attributes_of(stack)).is_success() {
                continue;
            }
            let resource = stack.resource.clone();
            let quantity = stack.quantity;
            inventory.shrink(index, quantity);
            self.credit(&resource, u64::from(quantity));
            let total = deposited.entry(resource).or_insert(0);
            *total = total.saturating_add(u64::from(quantity));
        }
        if !deposited.is_empty() {
            self.touch();
        }
        deposited
    }

    /// Take `count` units of `resource` out of the ledger and hand them to
    /// `inventory`. Units that do not fit are passed to
    /// [`SourceInventory::drop_overflow`].
    pub fn withdraw_by_type<I, C>(
        &mut self,
        catalog: &C,
        inventory: &mut I,
        resource: &ResourceType,
        count: NonZeroU32,
    ) -> OperationResult
    where
        I: SourceInventory + ?Sized,
        C: ResourceCatalog + ?Sized,
    {
        let attributes = catalog.default_attributes(resource);
        let verdict = Self::validate(&attributes);
        if !verdict.is_success() {
            return verdict;
        }

        let wanted = count.get();
        let Some(stock) = self.items.get_mut(resource) else {
            return OperationResult::InsufficientStock;
        };
        if *stock < u64::from(wanted) {
            return OperationResult::InsufficientStock;
        }
        *stock -= u64::from(wanted);
        self.touch();

        let remainder = inventory.try_add(resource, wanted, attributes.max_stack_size);
        if remainder > 0 {
            inventory.drop_overflow(resource, remainder);
        }
        OperationResult::Success
    }

    /// Move up to `requested` units out of a single inventory slot.
    ///
    /// Takes whatever the slot holds when it holds less than `requested`.
    pub fn deposit_from_slot<I, C>(
        &mut self,
        catalog: &C,
        inventory: &mut I,
        slot: usize,
        requested: NonZeroU32,
    ) -> OperationResult
    where
        I: SourceInventory + ?Sized,
        C: ResourceCatalog + ?Sized,
    {
        if slot >= inventory.size() {
            return OperationResult::NotInInventory;
        }
        let Some(stack) = inventory.slot_at(slot).filter(|s| !s.is_empty()) else {
            return OperationResult::NotInInventory;
        };
        let verdict = Self::validate(&catalog.attributes_of(stack));
        if !verdict.is_success() {
            return verdict;
        }

        let resource = stack.resource.clone();
        let taken = stack.quantity.min(requested.get());
        inventory.shrink(slot, taken);
        self.credit(&resource, u64::from(taken));
        self.touch();
        OperationResult::Success
    }

    /// Stock of `resource`, zero when absent.
    pub fn quantity(&self, resource: &ResourceType) -> u64 {
        self.items.get(resource).copied().unwrap_or(0)
    }

    /// Point-in-time copy for persistence and broadcast.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.items.clone(), self.last_updated)
    }

    /// Every entry, zero quantities included, ordered by resource type.
    pub fn entries(&self) -> impl Iterator<Item = (&ResourceType, u64)> {
        self.items.iter().map(|(k, v)| (k, *v))
    }

    pub fn type_count(&self) -> usize {
        self.items.len()
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    /// Whether the ledger changed since it was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn credit(&mut self, resource: &ResourceType, amount: u64) {
        let entry = self.items.entry(resource.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    fn touch(&mut self) {
        self.last_updated = self.last_updated.advance();
        self.dirty = true;
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Timestamp::now())
    }
}
