use cw_types::{ItemStack, ResourceType};
use tracing::debug;

/// Main inventory plus hotbar of a player.
pub const PLAYER_INVENTORY_SIZE: usize = 36;

/// A host inventory: a fixed-size ordered sequence of slots.
///
/// The ledger reads slots and instructs the host to shrink them; it never
/// holds on to slot references across calls. Placement of withdrawn units is
/// host-defined through [`try_add`](Self::try_add) and
/// [`drop_overflow`](Self::drop_overflow).
pub trait SourceInventory {
    /// Number of slots, empty ones included.
    fn size(&self) -> usize;

    /// Contents of slot `index`, or `None` when empty or out of range.
    fn slot_at(&self, index: usize) -> Option<&ItemStack>;

    /// Remove up to `amount` units from slot `index`, emptying it at zero.
    fn shrink(&mut self, index: usize, amount: u32);

    /// Place `amount` plain units of `resource`, returning what did not fit.
    fn try_add(&mut self, resource: &ResourceType, amount: u32, max_stack_size: u32) -> u32;

    /// Host fallback for units that did not fit (e.g. drop them in the world).
    fn drop_overflow(&mut self, resource: &ResourceType, amount: u32);

    /// Sum of every slot's quantity.
    fn total_units(&self) -> u64 {
        (0..self.size())
            .filter_map(|i| self.slot_at(i))
            .map(|stack| u64::from(stack.quantity))
            .sum()
    }

    /// Copy of every slot, in order.
    fn to_slots(&self) -> Vec<Option<ItemStack>> {
        (0..self.size()).map(|i| self.slot_at(i).cloned()).collect()
    }
}

/// Vector-backed inventory for tests, demos, and hosts without their own.
///
/// Overflow from [`SourceInventory::drop_overflow`] is recorded in
/// [`dropped`](Self::dropped) rather than lost.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotInventory {
    slots: Vec<Option<ItemStack>>,
    dropped: Vec<ItemStack>,
}

impl SlotInventory {
    /// An empty inventory with `size` slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            dropped: Vec::new(),
        }
    }

    /// An empty player-sized inventory.
    pub fn player() -> Self {
        Self::new(PLAYER_INVENTORY_SIZE)
    }

    pub fn from_slots(slots: Vec<Option<ItemStack>>) -> Self {
        Self {
            slots,
            dropped: Vec::new(),
        }
    }

    /// Overwrite slot `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, stack: Option<ItemStack>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack.filter(|s| !s.is_empty());
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, index: usize, stack: ItemStack) -> Self {
        self.set(index, Some(stack));
        self
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Units that overflowed during placement.
    pub fn dropped(&self) -> &[ItemStack] {
        &self.dropped
    }

    pub fn dropped_units(&self) -> u64 {
        self.dropped.iter().map(|s| u64::from(s.quantity)).sum()
    }
}

impl SourceInventory for SlotInventory {
    fn size(&self) -> usize {
        self.slots.len()
    }

    fn slot_at(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn shrink(&mut self, index: usize, amount: u32) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if let Some(stack) = slot {
            if stack.quantity <= amount {
                *slot = None;
            } else {
                stack.quantity -= amount;
            }
        }
    }

    fn try_add(&mut self, resource: &ResourceType, amount: u32, max_stack_size: u32) -> u32 {
        let max = max_stack_size.max(1);
        let mut remaining = amount;

        // Top up existing plain stacks first.
        for stack in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.is_plain(resource) && stack.quantity < max {
                let moved = (max - stack.quantity).min(remaining);
                stack.quantity += moved;
                remaining -= moved;
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = max.min(remaining);
                *slot = Some(ItemStack::simple(resource.clone(), moved));
                remaining -= moved;
            }
        }

        remaining
    }

    fn drop_overflow(&mut self, resource: &ResourceType, amount: u32) {
        if amount == 0 {
            return;
        }
        debug!(%resource, amount, "inventory full; dropping overflow");
        self.dropped.push(ItemStack::simple(resource.clone(), amount));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rt(id: &str) -> ResourceType {
        ResourceType::new(id).unwrap()
    }

    #[test]
    fn shrink_partial_and_full() {
        let wheat = rt("wheat");
        let mut inv = SlotInventory::new(2).with(0, ItemStack::simple(wheat.clone(), 10));
        inv.shrink(0, 4);
        assert_eq!(inv.slot_at(0).unwrap().quantity, 6);
        inv.shrink(0, 6);
        assert!(inv.slot_at(0).is_none());
        // Out of range and empty slots are ignored.
        inv.shrink(1, 1);
        inv.shrink(9, 1);
    }

    #[test]
    fn try_add_tops_up_before_using_empty_slots() {
        let wheat = rt("wheat");
        let mut inv = SlotInventory::new(3)
            .with(1, ItemStack::simple(wheat.clone(), 60));
        let remainder = inv.try_add(&wheat, 10, 64);
        assert_eq!(remainder, 0);
        assert_eq!(inv.slot_at(1).unwrap().quantity, 64);
        assert_eq!(inv.slot_at(0).unwrap().quantity, 6);
        assert!(inv.slot_at(2).is_none());
    }

    #[test]
    fn try_add_skips_stacks_with_extra_data() {
        let wheat = rt("wheat");
        let mut inv = SlotInventory::new(2)
            .with(0, ItemStack::with_extra_data(wheat.clone(), 1));
        assert_eq!(inv.try_add(&wheat, 5, 64), 0);
        assert_eq!(inv.slot_at(0).unwrap().quantity, 1);
        assert_eq!(inv.slot_at(1).unwrap(), &ItemStack::simple(wheat, 5));
    }

    #[test]
    fn try_add_reports_remainder_when_full() {
        let egg = rt("egg");
        let mut inv = SlotInventory::new(2);
        assert_eq!(inv.try_add(&egg, 40, 16), 8);
        assert_eq!(inv.total_units(), 32);
    }

    #[test]
    fn drop_overflow_is_recorded() {
        let egg = rt("egg");
        let mut inv = SlotInventory::new(0);
        inv.drop_overflow(&egg, 3);
        inv.drop_overflow(&egg, 0);
        assert_eq!(inv.dropped(), &[ItemStack::simple(egg, 3)]);
        assert_eq!(inv.dropped_units(), 3);
    }

    #[test]
    fn set_ignores_empty_stacks() {
        let mut inv = SlotInventory::new(1);
        inv.set(0, Some(ItemStack::simple(rt("dirt"), 0)));
        assert!(inv.slot_at(0).is_none());
        assert_eq!(inv.to_slots(), vec![None]);
    }
}
