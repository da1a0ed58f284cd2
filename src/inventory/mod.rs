//! Player inventory: a slot-limited item store with a selection cursor.
//!
//! A stackable item takes one slot no matter how many units are held. A
//! non-stackable item takes one slot per unit, all units sharing one entry
//! whose quantity is its slot count. The whole store sits behind one mutex so
//! the HUD can read it while gameplay systems mutate it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::input::PlayerInput;
use crate::shared::*;

pub struct InventoryPlugin;

impl Plugin for InventoryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ItemRegistry>()
            .add_systems(Startup, size_inventory_from_config)
            .add_systems(
                Update,
                (handle_item_pickup, handle_item_removed, cycle_selection)
                    .run_if(in_state(GameState::Playing).or(in_state(GameState::Dialogue))),
            );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ITEMS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub stackable: bool,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, stackable: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stackable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub item: Item,
    pub quantity: u32,
}

impl StoredItem {
    fn slots(&self) -> usize {
        if self.item.stackable {
            1
        } else {
            self.quantity as usize
        }
    }
}

/// Every item the game knows about, keyed by id. Filled by `data`.
#[derive(Resource, Debug, Clone, Default)]
pub struct ItemRegistry {
    pub items: HashMap<ItemId, Item>,
}

impl ItemRegistry {
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn register(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn display_name(&self, id: &str) -> String {
        self.get(id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// INVENTORY
// ═══════════════════════════════════════════════════════════════════════

pub const DEFAULT_CAPACITY: usize = 12;

#[derive(Debug, Default)]
struct Store {
    /// Entries in first-insertion order; ids are unique.
    entries: Vec<StoredItem>,
    capacity: usize,
    selected: Option<usize>,
}

impl Store {
    fn slots_used(&self) -> usize {
        self.entries.iter().map(StoredItem::slots).sum()
    }

    fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.slots_used())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.item.id == id)
    }

    /// Id owning the `slot`-th occupied slot in insertion order.
    fn id_at_slot(&self, slot: usize) -> Option<&str> {
        let mut remaining = slot;
        for entry in &self.entries {
            let n = entry.slots();
            if remaining < n {
                return Some(&entry.item.id);
            }
            remaining -= n;
        }
        None
    }

    fn clamp_cursor(&mut self) {
        let used = self.slots_used();
        self.selected = match (self.selected, used) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), n) => Some(i.min(n - 1)),
        };
    }
}

/// Thread-safe player inventory.
///
/// Each method takes the lock once; there are no multi-call transactions.
#[derive(Resource, Debug)]
pub struct Inventory {
    store: Mutex<Store>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Mutex::new(Store {
                capacity,
                ..default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns how many units were actually added.
    pub fn add_item(&self, item: &Item, quantity: u32) -> u32 {
        if quantity == 0 {
            return 0;
        }
        let mut store = self.lock();

        let added = match store.position(&item.id) {
            Some(i) if store.entries[i].item.stackable => {
                let entry = &mut store.entries[i];
                let before = entry.quantity;
                entry.quantity = before.saturating_add(quantity);
                entry.quantity - before
            }
            Some(i) => {
                let fit = quantity.min(store.free_slots() as u32);
                store.entries[i].quantity += fit;
                fit
            }
            None if item.stackable => {
                if store.free_slots() == 0 {
                    return 0;
                }
                store.entries.push(StoredItem {
                    item: item.clone(),
                    quantity,
                });
                quantity
            }
            None => {
                let fit = quantity.min(store.free_slots() as u32);
                if fit > 0 {
                    store.entries.push(StoredItem {
                        item: item.clone(),
                        quantity: fit,
                    });
                }
                fit
            }
        };

        if added > 0 {
            store.clamp_cursor();
        }
        added
    }

    /// Returns how many units were actually removed.
    pub fn remove_item(&self, id: &str, quantity: u32) -> u32 {
        let mut store = self.lock();
        let Some(i) = store.position(id) else {
            return 0;
        };

        let removed = quantity.min(store.entries[i].quantity);
        store.entries[i].quantity -= removed;
        if store.entries[i].quantity == 0 {
            store.entries.remove(i);
        }
        store.clamp_cursor();
        removed
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.lock().position(id).is_some()
    }

    pub fn quantity_of(&self, id: &str) -> u32 {
        let store = self.lock();
        store
            .position(id)
            .map(|i| store.entries[i].quantity)
            .unwrap_or(0)
    }

    pub fn slots_used(&self) -> usize {
        self.lock().slots_used()
    }

    /// Snapshot of all entries in insertion order.
    pub fn list_items(&self) -> Vec<StoredItem> {
        self.lock().entries.clone()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Shrinking below the occupied slot count stops at that count.
    /// Returns the capacity actually applied.
    pub fn set_capacity(&self, capacity: usize) -> usize {
        let mut store = self.lock();
        store.capacity = capacity.max(store.slots_used());
        store.capacity
    }

    pub fn clear(&self) {
        let mut store = self.lock();
        store.entries.clear();
        store.selected = None;
    }

    // ─── Selection cursor ───────────────────────────────────────────────

    pub fn selected_index(&self) -> Option<usize> {
        self.lock().selected
    }

    pub fn select_next(&self) {
        let mut store = self.lock();
        let used = store.slots_used();
        store.selected = match (store.selected, used) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), n) => Some((i + 1) % n),
        };
    }

    pub fn select_previous(&self) {
        let mut store = self.lock();
        let used = store.slots_used();
        store.selected = match (store.selected, used) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(0), n) => Some(n - 1),
            (Some(i), _) => Some(i - 1),
        };
    }

    /// Out-of-range indices fall back to the first slot.
    pub fn select_slot(&self, index: usize) {
        let mut store = self.lock();
        let used = store.slots_used();
        store.selected = if used == 0 {
            None
        } else if index < used {
            Some(index)
        } else {
            Some(0)
        };
    }

    /// Id under the cursor, or an empty string when nothing is held.
    pub fn selected_item_id(&self) -> ItemId {
        let store = self.lock();
        store
            .selected
            .and_then(|i| store.id_at_slot(i))
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Id of every occupied slot, in cursor order.
    pub fn slot_ids(&self) -> Vec<ItemId> {
        let store = self.lock();
        store
            .entries
            .iter()
            .flat_map(|e| std::iter::repeat(e.item.id.clone()).take(e.slots()))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

fn size_inventory_from_config(config: Res<GameConfig>, inventory: Res<Inventory>) {
    inventory.set_capacity(config.inventory_capacity);
}

pub fn handle_item_pickup(
    mut events: EventReader<ItemPickupEvent>,
    registry: Res<ItemRegistry>,
    inventory: Res<Inventory>,
    mut toasts: EventWriter<ToastEvent>,
    mut sfx: EventWriter<PlaySfxEvent>,
) {
    for event in events.read() {
        let Some(item) = registry.get(&event.item_id) else {
            warn!("[Inventory] pickup of unknown item '{}'", event.item_id);
            continue;
        };

        let added = inventory.add_item(item, event.quantity);
        if added > 0 {
            toasts.send(ToastEvent::new(format!("Got {} x{}", item.name, added)));
            sfx.send(PlaySfxEvent(Sfx::Pickup));
        }
        if added < event.quantity {
            toasts.send(ToastEvent::new("Inventory full!"));
            sfx.send(PlaySfxEvent(Sfx::Error));
        }
    }
}

pub fn handle_item_removed(mut events: EventReader<ItemRemovedEvent>, inventory: Res<Inventory>) {
    for event in events.read() {
        let removed = inventory.remove_item(&event.item_id, event.quantity);
        debug!(
            "[Inventory] removed {}/{} of '{}'",
            removed, event.quantity, event.item_id
        );
    }
}

fn cycle_selection(input: Res<PlayerInput>, inventory: Res<Inventory>) {
    if input.inventory_next {
        inventory.select_next();
    }
    if input.inventory_prev {
        inventory.select_previous();
    }
    if let Some(slot) = input.inventory_slot {
        inventory.select_slot(slot as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn potion() -> Item {
        Item::new("potion", "Potion", true)
    }

    fn sword() -> Item {
        Item::new("sword", "Sword", false)
    }

    fn shield() -> Item {
        Item::new("shield", "Shield", false)
    }

    #[test]
    fn test_zero_quantity_is_a_no_op() {
        let inv = Inventory::with_capacity(4);
        assert_eq!(inv.add_item(&potion(), 0), 0);
        assert_eq!(inv.slots_used(), 0);
        assert!(!inv.has_item("potion"));
    }

    #[test]
    fn test_stackable_items_share_one_slot() {
        let inv = Inventory::with_capacity(4);
        assert_eq!(inv.add_item(&potion(), 3), 3);
        assert_eq!(inv.add_item(&potion(), 5), 5);
        assert_eq!(inv.quantity_of("potion"), 8);
        assert_eq!(inv.slots_used(), 1);
    }

    #[test]
    fn test_existing_stack_grows_even_when_full() {
        let inv = Inventory::with_capacity(1);
        inv.add_item(&potion(), 1);
        assert_eq!(inv.add_item(&potion(), 10), 10);
        assert_eq!(inv.quantity_of("potion"), 11);
    }

    #[test]
    fn test_saturated_stack_reports_what_fit() {
        let inv = Inventory::with_capacity(1);
        inv.add_item(&potion(), u32::MAX - 2);
        assert_eq!(inv.add_item(&potion(), 10), 2);
        assert_eq!(inv.quantity_of("potion"), u32::MAX);
        assert_eq!(inv.add_item(&potion(), 1), 0);
    }

    #[test]
    fn test_non_stackable_partial_add_fills_free_slots() {
        let inv = Inventory::with_capacity(5);
        inv.add_item(&potion(), 1);
        inv.add_item(&shield(), 1);

        assert_eq!(inv.add_item(&sword(), 7), 3);
        assert_eq!(inv.slots_used(), 5);
        assert_eq!(inv.quantity_of("sword"), 3);
        assert_eq!(inv.add_item(&sword(), 1), 0);
    }

    #[test]
    fn test_capacity_scenario_rejects_new_stack_when_full() {
        let inv = Inventory::with_capacity(2);
        assert_eq!(inv.add_item(&sword(), 1), 1);
        assert_eq!(inv.slots_used(), 1);
        assert_eq!(inv.add_item(&shield(), 1), 1);
        assert_eq!(inv.slots_used(), 2);
        assert_eq!(inv.add_item(&potion(), 1), 0);
        assert_eq!(inv.slots_used(), 2);
        assert!(!inv.has_item("potion"));
    }

    #[test]
    fn test_remove_clamps_and_erases() {
        let inv = Inventory::with_capacity(4);
        inv.add_item(&potion(), 3);

        assert_eq!(inv.remove_item("potion", 1), 1);
        assert_eq!(inv.quantity_of("potion"), 2);
        assert_eq!(inv.remove_item("potion", 10), 2);
        assert!(!inv.has_item("potion"));
        assert_eq!(inv.slots_used(), 0);
        assert_eq!(inv.remove_item("ghost", 1), 0);
    }

    #[test]
    fn test_removing_non_stackable_units_frees_slots() {
        let inv = Inventory::with_capacity(3);
        inv.add_item(&sword(), 3);
        inv.remove_item("sword", 2);
        assert_eq!(inv.slots_used(), 1);
        assert_eq!(inv.add_item(&potion(), 1), 1);
    }

    #[test]
    fn test_list_items_keeps_insertion_order() {
        let inv = Inventory::with_capacity(6);
        inv.add_item(&shield(), 1);
        inv.add_item(&potion(), 2);
        inv.add_item(&sword(), 1);

        let ids: Vec<_> = inv.list_items().into_iter().map(|s| s.item.id).collect();
        assert_eq!(ids, vec!["shield", "potion", "sword"]);
    }

    #[test]
    fn test_set_capacity_never_drops_below_used() {
        let inv = Inventory::with_capacity(5);
        inv.add_item(&sword(), 3);
        assert_eq!(inv.set_capacity(1), 3);
        assert_eq!(inv.capacity(), 3);
        assert_eq!(inv.set_capacity(8), 8);
    }

    #[test]
    fn test_cursor_wraps_both_ways() {
        let inv = Inventory::with_capacity(5);
        inv.add_item(&potion(), 1);
        inv.add_item(&shield(), 1);
        inv.add_item(&sword(), 1);
        assert_eq!(inv.selected_index(), Some(0));

        for _ in 0..3 {
            inv.select_next();
        }
        assert_eq!(inv.selected_index(), Some(0));

        inv.select_previous();
        assert_eq!(inv.selected_index(), Some(2));
        assert_eq!(inv.selected_item_id(), "sword");
    }

    #[test]
    fn test_cursor_walks_each_non_stackable_unit() {
        let inv = Inventory::with_capacity(5);
        inv.add_item(&sword(), 2);
        inv.add_item(&potion(), 4);

        assert_eq!(inv.slot_ids(), vec!["sword", "sword", "potion"]);
        inv.select_slot(1);
        assert_eq!(inv.selected_item_id(), "sword");
        inv.select_slot(2);
        assert_eq!(inv.selected_item_id(), "potion");
    }

    #[test]
    fn test_select_slot_out_of_range_resets_to_first() {
        let inv = Inventory::with_capacity(5);
        inv.add_item(&potion(), 1);
        inv.add_item(&shield(), 1);
        inv.select_slot(1);
        inv.select_slot(9);
        assert_eq!(inv.selected_index(), Some(0));
        assert_eq!(inv.selected_item_id(), "potion");
    }

    #[test]
    fn test_removing_selected_item_clamps_cursor() {
        let inv = Inventory::with_capacity(5);
        inv.add_item(&potion(), 1);
        inv.add_item(&shield(), 1);
        inv.select_slot(1);

        inv.remove_item("shield", 1);
        assert_eq!(inv.selected_index(), Some(0));
        assert_eq!(inv.selected_item_id(), "potion");

        inv.remove_item("potion", 1);
        assert_eq!(inv.selected_index(), None);
        assert_eq!(inv.selected_item_id(), "");
    }

    #[test]
    fn test_empty_inventory_has_no_selection() {
        let inv = Inventory::with_capacity(3);
        inv.select_next();
        inv.select_previous();
        inv.select_slot(0);
        assert_eq!(inv.selected_index(), None);
        assert_eq!(inv.selected_item_id(), "");
    }

    #[test]
    fn test_concurrent_adds_are_all_counted() {
        let inv = std::sync::Arc::new(Inventory::with_capacity(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let inv = inv.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        inv.add_item(&potion(), 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(inv.quantity_of("potion"), 800);
        assert_eq!(inv.slots_used(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, u32),
        Remove(usize, u32),
        Capacity(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize, 0..6u32).prop_map(|(i, q)| Op::Add(i, q)),
            (0..4usize, 0..6u32).prop_map(|(i, q)| Op::Remove(i, q)),
            (0..10usize).prop_map(Op::Capacity),
        ]
    }

    proptest! {
        #[test]
        fn slots_never_exceed_capacity(cap in 0..8usize, ops in prop::collection::vec(op(), 0..60)) {
            let catalogue = [potion(), sword(), shield(), Item::new("ore", "Ore", true)];
            let inv = Inventory::with_capacity(cap);

            for op in ops {
                match op {
                    Op::Add(i, q) => { inv.add_item(&catalogue[i], q); }
                    Op::Remove(i, q) => { inv.remove_item(&catalogue[i].id, q); }
                    Op::Capacity(c) => { inv.set_capacity(c); }
                }
                prop_assert!(inv.slots_used() <= inv.capacity());
                match inv.selected_index() {
                    Some(i) => prop_assert!(i < inv.slots_used()),
                    None => prop_assert_eq!(inv.slots_used(), 0),
                }
            }
        }
    }
}
