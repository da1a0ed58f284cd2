use bevy::prelude::*;

use crate::inventory::{Inventory, ItemRegistry};
use crate::shared::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Chest {
    pub is_open: bool,
    pub loot: Vec<(ItemId, u32)>,
    /// Consumed on opening (a key).
    pub required_item: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChestOutcome {
    Opened { loot: Vec<(ItemId, u32)> },
    AlreadyOpen,
    Locked { required: ItemId },
    InventoryFull,
}

impl Chest {
    pub fn new(loot: Vec<(ItemId, u32)>, required_item: Option<ItemId>) -> Self {
        Self {
            is_open: false,
            loot,
            required_item,
        }
    }

    /// Opens at most once. Nothing changes unless every loot entry fits.
    pub fn open(&mut self, inventory: &Inventory, registry: &ItemRegistry) -> ChestOutcome {
        if self.is_open {
            return ChestOutcome::AlreadyOpen;
        }
        if let Some(key) = &self.required_item {
            if !inventory.has_item(key) {
                return ChestOutcome::Locked {
                    required: key.clone(),
                };
            }
        }

        let freed = self
            .required_item
            .as_ref()
            .map_or(0, |key| slots_freed_by_taking_one(inventory, registry, key));
        let free = (inventory.capacity() + freed).saturating_sub(inventory.slots_used());
        if self.slots_needed(inventory, registry) > free {
            return ChestOutcome::InventoryFull;
        }

        if let Some(key) = &self.required_item {
            inventory.remove_item(key, 1);
        }
        let mut granted = Vec::new();
        for (id, quantity) in &self.loot {
            let Some(item) = registry.get(id) else {
                warn!("[Chest] unknown loot item '{}'", id);
                continue;
            };
            let added = inventory.add_item(item, *quantity);
            if added > 0 {
                granted.push((id.clone(), added));
            }
        }
        self.is_open = true;
        ChestOutcome::Opened { loot: granted }
    }

    fn slots_needed(&self, inventory: &Inventory, registry: &ItemRegistry) -> usize {
        self.loot
            .iter()
            .filter_map(|(id, qty)| registry.get(id).map(|item| (item, *qty)))
            .map(|(item, qty)| match (item.stackable, inventory.has_item(&item.id)) {
                (true, true) => 0,
                (true, false) => 1,
                (false, _) => qty as usize,
            })
            .sum()
    }
}

fn slots_freed_by_taking_one(inventory: &Inventory, registry: &ItemRegistry, id: &str) -> usize {
    match registry.get(id) {
        Some(item) if item.stackable => usize::from(inventory.quantity_of(id) == 1),
        Some(_) => usize::from(inventory.quantity_of(id) > 0),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Item;

    fn registry() -> ItemRegistry {
        let mut registry = ItemRegistry::default();
        registry.register(Item::new("potion", "Potion", true));
        registry.register(Item::new("sword", "Sword", false));
        registry.register(Item::new("rusty_key", "Rusty Key", false));
        registry
    }

    #[test]
    fn test_open_grants_loot_once() {
        let registry = registry();
        let inv = Inventory::with_capacity(5);
        let mut chest = Chest::new(vec![("potion".into(), 3)], None);

        assert_eq!(
            chest.open(&inv, &registry),
            ChestOutcome::Opened {
                loot: vec![("potion".into(), 3)]
            }
        );
        assert_eq!(chest.open(&inv, &registry), ChestOutcome::AlreadyOpen);
        assert_eq!(inv.quantity_of("potion"), 3);
    }

    #[test]
    fn test_locked_chest_consumes_key() {
        let registry = registry();
        let inv = Inventory::with_capacity(5);
        let mut chest = Chest::new(vec![("sword".into(), 1)], Some("rusty_key".into()));

        assert_eq!(
            chest.open(&inv, &registry),
            ChestOutcome::Locked {
                required: "rusty_key".into()
            }
        );
        assert!(!chest.is_open);

        inv.add_item(registry.get("rusty_key").unwrap(), 1);
        assert!(matches!(chest.open(&inv, &registry), ChestOutcome::Opened { .. }));
        assert!(!inv.has_item("rusty_key"));
        assert!(inv.has_item("sword"));
    }

    #[test]
    fn test_key_slot_is_reused_for_loot() {
        let registry = registry();
        let inv = Inventory::with_capacity(1);
        inv.add_item(registry.get("rusty_key").unwrap(), 1);
        let mut chest = Chest::new(vec![("sword".into(), 1)], Some("rusty_key".into()));

        assert!(matches!(chest.open(&inv, &registry), ChestOutcome::Opened { .. }));
        assert_eq!(inv.slots_used(), 1);
    }

    #[test]
    fn test_stays_closed_when_loot_does_not_fit() {
        let registry = registry();
        let inv = Inventory::with_capacity(2);
        inv.add_item(registry.get("potion").unwrap(), 1);
        let mut chest = Chest::new(vec![("sword".into(), 2)], None);

        assert_eq!(chest.open(&inv, &registry), ChestOutcome::InventoryFull);
        assert!(!chest.is_open);
        assert!(!inv.has_item("sword"));

        // Stacking onto an existing entry needs no slot.
        let mut refill = Chest::new(vec![("potion".into(), 9)], None);
        inv.add_item(registry.get("sword").unwrap(), 1);
        assert!(matches!(refill.open(&inv, &registry), ChestOutcome::Opened { .. }));
        assert_eq!(inv.quantity_of("potion"), 10);
    }
}
