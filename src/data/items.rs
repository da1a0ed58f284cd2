use crate::inventory::{Item, ItemRegistry};

/// Everything the player can carry.
///
/// Consumables and materials stack; gear and keys take one slot each.
pub fn populate_items(registry: &mut ItemRegistry) {
    let items = [
        ("potion", "Potion", true),
        ("herb", "Healing Herb", true),
        ("stone", "Stone", true),
        ("iron_ore", "Iron Ore", true),
        ("sword", "Sword", false),
        ("shield", "Shield", false),
        ("rusty_key", "Rusty Key", false),
        ("pickaxe", "Pickaxe", false),
        ("tumble_charm", "Tumble Charm", false),
    ];
    for (id, name, stackable) in items {
        registry.register(Item::new(id, name, stackable));
    }
}
