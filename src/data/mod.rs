//! Data layer: populates all registries at game startup.
//!
//! This plugin runs in OnEnter(GameState::Loading), fills every registry
//! (ItemRegistry, NpcRegistry, DialogueRegistry, EnemyRegistry) from the
//! hard-coded game-design data in the submodules, asks for the starting map
//! and moves the game into GameState::Playing.

mod enemies;
mod items;
mod npcs;

use bevy::prelude::*;

use crate::combat::enemy::EnemyRegistry;
use crate::config::GameConfig;
use crate::dialogue::DialogueRegistry;
use crate::interact::NpcRegistry;
use crate::inventory::ItemRegistry;
use crate::shared::*;

pub use enemies::populate_enemies;
pub use items::populate_items;
pub use npcs::populate_npcs;

pub struct DataPlugin;

impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Loading), load_all_data);
    }
}

#[allow(clippy::too_many_arguments)]
fn load_all_data(
    config: Res<GameConfig>,
    mut item_registry: ResMut<ItemRegistry>,
    mut npc_registry: ResMut<NpcRegistry>,
    mut dialogue_registry: ResMut<DialogueRegistry>,
    mut enemy_registry: ResMut<EnemyRegistry>,
    mut transitions: EventWriter<MapTransitionEvent>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    info!("DataPlugin: populating registries…");

    populate_items(&mut item_registry);
    info!("  Items loaded: {}", item_registry.items.len());

    populate_npcs(&mut npc_registry, &mut dialogue_registry);
    info!(
        "  NPCs loaded: {}, dialogue trees: {}",
        npc_registry.npcs.len(),
        dialogue_registry.trees.len()
    );

    populate_enemies(&mut enemy_registry);
    info!("  Enemies loaded: {}", enemy_registry.enemies.len());

    transitions.send(MapTransitionEvent {
        map_path: config.start_map.clone(),
        spawn_name: Some(config.start_spawn.clone()),
    });
    next_state.set(GameState::Playing);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_attacks_are_valid() {
        let mut registry = EnemyRegistry::default();
        populate_enemies(&mut registry);
        assert!(!registry.enemies.is_empty());
        for def in registry.enemies.values() {
            assert!(!def.attacks.is_empty(), "{} has no attacks", def.id);
            for attack in &def.attacks {
                assert_eq!(attack.validate(), Ok(()), "{}: {}", def.id, attack.name);
            }
        }
    }

    #[test]
    fn test_dialogue_links_resolve() {
        let mut npcs = NpcRegistry::default();
        let mut trees = DialogueRegistry::default();
        populate_npcs(&mut npcs, &mut trees);

        for npc in npcs.npcs.values() {
            assert!(trees.get(&npc.dialogue).is_some(), "{} has no tree", npc.id);
        }
        for tree in trees.trees.values() {
            assert!(tree.nodes.contains_key(&tree.start), "{} start", tree.id);
            for node in tree.nodes.values() {
                let links = node
                    .next
                    .iter()
                    .chain(node.choices.iter().filter_map(|c| c.next.as_ref()));
                for link in links {
                    assert!(tree.nodes.contains_key(link), "{} -> {}", tree.id, link);
                }
            }
        }
    }

    #[test]
    fn test_dialogue_items_exist() {
        use crate::dialogue::DialogueAction;

        let mut items = ItemRegistry::default();
        populate_items(&mut items);
        let mut npcs = NpcRegistry::default();
        let mut trees = DialogueRegistry::default();
        populate_npcs(&mut npcs, &mut trees);

        for tree in trees.trees.values() {
            for node in tree.nodes.values() {
                for action in &node.actions {
                    if let DialogueAction::GiveItem { item_id, .. }
                    | DialogueAction::TakeItem { item_id, .. } = action
                    {
                        assert!(items.get(item_id).is_some(), "unknown item {}", item_id);
                    }
                }
            }
        }
    }
}
