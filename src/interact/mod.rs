//! World objects the player can use: chests, stones and NPCs.
//!
//! `Interactable` is a closed set. Each variant keeps its own state and the
//! single `interact` entry point switches over it; the systems here turn the
//! returned outcome into events.

use std::collections::HashSet;

use bevy::prelude::*;

pub mod chest;
pub mod npc;
pub mod stone;

use crate::animation::{AnimationSet, Animator};
use crate::config::GameConfig;
use crate::input::PlayerInput;
use crate::inventory::{Inventory, ItemRegistry};
use crate::shared::*;
use crate::world::{MapObject, MapObjectKind, TileManager};

pub use chest::{Chest, ChestOutcome};
pub use npc::Npc;
pub use stone::{Stone, StoneProgress, PICKAXE};

pub struct InteractPlugin;

impl Plugin for InteractPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OpenedChests>()
            .init_resource::<NpcRegistry>()
            .add_systems(Update, spawn_interactables)
            .add_systems(
                Update,
                (player_interact, update_stones)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(
                Update,
                move_npcs.run_if(in_state(GameState::Playing).or(in_state(GameState::Dialogue))),
            );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════

#[derive(Component, Debug, Clone, PartialEq)]
pub enum Interactable {
    Chest(Chest),
    Stone(Stone),
    Npc(Npc),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractOutcome {
    Chest(ChestOutcome),
    StartMining,
    NeedsTool(ItemId),
    Talk { tree_id: String },
}

impl Interactable {
    pub fn interact(&mut self, inventory: &Inventory, registry: &ItemRegistry) -> InteractOutcome {
        match self {
            Interactable::Chest(chest) => InteractOutcome::Chest(chest.open(inventory, registry)),
            Interactable::Stone(stone) => {
                if inventory.has_item(PICKAXE) {
                    stone.start_mining();
                    InteractOutcome::StartMining
                } else {
                    InteractOutcome::NeedsTool(PICKAXE.to_string())
                }
            }
            Interactable::Npc(npc) => InteractOutcome::Talk {
                tree_id: npc.dialogue.clone(),
            },
        }
    }
}

/// True when the player stands within `radius` of the object's origin.
pub fn can_interact(origin: Vec2, player: Vec2, radius: f32) -> bool {
    origin.distance_squared(player) <= radius * radius
}

/// Set on the player while it swings at a stone.
#[derive(Component, Debug, Clone, Copy)]
pub struct MiningTarget(pub Entity);

/// Chests opened this session, keyed by `map#name`, so they stay open when
/// the player comes back.
#[derive(Resource, Debug, Default)]
pub struct OpenedChests(pub HashSet<String>);

#[derive(Debug, Clone)]
pub struct NpcDef {
    pub id: String,
    pub name: String,
    pub dialogue: String,
    pub color: Color,
    pub speed: f32,
}

#[derive(Resource, Debug, Default)]
pub struct NpcRegistry {
    pub npcs: std::collections::HashMap<String, NpcDef>,
}

// ═══════════════════════════════════════════════════════════════════════
// SPAWNING
// ═══════════════════════════════════════════════════════════════════════

/// Parses `"potion:2, rusty_key"` into item/quantity pairs.
pub fn parse_item_list(text: &str) -> Vec<(ItemId, u32)> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((id, qty)) => (id.trim().to_string(), qty.trim().parse().unwrap_or(1)),
            None => (entry.to_string(), 1),
        })
        .collect()
}

fn chest_key(map: &str, object: &MapObject) -> String {
    format!("{}#{}", map, object.name)
}

fn spawn_interactables(
    mut commands: Commands,
    mut events: EventReader<MapLoadedEvent>,
    tiles: Res<TileManager>,
    opened: Res<OpenedChests>,
    npcs: Res<NpcRegistry>,
) {
    let Some(loaded) = events.read().last() else {
        return;
    };

    for object in tiles.objects() {
        let (interactable, size, color, solid) = match object.kind {
            MapObjectKind::Chest => {
                let mut chest = Chest::new(
                    parse_item_list(object.property("loot").unwrap_or_default()),
                    object.property("requires").map(str::to_string),
                );
                chest.is_open = opened.0.contains(&chest_key(&loaded.path, object));
                let color = if chest.is_open {
                    Color::srgb(0.35, 0.25, 0.15)
                } else {
                    Color::srgb(0.6, 0.4, 0.2)
                };
                (Interactable::Chest(chest), Vec2::new(14.0, 12.0), color, true)
            }
            MapObjectKind::Stone => {
                let drop = parse_item_list(object.property("drop").unwrap_or("stone:1"))
                    .into_iter()
                    .next();
                let stone = Stone::new(
                    object.property_or("hits", 3),
                    object.property_or("hit_frame", 2),
                    drop,
                );
                (
                    Interactable::Stone(stone),
                    Vec2::new(14.0, 14.0),
                    Color::srgb(0.5, 0.5, 0.55),
                    true,
                )
            }
            MapObjectKind::Npc => {
                let id = object.property("npc").unwrap_or(object.name.as_str());
                let (npc, color) = match npcs.npcs.get(id) {
                    Some(def) => {
                        let mut npc = Npc::new(&def.id, &def.name, &def.dialogue);
                        npc.speed = def.speed;
                        (npc, def.color)
                    }
                    None => {
                        warn!("[Npc] no definition for '{}'", id);
                        (
                            Npc::new(id, &object.name, "default"),
                            Color::srgb(0.8, 0.8, 0.3),
                        )
                    }
                };
                (Interactable::Npc(npc), Vec2::new(12.0, 16.0), color, true)
            }
            _ => continue,
        };

        let is_npc = matches!(interactable, Interactable::Npc(_));
        let mut entity = commands.spawn((
            MapEntity,
            Name::new(object.name.clone()),
            interactable,
            LogicalPosition(object.center()),
            YSorted,
            Footprint(Vec2::new(size.x, size.y * 0.5)),
            Tint(color),
            Sprite {
                color,
                custom_size: Some(size),
                ..default()
            },
            Transform::default(),
            Visibility::default(),
        ));
        if solid {
            entity.insert(Solid);
        }
        if is_npc {
            entity.insert((Body::default(), AnimationSet::humanoid(), Animator::default()));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

#[allow(clippy::too_many_arguments)]
fn player_interact(
    mut commands: Commands,
    input: Res<PlayerInput>,
    config: Res<GameConfig>,
    inventory: Res<Inventory>,
    registry: Res<ItemRegistry>,
    player_state: Res<PlayerState>,
    mut opened: ResMut<OpenedChests>,
    mut player: Query<(Entity, &LogicalPosition, &mut Body), With<Player>>,
    mut targets: Query<
        (Entity, &LogicalPosition, &mut Interactable, &mut Tint, Option<&Name>, Option<&mut Body>),
        Without<Player>,
    >,
    mut dialogue_events: EventWriter<DialogueStartEvent>,
    mut toasts: EventWriter<ToastEvent>,
    mut sfx: EventWriter<PlaySfxEvent>,
) {
    if !input.interact {
        return;
    }
    let Ok((player_entity, player_pos, mut player_body)) = player.get_single_mut() else {
        return;
    };
    let radius = config.interaction_radius;

    let nearest = targets
        .iter()
        .filter(|(_, pos, ..)| can_interact(pos.0, player_pos.0, radius))
        .min_by(|a, b| {
            a.1 .0
                .distance_squared(player_pos.0)
                .total_cmp(&b.1 .0.distance_squared(player_pos.0))
        })
        .map(|(entity, ..)| entity);
    let Some(target) = nearest else {
        return;
    };
    let Ok((entity, pos, mut interactable, mut tint, name, body)) = targets.get_mut(target) else {
        return;
    };

    match interactable.interact(&inventory, &registry) {
        InteractOutcome::Chest(ChestOutcome::Opened { loot }) => {
            if let Some(name) = name {
                opened
                    .0
                    .insert(format!("{}#{}", player_state.current_map, name.as_str()));
            }
            tint.0 = Color::srgb(0.35, 0.25, 0.15);
            sfx.send(PlaySfxEvent(Sfx::ChestOpen));
            if loot.is_empty() {
                toasts.send(ToastEvent::new("The chest is empty."));
            }
            for (id, qty) in loot {
                toasts.send(ToastEvent::new(format!(
                    "Found {} x{}",
                    registry.display_name(&id),
                    qty
                )));
            }
        }
        InteractOutcome::Chest(ChestOutcome::AlreadyOpen) => {}
        InteractOutcome::Chest(ChestOutcome::Locked { required }) => {
            toasts.send(ToastEvent::new(format!(
                "Locked. You need a {}.",
                registry.display_name(&required)
            )));
            sfx.send(PlaySfxEvent(Sfx::Locked));
        }
        InteractOutcome::Chest(ChestOutcome::InventoryFull) => {
            toasts.send(ToastEvent::new("No room for the chest's contents."));
            sfx.send(PlaySfxEvent(Sfx::Error));
        }
        InteractOutcome::StartMining => {
            player_body.anim = AnimState::Mining;
            player_body.facing = Facing::from_velocity(pos.0 - player_pos.0).unwrap_or(player_body.facing);
            commands.entity(player_entity).insert(MiningTarget(entity));
        }
        InteractOutcome::NeedsTool(tool) => {
            toasts.send(ToastEvent::new(format!(
                "You need a {} to break this.",
                registry.display_name(&tool)
            )));
        }
        InteractOutcome::Talk { tree_id } => {
            if let Some(mut body) = body {
                body.facing = Facing::from_velocity(player_pos.0 - pos.0).unwrap_or(body.facing);
            }
            dialogue_events.send(DialogueStartEvent {
                npc: entity,
                tree_id,
            });
        }
    }
}

fn update_stones(
    mut commands: Commands,
    time: Res<Time>,
    mut player: Query<(Entity, &mut Body, &Animator, Option<&MiningTarget>), With<Player>>,
    mut stones: Query<(Entity, &mut Interactable, &Tint, &mut Sprite), Without<Player>>,
    mut pickups: EventWriter<ItemPickupEvent>,
    mut sfx: EventWriter<PlaySfxEvent>,
) {
    let Ok((player_entity, mut body, animator, target)) = player.get_single_mut() else {
        return;
    };
    let target = target.map(|t| t.0);
    let dt = time.delta_secs();

    for (stone_entity, mut interactable, tint, mut sprite) in &mut stones {
        let Interactable::Stone(stone) = interactable.as_mut() else {
            continue;
        };
        if target != Some(stone_entity) {
            // Only the flash ticks on stones nobody is mining.
            stone.stop_mining();
        }

        let progress = stone.update(dt, body.anim, animator);
        sprite.color = if stone.is_flashing() {
            Color::WHITE
        } else {
            tint.0
        };

        match progress {
            StoneProgress::Idle => {
                if target == Some(stone_entity) && !stone.being_mined {
                    commands.entity(player_entity).remove::<MiningTarget>();
                }
            }
            StoneProgress::Hit { hits } => {
                debug!("[Stone] hit {}/{}", hits, stone.hits_to_break);
                sfx.send(PlaySfxEvent(Sfx::PickaxeHit));
            }
            StoneProgress::Break => {
                if let Some((item_id, quantity)) = stone.drop.clone() {
                    pickups.send(ItemPickupEvent { item_id, quantity });
                }
                sfx.send(PlaySfxEvent(Sfx::StoneBreak));
                commands.entity(stone_entity).despawn_recursive();
                commands.entity(player_entity).remove::<MiningTarget>();
                body.anim = AnimState::Idle;
            }
        }
    }
}

fn move_npcs(
    time: Res<Time>,
    mut npcs: Query<(&mut LogicalPosition, &mut Interactable, &mut Body), Without<Player>>,
) {
    let dt = time.delta_secs();
    for (mut pos, mut interactable, mut body) in &mut npcs {
        let Interactable::Npc(npc) = interactable.as_mut() else {
            continue;
        };
        if !npc.is_walking() {
            if body.anim == AnimState::Walk {
                body.anim = AnimState::Idle;
            }
            continue;
        }
        let mut next = pos.0;
        match npc.step(&mut next, dt) {
            Some(facing) => {
                body.facing = facing;
                body.anim = AnimState::Walk;
            }
            None => body.anim = AnimState::Idle,
        }
        pos.0 = next;
    }
}
