//! World domain plugin.
//!
//! Responsible for:
//! - Loading Tiled maps into `TileManager`
//! - Drawing their tiles
//! - Map transitions (portals, respawn) and the `MapEntity` lifecycle
//! - Syncing map-space positions into transforms with Y-sorting

use bevy::prelude::*;

use crate::shared::*;

pub mod collision;
pub mod portals;
pub mod render;
pub mod textures;
pub mod tiled;
pub mod tiles;
pub mod ysort;

pub use tiles::{MapLoadError, MapObject, MapObjectKind, TileManager, TileRenderInfo};

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TileManager>()
            .init_resource::<render::TileTextureHandles>()
            // Transitions are handled in any state so the first map can load
            // while the game is still in Loading.
            .add_systems(
                Update,
                (
                    handle_map_transition,
                    render::spawn_map_tiles,
                    portals::spawn_portals,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                portals::enter_portals.run_if(in_state(GameState::Playing)),
            )
            .add_systems(PostUpdate, ysort::sync_position_and_ysort);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MAP TRANSITIONS
// ═══════════════════════════════════════════════════════════════════════

/// Loads the requested map; only on success are the old map's entities
/// despawned and `MapLoadedEvent` sent.
pub fn handle_map_transition(
    mut commands: Commands,
    mut events: EventReader<MapTransitionEvent>,
    mut tiles: ResMut<TileManager>,
    mut player_state: ResMut<PlayerState>,
    map_entities: Query<Entity, With<MapEntity>>,
    mut loaded_events: EventWriter<MapLoadedEvent>,
    mut toasts: EventWriter<ToastEvent>,
    mut sfx: EventWriter<PlaySfxEvent>,
) {
    // Only the last request in a frame matters.
    let Some(event) = events.read().last().cloned() else {
        return;
    };

    match tiles.load_map(&event.map_path) {
        Ok(_) => {
            for entity in &map_entities {
                commands.entity(entity).despawn_recursive();
            }
            if !player_state.current_map.is_empty() {
                sfx.send(PlaySfxEvent(Sfx::Door));
            }
            player_state.current_map = event.map_path.clone();
            loaded_events.send(MapLoadedEvent {
                path: event.map_path,
                spawn_name: event.spawn_name,
            });
        }
        Err(e) => {
            error!("[Map] {}", e);
            toasts.send(ToastEvent::new("The way is blocked."));
        }
    }
}
