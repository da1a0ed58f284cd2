use std::path::Path;

use bevy::prelude::*;

use super::collision::overlaps;
use super::tiles::{MapObjectKind, TileManager};
use crate::shared::*;

/// A map region that sends the player to another map.
#[derive(Component, Debug, Clone)]
pub struct Portal {
    pub target_map: String,
    pub spawn_name: Option<String>,
    pub rect: Rect,
    /// Disarmed until the player has stood outside it once, so arriving on
    /// top of a portal does not bounce straight back.
    pub armed: bool,
}

/// Resolves a portal's `map` property against the directory of the map it
/// sits in.
pub fn resolve_target(current_map: &str, target: &str) -> String {
    let target_path = Path::new(target);
    if target_path.is_absolute() {
        return target.to_string();
    }
    Path::new(current_map)
        .parent()
        .map(|dir| dir.join(target_path))
        .unwrap_or_else(|| target_path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

pub fn spawn_portals(
    mut commands: Commands,
    mut events: EventReader<MapLoadedEvent>,
    tiles: Res<TileManager>,
) {
    let Some(loaded) = events.read().last() else {
        return;
    };

    for object in tiles
        .objects()
        .iter()
        .filter(|o| o.kind == MapObjectKind::Portal)
    {
        let Some(target) = object.property("map") else {
            warn!("[Map] portal '{}' has no 'map' property", object.name);
            continue;
        };
        commands.spawn((
            MapEntity,
            Portal {
                target_map: resolve_target(&loaded.path, target),
                spawn_name: object.property("spawn").map(str::to_string),
                rect: object.rect,
                armed: false,
            },
        ));
    }
}

pub fn enter_portals(
    player: Query<(&LogicalPosition, &Footprint), With<Player>>,
    mut portals: Query<&mut Portal>,
    mut transitions: EventWriter<MapTransitionEvent>,
) {
    let Ok((pos, footprint)) = player.get_single() else {
        return;
    };
    let feet = footprint.rect_at(pos.0);

    for mut portal in &mut portals {
        let inside = overlaps(feet, portal.rect);
        if !inside {
            portal.armed = true;
            continue;
        }
        if portal.armed {
            portal.armed = false;
            info!("[Map] portal → {}", portal.target_map);
            transitions.send(MapTransitionEvent {
                map_path: portal.target_map.clone(),
                spawn_name: portal.spawn_name.clone(),
            });
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_relative_to_current_map() {
        assert_eq!(
            resolve_target("assets/maps/village.json", "cave.json"),
            Path::new("assets/maps").join("cave.json").to_string_lossy()
        );
        assert_eq!(resolve_target("village.json", "cave.json"), "cave.json");
    }
}
