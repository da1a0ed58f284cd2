use bevy::prelude::*;

use crate::animation::{AnimationSet, Animator};
use crate::config::GameConfig;
use crate::shared::*;
use crate::world::TileManager;

use super::CameraSnap;

/// Where the player appears on a freshly loaded map: the named spawn, then
/// the config's default spawn, then the middle of the map.
pub fn spawn_position(tiles: &TileManager, requested: Option<&str>, fallback: &str) -> Vec2 {
    requested
        .and_then(|name| tiles.spawn_point(name))
        .or_else(|| tiles.spawn_point(fallback))
        .unwrap_or_else(|| tiles.size() * 0.5)
}

/// Spawns the player on the first map load and moves it on later ones.
pub fn place_player_on_map_load(
    mut commands: Commands,
    mut events: EventReader<MapLoadedEvent>,
    tiles: Res<TileManager>,
    config: Res<GameConfig>,
    mut snap: ResMut<CameraSnap>,
    mut player: Query<(&mut LogicalPosition, &mut Body), With<Player>>,
) {
    let Some(event) = events.read().last() else {
        return;
    };
    let position = spawn_position(&tiles, event.spawn_name.as_deref(), &config.start_spawn);
    snap.frames_remaining = 2;

    if let Ok((mut pos, mut body)) = player.get_single_mut() {
        pos.0 = position;
        body.anim = AnimState::Idle;
        return;
    }

    let color = Color::srgb(0.2, 0.5, 0.8);
    commands.spawn((
        Player,
        Name::new("Player"),
        PlayerMovement {
            speed: config.player.walk_speed,
            ..default()
        },
        LogicalPosition(position),
        YSorted,
        Footprint(Vec2::from_array(config.player.footprint)),
        Body::default(),
        Vitals::full(config.player.max_health),
        AnimationSet::humanoid(),
        Animator::default(),
        Tint(color),
        // Placeholder sprite: a blue block
        Sprite {
            color,
            custom_size: Some(Vec2::new(12.0, 16.0)),
            ..default()
        },
        Transform::default(),
        Visibility::default(),
    ));
    info!("[Player] spawned at {:?}", position);
}
