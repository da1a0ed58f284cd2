use bevy::prelude::*;

use crate::config::GameConfig;
use crate::shared::*;
use crate::world::TileManager;

use super::CameraSnap;

/// Eases toward the player, clamped so the view never leaves the map.
pub fn camera_follow_player(
    time: Res<Time>,
    tiles: Res<TileManager>,
    mut snap: ResMut<CameraSnap>,
    player: Query<&LogicalPosition, (With<Player>, Without<Camera2d>)>,
    mut camera: Query<(&mut Transform, &OrthographicProjection), (With<Camera2d>, Without<Player>)>,
) {
    let Ok(logical_pos) = player.get_single() else {
        return;
    };
    let Ok((mut cam_tf, projection)) = camera.get_single_mut() else {
        return;
    };

    let target = map_to_world(logical_pos.0.round(), 0.0).truncate();
    let current = cam_tf.translation.truncate();
    let far = (target - current).abs().max_element() > TILE_SIZE * 4.0;

    let next = if snap.frames_remaining > 0 || far {
        snap.frames_remaining = snap.frames_remaining.saturating_sub(1);
        target
    } else {
        let t = (5.0 * time.delta_secs()).min(1.0);
        current.lerp(target, t)
    };

    // The camera transform carries the pixel-art zoom.
    let half_view = projection.area.size() * 0.5 * cam_tf.scale.truncate();
    let map = tiles.size();
    cam_tf.translation.x = clamp_axis(next.x, half_view.x, 0.0, map.x);
    // World Y runs from 0 at the map's top edge down to -height.
    cam_tf.translation.y = clamp_axis(next.y, half_view.y, -map.y, 0.0);
}

/// Keeps `[center - half, center + half]` inside `[lo, hi]`, centering when
/// the range is smaller than the view.
pub fn clamp_axis(center: f32, half: f32, lo: f32, hi: f32) -> f32 {
    if hi - lo <= half * 2.0 {
        return (lo + hi) * 0.5;
    }
    center.round().clamp(lo + half, hi - half)
}

pub fn camera_center_stage(
    config: Res<GameConfig>,
    mut camera: Query<&mut Transform, With<Camera2d>>,
) {
    let Ok(mut cam_tf) = camera.get_single_mut() else {
        return;
    };
    let center = map_to_world(config.combat.stage_center(), cam_tf.translation.z);
    cam_tf.translation = center;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_axis() {
        assert_eq!(clamp_axis(10.0, 50.0, 0.0, 400.0), 50.0);
        assert_eq!(clamp_axis(390.0, 50.0, 0.0, 400.0), 350.0);
        assert_eq!(clamp_axis(200.0, 50.0, 0.0, 400.0), 200.0);
        // Map narrower than the view.
        assert_eq!(clamp_axis(10.0, 300.0, -200.0, 0.0), -100.0);
    }
}
