use bevy::prelude::*;
use crate::shared::*;

/// Syncs LogicalPosition → Transform with pixel rounding and Y-sort Z.
/// Runs in PostUpdate AFTER all movement systems.
///
/// Map space is Y-down, so the Y axis is flipped here. Y-sorted entities get
/// their depth from their map Y; bodies also push their scale.
pub fn sync_position_and_ysort(
    mut with_ysort: Query<(&LogicalPosition, &mut Transform, Option<&Body>), With<YSorted>>,
    mut without_ysort: Query<(&LogicalPosition, &mut Transform), Without<YSorted>>,
) {
    for (logical_pos, mut transform, body) in &mut with_ysort {
        let pos = logical_pos.0.round();
        transform.translation = map_to_world(pos, y_sort_z(logical_pos.0.y));
        if let Some(body) = body {
            transform.scale = Vec3::splat(body.scale);
        }
    }

    for (logical_pos, mut transform) in &mut without_ysort {
        let pos = logical_pos.0.round();
        transform.translation.x = pos.x;
        transform.translation.y = -pos.y;
    }
}
