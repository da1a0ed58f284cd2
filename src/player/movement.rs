use bevy::prelude::*;

use crate::config::{GameConfig, PlayerTuning};
use crate::input::PlayerInput;
use crate::interact::MiningTarget;
use crate::shared::*;
use crate::world::collision::resolve_move;
use crate::world::TileManager;

/// One frame of player motion in map space. Blocked axes are dropped so the
/// player slides along walls.
pub fn step_player(
    position: Vec2,
    axis: Vec2,
    run: bool,
    tuning: &PlayerTuning,
    footprint: &Footprint,
    obstacles: &[Rect],
    dt: f32,
) -> Vec2 {
    let speed = if run { tuning.run_speed } else { tuning.walk_speed };
    let delta = axis.normalize_or_zero() * speed * dt;
    position + resolve_move(delta, footprint.rect_at(position), obstacles)
}

/// Reads the move axis, moves the player against tile and object colliders,
/// and picks the body's facing/animation.
#[allow(clippy::type_complexity)]
pub fn player_movement(
    mut commands: Commands,
    time: Res<Time>,
    input: Res<PlayerInput>,
    config: Res<GameConfig>,
    tiles: Res<TileManager>,
    mut player: Query<
        (
            Entity,
            &mut LogicalPosition,
            &mut PlayerMovement,
            &mut Body,
            &Footprint,
            Option<&MiningTarget>,
        ),
        With<Player>,
    >,
    solids: Query<(&LogicalPosition, &Footprint), (With<Solid>, Without<Player>)>,
) {
    let Ok((entity, mut pos, mut movement, mut body, footprint, mining)) = player.get_single_mut()
    else {
        return;
    };

    let axis = input.move_axis;
    movement.is_moving = axis != Vec2::ZERO;
    movement.is_running = movement.is_moving && input.run;
    movement.speed = if movement.is_running {
        config.player.run_speed
    } else {
        config.player.walk_speed
    };

    if !movement.is_moving {
        // Mining keeps its own animation until the stone breaks.
        if mining.is_none() && matches!(body.anim, AnimState::Walk | AnimState::Run) {
            body.anim = AnimState::Idle;
        }
        return;
    }

    if mining.is_some() {
        commands.entity(entity).remove::<MiningTarget>();
    }

    let mut obstacles: Vec<Rect> = tiles.collision_rects().to_vec();
    obstacles.extend(solids.iter().map(|(p, f)| f.rect_at(p.0)));

    pos.0 = step_player(
        pos.0,
        axis,
        input.run,
        &config.player,
        footprint,
        &obstacles,
        time.delta_secs(),
    );
    if let Some(facing) = Facing::from_velocity(axis) {
        body.facing = facing;
    }
    body.anim = if movement.is_running {
        AnimState::Run
    } else {
        AnimState::Walk
    };
}
