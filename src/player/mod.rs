mod camera;
mod movement;
mod spawn;

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::input::PlayerInput;
use crate::shared::*;

pub use movement::step_player;
pub use spawn::spawn_position;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSnap>();

        // Placing the player follows every map load, whatever the state.
        app.add_systems(Update, spawn::place_player_on_map_load);

        app.add_systems(
            Update,
            movement::player_movement.run_if(in_state(GameState::Playing)),
        );

        app.add_systems(
            Update,
            camera::camera_follow_player
                .run_if(in_state(GameState::Playing).or(in_state(GameState::Dialogue))),
        );
        app.add_systems(
            Update,
            camera::camera_center_stage.run_if(in_state(GameState::Combat)),
        );

        app.add_systems(Update, revive_player.run_if(in_state(GameState::GameOver)));
    }
}

/// Frames during which the camera jumps straight to its target instead of
/// easing, set after teleports.
#[derive(Resource, Debug, Default)]
pub struct CameraSnap {
    pub frames_remaining: u8,
}

/// From the game over screen: back on your feet at the current map's spawn.
fn revive_player(
    input: Res<PlayerInput>,
    config: Res<GameConfig>,
    player_state: Res<PlayerState>,
    mut player: Query<(&mut Vitals, &mut Body), With<Player>>,
    mut transitions: EventWriter<MapTransitionEvent>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !input.ui_confirm {
        return;
    }
    if let Ok((mut vitals, mut body)) = player.get_single_mut() {
        vitals.health = vitals.max_health;
        body.anim = AnimState::Idle;
    }
    info!("[Player] revived on {}", player_state.current_map);
    transitions.send(MapTransitionEvent {
        map_path: player_state.current_map.clone(),
        spawn_name: Some(config.start_spawn.clone()),
    });
    next_state.set(GameState::Playing);
}
