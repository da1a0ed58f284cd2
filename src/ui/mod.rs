pub mod combat_hud;
pub mod dialogue_box;
pub mod game_over;
pub mod hud;
pub mod toast;

use bevy::prelude::*;

use crate::shared::*;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // ─── HUD + TOASTS: spawned once, shown per state ───
        app.add_systems(Startup, (hud::spawn_hud, toast::spawn_toast_container));
        app.add_systems(
            Update,
            (
                hud::update_hud_visibility,
                hud::update_health_display,
                hud::update_score_display,
                hud::update_inventory_display,
            ),
        );
        app.add_systems(
            Update,
            (toast::handle_toast_events, toast::update_toasts).chain(),
        );

        // ─── DIALOGUE BOX ───
        app.add_systems(OnEnter(GameState::Dialogue), dialogue_box::spawn_dialogue_box);
        app.add_systems(OnExit(GameState::Dialogue), dialogue_box::despawn_dialogue_box);
        app.add_systems(
            Update,
            dialogue_box::update_dialogue_box.run_if(in_state(GameState::Dialogue)),
        );

        // ─── COMBAT HUD ───
        app.add_systems(OnEnter(GameState::Combat), combat_hud::spawn_combat_hud);
        app.add_systems(OnExit(GameState::Combat), combat_hud::despawn_combat_hud);
        app.add_systems(
            Update,
            combat_hud::update_combat_hud.run_if(in_state(GameState::Combat)),
        );

        // ─── GAME OVER ───
        app.add_systems(OnEnter(GameState::GameOver), game_over::spawn_game_over);
        app.add_systems(OnExit(GameState::GameOver), game_over::despawn_game_over);
    }
}
