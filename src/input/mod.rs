//! Hardware input → logical actions.
//!
//! Gameplay systems never look at key codes; they read `PlayerInput`, which
//! is rebuilt once per frame in `PreUpdate` from `KeyBindings` and the
//! context derived from `GameState`.

use bevy::prelude::*;

use crate::shared::*;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerInput>()
            .init_resource::<KeyBindings>()
            .init_resource::<InputContext>()
            .add_systems(
                PreUpdate,
                (manage_input_context, reset_and_read_input).chain(),
            );
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct PlayerInput {
    /// Normalised; +Y is down the map.
    pub move_axis: Vec2,
    pub run: bool,
    pub interact: bool,
    pub attack_primary: bool,
    pub attack_secondary: bool,
    pub counter: bool,
    pub ui_up: bool,
    pub ui_down: bool,
    pub ui_confirm: bool,
    pub ui_cancel: bool,
    pub inventory_next: bool,
    pub inventory_prev: bool,
    pub inventory_slot: Option<u8>,
    pub quicksave: bool,
    pub quickload: bool,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputContext {
    #[default]
    Disabled,
    Gameplay,
    Dialogue,
    Combat,
    GameOver,
}

#[derive(Resource, Debug, Clone)]
pub struct KeyBindings {
    pub move_up: KeyCode,
    pub move_down: KeyCode,
    pub move_left: KeyCode,
    pub move_right: KeyCode,
    pub run: KeyCode,
    pub interact: KeyCode,
    pub attack_primary: KeyCode,
    pub attack_secondary: KeyCode,
    pub counter: KeyCode,
    pub ui_confirm: KeyCode,
    pub ui_cancel: KeyCode,
    pub inventory_next: KeyCode,
    pub inventory_prev: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_up: KeyCode::KeyW,
            move_down: KeyCode::KeyS,
            move_left: KeyCode::KeyA,
            move_right: KeyCode::KeyD,
            run: KeyCode::ShiftLeft,
            interact: KeyCode::KeyE,
            attack_primary: KeyCode::KeyJ,
            attack_secondary: KeyCode::KeyK,
            counter: KeyCode::Space,
            ui_confirm: KeyCode::Enter,
            ui_cancel: KeyCode::Escape,
            inventory_next: KeyCode::KeyQ,
            inventory_prev: KeyCode::KeyZ,
        }
    }
}

const SLOT_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// The single point where hardware input becomes game actions.
fn reset_and_read_input(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<KeyBindings>,
    context: Res<InputContext>,
    mut input: ResMut<PlayerInput>,
) {
    *input = read_input(&keys, &bindings, *context);
}

pub fn read_input(
    keys: &ButtonInput<KeyCode>,
    bindings: &KeyBindings,
    context: InputContext,
) -> PlayerInput {
    let mut input = PlayerInput::default();
    let ui_up = keys.just_pressed(bindings.move_up) || keys.just_pressed(KeyCode::ArrowUp);
    let ui_down = keys.just_pressed(bindings.move_down) || keys.just_pressed(KeyCode::ArrowDown);

    match context {
        InputContext::Disabled => {}

        InputContext::Gameplay => {
            let mut axis = Vec2::ZERO;
            if keys.pressed(bindings.move_up) || keys.pressed(KeyCode::ArrowUp) {
                axis.y -= 1.0;
            }
            if keys.pressed(bindings.move_down) || keys.pressed(KeyCode::ArrowDown) {
                axis.y += 1.0;
            }
            if keys.pressed(bindings.move_left) || keys.pressed(KeyCode::ArrowLeft) {
                axis.x -= 1.0;
            }
            if keys.pressed(bindings.move_right) || keys.pressed(KeyCode::ArrowRight) {
                axis.x += 1.0;
            }
            input.move_axis = axis.normalize_or_zero();
            input.run = keys.pressed(bindings.run);

            input.interact = keys.just_pressed(bindings.interact);
            input.attack_primary = keys.just_pressed(bindings.attack_primary);
            input.inventory_next = keys.just_pressed(bindings.inventory_next);
            input.inventory_prev = keys.just_pressed(bindings.inventory_prev);
            input.inventory_slot = SLOT_KEYS
                .iter()
                .position(|key| keys.just_pressed(*key))
                .map(|i| i as u8);

            input.quicksave = keys.just_pressed(KeyCode::F5);
            input.quickload = keys.just_pressed(KeyCode::F9);
        }

        InputContext::Dialogue => {
            input.ui_confirm = keys.just_pressed(bindings.interact)
                || keys.just_pressed(bindings.ui_confirm)
                || keys.just_pressed(KeyCode::Space);
            input.ui_up = ui_up;
            input.ui_down = ui_down;
            input.ui_cancel = keys.just_pressed(bindings.ui_cancel);
        }

        InputContext::Combat => {
            input.attack_primary = keys.just_pressed(bindings.attack_primary);
            input.attack_secondary = keys.just_pressed(bindings.attack_secondary);
            input.counter = keys.just_pressed(bindings.counter);
        }

        InputContext::GameOver => {
            input.ui_confirm = keys.just_pressed(bindings.ui_confirm)
                || keys.just_pressed(bindings.interact);
        }
    }
    input
}

/// Derives InputContext from GameState.
fn manage_input_context(game_state: Res<State<GameState>>, mut context: ResMut<InputContext>) {
    *context = match game_state.get() {
        GameState::Loading => InputContext::Disabled,
        GameState::Playing => InputContext::Gameplay,
        GameState::Dialogue => InputContext::Dialogue,
        GameState::Combat => InputContext::Combat,
        GameState::GameOver => InputContext::GameOver,
    };
}
