//! Combat domain plugin.
//!
//! `system::CombatSystem` is the turn engine and knows nothing about Bevy.
//! This module owns the single active battle, feeds it player input each
//! frame through borrowed fighter views, and turns its cues into sound,
//! toasts and state changes.

use bevy::prelude::*;

pub mod attack;
pub mod combatant;
pub mod enemy;
pub mod system;

use crate::config::GameConfig;
use crate::input::PlayerInput;
use crate::inventory::Inventory;
use crate::shared::*;

use combatant::FighterMut;
use enemy::{DefeatedEnemies, Enemy, EnemyRegistry};
use system::{CombatCue, CombatInput, CombatSystem, PlayerAction};

pub use system::{CombatState, TurnPhase};

/// How long the final blow stays on screen before leaving the stage.
pub const RESULT_LINGER_SECS: f32 = 1.2;

/// Score for each enemy beaten.
pub const VICTORY_SCORE: u32 = 10;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveCombat>()
            .init_resource::<EnemyRegistry>()
            .init_resource::<DefeatedEnemies>()
            .add_systems(Update, enemy::spawn_enemies)
            .add_systems(
                Update,
                (enemy::enemy_ai, begin_combat)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(
                Update,
                (run_combat, finish_combat)
                    .chain()
                    .run_if(in_state(GameState::Combat)),
            )
            .add_systems(Update, handle_combat_end)
            .add_systems(OnEnter(GameState::Combat), spawn_stage)
            .add_systems(OnExit(GameState::Combat), despawn_stage);
    }
}

/// The battle in progress, if any.
#[derive(Resource)]
pub struct ActiveCombat {
    pub system: CombatSystem,
    pub enemy: Option<Entity>,
    /// Seconds spent on the stage since the battle was decided.
    pub linger: f32,
}

impl FromWorld for ActiveCombat {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<GameConfig>()
            .map(|c| c.combat.clone())
            .unwrap_or_default();
        Self {
            system: CombatSystem::new(config),
            enemy: None,
            linger: 0.0,
        }
    }
}

#[derive(Component)]
pub struct StageBackdrop;

type FighterParts<'a> = (&'a mut LogicalPosition, &'a mut Body, &'a mut Vitals);

pub fn combat_input(input: &PlayerInput) -> CombatInput {
    let action = if input.attack_primary {
        Some(PlayerAction::Basic)
    } else if input.attack_secondary {
        Some(PlayerAction::Roll)
    } else {
        None
    };
    CombatInput {
        action,
        counter: input.counter,
    }
}

pub fn begin_combat(
    mut events: EventReader<CombatStartEvent>,
    mut active: ResMut<ActiveCombat>,
    mut player: Query<FighterParts, (With<Player>, Without<Enemy>)>,
    mut enemies: Query<(FighterParts, &Enemy), Without<Player>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut music: EventWriter<PlayMusicEvent>,
) {
    let Some(event) = events.read().last().cloned() else {
        return;
    };
    let Ok((mut p_pos, mut p_body, mut p_vitals)) = player.get_single_mut() else {
        return;
    };
    let Ok(((mut e_pos, mut e_body, mut e_vitals), enemy)) = enemies.get_mut(event.enemy) else {
        warn!("[Combat] start requested for a missing enemy");
        return;
    };

    let mut player_view = FighterMut {
        position: &mut p_pos,
        body: &mut p_body,
        vitals: &mut p_vitals,
    };
    let mut enemy_view = FighterMut {
        position: &mut e_pos,
        body: &mut e_body,
        vitals: &mut e_vitals,
    };
    active
        .system
        .start_combat(&mut player_view, &mut enemy_view, enemy.attacks.clone());
    active.enemy = Some(event.enemy);
    active.linger = 0.0;

    music.send(PlayMusicEvent(Music::Battle));
    next_state.set(GameState::Combat);
}

#[allow(clippy::too_many_arguments)]
pub fn run_combat(
    time: Res<Time>,
    input: Res<PlayerInput>,
    inventory: Res<Inventory>,
    mut active: ResMut<ActiveCombat>,
    mut player: Query<FighterParts, (With<Player>, Without<Enemy>)>,
    mut enemies: Query<FighterParts, (With<Enemy>, Without<Player>)>,
    mut sfx: EventWriter<PlaySfxEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    let Some(enemy_entity) = active.enemy else {
        return;
    };
    let Ok((mut p_pos, mut p_body, mut p_vitals)) = player.get_single_mut() else {
        return;
    };
    let Ok((mut e_pos, mut e_body, mut e_vitals)) = enemies.get_mut(enemy_entity) else {
        return;
    };

    let mut player_view = FighterMut {
        position: &mut p_pos,
        body: &mut p_body,
        vitals: &mut p_vitals,
    };
    let mut enemy_view = FighterMut {
        position: &mut e_pos,
        body: &mut e_body,
        vitals: &mut e_vitals,
    };
    active.system.update(
        time.delta_secs(),
        &combat_input(&input),
        &inventory,
        &mut player_view,
        &mut enemy_view,
    );

    for cue in active.system.drain_cues() {
        match cue {
            CombatCue::Swing => {
                sfx.send(PlaySfxEvent(Sfx::Swing));
            }
            CombatCue::Hit { on_player, damage } => {
                debug!("[Combat] hit on {} for {}", if on_player { "player" } else { "enemy" }, damage);
                sfx.send(PlaySfxEvent(Sfx::Hit));
            }
            CombatCue::CounterSuccess { damage } => {
                sfx.send(PlaySfxEvent(Sfx::Counter));
                toasts.send(ToastEvent::new(format!("Counter! {} damage", damage)));
            }
            CombatCue::CounterMissed => {
                sfx.send(PlaySfxEvent(Sfx::CounterMiss));
            }
            CombatCue::Finished(outcome) => {
                info!("[Combat] finished: {:?}", outcome);
                sfx.send(PlaySfxEvent(match outcome {
                    CombatOutcome::Victory => Sfx::Victory,
                    CombatOutcome::Defeat => Sfx::Defeat,
                }));
            }
        }
    }
}

/// After a short pause on the decided battle, puts everyone back and
/// announces the result.
pub fn finish_combat(
    time: Res<Time>,
    mut active: ResMut<ActiveCombat>,
    mut player: Query<FighterParts, (With<Player>, Without<Enemy>)>,
    mut enemies: Query<FighterParts, (With<Enemy>, Without<Player>)>,
    mut end_events: EventWriter<CombatEndEvent>,
) {
    let Some(outcome) = active.system.outcome() else {
        return;
    };
    let Some(enemy_entity) = active.enemy else {
        return;
    };
    active.linger += time.delta_secs();
    if active.linger < RESULT_LINGER_SECS {
        return;
    }

    if let (Ok((mut p_pos, mut p_body, mut p_vitals)), Ok((mut e_pos, mut e_body, mut e_vitals))) =
        (player.get_single_mut(), enemies.get_mut(enemy_entity))
    {
        let mut player_view = FighterMut {
            position: &mut p_pos,
            body: &mut p_body,
            vitals: &mut p_vitals,
        };
        let mut enemy_view = FighterMut {
            position: &mut e_pos,
            body: &mut e_body,
            vitals: &mut e_vitals,
        };
        active.system.end_combat(&mut player_view, &mut enemy_view);
    }

    active.enemy = None;
    active.linger = 0.0;
    end_events.send(CombatEndEvent {
        enemy: enemy_entity,
        outcome,
    });
}

#[allow(clippy::too_many_arguments)]
pub fn handle_combat_end(
    mut commands: Commands,
    mut events: EventReader<CombatEndEvent>,
    enemies: Query<&Enemy>,
    mut defeated: ResMut<DefeatedEnemies>,
    mut player_state: ResMut<PlayerState>,
    mut next_state: ResMut<NextState<GameState>>,
    mut music: EventWriter<PlayMusicEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for event in events.read() {
        match event.outcome {
            CombatOutcome::Victory => {
                if let Ok(enemy) = enemies.get(event.enemy) {
                    defeated.0.insert(enemy.key.clone());
                }
                commands.entity(event.enemy).despawn_recursive();
                player_state.score += VICTORY_SCORE;
                toasts.send(ToastEvent::new(format!("Victory! +{} score", VICTORY_SCORE)));
                music.send(PlayMusicEvent(Music::Overworld));
                next_state.set(GameState::Playing);
            }
            CombatOutcome::Defeat => {
                music.send(PlayMusicEvent(Music::GameOver));
                next_state.set(GameState::GameOver);
            }
        }
    }
}

fn spawn_stage(mut commands: Commands, config: Res<GameConfig>) {
    let center = config.combat.stage_center();
    commands.spawn((
        StageBackdrop,
        Sprite {
            color: Color::srgb(0.12, 0.1, 0.16),
            custom_size: Some(Vec2::new(SCREEN_WIDTH, SCREEN_HEIGHT)),
            ..default()
        },
        // Just under the fighters.
        Transform::from_translation(map_to_world(center, Z_ENTITY_BASE - 1.0)),
    ));
    commands.spawn((
        StageBackdrop,
        Sprite {
            color: Color::srgb(0.25, 0.2, 0.18),
            custom_size: Some(Vec2::new(SCREEN_WIDTH, 8.0)),
            ..default()
        },
        Transform::from_translation(map_to_world(
            center + Vec2::new(0.0, 12.0),
            Z_ENTITY_BASE - 0.5,
        )),
    ));
}

fn despawn_stage(mut commands: Commands, stage: Query<Entity, With<StageBackdrop>>) {
    for entity in &stage {
        commands.entity(entity).despawn_recursive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_attack_wins_over_secondary() {
        let input = PlayerInput {
            attack_primary: true,
            attack_secondary: true,
            counter: true,
            ..default()
        };
        let combat = combat_input(&input);
        assert_eq!(combat.action, Some(PlayerAction::Basic));
        assert!(combat.counter);

        let idle = combat_input(&PlayerInput::default());
        assert_eq!(idle.action, None);
        assert!(!idle.counter);
    }
}
