use bevy::prelude::*;

use crate::combat::enemy::Enemy;
use crate::combat::system::CombatSystem;
use crate::combat::{ActiveCombat, CombatState, TurnPhase};
use crate::config::GameConfig;
use crate::inventory::Inventory;
use crate::shared::*;

#[derive(Component)]
pub struct CombatHudRoot;

#[derive(Component)]
pub struct CombatPlayerText;

#[derive(Component)]
pub struct CombatEnemyText;

#[derive(Component)]
pub struct CombatPromptText;

pub fn spawn_combat_hud(mut commands: Commands) {
    commands
        .spawn((
            CombatHudRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::SpaceBetween,
                padding: UiRect::all(Val::Px(16.0)),
                ..default()
            },
        ))
        .with_children(|root| {
            root.spawn(Node {
                width: Val::Percent(100.0),
                justify_content: JustifyContent::SpaceBetween,
                ..default()
            })
            .with_children(|bar| {
                bar.spawn((
                    CombatPlayerText,
                    Text::new(""),
                    TextFont {
                        font_size: 18.0,
                        ..default()
                    },
                    TextColor(Color::srgb(0.6, 0.85, 1.0)),
                ));
                bar.spawn((
                    CombatEnemyText,
                    Text::new(""),
                    TextFont {
                        font_size: 18.0,
                        ..default()
                    },
                    TextColor(Color::srgb(1.0, 0.6, 0.55)),
                ));
            });

            root.spawn(Node {
                width: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                ..default()
            })
            .with_children(|bottom| {
                bottom
                    .spawn((
                        Node {
                            padding: UiRect::axes(Val::Px(16.0), Val::Px(8.0)),
                            ..default()
                        },
                        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
                    ))
                    .with_children(|panel| {
                        panel.spawn((
                            CombatPromptText,
                            Text::new(""),
                            TextFont {
                                font_size: 20.0,
                                ..default()
                            },
                            TextColor(Color::WHITE),
                        ));
                    });
            });
        });
}

pub fn despawn_combat_hud(mut commands: Commands, query: Query<Entity, With<CombatHudRoot>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}

/// What the player can do right now.
pub fn combat_prompt(system: &CombatSystem, has_roll_item: bool) -> String {
    match system.state() {
        CombatState::Victory => "Victory!".to_string(),
        CombatState::Defeat => "You are overwhelmed...".to_string(),
        CombatState::PlayerTurn if system.phase() == TurnPhase::Input => {
            if has_roll_item {
                "[J] Strike   [K] Tumble".to_string()
            } else {
                "[J] Strike".to_string()
            }
        }
        CombatState::PlayerTurn => String::new(),
        CombatState::EnemyTurn => {
            if system.counter_succeeded() {
                "Countered!".to_string()
            } else if system.counter_attempted() {
                "Too early...".to_string()
            } else if system.current_attack().is_some_and(|a| a.counterable) {
                "[Space] Counter".to_string()
            } else {
                "Brace yourself!".to_string()
            }
        }
    }
}

fn health_line(label: &str, vitals: &Vitals) -> String {
    format!("{}  {:.0}/{:.0}", label, vitals.health.max(0.0), vitals.max_health)
}

#[allow(clippy::type_complexity)]
pub fn update_combat_hud(
    active: Res<ActiveCombat>,
    config: Res<GameConfig>,
    inventory: Res<Inventory>,
    player: Query<&Vitals, With<Player>>,
    enemies: Query<(&Vitals, &Name), With<Enemy>>,
    mut texts: ParamSet<(
        Query<&mut Text, With<CombatPlayerText>>,
        Query<&mut Text, With<CombatEnemyText>>,
        Query<&mut Text, With<CombatPromptText>>,
    )>,
) {
    if let Ok(vitals) = player.get_single() {
        let line = health_line("You", vitals);
        for mut t in &mut texts.p0() {
            t.0.clone_from(&line);
        }
    }

    if let Some((vitals, name)) = active.enemy.and_then(|e| enemies.get(e).ok()) {
        let line = health_line(name.as_str(), vitals);
        for mut t in &mut texts.p1() {
            t.0.clone_from(&line);
        }
    }

    let prompt = combat_prompt(
        &active.system,
        inventory.has_item(&config.combat.roll_item),
    );
    for mut t in &mut texts.p2() {
        t.0.clone_from(&prompt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConfig;

    #[test]
    fn test_tumble_offered_only_with_the_charm() {
        let system = CombatSystem::seeded(CombatConfig::default(), 3);
        assert_eq!(combat_prompt(&system, false), "[J] Strike");
        assert_eq!(combat_prompt(&system, true), "[J] Strike   [K] Tumble");
    }

    #[test]
    fn test_health_line_never_shows_negative() {
        let vitals = Vitals {
            health: -4.0,
            max_health: 30.0,
        };
        assert_eq!(health_line("Slime", &vitals), "Slime  0/30");
    }
}
