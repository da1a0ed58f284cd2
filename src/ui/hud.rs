use bevy::prelude::*;

use crate::inventory::{Inventory, ItemRegistry};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// MARKER COMPONENTS: used to query and update HUD elements
// ═══════════════════════════════════════════════════════════════════════

#[derive(Component)]
pub struct HudRoot;

#[derive(Component)]
pub struct HudHealthText;

#[derive(Component)]
pub struct HudHealthFill;

#[derive(Component)]
pub struct HudScoreText;

#[derive(Component)]
pub struct HudInventoryText;

// ═══════════════════════════════════════════════════════════════════════
// SPAWN HUD
// ═══════════════════════════════════════════════════════════════════════

pub fn spawn_hud(mut commands: Commands) {
    commands
        .spawn((
            HudRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::SpaceBetween,
                ..default()
            },
            Visibility::Hidden,
        ))
        .with_children(|parent| {
            // ─── TOP BAR ───
            parent
                .spawn((
                    Node {
                        width: Val::Percent(100.0),
                        height: Val::Px(36.0),
                        flex_direction: FlexDirection::Row,
                        justify_content: JustifyContent::SpaceBetween,
                        align_items: AlignItems::Center,
                        padding: UiRect::axes(Val::Px(12.0), Val::Px(4.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
                ))
                .with_children(|top_bar| {
                    top_bar
                        .spawn(Node {
                            flex_direction: FlexDirection::Row,
                            align_items: AlignItems::Center,
                            column_gap: Val::Px(10.0),
                            ..default()
                        })
                        .with_children(|left| {
                            left.spawn((
                                HudHealthText,
                                Text::new("HP"),
                                TextFont {
                                    font_size: 16.0,
                                    ..default()
                                },
                                TextColor(Color::WHITE),
                            ));
                            left.spawn((
                                Node {
                                    width: Val::Px(120.0),
                                    height: Val::Px(12.0),
                                    border: UiRect::all(Val::Px(1.0)),
                                    ..default()
                                },
                                BackgroundColor(Color::srgba(0.1, 0.1, 0.1, 0.9)),
                                BorderColor(Color::srgba(0.6, 0.6, 0.6, 0.8)),
                            ))
                            .with_children(|bar| {
                                bar.spawn((
                                    HudHealthFill,
                                    Node {
                                        width: Val::Percent(100.0),
                                        height: Val::Percent(100.0),
                                        ..default()
                                    },
                                    BackgroundColor(Color::srgb(0.85, 0.2, 0.25)),
                                ));
                            });
                        });

                    top_bar.spawn((
                        HudScoreText,
                        Text::new("Score 0"),
                        TextFont {
                            font_size: 16.0,
                            ..default()
                        },
                        TextColor(Color::srgb(1.0, 0.84, 0.0)),
                    ));
                });

            // ─── BOTTOM: INVENTORY ───
            parent
                .spawn((
                    Node {
                        align_self: AlignSelf::FlexStart,
                        margin: UiRect::all(Val::Px(8.0)),
                        padding: UiRect::all(Val::Px(8.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.55)),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        HudInventoryText,
                        Text::new(""),
                        TextFont {
                            font_size: 14.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                });
        });
}

// ═══════════════════════════════════════════════════════════════════════
// UPDATE
// ═══════════════════════════════════════════════════════════════════════

/// The HUD shows in the overworld and while talking.
pub fn update_hud_visibility(
    state: Res<State<GameState>>,
    mut root: Query<&mut Visibility, With<HudRoot>>,
) {
    let shown = matches!(state.get(), GameState::Playing | GameState::Dialogue);
    for mut visibility in &mut root {
        let wanted = if shown {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}

pub fn update_health_display(
    player: Query<&Vitals, With<Player>>,
    mut text: Query<&mut Text, With<HudHealthText>>,
    mut fill: Query<&mut Node, With<HudHealthFill>>,
) {
    let Ok(vitals) = player.get_single() else {
        return;
    };
    let label = format!("HP {:.0}/{:.0}", vitals.health, vitals.max_health);
    for mut t in &mut text {
        if t.0 != label {
            t.0 = label.clone();
        }
    }
    let ratio = if vitals.max_health > 0.0 {
        (vitals.health / vitals.max_health).clamp(0.0, 1.0)
    } else {
        0.0
    };
    for mut node in &mut fill {
        node.width = Val::Percent(ratio * 100.0);
    }
}

pub fn update_score_display(
    player_state: Res<PlayerState>,
    mut text: Query<&mut Text, With<HudScoreText>>,
) {
    if !player_state.is_changed() {
        return;
    }
    for mut t in &mut text {
        t.0 = format!("Score {}", player_state.score);
    }
}

/// One line per slot; the selected slot is marked with `>`.
pub fn inventory_lines(inventory: &Inventory, registry: &ItemRegistry) -> String {
    let ids = inventory.slot_ids();
    if ids.is_empty() {
        return format!("Bag empty (0/{})", inventory.capacity());
    }
    let selected = inventory.selected_index();
    let mut lines = vec![format!("Bag {}/{}", ids.len(), inventory.capacity())];
    for (i, id) in ids.iter().enumerate() {
        let marker = if selected == Some(i) { ">" } else { " " };
        let name = registry.display_name(id);
        let item = registry.get(id);
        let line = match item {
            Some(item) if item.stackable => {
                format!("{} {} x{}", marker, name, inventory.quantity_of(id))
            }
            _ => format!("{} {}", marker, name),
        };
        lines.push(line);
    }
    lines.join("\n")
}

pub fn update_inventory_display(
    inventory: Res<Inventory>,
    registry: Res<ItemRegistry>,
    mut text: Query<&mut Text, With<HudInventoryText>>,
) {
    // The store changes behind its lock, so compare text instead of
    // relying on change detection.
    let content = inventory_lines(&inventory, &registry);
    for mut t in &mut text {
        if t.0 != content {
            t.0 = content.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Item;

    #[test]
    fn test_inventory_lines_mark_selection() {
        let mut registry = ItemRegistry::default();
        let potion = Item::new("potion", "Potion", true);
        let sword = Item::new("sword", "Sword", false);
        registry.register(potion.clone());
        registry.register(sword.clone());

        let inv = Inventory::with_capacity(4);
        assert_eq!(inventory_lines(&inv, &registry), "Bag empty (0/4)");

        inv.add_item(&potion, 3);
        inv.add_item(&sword, 2);
        inv.select_slot(1);
        assert_eq!(
            inventory_lines(&inv, &registry),
            "Bag 3/4\n  Potion x3\n> Sword\n  Sword"
        );
    }
}
