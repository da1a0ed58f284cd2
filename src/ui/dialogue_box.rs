use bevy::prelude::*;

use crate::dialogue::{ActiveDialogue, DialogueChoice, DialogueRegistry};
use crate::inventory::Inventory;

// ═══════════════════════════════════════════════════════════════════════
// MARKER COMPONENTS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Component)]
pub struct DialogueBoxRoot;

#[derive(Component)]
pub struct DialogueSpeaker;

#[derive(Component)]
pub struct DialogueText;

#[derive(Component)]
pub struct DialogueChoices;

// ═══════════════════════════════════════════════════════════════════════
// SPAWN / DESPAWN
// ═══════════════════════════════════════════════════════════════════════

pub fn spawn_dialogue_box(mut commands: Commands) {
    commands
        .spawn((
            DialogueBoxRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::FlexEnd,
                align_items: AlignItems::Center,
                flex_direction: FlexDirection::Column,
                padding: UiRect::bottom(Val::Px(20.0)),
                ..default()
            },
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        width: Val::Px(700.0),
                        min_height: Val::Px(130.0),
                        flex_direction: FlexDirection::Column,
                        padding: UiRect::all(Val::Px(14.0)),
                        row_gap: Val::Px(8.0),
                        border: UiRect::all(Val::Px(2.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.08, 0.07, 0.12, 0.92)),
                    BorderColor(Color::srgb(0.7, 0.6, 0.4)),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        DialogueSpeaker,
                        Text::new(""),
                        TextFont {
                            font_size: 18.0,
                            ..default()
                        },
                        TextColor(Color::srgb(1.0, 0.85, 0.5)),
                    ));
                    panel.spawn((
                        DialogueText,
                        Text::new(""),
                        TextFont {
                            font_size: 16.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                    panel.spawn((
                        DialogueChoices,
                        Text::new(""),
                        TextFont {
                            font_size: 15.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.8, 0.9, 1.0)),
                    ));
                });
        });
}

pub fn despawn_dialogue_box(mut commands: Commands, query: Query<Entity, With<DialogueBoxRoot>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}

// ═══════════════════════════════════════════════════════════════════════
// UPDATE
// ═══════════════════════════════════════════════════════════════════════

/// Choice list with a cursor; a node without choices shows a continue hint.
pub fn choice_lines(choices: &[&DialogueChoice], cursor: usize) -> String {
    if choices.is_empty() {
        return "[Enter] continue".to_string();
    }
    choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let marker = if i == cursor { ">" } else { " " };
            format!("{} {}", marker, choice.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[allow(clippy::type_complexity)]
pub fn update_dialogue_box(
    active: Res<ActiveDialogue>,
    registry: Res<DialogueRegistry>,
    inventory: Res<Inventory>,
    mut texts: ParamSet<(
        Query<&mut Text, With<DialogueSpeaker>>,
        Query<&mut Text, With<DialogueText>>,
        Query<&mut Text, With<DialogueChoices>>,
    )>,
) {
    let Some(session) = &active.session else {
        return;
    };
    let Some(tree) = registry.get(&session.tree_id) else {
        return;
    };
    let Some(node) = session.node(tree) else {
        return;
    };
    let choices = choice_lines(&session.visible_choices(tree, &inventory), session.cursor);

    for mut t in &mut texts.p0() {
        t.0.clone_from(&node.speaker);
    }
    for mut t in &mut texts.p1() {
        t.0.clone_from(&node.text);
    }
    for mut t in &mut texts.p2() {
        t.0.clone_from(&choices);
    }
}
