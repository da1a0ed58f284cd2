use bevy::prelude::*;

use crate::shared::*;

/// Most toasts on screen at once; the oldest goes first.
pub const MAX_TOASTS: usize = 3;
const FADE_SECS: f32 = 0.5;

// ═══════════════════════════════════════════════════════════════════════
// COMPONENTS
// ═══════════════════════════════════════════════════════════════════════

/// Marker for the toast container node (top-center of screen).
#[derive(Component)]
pub struct ToastContainer;

#[derive(Component)]
pub struct ToastItem {
    pub timer: Timer,
    pub fade_timer: Option<Timer>,
}

impl ToastItem {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            timer: Timer::from_seconds(duration_secs, TimerMode::Once),
            fade_timer: None,
        }
    }

    /// Ticks the toast. Returns its opacity, or `None` once it has faded out.
    pub fn tick(&mut self, delta: std::time::Duration) -> Option<f32> {
        match self.fade_timer.as_mut() {
            None => {
                self.timer.tick(delta);
                if self.timer.finished() {
                    self.fade_timer = Some(Timer::from_seconds(FADE_SECS, TimerMode::Once));
                }
                Some(1.0)
            }
            Some(fade) => {
                fade.tick(delta);
                if fade.finished() {
                    None
                } else {
                    Some(1.0 - fade.fraction())
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

pub fn spawn_toast_container(mut commands: Commands) {
    commands.spawn((
        ToastContainer,
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(48.0),
            width: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(6.0),
            align_items: AlignItems::Center,
            ..default()
        },
    ));
}

pub fn handle_toast_events(
    mut commands: Commands,
    mut events: EventReader<ToastEvent>,
    container: Query<Entity, With<ToastContainer>>,
    existing: Query<Entity, With<ToastItem>>,
) {
    let Ok(container) = container.get_single() else {
        return;
    };

    let mut alive: Vec<Entity> = existing.iter().collect();
    for event in events.read() {
        if alive.len() >= MAX_TOASTS {
            let oldest = alive.remove(0);
            commands.entity(oldest).despawn_recursive();
        }

        let toast = commands
            .spawn((
                ToastItem::new(event.duration_secs),
                Node {
                    padding: UiRect::axes(Val::Px(12.0), Val::Px(5.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.75)),
                BorderColor(Color::srgba(0.5, 0.5, 0.5, 0.5)),
            ))
            .with_children(|parent| {
                parent.spawn((
                    Text::new(event.message.clone()),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(Color::WHITE),
                ));
            })
            .id();
        commands.entity(container).add_child(toast);
        alive.push(toast);
    }
}

pub fn update_toasts(
    mut commands: Commands,
    time: Res<Time>,
    mut toasts: Query<(Entity, &mut ToastItem, &mut BackgroundColor, &Children)>,
    mut text_colors: Query<&mut TextColor>,
) {
    for (entity, mut toast, mut bg_color, children) in &mut toasts {
        let Some(alpha) = toast.tick(time.delta()) else {
            commands.entity(entity).despawn_recursive();
            continue;
        };
        if alpha >= 1.0 {
            continue;
        }
        bg_color.0 = bg_color.0.with_alpha(0.75 * alpha);
        for &child in children.iter() {
            if let Ok(mut text_color) = text_colors.get_mut(child) {
                text_color.0 = Color::srgba(1.0, 1.0, 1.0, alpha);
            }
        }
    }
}
