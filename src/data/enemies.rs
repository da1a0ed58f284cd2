use bevy::prelude::*;

use crate::combat::attack::{Attack, Lunge};
use crate::combat::enemy::{EnemyDef, EnemyRegistry};
use crate::config::standard_counter_window;
use crate::shared::AnimState;

pub fn populate_enemies(registry: &mut EnemyRegistry) {
    // ── Slime ───────────────────────────────────────────────────────────────
    registry.register(EnemyDef {
        id: "slime".into(),
        name: "Slime".into(),
        max_health: 30.0,
        color: Color::srgb(0.35, 0.75, 0.4),
        size: Vec2::new(12.0, 10.0),
        attacks: vec![Attack {
            name: "Tackle".into(),
            damage: 6.0,
            anim: AnimState::Attack,
            impact_time: 0.3,
            end_time: 0.6,
            reach: 16.0,
            lunge: None,
            counter_window: Some(standard_counter_window()),
            counterable: true,
        }],
    });

    // ── Bandit ──────────────────────────────────────────────────────────────
    registry.register(EnemyDef {
        id: "bandit".into(),
        name: "Bandit".into(),
        max_health: 55.0,
        color: Color::srgb(0.7, 0.3, 0.3),
        size: Vec2::new(12.0, 16.0),
        attacks: vec![
            Attack {
                name: "Slash".into(),
                damage: 9.0,
                anim: AnimState::Attack,
                impact_time: 0.3,
                end_time: 0.55,
                reach: 20.0,
                lunge: None,
                counter_window: Some(standard_counter_window()),
                counterable: true,
            },
            // Too heavy to counter.
            Attack {
                name: "Slam".into(),
                damage: 15.0,
                anim: AnimState::Slam,
                impact_time: 0.5,
                end_time: 0.9,
                reach: 30.0,
                lunge: Some(Lunge {
                    speed: 140.0,
                    target_offset: 14.0,
                    stop_threshold: 2.0,
                }),
                counter_window: None,
                counterable: false,
            },
        ],
    });
}
