use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::animation::{AnimationSet, Animator};
use crate::combat::attack::Attack;
use crate::config::{EnemyTuning, GameConfig};
use crate::shared::*;
use crate::world::{MapObjectKind, TileManager};

#[derive(Debug, Clone)]
pub struct EnemyDef {
    pub id: String,
    pub name: String,
    pub max_health: f32,
    pub color: Color,
    pub size: Vec2,
    pub attacks: Vec<Attack>,
}

#[derive(Resource, Debug, Default)]
pub struct EnemyRegistry {
    pub enemies: HashMap<String, EnemyDef>,
}

impl EnemyRegistry {
    pub fn register(&mut self, def: EnemyDef) {
        self.enemies.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&EnemyDef> {
        self.enemies.get(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnemyMode {
    #[default]
    Idle,
    Pursue,
    Return,
}

#[derive(Component, Debug, Clone)]
pub struct Enemy {
    pub def_id: String,
    /// `map#object` name, used to keep beaten enemies gone.
    pub key: String,
    pub attacks: Vec<Attack>,
    pub home: Vec2,
    pub mode: EnemyMode,
}

/// Enemies beaten this session.
#[derive(Resource, Debug, Default)]
pub struct DefeatedEnemies(pub HashSet<String>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiStep {
    pub position: Vec2,
    pub mode: EnemyMode,
    pub engage: bool,
}

/// Idle at home, chase a player inside the aggro radius, walk back home
/// when the player gets away.
pub fn ai_step(position: Vec2, home: Vec2, player: Vec2, tuning: &EnemyTuning, dt: f32) -> AiStep {
    let to_player = player - position;
    if to_player.length() <= tuning.engage_radius {
        return AiStep {
            position,
            mode: EnemyMode::Pursue,
            engage: true,
        };
    }

    let max_step = tuning.pursue_speed * dt;
    let (target, mode) = if to_player.length() <= tuning.aggro_radius {
        (player, EnemyMode::Pursue)
    } else if position.distance(home) > 1.0 {
        (home, EnemyMode::Return)
    } else {
        return AiStep {
            position: home,
            mode: EnemyMode::Idle,
            engage: false,
        };
    };

    AiStep {
        position: position + (target - position).clamp_length_max(max_step),
        mode,
        engage: false,
    }
}

pub fn spawn_enemies(
    mut commands: Commands,
    mut events: EventReader<MapLoadedEvent>,
    tiles: Res<TileManager>,
    registry: Res<EnemyRegistry>,
    defeated: Res<DefeatedEnemies>,
) {
    let Some(loaded) = events.read().last() else {
        return;
    };

    for object in tiles
        .objects()
        .iter()
        .filter(|o| o.kind == MapObjectKind::Enemy)
    {
        let key = format!("{}#{}", loaded.path, object.name);
        if defeated.0.contains(&key) {
            continue;
        }
        let def_id = object.property("enemy").unwrap_or(object.name.as_str());
        let Some(def) = registry.get(def_id) else {
            warn!("[Combat] no enemy definition for '{}'", def_id);
            continue;
        };

        let home = object.center();
        commands.spawn((
            MapEntity,
            Name::new(def.name.clone()),
            Enemy {
                def_id: def.id.clone(),
                key,
                attacks: def.attacks.clone(),
                home,
                mode: EnemyMode::Idle,
            },
            LogicalPosition(home),
            YSorted,
            Footprint(Vec2::new(def.size.x, def.size.y * 0.5)),
            Body::default(),
            Vitals::full(def.max_health),
            AnimationSet::humanoid(),
            Animator::default(),
            Tint(def.color),
            Sprite {
                color: def.color,
                custom_size: Some(def.size),
                ..default()
            },
            Transform::default(),
            Visibility::default(),
        ));
    }
}

pub fn enemy_ai(
    time: Res<Time>,
    config: Res<GameConfig>,
    player: Query<&LogicalPosition, With<Player>>,
    mut enemies: Query<(Entity, &mut Enemy, &mut LogicalPosition, &mut Body), Without<Player>>,
    mut combat_events: EventWriter<CombatStartEvent>,
) {
    let Ok(player_pos) = player.get_single() else {
        return;
    };
    let dt = time.delta_secs();

    for (entity, mut enemy, mut pos, mut body) in &mut enemies {
        let step = ai_step(pos.0, enemy.home, player_pos.0, &config.enemies, dt);
        if let Some(facing) = Facing::from_velocity(step.position - pos.0) {
            body.facing = facing;
        }
        body.anim = if step.position != pos.0 {
            AnimState::Walk
        } else {
            AnimState::Idle
        };
        pos.0 = step.position;
        enemy.mode = step.mode;

        if step.engage {
            combat_events.send(CombatStartEvent { enemy: entity });
            // One battle at a time.
            return;
        }
    }
}
