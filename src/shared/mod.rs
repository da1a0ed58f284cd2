//! Shared components, resources, events, and states for Thornvale.
//!
//! This is the type contract. Every domain plugin imports from here.
//! Domains talk to each other through these resources and events only.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// GAME STATE: top-level state machine
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum GameState {
    #[default]
    Loading,
    Playing,
    Dialogue,
    Combat,
    GameOver,
}

// ═══════════════════════════════════════════════════════════════════════
// POSITION & FACING
// ═══════════════════════════════════════════════════════════════════════

/// Position in map space: pixels, origin top-left, Y grows downward
/// (the same space the tile map is authored in).
///
/// `ysort::sync_position_and_ysort` turns this into a `Transform`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct LogicalPosition(pub Vec2);

/// Entities carrying this marker get their Z derived from their map Y.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct YSorted;

/// Size of the entity's footprint box, centred on its `LogicalPosition`.
#[derive(Component, Debug, Clone, Copy)]
pub struct Footprint(pub Vec2);

impl Footprint {
    pub fn rect_at(&self, center: Vec2) -> Rect {
        Rect::from_center_size(center, self.0)
    }
}

/// Blocks player movement with its footprint.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Solid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Horizontal facing pointing from `from_x` toward `to_x`.
    pub fn toward_x(from_x: f32, to_x: f32) -> Self {
        if to_x >= from_x {
            Facing::Right
        } else {
            Facing::Left
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Facing::Up => Facing::Down,
            Facing::Down => Facing::Up,
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Facing derived from a velocity; the dominant axis wins.
    /// Returns `None` for a zero velocity so callers keep their last facing.
    pub fn from_velocity(velocity: Vec2) -> Option<Self> {
        if velocity == Vec2::ZERO {
            return None;
        }
        if velocity.x.abs() >= velocity.y.abs() {
            Some(if velocity.x > 0.0 { Facing::Right } else { Facing::Left })
        } else {
            // Map space: +Y is down the screen.
            Some(if velocity.y > 0.0 { Facing::Down } else { Facing::Up })
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// BODIES: what every animated actor carries
// ═══════════════════════════════════════════════════════════════════════

/// Animation/state tag shared by the player, enemies and NPCs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnimState {
    #[default]
    Idle,
    Walk,
    Run,
    Mining,
    Attack,
    Roll,
    Slam,
    Hurt,
    Counter,
    Dead,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Body {
    pub facing: Facing,
    pub scale: f32,
    pub anim: AnimState,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            facing: Facing::Down,
            scale: 1.0,
            anim: AnimState::Idle,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub health: f32,
    pub max_health: f32,
}

impl Vitals {
    pub fn full(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

/// Base colour of the placeholder sprite; the body visuals system tints it
/// per animation state.
#[derive(Component, Debug, Clone, Copy)]
pub struct Tint(pub Color);

// ═══════════════════════════════════════════════════════════════════════
// PLAYER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Component, Debug, Clone, Default)]
pub struct Player;

#[derive(Component, Debug, Clone)]
pub struct PlayerMovement {
    pub is_moving: bool,
    pub is_running: bool,
    pub speed: f32,
}

impl Default for PlayerMovement {
    fn default() -> Self {
        Self {
            is_moving: false,
            is_running: false,
            speed: 80.0,
        }
    }
}

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerState {
    pub score: u32,
    pub current_map: String,
}

/// Marker for anything spawned from the current map (tiles, chests, enemies).
/// Map transitions despawn all of them at once.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct MapEntity;

pub type ItemId = String;

// ═══════════════════════════════════════════════════════════════════════
// EVENTS: cross-domain communication
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone)]
pub struct ItemPickupEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Event, Debug, Clone)]
pub struct ItemRemovedEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// Sent after a map has been parsed; spawners read `TileManager` objects.
#[derive(Event, Debug, Clone)]
pub struct MapLoadedEvent {
    pub path: String,
    pub spawn_name: Option<String>,
}

#[derive(Event, Debug, Clone)]
pub struct MapTransitionEvent {
    pub map_path: String,
    pub spawn_name: Option<String>,
}

#[derive(Event, Debug, Clone)]
pub struct DialogueStartEvent {
    pub npc: Entity,
    pub tree_id: String,
}

#[derive(Event, Debug, Clone)]
pub struct DialogueEndEvent;

#[derive(Event, Debug, Clone)]
pub struct CombatStartEvent {
    pub enemy: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    Victory,
    Defeat,
}

#[derive(Event, Debug, Clone)]
pub struct CombatEndEvent {
    pub enemy: Entity,
    pub outcome: CombatOutcome,
}

#[derive(Event, Debug, Clone)]
pub struct ToastEvent {
    pub message: String,
    pub duration_secs: f32,
}

impl ToastEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration_secs: 2.5,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// AUDIO: closed id sets, paths live in `audio`
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sfx {
    Pickup,
    ChestOpen,
    Locked,
    PickaxeHit,
    StoneBreak,
    Swing,
    Hit,
    Counter,
    CounterMiss,
    MenuMove,
    MenuSelect,
    Door,
    Victory,
    Defeat,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Music {
    Overworld,
    Battle,
    GameOver,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct PlaySfxEvent(pub Sfx);

#[derive(Event, Debug, Clone, Copy)]
pub struct PlayMusicEvent(pub Music);

// ═══════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════

pub const TILE_SIZE: f32 = 16.0;
pub const PIXEL_SCALE: f32 = 3.0; // render scale (16px × 3 = 48px on screen)
pub const SCREEN_WIDTH: f32 = 960.0;
pub const SCREEN_HEIGHT: f32 = 540.0;

pub const Z_BACKGROUND: f32 = 0.0;
pub const Z_ENTITY_BASE: f32 = 100.0;
pub const Z_Y_SORT_SCALE: f32 = 0.01;
pub const Z_OVERLAY: f32 = 900.0;

/// Map space (Y down) → Bevy world space (Y up).
pub fn map_to_world(position: Vec2, z: f32) -> Vec3 {
    Vec3::new(position.x, -position.y, z)
}

/// Draw depth for a Y-sorted object whose base sits at `map_y`.
pub fn y_sort_z(map_y: f32) -> f32 {
    Z_ENTITY_BASE + map_y * Z_Y_SORT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_from_velocity_prefers_dominant_axis() {
        assert_eq!(Facing::from_velocity(Vec2::new(3.0, 1.0)), Some(Facing::Right));
        assert_eq!(Facing::from_velocity(Vec2::new(-3.0, 1.0)), Some(Facing::Left));
        assert_eq!(Facing::from_velocity(Vec2::new(0.5, 2.0)), Some(Facing::Down));
        assert_eq!(Facing::from_velocity(Vec2::new(0.5, -2.0)), Some(Facing::Up));
        assert_eq!(Facing::from_velocity(Vec2::ZERO), None);
    }

    #[test]
    fn test_y_sort_z_increases_down_the_map() {
        assert!(y_sort_z(200.0) > y_sort_z(100.0));
        assert!(y_sort_z(10_000.0) < Z_OVERLAY);
    }
}
