//! Game tunables, read from a RON file before the app is built.
//!
//! Every field has a default, so a partial file only overrides what it names.
//! A missing file means "all defaults"; a malformed one is reported and also
//! falls back to defaults.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::attack::{Attack, CounterWindow, Lunge};
use crate::shared::*;

pub const CONFIG_PATH: &str = "assets/config.ron";

pub struct ConfigPlugin {
    pub config: GameConfig,
    pub origin: ConfigOrigin,
}

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(self.origin.clone())
            .add_systems(Startup, report_config_origin);
    }
}

/// Where the active config came from; logged once the log plugin is up.
#[derive(Resource, Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(String),
    Defaults,
    Fallback { path: String, reason: String },
}

fn report_config_origin(origin: Res<ConfigOrigin>) {
    match &*origin {
        ConfigOrigin::File(path) => info!("[Config] loaded {}", path),
        ConfigOrigin::Defaults => info!("[Config] no config file, using defaults"),
        ConfigOrigin::Fallback { path, reason } => {
            warn!("[Config] {} rejected ({}), using defaults", path, reason)
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid player attack: {0}")]
    Attack(#[from] crate::combat::attack::AttackError),

    #[error("invalid combat setting {field} = {value}")]
    Combat { field: &'static str, value: f32 },
}

// ═══════════════════════════════════════════════════════════════════════
// CONFIG TYPES
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub window_title: String,
    pub window_width: f32,
    pub window_height: f32,
    pub start_map: String,
    pub start_spawn: String,
    pub inventory_capacity: usize,
    pub interaction_radius: f32,
    pub player: PlayerTuning,
    pub enemies: EnemyTuning,
    pub combat: CombatConfig,
    pub audio: AudioConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_title: "Thornvale".into(),
            window_width: SCREEN_WIDTH,
            window_height: SCREEN_HEIGHT,
            start_map: "assets/maps/village.json".into(),
            start_spawn: "player_start".into(),
            inventory_capacity: 12,
            interaction_radius: 24.0,
            player: PlayerTuning::default(),
            enemies: EnemyTuning::default(),
            combat: CombatConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub max_health: f32,
    /// Collision footprint, width × height in map pixels.
    pub footprint: [f32; 2],
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            walk_speed: 80.0,
            run_speed: 140.0,
            max_health: 100.0,
            footprint: [10.0, 6.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub aggro_radius: f32,
    pub pursue_speed: f32,
    /// Distance at which a pursuing enemy starts a battle.
    pub engage_radius: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            aggro_radius: 96.0,
            pursue_speed: 45.0,
            engage_radius: 14.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Horizontal speed while approaching and returning, pixels per second.
    pub approach_speed: f32,
    pub move_threshold: f32,
    pub counter_damage: f32,
    pub battle_scale: f32,
    pub player_stage: [f32; 2],
    pub enemy_stage: [f32; 2],
    pub basic_attack: Attack,
    pub roll_attack: Attack,
    /// Holding this item unlocks `roll_attack`.
    pub roll_item: ItemId,
}

impl CombatConfig {
    pub fn player_stage(&self) -> Vec2 {
        Vec2::from_array(self.player_stage)
    }

    pub fn enemy_stage(&self) -> Vec2 {
        Vec2::from_array(self.enemy_stage)
    }

    pub fn stage_center(&self) -> Vec2 {
        (self.player_stage() + self.enemy_stage()) * 0.5
    }

    /// Rejects tuning that would leave a battle phase unable to finish.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, value: f32| -> Result<(), ConfigError> {
            Err(ConfigError::Combat { field, value })
        };

        // Negated comparisons also catch NaN.
        if !(self.approach_speed > 0.0) {
            return invalid("approach_speed", self.approach_speed);
        }
        if !(self.move_threshold >= 0.0) {
            return invalid("move_threshold", self.move_threshold);
        }
        if !(self.battle_scale > 0.0) {
            return invalid("battle_scale", self.battle_scale);
        }
        if !(self.counter_damage >= 0.0) {
            return invalid("counter_damage", self.counter_damage);
        }
        self.basic_attack.validate()?;
        self.roll_attack.validate()?;
        Ok(())
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            approach_speed: 160.0,
            move_threshold: 4.0,
            counter_damage: 5.0,
            battle_scale: 2.0,
            player_stage: [1940.0, 2000.0],
            enemy_stage: [2060.0, 2000.0],
            basic_attack: Attack {
                name: "Strike".into(),
                damage: 10.0,
                anim: AnimState::Attack,
                impact_time: 0.25,
                end_time: 0.5,
                reach: 20.0,
                lunge: None,
                counter_window: None,
                counterable: false,
            },
            roll_attack: Attack {
                name: "Tumble".into(),
                damage: 18.0,
                anim: AnimState::Roll,
                impact_time: 0.35,
                end_time: 0.7,
                reach: 28.0,
                lunge: Some(Lunge {
                    speed: 120.0,
                    target_offset: 16.0,
                    stop_threshold: 2.0,
                }),
                counter_window: None,
                counterable: false,
            },
            roll_item: "tumble_charm".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub music_volume: f32,
    pub sfx_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            sfx_volume: 0.8,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════

impl GameConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = ron::from_str(text)?;
        config.combat.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }
}

/// Never fails: falls back to defaults and says why.
pub fn load_config(path: impl AsRef<Path>) -> (GameConfig, ConfigOrigin) {
    let path = path.as_ref();
    let shown = path.display().to_string();
    match GameConfig::load(path) {
        Ok(config) => (config, ConfigOrigin::File(shown)),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            (GameConfig::default(), ConfigOrigin::Defaults)
        }
        Err(e) => (
            GameConfig::default(),
            ConfigOrigin::Fallback {
                path: shown,
                reason: e.to_string(),
            },
        ),
    }
}

/// Counter timings used by the sample enemies; kept here so data and tests
/// agree on one window.
pub fn standard_counter_window() -> CounterWindow {
    CounterWindow {
        start: 0.15,
        end: 0.35,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.combat.validate().is_ok());
        assert!(config.inventory_capacity > 0);
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let config = GameConfig::from_ron(
            "(inventory_capacity: 3, player: (run_speed: 200.0), audio: (music_volume: 0.1))",
        )
        .unwrap();

        assert_eq!(config.inventory_capacity, 3);
        assert_eq!(config.player.run_speed, 200.0);
        assert_eq!(config.player.walk_speed, 80.0);
        assert_eq!(config.audio.music_volume, 0.1);
        assert_eq!(config.audio.sfx_volume, 0.8);
        assert_eq!(config.combat.roll_item, "tumble_charm");
    }

    #[test]
    fn test_invalid_player_attack_is_rejected() {
        let text = r#"(combat: (basic_attack: (
            name: "Broken", damage: 1.0, anim: Attack, impact_time: 0.5, end_time: 0.2,
        )))"#;
        assert!(matches!(
            GameConfig::from_ron(text),
            Err(ConfigError::Attack(_))
        ));
    }

    #[test]
    fn test_stalling_combat_tuning_is_rejected() {
        for text in [
            "(combat: (approach_speed: 0.0))",
            "(combat: (move_threshold: -1.0))",
            "(combat: (battle_scale: 0.0))",
            "(combat: (counter_damage: -2.0))",
        ] {
            assert!(
                matches!(GameConfig::from_ron(text), Err(ConfigError::Combat { .. })),
                "{text} should be rejected"
            );
        }
        assert!(GameConfig::from_ron("(combat: (approach_speed: 90.0, move_threshold: 0.0))").is_ok());

        let nan_speed = CombatConfig {
            approach_speed: f32::NAN,
            ..default()
        };
        assert!(nan_speed.validate().is_err());
    }

    #[test]
    fn test_stalled_approach_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(combat: (approach_speed: 0.0))").unwrap();

        let (config, origin) = load_config(file.path());
        assert_eq!(config.combat.approach_speed, 160.0);
        assert!(matches!(origin, ConfigOrigin::Fallback { .. }));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, origin) = load_config(dir.path().join("nope.ron"));
        assert_eq!(origin, ConfigOrigin::Defaults);
        assert_eq!(config.inventory_capacity, 12);
    }

    #[test]
    fn test_malformed_file_falls_back_with_reason() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(inventory_capacity: \"lots\")").unwrap();

        let (config, origin) = load_config(file.path());
        assert_eq!(config.inventory_capacity, 12);
        assert!(matches!(origin, ConfigOrigin::Fallback { .. }));
    }
}
