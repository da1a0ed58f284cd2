use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::input::PlayerInput;
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// PUBLIC TYPES
// ═══════════════════════════════════════════════════════════════════════

pub const SAVE_VERSION: u32 = 1;
pub const SAVE_FILE_NAME: &str = "save.json";

/// What a quicksave remembers. Every field defaults, so older or hand-edited
/// files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    pub version: u32,
    pub health: f32,
    pub x: f32,
    pub y: f32,
    pub score: u32,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            health: 100.0,
            x: 0.0,
            y: 0.0,
            score: 0,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SaveError {
    #[error("save I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("save file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The directory saves live in.
#[derive(Resource, Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The per-user data directory, or `./saves` when the platform has none.
    pub fn user_default() -> Self {
        match ProjectDirs::from("", "", "Thornvale") {
            Some(dirs) => Self::new(dirs.data_dir()),
            None => {
                warn!("[Save] no user data directory, saving next to the game");
                Self::new("saves")
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SAVE_FILE_NAME)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Writes pretty JSON through a temp file so a crash never leaves a
    /// half-written save behind.
    pub fn save(&self, data: &SaveData) -> Result<(), SaveError> {
        let path = self.path();
        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        let json = serde_json::to_string_pretty(data).map_err(|source| SaveError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err(&tmp_path))?;
        fs::rename(&tmp_path, &path).map_err(io_err(&path))?;
        Ok(())
    }

    pub fn load(&self) -> Result<SaveData, SaveError> {
        let path = self.path();
        let json = fs::read_to_string(&path).map_err(io_err(&path))?;
        let data: SaveData =
            serde_json::from_str(&json).map_err(|source| SaveError::Json { path, source })?;
        if data.version != SAVE_VERSION {
            warn!(
                "[Save] file version {} differs from {}, loading anyway",
                data.version, SAVE_VERSION
            );
        }
        Ok(data)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SaveError {
    let path = path.to_path_buf();
    move |source| SaveError::Io { path, source }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone, Copy)]
pub struct SaveRequestEvent;

#[derive(Event, Debug, Clone, Copy)]
pub struct LoadRequestEvent;

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<SaveStore>() {
            app.insert_resource(SaveStore::user_default());
        }
        app.add_event::<SaveRequestEvent>()
            .add_event::<LoadRequestEvent>()
            .add_systems(
                Update,
                (quicksave_keybind, handle_save_request, handle_load_request)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

/// F5 = quicksave, F9 = quickload.
fn quicksave_keybind(
    player_input: Res<PlayerInput>,
    mut save_writer: EventWriter<SaveRequestEvent>,
    mut load_writer: EventWriter<LoadRequestEvent>,
) {
    if player_input.quicksave {
        save_writer.send(SaveRequestEvent);
    }
    if player_input.quickload {
        load_writer.send(LoadRequestEvent);
    }
}

pub fn handle_save_request(
    mut events: EventReader<SaveRequestEvent>,
    store: Res<SaveStore>,
    player_state: Res<PlayerState>,
    player: Query<(&LogicalPosition, &Vitals), With<Player>>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if events.read().last().is_none() {
        return;
    }
    let Ok((pos, vitals)) = player.get_single() else {
        return;
    };

    let data = SaveData {
        version: SAVE_VERSION,
        health: vitals.health,
        x: pos.0.x,
        y: pos.0.y,
        score: player_state.score,
    };
    match store.save(&data) {
        Ok(()) => {
            info!("[Save] wrote {}", store.path().display());
            toasts.send(ToastEvent::new("Game saved."));
        }
        Err(e) => {
            error!("[Save] {}", e);
            toasts.send(ToastEvent::new("Save failed!"));
        }
    }
}

pub fn handle_load_request(
    mut events: EventReader<LoadRequestEvent>,
    store: Res<SaveStore>,
    mut player_state: ResMut<PlayerState>,
    mut player: Query<(&mut LogicalPosition, &mut Vitals), With<Player>>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if events.read().last().is_none() {
        return;
    }
    if !store.exists() {
        toasts.send(ToastEvent::new("No save yet."));
        return;
    }

    match store.load() {
        Ok(data) => {
            if let Ok((mut pos, mut vitals)) = player.get_single_mut() {
                pos.0 = Vec2::new(data.x, data.y);
                vitals.health = data.health.clamp(0.0, vitals.max_health);
            }
            player_state.score = data.score;
            info!("[Save] loaded {}", store.path().display());
            toasts.send(ToastEvent::new("Game loaded."));
        }
        Err(e) => {
            error!("[Save] {}", e);
            toasts.send(ToastEvent::new("Load failed!"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("nested"));
        assert!(!store.exists());

        let data = SaveData {
            version: SAVE_VERSION,
            health: 42.5,
            x: 120.0,
            y: 64.0,
            score: 30,
        };
        store.save(&data).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), data);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_missing_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path());
        fs::write(store.path(), r#"{ "score": 7 }"#).unwrap();

        let data = store.load().unwrap();
        assert_eq!(data.score, 7);
        assert_eq!(data.health, 100.0);
        assert_eq!(data.version, SAVE_VERSION);
    }

    #[test]
    fn test_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path());
        assert!(matches!(store.load(), Err(SaveError::Io { .. })));

        fs::write(store.path(), "not json").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, SaveError::Json { .. }));
        assert!(err.to_string().contains(SAVE_FILE_NAME));
    }
}
