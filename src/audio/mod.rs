//! Sound effects and music. Other domains send `PlaySfxEvent` /
//! `PlayMusicEvent`; only this module knows where the files live.

use bevy::audio::Volume;
use bevy::prelude::*;

use crate::config::GameConfig;
use crate::shared::*;

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MusicState>()
            .add_systems(Update, (handle_play_sfx, handle_play_music))
            .add_systems(OnExit(GameState::Loading), start_overworld_music);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MUSIC STATE: tracks the currently playing music entity
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Default)]
pub struct MusicState {
    pub current_track: Option<Entity>,
    pub current_music: Option<Music>,
}

// ═══════════════════════════════════════════════════════════════════════
// PATH MAPPING
// ═══════════════════════════════════════════════════════════════════════

pub fn sfx_path(sfx: Sfx) -> &'static str {
    match sfx {
        Sfx::Pickup => "audio/sfx/sfx_coin_single1.ogg",
        Sfx::ChestOpen => "audio/sfx/sfx_sounds_interaction5.ogg",
        Sfx::Locked => "audio/sfx/sfx_sounds_interaction1.ogg",
        Sfx::PickaxeHit => "audio/sfx/sfx_sounds_impact3.ogg",
        Sfx::StoneBreak => "audio/sfx/sfx_sounds_impact5.ogg",
        Sfx::Swing => "audio/sfx/sfx_wpn_sword1.ogg",
        Sfx::Hit => "audio/sfx/sfx_damage_hit1.ogg",
        Sfx::Counter => "audio/sfx/sfx_wpn_parry1.ogg",
        Sfx::CounterMiss => "audio/sfx/sfx_sounds_negative1.ogg",
        Sfx::MenuMove => "audio/sfx/sfx_menu_move1.ogg",
        Sfx::MenuSelect => "audio/sfx/sfx_menu_select1.ogg",
        Sfx::Door => "audio/sfx/sfx_movement_dooropen1.ogg",
        Sfx::Victory => "audio/sfx/sfx_sounds_fanfare1.ogg",
        Sfx::Defeat => "audio/sfx/sfx_sounds_damage1.ogg",
        Sfx::Error => "audio/sfx/sfx_sounds_error1.ogg",
    }
}

pub fn music_path(music: Music) -> &'static str {
    match music {
        Music::Overworld => "audio/music/overworld.ogg",
        Music::Battle => "audio/music/battle.ogg",
        Music::GameOver => "audio/music/game_over.ogg",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

/// Spawns one-shot audio sources that despawn when done.
pub fn handle_play_sfx(
    mut events: EventReader<PlaySfxEvent>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<GameConfig>,
) {
    for PlaySfxEvent(sfx) in events.read() {
        commands.spawn((
            AudioPlayer::new(asset_server.load(sfx_path(*sfx))),
            PlaybackSettings::DESPAWN.with_volume(Volume::new(config.audio.sfx_volume)),
        ));
    }
}

/// Swaps the looping music track. Asking for the track already playing
/// leaves it alone.
pub fn handle_play_music(
    mut events: EventReader<PlayMusicEvent>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<GameConfig>,
    mut music_state: ResMut<MusicState>,
) {
    let Some(PlayMusicEvent(music)) = events.read().last().copied() else {
        return;
    };
    if music_state.current_music == Some(music) {
        return;
    }
    if let Some(entity) = music_state.current_track.take() {
        commands.entity(entity).despawn_recursive();
    }

    let entity = commands
        .spawn((
            AudioPlayer::new(asset_server.load(music_path(music))),
            PlaybackSettings::LOOP.with_volume(Volume::new(config.audio.music_volume)),
        ))
        .id();
    music_state.current_track = Some(entity);
    music_state.current_music = Some(music);
}

fn start_overworld_music(mut music_events: EventWriter<PlayMusicEvent>) {
    music_events.send(PlayMusicEvent(Music::Overworld));
}
