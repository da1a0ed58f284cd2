use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::window::{PresentMode, WindowResolution};

use thornvale::config::{load_config, ConfigPlugin, CONFIG_PATH};
use thornvale::inventory::Inventory;
use thornvale::shared::*;
use thornvale::{
    animation, audio, combat, data, dialogue, input, interact, inventory, player, save, ui,
    world,
};

fn main() {
    // Read before the app exists so the window can use it.
    let (config, origin) = load_config(CONFIG_PATH);

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: config.window_title.clone(),
                        resolution: WindowResolution::new(config.window_width, config.window_height),
                        present_mode: PresentMode::AutoVsync,
                        resizable: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(ImagePlugin::default_nearest())
                .set(LogPlugin {
                    filter: "wgpu=error,naga=warn,thornvale=info".into(),
                    ..default()
                }),
        )
        // Config first: everything below reads it
        .add_plugins(ConfigPlugin { config, origin })
        // Game state
        .init_state::<GameState>()
        // Shared resources
        .init_resource::<PlayerState>()
        .init_resource::<Inventory>()
        // Events
        .add_event::<ItemPickupEvent>()
        .add_event::<ItemRemovedEvent>()
        .add_event::<MapLoadedEvent>()
        .add_event::<MapTransitionEvent>()
        .add_event::<DialogueStartEvent>()
        .add_event::<DialogueEndEvent>()
        .add_event::<CombatStartEvent>()
        .add_event::<CombatEndEvent>()
        .add_event::<ToastEvent>()
        .add_event::<PlaySfxEvent>()
        .add_event::<PlayMusicEvent>()
        // Domain plugins
        .add_plugins(input::InputPlugin)
        .add_plugins(world::WorldPlugin)
        .add_plugins(inventory::InventoryPlugin)
        .add_plugins(animation::AnimationPlugin)
        .add_plugins(interact::InteractPlugin)
        .add_plugins(dialogue::DialoguePlugin)
        .add_plugins(combat::CombatPlugin)
        .add_plugins(player::PlayerPlugin)
        .add_plugins(audio::AudioPlugin)
        .add_plugins(save::SavePlugin)
        .add_plugins(ui::UiPlugin)
        // Data loading
        .add_plugins(data::DataPlugin)
        // Camera
        .add_systems(Startup, setup_camera)
        .run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Transform::from_scale(Vec3::splat(1.0 / PIXEL_SCALE)),
    ));
}
