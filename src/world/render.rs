use std::collections::HashMap;

use bevy::prelude::*;

use super::tiles::{TileLayerKind, TileManager, TileRenderInfo};
use crate::shared::*;

/// GPU handles for tileset images, uploaded once per path.
#[derive(Resource, Default)]
pub struct TileTextureHandles {
    handles: HashMap<String, Handle<Image>>,
}

impl TileTextureHandles {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct MapTile(pub TileLayerKind);

/// Draw depth per layer: background flat at the bottom, decorations sorted
/// with entities by their base, overlay above everything.
pub fn tile_z(tile: &TileRenderInfo) -> f32 {
    match tile.layer {
        TileLayerKind::Background => Z_BACKGROUND,
        TileLayerKind::Decoration => y_sort_z(tile.base_y()),
        TileLayerKind::Overlay => Z_OVERLAY,
    }
}

pub fn spawn_map_tiles(
    mut commands: Commands,
    mut events: EventReader<MapLoadedEvent>,
    tiles: Res<TileManager>,
    mut handles: ResMut<TileTextureHandles>,
    images: Option<ResMut<Assets<Image>>>,
) {
    if events.read().last().is_none() {
        return;
    }
    // Headless apps have no image assets; nothing to draw.
    let Some(mut images) = images else {
        return;
    };

    let all = tiles
        .background_tiles()
        .iter()
        .chain(tiles.decoration_tiles())
        .chain(tiles.overlay_tiles());

    let mut spawned = 0usize;
    for tile in all {
        let handle = match handles.handles.get(&tile.image_path) {
            Some(handle) => handle.clone(),
            None => {
                let Some(image) = tiles.textures().get(&tile.image_path) else {
                    continue;
                };
                let handle = images.add(image.clone());
                handles
                    .handles
                    .insert(tile.image_path.clone(), handle.clone());
                handle
            }
        };

        commands.spawn((
            MapEntity,
            MapTile(tile.layer),
            Sprite {
                image: handle,
                rect: Some(tile.source),
                ..default()
            },
            Transform::from_translation(map_to_world(tile.center(), tile_z(tile))),
            Visibility::default(),
        ));
        spawned += 1;
    }
    debug!("[Map] spawned {} tile sprites", spawned);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(layer: TileLayerKind, y: f32) -> TileRenderInfo {
        TileRenderInfo {
            image_path: "t.png".into(),
            source: Rect::new(0.0, 0.0, 16.0, 32.0),
            position: Vec2::new(0.0, y),
            layer,
            collision: None,
        }
    }

    #[test]
    fn test_decoration_depth_follows_base_and_stays_between_layers() {
        let near = tile(TileLayerKind::Decoration, 64.0);
        let far = tile(TileLayerKind::Decoration, 0.0);
        assert!(tile_z(&near) > tile_z(&far));
        assert!(tile_z(&far) > tile_z(&tile(TileLayerKind::Background, 0.0)));
        assert!(tile_z(&near) < tile_z(&tile(TileLayerKind::Overlay, 0.0)));
    }
}
