//! Tile map ingestion: Tiled JSON → background, decoration and overlay tiles,
//! collision rectangles, and map objects.
//!
//! All positions are map space (pixels, Y down). Load either succeeds and
//! replaces every tile list at once, or fails and leaves the previous map in
//! place.

use std::collections::HashMap;
use std::path::Path;

use bevy::prelude::*;

use super::textures::{opaque_bounds, TextureCache};
use super::tiled::{TiledLayer, TiledMap, TiledObject, GID_FLAG_MASK};

/// Tile layers in draw order. Anything else is ignored.
pub const LAYER_ORDER: [&str; 5] = [
    "background",
    "ground",
    "decorations",
    "decoration_overlay",
    "overlay",
];

#[derive(thiserror::Error, Debug)]
pub enum MapLoadError {
    #[error("cannot read map {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed map {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("map {path}: unsupported orientation '{orientation}'")]
    Orientation { path: String, orientation: String },

    #[error("map {path} is invalid: {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileLayerKind {
    Background,
    Decoration,
    Overlay,
}

impl TileLayerKind {
    fn for_layer(name: &str) -> Option<Self> {
        match name {
            "background" | "ground" => Some(TileLayerKind::Background),
            "decorations" | "decoration_overlay" => Some(TileLayerKind::Decoration),
            "overlay" => Some(TileLayerKind::Overlay),
            _ => None,
        }
    }
}

/// One placed tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRenderInfo {
    pub image_path: String,
    /// Pixel rectangle inside the tileset image.
    pub source: Rect,
    /// Top-left corner in map space.
    pub position: Vec2,
    pub layer: TileLayerKind,
    /// Opaque-pixel box in map space, only on collidable decorations.
    pub collision: Option<Rect>,
}

impl TileRenderInfo {
    pub fn size(&self) -> Vec2 {
        self.source.size()
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size() * 0.5
    }

    /// Map Y of the tile's bottom edge, used for depth sorting.
    pub fn base_y(&self) -> f32 {
        self.position.y + self.size().y
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapObjectKind {
    Spawn,
    Chest,
    Stone,
    Npc,
    Enemy,
    Portal,
    Other(String),
}

impl MapObjectKind {
    fn parse(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "spawn" => MapObjectKind::Spawn,
            "chest" => MapObjectKind::Chest,
            "stone" => MapObjectKind::Stone,
            "npc" => MapObjectKind::Npc,
            "enemy" => MapObjectKind::Enemy,
            "portal" => MapObjectKind::Portal,
            other => MapObjectKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub kind: MapObjectKind,
    pub name: String,
    pub rect: Rect,
    pub properties: HashMap<String, String>,
}

impl MapObject {
    fn from_tiled(object: &TiledObject) -> Self {
        Self {
            kind: MapObjectKind::parse(object.kind()),
            name: object.name.clone(),
            rect: object.rect(),
            properties: object.property_map(),
        }
    }

    /// Point objects have a zero-size rect, so this is their position.
    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn property_or<T: std::str::FromStr>(&self, key: &str, fallback: T) -> T {
        self.property(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSummary {
    pub path: String,
    pub size: Vec2,
    pub tile_size: Vec2,
    pub tiles: usize,
    pub dropped_tiles: usize,
    pub collision_rects: usize,
    pub objects: usize,
}

#[derive(Default)]
struct LoadedMap {
    background: Vec<TileRenderInfo>,
    decorations: Vec<TileRenderInfo>,
    overlay: Vec<TileRenderInfo>,
    collision_rects: Vec<Rect>,
    objects: Vec<MapObject>,
    dropped: usize,
}

/// The current map. Owns its texture cache and every tile list.
#[derive(Resource, Default)]
pub struct TileManager {
    textures: TextureCache,
    current: LoadedMap,
    map_path: Option<String>,
    size: Vec2,
    tile_size: Vec2,
    generation: u64,
}

impl TileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_map(&mut self, path: impl AsRef<Path>) -> Result<MapSummary, MapLoadError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| MapLoadError::Io {
            path: shown.clone(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        self.load_from_str(&json, base_dir, &shown)
    }

    /// Parses `json` as a map whose tileset images live relative to `base_dir`.
    pub fn load_from_str(
        &mut self,
        json: &str,
        base_dir: &Path,
        label: &str,
    ) -> Result<MapSummary, MapLoadError> {
        let map = TiledMap::from_json(json).map_err(|source| MapLoadError::Parse {
            path: label.to_string(),
            source,
        })?;
        if map.orientation != "orthogonal" {
            return Err(MapLoadError::Orientation {
                path: label.to_string(),
                orientation: map.orientation,
            });
        }
        let (Some(pixel_width), Some(pixel_height)) = (
            map.width.checked_mul(map.tilewidth),
            map.height.checked_mul(map.tileheight),
        ) else {
            return Err(MapLoadError::Invalid {
                path: label.to_string(),
                reason: format!(
                    "{}x{} tiles of {}x{} px overflow the pixel size",
                    map.width, map.height, map.tilewidth, map.tileheight
                ),
            });
        };

        let loaded = build_map(&map, base_dir, &mut self.textures);
        if loaded.dropped > 0 {
            warn!("[Map] {}: dropped {} tiles with missing textures", label, loaded.dropped);
        }

        self.current = loaded;
        self.map_path = Some(label.to_string());
        self.size = Vec2::new(pixel_width as f32, pixel_height as f32);
        self.tile_size = Vec2::new(map.tilewidth as f32, map.tileheight as f32);
        self.generation += 1;

        let summary = MapSummary {
            path: label.to_string(),
            size: self.size,
            tile_size: self.tile_size,
            tiles: self.current.background.len()
                + self.current.decorations.len()
                + self.current.overlay.len(),
            dropped_tiles: self.current.dropped,
            collision_rects: self.current.collision_rects.len(),
            objects: self.current.objects.len(),
        };
        info!(
            "[Map] loaded {}: {} tiles, {} collision boxes, {} objects",
            label, summary.tiles, summary.collision_rects, summary.objects
        );
        Ok(summary)
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.current = LoadedMap::default();
        self.map_path = None;
        self.size = Vec2::ZERO;
        self.tile_size = Vec2::ZERO;
        self.generation += 1;
    }

    pub fn is_loaded(&self) -> bool {
        self.map_path.is_some()
    }

    pub fn map_path(&self) -> Option<&str> {
        self.map_path.as_deref()
    }

    /// Bumped on every load or clear so renderers know to rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    pub fn background_tiles(&self) -> &[TileRenderInfo] {
        &self.current.background
    }

    /// Sorted by ascending map Y.
    pub fn decoration_tiles(&self) -> &[TileRenderInfo] {
        &self.current.decorations
    }

    pub fn overlay_tiles(&self) -> &[TileRenderInfo] {
        &self.current.overlay
    }

    pub fn collision_rects(&self) -> &[Rect] {
        &self.current.collision_rects
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.current.objects
    }

    pub fn spawn_point(&self, name: &str) -> Option<Vec2> {
        self.current
            .objects
            .iter()
            .find(|o| o.kind == MapObjectKind::Spawn && o.name == name)
            .map(MapObject::center)
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }
}

fn build_map(map: &TiledMap, base_dir: &Path, textures: &mut TextureCache) -> LoadedMap {
    let mut loaded = LoadedMap::default();

    for tileset in map.tilesets.iter().filter(|ts| ts.source.is_some()) {
        warn!(
            "[Map] external tileset {:?} is not supported; its tiles will be dropped",
            tileset.source
        );
    }

    for layer in map.layers.iter().filter(|l| l.is_tile_layer()) {
        if TileLayerKind::for_layer(&layer.name).is_none() {
            debug!("[Map] ignoring tile layer '{}'", layer.name);
        }
    }

    for name in LAYER_ORDER {
        let Some(kind) = TileLayerKind::for_layer(name) else {
            continue;
        };
        for layer in map
            .layers
            .iter()
            .filter(|l| l.is_tile_layer() && l.name == name)
        {
            read_tile_layer(map, layer, kind, base_dir, textures, &mut loaded);
        }
    }

    loaded
        .decorations
        .sort_by(|a, b| a.position.y.total_cmp(&b.position.y));

    loaded.objects = map
        .layers
        .iter()
        .filter(|l| l.is_object_layer())
        .flat_map(|l| l.objects.iter().map(MapObject::from_tiled))
        .collect();

    loaded
}

fn read_tile_layer(
    map: &TiledMap,
    layer: &TiledLayer,
    kind: TileLayerKind,
    base_dir: &Path,
    textures: &mut TextureCache,
    loaded: &mut LoadedMap,
) {
    let columns = if layer.width > 0 { layer.width } else { map.width };
    let collidable = kind == TileLayerKind::Decoration && layer.bool_property("collidable");

    for (index, raw_gid) in layer.data.iter().enumerate() {
        let gid = raw_gid & GID_FLAG_MASK;
        if gid == 0 || columns == 0 {
            continue;
        }
        let Some((tileset, local_id)) = map.tileset_for(gid) else {
            loaded.dropped += 1;
            continue;
        };
        if tileset.source.is_some() {
            loaded.dropped += 1;
            continue;
        }
        let Some(source) = tileset.source_rect(local_id) else {
            loaded.dropped += 1;
            continue;
        };

        let image_path = base_dir.join(&tileset.image).to_string_lossy().into_owned();
        let image = match textures.get_or_load(&image_path) {
            Ok(image) => image,
            Err(e) => {
                error!("[Map] {}", e);
                loaded.dropped += 1;
                continue;
            }
        };

        let col = index as u32 % columns;
        let row = index as u32 / columns;
        // Tiles taller than a cell hang upward from the cell's bottom edge.
        let position = Vec2::new(
            col as f32 * map.tilewidth as f32,
            (row as f32 + 1.0) * map.tileheight as f32 - source.height(),
        );

        let collision = if collidable {
            opaque_bounds(image, source).map(|local| Rect {
                min: position + local.min,
                max: position + local.max,
            })
        } else {
            None
        };
        if let Some(rect) = collision {
            loaded.collision_rects.push(rect);
        }

        let tile = TileRenderInfo {
            image_path,
            source,
            position,
            layer: kind,
            collision,
        };
        match kind {
            TileLayerKind::Background => loaded.background.push(tile),
            TileLayerKind::Decoration => loaded.decorations.push(tile),
            TileLayerKind::Overlay => loaded.overlay.push(tile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::textures::test_image;
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn write_map(&self, name: &str, json: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, json).unwrap();
            path
        }

        fn image_key(&self, file: &str) -> String {
            self.dir.path().join(file).to_string_lossy().into_owned()
        }
    }

    /// 3×3 map of 8px cells over an 8×8 tileset with `tiles` entries.
    fn map_json(layers: &str, tiles: u32, image: &str) -> String {
        format!(
            r#"{{
                "width": 3, "height": 3, "tilewidth": 8, "tileheight": 8,
                "layers": [{layers}],
                "tilesets": [{{"firstgid": 1, "image": "{image}", "imagewidth": {w}, "imageheight": 8,
                               "tilewidth": 8, "tileheight": 8, "tilecount": {tiles}, "columns": {tiles}}}]
            }}"#,
            w = tiles * 8,
        )
    }

    fn tile_layer(name: &str, data: [u32; 9], collidable: bool) -> String {
        let data: Vec<String> = data.iter().map(u32::to_string).collect();
        format!(
            r#"{{"name": "{name}", "type": "tilelayer", "width": 3, "height": 3,
                "data": [{}],
                "properties": [{{"name": "collidable", "type": "bool", "value": {collidable}}}]}}"#,
            data.join(",")
        )
    }

    #[test]
    fn test_opaque_collidable_tile_yields_one_rect_at_its_position() {
        let fx = Fixture::new();
        let json = map_json(
            &tile_layer("decorations", [0, 0, 0, 0, 0, 0, 0, 1, 0], true),
            1,
            "tiles.png",
        );
        let path = fx.write_map("map.json", &json);

        let mut manager = TileManager::new();
        manager
            .textures_mut()
            .insert(fx.image_key("tiles.png"), test_image(8, 8, |_, _| true));
        let summary = manager.load_map(&path).unwrap();

        assert_eq!(summary.collision_rects, 1);
        assert_eq!(manager.collision_rects(), &[Rect::new(8.0, 16.0, 16.0, 24.0)]);
        let tile = &manager.decoration_tiles()[0];
        assert_eq!(tile.position, Vec2::new(8.0, 16.0));
        assert_eq!(tile.collision, Some(Rect::new(8.0, 16.0, 16.0, 24.0)));
    }

    #[test]
    fn test_collision_box_hugs_opaque_pixels() {
        let fx = Fixture::new();
        let json = map_json(
            &tile_layer("decorations", [1, 0, 0, 0, 0, 0, 0, 0, 0], true),
            1,
            "tiles.png",
        );
        let path = fx.write_map("map.json", &json);

        let mut manager = TileManager::new();
        manager.textures_mut().insert(
            fx.image_key("tiles.png"),
            test_image(8, 8, |x, y| (2..5).contains(&x) && y >= 6),
        );
        manager.load_map(&path).unwrap();

        assert_eq!(manager.collision_rects(), &[Rect::new(2.0, 6.0, 5.0, 8.0)]);
    }

    #[test]
    fn test_non_collidable_and_transparent_tiles_have_no_boxes() {
        let fx = Fixture::new();
        let layers = [
            tile_layer("decorations", [1, 0, 0, 0, 0, 0, 0, 0, 0], false),
            tile_layer("decoration_overlay", [0, 2, 0, 0, 0, 0, 0, 0, 0], true),
        ]
        .join(",");
        let path = fx.write_map("map.json", &map_json(&layers, 2, "tiles.png"));

        let mut manager = TileManager::new();
        // Tile 1 opaque, tile 2 fully transparent.
        manager
            .textures_mut()
            .insert(fx.image_key("tiles.png"), test_image(16, 8, |x, _| x < 8));
        manager.load_map(&path).unwrap();

        assert_eq!(manager.decoration_tiles().len(), 2);
        assert!(manager.collision_rects().is_empty());
        assert!(manager.decoration_tiles().iter().all(|t| t.collision.is_none()));
    }

    #[test]
    fn test_layers_are_classified_and_unknown_layers_skipped() {
        let fx = Fixture::new();
        let layers = [
            tile_layer("overlay", [1, 0, 0, 0, 0, 0, 0, 0, 0], true),
            tile_layer("ground", [1, 1, 1, 0, 0, 0, 0, 0, 0], true),
            tile_layer("scribbles", [1, 1, 1, 1, 1, 1, 1, 1, 1], true),
            tile_layer("background", [0, 0, 0, 1, 0, 0, 0, 0, 0], false),
        ]
        .join(",");
        let path = fx.write_map("map.json", &map_json(&layers, 1, "tiles.png"));

        let mut manager = TileManager::new();
        manager
            .textures_mut()
            .insert(fx.image_key("tiles.png"), test_image(8, 8, |_, _| true));
        let summary = manager.load_map(&path).unwrap();

        assert_eq!(manager.background_tiles().len(), 4);
        assert_eq!(manager.overlay_tiles().len(), 1);
        assert!(manager.decoration_tiles().is_empty());
        assert!(manager.collision_rects().is_empty());
        assert_eq!(summary.tiles, 5);
        // Background layer is read before ground regardless of file order.
        assert_eq!(manager.background_tiles()[0].position, Vec2::new(0.0, 8.0));
    }

    #[test]
    fn test_decorations_sorted_by_y() {
        let fx = Fixture::new();
        let layers = [
            tile_layer("decorations", [0, 0, 0, 0, 0, 0, 1, 0, 0], true),
            tile_layer("decoration_overlay", [0, 1, 0, 0, 0, 0, 0, 0, 0], true),
        ]
        .join(",");
        let path = fx.write_map("map.json", &map_json(&layers, 1, "tiles.png"));

        let mut manager = TileManager::new();
        manager
            .textures_mut()
            .insert(fx.image_key("tiles.png"), test_image(8, 8, |_, _| true));
        manager.load_map(&path).unwrap();

        let ys: Vec<f32> = manager.decoration_tiles().iter().map(|t| t.position.y).collect();
        assert_eq!(ys, vec![0.0, 16.0]);
    }

    #[test]
    fn test_flip_flags_are_masked() {
        let fx = Fixture::new();
        let flipped = 1 | 0x8000_0000;
        let json = map_json(
            &tile_layer("ground", [flipped, 0, 0, 0, 0, 0, 0, 0, 0], false),
            1,
            "tiles.png",
        );
        let path = fx.write_map("map.json", &json);

        let mut manager = TileManager::new();
        manager
            .textures_mut()
            .insert(fx.image_key("tiles.png"), test_image(8, 8, |_, _| true));
        let summary = manager.load_map(&path).unwrap();

        assert_eq!(summary.dropped_tiles, 0);
        assert_eq!(manager.background_tiles().len(), 1);
    }

    #[test]
    fn test_missing_texture_drops_tiles_but_load_succeeds() {
        let fx = Fixture::new();
        let json = map_json(
            &tile_layer("decorations", [1, 1, 1, 0, 0, 0, 0, 0, 0], true),
            1,
            "absent.png",
        );
        let path = fx.write_map("map.json", &json);

        let mut manager = TileManager::new();
        let summary = manager.load_map(&path).unwrap();

        assert_eq!(summary.tiles, 0);
        assert_eq!(summary.dropped_tiles, 3);
        assert_eq!(manager.textures().load_count(), 1);
        assert!(manager.is_loaded());
    }

    #[test]
    fn test_failed_load_keeps_previous_map_until_clear() {
        let fx = Fixture::new();
        let good = fx.write_map(
            "good.json",
            &map_json(
                &tile_layer("decorations", [1, 0, 0, 0, 0, 0, 0, 0, 0], true),
                1,
                "tiles.png",
            ),
        );
        let bad = fx.write_map("bad.json", "{ \"width\": 3, \"layers\": [");

        let mut manager = TileManager::new();
        manager
            .textures_mut()
            .insert(fx.image_key("tiles.png"), test_image(8, 8, |_, _| true));
        manager.load_map(&good).unwrap();
        let generation = manager.generation();

        assert!(matches!(
            manager.load_map(&bad),
            Err(MapLoadError::Parse { .. })
        ));
        assert!(matches!(
            manager.load_map(fx.dir.path().join("missing.json")),
            Err(MapLoadError::Io { .. })
        ));
        assert_eq!(manager.decoration_tiles().len(), 1);
        assert_eq!(manager.collision_rects().len(), 1);
        assert_eq!(manager.generation(), generation);

        manager.clear();
        assert!(manager.decoration_tiles().is_empty());
        assert!(manager.collision_rects().is_empty());
        assert!(!manager.is_loaded());
    }

    #[test]
    fn test_objects_and_spawn_points() {
        let mut manager = TileManager::new();
        let json = r#"{
            "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
            "layers": [{"name": "objects", "type": "objectgroup", "objects": [
                {"name": "player_start", "type": "spawn", "x": 40, "y": 24},
                {"name": "to_cave", "type": "portal", "x": 0, "y": 0, "width": 16, "height": 8,
                 "properties": [{"name": "map", "type": "string", "value": "cave.json"},
                                {"name": "spawn", "type": "string", "value": "entrance"}]},
                {"name": "rock", "class": "stone", "x": 32, "y": 32, "width": 16, "height": 16,
                 "properties": [{"name": "hits", "type": "int", "value": 4}]}
            ]}],
            "tilesets": []
        }"#;
        manager
            .load_from_str(json, Path::new("maps"), "inline")
            .unwrap();

        assert_eq!(manager.spawn_point("player_start"), Some(Vec2::new(40.0, 24.0)));
        assert_eq!(manager.spawn_point("nowhere"), None);

        let portal = &manager.objects()[1];
        assert_eq!(portal.kind, MapObjectKind::Portal);
        assert_eq!(portal.property("map"), Some("cave.json"));
        assert_eq!(manager.objects()[2].property_or("hits", 3u32), 4);
        assert_eq!(manager.size(), Vec2::new(16.0, 16.0));
    }

    #[test]
    fn test_isometric_maps_are_rejected() {
        let mut manager = TileManager::new();
        let json = r#"{"width": 1, "height": 1, "tilewidth": 16, "tileheight": 8,
                       "orientation": "isometric", "layers": []}"#;
        assert!(matches!(
            manager.load_from_str(json, Path::new(""), "iso"),
            Err(MapLoadError::Orientation { .. })
        ));
        assert!(!manager.is_loaded());
    }

    #[test]
    fn test_oversized_map_is_rejected_and_previous_map_kept() {
        let mut manager = TileManager::new();
        let small = r#"{"width": 2, "height": 2, "tilewidth": 16, "tileheight": 16, "layers": []}"#;
        manager.load_from_str(small, Path::new(""), "small").unwrap();
        let generation = manager.generation();

        let huge = r#"{"width": 100000, "height": 1, "tilewidth": 100000, "tileheight": 16,
                       "layers": []}"#;
        assert!(matches!(
            manager.load_from_str(huge, Path::new(""), "huge"),
            Err(MapLoadError::Invalid { .. })
        ));
        assert_eq!(manager.map_path(), Some("small"));
        assert_eq!(manager.size(), Vec2::new(32.0, 32.0));
        assert_eq!(manager.generation(), generation);
    }
}
