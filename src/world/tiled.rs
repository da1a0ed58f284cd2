//! Tiled JSON map format (orthogonal maps, embedded tilesets).

use std::collections::HashMap;

use bevy::math::Rect;
use serde::Deserialize;

/// Tiled stores flip/rotation flags in the top bits of every GID.
pub const GID_FLAG_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Clone, Deserialize)]
pub struct TiledMap {
    pub width: u32,
    pub height: u32,
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default = "default_orientation")]
    pub orientation: String,
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
}

fn default_orientation() -> String {
    "orthogonal".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledLayer {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub data: Vec<u32>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub objects: Vec<TiledObject>,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

impl TiledLayer {
    pub fn is_tile_layer(&self) -> bool {
        self.layer_type == "tilelayer"
    }

    pub fn is_object_layer(&self) -> bool {
        self.layer_type == "objectgroup"
    }

    pub fn bool_property(&self, name: &str) -> bool {
        bool_property(&self.properties, name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledObject {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Tiled 1.9 renamed `type` to `class`; accept either.
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub class: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub properties: Vec<TiledProperty>,
}

impl TiledObject {
    pub fn kind(&self) -> &str {
        if self.class.is_empty() {
            &self.object_type
        } else {
            &self.class
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Custom properties flattened to strings.
    pub fn property_map(&self) -> HashMap<String, String> {
        self.properties
            .iter()
            .map(|p| (p.name.clone(), p.value_string()))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledTileset {
    pub firstgid: u32,
    #[serde(default)]
    pub name: String,
    /// Set for external `.tsj` tilesets, which are not supported.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub imagewidth: u32,
    #[serde(default)]
    pub imageheight: u32,
    #[serde(default)]
    pub tilewidth: u32,
    #[serde(default)]
    pub tileheight: u32,
    #[serde(default)]
    pub tilecount: u32,
    #[serde(default)]
    pub columns: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
}

impl TiledTileset {
    /// Pixel rectangle of `local_id` inside the tileset image.
    pub fn source_rect(&self, local_id: u32) -> Option<Rect> {
        if self.columns == 0 || local_id >= self.tilecount {
            return None;
        }
        let col = local_id % self.columns;
        let row = local_id / self.columns;
        let x = offset(self.margin, col, self.tilewidth, self.spacing)?;
        let y = offset(self.margin, row, self.tileheight, self.spacing)?;
        Some(Rect::new(
            x as f32,
            y as f32,
            x.checked_add(self.tilewidth)? as f32,
            y.checked_add(self.tileheight)? as f32,
        ))
    }
}

/// `margin + index * (size + spacing)`, or `None` on overflow.
fn offset(margin: u32, index: u32, size: u32, spacing: u32) -> Option<u32> {
    size
        .checked_add(spacing)
        .and_then(|stride| stride.checked_mul(index))
        .and_then(|o| o.checked_add(margin))
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(rename = "type", default)]
    pub property_type: String,
    pub value: serde_json::Value,
}

impl TiledProperty {
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

pub fn bool_property(properties: &[TiledProperty], name: &str) -> bool {
    properties
        .iter()
        .find(|p| p.name == name)
        .and_then(|p| p.value.as_bool())
        .unwrap_or(false)
}

impl TiledMap {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Tileset owning `gid` (flags already stripped) and the tile's local id.
    pub fn tileset_for(&self, gid: u32) -> Option<(&TiledTileset, u32)> {
        self.tilesets
            .iter()
            .filter(|ts| ts.firstgid <= gid)
            .max_by_key(|ts| ts.firstgid)
            .map(|ts| (ts, gid - ts.firstgid))
    }
}
