//! CPU-side tileset images, loaded once per path.
//!
//! The tile loader needs real pixels (for opaque-pixel collision boxes), so
//! tilesets are decoded here rather than through the `AssetServer`. The
//! renderer uploads each cached image into `Assets<Image>` afterwards.

use std::collections::HashMap;
use std::path::Path;

use bevy::image::{CompressedImageFormats, ImageSampler, ImageType};
use bevy::math::Rect;
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::TextureFormat;

#[derive(thiserror::Error, Debug, Clone)]
pub enum TextureError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("cannot decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("{path} has no RGBA8 representation")]
    Format { path: String },

    #[error("{path} failed to load earlier")]
    PreviouslyFailed { path: String },
}

/// Path → decoded RGBA8 image. A path is read from disk at most once;
/// failures are remembered so a broken tileset is reported a single time.
#[derive(Default)]
pub struct TextureCache {
    images: HashMap<String, Image>,
    failed: HashMap<String, TextureError>,
    loads: usize,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the disk was actually touched.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.images.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&Image> {
        self.images.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Image)> {
        self.images.iter()
    }

    /// Registers an already-decoded image under `path`.
    pub fn insert(&mut self, path: impl Into<String>, image: Image) {
        let path = path.into();
        self.failed.remove(&path);
        self.images.insert(path, image);
    }

    pub fn get_or_load(&mut self, path: &str) -> Result<&Image, TextureError> {
        if let Some(err) = self.failed.get(path) {
            debug!("[Map] skipping tile, earlier error: {}", err);
            return Err(TextureError::PreviouslyFailed {
                path: path.to_string(),
            });
        }
        if !self.images.contains_key(path) {
            self.loads += 1;
            match decode_file(path) {
                Ok(image) => {
                    debug!("[Map] loaded tileset image {}", path);
                    self.images.insert(path.to_string(), image);
                }
                Err(e) => {
                    self.failed.insert(path.to_string(), e.clone());
                    return Err(e);
                }
            }
        }
        self.images.get(path).ok_or_else(|| TextureError::Format {
            path: path.to_string(),
        })
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.failed.clear();
    }
}

fn decode_file(path: &str) -> Result<Image, TextureError> {
    let bytes = std::fs::read(path).map_err(|e| TextureError::Io {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png");

    let image = Image::from_buffer(
        &bytes,
        ImageType::Extension(extension),
        CompressedImageFormats::NONE,
        true,
        ImageSampler::nearest(),
        RenderAssetUsages::default(),
    )
    .map_err(|e| TextureError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    to_rgba8(image).ok_or_else(|| TextureError::Format {
        path: path.to_string(),
    })
}

fn to_rgba8(image: Image) -> Option<Image> {
    match image.texture_descriptor.format {
        TextureFormat::Rgba8UnormSrgb | TextureFormat::Rgba8Unorm => Some(image),
        _ => image.convert(TextureFormat::Rgba8UnormSrgb),
    }
}

/// Bounding box of the non-transparent pixels inside `source`, relative to
/// `source.min`. `None` when every pixel is fully transparent.
pub fn opaque_bounds(image: &Image, source: Rect) -> Option<Rect> {
    let width = image.width() as i64;
    let height = image.height() as i64;
    let x0 = (source.min.x as i64).clamp(0, width);
    let y0 = (source.min.y as i64).clamp(0, height);
    let x1 = (source.max.x as i64).clamp(0, width);
    let y1 = (source.max.y as i64).clamp(0, height);

    let mut min = (i64::MAX, i64::MAX);
    let mut max = (i64::MIN, i64::MIN);
    for y in y0..y1 {
        for x in x0..x1 {
            let alpha_index = ((y * width + x) * 4 + 3) as usize;
            let alpha = image.data.get(alpha_index).copied().unwrap_or(0);
            if alpha > 0 {
                min = (min.0.min(x), min.1.min(y));
                max = (max.0.max(x), max.1.max(y));
            }
        }
    }

    if max.0 < min.0 {
        return None;
    }
    Some(Rect::new(
        (min.0 - x0) as f32,
        (min.1 - y0) as f32,
        (max.0 + 1 - x0) as f32,
        (max.1 + 1 - y0) as f32,
    ))
}

/// In-memory RGBA image; `opaque` marks the pixels that get alpha 255.
#[cfg(test)]
pub fn test_image(width: u32, height: u32, opaque: impl Fn(u32, u32) -> bool) -> Image {
    use bevy::render::render_resource::{Extent3d, TextureDimension};

    let mut image = Image::new_fill(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    );
    for y in 0..height {
        for x in 0..width {
            if opaque(x, y) {
                let i = ((y * width + x) * 4) as usize;
                image.data[i..i + 4].copy_from_slice(&[200, 120, 40, 255]);
            }
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_bounds_of_full_tile() {
        let image = test_image(8, 8, |_, _| true);
        let bounds = opaque_bounds(&image, Rect::new(0.0, 0.0, 8.0, 8.0));
        assert_eq!(bounds, Some(Rect::new(0.0, 0.0, 8.0, 8.0)));
    }

    #[test]
    fn test_opaque_bounds_is_pixel_tight_and_local() {
        // Second 16×16 tile holds a 4×3 blob at (20..24, 5..8).
        let image = test_image(32, 16, |x, y| (20..24).contains(&x) && (5..8).contains(&y));
        let bounds = opaque_bounds(&image, Rect::new(16.0, 0.0, 32.0, 16.0));
        assert_eq!(bounds, Some(Rect::new(4.0, 5.0, 8.0, 8.0)));

        let first = opaque_bounds(&image, Rect::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(first, None);
    }

    #[test]
    fn test_missing_file_fails_once_and_is_remembered() {
        let mut cache = TextureCache::new();
        let path = "definitely/not/here.png";

        assert!(matches!(
            cache.get_or_load(path),
            Err(TextureError::Io { .. })
        ));
        assert!(matches!(
            cache.get_or_load(path),
            Err(TextureError::PreviouslyFailed { .. })
        ));
        assert_eq!(cache.load_count(), 1);
    }

    #[test]
    fn test_inserted_images_never_touch_disk() {
        let mut cache = TextureCache::new();
        cache.insert("mem://tiles.png", test_image(4, 4, |_, _| true));

        for _ in 0..3 {
            assert!(cache.get_or_load("mem://tiles.png").is_ok());
        }
        assert_eq!(cache.load_count(), 0);
        assert_eq!(cache.len(), 1);
    }
}
