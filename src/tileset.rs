use std::collections::HashMap;

use glam::UVec2;
use image::RgbaImage;

use crate::compose::layer::LayerRef;
use crate::compose::sample::Atlas;
use crate::error::{Error, Result};

/// Tile name that always resolves to an empty layer.
pub const NONE_TILE: &str = "none";
/// Tile name that always resolves to a solid fill.
pub const FILL_TILE: &str = "fill";

/// Sprite atlas plus the names scripts use to refer to its tiles.
pub struct Tileset {
    atlas: Atlas,
    names: HashMap<String, LayerRef>,
}

impl Tileset {
    /// Decode a PNG atlas and split it into `grid` tiles.
    pub fn from_png(png_bytes: &[u8], grid: UVec2, tile_names: &[String]) -> Result<Self> {
        let image = image::load_from_memory(png_bytes)?.to_rgba8();
        Self::new(image, grid, tile_names)
    }

    /// Split `image` into `grid` tiles and name them.
    ///
    /// Names are handed out in row-major order, one per tile that has at
    /// least one non-zero channel; fully blank tiles are skipped.
    pub fn new(image: RgbaImage, grid: UVec2, tile_names: &[String]) -> Result<Self> {
        if grid.x == 0 || grid.y == 0 {
            return Err(Error::InvalidTileset(format!("tile grid {}x{} is empty", grid.x, grid.y)));
        }
        let (img_w, img_h) = image.dimensions();
        let tile_size = UVec2::new(img_w / grid.x, img_h / grid.y);
        if tile_size.x == 0 || tile_size.y == 0 {
            return Err(Error::InvalidTileset(format!(
                "{img_w}x{img_h} image is too small for a {}x{} tile grid",
                grid.x, grid.y
            )));
        }

        let mut pending = tile_names.iter();
        let mut names = HashMap::new();
        for row in 0..grid.y {
            for col in 0..grid.x {
                if !tile_has_content(&image, UVec2::new(col, row) * tile_size, tile_size) {
                    continue;
                }
                match pending.next() {
                    Some(name) => {
                        names.insert(name.clone(), LayerRef::index(col as i32, row as i32));
                    }
                    None => log::warn!(
                        "tile name list exhausted, tile at ({col}, {row}) left unnamed"
                    ),
                }
            }
        }
        let unused = pending.count();
        if unused > 0 {
            log::warn!("{unused} tile names had no matching tile");
        }

        log::info!(
            "loaded tileset (tiles: {}x{}) (pixels: {img_w}x{img_h}) (named: {})",
            grid.x,
            grid.y,
            names.len()
        );

        Ok(Self { atlas: Atlas::new(image, tile_size, grid), names })
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn tile_size(&self) -> UVec2 {
        self.atlas.tile_size()
    }

    pub fn grid(&self) -> UVec2 {
        self.atlas.grid()
    }

    /// Resolve a tile name, including the reserved `none` and `fill`.
    pub fn tile(&self, name: &str) -> Option<LayerRef> {
        match name {
            NONE_TILE => Some(LayerRef::None),
            FILL_TILE => Some(LayerRef::Fill),
            _ => self.names.get(name).copied(),
        }
    }
}

fn tile_has_content(image: &RgbaImage, origin: UVec2, size: UVec2) -> bool {
    (origin.y..origin.y + size.y).any(|y| {
        (origin.x..origin.x + size.x).any(|x| image.get_pixel(x, y).0.iter().any(|&c| c > 0))
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
