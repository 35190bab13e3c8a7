use glam::{IVec2, UVec2, Vec2, Vec4};
use image::RgbaImage;

use super::coords::texel_in_tile;
use super::layer::LayerRef;

/// Sprite atlas image split into a uniform grid of tiles.
///
/// Immutable once built; the compositor only ever reads it.
#[derive(Clone, Debug)]
pub struct Atlas {
    image: RgbaImage,
    /// Tile size in pixels.
    tile_size: UVec2,
    /// Atlas size in tiles.
    grid: UVec2,
}

impl Atlas {
    /// `grid` is the number of tiles per row and column. Leftover pixels past
    /// `grid * tile_size` are never addressed.
    pub fn new(image: RgbaImage, tile_size: UVec2, grid: UVec2) -> Self {
        Self { image, tile_size: tile_size.max(UVec2::ONE), grid }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn tile_size(&self) -> UVec2 {
        self.tile_size
    }

    pub fn grid(&self) -> UVec2 {
        self.grid
    }

    /// Raw texel at pixel `(x, y)`, clamped to the image edge.
    fn texel(&self, x: u32, y: u32) -> Vec4 {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return Vec4::ZERO;
        }
        let px = self.image.get_pixel(x.min(w - 1), y.min(h - 1));
        Vec4::from_array(px.0.map(|c| c as f32 / 255.0))
    }

    /// Colour one layer contributes at `uv` (already flipped).
    ///
    /// - `Fill` is opaque white and `None` is fully transparent; neither
    ///   touches the image.
    /// - An index samples the nearest texel at
    ///   `index * tile_size + uv * tile_size`.
    pub fn sample(&self, layer: LayerRef, uv: Vec2) -> Vec4 {
        match layer {
            LayerRef::Fill => Vec4::ONE,
            LayerRef::None => Vec4::ZERO,
            LayerRef::Index(idx) => {
                let origin = idx.max(IVec2::ZERO).as_uvec2().saturating_mul(self.tile_size);
                let x = origin.x.saturating_add(texel_in_tile(uv.x, self.tile_size.x));
                let y = origin.y.saturating_add(texel_in_tile(uv.y, self.tile_size.y));
                self.texel(x, y)
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
