//! Per-pixel tile composition.
//!
//! Every output pixel runs the same fixed sequence, independent of every
//! other pixel:
//!
//! ```text
//! map coords -> fetch cell -> decode modifiers -> sample front
//!     -> front visible?  emit front
//!     -> otherwise       sample back -> emit back, or the default colour
//! ```
//!
//! Nothing is shared or mutated between pixels, so the frame loop is a plain
//! parallel-for over output rows.

pub mod coords;
pub mod layer;
pub mod modifier;
pub mod resolve;
pub mod sample;

use glam::{UVec2, Vec2, Vec4};
use image::RgbaImage;
use rayon::prelude::*;

use crate::scene::{CellState, Scene};
use coords::{CellSample, CoordinateMapper};
use resolve::{OpacityTest, TintedTexel, resolve};
use sample::Atlas;

/// Read-only view of one frame's inputs.
#[derive(Copy, Clone)]
pub struct Compositor<'a> {
    pub scene: &'a Scene,
    pub atlas: &'a Atlas,
    pub mapper: CoordinateMapper,
    pub opacity: OpacityTest,
}

impl<'a> Compositor<'a> {
    pub fn new(scene: &'a Scene, atlas: &'a Atlas, mapper: CoordinateMapper) -> Self {
        Self { scene, atlas, mapper, opacity: OpacityTest::default() }
    }

    /// Resolve a cell's two layers at intra-tile position `uv`.
    pub fn shade_cell(&self, cell: &CellState, uv: Vec2) -> Vec4 {
        let front = TintedTexel {
            texel: self.atlas.sample(cell.front, cell.front_modifier.flip.apply(uv)),
            tint: cell.front_modifier.tint,
        };
        resolve(self.opacity, front, || TintedTexel {
            texel: self.atlas.sample(cell.back, cell.back_modifier.flip.apply(uv)),
            tint: cell.back_modifier.tint,
        })
    }

    pub fn shade(&self, sample: CellSample) -> Vec4 {
        let cell = self.scene.fetch(sample.cell);
        self.shade_cell(&cell, sample.local_uv)
    }

    /// Unquantised colour of output pixel `pixel`.
    pub fn shade_pixel(&self, pixel: UVec2) -> Vec4 {
        self.shade(self.mapper.map_pixel(pixel))
    }

    /// Colour at a position normalised over the framebuffer.
    pub fn shade_normalized(&self, frag: Vec2) -> Vec4 {
        self.shade(self.mapper.map(frag))
    }

    /// Render a whole frame into `out`, overwriting every pixel.
    ///
    /// `out` is addressed with its own dimensions; the mapper's framebuffer
    /// size should match them.
    pub fn render_into(&self, out: &mut RgbaImage) {
        let width = out.width() as usize;
        if width == 0 {
            return;
        }
        let buf: &mut [u8] = out;
        buf.par_chunks_mut(width * 4).enumerate().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let color = self.shade_pixel(UVec2::new(x as u32, y as u32));
                px.copy_from_slice(&to_rgba8(color));
            }
        });
    }

    pub fn render(&self) -> RgbaImage {
        let size = self.mapper.framebuffer;
        let mut out = RgbaImage::new(size.x, size.y);
        self.render_into(&mut out);
        out
    }
}

/// Quantise a colour the way an `Rgba8Unorm` target stores it.
pub fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
    c.round().to_array().map(|v| v as u8)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
