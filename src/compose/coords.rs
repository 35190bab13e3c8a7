// ── Coordinate mapping ────────────────────────────────────────────────────────
//
// Turns an output position into the tile cell it falls in and the position
// inside that cell. Two derivations are supported:
//
// - `Mapping::Scaled`: every tile covers exactly `tile_size * scale` output
//   pixels, counted from the top-left corner. Pixels past the grid map to
//   cells outside it, which the fetcher reads back as empty.
// - `Mapping::Stretch`: the grid is stretched over the whole framebuffer, so
//   every output pixel lands inside `[0, viewport)`.
//
// The pixel entry point (`map_pixel`) works on pixel centres with integer
// arithmetic only, so no row or column is ever skipped or duplicated.

use glam::{IVec2, UVec2, Vec2};

/// Where one output sample lands in the tile grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellSample {
    /// Cell index. May lie outside the grid under `Mapping::Scaled`.
    pub cell: IVec2,
    /// Position inside the cell, each component in `[0, 1)`.
    pub local_uv: Vec2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mapping {
    /// Tile pixel size times an integer display scale.
    Scaled { tile_size: UVec2, scale: u32 },
    /// Viewport-to-framebuffer ratio.
    Stretch,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoordinateMapper {
    /// Grid size in tiles.
    pub viewport: UVec2,
    /// Output size in pixels.
    pub framebuffer: UVec2,
    pub mapping: Mapping,
}

impl CoordinateMapper {
    pub fn scaled(viewport: UVec2, tile_size: UVec2, scale: u32, framebuffer: UVec2) -> Self {
        Self { viewport, framebuffer, mapping: Mapping::Scaled { tile_size, scale } }
    }

    pub fn stretch(viewport: UVec2, framebuffer: UVec2) -> Self {
        Self { viewport, framebuffer, mapping: Mapping::Stretch }
    }

    /// Map the centre of output pixel `pixel`.
    pub fn map_pixel(&self, pixel: UVec2) -> CellSample {
        let (cx, u) = self.map_pixel_axis(pixel.x, 0);
        let (cy, v) = self.map_pixel_axis(pixel.y, 1);
        CellSample { cell: IVec2::new(cx, cy), local_uv: Vec2::new(u, v) }
    }

    fn map_pixel_axis(&self, p: u32, axis: usize) -> (i32, f32) {
        match self.mapping {
            Mapping::Scaled { tile_size, scale } => {
                let span = (tile_size[axis] as u64 * scale.max(1) as u64).max(1);
                let p = p as u64;
                let cell = p / span;
                let within = p % span;
                let uv = (2 * within + 1) as f64 / (2 * span) as f64;
                (clamp_cell(cell), uv as f32)
            }
            Mapping::Stretch => {
                // Centre of pixel p in tile units is (2p + 1) * tiles / (2 * fb).
                let tiles = self.viewport[axis] as u64;
                let den = 2 * self.framebuffer[axis].max(1) as u64;
                let num = (2 * p as u64 + 1) * tiles;
                let uv = (num % den) as f64 / den as f64;
                (clamp_cell(num / den), uv as f32)
            }
        }
    }

    /// Map a position normalised to `[0, 1] x [0, 1]` over the framebuffer.
    ///
    /// Under `Mapping::Scaled` the position snaps to the centre of the pixel
    /// it falls in, matching fragment evaluation. Boundaries always resolve
    /// by `floor`, never by rounding. The far edge (`1.0`) belongs to the last
    /// pixel or cell, so the whole closed range stays on the grid.
    pub fn map(&self, frag: Vec2) -> CellSample {
        let frag = frag.clamp(Vec2::ZERO, Vec2::ONE);
        match self.mapping {
            Mapping::Scaled { .. } => {
                let px = last_index(frag.x as f64 * self.framebuffer.x as f64, self.framebuffer.x);
                let py = last_index(frag.y as f64 * self.framebuffer.y as f64, self.framebuffer.y);
                self.map_pixel(UVec2::new(px, py))
            }
            Mapping::Stretch => {
                let (cx, u) = stretch_axis(frag.x as f64 * self.viewport.x as f64, self.viewport.x);
                let (cy, v) = stretch_axis(frag.y as f64 * self.viewport.y as f64, self.viewport.y);
                CellSample { cell: IVec2::new(cx, cy), local_uv: Vec2::new(u, v) }
            }
        }
    }
}

/// Largest `f32` below 1.
const BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// `floor(t)`, kept below `extent` when `extent` is non-zero.
fn last_index(t: f64, extent: u32) -> u32 {
    (t.floor() as u32).min(extent.saturating_sub(1))
}

fn stretch_axis(t: f64, tiles: u32) -> (i32, f32) {
    let cell = last_index(t, tiles);
    let uv = ((t - cell as f64) as f32).clamp(0.0, BELOW_ONE);
    (clamp_cell(cell as u64), uv)
}

fn clamp_cell(cell: u64) -> i32 {
    cell.min(i32::MAX as u64) as i32
}

/// Texel offset inside a tile for a (possibly flipped) UV component.
///
/// `1 - u` for `u` near zero lands on the far edge; the clamp keeps it on the
/// last texel of the tile.
pub fn texel_in_tile(uv: f32, tile_extent: u32) -> u32 {
    let last = tile_extent.saturating_sub(1);
    let t = (uv * tile_extent as f32).floor();
    if t <= 0.0 { 0 } else { (t as u32).min(last) }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_pixels_step_through_cells() {
        // 8px tiles at 2x: 16 output pixels per cell.
        let m = CoordinateMapper::scaled(UVec2::new(4, 4), UVec2::splat(8), 2, UVec2::splat(64));
        assert_eq!(m.map_pixel(UVec2::new(0, 0)).cell, IVec2::new(0, 0));
        assert_eq!(m.map_pixel(UVec2::new(15, 15)).cell, IVec2::new(0, 0));
        assert_eq!(m.map_pixel(UVec2::new(16, 31)).cell, IVec2::new(1, 1));
        assert_eq!(m.map_pixel(UVec2::new(63, 32)).cell, IVec2::new(3, 2));
    }

    #[test]
    fn scaled_uv_is_pixel_centre() {
        let m = CoordinateMapper::scaled(UVec2::new(2, 2), UVec2::splat(8), 1, UVec2::splat(16));
        let s = m.map_pixel(UVec2::new(9, 0));
        assert_eq!(s.cell, IVec2::new(1, 0));
        assert_eq!(s.local_uv, Vec2::new(1.5 / 8.0, 0.5 / 8.0));
    }

    #[test]
    fn scaled_past_grid_maps_outside() {
        let m = CoordinateMapper::scaled(UVec2::new(2, 2), UVec2::splat(8), 1, UVec2::splat(20));
        assert_eq!(m.map_pixel(UVec2::new(17, 3)).cell, IVec2::new(2, 0));
    }

    #[test]
    fn stretch_spreads_cells_over_framebuffer() {
        let m = CoordinateMapper::stretch(UVec2::new(3, 1), UVec2::new(7, 1));
        let cells: Vec<i32> = (0..7).map(|x| m.map_pixel(UVec2::new(x, 0)).cell.x).collect();
        assert_eq!(cells, vec![0, 0, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn stretch_uv_stays_below_one() {
        let m = CoordinateMapper::stretch(UVec2::new(1024, 1024), UVec2::new(1031, 997));
        for p in 0..1031 {
            let s = m.map_pixel(UVec2::new(p, p % 997));
            assert!(s.local_uv.x >= 0.0 && s.local_uv.x < 1.0);
            assert!(s.local_uv.y >= 0.0 && s.local_uv.y < 1.0);
            assert!(s.cell.x < 1024 && s.cell.y < 1024);
        }
    }

    #[test]
    fn normalised_boundary_floors_into_next_cell() {
        let m = CoordinateMapper::stretch(UVec2::new(4, 4), UVec2::splat(32));
        let s = m.map(Vec2::new(0.5, 0.25));
        assert_eq!(s.cell, IVec2::new(2, 1));
        assert_eq!(s.local_uv, Vec2::ZERO);
    }

    #[test]
    fn normalised_scaled_agrees_with_pixel_path() {
        let m = CoordinateMapper::scaled(UVec2::new(3, 3), UVec2::splat(8), 3, UVec2::splat(72));
        for p in [0u32, 23, 24, 47, 71] {
            let frag = Vec2::splat((p as f32 + 0.5) / 72.0);
            assert_eq!(m.map(frag), m.map_pixel(UVec2::splat(p)));
        }
    }

    #[test]
    fn normalised_far_edge_stays_in_last_cell() {
        let m = CoordinateMapper::stretch(UVec2::new(4, 3), UVec2::splat(32));
        let s = m.map(Vec2::ONE);
        assert_eq!(s.cell, IVec2::new(3, 2));
        assert!(s.local_uv.x < 1.0 && s.local_uv.y < 1.0);
        assert!(s.local_uv.x > 0.99 && s.local_uv.y > 0.99);

        let m = CoordinateMapper::scaled(UVec2::new(4, 3), UVec2::splat(8), 2, UVec2::new(64, 48));
        assert_eq!(m.map(Vec2::ONE), m.map_pixel(UVec2::new(63, 47)));
        assert_eq!(m.map(Vec2::new(-0.5, 2.0)), m.map_pixel(UVec2::new(0, 47)));
    }

    #[test]
    fn texel_in_tile_clamps_far_edge() {
        assert_eq!(texel_in_tile(0.0, 8), 0);
        assert_eq!(texel_in_tile(0.999, 8), 7);
        assert_eq!(texel_in_tile(1.0, 8), 7);
        assert_eq!(texel_in_tile(-0.2, 8), 0);
    }
}
