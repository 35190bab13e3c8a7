use glam::UVec2;

/// Visible tile grid and its integer display scale.
///
/// Dimensions are clamped to `[MIN_TILES, MAX_TILES]` and the scale to at
/// least 1, so a viewport is never degenerate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
    scale: u32,
}

impl Viewport {
    pub const MIN_TILES: u32 = 3;
    pub const MAX_TILES: u32 = 1024;

    pub fn new(width: u32, height: u32, scale: u32) -> Self {
        Self {
            width: width.clamp(Self::MIN_TILES, Self::MAX_TILES),
            height: height.clamp(Self::MIN_TILES, Self::MAX_TILES),
            scale: scale.max(1),
        }
    }

    /// Size in tiles.
    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Output size in pixels for tiles of `tile_size` pixels. Saturates at
    /// `u32::MAX` instead of wrapping.
    pub fn framebuffer_size(&self, tile_size: UVec2) -> UVec2 {
        self.dimensions()
            .saturating_mul(tile_size)
            .saturating_mul(UVec2::splat(self.scale))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
