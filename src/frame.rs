use glam::{IVec2, UVec2};
use image::RgbaImage;

use crate::compose::Compositor;
use crate::compose::coords::CoordinateMapper;
use crate::compose::modifier::Flip;
use crate::compose::resolve::OpacityTest;
use crate::config::Config;
use crate::error::Result;
use crate::scene::{Scene, TileLayer};
use crate::tileset::Tileset;
use crate::viewport::Viewport;

/// One layer addressed by tile name rather than atlas index.
#[derive(Copy, Clone, Debug)]
pub struct NamedLayer<'a> {
    pub name: &'a str,
    pub tint: [u8; 3],
    pub flip: Flip,
}

impl<'a> NamedLayer<'a> {
    pub fn new(name: &'a str, tint: [u8; 3], flip: Flip) -> Self {
        Self { name, tint, flip }
    }
}

// ── FrameRenderer ─────────────────────────────────────────────────────────────

/// CPU frame target: owns the scene buffers and re-renders only when they
/// or the viewport changed since the last `present`.
pub struct FrameRenderer {
    tileset: Tileset,
    viewport: Viewport,
    scene: Scene,
    opacity: OpacityTest,
    frame: RgbaImage,
    pending_render: bool,
}

impl FrameRenderer {
    pub fn new(tileset: Tileset, viewport: Viewport) -> Self {
        let fb = viewport.framebuffer_size(tileset.tile_size());
        log::debug!(
            "frame renderer {}x{} tiles, framebuffer {}x{}",
            viewport.dimensions().x,
            viewport.dimensions().y,
            fb.x,
            fb.y
        );
        Self {
            scene: Scene::new(viewport.dimensions()),
            frame: RgbaImage::new(fb.x, fb.y),
            tileset,
            viewport,
            opacity: OpacityTest::default(),
            pending_render: true,
        }
    }

    /// Build from a config and the atlas PNG it names.
    pub fn from_config(config: &Config, tileset_png: &[u8]) -> Result<Self> {
        let tileset = Tileset::from_png(tileset_png, config.tileset_grid(), &config.tile_names)?;
        Ok(Self::new(tileset, config.viewport()))
    }

    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn set_opacity_test(&mut self, opacity: OpacityTest) {
        self.pending_render |= self.opacity != opacity;
        self.opacity = opacity;
    }

    pub fn framebuffer_size(&self) -> UVec2 {
        self.viewport.framebuffer_size(self.tileset.tile_size())
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::scaled(
            self.viewport.dimensions(),
            self.tileset.tile_size(),
            self.viewport.scale(),
            self.framebuffer_size(),
        )
    }

    pub fn set_viewport(&mut self, width: u32, height: u32, scale: u32) {
        let viewport = Viewport::new(width, height, scale);
        if viewport == self.viewport {
            return;
        }
        log::info!(
            "viewport set to {}x{} tiles at {}x",
            viewport.dimensions().x,
            viewport.dimensions().y,
            viewport.scale()
        );
        self.viewport = viewport;
        self.scene.resize(viewport.dimensions());
        let fb = self.framebuffer_size();
        self.frame = RgbaImage::new(fb.x, fb.y);
        self.pending_render = true;
    }

    /// Write both layers of a cell inside the viewport. Returns whether
    /// anything changed.
    pub fn set_tile_layers(&mut self, position: IVec2, front: TileLayer, back: TileLayer) -> bool {
        if !self.viewport.contains(position.x, position.y) {
            return false;
        }
        let changed = self.scene.set_tile(position, front, back);
        self.pending_render |= changed;
        changed
    }

    /// Write both layers of a cell by tile name. Unknown names leave the cell
    /// untouched.
    pub fn set_tile(&mut self, position: IVec2, front: NamedLayer<'_>, back: NamedLayer<'_>) -> bool {
        let (Some(front_tile), Some(back_tile)) =
            (self.tileset.tile(front.name), self.tileset.tile(back.name))
        else {
            log::debug!("unknown tile in ({}, {}) at {position}", front.name, back.name);
            return false;
        };
        self.set_tile_layers(
            position,
            TileLayer::new(front_tile, front.tint, front.flip),
            TileLayer::new(back_tile, back.tint, back.flip),
        )
    }

    pub fn clear_tiles(&mut self) {
        self.pending_render |= self.scene.clear();
    }

    pub fn compositor(&self) -> Compositor<'_> {
        Compositor {
            scene: &self.scene,
            atlas: self.tileset.atlas(),
            mapper: self.mapper(),
            opacity: self.opacity,
        }
    }

    /// Re-render the frame if anything changed. Returns `true` when a new
    /// frame was produced.
    pub fn present(&mut self) -> bool {
        if !self.pending_render {
            return false;
        }
        self.pending_render = false;

        let mut frame = std::mem::take(&mut self.frame);
        self.compositor().render_into(&mut frame);
        self.frame = frame;
        // CPU frames read the scene directly; nothing is waiting on an upload.
        self.scene.take_dirty_region();
        log::debug!("frame rendered");
        true
    }

    /// Last rendered frame.
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }
}
