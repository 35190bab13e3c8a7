use std::fs;
use std::path::Path;

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::viewport::Viewport;

// ── Config ────────────────────────────────────────────────────────────────────

/// Startup configuration, normally read from a JSON file next to the atlas.
///
/// ```json
/// {
///   "application_name": "demo",
///   "viewport_width": 40, "viewport_height": 25, "viewport_scale": 2,
///   "tileset_path": "tiles.png", "tileset_width": 16, "tileset_height": 16,
///   "tile_names": ["wall", "floor", "player"]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub application_name: String,
    pub application_version: String,
    /// Viewport size in tiles.
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Integer display scale.
    pub viewport_scale: u32,
    pub tileset_path: String,
    /// Atlas size in tiles.
    pub tileset_width: u32,
    pub tileset_height: u32,
    /// Names given to the non-empty atlas tiles, in row-major order.
    pub tile_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            application_name: "tilecomp".to_string(),
            application_version: env!("CARGO_PKG_VERSION").to_string(),
            viewport_width: 40,
            viewport_height: 25,
            viewport_scale: 2,
            tileset_path: "tileset.png".to_string(),
            tileset_width: 16,
            tileset_height: 16,
            tile_names: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading configuration from {}", path.display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        if self.tileset_width == 0 || self.tileset_height == 0 {
            return Err(Error::InvalidConfig(format!(
                "tileset must be at least 1x1 tiles, got {}x{}",
                self.tileset_width, self.tileset_height
            )));
        }
        Ok(())
    }

    /// Viewport with its clamping applied.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height, self.viewport_scale)
    }

    pub fn tileset_grid(&self) -> UVec2 {
        UVec2::new(self.tileset_width, self.tileset_height)
    }

    /// Write every field to the log.
    pub fn log(&self) {
        macro_rules! log_item {
            ($($item:ident),*) => {
                $( log::info!("{}: {:?}", stringify!($item), self.$item); )*
            };
        }
        log_item!(
            application_name,
            application_version,
            viewport_scale,
            viewport_width,
            viewport_height,
            tileset_width,
            tileset_height,
            tileset_path,
            tile_names
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
