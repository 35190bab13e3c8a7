use std::io::Cursor;

use glam::{IVec2, UVec2};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pretty_assertions::assert_eq;

use tilecomp::compose::layer::LayerRef;
use tilecomp::compose::modifier::Flip;
use tilecomp::config::Config;
use tilecomp::frame::{FrameRenderer, NamedLayer};
use tilecomp::scene::TileLayer;
use tilecomp::tileset::Tileset;
use tilecomp::viewport::Viewport;
use tilecomp::Error;

const WHITE: [u8; 3] = [255, 255, 255];

/// 2x1 grid of 4px tiles: "wall" is solid grey, "floor" has a single green pixel.
fn atlas_image() -> RgbaImage {
    let mut img = RgbaImage::new(8, 4);
    for y in 0..4 {
        for x in 0..4 {
            img.put_pixel(x, y, Rgba([128, 128, 128, 255]));
        }
    }
    img.put_pixel(5, 1, Rgba([0, 255, 0, 255]));
    img
}

fn png_bytes(img: RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn names() -> Vec<String> {
    vec!["wall".to_string(), "floor".to_string()]
}

fn renderer() -> FrameRenderer {
    let tileset = Tileset::new(atlas_image(), UVec2::new(2, 1), &names()).unwrap();
    FrameRenderer::new(tileset, Viewport::new(3, 3, 1))
}

fn layer(name: &str) -> NamedLayer<'_> {
    NamedLayer::new(name, WHITE, Flip::None)
}

// ── Tileset Tests ─────────────────────────────────────────────────────────────

#[test]
fn tileset_loads_from_png() {
    let tileset = Tileset::from_png(&png_bytes(atlas_image()), UVec2::new(2, 1), &names()).unwrap();
    assert_eq!(tileset.tile_size(), UVec2::new(4, 4));
    assert_eq!(tileset.tile("wall"), Some(LayerRef::index(0, 0)));
    assert_eq!(tileset.tile("floor"), Some(LayerRef::index(1, 0)));
    assert_eq!(tileset.tile("none"), Some(LayerRef::None));
    assert_eq!(tileset.tile("fill"), Some(LayerRef::Fill));
    assert_eq!(tileset.tile("lava"), None);
}

#[test]
fn garbage_png_is_an_image_error() {
    let err = Tileset::from_png(b"not a png", UVec2::ONE, &[]).err().unwrap();
    assert!(matches!(err, Error::Image(_)));
}

// ── FrameRenderer Tests ───────────────────────────────────────────────────────

#[test]
fn framebuffer_follows_viewport_and_tile_size() {
    let mut frame = renderer();
    assert_eq!(frame.framebuffer_size(), UVec2::new(12, 12));
    frame.set_viewport(4, 3, 2);
    assert_eq!(frame.framebuffer_size(), UVec2::new(32, 24));
    assert!(frame.present());
    assert_eq!(frame.frame().dimensions(), (32, 24));
}

#[test]
fn present_only_renders_after_changes() {
    let mut frame = renderer();
    assert!(frame.present());
    assert!(!frame.present());

    assert!(frame.set_tile(IVec2::new(1, 1), layer("wall"), layer("none")));
    assert!(frame.present());
    assert!(!frame.present());

    // Same content again is not a change.
    assert!(!frame.set_tile(IVec2::new(1, 1), layer("wall"), layer("none")));
    assert!(!frame.present());
}

#[test]
fn unknown_tile_names_leave_cell_untouched() {
    let mut frame = renderer();
    frame.present();
    assert!(!frame.set_tile(IVec2::ZERO, layer("lava"), layer("none")));
    assert!(!frame.present());
    assert_eq!(frame.scene().fetch(IVec2::ZERO).back, LayerRef::Fill);
}

#[test]
fn out_of_range_writes_are_ignored() {
    let mut frame = renderer();
    assert!(!frame.set_tile(IVec2::new(3, 0), layer("wall"), layer("wall")));
    assert!(!frame.set_tile(IVec2::new(-1, 0), layer("wall"), layer("wall")));
}

#[test]
fn rendered_frame_shows_named_tiles() {
    let mut frame = renderer();
    frame.set_tile(IVec2::new(0, 0), layer("wall"), layer("none"));
    frame.set_tile(IVec2::new(1, 0), layer("floor"), NamedLayer::new("fill", [0, 0, 255], Flip::None));
    frame.present();

    let img = frame.frame();
    assert_eq!(img.get_pixel(2, 2).0, [128, 128, 128, 255]);
    assert_eq!(img.get_pixel(5, 1).0, [0, 255, 0, 255]);
    assert_eq!(img.get_pixel(6, 1).0, [0, 0, 255, 255]);
    // Untouched cells keep the white back fill.
    assert_eq!(img.get_pixel(10, 10).0, [255, 255, 255, 255]);
}

#[test]
fn clear_tiles_renders_black() {
    let mut frame = renderer();
    frame.set_tile_layers(IVec2::new(2, 2), TileLayer::fill([255, 0, 0]), TileLayer::EMPTY);
    frame.clear_tiles();
    assert!(frame.present());
    assert!(frame.frame().pixels().all(|p| p.0 == [0, 0, 0, 255]));
}

#[test]
fn resizing_keeps_overlapping_cells() {
    let mut frame = renderer();
    frame.set_tile(IVec2::new(1, 1), layer("wall"), layer("none"));
    frame.set_viewport(5, 5, 1);
    assert_eq!(frame.scene().fetch(IVec2::new(1, 1)).front, LayerRef::index(0, 0));
    assert_eq!(frame.scene().fetch(IVec2::new(4, 4)).back, LayerRef::Fill);
}

#[test]
fn shrinking_viewport_hides_tiles_without_losing_them() {
    let tileset = Tileset::new(atlas_image(), UVec2::new(2, 1), &names()).unwrap();
    let mut frame = FrameRenderer::new(tileset, Viewport::new(8, 8, 1));
    assert!(frame.set_tile(IVec2::new(6, 6), layer("floor"), layer("wall")));

    frame.set_viewport(4, 4, 1);
    assert!(!frame.set_tile(IVec2::new(6, 6), layer("wall"), layer("wall")));
    frame.present();
    assert_eq!(frame.frame().dimensions(), (16, 16));

    frame.set_viewport(8, 8, 1);
    let cell = frame.scene().fetch(IVec2::new(6, 6));
    assert_eq!(cell.front, LayerRef::index(1, 0));
    assert_eq!(cell.back, LayerRef::index(0, 0));
    assert!(frame.present());
    assert_eq!(frame.frame().get_pixel(6 * 4 + 1, 6 * 4 + 1).0, [0, 255, 0, 255]);
}

// ── Config Tests ──────────────────────────────────────────────────────────────

#[test]
fn renderer_builds_from_config() {
    let config = Config::from_json_str(
        r#"{
            "viewport_width": 5,
            "viewport_height": 4,
            "viewport_scale": 3,
            "tileset_width": 2,
            "tileset_height": 1,
            "tile_names": ["wall", "floor"]
        }"#,
    )
    .unwrap();
    let frame = FrameRenderer::from_config(&config, &png_bytes(atlas_image())).unwrap();
    assert_eq!(frame.viewport().dimensions(), UVec2::new(5, 4));
    assert_eq!(frame.framebuffer_size(), UVec2::new(60, 48));
    assert_eq!(frame.tileset().tile("floor"), Some(LayerRef::index(1, 0)));
}

#[test]
fn config_loads_from_file() {
    let path = std::env::temp_dir().join(format!("tilecomp-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "application_name": "demo", "viewport_scale": 4 }"#).unwrap();
    let config = Config::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.application_name, "demo");
    assert_eq!(config.viewport().scale(), 4);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = Config::load("/nonexistent/tilecomp.json").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
