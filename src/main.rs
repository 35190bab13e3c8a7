use std::env;

use anyhow::Context;
use glam::{IVec2, UVec2};
use image::{Rgba, RgbaImage};

use tilecomp::compose::Compositor;
use tilecomp::compose::coords::CoordinateMapper;
use tilecomp::compose::layer::LayerRef;
use tilecomp::compose::modifier::Flip;
use tilecomp::compose::sample::Atlas;
use tilecomp::config::Config;
use tilecomp::frame::{FrameRenderer, NamedLayer};
use tilecomp::scene::{Scene, TileLayer};

const TILE: u32 = 8;

/// Two tiles side by side: solid blue, and a white marker in the top-left
/// corner pixel.
fn demo_atlas() -> Atlas {
    let mut img = RgbaImage::new(TILE * 2, TILE);
    for y in 0..TILE {
        for x in 0..TILE {
            img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
        }
    }
    img.put_pixel(TILE, 0, Rgba([255, 255, 255, 255]));
    Atlas::new(img, UVec2::splat(TILE), UVec2::new(2, 1))
}

/// 2x2 grid: red fill, a blue back layer showing through an empty front,
/// and the marker flipped on both axes so it lands in the bottom-right pixel.
/// Cell (1, 0) keeps the default white fill.
fn demo_scene() -> Scene {
    let mut scene = Scene::new(UVec2::splat(2));
    scene.set_tile(IVec2::new(0, 0), TileLayer::fill([255, 0, 0]), TileLayer::EMPTY);
    scene.set_tile(
        IVec2::new(1, 1),
        TileLayer::EMPTY,
        TileLayer::new(LayerRef::index(0, 0), [255, 255, 255], Flip::None),
    );
    scene.set_tile(
        IVec2::new(0, 1),
        TileLayer::new(LayerRef::index(1, 0), [255, 255, 255], Flip::Both),
        TileLayer::EMPTY,
    );
    scene
}

/// Render a configured tileset with every named tile laid out in order.
fn render_config(path: &str) -> anyhow::Result<RgbaImage> {
    let config = Config::load(path).with_context(|| format!("loading {path}"))?;
    config.log();
    let png = std::fs::read(&config.tileset_path)
        .with_context(|| format!("reading tileset {}", config.tileset_path))?;
    let mut frame = FrameRenderer::from_config(&config, &png)?;

    let width = frame.viewport().dimensions().x as usize;
    for (i, name) in config.tile_names.iter().enumerate() {
        let pos = IVec2::new((i % width) as i32, (i / width) as i32);
        frame.set_tile(
            pos,
            NamedLayer::new(name, [255, 255, 255], Flip::None),
            NamedLayer::new("none", [0, 0, 0], Flip::None),
        );
    }
    frame.present();
    Ok(frame.frame().clone())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "tilecomp.png".to_string());

    let image = match args.next() {
        Some(config_path) => render_config(&config_path)?,
        None => {
            let atlas = demo_atlas();
            let scene = demo_scene();
            let fb = scene.size() * TILE;
            let mapper = CoordinateMapper::scaled(scene.size(), atlas.tile_size(), 1, fb);
            Compositor::new(&scene, &atlas, mapper).render()
        }
    };

    image.save(&output).with_context(|| format!("writing {output}"))?;
    log::info!("wrote {}x{} frame to {output}", image.width(), image.height());
    Ok(())
}
