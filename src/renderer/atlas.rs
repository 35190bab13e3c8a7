use std::borrow::Cow;

use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::compose::sample::Atlas;

/// GPU copy of the sprite atlas.
///
/// Uploaded as linear `Rgba8Unorm` and read with `textureLoad`, so the
/// shader sees the same bytes the CPU sampler does.
pub struct AtlasTexture {
    pub texture_view: wgpu::TextureView,
    pub tile_w: u32,
    pub tile_h: u32,
}

/// Texture extent and texel bytes for `img`. An empty image becomes a single
/// transparent texel, which is what the CPU sampler reads from it.
fn texel_data(img: &RgbaImage) -> (wgpu::Extent3d, Cow<'_, [u8]>) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        let size = wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 };
        return (size, Cow::Owned(vec![0; 4]));
    }
    let size = wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 };
    (size, Cow::Borrowed(img.as_raw().as_slice()))
}

impl AtlasTexture {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, atlas: &Atlas) -> Self {
        let (size, data) = texel_data(atlas.image());

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("atlas"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let grid = atlas.grid();
        let tile = atlas.tile_size();
        log::debug!(
            "atlas uploaded: {}x{} px, {}x{} tiles",
            size.width,
            size.height,
            grid.x,
            grid.y
        );

        Self { texture_view, tile_w: tile.x, tile_h: tile.y }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_data_matches_extent() {
        let img = RgbaImage::new(6, 3);
        let (size, data) = texel_data(&img);
        assert_eq!((size.width, size.height), (6, 3));
        assert_eq!(data.len(), 6 * 3 * 4);
    }

    #[test]
    fn empty_image_uploads_one_transparent_texel() {
        let img = RgbaImage::new(0, 0);
        let (size, data) = texel_data(&img);
        assert_eq!((size.width, size.height, size.depth_or_array_layers), (1, 1, 1));
        assert_eq!(&*data, &[0, 0, 0, 0]);
    }
}
