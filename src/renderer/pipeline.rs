use glam::UVec2;

use crate::compose::coords::{CoordinateMapper, Mapping};
use crate::compose::resolve::OpacityTest;

/// Per-frame constants for the composition shader.
///
/// Layout matches the WGSL `Uniforms` struct (48 bytes, `vec2<u32>` aligned).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ComposeUniforms {
    /// Grid size in tiles.
    pub viewport_size: [u32; 2],
    /// Output pixels per cell (`tile_size * scale`) under the scaled mapping.
    pub cell_span: [u32; 2],
    pub framebuffer_size: [u32; 2],
    /// Atlas tile size in pixels.
    pub tile_size: [u32; 2],
    /// 0 = magnitude, 1 = alpha.
    pub opacity_test: u32,
    /// 0 = scaled, 1 = stretch.
    pub mapping: u32,
    pub _pad: [u32; 2],
}

impl ComposeUniforms {
    pub fn new(mapper: &CoordinateMapper, atlas_tile_size: UVec2, opacity: OpacityTest) -> Self {
        let (cell_span, mapping) = match mapper.mapping {
            Mapping::Scaled { tile_size, scale } => ((tile_size * scale.max(1)).max(UVec2::ONE), 0),
            Mapping::Stretch => (UVec2::ONE, 1),
        };
        Self {
            viewport_size: mapper.viewport.to_array(),
            cell_span: cell_span.to_array(),
            framebuffer_size: mapper.framebuffer.to_array(),
            tile_size: atlas_tile_size.to_array(),
            opacity_test: match opacity {
                OpacityTest::Magnitude => 0,
                OpacityTest::Alpha => 1,
            },
            mapping,
            _pad: [0; 2],
        }
    }
}

pub struct ComposePipeline {
    pub render_pipeline: wgpu::RenderPipeline,
    /// group 0: uniforms + the three state textures
    pub state_bind_group_layout: wgpu::BindGroupLayout,
    /// group 1: sprite atlas
    pub atlas_bind_group_layout: wgpu::BindGroupLayout,
}

fn unfiltered_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        // Read with textureLoad only; each texel is a discrete record.
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub fn create_compose_pipeline(
    device: &wgpu::Device,
    target_format: wgpu::TextureFormat,
) -> ComposePipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("compose_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/compose.wgsl").into()),
    });

    let state_bind_group_layout =
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compose_state_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                unfiltered_texture_entry(1),
                unfiltered_texture_entry(2),
                unfiltered_texture_entry(3),
            ],
        });

    let atlas_bind_group_layout =
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compose_atlas_bgl"),
            entries: &[unfiltered_texture_entry(0)],
        });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("compose_pipeline_layout"),
        bind_group_layouts: &[&state_bind_group_layout, &atlas_bind_group_layout],
        ..Default::default()
    });

    let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("compose_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                // Every pixel is overwritten, never blended with the last frame.
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    ComposePipeline {
        render_pipeline,
        state_bind_group_layout,
        atlas_bind_group_layout,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<ComposeUniforms>(), 48);
    }

    #[test]
    fn scaled_mapper_sets_cell_span() {
        let m = CoordinateMapper::scaled(UVec2::new(40, 25), UVec2::new(8, 12), 3, UVec2::new(960, 900));
        let u = ComposeUniforms::new(&m, UVec2::new(8, 12), OpacityTest::Magnitude);
        assert_eq!(u.viewport_size, [40, 25]);
        assert_eq!(u.cell_span, [24, 36]);
        assert_eq!(u.tile_size, [8, 12]);
        assert_eq!(u.framebuffer_size, [960, 900]);
        assert_eq!(u.mapping, 0);
        assert_eq!(u.opacity_test, 0);
    }

    #[test]
    fn stretch_mapper_and_alpha_test_flags() {
        let m = CoordinateMapper::stretch(UVec2::new(4, 4), UVec2::new(100, 50));
        let u = ComposeUniforms::new(&m, UVec2::splat(8), OpacityTest::Alpha);
        assert_eq!(u.mapping, 1);
        assert_eq!(u.opacity_test, 1);
    }
}
