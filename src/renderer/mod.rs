pub mod atlas;
pub mod pipeline;

use std::sync::mpsc;

use bytemuck::Zeroable;
use glam::UVec2;
use image::RgbaImage;
use wgpu::util::DeviceExt;

use atlas::AtlasTexture;
use pipeline::{ComposePipeline, ComposeUniforms, create_compose_pipeline};

use crate::compose::coords::CoordinateMapper;
use crate::compose::resolve::OpacityTest;
use crate::compose::sample::Atlas;
use crate::error::{Error, Result};
use crate::scene::{DirtyRegion, Scene};

/// Format the per-cell layer references are stored in on the GPU.
pub const LAYER_REF_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Format of both modifier textures.
pub const MODIFIER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// The three scene textures, sized to the scene grid.
struct StateTextures {
    size: UVec2,
    layer_refs: wgpu::Texture,
    front_modifiers: wgpu::Texture,
    back_modifiers: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

fn state_texture(device: &wgpu::Device, label: &str, size: UVec2, format: wgpu::TextureFormat) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_region<T: bytemuck::Pod>(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    region: DirtyRegion,
    buffer: &[T],
    stride: u32,
) {
    let data = region.extract(buffer, stride);
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: region.x, y: region.y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&data),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(region.width * std::mem::size_of::<T>() as u32),
            rows_per_image: Some(region.height),
        },
        wgpu::Extent3d {
            width: region.width,
            height: region.height,
            depth_or_array_layers: 1,
        },
    );
}

// ── GpuCompositor ─────────────────────────────────────────────────────────────

/// Runs the composition rules as a fragment shader.
///
/// Scene buffers are mirrored into textures; only the dirty rectangle is
/// re-uploaded between frames. The caller owns the render target, which
/// should be `Rgba8Unorm` for output identical to the CPU compositor.
pub struct GpuCompositor {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pipeline: ComposePipeline,
    uniform_buffer: wgpu::Buffer,
    atlas: AtlasTexture,
    atlas_bind_group: wgpu::BindGroup,
    state: Option<StateTextures>,
}

impl GpuCompositor {
    /// Headless setup on the default adapter.
    pub async fn new(atlas: &Atlas, target_format: wgpu::TextureFormat) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|err| Error::Gpu(format!("no suitable adapter: {err}")))?;
        log::info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|err| Error::Gpu(format!("failed to create device: {err}")))?;

        Ok(Self::with_device(device, queue, atlas, target_format))
    }

    /// `new` for callers without an async runtime.
    pub fn new_blocking(atlas: &Atlas, target_format: wgpu::TextureFormat) -> Result<Self> {
        pollster::block_on(Self::new(atlas, target_format))
    }

    pub fn with_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        atlas: &Atlas,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let pipeline = create_compose_pipeline(&device, target_format);
        let atlas = AtlasTexture::upload(&device, &queue, atlas);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("compose_uniforms"),
            contents: bytemuck::bytes_of(&ComposeUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compose_atlas_bg"),
            layout: &pipeline.atlas_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&atlas.texture_view),
            }],
        });

        Self {
            device,
            queue,
            pipeline,
            uniform_buffer,
            atlas,
            atlas_bind_group,
            state: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn create_state(&self, size: UVec2) -> StateTextures {
        let layer_refs = state_texture(&self.device, "layer_refs", size, LAYER_REF_FORMAT);
        let front_modifiers = state_texture(&self.device, "front_modifiers", size, MODIFIER_FORMAT);
        let back_modifiers = state_texture(&self.device, "back_modifiers", size, MODIFIER_FORMAT);

        let views = [&layer_refs, &front_modifiers, &back_modifiers]
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compose_state_bg"),
            layout: &self.pipeline.state_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&views[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&views[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&views[2]),
                },
            ],
        });

        StateTextures { size, layer_refs, front_modifiers, back_modifiers, bind_group }
    }

    /// Mirror the scene into the state textures.
    ///
    /// A size change recreates them and uploads everything; otherwise only
    /// the scene's dirty rectangle is written. Marks the scene clean.
    pub fn upload(&mut self, scene: &mut Scene) {
        let size = scene.size();
        if size.x == 0 || size.y == 0 {
            self.state = None;
            scene.take_dirty_region();
            return;
        }

        let region = if self.state.as_ref().is_some_and(|s| s.size == size) {
            scene.take_dirty_region()
        } else {
            log::debug!("state textures resized to {}x{}", size.x, size.y);
            self.state = Some(self.create_state(size));
            scene.take_dirty_region();
            Some(DirtyRegion { x: 0, y: 0, width: size.x, height: size.y })
        };

        let (Some(region), Some(state)) = (region, &self.state) else {
            return;
        };
        write_region(&self.queue, &state.layer_refs, region, scene.layer_refs(), scene.stride());
        write_region(&self.queue, &state.front_modifiers, region, scene.front_modifiers(), scene.stride());
        write_region(&self.queue, &state.back_modifiers, region, scene.back_modifiers(), scene.stride());
    }

    /// Render one frame into `target`. Without an uploaded scene every pixel
    /// is the default colour.
    pub fn render(&self, target: &wgpu::TextureView, mapper: &CoordinateMapper, opacity: OpacityTest) {
        let tile_size = UVec2::new(self.atlas.tile_w, self.atlas.tile_h);
        let uniforms = ComposeUniforms::new(mapper, tile_size, opacity);
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("compose_encoder") });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("compose_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(state) = &self.state {
                pass.set_pipeline(&self.pipeline.render_pipeline);
                pass.set_bind_group(0, &state.bind_group, &[]);
                pass.set_bind_group(1, &self.atlas_bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Offscreen target matching `size`, usable as a render attachment and
    /// as a copy source for readback.
    pub fn create_target(&self, size: UVec2, format: wgpu::TextureFormat) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("compose_target"),
            size: wgpu::Extent3d {
                width: size.x.max(1),
                height: size.y.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Copy an `Rgba8Unorm` target back to the CPU. Blocks until the copy
    /// has finished.
    pub fn read_target(&self, target: &wgpu::Texture) -> Result<RgbaImage> {
        if target.format() != wgpu::TextureFormat::Rgba8Unorm {
            return Err(Error::Gpu(format!("cannot read back {:?} target", target.format())));
        }
        let (width, height) = (target.width(), target.height());
        let unpadded = width * 4;
        let padded = padded_bytes_per_row(width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compose_readback"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback_encoder") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            target.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|err| Error::Gpu(format!("device poll failed: {err}")))?;
        rx.recv()
            .map_err(|err| Error::Gpu(format!("readback never completed: {err}")))?
            .map_err(|err| Error::Gpu(format!("readback map failed: {err}")))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::Gpu("readback size mismatch".to_string()))
    }

    /// Render into a fresh target sized to the mapper's framebuffer and read
    /// it back. Requires the compositor to have been built for `Rgba8Unorm`.
    pub fn render_image(&self, mapper: &CoordinateMapper, opacity: OpacityTest) -> Result<RgbaImage> {
        let target = self.create_target(mapper.framebuffer, wgpu::TextureFormat::Rgba8Unorm);
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        self.render(&view, mapper, opacity);
        self.read_target(&target)
    }
}

/// Row pitch of a texture-to-buffer copy of `width` RGBA8 texels.
fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * 4).div_ceil(align) * align
}

// ── Tests ──────────────────────────────────────────────────────────────────────
