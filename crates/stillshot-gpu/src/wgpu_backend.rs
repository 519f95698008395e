//! [`RenderBackend`] on top of wgpu.
//!
//! Targets are textures owned by the backend and addressed by [`TargetId`].
//! Scene drawing belongs to the host; it plugs in through [`SceneRenderer`].

use crate::backend::{ClearFlags, RenderBackend, TargetDesc, TargetId};
use crate::context::GpuContext;
use crate::format::{rgba16f_to_rgba8, swizzle_bgra_rgba, TextureFormat};
use crate::texture::TargetTextures;
use std::collections::HashMap;
use stillshot_core::{CameraState, CaptureError, PixelRect, Result};
use tracing::debug;

/// Attachments a scene renders into.
pub struct SceneTarget<'a> {
    /// Color view to draw into (multisampled when anti-aliasing is on).
    pub color: &'a wgpu::TextureView,
    /// Resolve destination when `color` is multisampled.
    pub resolve: Option<&'a wgpu::TextureView>,
    pub depth: Option<&'a wgpu::TextureView>,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
}

/// Draws the host scene from a camera. Attachments are already cleared.
pub trait SceneRenderer {
    fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &SceneTarget<'_>,
        camera: &CameraState,
    );
}

/// Scene renderer that draws nothing; the target keeps its clear color.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScene;

impl SceneRenderer for EmptyScene {
    fn render(
        &mut self,
        _gpu: &GpuContext,
        _encoder: &mut wgpu::CommandEncoder,
        _target: &SceneTarget<'_>,
        _camera: &CameraState,
    ) {
    }
}

/// wgpu-backed render backend.
pub struct WgpuBackend<S: SceneRenderer> {
    gpu: GpuContext,
    scene: S,
    targets: HashMap<TargetId, TargetTextures>,
    next_id: u64,
    active: Option<TargetId>,
}

impl<S: SceneRenderer> WgpuBackend<S> {
    pub fn new(gpu: GpuContext, scene: S) -> Self {
        Self {
            gpu,
            scene,
            targets: HashMap::new(),
            next_id: 0,
            active: None,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// GPU memory held by all live targets.
    pub fn memory_usage(&self) -> u64 {
        self.targets
            .values()
            .map(|t| t.memory_size() as u64)
            .sum()
    }

    fn textures(&self, target: TargetId) -> Result<&TargetTextures> {
        self.targets
            .get(&target)
            .ok_or_else(|| CaptureError::RenderFailure(format!("unknown render target {:?}", target)))
    }
}

impl<S: SceneRenderer> RenderBackend for WgpuBackend<S> {
    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId> {
        let limit = self.gpu.device.limits().max_texture_dimension_2d;
        let allocation_failure = |reason: String| CaptureError::AllocationFailure {
            width: desc.width,
            height: desc.height,
            reason,
        };
        if desc.width == 0 || desc.height == 0 || desc.width > limit || desc.height > limit {
            return Err(allocation_failure(format!(
                "dimensions outside 1..={limit}"
            )));
        }

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let textures = TargetTextures::new(device, desc);
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        if let Some(err) = oom.or(validation) {
            textures.destroy();
            return Err(allocation_failure(err.to_string()));
        }

        self.next_id += 1;
        let id = TargetId(self.next_id);
        self.targets.insert(id, textures);
        debug!("wgpu target {:?} created ({}x{})", id, desc.width, desc.height);
        Ok(id)
    }

    fn destroy_target(&mut self, target: TargetId) {
        if let Some(textures) = self.targets.remove(&target) {
            textures.destroy();
            if self.active == Some(target) {
                self.active = None;
            }
        }
    }

    fn clear(&mut self, target: TargetId, flags: ClearFlags, color: [f32; 4]) -> Result<()> {
        let textures = self.textures(target)?;
        let (view, resolve) = textures.attachment_views();

        let color_load = match flags {
            ClearFlags::All | ClearFlags::ColorOnly => wgpu::LoadOp::Clear(wgpu::Color {
                r: color[0] as f64,
                g: color[1] as f64,
                b: color[2] as f64,
                a: color[3] as f64,
            }),
            ClearFlags::DepthOnly => wgpu::LoadOp::Load,
        };
        let depth_load = match flags {
            ClearFlags::All | ClearFlags::DepthOnly => wgpu::LoadOp::Clear(1.0),
            ClearFlags::ColorOnly => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: resolve,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: textures.depth.as_ref().map(|depth| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn render_camera(&mut self, camera: &CameraState, target: TargetId) -> Result<()> {
        let textures = self
            .targets
            .get(&target)
            .ok_or_else(|| CaptureError::RenderFailure(format!("unknown render target {:?}", target)))?;
        let (color, resolve) = textures.attachment_views();
        let scene_target = SceneTarget {
            color,
            resolve,
            depth: textures.depth.as_ref().map(|d| &d.view),
            format: textures.color.format,
            sample_count: textures
                .multisampled
                .as_ref()
                .map_or(1, |msaa| msaa.sample_count),
            width: textures.color.width,
            height: textures.color.height,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });
        self.scene
            .render(&self.gpu, &mut encoder, &scene_target, camera);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.active = Some(target);
        Ok(())
    }

    fn read_pixels(
        &mut self,
        target: TargetId,
        rect: PixelRect,
        format: TextureFormat,
    ) -> Result<Vec<u8>> {
        let textures = self.textures(target)?;
        let color = &textures.color;
        let readback_failure = |reason: String| CaptureError::ReadbackFailure {
            attempts: 1,
            reason,
        };

        let source = match color.format {
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
                TextureFormat::Bgra8Unorm
            }
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
                TextureFormat::Rgba8Unorm
            }
            wgpu::TextureFormat::Rgba16Float => TextureFormat::Rgba16Float,
            other => {
                return Err(readback_failure(format!(
                    "cannot read {:?} as {:?}",
                    other, format
                )))
            }
        };
        if !format.is_8bit() {
            return Err(readback_failure(format!("unsupported read format {:?}", format)));
        }
        if rect.x + rect.width > color.width || rect.y + rect.height > color.height {
            return Err(readback_failure(format!(
                "rect {:?} outside {}x{} target",
                rect, color.width, color.height
            )));
        }

        let unpadded_row = rect.width * source.bytes_per_pixel();
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded_row as u64 * rect.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x,
                    y: rect.top_row(color.height),
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(rect.height),
                },
            },
            wgpu::Extent3d {
                width: rect.width,
                height: rect.height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| readback_failure(format!("map callback dropped: {e}")))?
            .map_err(|e| readback_failure(format!("buffer map failed: {e}")))?;

        let mut pixels = Vec::with_capacity((unpadded_row * rect.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_row as usize]);
            }
        }
        buffer.unmap();

        if !source.is_8bit() {
            pixels = rgba16f_to_rgba8(&pixels);
        }
        if source.is_bgra() != format.is_bgra() {
            swizzle_bgra_rgba(&mut pixels);
        }
        Ok(pixels)
    }

    fn release_active_target(&mut self) {
        self.active = None;
    }
}

impl<S: SceneRenderer> Drop for WgpuBackend<S> {
    fn drop(&mut self) {
        for (_, textures) in self.targets.drain() {
            textures.destroy();
        }
    }
}
