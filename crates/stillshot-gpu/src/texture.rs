//! wgpu textures backing render targets.

use crate::backend::TargetDesc;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A GPU texture with its default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl GpuTexture {
    /// Create a new GPU texture with the given dimensions.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
        usage: wgpu::TextureUsages,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
            sample_count,
        }
    }

    /// Memory usage estimate in bytes.
    pub fn memory_size(&self) -> usize {
        let bytes_per_pixel = match self.format {
            wgpu::TextureFormat::Rgba16Float => 8,
            _ => 4,
        };
        (self.width as usize * self.height as usize) * bytes_per_pixel * self.sample_count as usize
    }
}

/// The textures behind one render target: resolved color, optional MSAA
/// color and optional depth.
pub struct TargetTextures {
    pub color: GpuTexture,
    pub multisampled: Option<GpuTexture>,
    pub depth: Option<GpuTexture>,
}

impl TargetTextures {
    pub fn new(device: &wgpu::Device, desc: &TargetDesc) -> Self {
        let samples = u32::from(desc.anti_aliasing.max(1));
        let format = desc.format.to_wgpu();

        let color = GpuTexture::new(
            device,
            desc.width,
            desc.height,
            format,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            Some("Render Target"),
        );

        let multisampled = (samples > 1).then(|| {
            GpuTexture::new(
                device,
                desc.width,
                desc.height,
                format,
                samples,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                Some("Render Target MSAA"),
            )
        });

        let depth = desc.with_depth.then(|| {
            GpuTexture::new(
                device,
                desc.width,
                desc.height,
                DEPTH_FORMAT,
                samples,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                Some("Render Target Depth"),
            )
        });

        Self {
            color,
            multisampled,
            depth,
        }
    }

    /// View to draw into, and the resolve view when multisampling.
    pub fn attachment_views(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match &self.multisampled {
            Some(msaa) => (&msaa.view, Some(&self.color.view)),
            None => (&self.color.view, None),
        }
    }

    pub fn memory_size(&self) -> usize {
        self.color.memory_size()
            + self.multisampled.as_ref().map_or(0, GpuTexture::memory_size)
            + self.depth.as_ref().map_or(0, GpuTexture::memory_size)
    }

    pub fn destroy(self) {
        self.color.texture.destroy();
        if let Some(msaa) = self.multisampled {
            msaa.texture.destroy();
        }
        if let Some(depth) = self.depth {
            depth.texture.destroy();
        }
    }
}
