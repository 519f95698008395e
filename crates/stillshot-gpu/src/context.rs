//! GPU context management.

use crate::capability::{CapabilitySource, PlatformClass};
use crate::format::TextureFormat;
use stillshot_core::{CaptureError, Result};
use tracing::info;

/// GPU context holding device and queue.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a new GPU context on the highest-performance adapter.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| CaptureError::RenderFailure("No suitable GPU adapter found".to_string()))?;

        info!("Using GPU adapter: {:?}", adapter.get_info());

        // Ask for the adapter's own limits so large capture targets are allowed.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("StillShot Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .map_err(|e| CaptureError::RenderFailure(format!("Failed to create device: {}", e)))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Create a new GPU context (blocking version).
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Get adapter info.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }
}

impl CapabilitySource for GpuContext {
    fn gpu_name(&self) -> Option<String> {
        let name = self.adapter_info().name;
        (!name.is_empty()).then_some(name)
    }

    fn driver_version(&self) -> Option<String> {
        let info = self.adapter_info();
        Some(format!("{:?} {} {}", info.backend, info.driver, info.driver_info))
    }

    // wgpu does not report memory sizes; the profile falls back.
    fn gpu_memory_mb(&self) -> Option<u64> {
        None
    }

    fn system_memory_mb(&self) -> Option<u64> {
        None
    }

    fn max_texture_size(&self) -> Option<u32> {
        Some(self.device.limits().max_texture_dimension_2d)
    }

    fn supports_format(&self, format: TextureFormat) -> bool {
        let needed = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        self.adapter
            .get_texture_format_features(format.to_wgpu())
            .allowed_usages
            .contains(needed)
    }

    fn platform_class(&self) -> PlatformClass {
        if cfg!(target_arch = "wasm32") {
            PlatformClass::Web
        } else if cfg!(any(target_os = "android", target_os = "ios")) {
            PlatformClass::Mobile
        } else {
            PlatformClass::Desktop
        }
    }
}
