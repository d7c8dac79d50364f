//! GPU context and device management.

use std::sync::Arc;

use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Limits, Queue};

use crate::{RenderError, RenderResult};

/// GPU context holding the device and queue the renderer dispatches on.
pub struct GpuContext {
    pub(crate) device: Arc<Device>,
    pub(crate) queue: Arc<Queue>,
    adapter_info: wgpu::AdapterInfo,
    limits: Limits,
}

impl GpuContext {
    /// Creates a new GPU context with default settings.
    pub fn new() -> RenderResult<Self> {
        Self::with_power_preference(wgpu::PowerPreference::HighPerformance)
    }

    /// Creates a context with a power preference.
    pub fn with_power_preference(power: wgpu::PowerPreference) -> RenderResult<Self> {
        pollster::block_on(Self::new_async(power))
    }

    /// Async context creation.
    async fn new_async(power: wgpu::PowerPreference) -> RenderResult<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter: Adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::debug!(
            "using adapter '{}' via {:?}",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("rawgrade"),
                    required_features: Features::empty(),
                    required_limits: Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;
        let limits = device.limits();

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            limits,
        })
    }

    /// Adapter info (GPU name, vendor, backend).
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Device name.
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Backend type (Vulkan, DX12, Metal, ...).
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    /// Device limits, used for tiling decisions.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Creates a compute shader module.
    pub(crate) fn create_shader(&self, label: &str, source: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}
