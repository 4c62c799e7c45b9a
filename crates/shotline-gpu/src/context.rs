//! GPU device probing.

use shotline_core::{Result, ShotlineError};
use std::sync::Arc;
use tracing::info;

use crate::limits::DeviceLimits;
use crate::profile::PowerPreference;

/// An opened adapter. Only its capabilities feed the arbiter.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Obtain an adapter and device with the given power preference.
    ///
    /// The device is requested with the adapter's own limits so that
    /// [`GpuContext::limits`] reflects what the hardware offers.
    pub async fn probe(power_preference: PowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power_preference.into(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ShotlineError::Gpu("No suitable GPU adapter found".to_string()))?;

        let info = adapter.get_info();
        info!("Probed adapter {} on {:?}", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Shotline Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .map_err(|e| ShotlineError::Gpu(format!("Failed to create device: {}", e)))?;

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking version of [`GpuContext::probe`].
    pub fn probe_blocking(power_preference: PowerPreference) -> Result<Self> {
        pollster::block_on(Self::probe(power_preference))
    }

    /// Capability snapshot of the opened device.
    pub fn limits(&self) -> DeviceLimits {
        DeviceLimits::from_wgpu(&self.device.limits())
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }
}
