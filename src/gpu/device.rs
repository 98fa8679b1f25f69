// gpu/device.rs — wgpu adapter inventory.
//
// Responsibilities:
//   - Create one `wgpu::Instance` covering every native backend.
//   - Present its adapters as a two-level inventory: one "platform" per
//     backend (Vulkan, Metal, Dx12, Gl), one "device" per adapter on it.
//   - Classify adapters for the first-GPU selector.
//
// ENUMERATION ORDER
// ─────────────────
// `Instance::enumerate_adapters` returns adapters grouped by backend in a
// fixed order. Platforms are listed in the order their first adapter shows
// up, and adapters keep their relative order within a platform, so the
// indices printed by the selector are stable for a given machine.
//
// INSTANCE LIFETIME
// ─────────────────
// Every `WgpuDevice` holds an `Arc` of the instance that produced it. The
// adapter never outlives its instance, even when the runtime value itself
// has been dropped (dzn on WSL2 crashes otherwise).
//
// DEVICE TYPES
// ────────────
//   DiscreteGpu    dedicated card                  GPU
//   IntegratedGpu  iGPU (AMD APU, Intel)           GPU
//   VirtualGpu     VM pass-through                 GPU
//   Cpu            llvmpipe, WARP, SwiftShader     not a GPU
//   Other          unknown (dzn on some drivers)   not a GPU
//
// The interactive selector lists all of them; `--first-gpu` only
// considers the first three.

use std::fmt;
use std::sync::Arc;

use crate::addressing::AddressingMode;
use crate::error::{RuntimeError, TrialError};
use crate::gpu::sampler;
use crate::probe::TrialData;
use crate::runtime::{ComputeRuntime, Description, DeviceFilter};

/// Default kernel file for the wgpu runtime.
pub const WGSL_KERNEL_FILE: &str = "sampler_test.wgsl";

/// Backends the instance is created with and enumerated over.
pub const BACKENDS: wgpu::Backends = wgpu::Backends::all();

/// Compute runtime backed by wgpu.
pub struct WgpuRuntime {
    instance: Arc<wgpu::Instance>,
}

/// One wgpu backend and the adapters it exposes.
#[derive(Debug, Clone)]
pub struct WgpuPlatform {
    pub backend: wgpu::Backend,
    adapters: Vec<WgpuDevice>,
}

/// Handle to one adapter. Cheap to clone.
#[derive(Clone)]
pub struct WgpuDevice {
    pub(crate) adapter: Arc<wgpu::Adapter>,
    pub info: wgpu::AdapterInfo,
    /// Position of the adapter within its backend.
    pub index: usize,
    _instance: Arc<wgpu::Instance>,
}

impl PartialEq for WgpuDevice {
    fn eq(&self, other: &Self) -> bool {
        self.info.backend == other.info.backend
            && self.index == other.index
            && self.info.name == other.info.name
    }
}

impl fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("backend", &self.info.backend)
            .field("index", &self.index)
            .field("name", &self.info.name)
            .field("device_type", &self.info.device_type)
            .finish()
    }
}

impl fmt::Display for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.info.name, self.info.backend, self.info.device_type
        )
    }
}

impl WgpuRuntime {
    /// Create an instance over all native backends.
    ///
    /// Validation layers are enabled in debug builds. Non-compliant
    /// adapters (dzn on WSL2) are enumerated rather than dropped.
    pub fn new() -> Self {
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: BACKENDS,
            flags,
            ..Default::default()
        });

        WgpuRuntime { instance: Arc::new(instance) }
    }
}

impl Default for WgpuRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeRuntime for WgpuRuntime {
    type Platform = WgpuPlatform;
    type Device = WgpuDevice;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn kernel_file(&self) -> &'static str {
        WGSL_KERNEL_FILE
    }

    fn platforms(&self) -> Result<Vec<WgpuPlatform>, RuntimeError> {
        let adapters = self.instance.enumerate_adapters(BACKENDS);
        let mut platforms: Vec<WgpuPlatform> = Vec::new();

        for adapter in adapters {
            let info = adapter.get_info();
            log::debug!(
                "wgpu adapter: {} ({:?}, {:?})",
                info.name,
                info.backend,
                info.device_type
            );

            let pos = match platforms.iter().position(|p| p.backend == info.backend) {
                Some(pos) => pos,
                None => {
                    platforms.push(WgpuPlatform { backend: info.backend, adapters: Vec::new() });
                    platforms.len() - 1
                }
            };
            let platform = &mut platforms[pos];
            platform.adapters.push(WgpuDevice {
                adapter: Arc::new(adapter),
                info,
                index: platform.adapters.len(),
                _instance: Arc::clone(&self.instance),
            });
        }

        Ok(platforms)
    }

    fn describe_platform(&self, platform: &WgpuPlatform) -> Result<Description, RuntimeError> {
        Ok(Description {
            name: format!("{:?}", platform.backend),
            version: String::new(),
        })
    }

    fn devices(
        &self,
        platform: &WgpuPlatform,
        filter: DeviceFilter,
    ) -> Result<Vec<WgpuDevice>, RuntimeError> {
        Ok(platform
            .adapters
            .iter()
            .filter(|d| filter == DeviceFilter::All || is_gpu(d.info.device_type))
            .cloned()
            .collect())
    }

    fn describe_device(&self, device: &WgpuDevice) -> Result<Description, RuntimeError> {
        Ok(Description {
            name: device.info.name.clone(),
            version: driver_version(&device.info),
        })
    }

    fn sample(
        &self,
        device: &WgpuDevice,
        mode: AddressingMode,
        source: &str,
        input: &[f32],
    ) -> Result<TrialData, TrialError> {
        sampler::run(device, mode, source, input)
    }
}

/// True for adapter types backed by real (or passed-through) GPU hardware.
pub fn is_gpu(device_type: wgpu::DeviceType) -> bool {
    matches!(
        device_type,
        wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::IntegratedGpu
            | wgpu::DeviceType::VirtualGpu
    )
}

/// "driver driver_info", either part may be empty.
fn driver_version(info: &wgpu::AdapterInfo) -> String {
    format!("{} {}", info.driver, info.driver_info).trim().to_string()
}

// ============================================================
// Tests
// ============================================================
