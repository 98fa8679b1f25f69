// runtime.rs — The seam between the probe logic and a compute runtime.
//
// A runtime exposes a two-level inventory (platforms, then devices on a
// platform) and one operation: run the sampling kernel once on a device.
// Everything else (prompting, tabulating, checking against the reference)
// is written once against this trait.
//
//   runtime      platform          device
//   ─────────    ───────────────   ─────────────────
//   wgpu         backend (Vulkan)  adapter
//   OpenCL       cl_platform_id    cl_device_id

use std::fmt;

use crate::addressing::AddressingMode;
use crate::error::{RuntimeError, TrialError};
use crate::probe::TrialData;

/// Name of the kernel entry point every kernel file must export.
pub const KERNEL_ENTRY_POINT: &str = "sampler_test";

/// Name and version strings printed in selection listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub name: String,
    pub version: String,
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} - {}", self.name, self.version)
        }
    }
}

/// Which devices a platform query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFilter {
    All,
    Gpu,
}

/// A compute runtime that can run the sampling kernel.
pub trait ComputeRuntime {
    type Platform;
    /// Read-only handle to one device. Cheap to clone; two handles compare
    /// equal when they name the same device.
    type Device: Clone + PartialEq + fmt::Debug;

    /// Short runtime name for logs ("wgpu", "OpenCL").
    fn name(&self) -> &'static str;

    /// Kernel file read from the working directory when no path is given.
    fn kernel_file(&self) -> &'static str;

    fn platforms(&self) -> Result<Vec<Self::Platform>, RuntimeError>;

    fn describe_platform(&self, platform: &Self::Platform) -> Result<Description, RuntimeError>;

    fn devices(
        &self,
        platform: &Self::Platform,
        filter: DeviceFilter,
    ) -> Result<Vec<Self::Device>, RuntimeError>;

    fn describe_device(&self, device: &Self::Device) -> Result<Description, RuntimeError>;

    /// Compile `source` for `device` and run it once over `input` with a
    /// nearest-filter, normalized-coordinate sampler in `mode`.
    ///
    /// Every object created here (context, program, images, sampler,
    /// buffers) belongs to this call and is released before it returns.
    /// A successful result holds `2 * input.len() + 1` samples and as many
    /// coordinates.
    fn sample(
        &self,
        device: &Self::Device,
        mode: AddressingMode,
        source: &str,
        input: &[f32],
    ) -> Result<TrialData, TrialError>;
}
