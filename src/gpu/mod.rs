// gpu/mod.rs — wgpu compute runtime.
//
// The default runtime. Platforms are wgpu backends (Vulkan, Metal, Dx12,
// Gl), devices are the adapters each backend exposes, and the kernel is
// WGSL (`sampler_test.wgsl`, read from the working directory at run time).
//
//   device.rs   adapter inventory, `ComputeRuntime` impl
//   sampler.rs  one trial: compile, upload, dispatch, read back
//
// The CPU sampler in `addressing.rs` is the reference every trial's output
// is checked against.

pub mod device;
mod sampler;

pub use device::{WgpuDevice, WgpuPlatform, WgpuRuntime, WGSL_KERNEL_FILE};
