// opencl.rs — OpenCL compute runtime (feature `opencl`).
//
// Platforms and devices are the OpenCL ones, in `clGetPlatformIDs` /
// `clGetDeviceIDs` order. A trial builds everything from scratch:
//
//   context (1 device) → queue → program (built from source) → kernel
//   → input image1d (N, CL_R/CL_FLOAT) → output image1d (2N+1)
//   → sampler (normalized, nearest) → coords buffer (2N+1 floats)
//   → NDRange, global size 1 → finish → read image + buffer
//
// All handles are RAII wrappers from `opencl3` and are released when the
// trial returns, on success and on every error path.
//
// The kernel is compiled with `-cl-std=CL2.0 -I .` unless other options
// are configured. A failed build reports the `cl_int` status together with
// the build log of every device in the context.

use std::ffi::c_void;
use std::ptr;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{Device, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_GPU};
use opencl3::error_codes::ClError;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{
    Buffer, ClMem, Image, Sampler, CL_ADDRESS_CLAMP, CL_ADDRESS_CLAMP_TO_EDGE,
    CL_ADDRESS_MIRRORED_REPEAT, CL_ADDRESS_REPEAT, CL_FILTER_NEAREST, CL_FLOAT,
    CL_MEM_OBJECT_IMAGE1D, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY, CL_R,
};
use opencl3::platform::{get_platforms, Platform};
use opencl3::program::Program;
use opencl3::types::{
    cl_addressing_mode, cl_device_id, cl_device_type, cl_float, cl_image_desc, cl_image_format,
    cl_int, CL_BLOCKING, CL_TRUE,
};

use crate::addressing::AddressingMode;
use crate::error::{BuildLog, RuntimeError, TrialError};
use crate::probe::{output_len, TrialData};
use crate::runtime::{ComputeRuntime, Description, DeviceFilter, KERNEL_ENTRY_POINT};

/// Default kernel file for the OpenCL runtime.
pub const CL_KERNEL_FILE: &str = "sampler_test.cl";

/// Options passed to `clBuildProgram` by default.
pub const DEFAULT_BUILD_OPTIONS: &str = "-cl-std=CL2.0 -I .";

/// `CL_DEVICE_NOT_FOUND`: the platform has no device of the requested type.
const CL_DEVICE_NOT_FOUND: cl_int = -1;
/// `CL_PLATFORM_NOT_FOUND_KHR`: the ICD loader found no platform.
const CL_PLATFORM_NOT_FOUND_KHR: cl_int = -1001;

/// Compute runtime backed by the system OpenCL ICD loader.
#[derive(Debug, Clone)]
pub struct OpenClRuntime {
    build_options: String,
}

/// Handle to one OpenCL device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenClDevice {
    id: cl_device_id,
}

impl OpenClDevice {
    pub fn id(&self) -> cl_device_id {
        self.id
    }
}

impl OpenClRuntime {
    pub fn new() -> Self {
        OpenClRuntime { build_options: DEFAULT_BUILD_OPTIONS.to_string() }
    }

    /// Replace the options passed to `clBuildProgram`.
    pub fn with_build_options(mut self, options: impl Into<String>) -> Self {
        self.build_options = options.into();
        self
    }

    pub fn build_options(&self) -> &str {
        &self.build_options
    }
}

impl Default for OpenClRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a failed OpenCL call as a `RuntimeError` naming the call.
fn api(what: &'static str) -> impl FnOnce(ClError) -> RuntimeError {
    move |e| RuntimeError::Api { code: e.0, what: what.to_string() }
}

/// OpenCL address mode for a sampler in `mode`.
pub fn cl_address_mode(mode: AddressingMode) -> cl_addressing_mode {
    match mode {
        AddressingMode::MirroredRepeat => CL_ADDRESS_MIRRORED_REPEAT,
        AddressingMode::Repeat => CL_ADDRESS_REPEAT,
        AddressingMode::ClampToEdge => CL_ADDRESS_CLAMP_TO_EDGE,
        AddressingMode::Clamp => CL_ADDRESS_CLAMP,
    }
}

fn device_type(filter: DeviceFilter) -> cl_device_type {
    match filter {
        DeviceFilter::All => CL_DEVICE_TYPE_ALL,
        DeviceFilter::Gpu => CL_DEVICE_TYPE_GPU,
    }
}

impl ComputeRuntime for OpenClRuntime {
    type Platform = Platform;
    type Device = OpenClDevice;

    fn name(&self) -> &'static str {
        "OpenCL"
    }

    fn kernel_file(&self) -> &'static str {
        CL_KERNEL_FILE
    }

    fn platforms(&self) -> Result<Vec<Platform>, RuntimeError> {
        match get_platforms() {
            Ok(platforms) => Ok(platforms),
            // The ICD loader reports "no platforms" as an error status.
            Err(ClError(CL_PLATFORM_NOT_FOUND_KHR)) => Ok(Vec::new()),
            Err(e) => Err(api("clGetPlatformIDs")(e)),
        }
    }

    fn describe_platform(&self, platform: &Platform) -> Result<Description, RuntimeError> {
        Ok(Description {
            name: platform.name().map_err(api("clGetPlatformInfo"))?,
            version: platform.version().map_err(api("clGetPlatformInfo"))?,
        })
    }

    fn devices(
        &self,
        platform: &Platform,
        filter: DeviceFilter,
    ) -> Result<Vec<OpenClDevice>, RuntimeError> {
        match platform.get_devices(device_type(filter)) {
            Ok(ids) => Ok(ids.into_iter().map(|id| OpenClDevice { id }).collect()),
            Err(ClError(CL_DEVICE_NOT_FOUND)) => Ok(Vec::new()),
            Err(e) => Err(api("clGetDeviceIDs")(e)),
        }
    }

    fn describe_device(&self, device: &OpenClDevice) -> Result<Description, RuntimeError> {
        let device = Device::new(device.id);
        Ok(Description {
            name: device.name().map_err(api("clGetDeviceInfo"))?.trim().to_string(),
            version: device.version().map_err(api("clGetDeviceInfo"))?.trim().to_string(),
        })
    }

    fn sample(
        &self,
        device: &OpenClDevice,
        mode: AddressingMode,
        source: &str,
        input: &[f32],
    ) -> Result<TrialData, TrialError> {
        let device = Device::new(device.id);
        let count = output_len(input.len());

        let context = Context::from_device(&device).map_err(api("clCreateContext"))?;
        #[allow(deprecated)]
        let queue =
            CommandQueue::create_default(&context, 0).map_err(api("clCreateCommandQueue"))?;

        let program = build_program(&context, source, &self.build_options)?;
        let kernel =
            Kernel::create(&program, KERNEL_ENTRY_POINT).map_err(api("clCreateKernel"))?;

        let format = cl_image_format { image_channel_order: CL_R, image_channel_data_type: CL_FLOAT };
        let mut img_in = unsafe {
            Image::create(
                &context,
                CL_MEM_READ_ONLY,
                &format,
                &image1d_desc(input.len()),
                ptr::null_mut(),
            )
            .map_err(api("clCreateImage"))?
        };
        let img_out = unsafe {
            Image::create(&context, CL_MEM_WRITE_ONLY, &format, &image1d_desc(count), ptr::null_mut())
                .map_err(api("clCreateImage"))?
        };

        #[allow(deprecated)]
        let sampler = Sampler::create(&context, CL_TRUE, cl_address_mode(mode), CL_FILTER_NEAREST)
            .map_err(api("clCreateSampler"))?;

        let coords_buf = unsafe {
            Buffer::<cl_float>::create(&context, CL_MEM_WRITE_ONLY, count, ptr::null_mut())
                .map_err(api("clCreateBuffer"))?
        };

        let origin: [usize; 3] = [0, 0, 0];
        let region_in: [usize; 3] = [input.len(), 1, 1];
        unsafe {
            queue
                .enqueue_write_image(
                    &mut img_in,
                    CL_BLOCKING,
                    origin.as_ptr(),
                    region_in.as_ptr(),
                    0,
                    0,
                    input.as_ptr() as *mut c_void,
                    &[],
                )
                .map_err(api("clEnqueueWriteImage"))?;
        }

        let input_len = input.len() as cl_int;
        let img_in_mem = img_in.get();
        let img_out_mem = img_out.get();
        let sampler_handle = sampler.get();
        unsafe {
            ExecuteKernel::new(&kernel)
                .set_arg(&img_in_mem)
                .set_arg(&img_out_mem)
                .set_arg(&input_len)
                .set_arg(&sampler_handle)
                .set_arg(&coords_buf)
                .set_global_work_size(1)
                .enqueue_nd_range(&queue)
                .map_err(api("clEnqueueNDRangeKernel"))?;
        }
        queue.finish().map_err(api("clFinish"))?;

        let mut samples = vec![0.0f32; count];
        let mut coords = vec![0.0f32; count];
        let region_out: [usize; 3] = [count, 1, 1];
        unsafe {
            queue
                .enqueue_read_image(
                    &img_out,
                    CL_BLOCKING,
                    origin.as_ptr(),
                    region_out.as_ptr(),
                    0,
                    0,
                    samples.as_mut_ptr() as *mut c_void,
                    &[],
                )
                .map_err(api("clEnqueueReadImage"))?;
            queue
                .enqueue_read_buffer(&coords_buf, CL_BLOCKING, 0, &mut coords, &[])
                .map_err(api("clEnqueueReadBuffer"))?;
        }

        Ok(TrialData { samples, coords })
    }
}

/// Build `source` for every device of `context`, collecting the build log
/// of each device on failure.
fn build_program(context: &Context, source: &str, options: &str) -> Result<Program, TrialError> {
    let mut program =
        Program::create_from_source(context, source).map_err(api("clCreateProgramWithSource"))?;

    if let Err(ClError(code)) = program.build(context.devices(), options) {
        let logs = context
            .devices()
            .iter()
            .map(|&id| {
                let name = Device::new(id).name().unwrap_or_default().trim().to_string();
                let log = program
                    .get_build_log(id)
                    .unwrap_or_else(|e| format!("<build log unavailable: {e}>"));
                BuildLog { device: name, log }
            })
            .collect();
        return Err(TrialError::Build { code: Some(code), logs });
    }
    Ok(program)
}

fn image1d_desc(width: usize) -> cl_image_desc {
    cl_image_desc {
        image_type: CL_MEM_OBJECT_IMAGE1D,
        image_width: width,
        image_height: 0,
        image_depth: 0,
        image_array_size: 0,
        image_row_pitch: 0,
        image_slice_pitch: 0,
        num_mip_levels: 0,
        num_samples: 0,
        buffer: ptr::null_mut(),
    }
}
