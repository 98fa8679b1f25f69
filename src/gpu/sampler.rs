// gpu/sampler.rs — One sampling trial on a wgpu adapter.
//
// Mirrors the OpenCL flow step for step:
//
//   request device      (clCreateContext + clCreateCommandQueue)
//   compile kernel      (clCreateProgramWithSource + clBuildProgram)
//   upload input        (clCreateImage + clEnqueueWriteImage)
//   create sampler      (clCreateSampler, normalized + nearest)
//   dispatch 1×1×1      (clEnqueueNDRangeKernel, global size 1)
//   read back           (clEnqueueReadImage + clEnqueueReadBuffer)
//
// Every object is created and dropped inside `run`. Nothing is cached
// between trials, so each trial recompiles the kernel from source.
//
//
// BINDINGS
// ────────
// The kernel's @group(0) bindings follow the argument order of the OpenCL
// kernel, with the sampler as a separate binding:
//
//   0  img_in   texture_2d<f32>                  N×1, R32Float
//   1  img_out  texture_storage_1d<r32float, write>  2N+1
//   2  params   uniform Params { input_len: i32 }
//   3  samp     sampler (non-filtering)
//   4  coords   storage array<f32>                2N+1
//
// WGSL cannot call `textureSampleLevel` on a 1D texture, so the input is a
// one-row 2D texture sampled at v = 0.5 with v clamped to edge.
//
//
// ERROR CAPTURE
// ─────────────
// wgpu reports validation failures through error scopes instead of return
// values, and panics on anything uncaptured. Two scopes are used:
//
//   build scope    shader module + compute pipeline   → TrialError::Build
//   runtime scope  everything else up to submission   → RuntimeError
//
// An uncaptured-error handler that only logs is installed as well, so a
// failure outside both scopes cannot abort the process.
//
//
// BORDER ADDRESSING
// ─────────────────
// CLAMP maps to `AddressMode::ClampToBorder`, which is an optional feature
// (`ADDRESS_MODE_CLAMP_TO_BORDER`). Adapters without it fail the CLAMP
// trial with `RuntimeError::Unsupported`; the other three modes still run.

use wgpu::util::DeviceExt;

use crate::addressing::AddressingMode;
use crate::error::{BuildLog, RuntimeError, TrialError};
use crate::gpu::device::WgpuDevice;
use crate::probe::TrialData;
use crate::runtime::KERNEL_ENTRY_POINT;

/// Bytes per R32Float texel and per f32 coordinate.
const F32_BYTES: u32 = 4;

// ---------------------------------------------------------------------------
// Kernel params uniform (must match WGSL struct layout exactly)
// ---------------------------------------------------------------------------

/// Layout must match `Params` in `sampler_test.wgsl`:
///   offset  0: input_len (i32)
///   offset  4: _pad      (3 × i32)
///   total:  16 bytes (uniform structs are padded to 16)
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SamplerParams {
    input_len: i32,
    _pad: [i32; 3],
}

// ---------------------------------------------------------------------------
// Addressing mode → wgpu sampler state
// ---------------------------------------------------------------------------

pub(crate) fn address_mode(mode: AddressingMode) -> wgpu::AddressMode {
    match mode {
        AddressingMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        AddressingMode::Repeat => wgpu::AddressMode::Repeat,
        AddressingMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressingMode::Clamp => wgpu::AddressMode::ClampToBorder,
    }
}

/// Device features a sampler in `mode` needs.
pub(crate) fn required_features(mode: AddressingMode) -> wgpu::Features {
    match mode {
        AddressingMode::Clamp => wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER,
        _ => wgpu::Features::empty(),
    }
}

fn sampler_descriptor(mode: AddressingMode) -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("sampler_test sampler"),
        address_mode_u: address_mode(mode),
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        // Red channel of transparent black is 0, matching the OpenCL
        // border colour for a single-channel image.
        border_color: match mode {
            AddressingMode::Clamp => Some(wgpu::SamplerBorderColor::TransparentBlack),
            _ => None,
        },
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Trial
// ---------------------------------------------------------------------------

/// Compile `source` on `gpu`, sample `input` in `mode` and download the
/// results.
pub(crate) fn run(
    gpu: &WgpuDevice,
    mode: AddressingMode,
    source: &str,
    input: &[f32],
) -> Result<TrialData, TrialError> {
    let features = required_features(mode);
    if !gpu.adapter.features().contains(features) {
        return Err(RuntimeError::Unsupported(format!(
            "{} does not support {mode} addressing (missing {features:?})",
            gpu.info.name
        ))
        .into());
    }

    let adapter_limits = gpu.adapter.limits();
    let (input_len, count) = texture_extents(input.len(), &adapter_limits).ok_or_else(|| {
        RuntimeError::Unsupported(format!(
            "{} input texels do not fit the texture limits of {}",
            input.len(),
            gpu.info.name
        ))
    })?;

    let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits);
    let (device, queue): (wgpu::Device, wgpu::Queue) = pollster::block_on(
        gpu.adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sampler-probe"),
                required_features: features,
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ),
    )
    .map_err(|e| RuntimeError::Validation(format!("device request failed: {e}")))?;

    device.on_uncaptured_error(Box::new(|e| log::error!("wgpu: uncaptured error: {e}")));

    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = dispatch(&device, &queue, gpu, mode, source, input, input_len);
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    let readback = result?;
    if let Some(e) = validation.or(out_of_memory) {
        return Err(RuntimeError::Validation(e.to_string()).into());
    }

    let samples = read_f32s(&device, &readback.samples, count as usize)?;
    let coords = read_f32s(&device, &readback.coords, count as usize)?;
    Ok(TrialData { samples, coords })
}

/// Input and output texture widths, or `None` when the input length does
/// not fit the `i32` uniform, the output length overflows `u32`, or either
/// exceeds the adapter's texture limits.
fn texture_extents(input_len: usize, limits: &wgpu::Limits) -> Option<(u32, u32)> {
    let width = u32::try_from(i32::try_from(input_len).ok()?).ok()?;
    let count = u32::try_from(input_len.checked_mul(2)?.checked_add(1)?).ok()?;
    (width <= limits.max_texture_dimension_2d && count <= limits.max_texture_dimension_1d)
        .then_some((width, count))
}

/// Readback buffers filled by a submitted trial.
struct Readback {
    samples: wgpu::Buffer,
    coords: wgpu::Buffer,
}

fn dispatch(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    gpu: &WgpuDevice,
    mode: AddressingMode,
    source: &str,
    input: &[f32],
    input_len: u32,
) -> Result<Readback, TrialError> {
    let count = 2 * input_len + 1;

    // Bind group layout: mirrors the @group(0) bindings of the kernel.
    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("sampler_test BGL"),
        entries: &[
            // Binding 0 — input image (read through the sampler)
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            },
            // Binding 1 — output image (storage write)
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::R32Float,
                    view_dimension: wgpu::TextureViewDimension::D1,
                },
                count: None,
            },
            // Binding 2 — params uniform
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Binding 3 — sampler under test
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                count: None,
            },
            // Binding 4 — coordinates the kernel sampled at
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let pipeline = build_pipeline(device, gpu, &bgl, source)?;

    // --- Input image: N×1 R32Float ---
    let input_extent = wgpu::Extent3d { width: input_len, height: 1, depth_or_array_layers: 1 };
    let input_tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sampler_test input"),
        size: input_extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &input_tex,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(input),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(input_len * F32_BYTES),
            rows_per_image: Some(1),
        },
        input_extent,
    );

    // --- Output image: 2N+1 texels, 1D ---
    let output_extent = wgpu::Extent3d { width: count, height: 1, depth_or_array_layers: 1 };
    let output_tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sampler_test output"),
        size: output_extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D1,
        format: wgpu::TextureFormat::R32Float,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    // `texture_extents` bounds input_len by i32::MAX.
    let params = SamplerParams { input_len: input_len as i32, _pad: [0; 3] };
    let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("SamplerParams"),
        contents: bytemuck::bytes_of(&params),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let sampler = device.create_sampler(&sampler_descriptor(mode));

    let coords_size = (count * F32_BYTES) as u64;
    let coords_buf = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sampler_test coords"),
        size: coords_size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let input_view = input_tex.create_view(&wgpu::TextureViewDescriptor::default());
    let output_view = output_tex.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sampler_test bind group"),
        layout: &bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&input_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&output_view),
            },
            wgpu::BindGroupEntry { binding: 2, resource: params_buf.as_entire_binding() },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
            wgpu::BindGroupEntry { binding: 4, resource: coords_buf.as_entire_binding() },
        ],
    });

    // --- Readback buffers ---
    let aligned_bytes_per_row = align_to(count * F32_BYTES, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let samples_readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sampler_test samples readback"),
        size: aligned_bytes_per_row as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let coords_readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sampler_test coords readback"),
        size: coords_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("sampler_test"),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(KERNEL_ENTRY_POINT),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        // A single invocation walks all probes.
        pass.dispatch_workgroups(1, 1, 1);
    }
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &output_tex,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &samples_readback,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(aligned_bytes_per_row),
                rows_per_image: Some(1),
            },
        },
        output_extent,
    );
    encoder.copy_buffer_to_buffer(&coords_buf, 0, &coords_readback, 0, coords_size);
    queue.submit(std::iter::once(encoder.finish()));

    Ok(Readback { samples: samples_readback, coords: coords_readback })
}

/// Compile the kernel and create its compute pipeline inside a dedicated
/// error scope, so compiler diagnostics surface as a build failure.
fn build_pipeline(
    device: &wgpu::Device,
    gpu: &WgpuDevice,
    bgl: &wgpu::BindGroupLayout,
    source: &str,
) -> Result<wgpu::ComputePipeline, TrialError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sampler_test.wgsl"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("sampler_test pipeline layout"),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(KERNEL_ENTRY_POINT),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: KERNEL_ENTRY_POINT,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(pipeline),
        Some(e) => Err(TrialError::Build {
            code: None,
            logs: vec![BuildLog { device: gpu.info.name.clone(), log: e.to_string() }],
        }),
    }
}

// ---------------------------------------------------------------------------
// Readback
// ---------------------------------------------------------------------------

/// Map `buffer` and decode its first `count` little-endian f32 values.
///
/// Blocks until the GPU has finished every submitted command.
fn read_f32s(device: &wgpu::Device, buffer: &wgpu::Buffer, count: usize) -> Result<Vec<f32>, RuntimeError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver only goes away if the caller already gave up.
        let _ = sender.send(result);
    });

    device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|_| RuntimeError::Validation("readback map callback never fired".into()))?
        .map_err(|e| RuntimeError::Validation(format!("readback map failed: {e}")))?;

    let mapped = slice.get_mapped_range();
    let values = decode_f32s(&mapped, count);
    drop(mapped);
    buffer.unmap();
    Ok(values)
}

/// Decode up to `count` little-endian f32 values from `bytes`.
fn decode_f32s(bytes: &[u8], count: usize) -> Vec<f32> {
    bytes
        .chunks_exact(F32_BYTES as usize)
        .take(count)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Round `value` up to the next multiple of `alignment`.
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) / alignment * alignment
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
