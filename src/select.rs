// select.rs — Choosing the device the trials run on.
//
// Three entry points, all generic over the runtime and over the streams so
// the prompt loop can be driven from tests:
//
//   select_device(.., Some(p), Some(d), ..)  direct lookup, no output
//   select_device(.., None, None, ..)        list + prompt for platform, then device
//   select_first_gpu(..)                     first platform that reports a GPU
//
// A selection failure is final: the caller is expected to stop before any
// trial runs.

use std::io::{self, BufRead, Write};

use crate::error::{RuntimeError, SelectError};
use crate::runtime::{ComputeRuntime, Description, DeviceFilter};

/// Pick a device, either by explicit indices or interactively.
///
/// With both indices present the enumerated lists are indexed directly and
/// nothing is read or written. Otherwise platforms are listed and the user
/// is prompted on `input` until a valid index is entered, then the same is
/// done for the devices (all types) of the chosen platform.
pub fn select_device<R, I, O>(
    runtime: &R,
    platform_index: Option<usize>,
    device_index: Option<usize>,
    input: &mut I,
    out: &mut O,
) -> Result<R::Device, SelectError>
where
    R: ComputeRuntime,
    I: BufRead,
    O: Write,
{
    let platforms = runtime.platforms()?;

    if let (Some(p), Some(d)) = (platform_index, device_index) {
        return select_by_index(runtime, &platforms, p, d);
    }

    if platforms.is_empty() {
        return Err(SelectError::NoPlatforms);
    }

    writeln!(out, "Platforms")?;
    for (i, platform) in platforms.iter().enumerate() {
        writeln!(out, "\t{i}: {}", runtime.describe_platform(platform)?)?;
    }
    let p = prompt_index("platform", platforms.len(), input, out)?;

    let platform = &platforms[p];
    let platform_name = runtime.describe_platform(platform)?.name;
    let mut devices = runtime.devices(platform, DeviceFilter::All)?;
    if devices.is_empty() {
        return Err(SelectError::NoDevices { platform: platform_name });
    }

    writeln!(out, "Devices on platform {platform_name}")?;
    for (i, device) in devices.iter().enumerate() {
        writeln!(out, "\t{i}: {}", runtime.describe_device(device)?)?;
    }
    let d = prompt_index("device", devices.len(), input, out)?;

    log::info!("{}: using device {d} on platform {p}", runtime.name());
    Ok(devices.swap_remove(d))
}

fn select_by_index<R: ComputeRuntime>(
    runtime: &R,
    platforms: &[R::Platform],
    p: usize,
    d: usize,
) -> Result<R::Device, SelectError> {
    let platform = platforms.get(p).ok_or(SelectError::PlatformOutOfRange {
        index: p,
        count: platforms.len(),
    })?;
    let mut devices = runtime.devices(platform, DeviceFilter::All)?;
    if d >= devices.len() {
        return Err(SelectError::DeviceOutOfRange {
            index: d,
            count: devices.len(),
            platform: runtime.describe_platform(platform)?.name,
        });
    }
    Ok(devices.swap_remove(d))
}

/// Prompt `Choose <what>: ` until a line holding an index in `[0, count)`
/// is read.
///
/// Lines that are not a non-negative integer, are out of range, or are not
/// valid UTF-8 print `Invalid <what>, choose again.` and prompt again. End
/// of input is an error, since no further line can ever become valid.
pub fn prompt_index<I: BufRead, O: Write>(
    what: &'static str,
    count: usize,
    input: &mut I,
    out: &mut O,
) -> Result<usize, SelectError> {
    let mut line = String::new();
    loop {
        write!(out, "Choose {what}: ")?;
        out.flush()?;

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => return Err(SelectError::InputClosed { what }),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                // read_line leaves the offending bytes consumed.
                line.clear();
            }
            Err(e) => return Err(e.into()),
        }

        match line.trim().parse::<usize>() {
            Ok(i) if i < count => return Ok(i),
            _ => writeln!(out, "Invalid {what}, choose again.")?,
        }
    }
}

/// Pick the first GPU of the first platform that reports one.
///
/// Platforms are visited in enumeration order. A platform whose GPU query
/// (or description) fails is skipped. When a platform reports several GPUs
/// the first is used.
pub fn select_first_gpu<R, O>(runtime: &R, out: &mut O) -> Result<R::Device, SelectError>
where
    R: ComputeRuntime,
    O: Write,
{
    for platform in runtime.platforms()? {
        match first_gpu_on(runtime, &platform) {
            Ok(Some((device, platform_desc, device_desc))) => {
                writeln!(out, "Used platform: {platform_desc}")?;
                writeln!(out, "Used device: {device_desc}")?;
                return Ok(device);
            }
            Ok(None) => {}
            Err(err) => log::debug!("{}: skipping platform: {err}", runtime.name()),
        }
    }
    Err(SelectError::NoGpu)
}

fn first_gpu_on<R: ComputeRuntime>(
    runtime: &R,
    platform: &R::Platform,
) -> Result<Option<(R::Device, Description, Description)>, RuntimeError> {
    let mut gpus = runtime.devices(platform, DeviceFilter::Gpu)?;
    if gpus.is_empty() {
        return Ok(None);
    }
    let platform_desc = runtime.describe_platform(platform)?;
    if gpus.len() > 1 {
        log::info!(
            "{}: platform {} has {} GPUs, using the first",
            runtime.name(),
            platform_desc.name,
            gpus.len()
        );
    }
    let device = gpus.swap_remove(0);
    let device_desc = runtime.describe_device(&device)?;
    Ok(Some((device, platform_desc, device_desc)))
}
