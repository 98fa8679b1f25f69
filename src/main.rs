// main.rs — sampler-probe command line.
//
//   sampler-probe                           list + prompt, wgpu
//   sampler-probe --first-gpu               first GPU, no prompt
//   sampler-probe --platform 0 --device 1   explicit, no prompt
//   sampler-probe --backend opencl          OpenCL (feature `opencl`)
//
// Exit status is 0 whenever the table was printed, failed trials included.
// A device-selection failure exits non-zero before any trial runs.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};

use sampler_probe::gpu::WgpuRuntime;
use sampler_probe::report::SamplerReport;
use sampler_probe::runtime::ComputeRuntime;
use sampler_probe::select::{select_device, select_first_gpu};
use sampler_probe::trial::SamplingTrial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Wgpu,
    Opencl,
}

/// Print how a compute device's image sampler resolves out-of-range
/// coordinates under each addressing mode.
#[derive(Debug, Parser)]
#[command(name = "sampler-probe", version, about)]
struct Cli {
    /// Compute runtime to probe.
    #[arg(long, value_enum, default_value_t = Backend::Wgpu)]
    backend: Backend,

    /// Platform index (skips the prompt; needs --device).
    #[arg(long, requires = "device")]
    platform: Option<usize>,

    /// Device index on the platform (skips the prompt; needs --platform).
    #[arg(long, requires = "platform")]
    device: Option<usize>,

    /// Use the first GPU of the first platform that has one.
    #[arg(long, conflicts_with_all = ["platform", "device"])]
    first_gpu: bool,

    /// Kernel source file [default: sampler_test.wgsl or sampler_test.cl].
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Options for clBuildProgram (OpenCL only).
    #[arg(long)]
    build_options: Option<String>,

    /// Do not compare the results against the CPU reference sampler.
    #[arg(long)]
    no_check: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.backend {
        Backend::Wgpu => {
            if cli.build_options.is_some() {
                log::warn!("--build-options only applies to the OpenCL backend, ignoring");
            }
            probe(&WgpuRuntime::new(), &cli)
        }
        Backend::Opencl => probe_opencl(&cli),
    }
}

#[cfg(feature = "opencl")]
fn probe_opencl(cli: &Cli) -> anyhow::Result<()> {
    let mut runtime = sampler_probe::opencl::OpenClRuntime::new();
    if let Some(options) = &cli.build_options {
        runtime = runtime.with_build_options(options.clone());
    }
    probe(&runtime, cli)
}

#[cfg(not(feature = "opencl"))]
fn probe_opencl(_cli: &Cli) -> anyhow::Result<()> {
    anyhow::bail!("this build has no OpenCL support; rebuild with `--features opencl`")
}

/// Select a device, run all four trials on it and print the report.
fn probe<R: ComputeRuntime>(runtime: &R, cli: &Cli) -> anyhow::Result<()> {
    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();

    let device = if cli.first_gpu {
        select_first_gpu(runtime, &mut out)
    } else {
        select_device(runtime, cli.platform, cli.device, &mut input, &mut out)
    }
    .with_context(|| format!("{}: no device selected", runtime.name()))?;
    log::info!("{}: probing {device:?}", runtime.name());

    let trial = match &cli.kernel {
        Some(path) => SamplingTrial::new(path),
        None => SamplingTrial::for_runtime(runtime),
    };

    let report = SamplerReport::collect(runtime, &device, &trial, &mut out)?;
    report.render(&mut out)?;
    if !cli.no_check {
        writeln!(out)?;
        report.render_checks(&mut out)?;
    }
    out.flush()?;
    Ok(())
}
