// tests/common/mod.rs — A scripted compute runtime for integration tests.
//
// `FakeRuntime` answers inventory queries from a fixed table and "runs" the
// kernel with the CPU reference sampler, so selection, trial and report
// logic can be exercised without any GPU.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use sampler_probe::addressing::AddressingMode;
use sampler_probe::error::{BuildLog, RuntimeError, TrialError};
use sampler_probe::probe::{probe_coordinates, TrialData};
use sampler_probe::runtime::{ComputeRuntime, Description, DeviceFilter, KERNEL_ENTRY_POINT};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeDevice {
    pub platform: usize,
    pub index: usize,
    pub name: String,
    pub gpu: bool,
}

#[derive(Debug, Clone)]
pub struct FakePlatform {
    pub name: String,
    pub version: String,
    pub devices: Vec<FakeDevice>,
    /// GPU-filtered device queries fail on this platform.
    pub broken_gpu_query: bool,
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
    pub platforms: Vec<FakePlatform>,
    /// Trials in these modes fail with an enqueue error.
    pub failing_modes: Vec<AddressingMode>,
    /// `(asked, used)`: a trial in `asked` mode samples as `used` instead.
    pub substitutes: Vec<(AddressingMode, AddressingMode)>,
    /// Drop the last sample of every trial.
    pub short_output: bool,
    /// Modes of every `sample` call, in order.
    pub calls: RefCell<Vec<AddressingMode>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        FakeRuntime::default()
    }

    /// Add a platform with devices `(name, is_gpu)`.
    pub fn platform(mut self, name: &str, version: &str, devices: &[(&str, bool)]) -> Self {
        let p = self.platforms.len();
        let devices = devices
            .iter()
            .enumerate()
            .map(|(index, &(name, gpu))| FakeDevice {
                platform: p,
                index,
                name: name.to_string(),
                gpu,
            })
            .collect();
        self.platforms.push(FakePlatform {
            name: name.to_string(),
            version: version.to_string(),
            devices,
            broken_gpu_query: false,
        });
        self
    }

    /// Make GPU queries on the most recently added platform fail.
    pub fn with_broken_gpu_query(mut self) -> Self {
        if let Some(p) = self.platforms.last_mut() {
            p.broken_gpu_query = true;
        }
        self
    }

    pub fn failing(mut self, mode: AddressingMode) -> Self {
        self.failing_modes.push(mode);
        self
    }

    pub fn substituting(mut self, asked: AddressingMode, used: AddressingMode) -> Self {
        self.substitutes.push((asked, used));
        self
    }

    pub fn device(&self, platform: usize, index: usize) -> FakeDevice {
        self.platforms[platform].devices[index].clone()
    }
}

/// A machine with a CPU-only platform, a platform whose GPU query fails,
/// a platform with two GPUs and an empty platform.
pub fn workstation() -> FakeRuntime {
    FakeRuntime::new()
        .platform("Portable Computing Language", "OpenCL 3.0 PoCL 5.0", &[("cpu-haswell", false)])
        .platform("Broken ICD", "OpenCL 1.2", &[("ghost", true)])
        .with_broken_gpu_query()
        .platform(
            "NVIDIA CUDA",
            "OpenCL 3.0 CUDA 12.4",
            &[("NVIDIA GeForce RTX 3060", true), ("NVIDIA RTX A2000", true)],
        )
        .platform("Empty", "", &[])
}

/// One platform with one GPU.
pub fn single_gpu() -> FakeRuntime {
    FakeRuntime::new().platform("Fake", "1.0", &[("fake gpu0", true)])
}

impl ComputeRuntime for FakeRuntime {
    type Platform = usize;
    type Device = FakeDevice;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn kernel_file(&self) -> &'static str {
        "sampler_test.fake"
    }

    fn platforms(&self) -> Result<Vec<usize>, RuntimeError> {
        Ok((0..self.platforms.len()).collect())
    }

    fn describe_platform(&self, platform: &usize) -> Result<Description, RuntimeError> {
        let p = &self.platforms[*platform];
        Ok(Description { name: p.name.clone(), version: p.version.clone() })
    }

    fn devices(&self, platform: &usize, filter: DeviceFilter) -> Result<Vec<FakeDevice>, RuntimeError> {
        let p = &self.platforms[*platform];
        if filter == DeviceFilter::Gpu && p.broken_gpu_query {
            return Err(RuntimeError::Api { code: -32, what: "clGetDeviceIDs".into() });
        }
        Ok(p.devices
            .iter()
            .filter(|d| filter == DeviceFilter::All || d.gpu)
            .cloned()
            .collect())
    }

    fn describe_device(&self, device: &FakeDevice) -> Result<Description, RuntimeError> {
        Ok(Description { name: device.name.clone(), version: "FakeCL 1.0".into() })
    }

    fn sample(
        &self,
        device: &FakeDevice,
        mode: AddressingMode,
        source: &str,
        input: &[f32],
    ) -> Result<TrialData, TrialError> {
        self.calls.borrow_mut().push(mode);

        if !source.contains(KERNEL_ENTRY_POINT) {
            return Err(TrialError::Build {
                code: Some(-11),
                logs: vec![BuildLog {
                    device: device.name.clone(),
                    log: "error: no kernel named 'sampler_test'\n".into(),
                }],
            });
        }
        if self.failing_modes.contains(&mode) {
            return Err(RuntimeError::Api { code: -5, what: "clEnqueueNDRangeKernel".into() }.into());
        }

        let used = self
            .substitutes
            .iter()
            .find(|(asked, _)| *asked == mode)
            .map_or(mode, |&(_, used)| used);
        let coords = probe_coordinates(input.len());
        let mut samples = used.reference_samples(input, &coords);
        if self.short_output {
            samples.pop();
        }
        Ok(TrialData { samples, coords })
    }
}

/// Write a kernel file into `dir` and return its path.
pub fn write_kernel(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

pub const GOOD_KERNEL: &str = "__kernel void sampler_test(__read_only image1d_t img_in) {}\n";
pub const BROKEN_KERNEL: &str = "__kernel void broken( {\n";
