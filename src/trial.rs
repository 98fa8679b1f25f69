// trial.rs — One sampling trial: read the kernel, run it, check the result.
//
// `SamplingTrial::run` is the typed form: it returns the downloaded data or
// a `TrialError` saying why there is none.
//
// `SamplingTrial::run_into` is the form the report uses. It never fails on
// a runtime problem: the diagnostic is written to `out`, the coordinate
// vector is left as it was, and the returned sample vector is empty. Only a
// failure to write the diagnostic itself is returned as an error.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::addressing::AddressingMode;
use crate::error::{RuntimeError, TrialError};
use crate::probe::{output_len, TrialData, INPUT_SAMPLES};
use crate::runtime::ComputeRuntime;

/// Kernel file and input image shared by every trial of a report.
#[derive(Debug, Clone)]
pub struct SamplingTrial {
    kernel_path: PathBuf,
    input: Vec<f32>,
}

impl SamplingTrial {
    /// Trial reading its kernel from `kernel_path`, sampling `INPUT_SAMPLES`.
    pub fn new(kernel_path: impl Into<PathBuf>) -> Self {
        SamplingTrial {
            kernel_path: kernel_path.into(),
            input: INPUT_SAMPLES.to_vec(),
        }
    }

    /// Trial reading the runtime's default kernel file from the working
    /// directory.
    pub fn for_runtime<R: ComputeRuntime>(runtime: &R) -> Self {
        Self::new(runtime.kernel_file())
    }

    /// Replace the input image.
    pub fn with_input(mut self, input: Vec<f32>) -> Self {
        self.input = input;
        self
    }

    pub fn input(&self) -> &[f32] {
        &self.input
    }

    pub fn kernel_path(&self) -> &Path {
        &self.kernel_path
    }

    /// Run the kernel once on `device` with a sampler in `mode`.
    ///
    /// The kernel source is re-read on every call.
    pub fn run<R: ComputeRuntime>(
        &self,
        runtime: &R,
        device: &R::Device,
        mode: AddressingMode,
    ) -> Result<TrialData, TrialError> {
        let source = fs::read_to_string(&self.kernel_path).map_err(|source| TrialError::Source {
            path: self.kernel_path.clone(),
            source,
        })?;

        log::debug!(
            "{}: {mode} trial, kernel {} ({} bytes), {} inputs",
            runtime.name(),
            self.kernel_path.display(),
            source.len(),
            self.input.len()
        );

        let data = runtime.sample(device, mode, &source, &self.input)?;

        let expected = output_len(self.input.len());
        if data.samples.len() != expected || data.coords.len() != expected {
            return Err(RuntimeError::Validation(format!(
                "kernel produced {} samples and {} coordinates, expected {expected} of each",
                data.samples.len(),
                data.coords.len()
            ))
            .into());
        }
        Ok(data)
    }

    /// Run a trial, replacing `coords` with the coordinates it used.
    ///
    /// On failure the diagnostic goes to `out`, `coords` is untouched and
    /// the returned samples are empty.
    pub fn run_into<R: ComputeRuntime, O: Write>(
        &self,
        runtime: &R,
        device: &R::Device,
        mode: AddressingMode,
        coords: &mut Vec<f32>,
        out: &mut O,
    ) -> io::Result<Vec<f32>> {
        match self.run(runtime, device, mode) {
            Ok(data) => {
                *coords = data.coords;
                Ok(data.samples)
            }
            Err(err) => {
                log::warn!("{}: {mode} trial failed: {err}", runtime.name());
                write_diagnostic(&err, out)?;
                Ok(Vec::new())
            }
        }
    }
}

/// Print a failed trial the way an engineer reads it at the console.
///
/// Build failures are followed by each device's compiler log.
pub fn write_diagnostic<O: Write>(err: &TrialError, out: &mut O) -> io::Result<()> {
    match err {
        TrialError::Build { logs, .. } => {
            writeln!(out, "{err}, build info:")?;
            for entry in logs {
                writeln!(out, "{}:", entry.device)?;
                writeln!(out, "{}", entry.log.trim_end())?;
            }
            Ok(())
        }
        _ => writeln!(out, "{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildLog;

    #[test]
    fn new_trial_uses_the_fixed_input() {
        let trial = SamplingTrial::new("sampler_test.cl");
        assert_eq!(trial.input(), &INPUT_SAMPLES);
        assert_eq!(trial.kernel_path(), Path::new("sampler_test.cl"));
    }

    #[test]
    fn build_diagnostic_lists_every_device_log() {
        let err = TrialError::Build {
            code: Some(-11),
            logs: vec![
                BuildLog { device: "gpu0".into(), log: "error: expected ';'\n\n".into() },
                BuildLog { device: "gpu1".into(), log: "error: expected ';'".into() },
            ],
        };
        let mut out = Vec::new();
        write_diagnostic(&err, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "kernel build failed (-11), build info:\n\
             gpu0:\nerror: expected ';'\n\
             gpu1:\nerror: expected ';'\n"
        );
    }

    #[test]
    fn runtime_diagnostic_shows_code() {
        let err: TrialError = RuntimeError::Api {
            code: -5,
            what: "clEnqueueNDRangeKernel".into(),
        }
        .into();
        let mut out = Vec::new();
        write_diagnostic(&err, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "clEnqueueNDRangeKernel (-5)\n");
    }

    #[test]
    fn missing_kernel_file_is_a_source_error() {
        struct Unreachable;
        impl ComputeRuntime for Unreachable {
            type Platform = ();
            type Device = ();
            fn name(&self) -> &'static str {
                "none"
            }
            fn kernel_file(&self) -> &'static str {
                "does-not-exist.cl"
            }
            fn platforms(&self) -> Result<Vec<()>, RuntimeError> {
                Ok(vec![])
            }
            fn describe_platform(&self, _: &()) -> Result<crate::runtime::Description, RuntimeError> {
                unreachable!()
            }
            fn devices(
                &self,
                _: &(),
                _: crate::runtime::DeviceFilter,
            ) -> Result<Vec<()>, RuntimeError> {
                unreachable!()
            }
            fn describe_device(&self, _: &()) -> Result<crate::runtime::Description, RuntimeError> {
                unreachable!()
            }
            fn sample(
                &self,
                _: &(),
                _: AddressingMode,
                _: &str,
                _: &[f32],
            ) -> Result<TrialData, TrialError> {
                unreachable!("kernel file does not exist")
            }
        }

        let trial = SamplingTrial::for_runtime(&Unreachable);
        let err = trial.run(&Unreachable, &(), AddressingMode::Repeat).unwrap_err();
        assert!(matches!(err, TrialError::Source { .. }), "{err:?}");

        let mut coords = vec![0.5];
        let mut out = Vec::new();
        let samples = trial
            .run_into(&Unreachable, &(), AddressingMode::Repeat, &mut coords, &mut out)
            .unwrap();
        assert!(samples.is_empty());
        assert_eq!(coords, vec![0.5]);
        assert!(String::from_utf8(out).unwrap().starts_with("cannot read kernel source"));
    }
}
