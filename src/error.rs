// error.rs — Error types shared by the selector, the trial runner and the
// runtimes.
//
// Three layers:
//   RuntimeError — a single failed call into the compute runtime.
//   TrialError   — why one sampling trial produced no data. Caught at the
//                  trial boundary and turned into a printed diagnostic.
//   SelectError  — why no device could be chosen. Fatal for the process.

use std::io;
use std::path::PathBuf;

/// A failed call into the compute runtime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// An API call returned an error status (OpenCL `cl_int` codes).
    #[error("{what} ({code})")]
    Api { code: i32, what: String },
    /// The runtime rejected an operation without a numeric status
    /// (wgpu validation and out-of-memory errors).
    #[error("{0}")]
    Validation(String),
    /// The device cannot run the trial at all, e.g. a missing optional
    /// feature.
    #[error("{0}")]
    Unsupported(String),
}

impl RuntimeError {
    /// Numeric status reported by the runtime, if it has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            RuntimeError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Compiler output for one device of a failed build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildLog {
    pub device: String,
    pub log: String,
}

/// Why a sampling trial returned no data.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error("cannot read kernel source {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The kernel failed to compile. `logs` holds one entry per device the
    /// program was built for.
    #[error("kernel build failed{}", .code.map(|c| format!(" ({c})")).unwrap_or_default())]
    Build { code: Option<i32>, logs: Vec<BuildLog> },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Why no device could be selected.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("no compute platforms found")]
    NoPlatforms,
    #[error("platform {platform} has no devices")]
    NoDevices { platform: String },
    #[error("platform index {index} out of range ({count} platforms)")]
    PlatformOutOfRange { index: usize, count: usize },
    #[error("device index {index} out of range ({count} devices on {platform})")]
    DeviceOutOfRange {
        index: usize,
        count: usize,
        platform: String,
    },
    #[error("no GPU device found")]
    NoGpu,
    #[error("input closed before a valid {what} index was entered")]
    InputClosed { what: &'static str },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
