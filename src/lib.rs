// sampler-probe: prints how a compute runtime's image sampler resolves
// out-of-range coordinates under each addressing mode.
//
// A 1-D image of ten samples is probed at 21 normalized coordinates that
// straddle the image on both sides, once per addressing mode, and the device
// results are tabulated next to each other. A CPU model of the same sampler
// (`addressing`) is the reference every device column is checked against.

pub mod addressing;
pub mod error;
pub mod probe;
pub mod report;
pub mod runtime;
pub mod select;
pub mod trial;

pub mod gpu;

#[cfg(feature = "opencl")]
pub mod opencl;
