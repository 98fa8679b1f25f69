// probe.rs — The fixed input image and the coordinates it is probed at.
//
// PROBE LAYOUT
// ────────────
// An input of N texels is read at 2N + 1 normalized coordinates
//
//   u_i = ((i - N/2) + 0.5) / N        i = 0 ..= 2N,  N/2 rounded down
//
// i.e. at consecutive texel centres starting N/2 texels left of the image.
// For N = 10:
//
//   texel   -5 -4 -3 -2 -1 | 0 1 ... 9 | 10 11 12 13 14 15
//   u     -0.45      -0.05 | 0.05  0.95 | 1.05          1.55
//
// Texel centres keep every probe clear of the texel boundaries, where
// `floor(u * N)` would depend on the last bit of the coordinate.
//
// The kernels compute the same formula on the device and write the value
// they used next to each sample. `probe_coordinates` is the host copy used
// by the reference check and the tests.

/// The image every trial uploads: 1, 2, ..., 10.
pub const INPUT_SAMPLES: [f32; 10] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];

/// Number of probes (and output texels) for an input of `input_len` texels.
pub fn output_len(input_len: usize) -> usize {
    2 * input_len + 1
}

/// Normalized coordinate of probe `i` for an input of `input_len` texels.
pub fn probe_coordinate(i: usize, input_len: usize) -> f32 {
    let offset = i as i64 - (input_len / 2) as i64;
    (offset as f32 + 0.5) / input_len as f32
}

/// All probe coordinates for an input of `input_len` texels, in output order.
pub fn probe_coordinates(input_len: usize) -> Vec<f32> {
    (0..output_len(input_len))
        .map(|i| probe_coordinate(i, input_len))
        .collect()
}

/// Samples and coordinates downloaded from one successful trial.
///
/// `samples[i]` was read at `coords[i]`. Both always have
/// `output_len(input.len())` entries; runtimes reject anything else before
/// a `TrialData` is built.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialData {
    pub samples: Vec<f32>,
    pub coords: Vec<f32>,
}
