// addressing.rs — Sampler addressing modes and their CPU reference model.
//
// The device sampler is always configured with normalized coordinates and
// nearest filtering. For an image of `len` texels and a normalized
// coordinate `u`, the texel a read resolves to is:
//
//   CLAMP_TO_EDGE    i = clamp(floor(u * len), 0, len - 1)
//   CLAMP            i = floor(u * len); outside [0, len) reads the border
//   REPEAT           i = floor((u - floor(u)) * len), folded back into [0, len)
//   MIRRORED_REPEAT  s = |u - 2 * rint(u / 2)|; i = min(floor(s * len), len - 1)
//
// These are the OpenCL C formulas for `read_imagef` with CLK_FILTER_NEAREST.
// Vulkan, Metal and D3D address modes agree with them at texel centres, and
// every probe in this crate sits on a texel centre, so one model serves both
// runtimes.
//
// The border colour for a single-channel float image is (0, 0, 0, 1), so a
// CLAMP read outside the image returns 0 in the red channel.

use std::fmt;

/// Value a CLAMP read returns outside the image (red channel of the border colour).
pub const BORDER_VALUE: f32 = 0.0;

/// How a sampler maps coordinates outside `[0, 1)` back onto the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Reflect at every image edge: ..., 1 0 | 0 1 ... n-1 | n-1 n-2, ...
    MirroredRepeat,
    /// Tile the image: ..., n-2 n-1 | 0 1 ... n-1 | 0 1, ...
    Repeat,
    /// Extend the first and last texel outwards.
    ClampToEdge,
    /// Everything outside the image reads the border colour.
    Clamp,
}

impl AddressingMode {
    /// Report column order.
    pub const ALL: [AddressingMode; 4] = [
        AddressingMode::MirroredRepeat,
        AddressingMode::Repeat,
        AddressingMode::ClampToEdge,
        AddressingMode::Clamp,
    ];

    /// Column label used in the report header.
    pub fn label(self) -> &'static str {
        match self {
            AddressingMode::MirroredRepeat => "MIRRORED_REPEAT",
            AddressingMode::Repeat => "REPEAT",
            AddressingMode::ClampToEdge => "CLAMP_TO_EDGE",
            AddressingMode::Clamp => "CLAMP",
        }
    }

    /// Resolve a normalized coordinate to a texel index.
    ///
    /// Returns `None` when the read hits the border (CLAMP outside the
    /// image, or any read from an empty image).
    pub fn map_texel(self, u: f32, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let w = len as f32;
        let last = len as isize - 1;

        match self {
            AddressingMode::ClampToEdge => {
                let i = (u * w).floor() as isize;
                Some(i.clamp(0, last) as usize)
            }
            AddressingMode::Clamp => {
                let i = (u * w).floor() as isize;
                if i < 0 || i > last {
                    None
                } else {
                    Some(i as usize)
                }
            }
            AddressingMode::Repeat => {
                let x = (u - u.floor()) * w;
                let mut i = x.floor() as isize;
                // (u - floor(u)) can round up to exactly 1.0.
                if i > last {
                    i -= len as isize;
                }
                Some(i.max(0) as usize)
            }
            AddressingMode::MirroredRepeat => {
                let s = (u - 2.0 * (0.5 * u).round_ties_even()).abs();
                let i = (s * w).floor() as isize;
                Some(i.clamp(0, last) as usize)
            }
        }
    }

    /// Nearest-filter read of `data` at normalized coordinate `u`.
    pub fn sample_nearest(self, data: &[f32], u: f32) -> f32 {
        match self.map_texel(u, data.len()) {
            Some(i) => data[i],
            None => BORDER_VALUE,
        }
    }

    /// What a conforming sampler returns at each of `coords`.
    pub fn reference_samples(self, data: &[f32], coords: &[f32]) -> Vec<f32> {
        coords.iter().map(|&u| self.sample_nearest(data, u)).collect()
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
