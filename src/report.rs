// report.rs — Run every addressing mode and print the comparison table.
//
//   coords | MIRRORED_REPEAT | REPEAT | CLAMP_TO_EDGE | CLAMP
// ---------|-----------------|--------|---------------|------
// -0.45000 |               5 |      6 |             1 |     0
// ...
//
// The four trials share one coordinate vector. Each successful trial
// overwrites it, so the table shows the coordinates of the last successful
// mode; all modes run the same kernel and therefore use the same probes.
//
// A failed trial leaves an empty column. Its cells print as `-` rather than
// shifting or truncating the other columns.
//
// After the table, `render_checks` compares every column against the CPU
// reference sampler (`addressing`) at the coordinates the device reported.

use std::io::{self, Write};

use crate::addressing::AddressingMode;
use crate::runtime::ComputeRuntime;
use crate::trial::SamplingTrial;

/// Width of the coordinate column: "-0.45000".
const COORD_WIDTH: usize = 8;

/// Samples of one addressing mode, empty if its trial failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeColumn {
    pub mode: AddressingMode,
    pub samples: Vec<f32>,
}

/// Results of one run over all four addressing modes.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerReport {
    /// Image the trials sampled.
    pub input: Vec<f32>,
    /// Coordinates reported by the last successful trial.
    pub coords: Vec<f32>,
    /// One column per mode, in `AddressingMode::ALL` order.
    pub columns: Vec<ModeColumn>,
}

/// One device sample that disagrees with the reference sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub index: usize,
    pub coord: f32,
    pub got: f32,
    pub want: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The trial failed; nothing to compare.
    Skipped,
    Checked { compared: usize, mismatches: Vec<Mismatch> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeCheck {
    pub mode: AddressingMode,
    pub verdict: Verdict,
}

impl ModeCheck {
    /// True when the column was compared and every sample matched.
    pub fn passed(&self) -> bool {
        matches!(&self.verdict, Verdict::Checked { mismatches, .. } if mismatches.is_empty())
    }
}

impl SamplerReport {
    /// Run one trial per addressing mode on `device`, in report order.
    ///
    /// Diagnostics of failed trials are written to `out` as they happen.
    pub fn collect<R: ComputeRuntime, O: Write>(
        runtime: &R,
        device: &R::Device,
        trial: &SamplingTrial,
        out: &mut O,
    ) -> io::Result<Self> {
        let mut coords = Vec::new();
        let mut columns = Vec::with_capacity(AddressingMode::ALL.len());
        for mode in AddressingMode::ALL {
            let samples = trial.run_into(runtime, device, mode, &mut coords, out)?;
            columns.push(ModeColumn { mode, samples });
        }
        Ok(SamplerReport {
            input: trial.input().to_vec(),
            coords,
            columns,
        })
    }

    /// Print the comparison table.
    pub fn render<O: Write>(&self, out: &mut O) -> io::Result<()> {
        write!(out, "{:>COORD_WIDTH$}", "coords")?;
        for column in &self.columns {
            write!(out, " | {}", column.mode.label())?;
        }
        writeln!(out)?;

        write!(out, "{}", "-".repeat(COORD_WIDTH))?;
        for column in &self.columns {
            write!(out, "-|-{}", "-".repeat(column.mode.label().len()))?;
        }
        writeln!(out)?;

        for (i, u) in self.coords.iter().enumerate() {
            write!(out, "{u:>COORD_WIDTH$.5}")?;
            for column in &self.columns {
                let width = column.mode.label().len();
                match column.samples.get(i) {
                    Some(v) => write!(out, " | {v:>width$.0}")?,
                    None => write!(out, " | {:>width$}", "-")?,
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Compare every column against the reference sampler.
    pub fn check(&self) -> Vec<ModeCheck> {
        self.columns
            .iter()
            .map(|column| {
                if column.samples.is_empty() {
                    return ModeCheck { mode: column.mode, verdict: Verdict::Skipped };
                }
                let want = column.mode.reference_samples(&self.input, &self.coords);
                let mismatches: Vec<Mismatch> = column
                    .samples
                    .iter()
                    .zip(&want)
                    .enumerate()
                    .filter(|(_, (got, want))| got != want)
                    .map(|(index, (&got, &want))| Mismatch {
                        index,
                        coord: self.coords[index],
                        got,
                        want,
                    })
                    .collect();
                ModeCheck {
                    mode: column.mode,
                    verdict: Verdict::Checked {
                        compared: column.samples.len().min(want.len()),
                        mismatches,
                    },
                }
            })
            .collect()
    }

    /// Print one reference verdict line per mode.
    pub fn render_checks<O: Write>(&self, out: &mut O) -> io::Result<()> {
        for check in self.check() {
            let label = check.mode.label();
            match &check.verdict {
                Verdict::Skipped => writeln!(out, "{label}: no data")?,
                Verdict::Checked { compared, mismatches } => match mismatches.first() {
                    None => writeln!(out, "{label}: {compared}/{compared} match reference")?,
                    Some(first) => writeln!(
                        out,
                        "{label}: {} of {compared} differ from reference \
                         (first at u={:.5}: got {:.0}, want {:.0})",
                        mismatches.len(),
                        first.coord,
                        first.got,
                        first.want
                    )?,
                },
            }
        }
        Ok(())
    }
}
