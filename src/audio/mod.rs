//! Audio output for the CLI frontend.
//!
//! Converts simulated pressure blocks into device-range `f32` samples and
//! writes them either as raw little-endian PCM to stdout or into a WAV file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ResonatorError, Result};
use crate::simulation::{ControlParams, Simulation};

pub use crate::output::{OutputStage, NORMALIZED_PEAK, REFERENCE_PEAK};

/// Block size for rendering (in samples).
pub const BUFFER_SIZE: usize = 512;

/// Destination for rendered blocks.
pub trait BlockSink {
    /// Write one block of samples.
    fn write_block(&mut self, samples: &[f32]) -> Result<()>;

    /// Flush and close the sink.
    fn finish(&mut self) -> Result<()>;
}

/// Raw little-endian `f32` PCM writer.
pub struct RawOutput<W: Write> {
    writer: W,
    buffer: Vec<u8>,
}

impl RawOutput<io::Stdout> {
    /// Write to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RawOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(BUFFER_SIZE * 4),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BlockSink for RawOutput<W> {
    fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        self.buffer.clear();
        for sample in samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }

        self.writer
            .write_all(&self.buffer)
            .map_err(|e| ResonatorError::AudioOutputError {
                message: e.to_string(),
            })
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| ResonatorError::AudioOutputError {
                message: e.to_string(),
            })
    }
}

/// Mono 32-bit float WAV writer.
pub struct WavOutput {
    path: String,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavOutput {
    /// Create the file at `path`.
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let path_str = path.display().to_string();
        let writer = hound::WavWriter::create(path, spec).map_err(|source| {
            ResonatorError::WavWriteError {
                path: path_str.clone(),
                source,
            }
        })?;

        Ok(Self {
            path: path_str,
            writer: Some(writer),
        })
    }

    fn wav_error(&self, source: hound::Error) -> ResonatorError {
        ResonatorError::WavWriteError {
            path: self.path.clone(),
            source,
        }
    }
}

impl BlockSink for WavOutput {
    fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ResonatorError::AudioOutputError {
                message: format!("'{}' is already finalized", self.path),
            });
        };
        for &sample in samples {
            if let Err(source) = writer.write_sample(sample) {
                return Err(self.wav_error(source));
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer.finalize().map_err(|source| self.wav_error(source)),
            None => Ok(()),
        }
    }
}

/// How much audio to render and when to release the source.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Total length in seconds
    pub duration: f64,
    /// Samples per simulation step
    pub block_size: usize,
    /// Stop the source after this many seconds
    pub stop_after: Option<f64>,
    /// Output stage applied to every block
    pub output: OutputStage,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            duration: 2.0,
            block_size: BUFFER_SIZE,
            stop_after: None,
            output: OutputStage::default(),
        }
    }
}

/// Summary of a render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    /// Samples written
    pub samples: usize,
    /// Blocks written
    pub blocks: usize,
    /// Blocks flagged silent
    pub silent_blocks: usize,
    /// Largest absolute output sample
    pub peak: f32,
}

/// Drive `simulation` block by block into `sink`.
///
/// `controls` is read at every block boundary, so another thread may change
/// parameters while rendering.
pub fn render(
    simulation: &mut Simulation,
    controls: &ControlParams,
    options: &RenderOptions,
    sink: &mut dyn BlockSink,
) -> Result<RenderStats> {
    if options.block_size == 0 {
        return Err(ResonatorError::InvalidSimulationParam {
            message: "block size must be at least one sample".to_string(),
        });
    }

    let sample_rate = simulation.sample_rate();
    let total = (options.duration.max(0.0) * sample_rate) as usize;
    let stop_at = options.stop_after.map(|secs| (secs.max(0.0) * sample_rate) as usize);

    info!(
        samples = total,
        block_size = options.block_size,
        sample_rate,
        "rendering"
    );

    let mut stats = RenderStats::default();
    let mut block = Vec::with_capacity(options.block_size);

    while stats.samples < total {
        if stop_at.is_some_and(|at| stats.samples >= at) {
            controls.set_running(false);
        }
        // rejected values are logged by the simulation and ignored here
        let _ = simulation.apply_controls(&controls.snapshot());

        let count = options.block_size.min(total - stats.samples);
        let wave = simulation.advance(count as f64);
        let silent = options.output.convert(wave, &mut block);

        sink.write_block(&block)?;

        stats.samples += block.len();
        stats.blocks += 1;
        stats.silent_blocks += usize::from(silent);
        stats.peak = block.iter().fold(stats.peak, |acc, v| acc.max(v.abs()));
        debug!(block = stats.blocks, silent, "block written");
    }

    sink.finish()?;
    info!(
        blocks = stats.blocks,
        silent_blocks = stats.silent_blocks,
        peak = stats.peak,
        "render finished"
    );
    Ok(stats)
}
