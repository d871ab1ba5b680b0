//! Resonator - tube resonator physical model
//!
//! Renders the radiated sound of a driven pipe as mono audio.
//!
//! # Usage
//!
//! ```bash
//! resonator --duration 3 | ffmpeg -f f32le -ac 1 -ar 48000 -i - output.wav
//! resonator --frequency 220 --pipe-length 0.35 --output tube.wav
//! ```

use std::path::PathBuf;

use clap::Parser;
use resonator_core::{
    audio::{render, BlockSink, OutputStage, RawOutput, RenderOptions, WavOutput, BUFFER_SIZE},
    error::Result,
    simulators::{DEFAULT_ECHO_ITERATIONS, DEFAULT_FREQUENCY, DEFAULT_PIPE_LENGTH, DEFAULT_PIPE_RADIUS},
    ControlParams, Simulation, SimulationConfig, DEFAULT_SAMPLE_RATE,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tube resonator physical model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sample rate in Hz
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Length of the rendered audio in seconds
    #[arg(short, long, default_value_t = 2.0)]
    duration: f64,

    /// Samples per simulation step
    #[arg(short, long, default_value_t = BUFFER_SIZE)]
    block_size: usize,

    /// Source frequency in Hz
    #[arg(short, long, default_value_t = DEFAULT_FREQUENCY)]
    frequency: f64,

    /// Number of tracked echoes
    #[arg(short, long, default_value_t = DEFAULT_ECHO_ITERATIONS)]
    echo_iterations: usize,

    /// Physical pipe length in meters
    #[arg(long, default_value_t = DEFAULT_PIPE_LENGTH)]
    pipe_length: f64,

    /// Pipe radius in meters
    #[arg(long, default_value_t = DEFAULT_PIPE_RADIUS)]
    pipe_radius: f64,

    /// Stop the source after this many seconds and let the pipe ring out
    #[arg(long, value_name = "SECONDS")]
    stop_after: Option<f64>,

    /// Linear output gain
    #[arg(short, long, default_value_t = 1.0)]
    gain: f64,

    /// Write a WAV file instead of raw f32le to stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries audio
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    let config = SimulationConfig::new()
        .with_frequency(args.frequency)
        .with_echo_iterations(args.echo_iterations)
        .with_pipe_length(args.pipe_length)
        .with_pipe_radius(args.pipe_radius);

    let controls = ControlParams::new(&config);
    let mut simulation = Simulation::with_config(args.sample_rate, config)?;

    let options = RenderOptions {
        duration: args.duration,
        block_size: args.block_size,
        stop_after: args.stop_after,
        output: OutputStage::new(args.gain),
    };

    let mut sink: Box<dyn BlockSink> = match &args.output {
        Some(path) => {
            info!(path = %path.display(), "writing WAV");
            Box::new(WavOutput::create(path, args.sample_rate as u32)?)
        }
        None => Box::new(RawOutput::stdout()),
    };

    render(&mut simulation, &controls, &options, sink.as_mut())?;

    Ok(())
}
