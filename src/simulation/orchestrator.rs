//! Main simulation interface.

use tracing::{debug, warn};

use crate::error::{ensure_positive, ResonatorError, Result};
use crate::physics::SampleClock;
use crate::simulators::{
    Cylinder, Pipe, StepReport, DEFAULT_AMPLITUDE, DEFAULT_ECHO_ITERATIONS, DEFAULT_FREQUENCY,
    DEFAULT_PIPE_LENGTH, DEFAULT_PIPE_RADIUS, DEFAULT_SMOOTHING_DURATION,
};
use crate::wave::Wave;

use super::ControlSnapshot;

/// Configuration for the simulation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Source frequency in Hz.
    pub frequency: f64,
    /// Peak source pressure in Pa.
    pub amplitude: f64,
    /// Start/stop ramp length in seconds.
    pub smoothing_duration: f64,
    /// Whether the source starts sounding immediately.
    pub running: bool,
    /// Number of tracked echoes.
    pub echo_iterations: usize,
    /// Physical pipe length in meters.
    pub pipe_length: f64,
    /// Pipe radius in meters.
    pub pipe_radius: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            amplitude: DEFAULT_AMPLITUDE,
            smoothing_duration: DEFAULT_SMOOTHING_DURATION,
            running: true,
            echo_iterations: DEFAULT_ECHO_ITERATIONS,
            pipe_length: DEFAULT_PIPE_LENGTH,
            pipe_radius: DEFAULT_PIPE_RADIUS,
        }
    }
}

impl SimulationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source frequency in Hz.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the peak source pressure in Pa.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Set the start/stop ramp length in seconds.
    ///
    /// Shorter ramps respond faster but click more:
    /// - 0.1 (default): inaudible transitions
    /// - 0.01: snappy, a faint click on sustained tones
    pub fn with_smoothing_duration(mut self, seconds: f64) -> Self {
        self.smoothing_duration = seconds;
        self
    }

    /// Start with the source stopped or running.
    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// Set the number of tracked echoes.
    pub fn with_echo_iterations(mut self, echo_iterations: usize) -> Self {
        self.echo_iterations = echo_iterations;
        self
    }

    /// Set the physical pipe length in meters.
    pub fn with_pipe_length(mut self, pipe_length: f64) -> Self {
        self.pipe_length = pipe_length;
        self
    }

    /// Set the pipe radius in meters.
    pub fn with_pipe_radius(mut self, pipe_radius: f64) -> Self {
        self.pipe_radius = pipe_radius;
        self
    }
}

/// Runs the cylinder and pipe in causal order and collects the radiated
/// sound.
///
/// Not thread-safe by design: one caller drives [`advance`](Self::advance)
/// and parameter changes arrive through
/// [`apply_controls`](Self::apply_controls) between steps.
#[derive(Debug, Clone)]
pub struct Simulation {
    clock: SampleClock,
    /// Samples processed so far; fractional steps accumulate here
    sample_count: f64,
    out_wave: Wave,
    cylinder: Cylinder,
    pipe: Pipe,
    last_report: StepReport,
}

impl Simulation {
    /// Create a simulation with default configuration.
    pub fn new(sample_rate: f64) -> Result<Self> {
        Self::with_config(sample_rate, SimulationConfig::default())
    }

    /// Create a simulation with custom configuration.
    pub fn with_config(sample_rate: f64, config: SimulationConfig) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ResonatorError::InvalidSimulationParam {
                message: format!("sample rate must be a positive number of Hz (got {sample_rate})"),
            });
        }
        let clock = SampleClock::new(sample_rate);

        ensure_positive("frequency", config.frequency)?;
        let mut cylinder = Cylinder::new(clock, config.frequency, config.running);
        cylinder.set_amplitude(config.amplitude)?;
        cylinder.set_smoothing_duration(config.smoothing_duration)?;

        let pipe = Pipe::new(
            clock,
            config.pipe_length,
            config.pipe_radius,
            config.echo_iterations,
        )?;

        debug!(sample_rate, ?config, "simulation created");

        Ok(Self {
            clock,
            sample_count: 0.0,
            out_wave: Wave::silent(clock, 0),
            cylinder,
            pipe,
            last_report: StepReport::default(),
        })
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }

    pub fn clock(&self) -> SampleClock {
        self.clock
    }

    /// Total samples processed so far.
    pub fn sample_count(&self) -> f64 {
        self.sample_count
    }

    pub fn cylinder(&self) -> &Cylinder {
        &self.cylinder
    }

    pub fn cylinder_mut(&mut self) -> &mut Cylinder {
        &mut self.cylinder
    }

    pub fn pipe(&self) -> &Pipe {
        &self.pipe
    }

    pub fn pipe_mut(&mut self) -> &mut Pipe {
        &mut self.pipe
    }

    /// Output of the most recent step.
    pub fn out_wave(&self) -> &Wave {
        &self.out_wave
    }

    /// Pipe statistics of the most recent step.
    pub fn last_report(&self) -> StepReport {
        self.last_report
    }

    /// Advance by `sample_count_progress` samples and return the radiated
    /// output, `floor(progress)` samples long.
    ///
    /// Invariant failures drop the offending output frame: the returned
    /// wave is silent and a warning is logged.
    pub fn advance(&mut self, sample_count_progress: f64) -> &Wave {
        if let Err(err) = self.step(sample_count_progress) {
            warn!(error = %err, progress = sample_count_progress, "dropped output frame");
        }
        &self.out_wave
    }

    /// Like [`advance`](Self::advance) but reports dropped frames.
    ///
    /// The simulation still moves forward when an error is returned; the
    /// output for that step is silent.
    pub fn try_advance(&mut self, sample_count_progress: f64) -> Result<&Wave> {
        self.step(sample_count_progress)?;
        Ok(&self.out_wave)
    }

    fn step(&mut self, progress: f64) -> Result<()> {
        if !progress.is_finite() || progress < 0.0 {
            self.out_wave = Wave::silent(self.clock, 0);
            return Err(ResonatorError::InvalidSimulationParam {
                message: format!("step size must be a non-negative number of samples (got {progress})"),
            });
        }

        let old_sample_count = self.sample_count;
        let new_sample_count = old_sample_count + progress;
        let output_count = progress as usize;

        // the pipe consumes what the cylinder produced for the same interval
        let chunk = self.cylinder.advance(old_sample_count, new_sample_count);
        self.last_report = self
            .pipe
            .advance(old_sample_count, new_sample_count, progress, chunk);

        let summed = self.pipe.sum_radiated_waves(output_count);
        self.pipe.clear_radiated_waves();
        self.sample_count = new_sample_count;

        match summed {
            Ok(wave) => {
                self.out_wave = wave;
                Ok(())
            }
            Err(err) => {
                self.out_wave = Wave::silent(self.clock, output_count);
                Err(err)
            }
        }
    }

    /// Apply user parameters. Call only between steps.
    ///
    /// Geometry and horizon setters reset the pipe, so they run only when
    /// the value actually changed. Invalid values are skipped and the first
    /// error is returned after the remaining parameters were applied.
    pub fn apply_controls(&mut self, controls: &ControlSnapshot) -> Result<()> {
        let mut outcome = Ok(());
        let mut record = |result: Result<()>| {
            if let Err(err) = result {
                warn!(error = %err, "control change rejected");
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        };

        if controls.running != self.cylinder.is_running() {
            debug!(running = controls.running, "source state change");
            if controls.running {
                self.cylinder.start();
            } else {
                self.cylinder.stop();
            }
        }

        if controls.frequency != self.cylinder.frequency() {
            record(self.cylinder.set_frequency(controls.frequency));
        }

        if controls.echo_iterations != self.pipe.echo_iterations() {
            record(self.pipe.set_echo_iterations_and_reset(controls.echo_iterations));
        }

        if controls.pipe_length != self.pipe.physical_length() {
            record(self.pipe.set_pipe_physical_length_and_reset(controls.pipe_length));
        }

        if controls.pipe_radius != self.pipe.radius() {
            record(self.pipe.set_pipe_radius_and_reset(controls.pipe_radius));
        }

        outcome
    }
}
