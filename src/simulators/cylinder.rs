//! Source oscillator driving the pipe.
//!
//! The cylinder emits a sinusoidal pressure wave into the closed end of the
//! pipe. Starting and stopping ramps the amplitude linearly over a fixed
//! smoothing window so that transitions never produce clicks.

use std::f64::consts::TAU;

use crate::error::{ensure_positive, Result};
use crate::physics::SampleClock;
use crate::wave::{Direction, Wave};

/// Default source frequency in Hz.
pub const DEFAULT_FREQUENCY: f64 = 500.0;

/// Average peak sound pressure of conversational speech, in Pa.
pub const DEFAULT_AMPLITUDE: f64 = 0.02;

/// Default start/stop ramp length in seconds.
pub const DEFAULT_SMOOTHING_DURATION: f64 = 0.1;

/// Run state requested for the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    None,
    Start,
    Stop,
    Restart,
}

/// Sinusoidal pressure source with click-free start/stop.
#[derive(Debug, Clone)]
pub struct Cylinder {
    clock: SampleClock,
    frequency: f64,
    amplitude: f64,
    /// Ramp length in samples
    smoothing_samples: f64,
    /// Phase in radians, kept in [0, 2π)
    phase: f64,
    running: bool,
    request: Request,
    /// Sample position of the most recent start/stop transition
    transition_position: f64,
    /// Ramp gain at the moment of the most recent transition
    transition_gain: f64,
}

impl Cylinder {
    /// Create a source. A running source fades in from silence on the first
    /// step; a stopped one stays silent until started.
    pub fn new(clock: SampleClock, frequency: f64, running: bool) -> Self {
        Self {
            clock,
            frequency,
            amplitude: DEFAULT_AMPLITUDE,
            smoothing_samples: DEFAULT_SMOOTHING_DURATION * clock.sample_rate(),
            phase: 0.0,
            running,
            request: Request::None,
            transition_position: 0.0,
            transition_gain: 0.0,
        }
    }

    /// Request a transition to the running state at the next step.
    pub fn start(&mut self) {
        if self.request != Request::Restart {
            self.request = Request::Start;
        }
    }

    /// Request a transition to the stopped state at the next step.
    pub fn stop(&mut self) {
        self.request = Request::Stop;
    }

    /// Request a fresh fade-in from silence at the next step, regardless of
    /// the current state.
    pub fn restart(&mut self) {
        self.request = Request::Restart;
    }

    /// Whether the source is (or has been asked to be) running.
    pub fn is_running(&self) -> bool {
        match self.request {
            Request::None => self.running,
            Request::Start | Request::Restart => true,
            Request::Stop => false,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the source frequency in Hz. Takes effect without a phase jump.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<()> {
        ensure_positive("frequency", frequency)?;
        self.frequency = frequency;
        Ok(())
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Set the peak pressure in Pa.
    pub fn set_amplitude(&mut self, amplitude: f64) -> Result<()> {
        ensure_positive("amplitude", amplitude)?;
        self.amplitude = amplitude;
        Ok(())
    }

    /// Set the start/stop ramp length in seconds.
    pub fn set_smoothing_duration(&mut self, seconds: f64) -> Result<()> {
        ensure_positive("smoothing_duration", seconds)?;
        self.smoothing_samples = seconds * self.clock.sample_rate();
        Ok(())
    }

    /// Ramp gain at sample position `position` under the current state.
    fn gain_at(&self, position: f64) -> f64 {
        let ramp = (position - self.transition_position) / self.smoothing_samples;
        if self.running {
            (self.transition_gain + ramp).min(1.0)
        } else {
            (self.transition_gain - ramp).max(0.0)
        }
    }

    /// Apply a pending start/stop request at `position`.
    fn apply_request(&mut self, position: f64) {
        let request = std::mem::replace(&mut self.request, Request::None);
        let (running, gain) = match request {
            Request::None => return,
            Request::Restart => (true, 0.0),
            Request::Start => (true, self.gain_at(position)),
            Request::Stop => (false, self.gain_at(position)),
        };

        if running != self.running || request == Request::Restart {
            self.transition_position = position;
            self.transition_gain = gain;
            self.running = running;
        }
    }

    /// Generate the samples for `[old_sample_count, new_sample_count)`.
    ///
    /// The returned chunk travels toward the open end and has
    /// `floor(new - old)` samples.
    pub fn advance(&mut self, old_sample_count: f64, new_sample_count: f64) -> Wave {
        self.apply_request(old_sample_count);

        let sample_count = (new_sample_count - old_sample_count).max(0.0) as usize;
        let increment = self.frequency * TAU / self.clock.sample_rate();

        let mut samples = Vec::with_capacity(sample_count);
        for i in 0..sample_count {
            self.phase = (self.phase + increment) % TAU;
            let gain = self.gain_at(old_sample_count + i as f64);
            let value = if gain > 0.0 {
                self.phase.sin() * self.amplitude * gain
            } else {
                0.0
            };
            samples.push(value);
        }

        Wave::new(self.clock, samples, Direction::TowardOpenEnd)
    }
}
