//! Lock-free hand-off of user parameters to the simulation thread.
//!
//! A control surface writes parameters from any thread while the audio
//! worker drives the simulation. The worker takes a [`ControlSnapshot`]
//! between steps and applies it with
//! [`Simulation::apply_controls`](super::Simulation::apply_controls), so a
//! geometry change is never observed halfway through a step.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::SimulationConfig;

/// An `f64` stored in an `AtomicU64`.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Plain copy of the user parameters at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    /// Whether the source should be sounding
    pub running: bool,
    /// Source frequency in Hz
    pub frequency: f64,
    /// Number of tracked echoes
    pub echo_iterations: usize,
    /// Physical pipe length in meters
    pub pipe_length: f64,
    /// Pipe radius in meters
    pub pipe_radius: f64,
}

impl From<&SimulationConfig> for ControlSnapshot {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            running: config.running,
            frequency: config.frequency,
            echo_iterations: config.echo_iterations,
            pipe_length: config.pipe_length,
            pipe_radius: config.pipe_radius,
        }
    }
}

/// Shared user parameters, one atomic per value.
///
/// Wrap in an `Arc` to share between the control surface and the worker.
#[derive(Debug)]
pub struct ControlParams {
    running: AtomicBool,
    frequency: AtomicF64,
    echo_iterations: AtomicUsize,
    pipe_length: AtomicF64,
    pipe_radius: AtomicF64,
}

impl ControlParams {
    /// Seed the parameters from a simulation configuration.
    pub fn new(config: &SimulationConfig) -> Self {
        Self::from_snapshot(ControlSnapshot::from(config))
    }

    pub fn from_snapshot(snapshot: ControlSnapshot) -> Self {
        Self {
            running: AtomicBool::new(snapshot.running),
            frequency: AtomicF64::new(snapshot.frequency),
            echo_iterations: AtomicUsize::new(snapshot.echo_iterations),
            pipe_length: AtomicF64::new(snapshot.pipe_length),
            pipe_radius: AtomicF64::new(snapshot.pipe_radius),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn set_frequency(&self, frequency: f64) {
        self.frequency.set(frequency);
    }

    pub fn set_echo_iterations(&self, echo_iterations: usize) {
        self.echo_iterations.store(echo_iterations, Ordering::Release);
    }

    pub fn set_pipe_length(&self, pipe_length: f64) {
        self.pipe_length.set(pipe_length);
    }

    pub fn set_pipe_radius(&self, pipe_radius: f64) {
        self.pipe_radius.set(pipe_radius);
    }

    /// Read every parameter once.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            running: self.running.load(Ordering::Acquire),
            frequency: self.frequency.get(),
            echo_iterations: self.echo_iterations.load(Ordering::Acquire),
            pipe_length: self.pipe_length.get(),
            pipe_radius: self.pipe_radius.get(),
        }
    }
}

impl Default for ControlParams {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}
