//! # Resonator Core
//!
//! A sample-accurate physical model of a tube resonator.
//!
//! A sinusoidal source drives pressure into the closed end of a cylindrical
//! pipe. Wave fragments travel along the pipe, reflect at both ends and
//! partially radiate out of the open end. The radiated pressure is the
//! audible output.
//!
//! ## Architecture
//!
//! - [`wave`] - Sample sequences with a direction and a position along the pipe
//! - [`simulators`] - The source ([`simulators::Cylinder`]) and the pipe model
//! - [`simulation`] - Step orchestration and thread-safe parameter hand-off
//! - [`physics`] - Physical constants and the sample clock
//! - [`output`] - Normalization of pressure to device-range samples
//! - [`audio`] - Raw and WAV sinks plus the render loop (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! resonator --duration 3 | ffplay -f f32le -ar 48000 -ac 1 -
//! resonator --pipe-length 0.35 --output tube.wav
//! ```
//!
//! ### Library
//!
//! ```
//! use resonator_core::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::new().with_frequency(220.0).with_pipe_length(0.4);
//! let mut sim = Simulation::with_config(48000.0, config).unwrap();
//! let block = sim.advance(512.0);
//! assert_eq!(block.sample_count(), 512);
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmResonator } from 'resonator_core';
//!
//! const sim = new WasmResonator(48000);
//! sim.process_block(outputBuffer);
//! ```
//!
//! ## Simulation Method
//!
//! Waves never move in memory. Advancing time appends the newest samples to
//! the lane at the closed end, and each fragment's position records where its
//! newest sample sits. Once a fragment extends past the pipe's effective
//! length, the overshooting samples are cut off and split at the boundary:
//!
//! 1. At the open end into a radiated part and a reflected part, using a
//!    lumped end-correction model of the air mass at the opening
//! 2. At the closed end into an unchanged wave travelling back toward the
//!    opening
//!
//! Only a fixed number of echoes is tracked; older fragments are dropped.

pub mod error;
pub mod output;
pub mod physics;
pub mod simulation;
pub mod simulators;
pub mod wave;

#[cfg(feature = "cli")]
pub mod audio;

// Re-export main types for convenience
pub use error::{ResonatorError, Result};
pub use simulation::{ControlParams, ControlSnapshot, Simulation, SimulationConfig};
pub use wave::{Direction, Wave};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmResonator;

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;
