//! Simulation orchestration.
//!
//! Each step runs the parts of the resonator in causal order:
//!
//! 1. the [`Cylinder`](crate::simulators::Cylinder) generates the source
//!    chunk for the interval
//! 2. the [`Pipe`](crate::simulators::Pipe) ingests it, resolves boundary
//!    crossings and prunes old echoes
//! 3. the radiated fragments are summed into the output wave and cleared
//!
//! User parameters reach a running simulation through [`ControlParams`],
//! read as a [`ControlSnapshot`] between steps.

mod controls;
mod orchestrator;

pub use controls::{AtomicF64, ControlParams, ControlSnapshot};
pub use orchestrator::{Simulation, SimulationConfig};
