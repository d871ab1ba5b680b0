//! Simulators for the two physical parts of the resonator.
//!
//! - [`Cylinder`] - the source oscillator exciting the closed end
//! - [`Pipe`] - the closed-open transmission line that reflects and radiates
//!
//! The pipe keeps its in-flight segments in a [`SegmentList`], an arena-backed
//! list whose handles survive insertions next to them.

mod cylinder;
mod pipe;
mod segments;

pub use cylinder::{Cylinder, DEFAULT_AMPLITUDE, DEFAULT_FREQUENCY, DEFAULT_SMOOTHING_DURATION};
pub use pipe::{
    split_radiated_and_reflected, Pipe, StepReport, DEFAULT_ECHO_ITERATIONS, DEFAULT_PIPE_LENGTH,
    DEFAULT_PIPE_RADIUS,
};
pub use segments::{SegmentId, SegmentList};
