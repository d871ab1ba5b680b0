//! Sampled pressure waves travelling along the pipe.
//!
//! A [`Wave`] is a contiguous run of pressure samples together with the
//! location of its newest sample and the direction it travels in. Samples
//! are stored oldest-first: the oldest sample is the one furthest ahead
//! along the travel path.

use std::fmt;

use crate::error::{ResonatorError, Result};
use crate::physics::{SampleClock, PHYSICS};

/// Travel direction of a wave segment inside the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// From the closed (source) end toward the open end
    #[default]
    TowardOpenEnd,
    /// From the open end back toward the closed end
    TowardClosedEnd,
}

impl Direction {
    /// The direction after a reflection.
    pub fn flipped(self) -> Self {
        match self {
            Direction::TowardOpenEnd => Direction::TowardClosedEnd,
            Direction::TowardClosedEnd => Direction::TowardOpenEnd,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TowardOpenEnd => write!(f, "->open"),
            Direction::TowardClosedEnd => write!(f, "->closed"),
        }
    }
}

/// A run of pressure samples with a position and travel direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    /// Pressure samples (Pa, relative to atmospheric), oldest first
    pub samples: Vec<f64>,
    /// Position of the newest sample along the current travel path, in meters
    pub position: f64,
    direction: Direction,
    clock: SampleClock,
}

impl Wave {
    /// Create a wave from samples travelling in `direction`.
    pub fn new(clock: SampleClock, samples: Vec<f64>, direction: Direction) -> Self {
        Self {
            samples,
            position: 0.0,
            direction,
            clock,
        }
    }

    /// Create an empty wave.
    pub fn empty(clock: SampleClock, direction: Direction) -> Self {
        Self::new(clock, Vec::new(), direction)
    }

    /// Create a wave of `sample_count` baseline (silent) samples.
    pub fn silent(clock: SampleClock, sample_count: usize) -> Self {
        Self::new(clock, vec![0.0; sample_count], Direction::TowardOpenEnd)
    }

    /// Travel direction. Fixed for the lifetime of the segment.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The sampling configuration this wave was created with.
    pub fn clock(&self) -> SampleClock {
        self.clock
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of one sample in seconds.
    pub fn sample_duration(&self) -> f64 {
        self.clock.sample_duration()
    }

    /// Physical length covered by the samples, in meters.
    pub fn length(&self) -> f64 {
        Self::length_of(self.samples.len() as f64, self.sample_duration())
    }

    /// Physical length of `sample_count` samples of `sample_duration` each.
    pub fn length_of(sample_count: f64, sample_duration: f64) -> f64 {
        sample_count * PHYSICS.speed_of_sound * sample_duration
    }

    /// Number of whole samples contained in `duration`, clamped to
    /// `[0, sample_count]`.
    pub fn sample_count_for_duration(&self, duration: f64) -> usize {
        let whole = (duration / self.sample_duration()).floor();
        // NaN and negative values saturate to zero
        (whole.max(0.0) as usize).min(self.samples.len())
    }

    /// Number of whole samples contained in `length` meters.
    pub fn sample_count_for_length(&self, length: f64) -> usize {
        self.sample_count_for_duration(length / PHYSICS.speed_of_sound)
    }

    /// Advance the position by the distance travelled in `duration`.
    pub fn move_by_duration(&mut self, duration: f64) {
        let sign = match self.direction {
            Direction::TowardOpenEnd => 1.0,
            Direction::TowardClosedEnd => -1.0,
        };
        self.position += sign * PHYSICS.speed_of_sound * duration;
    }

    /// Remove the `sample_count` oldest samples and return them as a new wave.
    ///
    /// Counts beyond the wave's content are clamped.
    pub fn cut_by_sample_count(&mut self, sample_count: usize) -> Wave {
        let count = sample_count.min(self.samples.len());
        let cut: Vec<f64> = self.samples.drain(..count).collect();
        Wave::new(self.clock, cut, self.direction)
    }

    /// Copy the `sample_count` oldest samples into a new wave.
    pub fn copy_by_sample_count(&self, sample_count: usize) -> Wave {
        let count = sample_count.min(self.samples.len());
        Wave::new(self.clock, self.samples[..count].to_vec(), self.direction)
    }

    /// Append the samples of `rhs` after this wave's samples.
    ///
    /// The position is left untouched; callers set it before merging.
    pub fn append(&mut self, rhs: &Wave) -> Result<()> {
        if self.direction != rhs.direction {
            return Err(ResonatorError::invariant(format!(
                "cannot merge a {} segment into a {} segment",
                rhs.direction, self.direction
            )));
        }
        self.samples.extend_from_slice(&rhs.samples);
        Ok(())
    }

    /// Concatenate two waves, keeping this wave's position.
    pub fn concat(mut self, rhs: &Wave) -> Result<Wave> {
        self.append(rhs)?;
        Ok(self)
    }

    /// Consume the wave, returning its samples.
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clock() -> SampleClock {
        SampleClock::new(1000.0)
    }

    fn ramp(n: usize) -> Wave {
        Wave::new(clock(), (0..n).map(|i| i as f64).collect(), Direction::TowardOpenEnd)
    }

    #[test]
    fn test_length() {
        let wave = ramp(10);
        assert_relative_eq!(wave.sample_duration(), 0.001);
        assert_relative_eq!(wave.length(), 10.0 * 340.652 * 0.001);
        assert_relative_eq!(Wave::length_of(1.0, 0.001), 0.340652);
    }

    #[test]
    fn test_sample_count_for_duration_clamps() {
        let wave = ramp(10);
        assert_eq!(wave.sample_count_for_duration(-1.0), 0);
        assert_eq!(wave.sample_count_for_duration(0.0), 0);
        assert_eq!(wave.sample_count_for_duration(0.0035), 3);
        assert_eq!(wave.sample_count_for_duration(1.0), 10);
        assert_eq!(wave.sample_count_for_duration(f64::NAN), 0);
    }

    #[test]
    fn test_sample_count_for_duration_monotonic() {
        let wave = ramp(50);
        let mut previous = 0;
        for step in -20..200 {
            let count = wave.sample_count_for_duration(step as f64 * 0.00037);
            assert!(count >= previous);
            assert!(count <= wave.sample_count());
            previous = count;
        }
    }

    #[test]
    fn test_sample_count_for_length() {
        let wave = ramp(10);
        let one_sample = Wave::length_of(1.0, 0.001);
        assert_eq!(wave.sample_count_for_length(one_sample * 4.5), 4);
    }

    #[test]
    fn test_move_by_duration() {
        let mut forward = ramp(1);
        forward.move_by_duration(0.5);
        assert_relative_eq!(forward.position, 340.652 * 0.5);

        let mut backward = Wave::new(clock(), vec![0.0], Direction::TowardClosedEnd);
        backward.move_by_duration(0.5);
        assert_relative_eq!(backward.position, -340.652 * 0.5);
    }

    #[test]
    fn test_cut_then_concat_restores_original() {
        for k in 0..=8 {
            let original = ramp(8);
            let mut rest = original.clone();
            let head = rest.cut_by_sample_count(k);
            assert_eq!(head.sample_count(), k);
            assert_eq!(rest.sample_count(), 8 - k);

            let rebuilt = head.concat(&rest).unwrap();
            assert_eq!(rebuilt.samples, original.samples);
        }
    }

    #[test]
    fn test_copy_does_not_mutate() {
        let wave = ramp(5);
        let copy = wave.copy_by_sample_count(2);
        assert_eq!(copy.samples, vec![0.0, 1.0]);
        assert_eq!(wave.sample_count(), 5);
    }

    #[test]
    fn test_cut_keeps_direction() {
        let mut wave = Wave::new(clock(), vec![1.0, 2.0, 3.0], Direction::TowardClosedEnd);
        let cut = wave.cut_by_sample_count(2);
        assert_eq!(cut.direction(), Direction::TowardClosedEnd);
        assert_eq!(wave.samples, vec![3.0]);
    }

    #[test]
    fn test_append_rejects_direction_mismatch() {
        let mut a = ramp(2);
        let b = Wave::new(clock(), vec![9.0], Direction::TowardClosedEnd);
        let err = a.append(&b).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(a.sample_count(), 2);
    }

    #[test]
    fn test_direction_flip() {
        assert_eq!(Direction::TowardOpenEnd.flipped(), Direction::TowardClosedEnd);
        assert_eq!(Direction::TowardClosedEnd.flipped(), Direction::TowardOpenEnd);
    }
}
