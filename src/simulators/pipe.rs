//! Closed-open pipe transmission-line model.
//!
//! The pipe tracks the wave segments currently travelling inside it in
//! arrival order. Each step the newest source chunk is merged into the front
//! segment, then every tracked segment up to the echo horizon is checked
//! against the boundary it travels toward:
//!
//! - the closed end reflects everything back unchanged
//! - the open end radiates part of the wave (the audible output) and
//!   reflects the rest, split using a finite difference of adjacent samples
//!
//! Reflections are spliced in directly after the segment that produced them,
//! so a bounce is always processed after the bounce that caused it.
//! Segments beyond the echo horizon are dropped; there is no decay model.

use tracing::{debug, trace, warn};

use super::segments::{SegmentId, SegmentList};
use crate::error::{ensure_positive, ResonatorError, Result};
use crate::physics::{flush_degenerate, SampleClock, PHYSICS};
use crate::wave::{Direction, Wave};

/// Default number of tracked echoes.
pub const DEFAULT_ECHO_ITERATIONS: usize = 10;

/// Default physical pipe length in meters.
pub const DEFAULT_PIPE_LENGTH: f64 = 0.20;

/// Default pipe radius in meters.
pub const DEFAULT_PIPE_RADIUS: f64 = 0.01;

/// Relative slack allowed on the straddling remainder before it is treated
/// as malformed rather than rounding noise.
const STRADDLE_TOLERANCE: f64 = 1e-9;

/// Outcome of one pipe step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Segments examined at a boundary
    pub processed: usize,
    /// Fragments discarded because they broke an invariant
    pub dropped: usize,
    /// Segments removed by the echo horizon
    pub pruned: usize,
}

/// Closed-open cylindrical pipe. The closed end is at position zero.
#[derive(Debug, Clone)]
pub struct Pipe {
    clock: SampleClock,
    pipe_waves: SegmentList<Wave>,
    radiated_waves: Vec<Wave>,
    radiated_sample_count: usize,
    echo_iterations: usize,
    physical_length: f64,
    /// Acoustic length seen by the waves, including end correction
    effective_length: f64,
    radius: f64,
    cross_sectional_area: f64,
}

impl Pipe {
    /// Create a pipe with the given geometry.
    pub fn new(
        clock: SampleClock,
        physical_length: f64,
        radius: f64,
        echo_iterations: usize,
    ) -> Result<Self> {
        ensure_echo_iterations(echo_iterations)?;
        let effective_length = effective_length(clock, physical_length, radius)?;

        Ok(Self {
            clock,
            pipe_waves: SegmentList::with_capacity(echo_iterations + 1),
            radiated_waves: Vec::with_capacity(echo_iterations),
            radiated_sample_count: 0,
            echo_iterations,
            physical_length,
            effective_length,
            radius,
            cross_sectional_area: std::f64::consts::PI * radius * radius,
        })
    }

    pub fn echo_iterations(&self) -> usize {
        self.echo_iterations
    }

    pub fn physical_length(&self) -> f64 {
        self.physical_length
    }

    /// Length used for boundary tests: physical length plus end correction,
    /// minus one sample so the boundary lines up with the newest sample.
    pub fn effective_length(&self) -> f64 {
        self.effective_length
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn cross_sectional_area(&self) -> f64 {
        self.cross_sectional_area
    }

    /// In-flight segments in arrival order.
    pub fn pipe_waves(&self) -> impl Iterator<Item = &Wave> {
        self.pipe_waves.iter()
    }

    pub fn pipe_wave_count(&self) -> usize {
        self.pipe_waves.len()
    }

    /// Radiated fragments waiting to be summed.
    pub fn radiated_waves(&self) -> &[Wave] {
        &self.radiated_waves
    }

    pub fn radiated_wave_count(&self) -> usize {
        self.radiated_waves.len()
    }

    /// Longest radiated fragment since the last clear.
    pub fn radiated_sample_count(&self) -> usize {
        self.radiated_sample_count
    }

    /// Change the echo horizon. Drops all tracked state.
    pub fn set_echo_iterations_and_reset(&mut self, echo_iterations: usize) -> Result<()> {
        ensure_echo_iterations(echo_iterations)?;
        self.echo_iterations = echo_iterations;
        self.reset();
        Ok(())
    }

    /// Change the physical length in meters. Drops all tracked state.
    pub fn set_pipe_physical_length_and_reset(&mut self, physical_length: f64) -> Result<()> {
        self.effective_length = effective_length(self.clock, physical_length, self.radius)?;
        self.physical_length = physical_length;
        self.reset();
        Ok(())
    }

    /// Change the radius in meters. The effective length depends on the
    /// radius and is recomputed. Drops all tracked state.
    pub fn set_pipe_radius_and_reset(&mut self, radius: f64) -> Result<()> {
        self.effective_length = effective_length(self.clock, self.physical_length, radius)?;
        self.radius = radius;
        self.cross_sectional_area = std::f64::consts::PI * radius * radius;
        self.reset();
        Ok(())
    }

    /// Forget every in-flight and radiated segment.
    pub fn reset(&mut self) {
        debug!(
            length = self.physical_length,
            radius = self.radius,
            echo_iterations = self.echo_iterations,
            "pipe reset"
        );
        self.clear_radiated_waves();
        self.pipe_waves.clear();
    }

    /// Run one step: ingest the source chunk for `[old, new)`, resolve
    /// boundary crossings and prune to the echo horizon.
    pub fn advance(
        &mut self,
        old_sample_count: f64,
        new_sample_count: f64,
        delta_sample_count: f64,
        chunk: Wave,
    ) -> StepReport {
        self.ingest(chunk);
        let mut report = self.process_boundaries();
        report.pruned = self.prune();

        trace!(
            old_sample_count,
            new_sample_count,
            delta_sample_count,
            segments = self.pipe_waves.len(),
            radiated = self.radiated_waves.len(),
            "pipe step"
        );
        report
    }

    /// Merge a fresh source chunk into the front of the in-flight list.
    pub fn ingest(&mut self, chunk: Wave) {
        if chunk.is_empty() {
            return;
        }

        if let Some(front) = self.pipe_waves.front() {
            if let Some(wave) = self.pipe_waves.get_mut(front) {
                if wave.direction() == chunk.direction() {
                    wave.position = chunk.position;
                    // same direction, cannot fail
                    if wave.append(&chunk).is_ok() {
                        return;
                    }
                }
            }
        }
        self.pipe_waves.push_front(chunk);
    }

    /// Resolve boundary crossings for up to `echo_iterations` segments,
    /// front to back.
    pub fn process_boundaries(&mut self) -> StepReport {
        let mut report = StepReport::default();
        let mut cursor = self.pipe_waves.front();

        while let Some(id) = cursor {
            if report.processed >= self.echo_iterations {
                break;
            }

            if let Err(err) = self.progress_pipe_wave(id) {
                warn!(segment = %id, error = %err, "dropping malformed wave fragment");
                report.dropped += 1;
            }
            report.processed += 1;
            cursor = self.pipe_waves.next(id);
        }

        report
    }

    /// Drop the oldest segments beyond the echo horizon. Returns how many
    /// were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.pipe_waves.len();
        self.pipe_waves.truncate(self.echo_iterations);
        before - self.pipe_waves.len()
    }

    /// Handle the boundary crossing of a single segment.
    fn progress_pipe_wave(&mut self, id: SegmentId) -> Result<()> {
        let clock = self.clock;
        let effective_length = self.effective_length;
        let radius = self.radius;

        let wave = self
            .pipe_waves
            .get_mut(id)
            .ok_or_else(|| ResonatorError::invariant(format!("stale segment handle {id}")))?;

        let exceeding_length = wave.position + wave.length() - effective_length;
        let sample_count = wave.sample_count_for_length(exceeding_length);
        if sample_count < 2 {
            // a derivative needs two samples; wait for more to arrive
            return Ok(());
        }

        let reflected = match wave.direction() {
            Direction::TowardOpenEnd => {
                // keep one sample of overlap so the derivative spans the boundary
                let cut = wave.cut_by_sample_count(sample_count - 1);
                let overlap = wave.copy_by_sample_count(1);
                let region = cut.concat(&overlap)?;
                let (radiated, mut reflected) = split_radiated_and_reflected(&region, radius)?;
                reflected.position = straddling_length(clock, exceeding_length, sample_count)?;
                self.add_radiated_wave(radiated);
                reflected
            }
            Direction::TowardClosedEnd => {
                // the closed end is fully reflective; the position is now
                // measured from the closed end
                let region = wave.cut_by_sample_count(sample_count - 1);
                let mut reflected = Wave::new(clock, region.into_samples(), Direction::TowardOpenEnd);
                reflected.position = straddling_length(clock, exceeding_length, sample_count)?;
                reflected
            }
        };

        self.add_pipe_wave_after(id, reflected)
    }

    /// Insert `pipe_wave` after `id`, merging into the existing segment in
    /// that slot.
    fn add_pipe_wave_after(&mut self, id: SegmentId, pipe_wave: Wave) -> Result<()> {
        if pipe_wave.is_empty() {
            return Ok(());
        }

        match self.pipe_waves.next(id) {
            None => {
                self.pipe_waves
                    .insert_after(id, pipe_wave)
                    .ok_or_else(|| ResonatorError::invariant(format!("stale segment handle {id}")))?;
            }
            Some(next) => {
                let slot = self
                    .pipe_waves
                    .get_mut(next)
                    .ok_or_else(|| ResonatorError::invariant(format!("stale segment handle {next}")))?;
                if slot.direction() != pipe_wave.direction() {
                    return Err(ResonatorError::invariant(format!(
                        "reflection {} does not match neighbouring segment {}",
                        pipe_wave.direction(),
                        slot.direction()
                    )));
                }
                slot.position = pipe_wave.position;
                slot.append(&pipe_wave)?;
            }
        }
        Ok(())
    }

    fn add_radiated_wave(&mut self, radiated: Wave) {
        self.radiated_sample_count = self.radiated_sample_count.max(radiated.sample_count());
        self.radiated_waves.push(radiated);
    }

    /// Sum the radiated fragments into one wave of `sample_count` samples.
    ///
    /// Fragments are aligned to the newest sample of the output.
    pub fn sum_radiated_waves(&self, sample_count: usize) -> Result<Wave> {
        if self.radiated_sample_count > sample_count {
            return Err(ResonatorError::invariant(format!(
                "radiated {} samples but only {} were requested",
                self.radiated_sample_count, sample_count
            )));
        }

        let mut sum = Wave::silent(self.clock, sample_count);
        for wave in &self.radiated_waves {
            let offset = sample_count - wave.sample_count();
            for (out, &sample) in sum.samples[offset..].iter_mut().zip(wave.samples.iter()) {
                *out += sample;
            }
        }
        Ok(sum)
    }

    pub fn clear_radiated_waves(&mut self) {
        self.radiated_waves.clear();
        self.radiated_sample_count = 0;
    }
}

/// Split a boundary region of `n >= 2` samples into radiated and reflected
/// waves of `n - 1` samples each.
///
/// The pressure difference between neighbouring samples approximates the
/// air acceleration at the open end. The air mass in the end correction
/// turns that acceleration into the radiated pressure, and the reflection
/// carries whatever the radiation did not take: `p_radiated = p_incident +
/// p_reflected` with the sign convention of the reflected lane.
pub fn split_radiated_and_reflected(region: &Wave, radius: f64) -> Result<(Wave, Wave)> {
    if region.sample_count() < 2 {
        return Err(ResonatorError::invariant(format!(
            "boundary region has {} samples, need at least 2",
            region.sample_count()
        )));
    }

    let clock = region.clock();
    let sample_length = Wave::length_of(1.0, region.sample_duration());
    let count = region.sample_count() - 1;
    let mut radiated = Vec::with_capacity(count);
    let mut reflected = Vec::with_capacity(count);

    for pair in region.samples.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);
        // a = F / m per unit area
        let flow_acceleration = (p2 - p1) / (-PHYSICS.air_density * sample_length);
        let radiation_pressure = flush_degenerate(
            PHYSICS.air_density * PHYSICS.end_correction_factor * radius * flow_acceleration,
        );
        radiated.push(radiation_pressure);
        reflected.push(flush_degenerate(radiation_pressure - p1));
    }

    Ok((
        Wave::new(clock, radiated, Direction::TowardOpenEnd),
        Wave::new(clock, reflected, Direction::TowardClosedEnd),
    ))
}

/// Sub-sample remainder of a boundary crossing, in `[0, one sample length)`.
fn straddling_length(clock: SampleClock, exceeding_length: f64, sample_count: usize) -> Result<f64> {
    let sample_length = clock.sample_length();
    let straddle = exceeding_length - Wave::length_of(sample_count as f64, clock.sample_duration());
    let slack = sample_length * STRADDLE_TOLERANCE;

    if !(straddle > -slack && straddle < sample_length + slack) {
        return Err(ResonatorError::invariant(format!(
            "straddling remainder {straddle:e} m outside one sample ({sample_length:e} m)"
        )));
    }
    Ok(straddle.clamp(0.0, sample_length))
}

fn effective_length(clock: SampleClock, physical_length: f64, radius: f64) -> Result<f64> {
    ensure_positive("pipe_length", physical_length)?;
    ensure_positive("pipe_radius", radius)?;

    let sample_length = clock.sample_length();
    let effective = physical_length + PHYSICS.end_correction_factor * radius - sample_length;
    if effective < sample_length {
        return Err(ResonatorError::invalid_parameter(
            "pipe_length",
            format!(
                "pipe of {physical_length} m is shorter than two samples at {} Hz",
                clock.sample_rate()
            ),
        ));
    }
    Ok(effective)
}

fn ensure_echo_iterations(echo_iterations: usize) -> Result<()> {
    if echo_iterations == 0 {
        return Err(ResonatorError::invalid_parameter(
            "echo_iterations",
            "must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RATE: f64 = 1000.0;

    fn clock() -> SampleClock {
        SampleClock::new(RATE)
    }

    /// 2 m pipe at 1 kHz: effective length 1.665348 m, about 4.9 samples.
    fn pipe() -> Pipe {
        Pipe::new(clock(), 2.0, 0.01, 10).unwrap()
    }

    fn wave(samples: Vec<f64>, direction: Direction) -> Wave {
        Wave::new(clock(), samples, direction)
    }

    fn ramp(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64 * 0.001).collect()
    }

    #[test]
    fn test_effective_length() {
        let pipe = pipe();
        assert_relative_eq!(pipe.effective_length(), 2.0 + 0.6 * 0.01 - 0.340652, epsilon = 1e-12);
        assert_relative_eq!(pipe.cross_sectional_area(), std::f64::consts::PI * 1e-4, max_relative = 1e-12);
    }

    #[test]
    fn test_split_identity() {
        let region = wave(vec![0.01, -0.02, 0.005, 0.03, 0.0], Direction::TowardOpenEnd);
        let (radiated, reflected) = split_radiated_and_reflected(&region, 0.01).unwrap();

        assert_eq!(radiated.sample_count(), 4);
        assert_eq!(reflected.sample_count(), 4);
        assert_eq!(radiated.direction(), Direction::TowardOpenEnd);
        assert_eq!(reflected.direction(), Direction::TowardClosedEnd);

        for i in 0..4 {
            assert_relative_eq!(
                radiated.samples[i] - reflected.samples[i],
                region.samples[i],
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn test_split_needs_two_samples() {
        let region = wave(vec![0.01], Direction::TowardOpenEnd);
        let err = split_radiated_and_reflected(&region, 0.01).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_split_flat_region_reflects_inverted() {
        let region = wave(vec![0.5, 0.5, 0.5], Direction::TowardOpenEnd);
        let (radiated, reflected) = split_radiated_and_reflected(&region, 0.01).unwrap();
        assert!(radiated.samples.iter().all(|&v| v == 0.0));
        assert_eq!(reflected.samples, vec![-0.5, -0.5]);
    }

    #[test]
    fn test_closed_end_reflection_carries_samples_unchanged() {
        let mut pipe = pipe();
        let samples = ramp(10);
        let first = pipe.pipe_waves.push_back(wave(samples.clone(), Direction::TowardClosedEnd));

        let report = pipe.process_boundaries();
        assert_eq!(report.processed, 2);
        assert_eq!(report.dropped, 0);

        // 10 samples against a 4.9 sample pipe: 5 exceed, 4 are reflected
        let waves: Vec<&Wave> = pipe.pipe_waves().collect();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].samples, samples[4..].to_vec());
        assert_eq!(waves[1].samples, samples[..4].to_vec());
        assert_eq!(waves[1].direction(), Direction::TowardOpenEnd);
        assert_eq!(pipe.radiated_wave_count(), 0);

        let straddle = waves[1].position;
        assert!(straddle >= 0.0 && straddle < clock().sample_length());
        assert_eq!(pipe.pipe_waves.get(first).map(Wave::sample_count), Some(6));
    }

    #[test]
    fn test_open_end_radiates_and_reflects() {
        let mut pipe = pipe();
        let samples = ramp(10);
        pipe.pipe_waves.push_back(wave(samples.clone(), Direction::TowardOpenEnd));

        pipe.process_boundaries();

        // 4 samples cut plus one sample of overlap form the region
        assert_eq!(pipe.radiated_wave_count(), 1);
        assert_eq!(pipe.radiated_sample_count(), 4);

        let waves: Vec<&Wave> = pipe.pipe_waves().collect();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].samples, samples[4..].to_vec());
        assert_eq!(waves[1].direction(), Direction::TowardClosedEnd);
        assert_eq!(waves[1].sample_count(), 4);

        let radiated = &pipe.radiated_waves()[0];
        for i in 0..4 {
            assert_relative_eq!(
                radiated.samples[i] - waves[1].samples[i],
                samples[i],
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn test_short_segment_is_skipped() {
        let mut pipe = pipe();
        // 6 samples: exceeding length is ~1.1 samples
        pipe.pipe_waves.push_back(wave(ramp(6), Direction::TowardOpenEnd));
        pipe.process_boundaries();
        assert_eq!(pipe.pipe_wave_count(), 1);
        assert_eq!(pipe.pipe_waves().next().map(Wave::sample_count), Some(6));
        assert_eq!(pipe.radiated_wave_count(), 0);
    }

    #[test]
    fn test_reflection_merges_into_next_slot() {
        let mut pipe = pipe();
        pipe.pipe_waves.push_back(wave(ramp(10), Direction::TowardOpenEnd));
        pipe.pipe_waves.push_back(wave(vec![9.0], Direction::TowardClosedEnd));

        pipe.process_boundaries();

        let waves: Vec<&Wave> = pipe.pipe_waves().collect();
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[1].sample_count(), 5);
        assert_eq!(waves[1].samples[0], 9.0);
    }

    #[test]
    fn test_direction_mismatch_drops_fragment() {
        let mut pipe = pipe();
        pipe.pipe_waves.push_back(wave(ramp(10), Direction::TowardOpenEnd));
        pipe.pipe_waves.push_back(wave(vec![9.0], Direction::TowardOpenEnd));

        let report = pipe.process_boundaries();
        assert_eq!(report.dropped, 1);

        let waves: Vec<&Wave> = pipe.pipe_waves().collect();
        assert_eq!(waves[1].samples, vec![9.0]);
    }

    #[test]
    fn test_ingest_merges_into_front() {
        let mut pipe = pipe();
        pipe.ingest(wave(vec![1.0, 2.0], Direction::TowardOpenEnd));
        pipe.ingest(wave(vec![3.0], Direction::TowardOpenEnd));
        pipe.ingest(wave(Vec::new(), Direction::TowardOpenEnd));

        assert_eq!(pipe.pipe_wave_count(), 1);
        assert_eq!(pipe.pipe_waves().next().map(|w| w.samples.clone()), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_prune_bounds_segments() {
        let mut pipe = Pipe::new(clock(), 2.0, 0.01, 3).unwrap();
        for _ in 0..8 {
            pipe.pipe_waves.push_back(wave(vec![0.0], Direction::TowardOpenEnd));
        }
        assert_eq!(pipe.prune(), 5);
        assert_eq!(pipe.pipe_wave_count(), 3);
    }

    #[test]
    fn test_horizon_limits_processing() {
        let mut pipe = Pipe::new(clock(), 2.0, 0.01, 2).unwrap();
        for _ in 0..4 {
            pipe.pipe_waves.push_back(wave(vec![0.0], Direction::TowardOpenEnd));
        }
        assert_eq!(pipe.process_boundaries().processed, 2);
    }

    #[test]
    fn test_sum_is_tail_aligned() {
        let mut pipe = pipe();
        pipe.add_radiated_wave(wave(vec![1.0, 1.0], Direction::TowardOpenEnd));
        pipe.add_radiated_wave(wave(vec![2.0, 2.0, 2.0], Direction::TowardOpenEnd));

        let sum = pipe.sum_radiated_waves(4).unwrap();
        assert_eq!(sum.samples, vec![0.0, 2.0, 3.0, 3.0]);

        pipe.clear_radiated_waves();
        assert_eq!(pipe.radiated_sample_count(), 0);
        assert_eq!(pipe.sum_radiated_waves(2).unwrap().samples, vec![0.0, 0.0]);
    }

    #[test]
    fn test_sum_rejects_short_request() {
        let mut pipe = pipe();
        pipe.add_radiated_wave(wave(vec![1.0; 5], Direction::TowardOpenEnd));
        assert!(pipe.sum_radiated_waves(4).unwrap_err().is_invariant_violation());
    }

    #[test]
    fn test_geometry_change_resets() {
        let mut pipe = pipe();
        pipe.pipe_waves.push_back(wave(ramp(10), Direction::TowardOpenEnd));
        pipe.process_boundaries();
        assert!(pipe.pipe_wave_count() > 0);
        assert!(pipe.radiated_wave_count() > 0);

        pipe.set_pipe_physical_length_and_reset(1.5).unwrap();
        assert_eq!(pipe.pipe_wave_count(), 0);
        assert_eq!(pipe.radiated_wave_count(), 0);
        assert_eq!(pipe.physical_length(), 1.5);
    }

    #[test]
    fn test_invalid_geometry_keeps_state() {
        let mut pipe = pipe();
        pipe.pipe_waves.push_back(wave(ramp(3), Direction::TowardOpenEnd));

        assert!(pipe.set_pipe_physical_length_and_reset(-1.0).is_err());
        assert!(pipe.set_pipe_radius_and_reset(0.0).is_err());
        // shorter than two samples at 1 kHz
        assert!(pipe.set_pipe_physical_length_and_reset(0.1).is_err());
        assert!(pipe.set_echo_iterations_and_reset(0).is_err());

        assert_eq!(pipe.physical_length(), 2.0);
        assert_eq!(pipe.radius(), 0.01);
        assert_eq!(pipe.echo_iterations(), 10);
        assert_eq!(pipe.pipe_wave_count(), 1);
    }

    #[test]
    fn test_radius_change_updates_effective_length() {
        let mut pipe = pipe();
        pipe.set_pipe_radius_and_reset(0.05).unwrap();
        assert_relative_eq!(pipe.effective_length(), 2.0 + 0.6 * 0.05 - 0.340652, epsilon = 1e-12);
    }
}
