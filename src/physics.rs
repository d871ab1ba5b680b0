//! Physical constants and the shared sampling configuration.
//!
//! All quantities are SI units. Pressures are deltas relative to the
//! ambient atmospheric pressure, so silence is `0.0`.

/// Immutable set of air and radiation constants used by the pipe model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Speed of sound in m/s
    pub speed_of_sound: f64,
    /// Air density in kg/m³
    pub air_density: f64,
    /// Ratio of specific heats for air
    pub adiabatic_factor: f64,
    /// Added length at an open end, as a multiple of the pipe radius
    pub end_correction_factor: f64,
    /// Ambient atmospheric pressure in Pa
    pub atmospheric_pressure: f64,
}

impl PhysicsParams {
    /// Air at 15 °C, sea level.
    pub const STANDARD: PhysicsParams = PhysicsParams {
        speed_of_sound: 340.652,
        air_density: 1.2,
        adiabatic_factor: 1.4,
        end_correction_factor: 0.6,
        atmospheric_pressure: 101_325.0,
    };
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Shorthand for the constants every component reads.
pub const PHYSICS: PhysicsParams = PhysicsParams::STANDARD;

/// Read-only sampling configuration shared by all simulation components.
///
/// The sample rate is fixed for the lifetime of a simulation, so this is
/// passed around by value rather than borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    sample_rate: f64,
}

impl SampleClock {
    /// Create a clock for the given sample rate in Hz.
    pub fn new(sample_rate: f64) -> Self {
        debug_assert!(sample_rate.is_finite() && sample_rate > 0.0);
        Self { sample_rate }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Duration of one sample in seconds.
    pub fn sample_duration(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Distance sound travels during one sample, in meters.
    pub fn sample_length(&self) -> f64 {
        PHYSICS.speed_of_sound * self.sample_duration()
    }
}

/// Flush NaN, infinities and subnormals to zero.
#[inline]
pub fn flush_degenerate(value: f64) -> f64 {
    if value.is_normal() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_clock() {
        let clock = SampleClock::new(48000.0);
        assert_relative_eq!(clock.sample_duration(), 1.0 / 48000.0);
        assert_relative_eq!(clock.sample_length(), 340.652 / 48000.0);
    }

    #[test]
    fn test_flush_degenerate() {
        assert_eq!(flush_degenerate(0.5), 0.5);
        assert_eq!(flush_degenerate(-0.5), -0.5);
        assert_eq!(flush_degenerate(f64::NAN), 0.0);
        assert_eq!(flush_degenerate(f64::INFINITY), 0.0);
        assert_eq!(flush_degenerate(f64::MIN_POSITIVE / 2.0), 0.0);
        assert_eq!(flush_degenerate(0.0), 0.0);
    }
}
