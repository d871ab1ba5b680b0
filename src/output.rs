//! Mapping of simulated pressure to device-range samples.

use crate::wave::Wave;

/// Pressure (Pa) that maps to the normalized peak.
pub const REFERENCE_PEAK: f64 = 1e-4;

/// Output level the reference pressure maps to; also the clip limit.
pub const NORMALIZED_PEAK: f32 = 0.2;

/// Maps pressure waves to device samples.
#[derive(Debug, Clone, Copy)]
pub struct OutputStage {
    factor: f64,
}

impl OutputStage {
    /// Create an output stage with an extra linear `gain`.
    pub fn new(gain: f64) -> Self {
        Self {
            factor: NORMALIZED_PEAK as f64 / REFERENCE_PEAK * gain,
        }
    }

    /// Convert `wave` into `out`, clipping to the normalized peak.
    ///
    /// Returns `true` if the block is silent, i.e. every input sample is
    /// zero or subnormal.
    pub fn convert(&self, wave: &Wave, out: &mut Vec<f32>) -> bool {
        out.clear();
        let mut silent = true;
        for &sample in &wave.samples {
            silent &= !sample.is_normal();
            let value = (sample * self.factor) as f32;
            out.push(if value.is_nan() {
                0.0
            } else {
                value.clamp(-NORMALIZED_PEAK, NORMALIZED_PEAK)
            });
        }
        silent
    }
}

impl Default for OutputStage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::SampleClock;
    use crate::wave::Direction;

    fn wave(samples: Vec<f64>) -> Wave {
        Wave::new(SampleClock::new(48000.0), samples, Direction::TowardOpenEnd)
    }

    #[test]
    fn test_convert_scales_and_clips() {
        let stage = OutputStage::default();
        let mut out = Vec::new();
        let silent = stage.convert(&wave(vec![0.5e-4, -1.0, 1.0, 0.0]), &mut out);

        assert!(!silent);
        assert!((out[0] - 0.1).abs() < 1e-6);
        assert_eq!(out[1], -NORMALIZED_PEAK);
        assert_eq!(out[2], NORMALIZED_PEAK);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn test_convert_flags_silence() {
        let stage = OutputStage::default();
        let mut out = Vec::new();
        assert!(stage.convert(&wave(vec![0.0, f64::MIN_POSITIVE / 4.0, -0.0]), &mut out));
        assert!(stage.convert(&wave(Vec::new()), &mut out));
        assert!(out.is_empty());
    }
}
