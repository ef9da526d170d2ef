//! RMS energy / decibel helpers shared by the codec and VAD.

/// Linear RMS floor applied before taking `log10`, per spec: avoids
/// `log(0)` without inventing a separate dB floor constant.
pub const RMS_FLOOR: f32 = 0.001;

/// `rms_db` of true silence, i.e. `20 * log10(RMS_FLOOR)`.
pub const SILENCE_FLOOR_DB: f32 = -60.0;

/// RMS energy of `samples` (normalized f32, [-1.0, 1.0]) expressed in dBFS.
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_FLOOR_DB;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    let rms = (sum_squares / samples.len() as f32).sqrt();

    20.0 * rms.max(RMS_FLOOR).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_hits_the_floor() {
        assert_eq!(rms_db(&[0.0; 160]), SILENCE_FLOOR_DB);
        assert_eq!(rms_db(&[]), SILENCE_FLOOR_DB);
    }

    #[test]
    fn louder_signal_has_higher_db() {
        let quiet = rms_db(&[0.05; 160]);
        let loud = rms_db(&[0.5; 160]);
        assert!(loud > quiet);
    }
}
