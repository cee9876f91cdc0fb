//! Synthetic EEG sample generation (`no_std` compatible)
//!
//! Every channel is the sum of:
//! - white Gaussian noise scaled by the Nyquist bandwidth
//! - an optional ~10 Hz alpha rhythm, varying slightly per channel
//! - optional 50/60 Hz mains interference
//! - a linear drift proportional to the sample index
//!
//! Phases are derived from the sample index, so the synthesizer holds no
//! state between calls; all randomness comes from the caller's RNG.

use core::f64::consts::{PI, SQRT_2};

use rand::Rng;
use rand_distr::StandardNormal;

use crate::types::{SampleRecord, SynthConfig, AUX_CHANNELS};

/// Microvolts per volt.
const UV_PER_VOLT: f64 = 1_000_000.0;

/// Alpha rhythm frequency in Hz.
pub const ALPHA_FREQ_HZ: f64 = 10.0;

/// Peak alpha amplitude on the first channel in µV.
pub const ALPHA_AMPLITUDE_UV: f64 = 5.0 * SQRT_2;

/// Accelerometer update rate in Hz.
pub const ACCEL_RATE_HZ: u32 = 25;

/// Stateless multichannel sample synthesizer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleSynthesizer {
    config: SynthConfig,
}

impl SampleSynthesizer {
    /// Create a synthesizer for the given configuration.
    #[must_use]
    pub const fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    /// Samples between accelerometer updates.
    #[must_use]
    pub fn accel_period(&self) -> u64 {
        u64::from((self.config.sample_rate_hz / ACCEL_RATE_HZ).max(1))
    }

    /// Produce the record for sample `index`.
    pub fn synthesize<R: Rng + ?Sized>(&self, index: u64, rng: &mut R) -> SampleRecord {
        let fs = f64::from(self.config.sample_rate_hz.max(1));
        let t = index as f64 / fs;
        let noise_scale_uv = libm::sqrt(fs / 2.0);
        let drift_uv = self.config.drift_uv * index as f64;

        let mut record = SampleRecord::zeroed(index, self.config.channel_count);

        for (ch, value) in record.channels.iter_mut().enumerate() {
            let ch_f = ch as f64;
            let white: f64 = rng.sample(StandardNormal);
            let mut uv = white * noise_scale_uv;

            if self.config.alpha {
                let amplitude = ALPHA_AMPLITUDE_UV * (1.0 - 0.04 * ch_f);
                let phase = ch_f * PI / 16.0;
                uv += amplitude * libm::sin(2.0 * PI * ALPHA_FREQ_HZ * t + phase);
            }

            if let Some(mains_hz) = self.config.line_noise.frequency_hz() {
                let phase = ch_f * PI / 8.0;
                uv += self.config.line_noise.amplitude_uv() * libm::sin(2.0 * PI * mains_hz * t + phase);
            }

            uv += drift_uv;
            *value = uv / UV_PER_VOLT;
        }

        if self.config.accel && index % self.accel_period() == 0 {
            record.aux = accel_reading(rng);
        }

        record
    }
}

/// A board lying roughly flat: small X/Y tilt, Z near 1 g.
fn accel_reading<R: Rng + ?Sized>(rng: &mut R) -> [f64; AUX_CHANNELS] {
    [
        rng.gen_range(-0.1..0.1),
        rng.gen_range(-0.1..0.1),
        rng.gen_range(0.9..1.1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineNoise, DAISY_CHANNELS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet_config() -> SynthConfig {
        SynthConfig {
            alpha: false,
            line_noise: LineNoise::None,
            accel: false,
            ..SynthConfig::default()
        }
    }

    #[test]
    fn test_channel_count_follows_config() {
        let mut rng = StdRng::seed_from_u64(1);
        let synth = SampleSynthesizer::new(SynthConfig::for_board(true, 125));
        let record = synth.synthesize(3, &mut rng);
        assert_eq!(record.index, 3);
        assert_eq!(record.channels.len(), DAISY_CHANNELS);
    }

    #[test]
    fn test_same_seed_same_record() {
        let synth = SampleSynthesizer::new(SynthConfig::default());
        let a = synth.synthesize(10, &mut StdRng::seed_from_u64(7));
        let b = synth.synthesize(10, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_stays_in_microvolt_range() {
        let mut rng = StdRng::seed_from_u64(99);
        let synth = SampleSynthesizer::new(quiet_config());
        for i in 0..500 {
            let record = synth.synthesize(i, &mut rng);
            for &v in &record.channels {
                // sqrt(125) µV sigma; 10 sigma is far outside any plausible draw
                assert!(v.abs() < 120e-6, "sample {i} out of range: {v}");
            }
        }
    }

    #[test]
    fn test_drift_is_linear_in_index() {
        let config = SynthConfig { drift_uv: 2.0, ..quiet_config() };
        let synth = SampleSynthesizer::new(config);
        let n = 10_000;
        let mean = |index: u64| {
            let mut rng = StdRng::seed_from_u64(5);
            let record = synth.synthesize(index, &mut rng);
            record.channels.iter().sum::<f64>() / record.channels.len() as f64
        };
        // Drift of 2 µV × 10000 samples = 20 mV dwarfs the noise
        let shifted = mean(n);
        assert!((shifted - 0.02).abs() < 0.001);
    }

    #[test]
    fn test_alpha_component_is_periodic() {
        let config = SynthConfig { alpha: true, ..quiet_config() };
        let synth = SampleSynthesizer::new(config);
        // 10 Hz at 250 Hz repeats every 25 samples; same noise draw each time
        let a = synth.synthesize(0, &mut StdRng::seed_from_u64(3));
        let b = synth.synthesize(25, &mut StdRng::seed_from_u64(3));
        for (x, y) in a.channels.iter().zip(b.channels.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_line_noise_adds_energy() {
        let clean = SampleSynthesizer::new(quiet_config());
        let noisy = SampleSynthesizer::new(SynthConfig { line_noise: LineNoise::Hz60, ..quiet_config() });
        let power = |synth: &SampleSynthesizer| {
            let mut rng = StdRng::seed_from_u64(11);
            (0..250)
                .map(|i| synth.synthesize(i, &mut rng).channels[2].powi(2))
                .sum::<f64>()
        };
        assert!(power(&noisy) > power(&clean));
    }

    /// Channel values of `config` minus the quiet baseline, same noise draw.
    fn component(config: SynthConfig, index: u64) -> SampleRecord {
        let mut record =
            SampleSynthesizer::new(config).synthesize(index, &mut StdRng::seed_from_u64(4));
        let quiet = SynthConfig { alpha: false, line_noise: LineNoise::None, ..config };
        let base = SampleSynthesizer::new(quiet).synthesize(index, &mut StdRng::seed_from_u64(4));
        for (v, b) in record.channels.iter_mut().zip(base.channels.iter()) {
            *v -= b;
        }
        record
    }

    #[test]
    fn test_line_noise_50hz_component() {
        let config = SynthConfig { line_noise: LineNoise::Hz50, ..quiet_config() };
        let record = component(config, 1);

        // t = 4 ms, channel 0 has no phase offset
        let expected = LineNoise::Hz50.amplitude_uv() * libm::sin(2.0 * PI * 50.0 * 0.004) / UV_PER_VOLT;
        assert!((record.channels[0] - expected).abs() < 1e-12);

        // 50 Hz at 250 Hz repeats every 5 samples
        let later = component(config, 6);
        assert!((later.channels[3] - record.channels[3]).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_varies_by_channel() {
        let config = SynthConfig { alpha: true, channel_count: DAISY_CHANNELS, ..quiet_config() };
        let record = component(config, 0);

        // At t = 0 only the per-channel phase remains: ch * pi / 16
        assert!(record.channels[0].abs() < 1e-12);
        let expected = ALPHA_AMPLITUDE_UV * (1.0 - 0.04 * 8.0) / UV_PER_VOLT;
        assert!((record.channels[8] - expected).abs() < 1e-12);
        assert!(record.channels[4] > 0.0 && record.channels[4] < record.channels[8]);
    }

    #[test]
    fn test_accel_updates_at_25hz() {
        let config = SynthConfig { accel: true, ..quiet_config() };
        let synth = SampleSynthesizer::new(config);
        assert_eq!(synth.accel_period(), 10);

        let mut rng = StdRng::seed_from_u64(2);
        let with_accel = synth.synthesize(20, &mut rng);
        assert!(with_accel.aux[2] > 0.8);

        let without = synth.synthesize(21, &mut rng);
        assert_eq!(without.aux, [0.0; AUX_CHANNELS]);
    }

    #[test]
    fn test_accel_disabled_leaves_aux_zero() {
        let synth = SampleSynthesizer::new(quiet_config());
        let record = synth.synthesize(0, &mut StdRng::seed_from_u64(2));
        assert_eq!(record.aux, [0.0; AUX_CHANNELS]);
    }
}
