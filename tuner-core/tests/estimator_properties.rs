//! Property-based robustness tests for the pitch estimator using proptest.
//!
//! Whatever the frame content, the estimator must never panic, never index
//! outside its buffers, and never report NaN or infinite frequencies.

use proptest::prelude::*;

use tuner_core::{AudioFrame, PitchEstimate, PitchEstimator, TunerError};

fn check(samples: &[f32], sample_rate: u32) -> Result<(), TestCaseError> {
    let frame = AudioFrame::new(samples, sample_rate).expect("finite, non-empty frame");
    match PitchEstimator::default().estimate(&frame) {
        PitchEstimate::Frequency(f) => {
            prop_assert!(f.is_finite() && f > 0.0, "bad frequency {}", f);
        }
        PitchEstimate::Indeterminate => {}
    }
    Ok(())
}

fn sample_rate() -> impl Strategy<Value = u32> {
    prop_oneof![Just(8000u32), Just(44100u32), Just(48000u32), 1u32..200_000]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_noise_never_breaks(
        samples in prop::collection::vec(-1.0f32..=1.0, 1..512),
        rate in sample_rate(),
    ) {
        check(&samples, rate)?;
    }

    #[test]
    fn constant_frames_never_break(
        value in -1.0f32..=1.0,
        len in 1usize..512,
        rate in sample_rate(),
    ) {
        check(&vec![value; len], rate)?;
    }

    #[test]
    fn alternating_frames_never_break(
        high in -1.0f32..=1.0,
        low in -1.0f32..=1.0,
        len in 1usize..512,
        rate in sample_rate(),
    ) {
        let samples: Vec<f32> = (0..len).map(|i| if i % 2 == 0 { high } else { low }).collect();
        check(&samples, rate)?;
    }

    #[test]
    fn non_finite_samples_are_rejected(
        clean in prop::collection::vec(-1.0f32..=1.0, 1..64),
        bad in prop_oneof![Just(f32::NAN), Just(f32::INFINITY), Just(f32::NEG_INFINITY)],
        index in any::<prop::sample::Index>(),
    ) {
        let mut samples = clean;
        let i = index.index(samples.len());
        samples[i] = bad;
        prop_assert!(matches!(
            AudioFrame::new(&samples, 44100),
            Err(TunerError::InvalidInput(_))
        ));
    }
}

#[test]
fn tiny_frames_are_handled() {
    for samples in [&[0.9][..], &[0.9, -0.9], &[0.5, 0.5, 0.5], &[1.0, -1.0, 1.0, -1.0]] {
        let frame = AudioFrame::new(samples, 44100).unwrap();
        let estimate = PitchEstimator::default().estimate(&frame);
        if let Some(f) = estimate.frequency() {
            assert!(f.is_finite() && f > 0.0);
        }
    }
}
