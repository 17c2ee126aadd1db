use herald_core::{
    envelope::{
        EnvelopePolicy, FadeCurve, FadeInScope, MAX_ENVELOPE_SAMPLES, MixEnvelope, tts_gain,
    },
    model::FadeSpec,
};
use proptest::prelude::*;

#[test]
fn gain_at_leading_start_is_silent_then_full_after_fade() {
    let envelope = MixEnvelope::new(-5.0, 15.0, FadeSpec::new(2.0, 2.0));
    assert_eq!(envelope.gain(-5.0), 0.0);
    assert_eq!(envelope.gain(-3.0), 1.0);
}

#[test]
fn zero_fade_in_never_ramps() {
    let envelope = MixEnvelope::new(-5.0, 15.0, FadeSpec::new(0.0, 2.0));
    for time in [-5.0, -4.9, -4.0, 0.0, 7.0] {
        assert_eq!(envelope.gain(time), 1.0, "gain at {time}");
    }
}

#[test]
fn fade_out_reaches_zero_at_bgm_end() {
    let envelope = MixEnvelope::new(0.0, 20.0, FadeSpec::new(0.0, 4.0));
    assert_eq!(envelope.gain(16.0), 1.0);
    assert!((envelope.gain(18.0) - 0.5).abs() < 1e-12);
    assert_eq!(envelope.gain(20.0), 0.0);
}

#[test]
fn zero_length_bgm_is_always_silent() {
    let envelope = MixEnvelope::new(0.0, 0.0, FadeSpec::new(1.0, 1.0));
    assert_eq!(envelope.gain(0.0), 0.0);
    assert_eq!(envelope.start_seconds(), envelope.end_seconds());
}

fn policies() -> impl Strategy<Value = EnvelopePolicy> {
    (
        prop_oneof![Just(FadeCurve::Linear), Just(FadeCurve::EqualPower)],
        prop_oneof![Just(FadeInScope::Always), Just(FadeInScope::LeadingOnly)],
    )
        .prop_map(|(curve, fade_in_scope)| EnvelopePolicy {
            curve,
            fade_in_scope,
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn gain_is_zero_outside_bgm_span(
        offset in -60.0f64..60.0,
        duration in 0.0f64..120.0,
        fade_in in 0.0f64..10.0,
        fade_out in 0.0f64..10.0,
        before in 0.0f64..50.0,
        after in 0.0f64..50.0,
        policy in policies(),
    ) {
        let envelope = MixEnvelope::with_policy(offset, duration, FadeSpec::new(fade_in, fade_out), policy);
        prop_assert_eq!(envelope.gain(offset - before - 1e-6), 0.0);
        prop_assert_eq!(envelope.gain(offset + duration + after), 0.0);
    }

    #[test]
    fn gain_stays_in_unit_range(
        offset in -60.0f64..60.0,
        duration in 0.0f64..120.0,
        fade_in in 0.0f64..10.0,
        fade_out in 0.0f64..10.0,
        position in 0.0f64..1.0,
        policy in policies(),
    ) {
        let envelope = MixEnvelope::with_policy(offset, duration, FadeSpec::new(fade_in, fade_out), policy);
        let gain = envelope.gain(offset + duration * position);
        prop_assert!((0.0..=1.0).contains(&gain));
    }

    #[test]
    fn ramp_boundaries_hold_for_non_overlapping_fades(
        offset in -30.0f64..30.0,
        fade_in in 0.5f64..5.0,
        fade_out in 0.5f64..5.0,
        plateau in 0.5f64..60.0,
    ) {
        let duration = fade_in + fade_out + plateau;
        let envelope = MixEnvelope::new(offset, duration, FadeSpec::new(fade_in, fade_out));
        prop_assert_eq!(envelope.gain(offset), 0.0);
        prop_assert!((envelope.gain(offset + fade_in) - 1.0).abs() < 1e-9);
        prop_assert_eq!(envelope.gain(offset + duration), 0.0);
        prop_assert!((envelope.gain(offset + duration - fade_out) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sampling_is_bounded_for_any_step(
        offset in -60.0f64..60.0,
        duration in 0.0f64..7_200.0,
        step_exponent in -12.0f64..1.0,
    ) {
        let envelope = MixEnvelope::new(offset, duration, FadeSpec::new(2.0, 2.0));
        let samples = envelope.sample(10f64.powf(step_exponent));

        prop_assert!(!samples.is_empty());
        prop_assert!(samples.len() <= MAX_ENVELOPE_SAMPLES);
        prop_assert_eq!(samples[0].time_seconds, offset.min(0.0));
        prop_assert!(samples.windows(2).all(|pair| pair[0].time_seconds < pair[1].time_seconds));
        prop_assert!(samples.iter().all(|sample| (0.0..=1.0).contains(&sample.gain)));
    }

    #[test]
    fn speech_gain_is_unity_everywhere(time in -1_000.0f64..1_000.0) {
        prop_assert_eq!(tts_gain(time), 1.0);
    }
}
