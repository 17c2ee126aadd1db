use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::model::{FadeSpec, MixParams};

pub const MIN_SAMPLE_STEP_SECONDS: f64 = 0.001;
pub const MAX_ENVELOPE_SAMPLES: usize = 100_000;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    #[default]
    Linear,
    EqualPower,
}

impl FadeCurve {
    #[must_use]
    pub fn shape(self, ratio: f64) -> f64 {
        match self {
            Self::Linear => ratio,
            Self::EqualPower => (ratio * FRAC_PI_2).sin(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeInScope {
    #[default]
    Always,
    /// Ramp in only when the BGM starts before the speech.
    LeadingOnly,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvelopePolicy {
    pub curve: FadeCurve,
    pub fade_in_scope: FadeInScope,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GainSample {
    pub time_seconds: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MixEnvelope {
    start_seconds: f64,
    end_seconds: f64,
    fade_in_seconds: f64,
    fade_out_seconds: f64,
    curve: FadeCurve,
}

impl MixEnvelope {
    #[must_use]
    pub fn new(bgm_offset_seconds: f64, bgm_duration_seconds: f64, fades: FadeSpec) -> Self {
        Self::with_policy(
            bgm_offset_seconds,
            bgm_duration_seconds,
            fades,
            EnvelopePolicy::default(),
        )
    }

    #[must_use]
    pub fn with_policy(
        bgm_offset_seconds: f64,
        bgm_duration_seconds: f64,
        fades: FadeSpec,
        policy: EnvelopePolicy,
    ) -> Self {
        let fade_in_seconds = match policy.fade_in_scope {
            FadeInScope::LeadingOnly if bgm_offset_seconds >= 0.0 => 0.0,
            FadeInScope::Always | FadeInScope::LeadingOnly => fades.fade_in_seconds.max(0.0),
        };

        Self {
            start_seconds: bgm_offset_seconds,
            end_seconds: bgm_offset_seconds + bgm_duration_seconds.max(0.0),
            fade_in_seconds,
            fade_out_seconds: fades.fade_out_seconds.max(0.0),
            curve: policy.curve,
        }
    }

    #[must_use]
    pub fn from_params(params: &MixParams, policy: EnvelopePolicy) -> Self {
        Self::with_policy(
            params.bgm_offset_seconds,
            params.bgm_duration_seconds,
            params.fades,
            policy,
        )
    }

    #[must_use]
    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    #[must_use]
    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    #[must_use]
    pub fn fade_in_seconds(&self) -> f64 {
        self.fade_in_seconds
    }

    #[must_use]
    pub fn fade_out_seconds(&self) -> f64 {
        self.fade_out_seconds
    }

    #[must_use]
    pub fn curve(&self) -> FadeCurve {
        self.curve
    }

    /// BGM gain at `time_seconds`. Zero outside `[start, end)`; overlapping
    /// ramps resolve to the smaller of the two.
    #[must_use]
    pub fn gain(&self, time_seconds: f64) -> f64 {
        if time_seconds < self.start_seconds || time_seconds >= self.end_seconds {
            return 0.0;
        }

        let elapsed = time_seconds - self.start_seconds;
        let remaining = self.end_seconds - time_seconds;
        let gain_in = ramp(elapsed, self.fade_in_seconds, self.curve);
        let gain_out = ramp(remaining, self.fade_out_seconds, self.curve);
        gain_in.min(gain_out)
    }

    /// Gain from `min(0, start)` through `end`. The step never drops below
    /// [`MIN_SAMPLE_STEP_SECONDS`] and widens to keep the result within
    /// [`MAX_ENVELOPE_SAMPLES`].
    #[must_use]
    pub fn sample(&self, step_seconds: f64) -> Vec<GainSample> {
        let start = self.start_seconds.min(0.0);
        let span = (self.end_seconds - start).max(0.0);
        let step = step_seconds
            .max(MIN_SAMPLE_STEP_SECONDS)
            .max(span / (MAX_ENVELOPE_SAMPLES - 1) as f64);
        let count = ((span / step).ceil() as usize).min(MAX_ENVELOPE_SAMPLES - 1);

        (0..=count)
            .map(|index| {
                let time_seconds = start + step * index as f64;
                GainSample {
                    time_seconds,
                    gain: self.gain(time_seconds),
                }
            })
            .collect()
    }
}

#[must_use]
pub fn tts_gain(_time_seconds: f64) -> f64 {
    1.0
}

fn ramp(distance_seconds: f64, fade_seconds: f64, curve: FadeCurve) -> f64 {
    if fade_seconds > 0.0 {
        curve.shape((distance_seconds / fade_seconds).clamp(0.0, 1.0))
    } else {
        1.0
    }
}
