use std::f32::consts::TAU;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    assets::DecodedAudio,
    model::{BgmSettings, GenerationRecord, MixParams, ReviewState},
    time::seconds_to_frames,
};

pub const DEMO_SAMPLE_RATE: u32 = 16_000;

const SYLLABLE_SECONDS: f32 = 0.25;
const PAUSE_SECONDS: f32 = 0.1;
const PAD_CHORD_HZ: [f32; 3] = [220.0, 277.18, 329.63];

#[must_use]
pub fn demo_params() -> MixParams {
    MixParams::new(10.0, 15.0)
        .with_offset(-5.0)
        .with_fades(2.0, 2.0)
}

#[must_use]
pub fn synthetic_speech(duration_seconds: f64, sample_rate: u32) -> DecodedAudio {
    let frames = seconds_to_frames(duration_seconds, sample_rate) as usize;
    let rate = sample_rate.max(1) as f32;
    let cycle = SYLLABLE_SECONDS + PAUSE_SECONDS;

    let samples = (0..frames)
        .map(|frame| {
            let t = frame as f32 / rate;
            let position = t % cycle;
            if position >= SYLLABLE_SECONDS {
                return 0.0;
            }
            let shape = (position / SYLLABLE_SECONDS * std::f32::consts::PI).sin();
            let voiced = (t * 180.0 * TAU).sin() * 0.6 + (t * 360.0 * TAU).sin() * 0.2;
            voiced * shape
        })
        .collect();

    DecodedAudio::mono(sample_rate, samples)
}

#[must_use]
pub fn synthetic_pad(duration_seconds: f64, sample_rate: u32) -> DecodedAudio {
    let frames = seconds_to_frames(duration_seconds, sample_rate) as usize;
    let rate = sample_rate.max(1) as f32;

    let channel = |detune: f32| -> Vec<f32> {
        (0..frames)
            .map(|frame| {
                let t = frame as f32 / rate;
                PAD_CHORD_HZ
                    .iter()
                    .map(|hz| (t * hz * detune * TAU).sin() * 0.2)
                    .sum::<f32>()
            })
            .collect()
    };

    DecodedAudio::new(sample_rate, vec![channel(1.0), channel(1.003)])
}

#[must_use]
pub fn demo_record() -> GenerationRecord {
    let params = demo_params();
    let created_at = DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
        .expect("fixture timestamp should be valid")
        .with_timezone(&Utc);

    GenerationRecord {
        id: Uuid::parse_str("5b0f6a1e-2f0c-4f9e-9d59-8c4a3d1e7f20")
            .expect("fixture record id should be valid"),
        title: "Library closing".to_string(),
        script: "The library will close in fifteen minutes. Please bring your items to the front desk."
            .to_string(),
        voice_id: Some("calm-female-01".to_string()),
        created_at,
        tts_audio_path: None,
        tts_duration_seconds: params.tts_duration_seconds,
        bgm: Some(BgmSettings {
            source_path: "bgm/soft-piano.mp3".to_string(),
            duration_seconds: params.bgm_duration_seconds,
            offset_seconds: params.bgm_offset_seconds,
            fade_in_seconds: params.fades.fade_in_seconds,
            fade_out_seconds: params.fades.fade_out_seconds,
            volume: params.bgm_volume,
            explicit_end_seconds: None,
        }),
        review_state: ReviewState::Approved,
        tags: vec!["closing".to_string(), "daily".to_string()],
    }
}
