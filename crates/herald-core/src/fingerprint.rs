use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::{
    assets::DecodedAudio,
    envelope::{EnvelopePolicy, MixEnvelope},
    fixtures::{DEMO_SAMPLE_RATE, demo_params, synthetic_pad, synthetic_speech},
    mixdown::mix_tracks,
    model::{MixParams, TrackRole},
    timeline::{TimelineLayout, TimelineOptions, compute_layout},
    waveform::{WaveformColumn, reduce_waveform},
};

const FINGERPRINT_SCHEMA_VERSION: u32 = 2;
const AUDIO_FINGERPRINT_COLUMNS: usize = 120;
const ENVELOPE_HASH_POINTS: usize = 512;

/// Layout and envelope are hashed over their exact f64 bits. The mixed audio
/// is kept as reduced columns because `sin` is not bit-identical across libm
/// builds; compare it with [`MixFingerprint::drift_from`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixFingerprint {
    pub schema_version: u32,
    pub total_duration_seconds: f64,
    pub frame_count: usize,
    pub layout_hash: String,
    pub envelope_hash: String,
    pub audio_columns: Vec<WaveformColumn>,
}

impl MixFingerprint {
    #[must_use]
    pub fn drift_from(&self, baseline: &Self, tolerance: f32) -> Vec<String> {
        let mut drift = Vec::new();
        if self.schema_version != baseline.schema_version {
            drift.push(format!(
                "schema_version {} != {}",
                self.schema_version, baseline.schema_version
            ));
        }
        if self.total_duration_seconds.to_bits() != baseline.total_duration_seconds.to_bits() {
            drift.push(format!(
                "total_duration_seconds {} != {}",
                self.total_duration_seconds, baseline.total_duration_seconds
            ));
        }
        if self.frame_count != baseline.frame_count {
            drift.push(format!(
                "frame_count {} != {}",
                self.frame_count, baseline.frame_count
            ));
        }
        if self.layout_hash != baseline.layout_hash {
            drift.push("layout_hash changed".to_string());
        }
        if self.envelope_hash != baseline.envelope_hash {
            drift.push("envelope_hash changed".to_string());
        }
        if self.audio_columns.len() != baseline.audio_columns.len() {
            drift.push(format!(
                "audio column count {} != {}",
                self.audio_columns.len(),
                baseline.audio_columns.len()
            ));
            return drift;
        }

        for (current, expected) in self.audio_columns.iter().zip(&baseline.audio_columns) {
            let delta = (current.min_amplitude - expected.min_amplitude)
                .abs()
                .max((current.max_amplitude - expected.max_amplitude).abs())
                .max((current.rms_amplitude - expected.rms_amplitude).abs())
                .max((current.amplitude - expected.amplitude).abs());
            if delta > tolerance {
                drift.push(format!(
                    "audio column {} moved by {delta}",
                    current.column_index
                ));
            }
        }
        drift
    }
}

#[must_use]
#[instrument(skip(tts, bgm, params))]
pub fn generate_fingerprint(
    tts: &DecodedAudio,
    bgm: Option<&DecodedAudio>,
    params: &MixParams,
    policy: EnvelopePolicy,
    options: &TimelineOptions,
) -> MixFingerprint {
    let layout = compute_layout(&params.timeline_input(), options);
    let envelope = MixEnvelope::from_params(params, policy);
    let mixed = mix_tracks(tts, bgm, params, &envelope);

    MixFingerprint {
        schema_version: FINGERPRINT_SCHEMA_VERSION,
        total_duration_seconds: layout.total_duration_seconds,
        frame_count: mixed.audio.frame_count(),
        layout_hash: hash_hex(&layout_hash_bytes(&layout)),
        envelope_hash: hash_hex(&envelope_hash_bytes(&envelope)),
        audio_columns: reduce_waveform(mixed.audio.first_channel(), AUDIO_FINGERPRINT_COLUMNS),
    }
}

#[must_use]
pub fn demo_fingerprint() -> MixFingerprint {
    let params = demo_params();
    let tts = synthetic_speech(params.tts_duration_seconds, DEMO_SAMPLE_RATE);
    let bgm = synthetic_pad(params.bgm_duration_seconds, DEMO_SAMPLE_RATE);
    generate_fingerprint(
        &tts,
        Some(&bgm),
        &params,
        EnvelopePolicy::default(),
        &TimelineOptions::default(),
    )
}

pub fn read_fingerprint(path: &Path) -> Result<MixFingerprint> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read fingerprint: {}", path.display()))?;
    let fingerprint: MixFingerprint =
        serde_json::from_slice(&bytes).context("failed to parse fingerprint json")?;
    Ok(fingerprint)
}

pub fn write_fingerprint(path: &Path, fingerprint: &MixFingerprint) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create fingerprint directory: {}", parent.display())
        })?;
    }

    let json =
        serde_json::to_vec_pretty(fingerprint).context("failed to encode fingerprint json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write fingerprint: {}", path.display()))?;
    Ok(())
}

fn layout_hash_bytes(layout: &TimelineLayout) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(256);
    push_f64(&mut bytes, layout.total_duration_seconds);
    push_f64(&mut bytes, layout.scale_percent_per_second);
    for segment in &layout.segments {
        bytes.push(match segment.role {
            TrackRole::Tts => 0,
            TrackRole::Bgm => 1,
        });
        push_f64(&mut bytes, segment.start_percent);
        push_f64(&mut bytes, segment.width_percent);
    }
    push_f64(&mut bytes, layout.fade_in_width_percent);
    push_f64(&mut bytes, layout.fade_out_width_percent);
    for tick in &layout.ticks {
        push_f64(&mut bytes, tick.seconds);
        push_f64(&mut bytes, tick.percent);
        bytes.extend_from_slice(tick.label.as_bytes());
    }
    bytes
}

// Hash points span the envelope plus one second either side.
fn envelope_hash_bytes(envelope: &MixEnvelope) -> Vec<u8> {
    let start = envelope.start_seconds() - 1.0;
    let span = envelope.end_seconds() + 1.0 - start;
    let mut bytes = Vec::with_capacity(ENVELOPE_HASH_POINTS * 2);
    for point in 0..ENVELOPE_HASH_POINTS {
        let time = start + span * point as f64 / (ENVELOPE_HASH_POINTS - 1) as f64;
        let quantized = (envelope.gain(time) * f64::from(u16::MAX)).round() as u16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }
    bytes
}

fn push_f64(bytes: &mut Vec<u8>, value: f64) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
