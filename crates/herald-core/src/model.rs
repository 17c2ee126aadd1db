use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timeline::TimelineInput;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_BGM_VOLUME: f32 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackRole {
    Tts,
    Bgm,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AudioSegment {
    pub role: TrackRole,
    pub duration_seconds: f64,
    pub start_offset_seconds: f64,
}

impl AudioSegment {
    #[must_use]
    pub fn bgm(duration_seconds: f64, start_offset_seconds: f64) -> Self {
        Self {
            role: TrackRole::Bgm,
            duration_seconds: duration_seconds.max(0.0),
            start_offset_seconds,
        }
    }

    #[must_use]
    pub fn end_seconds(&self) -> f64 {
        self.start_offset_seconds + self.duration_seconds
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FadeSpec {
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
}

impl FadeSpec {
    #[must_use]
    pub fn new(fade_in_seconds: f64, fade_out_seconds: f64) -> Self {
        Self {
            fade_in_seconds: fade_in_seconds.max(0.0),
            fade_out_seconds: fade_out_seconds.max(0.0),
        }
    }

    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.fade_in_seconds + self.fade_out_seconds
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixParams {
    pub tts_duration_seconds: f64,
    pub bgm_duration_seconds: f64,
    pub bgm_offset_seconds: f64,
    pub fades: FadeSpec,
    pub explicit_bgm_end_seconds: Option<f64>,
    pub bgm_volume: f32,
}

impl Default for MixParams {
    fn default() -> Self {
        Self {
            tts_duration_seconds: 0.0,
            bgm_duration_seconds: 0.0,
            bgm_offset_seconds: 0.0,
            fades: FadeSpec::default(),
            explicit_bgm_end_seconds: None,
            bgm_volume: DEFAULT_BGM_VOLUME,
        }
    }
}

impl MixParams {
    #[must_use]
    pub fn new(tts_duration_seconds: f64, bgm_duration_seconds: f64) -> Self {
        Self {
            tts_duration_seconds,
            bgm_duration_seconds,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_offset(mut self, bgm_offset_seconds: f64) -> Self {
        self.bgm_offset_seconds = bgm_offset_seconds;
        self
    }

    #[must_use]
    pub fn with_fades(mut self, fade_in_seconds: f64, fade_out_seconds: f64) -> Self {
        self.fades = FadeSpec::new(fade_in_seconds, fade_out_seconds);
        self
    }

    #[must_use]
    pub fn bgm_segment(&self) -> Option<AudioSegment> {
        if self.bgm_duration_seconds <= 0.0 {
            return None;
        }

        Some(AudioSegment::bgm(
            self.bgm_duration_seconds,
            self.bgm_offset_seconds,
        ))
    }

    #[must_use]
    pub fn timeline_input(&self) -> TimelineInput {
        TimelineInput {
            tts_duration_seconds: self.tts_duration_seconds,
            bgm_duration_seconds: self.bgm_duration_seconds,
            bgm_offset_seconds: self.bgm_offset_seconds,
            fade_in_seconds: self.fades.fade_in_seconds,
            fade_out_seconds: self.fades.fade_out_seconds,
            explicit_bgm_end_seconds: self.explicit_bgm_end_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    Draft,
    PendingReview,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BgmSettings {
    pub source_path: String,
    pub duration_seconds: f64,
    pub offset_seconds: f64,
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
    pub volume: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_end_seconds: Option<f64>,
}

impl Default for BgmSettings {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            duration_seconds: 0.0,
            offset_seconds: 0.0,
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
            volume: DEFAULT_BGM_VOLUME,
            explicit_end_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub title: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_audio_path: Option<String>,
    pub tts_duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm: Option<BgmSettings>,
    pub review_state: ReviewState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for GenerationRecord {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            script: String::new(),
            voice_id: None,
            created_at: Utc::now(),
            tts_audio_path: None,
            tts_duration_seconds: 0.0,
            bgm: None,
            review_state: ReviewState::default(),
            tags: Vec::new(),
        }
    }
}

impl GenerationRecord {
    #[must_use]
    pub fn new(title: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            script: script.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn mix_params(&self) -> MixParams {
        let Some(bgm) = &self.bgm else {
            return MixParams::new(self.tts_duration_seconds, 0.0);
        };

        MixParams {
            tts_duration_seconds: self.tts_duration_seconds,
            bgm_duration_seconds: bgm.duration_seconds,
            bgm_offset_seconds: bgm.offset_seconds,
            fades: FadeSpec::new(bgm.fade_in_seconds, bgm.fade_out_seconds),
            explicit_bgm_end_seconds: bgm.explicit_end_seconds,
            bgm_volume: bgm.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_record_json_fills_defaults() {
        let record: GenerationRecord =
            serde_json::from_str(r#"{"title":"Closing soon","tts_duration_seconds":12.5}"#)
                .expect("sparse record should parse");
        assert_eq!(record.title, "Closing soon");
        assert_eq!(record.review_state, ReviewState::Draft);
        assert!(record.bgm.is_none());
        assert!(record.tags.is_empty());

        let params = record.mix_params();
        assert_eq!(params.tts_duration_seconds, 12.5);
        assert!(params.bgm_segment().is_none());
    }

    #[test]
    fn record_bgm_maps_onto_mix_params() {
        let mut record = GenerationRecord::new("Fire drill", "Please proceed to the exits.");
        record.tts_duration_seconds = 10.0;
        record.bgm = Some(BgmSettings {
            source_path: "bgm/calm.mp3".to_string(),
            duration_seconds: 15.0,
            offset_seconds: -5.0,
            fade_in_seconds: 2.0,
            fade_out_seconds: 2.0,
            volume: 0.25,
            explicit_end_seconds: None,
        });

        let params = record.mix_params();
        assert_eq!(params.bgm_offset_seconds, -5.0);
        assert_eq!(params.fades, FadeSpec::new(2.0, 2.0));
        assert_eq!(params.bgm_volume, 0.25);

        let segment = params.bgm_segment().expect("bgm segment should exist");
        assert_eq!(segment.role, TrackRole::Bgm);
        assert_eq!(segment.end_seconds(), 10.0);
    }

    #[test]
    fn negative_fades_are_clamped() {
        let fades = FadeSpec::new(-1.0, 3.0);
        assert_eq!(fades.fade_in_seconds, 0.0);
        assert_eq!(fades.total_seconds(), 3.0);
    }
}
