use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    envelope::EnvelopePolicy,
    model::{DEFAULT_BGM_VOLUME, FadeSpec, MixParams},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixSettings {
    pub default_fade_in_seconds: f64,
    pub default_fade_out_seconds: f64,
    pub default_bgm_offset_seconds: f64,
    pub default_bgm_volume: f32,
    pub envelope: EnvelopePolicy,
    pub waveform_width: usize,
    pub waveform_height: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_bgm_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            default_fade_in_seconds: 2.0,
            default_fade_out_seconds: 3.0,
            default_bgm_offset_seconds: 0.0,
            default_bgm_volume: DEFAULT_BGM_VOLUME,
            envelope: EnvelopePolicy::default(),
            waveform_width: 800,
            waveform_height: 120,
            last_bgm_path: None,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl MixSettings {
    #[must_use]
    pub fn seed_params(&self, tts_duration_seconds: f64, bgm_duration_seconds: f64) -> MixParams {
        MixParams {
            tts_duration_seconds,
            bgm_duration_seconds,
            bgm_offset_seconds: self.default_bgm_offset_seconds,
            fades: FadeSpec::new(self.default_fade_in_seconds, self.default_fade_out_seconds),
            explicit_bgm_end_seconds: None,
            bgm_volume: self.default_bgm_volume,
        }
    }

    #[must_use]
    pub fn waveform_size(&self, width: Option<usize>, height: Option<usize>) -> (usize, usize) {
        (
            width.unwrap_or(self.waveform_width),
            height.unwrap_or(self.waveform_height),
        )
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[instrument(skip(settings), fields(path = %path.display()))]
pub fn save_settings(path: &Path, settings: &MixSettings) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;

    let json = serde_json::to_vec_pretty(settings).context("failed to serialize settings")?;
    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).context("failed to create temp settings file")?;
    temp_file
        .write_all(&json)
        .context("failed to write temp settings file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist settings: {}", path.display()))?;

    info!("settings saved");
    Ok(())
}

/// Reads settings from `path`. A missing file yields the defaults; a corrupt
/// one is an error.
#[instrument(fields(path = %path.display()))]
pub fn load_settings(path: &Path) -> Result<MixSettings> {
    if !path.exists() {
        debug!("settings file missing, using defaults");
        return Ok(MixSettings::default());
    }

    let content =
        fs::read(path).with_context(|| format!("failed to read settings: {}", path.display()))?;
    let settings: MixSettings =
        serde_json::from_slice(&content).context("invalid settings json")?;
    info!("settings loaded");
    Ok(settings)
}

#[must_use]
pub fn load_settings_or(path: &Path, fallback: MixSettings) -> MixSettings {
    if !path.exists() {
        debug!(path = %path.display(), "settings file missing, using fallback");
        return fallback;
    }

    match load_settings(path) {
        Ok(settings) => settings,
        Err(error) => {
            warn!(path = %path.display(), ?error, "settings unreadable, using fallback");
            fallback
        }
    }
}
