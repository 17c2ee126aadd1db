use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    assets::DecodedAudio,
    config::HeraldConfig,
    envelope::MixEnvelope,
    mixdown::{MixedAudio, mix_tracks},
    model::{FadeSpec, MixParams},
    settings::{self, MixSettings},
    timeline::{TimelineLayout, TimelineOptions, compute_layout},
};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EditorError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MixPatch {
    pub tts_duration_seconds: Option<f64>,
    pub bgm_duration_seconds: Option<f64>,
    pub bgm_offset_seconds: Option<f64>,
    pub fade_in_seconds: Option<f64>,
    pub fade_out_seconds: Option<f64>,
    pub explicit_bgm_end_seconds: Option<f64>,
    pub clear_explicit_bgm_end: bool,
    pub bgm_volume: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixSnapshot {
    pub revision: u64,
    pub params: MixParams,
    pub layout: TimelineLayout,
    pub envelope: MixEnvelope,
}

type Listener = Box<dyn FnMut(&MixSnapshot) + Send>;

pub struct MixEditor {
    params: MixParams,
    settings: MixSettings,
    timeline_options: TimelineOptions,
    revision: u64,
    listeners: Vec<Listener>,
}

impl fmt::Debug for MixEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixEditor")
            .field("params", &self.params)
            .field("settings", &self.settings)
            .field("timeline_options", &self.timeline_options)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for MixEditor {
    fn default() -> Self {
        Self::new(MixSettings::default(), TimelineOptions::default())
    }
}

impl MixEditor {
    #[must_use]
    pub fn new(settings: MixSettings, timeline_options: TimelineOptions) -> Self {
        Self {
            params: settings.seed_params(0.0, 0.0),
            settings,
            timeline_options,
            revision: 0,
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &HeraldConfig, settings: MixSettings) -> Self {
        Self::new(settings, config.timeline)
    }

    #[must_use]
    pub fn params(&self) -> &MixParams {
        &self.params
    }

    #[must_use]
    pub fn settings(&self) -> &MixSettings {
        &self.settings
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn layout(&self) -> TimelineLayout {
        compute_layout(&self.params.timeline_input(), &self.timeline_options)
    }

    #[must_use]
    pub fn envelope(&self) -> MixEnvelope {
        MixEnvelope::from_params(&self.params, self.settings.envelope)
    }

    #[must_use]
    pub fn snapshot(&self) -> MixSnapshot {
        MixSnapshot {
            revision: self.revision,
            params: self.params.clone(),
            layout: self.layout(),
            envelope: self.envelope(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&MixSnapshot) + Send + 'static) {
        self.listeners.push(Box::new(listener));
        debug!(listeners = self.listeners.len(), "mix listener registered");
    }

    #[instrument(skip(self), fields(revision = self.revision))]
    pub fn load_tracks(
        &mut self,
        tts_duration_seconds: f64,
        bgm_duration_seconds: f64,
    ) -> Result<MixSnapshot, EditorError> {
        let tts_duration_seconds = non_negative("tts_duration_seconds", tts_duration_seconds)?;
        let bgm_duration_seconds = non_negative("bgm_duration_seconds", bgm_duration_seconds)?;

        self.params = self
            .settings
            .seed_params(tts_duration_seconds, bgm_duration_seconds);
        info!("tracks loaded into mix editor");
        Ok(self.commit())
    }

    #[instrument(skip(self, patch), fields(revision = self.revision))]
    pub fn apply(&mut self, patch: MixPatch) -> Result<MixSnapshot, EditorError> {
        let mut next = self.params.clone();

        if let Some(value) = patch.tts_duration_seconds {
            next.tts_duration_seconds = non_negative("tts_duration_seconds", value)?;
        }
        if let Some(value) = patch.bgm_duration_seconds {
            next.bgm_duration_seconds = non_negative("bgm_duration_seconds", value)?;
        }
        if let Some(value) = patch.bgm_offset_seconds {
            next.bgm_offset_seconds = finite("bgm_offset_seconds", value)?;
        }

        let fade_in = match patch.fade_in_seconds {
            Some(value) => non_negative("fade_in_seconds", value)?,
            None => next.fades.fade_in_seconds,
        };
        let fade_out = match patch.fade_out_seconds {
            Some(value) => non_negative("fade_out_seconds", value)?,
            None => next.fades.fade_out_seconds,
        };
        next.fades = FadeSpec::new(fade_in, fade_out);

        if patch.clear_explicit_bgm_end {
            next.explicit_bgm_end_seconds = None;
        }
        if let Some(value) = patch.explicit_bgm_end_seconds {
            next.explicit_bgm_end_seconds = Some(non_negative("explicit_bgm_end_seconds", value)?);
        }
        if let Some(value) = patch.bgm_volume {
            next.bgm_volume = non_negative("bgm_volume", f64::from(value))? as f32;
        }

        if next == self.params {
            debug!("mix patch was a noop");
            return Ok(self.snapshot());
        }

        self.params = next;
        info!(
            offset = self.params.bgm_offset_seconds,
            fade_in = self.params.fades.fade_in_seconds,
            fade_out = self.params.fades.fade_out_seconds,
            "mix parameters patched"
        );
        Ok(self.commit())
    }

    #[instrument(skip(self, update), fields(revision = self.revision))]
    pub fn update_settings(&mut self, update: impl FnOnce(&mut MixSettings)) -> MixSnapshot {
        update(&mut self.settings);
        self.settings.touch();
        info!(envelope = ?self.settings.envelope, "mix settings updated");
        self.commit()
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn save_settings(&self, path: &Path) -> Result<(), EditorError> {
        settings::save_settings(path, &self.settings)?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn load_settings(&mut self, path: &Path) -> Result<MixSnapshot, EditorError> {
        self.settings = settings::load_settings(path)?;
        Ok(self.commit())
    }

    #[instrument(skip(self, tts, bgm), fields(revision = self.revision))]
    pub fn render(&self, tts: &DecodedAudio, bgm: Option<&DecodedAudio>) -> MixedAudio {
        mix_tracks(tts, bgm, &self.params, &self.envelope())
    }

    fn commit(&mut self) -> MixSnapshot {
        self.revision += 1;
        let snapshot = self.snapshot();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
        debug!(
            revision = snapshot.revision,
            total_duration = snapshot.layout.total_duration_seconds,
            "mix snapshot published"
        );
        snapshot
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, EditorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EditorError::NonFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, EditorError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(EditorError::Negative { field, value });
    }
    Ok(value)
}
