use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    diagnostics::DEFAULT_LOG_FILTER,
    envelope::EnvelopePolicy,
    model::DEFAULT_BGM_VOLUME,
    settings::MixSettings,
    timeline::TimelineOptions,
    waveform::{DEFAULT_GRIDLINE_DIVISIONS, DEFAULT_HEADROOM, WaveformRenderOptions},
};

pub const CONFIG_FILE_NAME: &str = "herald.config.toml";
pub const CONFIG_PATH_ENV: &str = "HERALD_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub timeline: TimelineOptions,
    pub waveform: WaveformConfig,
    pub mix: MixConfig,
    pub diagnostics: DiagnosticsConfig,
    pub paths: PathsConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    pub default_width: usize,
    pub default_height: usize,
    pub headroom: f32,
    pub gridline_divisions: u32,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    pub envelope: EnvelopePolicy,
    pub default_bgm_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub logs_dir: PathBuf,
    pub settings_path: PathBuf,
    pub bgm_library_dir: PathBuf,
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub ffmpeg_binary: PathBuf,
    pub mp3_quality: u8,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 120,
            headroom: DEFAULT_HEADROOM,
            gridline_divisions: DEFAULT_GRIDLINE_DIVISIONS,
            cache_dir: PathBuf::from("data/waveform-cache"),
        }
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            envelope: EnvelopePolicy::default(),
            default_bgm_volume: DEFAULT_BGM_VOLUME,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: DEFAULT_LOG_FILTER.to_string(),
            trace_file_prefix: "herald".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            settings_path: PathBuf::from("data/settings.json"),
            bgm_library_dir: PathBuf::from("data/bgm-library"),
            export_dir: PathBuf::from("data/exports"),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            mp3_quality: 2,
        }
    }
}

impl WaveformConfig {
    #[must_use]
    pub fn render_options(&self, duration_seconds: Option<f64>) -> WaveformRenderOptions {
        WaveformRenderOptions {
            headroom: self.headroom,
            gridline_divisions: self.gridline_divisions,
            duration_seconds,
        }
    }
}

impl HeraldConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;

        Self::from_toml_str(&content).with_context(|| {
            format!("failed to parse config TOML from {}", config_path.display())
        })
    }

    #[must_use]
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(error) => {
                warn!(?error, "using default configuration");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn default_settings(&self) -> MixSettings {
        MixSettings {
            envelope: self.mix.envelope,
            default_bgm_volume: self.mix.default_bgm_volume,
            waveform_width: self.waveform.default_width,
            waveform_height: self.waveform.default_height,
            ..MixSettings::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HeraldConfig = toml::from_str(content)?;
        Ok(config)
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| Path::new(path).is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}
