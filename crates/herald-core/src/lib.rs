pub mod assets;
pub mod config;
pub mod diagnostics;
pub mod editor;
pub mod envelope;
pub mod fingerprint;
pub mod fixtures;
pub mod mixdown;
pub mod model;
pub mod settings;
pub mod time;
pub mod timeline;
pub mod waveform;

pub use assets::{
    AudioAnalysis, AudioAssetEntry, AudioWaveformColumns, DecodedAudio, analyze_audio_file,
    analyze_audio_file_with_cache, decode_audio_bytes, decode_audio_file, scan_audio_assets,
};
pub use config::HeraldConfig;
pub use diagnostics::{TelemetryGuard, init_tracing};
pub use editor::{EditorError, MixEditor, MixPatch, MixSnapshot};
pub use envelope::{EnvelopePolicy, FadeCurve, FadeInScope, MixEnvelope, tts_gain};
pub use fingerprint::{MixFingerprint, generate_fingerprint};
pub use mixdown::{MixedAudio, export_mp3, export_wav, mix_tracks, render_mix};
pub use model::{
    AudioSegment, BgmSettings, FadeSpec, GenerationRecord, MixParams, ReviewState, TrackRole,
};
pub use settings::MixSettings;
pub use timeline::{
    SegmentLayout, TimeTick, TimelineInput, TimelineLayout, TimelineOptions, compute_layout,
};
pub use waveform::{
    ColumnStroke, WaveformColumn, WaveformRender, WaveformRenderOptions, reduce_waveform,
    render_waveform,
};
