use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::{Cursor, ErrorKind},
    path::Path,
    time::UNIX_EPOCH,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::{
    time::frames_to_seconds,
    waveform::{WaveformColumn, reduce_waveform},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioWaveformColumns {
    pub width: usize,
    pub columns: Vec<WaveformColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioAnalysis {
    pub source_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: u64,
    pub duration_seconds: f64,
    pub waveform: AudioWaveformColumns,
    pub cache_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioAssetEntry {
    pub path: String,
    pub extension: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    #[must_use]
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    #[must_use]
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    #[must_use]
    pub fn channel_count(&self) -> u16 {
        u16::try_from(self.channels.len()).unwrap_or(u16::MAX)
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.first_channel().len()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        frames_to_seconds(self.frame_count() as u64, self.sample_rate)
    }

    #[must_use]
    pub fn first_channel(&self) -> &[f32] {
        self.channels.first().map_or(&[], Vec::as_slice)
    }

    /// Channel `index`, falling back to the last channel for narrower sources.
    #[must_use]
    pub fn channel(&self, index: usize) -> &[f32] {
        self.channels
            .get(index)
            .or_else(|| self.channels.last())
            .map_or(&[], Vec::as_slice)
    }
}

#[instrument(fields(path = %path.display(), width))]
pub fn analyze_audio_file(path: &Path, width: usize) -> Result<AudioAnalysis> {
    if width == 0 {
        return Err(anyhow::anyhow!("waveform width must be greater than zero"));
    }

    let decoded = decode_audio_file(path)?;
    let columns = reduce_waveform(decoded.first_channel(), width);

    Ok(AudioAnalysis {
        source_path: path.display().to_string(),
        sample_rate: decoded.sample_rate,
        channels: decoded.channel_count(),
        total_frames: decoded.frame_count() as u64,
        duration_seconds: decoded.duration_seconds(),
        waveform: AudioWaveformColumns { width, columns },
        cache_path: None,
    })
}

#[instrument(fields(path = %path.display(), width, cache_dir = %cache_dir.display()))]
pub fn analyze_audio_file_with_cache(
    path: &Path,
    cache_dir: &Path,
    width: usize,
) -> Result<AudioAnalysis> {
    if width == 0 {
        return Err(anyhow::anyhow!("waveform width must be greater than zero"));
    }

    fs::create_dir_all(cache_dir).with_context(|| {
        format!(
            "failed to create waveform cache dir: {}",
            cache_dir.display()
        )
    })?;

    let hash = asset_hash(path)?;
    let cache_path = cache_dir.join(format!("{hash}.waveform.json"));
    if cache_path.is_file() {
        let cached_bytes = fs::read(&cache_path)
            .with_context(|| format!("failed to read waveform cache {}", cache_path.display()))?;
        match serde_json::from_slice::<AudioAnalysis>(&cached_bytes) {
            Ok(mut cached) if cached.waveform.width == width => {
                cached.cache_path = Some(cache_path.display().to_string());
                debug!(path = %cache_path.display(), "waveform cache hit");
                return Ok(cached);
            }
            Ok(_) => {
                warn!(
                    path = %cache_path.display(),
                    "waveform cache width mismatch, regenerating"
                );
            }
            Err(error) => {
                warn!(
                    path = %cache_path.display(),
                    ?error,
                    "waveform cache parse failed, regenerating"
                );
            }
        }
    }

    let mut analysis = analyze_audio_file(path, width)?;
    analysis.cache_path = Some(cache_path.display().to_string());
    let json = serde_json::to_vec_pretty(&analysis).context("failed to encode analysis json")?;
    fs::write(&cache_path, json)
        .with_context(|| format!("failed to write waveform cache: {}", cache_path.display()))?;
    Ok(analysis)
}

#[instrument(fields(path = %path.display()))]
pub fn decode_audio_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|value| value.to_str()) {
        hint.with_extension(extension);
    }

    decode_media_source(source, &hint, &path.display().to_string())
}

#[instrument(skip(bytes), fields(len = bytes.len(), extension))]
pub fn decode_audio_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    decode_media_source(source, &hint, "in-memory audio")
}

#[instrument(fields(directory = %directory.display()))]
pub fn scan_audio_assets(directory: &Path) -> Result<Vec<AudioAssetEntry>> {
    if !directory.exists() {
        fs::create_dir_all(directory).with_context(|| {
            format!(
                "failed to create bgm library directory: {}",
                directory.display()
            )
        })?;
        debug!(
            directory = %directory.display(),
            "bgm library directory missing, created empty directory"
        );
        return Ok(Vec::new());
    }

    if !directory.is_dir() {
        return Err(anyhow::anyhow!(
            "bgm library path is not a directory: {}",
            directory.display()
        ));
    }

    let extensions = supported_audio_extensions();
    let mut assets = Vec::new();

    for entry in WalkDir::new(directory).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(?error, "ignoring unreadable entry while scanning bgm library");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let extension = entry
            .path()
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.to_ascii_lowercase());
        let Some(extension) = extension else {
            continue;
        };
        if !extensions.contains(extension.as_str()) {
            continue;
        }

        let size_bytes = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
        assets.push(AudioAssetEntry {
            path: entry.path().display().to_string(),
            extension,
            size_bytes,
        });
    }

    assets.sort_by(|left, right| left.path.cmp(&right.path));
    debug!(count = assets.len(), "bgm library scan complete");
    Ok(assets)
}

fn decode_media_source(source: MediaSourceStream, hint: &Hint, label: &str) -> Result<DecodedAudio> {
    let detected = symphonia::default::get_probe().format(
        hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = detected.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no default audio track found in {label}"))?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(48_000);
    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(error)) if error.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(anyhow::anyhow!("audio stream reset required for {label}"));
            }
            Err(error) => return Err(error.into()),
        };

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => {
                continue;
            }
            Err(error) => return Err(error.into()),
        };

        sample_rate = decoded.spec().rate;
        push_channel_samples(decoded, &mut channels);
    }

    if channels.first().is_none_or(Vec::is_empty) {
        return Err(anyhow::anyhow!("decoded zero samples from {label}"));
    }

    debug!(
        sample_rate,
        channels = channels.len(),
        total_frames = channels[0].len(),
        "audio decode complete"
    );

    Ok(DecodedAudio::new(sample_rate, channels))
}

fn push_channel_samples(
    decoded: symphonia::core::audio::AudioBufferRef<'_>,
    channels: &mut Vec<Vec<f32>>,
) {
    let spec = *decoded.spec();
    let channel_count = spec.channels.count().max(1);
    if channels.len() < channel_count {
        let frames_so_far = channels.first().map_or(0, Vec::len);
        channels.resize_with(channel_count, || vec![0.0; frames_so_far]);
    }

    let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
    sample_buffer.copy_interleaved_ref(decoded);

    for frame in sample_buffer.samples().chunks(channel_count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
}

fn asset_hash(path: &Path) -> Result<String> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize asset path: {}", path.display()))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect asset metadata: {}", canonical.display()))?;
    let modified_seconds = metadata
        .modified()
        .ok()
        .and_then(|value| value.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |value| value.as_secs());

    let payload = format!(
        "{}:{}:{}",
        canonical.display(),
        metadata.len(),
        modified_seconds
    );
    let digest = Sha256::digest(payload.as_bytes());
    Ok(format!("{digest:x}"))
}

fn supported_audio_extensions() -> BTreeSet<&'static str> {
    ["wav", "flac", "mp3", "ogg", "m4a", "aiff", "aif", "caf"]
        .into_iter()
        .collect()
}
