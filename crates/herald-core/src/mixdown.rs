use std::{ffi::OsString, fs, path::Path, process::Command};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    assets::DecodedAudio,
    config::ExportConfig,
    envelope::{EnvelopePolicy, MixEnvelope, tts_gain},
    model::{DEFAULT_SAMPLE_RATE, MixParams},
    time::{frame_time_seconds, frames_to_seconds, seconds_to_frames},
};

/// Rendered mix. Frame zero sits at `origin_seconds` on the timeline, which is
/// negative when the BGM leads the speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixedAudio {
    pub origin_seconds: f64,
    pub audio: DecodedAudio,
}

impl MixedAudio {
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.audio.duration_seconds()
    }

    #[must_use]
    pub fn speech_start_frame(&self) -> u64 {
        seconds_to_frames(-self.origin_seconds, self.audio.sample_rate)
    }
}

#[instrument(skip_all, fields(policy = ?policy))]
pub fn render_mix(
    tts: &DecodedAudio,
    bgm: Option<&DecodedAudio>,
    params: &MixParams,
    policy: EnvelopePolicy,
) -> MixedAudio {
    let envelope = MixEnvelope::from_params(params, policy);
    mix_tracks(tts, bgm, params, &envelope)
}

#[instrument(skip_all, fields(tts_frames = tts.frame_count(), bgm_frames = ?bgm.map(DecodedAudio::frame_count)))]
pub fn mix_tracks(
    tts: &DecodedAudio,
    bgm: Option<&DecodedAudio>,
    params: &MixParams,
    envelope: &MixEnvelope,
) -> MixedAudio {
    let sample_rate = if tts.sample_rate == 0 {
        DEFAULT_SAMPLE_RATE
    } else {
        tts.sample_rate
    };
    let bgm = bgm
        .filter(|audio| audio.frame_count() > 0)
        .zip(params.bgm_segment());

    let tts_duration = frames_to_seconds(tts.frame_count() as u64, sample_rate);
    let (origin, end) = match bgm {
        Some((_, segment)) => (
            segment.start_offset_seconds.min(0.0),
            segment.end_seconds().max(tts_duration),
        ),
        None => (0.0, tts_duration),
    };

    let frame_count = usize::try_from(seconds_to_frames(end - origin, sample_rate)).unwrap_or(0);
    let speech_offset = seconds_to_frames(-origin, sample_rate) as usize;
    let channel_count = tts.channels.len().max(1);
    let bgm_volume = f64::from(params.bgm_volume.max(0.0));

    let mut channels = vec![vec![0.0_f32; frame_count]; channel_count];
    let mut audible_bgm_frames = 0_usize;
    for frame in 0..frame_count {
        let time = frame_time_seconds(origin, frame as u64, sample_rate);

        if let Some(speech_index) = frame.checked_sub(speech_offset) {
            let speech_gain = tts_gain(time) as f32;
            for (index, output) in channels.iter_mut().enumerate() {
                if let Some(sample) = tts.channel(index).get(speech_index) {
                    output[frame] += sample * speech_gain;
                }
            }
        }

        let Some((bgm, segment)) = bgm else {
            continue;
        };
        let bgm_gain = envelope.gain(time) * bgm_volume;
        if bgm_gain <= 0.0 {
            continue;
        }

        audible_bgm_frames += 1;
        let position = (time - segment.start_offset_seconds) * f64::from(bgm.sample_rate);
        for (index, output) in channels.iter_mut().enumerate() {
            let sample = looped_sample_at(bgm.channel(index), position);
            output[frame] += (f64::from(sample) * bgm_gain) as f32;
        }
    }

    for channel in &mut channels {
        for sample in channel.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    debug!(
        frames = frame_count,
        channels = channel_count,
        origin_seconds = origin,
        audible_bgm_frames,
        "mix render completed"
    );

    MixedAudio {
        origin_seconds: origin,
        audio: DecodedAudio::new(sample_rate, channels),
    }
}

#[instrument(skip(mixed), fields(path = %path.display()))]
pub fn export_wav(mixed: &MixedAudio, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create wav output directory: {}",
                parent.display()
            )
        })?;
    }

    let audio = &mixed.audio;
    let spec = hound::WavSpec {
        channels: audio.channel_count().max(1),
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create wav file: {}", path.display()))?;

    for frame in 0..audio.frame_count() {
        for channel in &audio.channels {
            let sample = channel.get(frame).copied().unwrap_or(0.0);
            let quantized = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
            writer
                .write_sample(quantized)
                .context("failed to write wav sample")?;
        }
    }

    writer.finalize().context("failed to finalize wav file")?;
    info!(frames = audio.frame_count(), "wav export completed");
    Ok(())
}

#[instrument(skip(mixed, export), fields(path = %path.display(), ffmpeg = %export.ffmpeg_binary.display()))]
pub fn export_mp3(mixed: &MixedAudio, path: &Path, export: &ExportConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create mp3 output directory: {}",
                parent.display()
            )
        })?;
    }

    let staging = tempfile::tempdir().context("failed to create mp3 staging directory")?;
    let staged_wav = staging.path().join("herald_mix.wav");
    export_wav(mixed, &staged_wav)?;

    let status = Command::new(&export.ffmpeg_binary)
        .args(ffmpeg_mp3_args(&staged_wav, path, export.mp3_quality))
        .status()
        .with_context(|| {
            format!(
                "failed to spawn ffmpeg: {}",
                export.ffmpeg_binary.display()
            )
        })?;

    if !status.success() {
        bail!("ffmpeg exited with status {status} while encoding {}", path.display());
    }

    info!(quality = export.mp3_quality, "mp3 export completed");
    Ok(())
}

fn ffmpeg_mp3_args(input: &Path, output: &Path, quality: u8) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.as_os_str().to_owned());
    args.extend(
        ["-codec:a", "libmp3lame", "-qscale:a"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(OsString::from(quality.min(9).to_string()));
    args.push(output.as_os_str().to_owned());
    args
}

fn looped_sample_at(channel: &[f32], position: f64) -> f32 {
    let len = channel.len();
    if len == 0 || position < 0.0 {
        return 0.0;
    }

    let wrapped = position % len as f64;
    let index = wrapped.floor() as usize % len;
    let fraction = (wrapped - wrapped.floor()) as f32;
    let current = channel[index];
    let next = channel[(index + 1) % len];
    current + (next - current) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_wraps_around_loop_point() {
        let channel = [0.0_f32, 1.0, 0.0, -1.0];
        assert_eq!(looped_sample_at(&channel, 1.0), 1.0);
        assert!((looped_sample_at(&channel, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(looped_sample_at(&channel, 5.0), 1.0);
        assert!((looped_sample_at(&channel, 3.5) - -0.5).abs() < 1e-6);
        assert_eq!(looped_sample_at(&[], 3.0), 0.0);
    }

    #[test]
    fn mp3_args_keep_paths_and_clamp_quality() {
        let args = ffmpeg_mp3_args(Path::new("in dir/mix.wav"), Path::new("out/mix.mp3"), 12);
        let args: Vec<_> = args.iter().map(|arg| arg.to_string_lossy()).collect();
        assert_eq!(args[5], "in dir/mix.wav");
        assert_eq!(args[9], "9");
        assert_eq!(args[10], "out/mix.mp3");
    }
}
