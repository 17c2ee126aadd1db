use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use herald_core::{
    DecodedAudio, EnvelopePolicy, FadeCurve, FadeInScope, GenerationRecord, HeraldConfig,
    MixEditor, MixPatch, MixSettings, MixSnapshot,
    assets::{analyze_audio_file_with_cache, decode_audio_file, scan_audio_assets},
    diagnostics::init_tracing,
    fingerprint::{demo_fingerprint, read_fingerprint, write_fingerprint},
    fixtures::{DEMO_SAMPLE_RATE, demo_record, synthetic_pad, synthetic_speech},
    mixdown::{MixedAudio, export_mp3, export_wav},
    model::{FadeSpec, MixParams},
    settings::{load_settings_or, save_settings},
    waveform::render_waveform,
};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "herald-cli")]
#[command(about = "Timeline, envelope, waveform and mixdown tools for announcement audio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    settings_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Layout(MixArgs),
    Envelope {
        #[command(flatten)]
        mix: MixArgs,

        #[arg(long, default_value_t = 0.5)]
        step: f64,
    },
    Waveform {
        input: PathBuf,

        #[arg(long)]
        width: Option<usize>,

        #[arg(long)]
        height: Option<usize>,

        #[arg(long)]
        cached: bool,
    },
    Mix {
        #[arg(long)]
        tts: PathBuf,

        #[arg(long)]
        bgm: Option<PathBuf>,

        #[arg(long)]
        record: Option<PathBuf>,

        #[command(flatten)]
        overrides: MixOverrides,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "wav")]
        format: OutputFormat,
    },
    Library {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    Demo {
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    Fingerprint {
        #[arg(long, default_value = "data/fingerprint/demo.json")]
        output: PathBuf,

        #[arg(long)]
        check: Option<PathBuf>,

        #[arg(long, default_value_t = 1e-4)]
        tolerance: f32,
    },
    Settings {
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,

        #[arg(long)]
        fade_in: Option<f64>,

        #[arg(long)]
        fade_out: Option<f64>,

        #[arg(long)]
        volume: Option<f32>,

        #[arg(long, value_enum)]
        curve: Option<CurveArg>,

        #[arg(long, value_enum)]
        fade_in_scope: Option<ScopeArg>,

        #[arg(long)]
        waveform_width: Option<usize>,

        #[arg(long)]
        waveform_height: Option<usize>,
    },
}

#[derive(Debug, Args)]
struct MixArgs {
    #[arg(long)]
    tts_duration: f64,

    #[arg(long, default_value_t = 0.0)]
    bgm_duration: f64,

    #[command(flatten)]
    overrides: MixOverrides,
}

#[derive(Debug, Args)]
struct MixOverrides {
    #[arg(long, allow_negative_numbers = true)]
    offset: Option<f64>,

    #[arg(long)]
    fade_in: Option<f64>,

    #[arg(long)]
    fade_out: Option<f64>,

    #[arg(long)]
    bgm_end: Option<f64>,

    #[arg(long)]
    volume: Option<f32>,
}

impl From<&MixOverrides> for MixPatch {
    fn from(value: &MixOverrides) -> Self {
        Self {
            bgm_offset_seconds: value.offset,
            fade_in_seconds: value.fade_in,
            fade_out_seconds: value.fade_out,
            explicit_bgm_end_seconds: value.bgm_end,
            bgm_volume: value.volume,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Wav,
    Mp3,
}

#[derive(Debug, Clone, ValueEnum)]
enum CurveArg {
    Linear,
    EqualPower,
}

impl From<CurveArg> for FadeCurve {
    fn from(value: CurveArg) -> Self {
        match value {
            CurveArg::Linear => Self::Linear,
            CurveArg::EqualPower => Self::EqualPower,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum ScopeArg {
    Always,
    LeadingOnly,
}

impl From<ScopeArg> for FadeInScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Always => Self::Always,
            ScopeArg::LeadingOnly => Self::LeadingOnly,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = HeraldConfig::load_or_default();
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.paths.logs_dir.clone());
    let _telemetry = init_tracing(&log_dir, &config.diagnostics)?;

    let settings_path = cli
        .settings_file
        .clone()
        .unwrap_or_else(|| config.paths.settings_path.clone());
    let settings = load_settings_or(&settings_path, config.default_settings());

    match cli.command {
        Commands::Layout(args) => {
            let editor = editor_for(&config, settings, &args)?;
            print_json(&editor.layout())?;
        }
        Commands::Envelope { mix, step } => {
            let editor = editor_for(&config, settings, &mix)?;
            print_json(&editor.envelope().sample(step))?;
        }
        Commands::Waveform {
            input,
            width,
            height,
            cached,
        } => {
            let (width, height) = settings.waveform_size(width, height);
            if cached {
                let analysis =
                    analyze_audio_file_with_cache(&input, &config.waveform.cache_dir, width)?;
                print_json(&analysis)?;
            } else {
                let decoded = decode_audio_file(&input)?;
                let options = config
                    .waveform
                    .render_options(Some(decoded.duration_seconds()));
                let render = render_waveform(
                    decoded.first_channel(),
                    width,
                    height,
                    &options,
                );
                print_json(&render)?;
            }
        }
        Commands::Mix {
            tts,
            bgm,
            record,
            overrides,
            output,
            format,
        } => {
            let tts_audio = decode_audio_file(&tts)?;
            let bgm_audio = bgm.as_deref().map(decode_audio_file).transpose()?;

            let mut editor = MixEditor::from_config(&config, settings);
            match record {
                Some(record_path) => {
                    let record = read_record(&record_path)?;
                    let mut params = record.mix_params();
                    params.tts_duration_seconds = tts_audio.duration_seconds();
                    apply_params(&mut editor, &params)?;
                }
                None => {
                    let bgm_duration = bgm_audio
                        .as_ref()
                        .map_or(0.0, DecodedAudio::duration_seconds);
                    editor.load_tracks(tts_audio.duration_seconds(), bgm_duration)?;
                }
            }
            editor.apply(MixPatch::from(&overrides))?;

            let mixed = editor.render(&tts_audio, bgm_audio.as_ref());
            write_mix(&mixed, &output, &format, &config)?;
            tracing::info!(path = %output.display(), "mix exported");
        }
        Commands::Library { dir } => {
            let dir = dir.unwrap_or_else(|| config.paths.bgm_library_dir.clone());
            print_json(&scan_audio_assets(&dir)?)?;
        }
        Commands::Demo { output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| config.paths.export_dir.clone());
            std::fs::create_dir_all(&output_dir)?;

            let record = demo_record();
            let params = record.mix_params();
            let tts = synthetic_speech(params.tts_duration_seconds, DEMO_SAMPLE_RATE);
            let bgm = synthetic_pad(params.bgm_duration_seconds, DEMO_SAMPLE_RATE);

            let mut editor = MixEditor::from_config(&config, settings);
            let snapshot = apply_params(&mut editor, &params)?;
            std::fs::write(
                output_dir.join("demo.record.json"),
                serde_json::to_vec_pretty(&record)?,
            )?;
            std::fs::write(
                output_dir.join("demo.layout.json"),
                serde_json::to_vec_pretty(&snapshot.layout)?,
            )?;

            let mixed = editor.render(&tts, Some(&bgm));
            export_wav(&mixed, &output_dir.join("demo.wav"))?;
            tracing::info!(path = %output_dir.display(), "demo mix written");
        }
        Commands::Fingerprint {
            output,
            check,
            tolerance,
        } => {
            let fingerprint = demo_fingerprint();
            write_fingerprint(&output, &fingerprint)?;
            tracing::info!(path = %output.display(), "fingerprint generated");

            if let Some(baseline_path) = check {
                let baseline = read_fingerprint(&baseline_path)?;
                let drift = fingerprint.drift_from(&baseline, tolerance);
                print_json(&drift)?;
                if !drift.is_empty() {
                    anyhow::bail!(
                        "fingerprint drifted from {} in {} place(s)",
                        baseline_path.display(),
                        drift.len()
                    );
                }
            }
        }
        Commands::Settings {
            offset,
            fade_in,
            fade_out,
            volume,
            curve,
            fade_in_scope,
            waveform_width,
            waveform_height,
        } => {
            let mut editor = MixEditor::from_config(&config, settings);
            editor.update_settings(|settings| {
                let fades = FadeSpec::new(
                    fade_in.unwrap_or(settings.default_fade_in_seconds),
                    fade_out.unwrap_or(settings.default_fade_out_seconds),
                );
                let envelope = EnvelopePolicy {
                    curve: curve.map_or(settings.envelope.curve, Into::into),
                    fade_in_scope: fade_in_scope
                        .map_or(settings.envelope.fade_in_scope, Into::into),
                };
                apply_setting_changes(settings, offset, fades, volume, envelope);
                (settings.waveform_width, settings.waveform_height) =
                    settings.waveform_size(waveform_width, waveform_height);
            });
            save_settings(&settings_path, editor.settings())?;
            print_json(editor.settings())?;
        }
    }

    Ok(())
}

fn editor_for(
    config: &HeraldConfig,
    settings: MixSettings,
    args: &MixArgs,
) -> anyhow::Result<MixEditor> {
    let mut editor = MixEditor::from_config(config, settings);
    editor.load_tracks(args.tts_duration, args.bgm_duration)?;
    editor.apply(MixPatch::from(&args.overrides))?;
    Ok(editor)
}

fn apply_params(
    editor: &mut MixEditor,
    params: &MixParams,
) -> anyhow::Result<MixSnapshot> {
    editor.load_tracks(params.tts_duration_seconds, params.bgm_duration_seconds)?;
    let snapshot = editor.apply(MixPatch {
        bgm_offset_seconds: Some(params.bgm_offset_seconds),
        fade_in_seconds: Some(params.fades.fade_in_seconds),
        fade_out_seconds: Some(params.fades.fade_out_seconds),
        explicit_bgm_end_seconds: params.explicit_bgm_end_seconds,
        clear_explicit_bgm_end: params.explicit_bgm_end_seconds.is_none(),
        bgm_volume: Some(params.bgm_volume),
        ..MixPatch::default()
    })?;
    Ok(snapshot)
}

fn apply_setting_changes(
    settings: &mut MixSettings,
    offset: Option<f64>,
    fades: FadeSpec,
    volume: Option<f32>,
    envelope: EnvelopePolicy,
) {
    if let Some(offset) = offset {
        settings.default_bgm_offset_seconds = offset;
    }
    settings.default_fade_in_seconds = fades.fade_in_seconds;
    settings.default_fade_out_seconds = fades.fade_out_seconds;
    if let Some(volume) = volume {
        settings.default_bgm_volume = volume.max(0.0);
    }
    settings.envelope = envelope;
}

fn read_record(path: &Path) -> anyhow::Result<GenerationRecord> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read generation record: {}", path.display()))?;
    serde_json::from_slice(&bytes).context("invalid generation record json")
}

fn write_mix(
    mixed: &MixedAudio,
    output: &Path,
    format: &OutputFormat,
    config: &HeraldConfig,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Wav => export_wav(mixed, output),
        OutputFormat::Mp3 => export_mp3(mixed, output, &config.export),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
