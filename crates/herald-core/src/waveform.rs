use serde::{Deserialize, Serialize};

use crate::time::format_time_label;

pub const DEFAULT_HEADROOM: f32 = 0.85;
pub const DEFAULT_GRIDLINE_DIVISIONS: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WaveformColumn {
    pub column_index: usize,
    pub min_amplitude: f32,
    pub max_amplitude: f32,
    pub rms_amplitude: f32,
    pub amplitude: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ColumnStroke {
    pub x: usize,
    pub top_y: f32,
    pub bottom_y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gridline {
    pub x: f32,
    pub seconds: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WaveformRenderOptions {
    pub headroom: f32,
    pub gridline_divisions: u32,
    pub duration_seconds: Option<f64>,
}

impl Default for WaveformRenderOptions {
    fn default() -> Self {
        Self {
            headroom: DEFAULT_HEADROOM,
            gridline_divisions: DEFAULT_GRIDLINE_DIVISIONS,
            duration_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaveformRender {
    pub width: usize,
    pub height: usize,
    pub center_y: f32,
    pub columns: Vec<WaveformColumn>,
    pub strokes: Vec<ColumnStroke>,
    pub gridlines: Vec<Gridline>,
}

impl WaveformRender {
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.strokes.is_empty()
    }
}

#[must_use]
pub fn samples_per_column(sample_count: usize, width: usize) -> usize {
    if width == 0 {
        return 1;
    }

    (sample_count / width).max(1)
}

/// Reduces `samples` to at most `width` columns. Columns past the end of the
/// buffer are not produced, so short buffers yield fewer than `width` columns.
#[must_use]
pub fn reduce_waveform(samples: &[f32], width: usize) -> Vec<WaveformColumn> {
    if samples.is_empty() || width == 0 {
        return Vec::new();
    }

    let per_column = samples_per_column(samples.len(), width);
    samples
        .chunks(per_column)
        .take(width)
        .enumerate()
        .map(|(column_index, chunk)| reduce_column(column_index, chunk))
        .collect()
}

#[must_use]
pub fn render_waveform(
    samples: &[f32],
    width: usize,
    height: usize,
    options: &WaveformRenderOptions,
) -> WaveformRender {
    let center_y = height as f32 / 2.0;
    let columns = if height == 0 {
        Vec::new()
    } else {
        reduce_waveform(samples, width)
    };

    let max_extent = center_y * options.headroom.clamp(0.0, 1.0);
    let strokes = columns
        .iter()
        .map(|column| {
            let extent = column.amplitude * max_extent;
            ColumnStroke {
                x: column.column_index,
                top_y: center_y - extent,
                bottom_y: center_y + extent,
            }
        })
        .collect();

    WaveformRender {
        width,
        height,
        center_y,
        columns,
        strokes,
        gridlines: build_gridlines(width, options),
    }
}

fn reduce_column(column_index: usize, chunk: &[f32]) -> WaveformColumn {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum_squares = 0.0_f64;
    for &sample in chunk {
        min = min.min(sample);
        max = max.max(sample);
        sum_squares += f64::from(sample) * f64::from(sample);
    }

    let rms = (sum_squares / chunk.len() as f64).sqrt() as f32;
    let amplitude = rms.max(max.abs()).max(min.abs()).clamp(0.0, 1.0);

    WaveformColumn {
        column_index,
        min_amplitude: min.clamp(-1.0, 1.0),
        max_amplitude: max.clamp(-1.0, 1.0),
        rms_amplitude: rms.clamp(0.0, 1.0),
        amplitude,
    }
}

fn build_gridlines(width: usize, options: &WaveformRenderOptions) -> Vec<Gridline> {
    let Some(duration) = options.duration_seconds.filter(|value| *value > 0.0) else {
        return Vec::new();
    };
    if width == 0 || options.gridline_divisions == 0 {
        return Vec::new();
    }

    let divisions = options.gridline_divisions;
    (0..=divisions)
        .map(|index| {
            let fraction = f64::from(index) / f64::from(divisions);
            let seconds = duration * fraction;
            Gridline {
                x: (width as f64 * fraction) as f32,
                seconds,
                label: format_time_label(seconds),
            }
        })
        .collect()
}
