use serde::{Deserialize, Serialize};

use crate::{model::TrackRole, time::format_time_label};

pub const MIN_VISIBLE_SECONDS: f64 = 10.0;
pub const DEFAULT_TICK_DIVISIONS: u32 = 4;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineInput {
    pub tts_duration_seconds: f64,
    pub bgm_duration_seconds: f64,
    pub bgm_offset_seconds: f64,
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
    pub explicit_bgm_end_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineOptions {
    pub min_visible_seconds: f64,
    pub tick_divisions: u32,
    pub tick_margin_percent: f64,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            min_visible_seconds: MIN_VISIBLE_SECONDS,
            tick_divisions: DEFAULT_TICK_DIVISIONS,
            tick_margin_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentLayout {
    pub role: TrackRole,
    pub start_percent: f64,
    pub width_percent: f64,
}

impl SegmentLayout {
    #[must_use]
    pub fn end_percent(&self) -> f64 {
        self.start_percent + self.width_percent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeTick {
    pub seconds: f64,
    pub percent: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineLayout {
    pub total_duration_seconds: f64,
    pub scale_percent_per_second: f64,
    pub segments: Vec<SegmentLayout>,
    pub fade_in_width_percent: f64,
    pub fade_out_width_percent: f64,
    pub ticks: Vec<TimeTick>,
}

impl TimelineLayout {
    #[must_use]
    pub fn segment(&self, role: TrackRole) -> Option<&SegmentLayout> {
        self.segments.iter().find(|segment| segment.role == role)
    }

    #[must_use]
    pub fn fade_in_zone(&self) -> Option<(f64, f64)> {
        let bgm = self.segment(TrackRole::Bgm)?;
        if self.fade_in_width_percent <= 0.0 {
            return None;
        }

        Some((
            bgm.start_percent,
            bgm.width_percent * self.fade_in_width_percent / 100.0,
        ))
    }

    #[must_use]
    pub fn fade_out_zone(&self) -> Option<(f64, f64)> {
        let bgm = self.segment(TrackRole::Bgm)?;
        if self.fade_out_width_percent <= 0.0 {
            return None;
        }

        let width = bgm.width_percent * self.fade_out_width_percent / 100.0;
        Some((bgm.end_percent() - width, width))
    }
}

#[must_use]
pub fn compute_layout(input: &TimelineInput, options: &TimelineOptions) -> TimelineLayout {
    let tts_duration = input.tts_duration_seconds.max(0.0);
    let fade_in = input.fade_in_seconds.max(0.0);
    let fade_out = input.fade_out_seconds.max(0.0);
    let offset = input.bgm_offset_seconds;
    let offset_magnitude = offset.abs();

    let bgm_total_duration = input
        .explicit_bgm_end_seconds
        .unwrap_or(tts_duration + offset_magnitude);
    let min_bgm_duration = tts_duration + fade_in + fade_out;
    let actual_bgm_duration = bgm_total_duration.max(min_bgm_duration);
    let total_duration = actual_bgm_duration;
    let scale = percent_of(1.0, options.min_visible_seconds.max(total_duration));

    let mut segments = Vec::with_capacity(2);
    segments.push(SegmentLayout {
        role: TrackRole::Tts,
        start_percent: 0.0,
        width_percent: percent_of(tts_duration, total_duration),
    });

    let has_bgm = input.bgm_duration_seconds > 0.0;
    let mut fade_in_width_percent = 0.0;
    let mut fade_out_width_percent = 0.0;
    if has_bgm {
        let bgm_start_abs = if offset < 0.0 { offset_magnitude } else { 0.0 };
        segments.push(SegmentLayout {
            role: TrackRole::Bgm,
            start_percent: percent_of(bgm_start_abs, total_duration),
            width_percent: percent_of(actual_bgm_duration, total_duration),
        });

        if offset < 0.0 && fade_in > 0.0 {
            fade_in_width_percent = percent_of(fade_in, offset_magnitude).min(100.0);
        }
        if fade_out > 0.0 {
            fade_out_width_percent =
                percent_of(fade_out, input.bgm_duration_seconds).min(100.0);
        }
    }

    TimelineLayout {
        total_duration_seconds: total_duration,
        scale_percent_per_second: scale,
        segments,
        fade_in_width_percent,
        fade_out_width_percent,
        ticks: build_ticks(total_duration, scale, options),
    }
}

fn build_ticks(total_duration: f64, scale: f64, options: &TimelineOptions) -> Vec<TimeTick> {
    let divisions = options.tick_divisions.max(1);
    (0..=divisions)
        .map(|index| {
            let seconds = total_duration * f64::from(index) / f64::from(divisions);
            TimeTick {
                seconds,
                percent: options.tick_margin_percent + seconds * scale,
                label: format_time_label(seconds),
            }
        })
        .collect()
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn leading_bgm_layout_matches_worked_example() {
        let layout = compute_layout(
            &TimelineInput {
                tts_duration_seconds: 10.0,
                bgm_duration_seconds: 15.0,
                bgm_offset_seconds: -5.0,
                fade_in_seconds: 2.0,
                fade_out_seconds: 2.0,
                explicit_bgm_end_seconds: None,
            },
            &TimelineOptions::default(),
        );

        assert!(close(layout.total_duration_seconds, 15.0));
        assert!(close(layout.scale_percent_per_second, 100.0 / 15.0));

        let tts = layout.segment(TrackRole::Tts).expect("tts segment");
        assert!(close(tts.start_percent, 0.0));
        assert!(close(tts.width_percent, 10.0 / 15.0 * 100.0));

        let bgm = layout.segment(TrackRole::Bgm).expect("bgm segment");
        assert!(close(bgm.start_percent, 5.0 / 15.0 * 100.0));
        assert!(close(bgm.width_percent, 100.0));

        assert!(close(layout.fade_in_width_percent, 40.0));
        assert!(close(layout.fade_out_width_percent, 2.0 / 15.0 * 100.0));
    }

    #[test]
    fn short_bgm_is_stretched_to_cover_fades() {
        let layout = compute_layout(
            &TimelineInput {
                tts_duration_seconds: 10.0,
                bgm_duration_seconds: 8.0,
                bgm_offset_seconds: 0.0,
                fade_in_seconds: 3.0,
                fade_out_seconds: 4.0,
                explicit_bgm_end_seconds: None,
            },
            &TimelineOptions::default(),
        );

        assert!(close(layout.total_duration_seconds, 17.0));
        assert!(close(layout.fade_in_width_percent, 0.0));
        assert!(layout.fade_in_zone().is_none());
    }

    #[test]
    fn explicit_end_overrides_computed_duration() {
        let layout = compute_layout(
            &TimelineInput {
                tts_duration_seconds: 10.0,
                bgm_duration_seconds: 30.0,
                bgm_offset_seconds: 0.0,
                fade_in_seconds: 0.0,
                fade_out_seconds: 0.0,
                explicit_bgm_end_seconds: Some(24.0),
            },
            &TimelineOptions::default(),
        );

        assert!(close(layout.total_duration_seconds, 24.0));
    }

    #[test]
    fn zero_bgm_duration_renders_only_tts() {
        let layout = compute_layout(
            &TimelineInput {
                tts_duration_seconds: 4.0,
                bgm_offset_seconds: -2.0,
                fade_in_seconds: 1.0,
                fade_out_seconds: 1.0,
                ..TimelineInput::default()
            },
            &TimelineOptions::default(),
        );

        assert_eq!(layout.segments.len(), 1);
        assert!(layout.segment(TrackRole::Bgm).is_none());
        assert!(close(layout.fade_in_width_percent, 0.0));
        assert!(close(layout.fade_out_width_percent, 0.0));
    }

    #[test]
    fn empty_input_never_produces_nan() {
        let layout = compute_layout(&TimelineInput::default(), &TimelineOptions::default());
        assert!(close(layout.total_duration_seconds, 0.0));
        assert!(close(layout.scale_percent_per_second, 10.0));
        for segment in &layout.segments {
            assert!(segment.start_percent.is_finite());
            assert!(segment.width_percent.is_finite());
        }
        assert!(layout.ticks.iter().all(|tick| tick.percent.is_finite()));
    }

    #[test]
    fn ticks_split_timeline_into_quarters() {
        let layout = compute_layout(
            &TimelineInput {
                tts_duration_seconds: 20.0,
                bgm_duration_seconds: 20.0,
                ..TimelineInput::default()
            },
            &TimelineOptions {
                tick_margin_percent: 2.0,
                ..TimelineOptions::default()
            },
        );

        let seconds: Vec<f64> = layout.ticks.iter().map(|tick| tick.seconds).collect();
        assert_eq!(seconds, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert!(close(layout.ticks[0].percent, 2.0));
        assert!(close(layout.ticks[4].percent, 102.0));
        assert_eq!(layout.ticks[2].label, "0:10");
    }

    #[test]
    fn fade_zones_sit_at_segment_edges() {
        let layout = compute_layout(
            &TimelineInput {
                tts_duration_seconds: 10.0,
                bgm_duration_seconds: 20.0,
                bgm_offset_seconds: -10.0,
                fade_in_seconds: 5.0,
                fade_out_seconds: 5.0,
                explicit_bgm_end_seconds: None,
            },
            &TimelineOptions::default(),
        );

        let (in_start, in_width) = layout.fade_in_zone().expect("fade-in zone");
        assert!(close(in_start, 50.0));
        assert!(close(in_width, 50.0));

        let (out_start, out_width) = layout.fade_out_zone().expect("fade-out zone");
        assert!(close(out_width, 25.0));
        assert!(close(out_start + out_width, 150.0));
    }
}
