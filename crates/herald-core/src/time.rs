#[must_use]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if seconds <= 0.0 || sample_rate == 0 {
        return 0;
    }

    (seconds * f64::from(sample_rate)).round() as u64
}

#[must_use]
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }

    frames as f64 / f64::from(sample_rate)
}

#[must_use]
pub fn frame_time_seconds(origin_seconds: f64, frame: u64, sample_rate: u32) -> f64 {
    origin_seconds + frames_to_seconds(frame, sample_rate)
}

#[must_use]
pub fn format_time_label(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let tenths = (seconds * 10.0).round() as u64;
    let whole_seconds = tenths / 10;
    let minutes = whole_seconds / 60;
    let remainder = whole_seconds % 60;
    let fraction = tenths % 10;
    if fraction == 0 {
        format!("{minutes}:{remainder:02}")
    } else {
        format!("{minutes}:{remainder:02}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trip_is_stable() {
        let sample_rate = 48_000;
        let frames = 123_456;
        let seconds = frames_to_seconds(frames, sample_rate);
        assert_eq!(seconds_to_frames(seconds, sample_rate), frames);
    }

    #[test]
    fn zero_sample_rate_is_inert() {
        assert_eq!(seconds_to_frames(3.0, 0), 0);
        assert_eq!(frames_to_seconds(3, 0), 0.0);
    }

    #[test]
    fn frame_time_honours_negative_origin() {
        let t = frame_time_seconds(-5.0, 24_000, 48_000);
        assert!((t - -4.5).abs() < 1e-12);
    }

    #[test]
    fn time_labels_format_minutes_and_tenths() {
        assert_eq!(format_time_label(0.0), "0:00");
        assert_eq!(format_time_label(3.75), "0:03.8");
        assert_eq!(format_time_label(15.0), "0:15");
        assert_eq!(format_time_label(125.0), "2:05");
        assert_eq!(format_time_label(f64::NAN), "0:00");
    }
}
