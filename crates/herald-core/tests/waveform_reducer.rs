use herald_core::waveform::{
    WaveformRenderOptions, reduce_waveform, render_waveform, samples_per_column,
};
use proptest::prelude::*;

fn sine(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|frame| (frame as f32 * 0.05).sin() * 0.8)
        .collect()
}

#[test]
fn first_column_covers_first_ten_samples() {
    let mut samples = vec![0.0_f32; 1_000];
    samples[9] = 0.75;
    samples[10] = -0.9;

    assert_eq!(samples_per_column(samples.len(), 100), 10);
    let columns = reduce_waveform(&samples, 100);
    assert_eq!(columns.len(), 100);
    assert_eq!(columns[0].max_amplitude, 0.75);
    assert_eq!(columns[0].min_amplitude, 0.0);
    assert_eq!(columns[1].min_amplitude, -0.9);
    assert!((columns[1].amplitude - 0.9).abs() < 1e-6);
}

#[test]
fn zero_width_or_height_is_a_no_op() {
    let samples = sine(256);
    assert!(reduce_waveform(&samples, 0).is_empty());
    assert!(render_waveform(&samples, 0, 64, &WaveformRenderOptions::default()).is_blank());
    assert!(render_waveform(&samples, 64, 0, &WaveformRenderOptions::default()).is_blank());
}

#[test]
fn remainder_samples_past_last_column_are_ignored() {
    let mut samples = vec![0.1_f32; 105];
    samples[104] = 1.0;
    let columns = reduce_waveform(&samples, 10);
    assert_eq!(columns.len(), 10);
    assert!(columns.iter().all(|column| (column.amplitude - 0.1).abs() < 1e-6));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn reduction_is_deterministic(
        samples in prop::collection::vec(-1.0f32..=1.0, 0..4_096),
        width in 1usize..512,
    ) {
        prop_assert_eq!(reduce_waveform(&samples, width), reduce_waveform(&samples, width));
    }

    #[test]
    fn column_count_is_bounded(
        samples in prop::collection::vec(-1.0f32..=1.0, 1..4_096),
        width in 1usize..512,
    ) {
        let columns = reduce_waveform(&samples, width);
        prop_assert!(columns.len() <= width);
        prop_assert_eq!(columns.len(), width.min(samples.len()));
        for (index, column) in columns.iter().enumerate() {
            prop_assert_eq!(column.column_index, index);
        }
    }

    #[test]
    fn amplitudes_stay_in_range(
        samples in prop::collection::vec(-1.0f32..=1.0, 1..2_048),
        width in 1usize..256,
        height in 1usize..400,
    ) {
        let render = render_waveform(&samples, width, height, &WaveformRenderOptions::default());
        for column in &render.columns {
            prop_assert!((0.0..=1.0).contains(&column.amplitude));
            prop_assert!((0.0..=1.0).contains(&column.rms_amplitude));
            prop_assert!(column.min_amplitude <= column.max_amplitude);
            prop_assert!(column.amplitude + 1e-6 >= column.rms_amplitude);
        }
        for stroke in &render.strokes {
            prop_assert!(stroke.top_y >= render.center_y * 0.15 - 1e-3);
            prop_assert!(stroke.bottom_y <= render.center_y * 1.85 + 1e-3);
        }
    }
}
