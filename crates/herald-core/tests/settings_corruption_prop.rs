use herald_core::settings::{MixSettings, load_settings, load_settings_or, save_settings};
use proptest::prelude::*;

fn fixture_settings() -> MixSettings {
    MixSettings {
        default_fade_in_seconds: 1.5,
        default_bgm_offset_seconds: -4.0,
        last_bgm_path: Some("library/ambient pad.wav".to_string()),
        ..MixSettings::default()
    }
}

fn no_panic_load(path: &std::path::Path) -> bool {
    std::panic::catch_unwind(|| {
        let _ = load_settings(path);
    })
    .is_ok()
}

#[test]
fn missing_settings_file_yields_defaults() {
    let temp = tempfile::tempdir().expect("tempdir should be creatable");
    let settings =
        load_settings(&temp.path().join("absent.json")).expect("missing file should not error");
    assert_eq!(settings, MixSettings::default());
}

#[test]
fn saved_settings_load_back_identically() {
    let temp = tempfile::tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("nested").join("settings.json");
    save_settings(&path, &fixture_settings()).expect("saving settings should work");

    let loaded = load_settings(&path).expect("loading settings should work");
    assert_eq!(loaded, fixture_settings());
}

#[test]
fn corrupt_settings_fall_back() {
    let temp = tempfile::tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("settings.json");
    std::fs::write(&path, b"{ not json").expect("writing corrupt payload should work");

    assert!(load_settings(&path).is_err());
    assert_eq!(load_settings_or(&path, fixture_settings()), fixture_settings());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_settings_bytes_do_not_panic(raw in prop::collection::vec(any::<u8>(), 0..4096)) {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("corrupt_random.json");
        std::fs::write(&path, raw).expect("writing random payload should work");
        prop_assert!(no_panic_load(&path));
    }

    #[test]
    fn truncated_settings_payloads_do_not_panic(prefix_len in 0usize..1024usize) {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("corrupt_truncated.json");
        save_settings(&path, &fixture_settings()).expect("saving fixture settings should work");

        let mut payload = std::fs::read(&path).expect("reading saved settings should work");
        let truncated_len = prefix_len.min(payload.len());
        payload.truncate(truncated_len);
        std::fs::write(&path, payload).expect("writing truncated payload should work");

        prop_assert!(no_panic_load(&path));
    }

    #[test]
    fn mutated_settings_payloads_do_not_panic(index in 0usize..1024usize, delta in any::<u8>()) {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("corrupt_mutated.json");
        save_settings(&path, &fixture_settings()).expect("saving fixture settings should work");

        let mut payload = std::fs::read(&path).expect("reading saved settings should work");
        if !payload.is_empty() {
            let target = index % payload.len();
            payload[target] ^= delta.max(1);
        }
        std::fs::write(&path, payload).expect("writing mutated payload should work");

        prop_assert!(no_panic_load(&path));
    }
}
