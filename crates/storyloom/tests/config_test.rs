use std::io::Write;
use storyloom::{StageKind, StoryloomConfig};

#[test]
fn bundled_defaults_fill_every_section() {
    let config = StoryloomConfig::from_toml("").unwrap();
    assert_eq!(*config.gate.cooldown_ms(), 1000);
    assert_eq!(*config.gate.recovery_secs(), 60);
    assert_eq!(*config.gate.requests_per_minute(), Some(60));
    assert_eq!(*config.pipeline.image_workers(), 4);
    assert_eq!(*config.pipeline.audio_workers(), 2);
    assert_eq!(*config.defaults.words_per_chunk(), 500);
    assert_eq!(config.defaults.voice(), "Kore");
    assert!(config.defaults.art_style().is_none());
}

#[test]
fn user_values_override_defaults() {
    let config = StoryloomConfig::from_toml(
        r#"
        [gate]
        cooldown_ms = 250

        [defaults]
        words_per_chunk = 120
        art_style = "woodcut"
        "#,
    )
    .unwrap();
    assert_eq!(*config.gate.cooldown_ms(), 250);
    assert_eq!(*config.gate.recovery_secs(), 60);
    assert_eq!(*config.defaults.words_per_chunk(), 120);

    let stage = config.defaults.stage_config().unwrap();
    assert_eq!(stage.words_per_chunk(StageKind::Image), 120);
    assert_eq!(stage.words_per_chunk(StageKind::Audio), 120);
    assert_eq!(stage.art_style().as_deref(), Some("woodcut"));
    assert!(*stage.generate_images() && *stage.generate_audio() && *stage.merge_audio());
}

#[test]
fn zero_words_per_chunk_is_rejected_when_building_stage_config() {
    let config = StoryloomConfig::from_toml("[defaults]\nwords_per_chunk = 0").unwrap();
    assert!(config.defaults.stage_config().is_err());
}

#[test]
fn from_file_reads_a_single_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[pipeline]\nimage_workers = 8\n\n[storage]\nmerge_dir = \"out/merged\""
    )
    .unwrap();

    let config = StoryloomConfig::from_file(file.path()).unwrap();
    assert_eq!(*config.pipeline.image_workers(), 8);
    assert_eq!(*config.pipeline.text_workers(), 2);
    assert_eq!(config.storage.merge_dir(), std::path::Path::new("out/merged"));
    assert!(config.gate.requests_per_minute().is_none());
}

#[test]
fn malformed_file_is_a_config_error() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[pipeline]\nimage_workers = \"many\"").unwrap();

    let err = StoryloomConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration Error"));
}

#[test]
fn artifact_store_and_merger_use_storage_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        "[storage]\nartifact_dir = {:?}\nmerge_dir = {:?}",
        dir.path().join("a").to_string_lossy(),
        dir.path().join("m").to_string_lossy()
    );
    let config = StoryloomConfig::from_toml(&toml).unwrap();

    let store = config.artifact_store().unwrap();
    assert_eq!(store.base_path(), dir.path().join("a"));
    assert!(dir.path().join("a").is_dir());
    let merger = config.audio_merger();
    let item = storyloom::ItemId::new();
    assert_eq!(merger.item_dir(item), dir.path().join("m").join(item.to_string()).join("merged"));
}
