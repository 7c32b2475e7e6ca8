//! Tests for filesystem artifact storage.

use storyloom_error::StorageErrorKind;
use storyloom_interface::ArtifactStore;
use storyloom_storage::FileSystemArtifactStore;
use tempfile::TempDir;

#[tokio::test]
async fn test_save_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();

    let path = store.save(b"RIFF....WAVE", "item/audio/segment-0000.wav").await.unwrap();
    assert!(path.starts_with(temp_dir.path().join("item/audio")));
    assert_eq!(path.extension().unwrap(), "wav");
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("segment-0000-"));

    let bytes = store.read(&path).await.unwrap();
    assert_eq!(bytes, b"RIFF....WAVE");
}

#[tokio::test]
async fn test_identical_content_is_deduplicated() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();

    let first = store.save(b"same", "a/image.png").await.unwrap();
    let second = store.save(b"same", "a/image.png").await.unwrap();
    let different = store.save(b"other", "a/image.png").await.unwrap();

    assert_eq!(first, second);
    assert_ne!(first, different);
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let path = store.save(b"data", "x/clip.wav").await.unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_rejects_escaping_names() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();

    for name in ["../evil.wav", "/etc/passwd", ""] {
        let err = store.save(b"x", name).await.unwrap_err();
        assert!(matches!(err.kind, StorageErrorKind::InvalidPath(_)), "{name}");
    }

    let err = store.read(std::path::Path::new("/tmp/outside.wav")).await.unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::InvalidPath(_)));
}

#[tokio::test]
async fn test_delete_then_read_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSystemArtifactStore::new(temp_dir.path()).unwrap();
    let path = store.save(b"bye", "gone.png").await.unwrap();

    store.delete(&path).await.unwrap();
    let err = store.read(&path).await.unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::NotFound(_)));

    let err = store.delete(&path).await.unwrap_err();
    assert!(matches!(err.kind, StorageErrorKind::NotFound(_)));
}
