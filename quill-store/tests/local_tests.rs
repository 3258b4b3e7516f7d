use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use quill_store::{DirStore, DocumentStore, StoreError};
use tempfile::TempDir;

fn make_store() -> (TempDir, DirStore) {
    let dir = TempDir::new().unwrap();
    let store = DirStore::new(dir.path()).unwrap();
    (dir, store)
}

#[tokio::test]
async fn write_then_read_roundtrip() {
    let (_dir, store) = make_store();
    store
        .write("notes/deep/idea.md", "# Idea\n", None)
        .await
        .unwrap();

    assert!(store.exists("notes/deep/idea.md").await.unwrap());
    let doc = store.read("notes/deep/idea.md").await.unwrap();
    assert_eq!(doc.content, "# Idea\n");
}

#[tokio::test]
async fn root_must_be_a_directory() {
    assert!(DirStore::new("/definitely/not/a/real/dir").is_err());
}

#[tokio::test]
async fn traversal_is_rejected() {
    let (_dir, store) = make_store();
    match store.read("../outside.md").await {
        Err(StoreError::Permission(_)) => {}
        other => panic!("expected Permission, got {other:?}"),
    }
    assert!(store.write("/etc/passwd", "x", None).await.is_err());
}

#[tokio::test]
async fn explicit_modified_time_is_reported_back() {
    let (_dir, store) = make_store();
    let ts = Utc.with_ymd_and_hms(2025, 3, 10, 8, 30, 0).unwrap();
    store.write("a.md", "x", Some(ts)).await.unwrap();
    assert_eq!(store.read("a.md").await.unwrap().modified_at, ts);
}

#[tokio::test]
async fn plain_write_uses_filesystem_mtime() {
    let (_dir, store) = make_store();
    let before = Utc::now() - chrono::Duration::seconds(5);
    store.write("a.md", "x", None).await.unwrap();
    let doc = store.read("a.md").await.unwrap();
    assert!(doc.modified_at > before);
}

#[tokio::test]
async fn list_recurses_and_skips_hidden() {
    let (dir, store) = make_store();
    store.write("a.md", "1", None).await.unwrap();
    store.write("sub/b.md", "2", None).await.unwrap();
    std::fs::create_dir_all(dir.path().join(".obsidian")).unwrap();
    std::fs::write(dir.path().join(".obsidian/workspace.json"), "{}").unwrap();
    std::fs::write(dir.path().join(".hidden.md"), "secret").unwrap();

    let paths = store.list().await.unwrap();
    assert_eq!(paths, vec!["a.md", "sub/b.md"]);
}

#[tokio::test]
async fn no_temp_files_survive_a_write() {
    let (dir, store) = make_store();
    store.write("sub/a.md", "content", None).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path().join("sub"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["a.md"]);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (_dir, store) = make_store();
    store.write("a.md", "x", None).await.unwrap();
    store.delete("a.md").await.unwrap();
    assert!(!store.exists("a.md").await.unwrap());
    store.delete("a.md").await.unwrap();
}

#[tokio::test]
async fn rename_moves_the_file() {
    let (_dir, store) = make_store();
    store.write("old.md", "body", None).await.unwrap();
    store.rename("old.md", "archive/new.md").await.unwrap();

    assert!(!store.exists("old.md").await.unwrap());
    assert_eq!(store.read("archive/new.md").await.unwrap().content, "body");
}

#[tokio::test]
async fn rename_missing_is_not_found() {
    let (_dir, store) = make_store();
    match store.rename("ghost.md", "x.md").await {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}
