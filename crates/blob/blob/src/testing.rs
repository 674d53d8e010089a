use std::collections::HashSet;

use bytes::Bytes;
use futures::future::join_all;

use galleria_core::StoredName;

use crate::error::BlobError;
use crate::store::BlobStore;

/// Run the full blob store conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if any backend operation fails.
pub async fn run_blob_store_conformance_tests(store: &dyn BlobStore) -> Result<(), BlobError> {
    test_put_get_roundtrip(store).await?;
    test_missing_blob(store).await?;
    test_extension_kept(store).await?;
    test_delete(store).await?;
    test_list(store).await?;
    test_concurrent_puts_unique(store).await?;
    Ok(())
}

async fn test_put_get_roundtrip(store: &dyn BlobStore) -> Result<(), BlobError> {
    let data = Bytes::from_static(b"\x89PNG\r\n\x1a\n0123");
    let name = store.put(data.clone(), Some("png")).await?;
    assert!(store.exists(&name).await?, "blob should exist after put");
    let read = store.get(&name).await?;
    assert_eq!(read.as_deref(), Some(&data[..]), "bytes should round-trip");
    Ok(())
}

async fn test_missing_blob(store: &dyn BlobStore) -> Result<(), BlobError> {
    let name = StoredName::parse("image-0-000000-00000000.png")?;
    assert!(!store.exists(&name).await?, "unknown blob should not exist");
    assert!(store.get(&name).await?.is_none(), "get on unknown blob is None");
    assert!(
        !store.delete(&name).await?,
        "delete on unknown blob should return false"
    );
    Ok(())
}

async fn test_extension_kept(store: &dyn BlobStore) -> Result<(), BlobError> {
    let name = store.put(Bytes::from_static(b"gif"), Some(".GIF")).await?;
    assert_eq!(name.extension(), Some("gif"));
    let bare = store.put(Bytes::from_static(b"raw"), None).await?;
    assert_eq!(bare.extension(), None);
    Ok(())
}

async fn test_delete(store: &dyn BlobStore) -> Result<(), BlobError> {
    let name = store.put(Bytes::from_static(b"bye"), Some("jpg")).await?;
    assert!(store.delete(&name).await?, "delete should return true");
    assert!(!store.exists(&name).await?, "blob gone after delete");
    assert!(!store.delete(&name).await?, "second delete returns false");
    Ok(())
}

async fn test_list(store: &dyn BlobStore) -> Result<(), BlobError> {
    let name = store.put(Bytes::from_static(b"listed"), Some("webp")).await?;
    let listed = store.list().await?;
    assert!(listed.contains(&name), "list should include {name}");
    Ok(())
}

async fn test_concurrent_puts_unique(store: &dyn BlobStore) -> Result<(), BlobError> {
    const N: usize = 64;
    let puts = (0..N).map(|i| store.put(Bytes::from(format!("blob-{i}")), Some("png")));
    let mut names = HashSet::new();
    for result in join_all(puts).await {
        names.insert(result?);
    }
    assert_eq!(names.len(), N, "concurrent puts must yield distinct names");
    Ok(())
}
