use std::collections::HashSet;

use galleria_core::{ImageId, NewImageRecord, StoredName};

use crate::error::MetadataError;
use crate::store::MetadataStore;

fn new_record(stored: &str, original: &str, size: u64) -> Result<NewImageRecord, MetadataError> {
    Ok(NewImageRecord {
        stored_name: StoredName::parse(stored).map_err(|e| MetadataError::Corrupt(e.to_string()))?,
        original_name: original.to_owned(),
        mime_type: "image/png".to_owned(),
        size_bytes: size,
    })
}

/// Run the full metadata store conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if any backend operation fails.
pub async fn run_metadata_store_conformance_tests(
    store: &dyn MetadataStore,
) -> Result<(), MetadataError> {
    test_insert_assigns_ids(store).await?;
    test_list_in_insertion_order(store).await?;
    test_get_missing(store).await?;
    test_update(store).await?;
    test_update_missing(store).await?;
    test_delete(store).await?;
    test_delete_missing(store).await?;
    test_duplicate_stored_name(store).await?;
    Ok(())
}

async fn test_insert_assigns_ids(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let a = store.insert(new_record("conf-a.png", "a.png", 10)?).await?;
    let b = store.insert(new_record("conf-b.png", "b.png", 20)?).await?;
    assert_ne!(a.id, b.id, "ids must be unique");
    assert!(b.id > a.id, "ids must be monotonic");
    assert_eq!(a.original_name, "a.png");
    assert_eq!(a.size_bytes, 10);

    let fetched = store.get(a.id).await?;
    assert_eq!(fetched.as_ref(), Some(&a), "get returns the inserted record");
    Ok(())
}

async fn test_list_in_insertion_order(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let before = store.list_all().await?.len();
    let c = store.insert(new_record("conf-c.png", "c.png", 1)?).await?;
    let d = store.insert(new_record("conf-d.png", "d.png", 2)?).await?;

    let all = store.list_all().await?;
    assert_eq!(all.len(), before + 2);
    let ids: Vec<ImageId> = all.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "list_all must be ordered by id");
    let unique: HashSet<ImageId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "ids in listing must be unique");
    assert_eq!(all[all.len() - 2].id, c.id);
    assert_eq!(all[all.len() - 1].id, d.id);
    Ok(())
}

async fn test_get_missing(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let missing = store.get(ImageId::new(i64::MAX)).await?;
    assert!(missing.is_none(), "get on unknown id should return None");
    Ok(())
}

async fn test_update(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let rec = store.insert(new_record("conf-e.png", "e.png", 5)?).await?;
    let matched = store.update_original_name(rec.id, "renamed.png").await?;
    assert!(matched, "update on existing id should match");
    let fetched = store.get(rec.id).await?;
    assert_eq!(
        fetched.map(|r| r.original_name).as_deref(),
        Some("renamed.png")
    );
    Ok(())
}

async fn test_update_missing(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let matched = store
        .update_original_name(ImageId::new(i64::MAX), "nope.png")
        .await?;
    assert!(!matched, "update on unknown id should report no match");
    Ok(())
}

async fn test_delete(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let rec = store.insert(new_record("conf-f.png", "f.png", 6)?).await?;
    let removed = store.delete(rec.id).await?;
    assert_eq!(removed.as_ref(), Some(&rec), "delete returns the removed row");
    assert!(store.get(rec.id).await?.is_none(), "row gone after delete");
    Ok(())
}

async fn test_delete_missing(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    let removed = store.delete(ImageId::new(i64::MAX)).await?;
    assert!(removed.is_none(), "delete on unknown id should return None");
    Ok(())
}

async fn test_duplicate_stored_name(store: &dyn MetadataStore) -> Result<(), MetadataError> {
    store.insert(new_record("conf-g.png", "g.png", 7)?).await?;
    let before = store.list_all().await?.len();
    let dup = store.insert(new_record("conf-g.png", "g2.png", 8)?).await;
    assert!(
        matches!(dup, Err(MetadataError::DuplicateStoredName(_))),
        "second insert with the same stored name must fail"
    );
    assert_eq!(
        store.list_all().await?.len(),
        before,
        "a failed insert must not persist anything"
    );
    Ok(())
}
