//! Source bucket enumeration.

use crate::error::TransferError;
use crate::store::ObjectStore;
use crate::types::ObjectInfo;
use tracing::info;

/// Enumerates every object under `prefix`, page by page.
///
/// Memory is bounded by one listing page per fetch; the accumulated set is
/// what gets submitted to the worker pool in one shot. A denied listing is
/// fatal for the run and surfaces as [`TransferError::AccessDenied`].
pub async fn list_source_objects(
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<Vec<ObjectInfo>, TransferError> {
    info!(
        "Listing objects in bucket '{}' with prefix '{}'",
        store.bucket(),
        prefix
    );

    let mut objects = Vec::new();
    let mut token = None;
    loop {
        let page = store.list_page(prefix, token).await?;
        objects.extend(page.objects);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    info!("Found {} objects in source bucket", objects.len());
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;

    #[tokio::test]
    async fn walks_every_page() {
        let mut store = MemoryStore::new("src");
        store.page_size = Some(2);
        for i in 0..5 {
            store.insert(&format!("data/obj-{}", i), vec![0u8; 10]);
        }

        let objects = list_source_objects(&store, "data/").await.unwrap();
        assert_eq!(objects.len(), 5);
        assert_eq!(objects[0].size, 10);
    }

    #[tokio::test]
    async fn prefix_filters_the_listing() {
        let store = MemoryStore::new("src");
        store.insert("data/a", vec![1]);
        store.insert("other/b", vec![2]);

        let objects = list_source_objects(&store, "data/").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "data/a");
    }

    #[tokio::test]
    async fn empty_prefix_lists_everything() {
        let store = MemoryStore::new("src");
        store.insert("a", vec![1]);
        store.insert("b", vec![2]);

        let objects = list_source_objects(&store, "").await.unwrap();
        assert_eq!(objects.len(), 2);
    }
}
