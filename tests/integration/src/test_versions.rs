//! Versioned listing integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use fastlist_core::{Lister, ListingMethod, Query};

    use crate::{as_source, lister_input, populated_store, sorted_keys};

    #[tokio::test]
    async fn test_should_list_every_version_once() {
        let (store, bucket) = populated_store("", 1200, 3);
        let query = Query::builder().versions(true).build();

        let mut results = Vec::new();
        for method in [ListingMethod::Sequential, ListingMethod::Worksteal] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, query.clone(), method, 4)).unwrap();
            let keys = sorted_keys(&lister.list_all().await.unwrap());
            let unique: HashSet<&(String, i64)> = keys.iter().collect();
            assert_eq!(keys.len(), 3600, "method {method}");
            assert_eq!(unique.len(), 3600, "method {method}");
            results.push(keys);
        }
        assert_eq!(results[0], results[1]);
    }

    #[tokio::test]
    async fn test_should_list_only_live_versions_by_default() {
        let (store, bucket) = populated_store("", 1200, 3);
        store.delete_object(&bucket, "obj000007").unwrap();

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Worksteal, 4),
        )
        .unwrap();
        let objects = lister.list_all().await.unwrap();
        assert_eq!(objects.len(), 1199);
        assert!(objects.iter().all(|o| o.deleted.is_none()));
    }

    #[tokio::test]
    async fn test_should_advance_past_object_with_many_versions() {
        let (store, bucket) = populated_store("", 0, 2);
        for i in 0..2500 {
            store.put_object(&bucket, "hot", i.to_string().as_bytes()).unwrap();
        }
        for name in ["cold-a", "cold-b", "warm"] {
            store.put_object(&bucket, name, b"x").unwrap();
        }

        let query = Query::builder().versions(true).build();
        for method in [ListingMethod::Sequential, ListingMethod::Worksteal] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, query.clone(), method, 2)).unwrap();
            let keys = sorted_keys(&lister.list_all().await.unwrap());
            let unique: HashSet<&(String, i64)> = keys.iter().collect();
            assert_eq!(keys.len(), 2503, "method {method}");
            assert_eq!(unique.len(), 2503, "method {method}");
            assert_eq!(keys.iter().filter(|(name, _)| name == "hot").count(), 2500);
        }
    }
}
