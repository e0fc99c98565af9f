//! Prefix, offset, delimiter and attribute selection integration tests.

#[cfg(test)]
mod tests {
    use fastlist_core::{Lister, ListerInput, ListingMethod, Query};

    use crate::{as_source, lister_input, object_name, populated_store, sorted_keys};

    #[tokio::test]
    async fn test_should_list_only_objects_under_prefix() {
        let (store, bucket) = populated_store("logs/", 1500, 1);
        for i in 0..300 {
            store.put_object(&bucket, &object_name("data/", i), b"x").unwrap();
            store.put_object(&bucket, &object_name("logz/", i), b"x").unwrap();
        }

        let query = Query::builder().prefix("logs/").build();
        for method in [ListingMethod::Sequential, ListingMethod::Worksteal] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, query.clone(), method, 4)).unwrap();
            let objects = lister.list_all().await.unwrap();
            assert_eq!(objects.len(), 1500, "method {method}");
            assert!(objects.iter().all(|o| o.name.starts_with("logs/")), "method {method}");
        }
    }

    #[tokio::test]
    async fn test_should_honor_offsets_within_prefix() {
        let (store, bucket) = populated_store("logs/", 2000, 1);
        let query = Query::builder()
            .prefix("logs/")
            .start_offset(object_name("logs/", 250))
            .end_offset(object_name("logs/", 1750))
            .build();

        let mut results = Vec::new();
        for method in [ListingMethod::Sequential, ListingMethod::Worksteal] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, query.clone(), method, 3)).unwrap();
            let objects = lister.list_all().await.unwrap();
            let keys = sorted_keys(&objects);
            assert_eq!(keys.len(), 1500, "method {method}");
            assert_eq!(keys[0].0, object_name("logs/", 250));
            assert_eq!(keys[1499].0, object_name("logs/", 1749));
            results.push(keys);
        }
        assert_eq!(results[0], results[1]);
    }

    #[tokio::test]
    async fn test_should_return_nothing_when_offsets_exclude_prefix() {
        let (store, bucket) = populated_store("logs/", 100, 1);
        let query = Query::builder().prefix("logs/").start_offset("m").build();

        for method in [ListingMethod::Sequential, ListingMethod::Worksteal, ListingMethod::Open] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, query.clone(), method, 2)).unwrap();
            let batch = lister.next_batch().await.unwrap();
            assert!(batch.objects.is_empty(), "method {method}");
            assert!(batch.done, "method {method}");
        }
    }

    #[tokio::test]
    async fn test_should_skip_directory_objects() {
        let (store, bucket) = populated_store("", 1100, 1);
        for dir in ["a/", "b/", "c/nested/"] {
            store.put_object(&bucket, dir, b"").unwrap();
        }

        for method in [ListingMethod::Sequential, ListingMethod::Worksteal] {
            let keep = ListerInput::builder()
                .bucket_name(bucket.as_str())
                .parallelism(2)
                .method(method)
                .build();
            let all = Lister::new(as_source(&store), keep).unwrap().list_all().await.unwrap();
            assert_eq!(all.len(), 1103, "method {method}");

            let skip = ListerInput::builder()
                .bucket_name(bucket.as_str())
                .parallelism(2)
                .skip_directory_objects(true)
                .method(method)
                .build();
            let files = Lister::new(as_source(&store), skip).unwrap().list_all().await.unwrap();
            assert_eq!(files.len(), 1100, "method {method}");
            assert!(files.iter().all(|o| !o.name.ends_with('/')), "method {method}");
        }
    }

    #[tokio::test]
    async fn test_should_collapse_names_under_delimiter() {
        let (store, bucket) = populated_store("photos/", 20, 1);
        for name in ["readme", "videos/a", "videos/b"] {
            store.put_object(&bucket, name, b"x").unwrap();
        }

        let query = Query::builder().delimiter("/").build();
        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, query, ListingMethod::Sequential, 1),
        )
        .unwrap();
        let entries = lister.list_all().await.unwrap();

        let prefixes: Vec<&str> = entries
            .iter()
            .filter(|e| e.name.is_empty())
            .map(|e| e.prefix.as_str())
            .collect();
        let names: Vec<&str> = entries
            .iter()
            .filter(|e| !e.name.is_empty())
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(prefixes, vec!["photos/", "videos/"]);
        assert_eq!(names, vec!["readme"]);
    }

    #[tokio::test]
    async fn test_should_list_with_reduced_attributes() {
        let (store, bucket) = populated_store("", 2500, 1);
        let mut query = Query::default();
        query.set_attr_selection(&["Name"]).unwrap();

        for method in [ListingMethod::Sequential, ListingMethod::Worksteal] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, query.clone(), method, 4)).unwrap();
            let objects = lister.list_all().await.unwrap();
            assert_eq!(objects.len(), 2500, "method {method}");
            assert!(objects.iter().all(|o| o.generation == 0 && o.size == 0), "method {method}");
        }
    }
}
