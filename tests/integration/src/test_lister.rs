//! Whole-bucket listing integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use fastlist_core::{Lister, ListingMethod, Query};

    use crate::{as_source, lister_input, object_name, populated_store, sorted_keys};

    #[tokio::test]
    async fn test_should_list_every_object_with_each_method() {
        let (store, bucket) = populated_store("", 5000, 1);

        let mut results = Vec::new();
        for method in [ListingMethod::Sequential, ListingMethod::Worksteal, ListingMethod::Open] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, Query::default(), method, 3))
                .expect("lister should be created");
            let objects = lister.list_all().await.expect("listing should succeed");
            lister.close();
            assert_eq!(objects.len(), 5000, "method {method}");
            results.push(sorted_keys(&objects));
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
        assert_eq!(results[0][0].0, object_name("", 0));
        assert_eq!(results[0][4999].0, object_name("", 4999));
    }

    #[tokio::test]
    async fn test_should_list_each_object_once_with_many_workers() {
        let (store, bucket) = populated_store("", 3000, 1);

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Worksteal, 16),
        )
        .expect("lister should be created");
        let objects = lister.list_all().await.expect("listing should succeed");

        let unique: HashSet<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(objects.len(), 3000);
        assert_eq!(unique.len(), 3000);
        assert!(lister.pending_ranges().is_empty());
    }

    #[tokio::test]
    async fn test_should_list_exact_page_boundaries() {
        let runs = [
            (ListingMethod::Sequential, 1),
            (ListingMethod::Worksteal, 1),
            (ListingMethod::Worksteal, 5),
            (ListingMethod::Open, 3),
        ];
        for count in [1, 999, 1000, 1001, 1999, 2000, 2001] {
            let (store, bucket) = populated_store("", count, 1);
            for (method, parallelism) in runs {
                let mut lister = Lister::new(
                    as_source(&store),
                    lister_input(&bucket, Query::default(), method, parallelism),
                )
                .expect("lister should be created");
                let objects = lister.list_all().await.expect("listing should succeed");
                let unique: HashSet<&str> = objects.iter().map(|o| o.name.as_str()).collect();
                assert_eq!(objects.len(), count, "{count} objects, method {method}, parallelism {parallelism}");
                assert_eq!(unique.len(), count, "{count} objects, method {method}, parallelism {parallelism}");
            }
        }
    }

    #[tokio::test]
    async fn test_should_list_with_single_worker() {
        let (store, bucket) = populated_store("", 1200, 1);

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Worksteal, 1),
        )
        .expect("lister should be created");
        let objects = lister.list_all().await.expect("listing should succeed");
        assert_eq!(objects.len(), 1200);
    }

    #[tokio::test]
    async fn test_should_return_done_for_empty_bucket() {
        let (store, bucket) = populated_store("", 0, 1);

        for method in [ListingMethod::Sequential, ListingMethod::Worksteal, ListingMethod::Open] {
            let mut lister = Lister::new(as_source(&store), lister_input(&bucket, Query::default(), method, 4))
                .expect("lister should be created");
            let batch = lister.next_batch().await.expect("listing should succeed");
            assert!(batch.objects.is_empty(), "method {method}");
            assert!(batch.done, "method {method}");
        }
    }

    #[tokio::test]
    async fn test_should_keep_returning_done_after_completion() {
        let (store, bucket) = populated_store("", 10, 1);

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Open, 2),
        )
        .expect("lister should be created");
        let first = lister.next_batch().await.expect("listing should succeed");
        assert_eq!(first.objects.len(), 10);
        assert!(first.done);
        assert_ne!(lister.method(), ListingMethod::Open);

        let calls = store.list_calls();
        let second = lister.next_batch().await.expect("listing should succeed");
        assert!(second.objects.is_empty());
        assert!(second.done);
        assert_eq!(store.list_calls(), calls);
    }

    #[tokio::test]
    async fn test_should_close_twice() {
        let (store, bucket) = populated_store("", 10, 1);

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Worksteal, 2),
        )
        .expect("lister should be created");
        lister.close();
        lister.close();
        assert!(lister.pending_ranges().is_empty());
        assert!(lister.next_batch().await.is_err());
    }
}
