//! Listing failure integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fastlist_core::{ListError, Lister, ListingMethod, Query, SourceError};
    use fastlist_memstore::{MemoryStore, StoreOptions};

    use crate::{as_source, init_tracing, lister_input, populated_store};

    #[tokio::test]
    async fn test_should_fail_for_missing_bucket() {
        init_tracing();
        let store = Arc::new(MemoryStore::new());

        for method in [ListingMethod::Sequential, ListingMethod::Worksteal, ListingMethod::Open] {
            let mut lister = Lister::new(
                as_source(&store),
                lister_input("no-such-bucket", Query::default(), method, 2),
            )
            .expect("lister should be created");
            let err = lister.next_batch().await.expect_err("listing should fail");
            assert!(
                matches!(
                    err,
                    ListError::Source {
                        source: SourceError::NoSuchBucket { .. },
                        ..
                    }
                ),
                "method {method}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_should_reject_empty_bucket_name() {
        let store = Arc::new(MemoryStore::new());
        let err = Lister::new(as_source(&store), lister_input("", Query::default(), ListingMethod::Open, 2))
            .expect_err("empty bucket name should be rejected");
        assert!(matches!(err, ListError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_should_poison_lister_after_backend_failure() {
        let (store, bucket) = populated_store("", 3000, 1);
        store.set_options(StoreOptions::builder().fail_after(2).build());

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Worksteal, 4),
        )
        .expect("lister should be created");
        let err = lister.next_batch().await.expect_err("listing should fail");
        assert!(matches!(
            err,
            ListError::Source {
                source: SourceError::Unavailable { .. },
                ..
            }
        ));
        assert!(lister.pending_ranges().is_empty());

        store.set_options(StoreOptions::default());
        assert!(matches!(lister.next_batch().await, Err(ListError::Poisoned)));
    }

    #[tokio::test]
    async fn test_should_stop_slow_listing_when_cancelled() {
        let (store, bucket) = populated_store("", 2000, 1);
        store.set_options(StoreOptions::builder().latency(Duration::from_secs(5)).build());

        let mut lister = Lister::new(
            as_source(&store),
            lister_input(&bucket, Query::default(), ListingMethod::Open, 4),
        )
        .expect("lister should be created");
        let token = lister.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let err = tokio::time::timeout(Duration::from_secs(2), lister.next_batch())
            .await
            .expect("cancellation should end the call promptly")
            .expect_err("listing should be cancelled");
        assert!(err.is_cancelled());
        assert!(lister.next_batch().await.is_err());
    }
}
