//! Batched listing integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use fastlist_core::{Lister, ListerInput, ListingMethod, Query};

    use crate::{as_source, populated_store};

    async fn list_in_batches(lister: &mut Lister) -> Vec<Vec<String>> {
        let mut batches = Vec::new();
        loop {
            let batch = lister.next_batch().await.expect("batch should be listed");
            batches.push(batch.objects.into_iter().map(|o| o.name).collect());
            if batch.done {
                return batches;
            }
        }
    }

    #[tokio::test]
    async fn test_should_resume_batches_with_each_method() {
        let (store, bucket) = populated_store("", 3500, 1);

        for method in [ListingMethod::Sequential, ListingMethod::Worksteal, ListingMethod::Open] {
            let input = ListerInput::builder()
                .bucket_name(bucket.as_str())
                .parallelism(4)
                .batch_size(1000)
                .method(method)
                .build();
            let mut lister = Lister::new(as_source(&store), input).expect("lister should be created");
            let batches = list_in_batches(&mut lister).await;

            let (last, full) = batches.split_last().expect("at least one batch");
            for batch in full {
                assert!(batch.len() >= 1000, "method {method}: short batch of {}", batch.len());
            }
            assert!(last.len() <= 3500);

            let all: Vec<&String> = batches.iter().flatten().collect();
            let unique: HashSet<&String> = all.iter().copied().collect();
            assert_eq!(all.len(), 3500, "method {method}");
            assert_eq!(unique.len(), 3500, "method {method}");
        }
    }

    #[tokio::test]
    async fn test_should_keep_pending_ranges_between_worksteal_batches() {
        let (store, bucket) = populated_store("", 4000, 1);

        let input = ListerInput::builder()
            .bucket_name(bucket.as_str())
            .parallelism(4)
            .batch_size(500)
            .method(ListingMethod::Worksteal)
            .build();
        let mut lister = Lister::new(as_source(&store), input).expect("lister should be created");

        let first = lister.next_batch().await.expect("batch should be listed");
        assert!(first.objects.len() >= 500);
        assert!(!first.done);
        assert!(!lister.pending_ranges().is_empty());

        let rest = lister.list_all().await.expect("listing should succeed");
        assert_eq!(first.objects.len() + rest.len(), 4000);
        assert!(lister.pending_ranges().is_empty());
    }

    #[tokio::test]
    async fn test_should_round_sequential_batches_up_to_whole_pages() {
        let (store, bucket) = populated_store("", 2500, 1);

        let input = ListerInput::builder()
            .bucket_name(bucket.as_str())
            .batch_size(1)
            .query(Query::default())
            .method(ListingMethod::Sequential)
            .build();
        let mut lister = Lister::new(as_source(&store), input).expect("lister should be created");
        let batches = list_in_batches(&mut lister).await;

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }
}
