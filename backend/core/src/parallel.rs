//! Bounded, order-preserving concurrent map over async work.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Run `f` over `items` with at most `max_concurrency` futures in flight.
///
/// Results come back in input order regardless of completion order. Failures
/// are values: callers that want per-item error isolation return a `Result`
/// from `f` and every item still gets its slot in the output.
pub async fn parallel_process<T, R, F, Fut>(
    items: impl IntoIterator<Item = T>,
    max_concurrency: usize,
    f: F,
) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(f)
        .buffered(max_concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    async fn square_or_fail(n: u64) -> anyhow::Result<u64> {
        sleep(Duration::from_millis(10)).await;
        if n % 2 == 0 {
            Ok(n * n)
        } else {
            anyhow::bail!("Failed for odd number {n}")
        }
    }

    #[tokio::test]
    async fn all_succeed_in_order() {
        // Later items finish first; output order must still follow input order.
        let results = parallel_process(0..5u64, 2, |n| async move {
            sleep(Duration::from_millis(50 - n * 10)).await;
            n * n
        })
        .await;
        assert_eq!(results, vec![0, 1, 4, 9, 16]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let results = parallel_process(0..5u64, 3, square_or_fail).await;
        assert_eq!(results.len(), 5);

        let ok: Vec<u64> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
            .collect();

        assert_eq!(ok, vec![0, 4, 16]);
        assert_eq!(
            errors,
            vec!["Failed for odd number 1", "Failed for odd number 3"]
        );
    }

    #[tokio::test]
    async fn empty_input() {
        let results: Vec<u64> = parallel_process(Vec::<u64>::new(), 5, |n| async move { n }).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        parallel_process(0..10, 3, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn higher_concurrency_is_faster() {
        let delayed = |n: u64| async move {
            sleep(Duration::from_millis(100)).await;
            n
        };

        let start = Instant::now();
        parallel_process(0..10, 1, delayed).await;
        let sequential = start.elapsed();

        let start = Instant::now();
        parallel_process(0..10, 5, delayed).await;
        let parallel = start.elapsed();

        assert!(sequential >= Duration::from_millis(1000));
        assert!(parallel < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn zero_concurrency_is_treated_as_one() {
        let results = parallel_process(vec![1, 2], 0, |n| async move { n + 1 }).await;
        assert_eq!(results, vec![2, 3]);
    }
}
