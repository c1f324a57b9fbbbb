//! Single-flight embedding cache.
//!
//! Entries are keyed by the exact query string and never expire or evict;
//! the cache lives as long as the process and is bounded only by memory.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::llm::embeddings::EmbeddingError;


/// Embedding vector shared between the cache and every caller that asked for it.
pub type Embedding = Arc<[f32]>;

type ComputeOutcome = Result<Embedding, Arc<EmbeddingError>>;
type InFlight = Shared<BoxFuture<'static, ComputeOutcome>>;

enum Slot {
    Ready(Embedding),
    Pending { generation: u64, compute: InFlight },
}


#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub joined: u64,
    pub failures: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.joined;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.joined) as f64 / total as f64
        }
    }
}


// Shared with spawned computations so they can settle their own slot.
struct CacheState {
    slots: Mutex<HashMap<String, Slot>>,
    failures: AtomicU64,
}

impl CacheState {
    // Only the computation that created a slot may replace or clear it.
    fn settle(&self, key: &str, generation: u64, outcome: &ComputeOutcome) {
        let mut slots = self.slots.lock();
        let owns_slot = matches!(
            slots.get(key),
            Some(Slot::Pending { generation: current, .. }) if *current == generation
        );
        if !owns_slot {
            return;
        }

        match outcome {
            Ok(embedding) => {
                slots.insert(key.to_string(), Slot::Ready(Arc::clone(embedding)));
            }
            Err(e) => {
                slots.remove(key);
                self.failures.fetch_add(1, Ordering::Relaxed);
                debug!("Embedding failed for {}, slot cleared: {}", crate::safe_truncate(key, 50), e);
            }
        }
    }
}


pub struct EmbeddingCache {
    state: Arc<CacheState>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self {
            state: Arc::new(CacheState {
                slots: Mutex::new(HashMap::new()),
                failures: AtomicU64::new(0),
            }),
            next_generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joined: AtomicU64::new(0),
        }
    }

    /// Returns the cached embedding for `key`, or runs `compute` to produce it.
    ///
    /// Concurrent misses on the same key share one in-flight computation and
    /// all observe the same result. The computation is spawned onto the
    /// current Tokio runtime and settles its slot itself, so it completes and
    /// is recorded even when every caller has given up. A failure is reported
    /// to the waiters and leaves the key empty so a later call retries. The
    /// map lock is never held across an await, so callers for different keys
    /// do not wait on each other.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> ComputeOutcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<f32>, EmbeddingError>> + Send + 'static,
    {
        let in_flight = {
            let mut slots = self.state.slots.lock();
            match slots.get(key) {
                Some(Slot::Ready(embedding)) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Embedding cache HIT for: {}", crate::safe_truncate(key, 50));
                    return Ok(Arc::clone(embedding));
                }
                Some(Slot::Pending { compute, .. }) if !matches!(compute.peek(), Some(Err(_))) => {
                    self.joined.fetch_add(1, Ordering::Relaxed);
                    debug!("Joining in-flight embedding for: {}", crate::safe_truncate(key, 50));
                    compute.clone()
                }
                _ => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

                    // The task may finish before the slot exists; it settles only
                    // after taking the lock, which is held until the insert below.
                    let state = Arc::clone(&self.state);
                    let task_key = key.to_string();
                    let task = tokio::spawn(async move {
                        let outcome = compute().await.map(Embedding::from).map_err(Arc::new);
                        state.settle(&task_key, generation, &outcome);
                        outcome
                    });

                    let state = Arc::clone(&self.state);
                    let task_key = key.to_string();
                    let in_flight = async move {
                        match task.await {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                let outcome = Err(Arc::new(EmbeddingError::Worker(e.to_string())));
                                state.settle(&task_key, generation, &outcome);
                                outcome
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    slots.insert(
                        key.to_string(),
                        Slot::Pending {
                            generation,
                            compute: in_flight.clone(),
                        },
                    );
                    in_flight
                }
            }
        };

        in_flight.await
    }


    pub fn get(&self, key: &str) -> Option<Embedding> {
        match self.state.slots.lock().get(key) {
            Some(Slot::Ready(embedding)) => Some(Arc::clone(embedding)),
            _ => None,
        }
    }

    /// Number of completed embeddings held.
    pub fn len(&self) -> usize {
        self.state
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            failures: self.state.failures.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn counting_compute(
        calls: Arc<AtomicUsize>,
        delay: Duration,
        value: f32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Vec<f32>, EmbeddingError>> + Send + 'static {
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(vec![value; 4])
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let cache = EmbeddingCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_compute("beaches", counting_compute(calls.clone(), Duration::ZERO, 0.5))
            .await
            .unwrap();
        let second = cache
            .get_or_compute("beaches", counting_compute(calls.clone(), Duration::ZERO, 0.9))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*second, &[0.5; 4]);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_computes_once() {
        let cache = Arc::new(EmbeddingCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(
                            "mountain trekking",
                            counting_compute(calls, Duration::from_millis(50), 0.25),
                        )
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|e| Arc::ptr_eq(e, &results[0])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_reaches_all_waiters_and_is_not_cached() {
        let cache = Arc::new(EmbeddingCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute("temples", move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Err::<Vec<f32>, _>(EmbeddingError::InvalidResponse("model offline".to_string()))
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(err.to_string().contains("model offline"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().failures, 1);

        let retried = cache
            .get_or_compute("temples", counting_compute(calls.clone(), Duration::ZERO, 1.0))
            .await
            .unwrap();
        assert_eq!(&*retried, &[1.0; 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_keys_do_not_block_each_other() {
        let cache = Arc::new(EmbeddingCache::new());
        let released = Arc::new(Notify::new());

        // "slow" only finishes once "fast" has completed; a shared lock would deadlock.
        let slow = {
            let cache = cache.clone();
            let released = released.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute("slow", move || async move {
                        released.notified().await;
                        Ok::<_, EmbeddingError>(vec![1.0])
                    })
                    .await
            })
        };

        let fast = cache
            .get_or_compute("fast", || async { Ok::<_, EmbeddingError>(vec![2.0]) })
            .await
            .unwrap();
        assert_eq!(&*fast, &[2.0]);
        released.notify_one();

        let slow = tokio::time::timeout(Duration::from_secs(2), slow)
            .await
            .expect("slow key should complete")
            .unwrap()
            .unwrap();
        assert_eq!(&*slow, &[1.0]);
    }

    #[tokio::test]
    async fn test_failure_after_caller_gave_up_is_not_cached() {
        let cache = EmbeddingCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute("temples", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<Vec<f32>, _>(EmbeddingError::InvalidResponse("model offline".to_string()))
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.stats().failures, 1);

        let retried = cache
            .get_or_compute("temples", counting_compute(calls.clone(), Duration::ZERO, 0.5))
            .await
            .unwrap();
        assert_eq!(&*retried, &[0.5; 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_caller_gave_up_is_stored() {
        let cache = EmbeddingCache::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute("lanterns", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, EmbeddingError>(vec![3.0])
            }),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(cache.is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("lanterns").as_deref(), Some(&[3.0][..]));
    }

    #[tokio::test]
    async fn test_hit_rate_counts_hits_and_joins() {
        let cache = EmbeddingCache::new();
        assert_eq!(cache.stats().hit_rate(), 0.0);

        for _ in 0..4 {
            cache.get_or_compute("hue", || async { Ok::<_, EmbeddingError>(vec![1.0]) }).await.unwrap();
        }
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (3, 1));
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let cache = EmbeddingCache::new();
        cache.get_or_compute("Beaches", || async { Ok::<_, EmbeddingError>(vec![1.0]) }).await.unwrap();
        cache.get_or_compute("beaches", || async { Ok::<_, EmbeddingError>(vec![2.0]) }).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("Beaches").as_deref(), Some(&[1.0][..]));
        assert_eq!(cache.get("beaches").as_deref(), Some(&[2.0][..]));
    }
}
