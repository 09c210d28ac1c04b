//! Request coalescing for concurrent cache misses.
//!
//! When several tasks miss the same key at once, exactly one of them runs the
//! fetcher; the rest wait on a broadcast channel and receive the leader's
//! result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

use galdex_core::{Error, Result};

/// Coalesces concurrent calls for the same key into a single execution.
#[derive(Clone)]
pub struct Singleflight<T: Clone> {
    pending: Arc<Mutex<HashMap<String, broadcast::Sender<StdResult<T>>>>>,
}

type StdResult<T> = std::result::Result<T, String>;

impl<T: Clone + Send + 'static> Singleflight<T> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or wait for an in-flight run of the same key.
    ///
    /// Follower errors carry the leader's error message wrapped as
    /// [`Error::Internal`]; the leader gets its own error back untouched.
    /// A follower that subscribed too late to hear the leader's result
    /// contends for leadership again instead of erroring.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            let rx = {
                let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(tx) = pending.get(key) {
                    Some(tx.subscribe())
                } else {
                    let (tx, _) = broadcast::channel(1);
                    pending.insert(key.to_string(), tx);
                    None
                }
            };

            match rx {
                Some(mut rx) => {
                    debug!(
                        subsystem = "cache",
                        component = "singleflight",
                        key,
                        "joined in-flight fetch"
                    );
                    match rx.recv().await {
                        Ok(Ok(value)) => return Ok(value),
                        Ok(Err(msg)) => return Err(Error::Internal(msg)),
                        // Leader broadcast before this subscription, or was
                        // cancelled. The entry is gone or going; take over.
                        Err(_) => continue,
                    }
                }
                None => {
                    // Leader path. The guard removes the pending entry on
                    // every exit, including panics and cancellation.
                    let _guard = RemovePending {
                        pending: Arc::clone(&self.pending),
                        key: key.to_string(),
                    };

                    let result = work().await;

                    let broadcast_payload = match &result {
                        Ok(value) => Ok(value.clone()),
                        Err(e) => Err(e.to_string()),
                    };
                    if let Some(tx) = self
                        .pending
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .get(key)
                    {
                        // Send fails when no follower subscribed, which is fine.
                        let _ = tx.send(broadcast_payload);
                    }

                    return result;
                }
            }
        }
    }
}

impl<T: Clone + Send + 'static> Default for Singleflight<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct RemovePending<T: Clone> {
    pending: Arc<Mutex<HashMap<String, broadcast::Sender<StdResult<T>>>>>,
    key: String,
}

impl<T: Clone> Drop for RemovePending<T> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let flight: Singleflight<String> = Singleflight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flight
                    .run("shared", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("value".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result.unwrap(), "value");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_leader_error_propagates_to_followers() {
        let flight: Singleflight<String> = Singleflight::new();

        let leader = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .run("failing", || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(Error::Validation("bad input".to_string()))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let follower = {
            let flight = flight.clone();
            tokio::spawn(async move {
                flight
                    .run("failing", || async { Ok("never runs".to_string()) })
                    .await
            })
        };

        assert!(matches!(leader.await.unwrap(), Err(Error::Validation(_))));
        assert!(matches!(follower.await.unwrap(), Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_late_follower_takes_over_instead_of_erroring() {
        let flight: Singleflight<i64> = Singleflight::new();

        // A stand-in leader that goes away without ever broadcasting, the
        // way a real one does when it sends before this caller subscribes.
        let (tx, _) = broadcast::channel(1);
        flight
            .pending
            .lock()
            .unwrap()
            .insert("k".to_string(), tx.clone());

        let follower = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.run("k", || async { Ok(7) }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        flight.pending.lock().unwrap().remove("k");
        drop(tx);

        assert_eq!(follower.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_key_is_reusable_after_completion() {
        let flight: Singleflight<i64> = Singleflight::new();
        let first = flight.run("k", || async { Ok(1) }).await.unwrap();
        let second = flight.run("k", || async { Ok(2) }).await.unwrap();
        assert_eq!((first, second), (1, 2));
    }
}
