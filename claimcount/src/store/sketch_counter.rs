// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::sync::Arc;

use async_trait::async_trait;

use crate::anonymize::Token;
use crate::bucket::CounterKey;
use crate::error::Error;
use crate::hll::HllSketch;
use crate::store::CounterStore;
use crate::store::RetryPolicy;
use crate::store::SketchStore;
use crate::store::decode_or_empty;
use crate::store::retry::pause;

/// [`CounterStore`] that read-modify-writes HLL sketches in a [`SketchStore`].
///
/// Each attempt reads the shard sketch, adds the token and writes it back with a
/// compare-and-set on the version it read. Conflicting writers and storage errors
/// are retried according to the [`RetryPolicy`].
#[derive(Debug)]
pub struct SketchCounterStore<S> {
    store: Arc<S>,
    precision: u8,
    policy: RetryPolicy,
}

impl<S: SketchStore> SketchCounterStore<S> {
    /// Creates a counter store writing sketches of `precision` into `store`.
    pub fn new(store: Arc<S>, precision: u8, policy: RetryPolicy) -> Self {
        Self {
            store,
            precision,
            policy,
        }
    }

    /// Returns the underlying blob store.
    pub fn inner(&self) -> &Arc<S> {
        &self.store
    }

    /// One read-modify-write; `Ok(false)` means another writer got there first.
    async fn try_increment(&self, key: &CounterKey, token: Token) -> Result<bool, Error> {
        let current = self.store.get(key).await?;
        let (mut sketch, version) = match current {
            Some(stored) => (
                decode_or_empty(key, &stored.bytes, self.precision),
                Some(stored.version),
            ),
            None => (HllSketch::new(self.precision), None),
        };
        if !sketch.add(token.get()) && version.is_some() {
            // already recorded
            return Ok(true);
        }
        self.store.put(key, sketch.serialize(), version).await
    }
}

#[async_trait]
impl<S: SketchStore> CounterStore for SketchCounterStore<S> {
    async fn increment(&self, key: &CounterKey, token: Token) -> bool {
        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 0..max_attempts {
            match self.try_increment(key, token).await {
                Ok(true) => return true,
                Ok(false) => {
                    tracing::debug!(counter_key = %key, attempt, "sketch write conflicted");
                }
                Err(err) => {
                    tracing::debug!(counter_key = %key, attempt, error = %err, "sketch write failed");
                }
            }
            if attempt + 1 < max_attempts {
                pause(self.policy.backoff_for_attempt(attempt)).await;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::bucket::Bucket;
    use crate::store::MemorySketchStore;
    use crate::store::Versioned;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            backoff_multiplier: 2.0,
        }
    }

    /// Fails the first `failures` calls to `put`, then delegates.
    struct Flaky {
        inner: MemorySketchStore,
        failures: AtomicU32,
        puts: AtomicU32,
    }

    #[async_trait]
    impl SketchStore for Flaky {
        async fn get(&self, key: &CounterKey) -> Result<Option<Versioned>, Error> {
            self.inner.get(key).await
        }

        async fn put(
            &self,
            key: &CounterKey,
            bytes: Vec<u8>,
            expected: Option<u64>,
        ) -> Result<bool, Error> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::storage("injected failure"));
            }
            self.inner.put(key, bytes, expected).await
        }
    }

    fn flaky(failures: u32) -> Arc<Flaky> {
        Arc::new(Flaky {
            inner: MemorySketchStore::new(),
            failures: AtomicU32::new(failures),
            puts: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_increment_creates_sketch() {
        let store = Arc::new(MemorySketchStore::new());
        let counter = SketchCounterStore::new(store.clone(), 10, fast_policy(3));
        let key = CounterKey::new(Bucket::AllTime, 0);

        assert!(counter.increment(&key, Token::new(0xdead_beef_0000_0001)).await);
        let stored = store.get(&key).await.unwrap().unwrap();
        let sketch = HllSketch::deserialize(&stored.bytes).unwrap();
        assert_eq!(sketch.num_zero_registers(), 1023);
    }

    #[tokio::test]
    async fn test_repeated_token_skips_write() {
        let store = Arc::new(MemorySketchStore::new());
        let counter = SketchCounterStore::new(store.clone(), 10, fast_policy(3));
        let key = CounterKey::new(Bucket::Day(0), 1);
        let token = Token::new(0x1234_5678_9abc_def0);

        assert!(counter.increment(&key, token).await);
        assert!(counter.increment(&key, token).await);
        assert_eq!(store.get(&key).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let store = flaky(2);
        let counter = SketchCounterStore::new(store.clone(), 10, fast_policy(3));
        let key = CounterKey::new(Bucket::AllTime, 0);

        assert!(counter.increment(&key, Token::new(77)).await);
        assert_eq!(store.puts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = flaky(10);
        let counter = SketchCounterStore::new(store.clone(), 10, fast_policy(3));
        let key = CounterKey::new(Bucket::AllTime, 0);

        assert!(!counter.increment(&key, Token::new(77)).await);
        assert_eq!(store.puts.load(Ordering::SeqCst), 3);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_sketch_is_overwritten() {
        let store = Arc::new(MemorySketchStore::new());
        let key = CounterKey::new(Bucket::AllTime, 0);
        store.insert_raw(key, b"garbage".to_vec());

        let counter = SketchCounterStore::new(store.clone(), 10, fast_policy(1));
        assert!(counter.increment(&key, Token::new(1 << 63)).await);

        let stored = store.get(&key).await.unwrap().unwrap();
        let sketch = HllSketch::load(&stored.bytes, 10).unwrap();
        assert_eq!(sketch.num_zero_registers(), 1023);
    }

    #[test]
    fn test_retries_without_tokio_runtime() {
        let store = flaky(2);
        let counter = SketchCounterStore::new(store.clone(), 10, fast_policy(3));
        let key = CounterKey::new(Bucket::AllTime, 0);

        assert!(futures::executor::block_on(counter.increment(&key, Token::new(77))));
        assert_eq!(store.puts.load(Ordering::SeqCst), 3);
    }
}
