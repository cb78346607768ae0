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

//! Persistence of shard sketches.
//!
//! The claim tracker only depends on [`CounterStore`]: "add this token to the sketch at
//! this key, retrying transient failures, and tell me whether it stuck". The rest of
//! this module is a reference implementation of that contract on top of any
//! compare-and-set blob store ([`SketchStore`]), together with an in-memory backend.

mod memory;
mod retry;
mod sketch_counter;

use async_trait::async_trait;

pub use self::memory::MemorySketchStore;
pub use self::retry::RetryPolicy;
pub use self::sketch_counter::SketchCounterStore;
use crate::anonymize::Token;
use crate::bucket::CounterKey;
use crate::error::Error;
use crate::hll::HllSketch;

/// Keyed, retrying sketch increment consumed by the claim tracker.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Adds `token` to the sketch stored at `key`.
    ///
    /// Returns `false` once retries are exhausted; the event's effect on the estimate
    /// is then not guaranteed to be recorded.
    async fn increment(&self, key: &CounterKey, token: Token) -> bool;
}

/// A stored blob together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// Opaque, monotonically increasing version.
    pub version: u64,
    /// Serialized sketch.
    pub bytes: Vec<u8>,
}

/// Versioned blob storage with compare-and-set writes.
#[async_trait]
pub trait SketchStore: Send + Sync {
    /// Reads the blob at `key`, if any.
    async fn get(&self, key: &CounterKey) -> Result<Option<Versioned>, Error>;

    /// Writes `bytes` at `key` if its current version is `expected`
    /// (`None` meaning the key must be absent).
    ///
    /// Returns `Ok(false)` when the version no longer matches.
    async fn put(
        &self,
        key: &CounterKey,
        bytes: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool, Error>;
}

/// Decodes a stored shard sketch, treating anything unreadable as an empty sketch.
pub(crate) fn decode_or_empty(key: &CounterKey, bytes: &[u8], precision: u8) -> HllSketch {
    match HllSketch::load(bytes, precision) {
        Ok(sketch) => sketch,
        Err(err) => {
            tracing::warn!(
                counter_key = %key,
                error = %err,
                "stored sketch is unreadable, resetting to empty"
            );
            HllSketch::new(precision)
        }
    }
}
