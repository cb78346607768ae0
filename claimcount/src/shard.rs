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

//! Deterministic routing of tokens to bucket shards.

use std::num::NonZeroU32;

use crate::anonymize::Token;
use crate::bucket::Bucket;
use crate::bucket::CounterKey;
use crate::error::Error;

/// Spreads the writes for one bucket over a fixed number of independent shards.
///
/// Routing depends only on the token, so repeated events from one address in one
/// bucket always reach the same shard sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    shard_count: NonZeroU32,
}

impl ShardRouter {
    /// Creates a router over `shard_count` shards.
    pub fn new(shard_count: u32) -> Result<Self, Error> {
        let shard_count = NonZeroU32::new(shard_count)
            .ok_or_else(|| Error::config("shard count must be at least 1"))?;
        Ok(Self { shard_count })
    }

    /// Returns the number of shards per bucket.
    pub fn shard_count(&self) -> u32 {
        self.shard_count.get()
    }

    /// Shard index: the top 32 bits of the token modulo the shard count.
    pub fn shard_index(&self, token: Token) -> u32 {
        ((token.get() >> 32) as u32) % self.shard_count
    }

    /// The counter key `token` should be added to within `bucket`.
    pub fn counter_key(&self, bucket: Bucket, token: Token) -> CounterKey {
        CounterKey::new(bucket, self.shard_index(token))
    }

    /// Every counter key of `bucket`, in shard order.
    pub fn keys(&self, bucket: Bucket) -> impl Iterator<Item = CounterKey> + '_ {
        (0..self.shard_count()).map(move |shard| CounterKey::new(bucket, shard))
    }
}
