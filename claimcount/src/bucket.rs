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

//! Counting buckets and the `(bucket, shard)` keys persisted sketches live under.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Seconds in one UTC day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Discriminator mixed into all-time tokens and rendered in all-time keys.
pub(crate) const ALL_TIME_DISCRIMINATOR: &str = "all";

/// Maps an instant to the start of its UTC day, in seconds since the epoch.
///
/// Instants before the epoch round down to the earlier day start.
pub fn to_utc_day_start(unix_secs: i64) -> i64 {
    unix_secs - unix_secs.rem_euclid(SECONDS_PER_DAY)
}

/// Scope over which a distinct count is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// One UTC day, keyed by its day-start instant.
    Day(i64),
    /// Every claim ever recorded.
    AllTime,
}

impl Bucket {
    /// The day bucket containing `unix_secs`.
    pub fn day_containing(unix_secs: i64) -> Self {
        Bucket::Day(to_utc_day_start(unix_secs))
    }

    /// The value mixed into token derivation for this bucket.
    pub(crate) fn discriminator(&self) -> String {
        match self {
            Bucket::Day(start) => start.to_string(),
            Bucket::AllTime => ALL_TIME_DISCRIMINATOR.to_string(),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Day(start) => write!(f, "day:{start}"),
            Bucket::AllTime => f.write_str(ALL_TIME_DISCRIMINATOR),
        }
    }
}

impl FromStr for Bucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_TIME_DISCRIMINATOR {
            return Ok(Bucket::AllTime);
        }
        let start = s
            .strip_prefix("day:")
            .and_then(|start| start.parse::<i64>().ok())
            .ok_or_else(|| Error::invalid_argument(format!("invalid bucket: {s:?}")))?;
        Ok(Bucket::Day(start))
    }
}

/// Identifies exactly one persisted sketch: one shard of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    bucket: Bucket,
    shard: u32,
}

impl CounterKey {
    /// Creates a key for `shard` of `bucket`.
    pub fn new(bucket: Bucket, shard: u32) -> Self {
        Self { bucket, shard }
    }

    /// Returns the bucket.
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Returns the shard index.
    pub fn shard(&self) -> u32 {
        self.shard
    }

    /// Parses a key rendered by [`CounterKey`]'s `Display` impl.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let (bucket, shard) = s
            .rsplit_once('/')
            .ok_or_else(|| Error::invalid_argument(format!("invalid counter key: {s:?}")))?;
        let shard = shard
            .parse::<u32>()
            .map_err(|e| Error::invalid_argument(format!("invalid shard in {s:?}")).set_source(e))?;
        Ok(Self::new(bucket.parse()?, shard))
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.shard)
    }
}
