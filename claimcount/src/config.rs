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

//! Tracker configuration.

use serde::Deserialize;

use crate::anonymize::Salt;
use crate::error::Error;
use crate::hll::DEFAULT_PRECISION;
use crate::hll::MAX_PRECISION;
use crate::hll::MIN_PRECISION;
use crate::store::RetryPolicy;

/// Default number of shards per bucket.
pub const DEFAULT_SHARD_COUNT: u32 = 16;

/// Environment variable holding the anonymization salt.
pub const SALT_ENV: &str = "CLAIMCOUNT_SALT";
/// Environment variable overriding the shard count.
pub const SHARD_COUNT_ENV: &str = "CLAIMCOUNT_SHARD_COUNT";
/// Environment variable overriding the sketch precision.
pub const PRECISION_ENV: &str = "CLAIMCOUNT_PRECISION";

/// Settings for a [`crate::tracker::ClaimTracker`].
///
/// `shard_count` and `precision` must stay fixed for the lifetime of a deployment:
/// sketches written under other values are routed or decoded differently.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Anonymization salt. Counting is refused while this is unset.
    pub salt: Option<Salt>,
    /// Shards per bucket.
    pub shard_count: u32,
    /// Sketch precision `p` (`2^p` registers per shard).
    pub precision: u8,
    /// Retry policy for shard increments.
    pub retry: RetryPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            salt: None,
            shard_count: DEFAULT_SHARD_COUNT,
            precision: DEFAULT_PRECISION,
            retry: RetryPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Set the anonymization salt.
    pub fn with_salt(mut self, salt: Salt) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Set the number of shards per bucket.
    pub fn with_shard_count(mut self, shard_count: u32) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Set the sketch precision.
    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    /// Set the increment retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Parses a TOML document.
    ///
    /// ```
    /// # use claimcount::config::TrackerConfig;
    /// let config = TrackerConfig::from_toml_str(
    ///     r#"
    ///     salt = "s3cret"
    ///     shard_count = 8
    ///
    ///     [retry]
    ///     max_attempts = 5
    ///     initial_backoff = 10
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.shard_count, 8);
    /// assert_eq!(config.retry.max_attempts, 5);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(s)
            .map_err(|e| Error::config("failed to parse tracker config").set_source(e))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(salt) = lookup(SALT_ENV).filter(|s| !s.is_empty()) {
            config.salt = Some(Salt::new(salt)?);
        }
        if let Some(value) = lookup(SHARD_COUNT_ENV) {
            config.shard_count = value.trim().parse().map_err(|e| {
                Error::config(format!("invalid {SHARD_COUNT_ENV}: {value:?}")).set_source(e)
            })?;
        }
        if let Some(value) = lookup(PRECISION_ENV) {
            config.precision = value.trim().parse().map_err(|e| {
                Error::config(format!("invalid {PRECISION_ENV}: {value:?}")).set_source(e)
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks shard count, precision and retry policy.
    ///
    /// A missing salt is not rejected here; it is reported by every counting attempt.
    pub fn validate(&self) -> Result<(), Error> {
        if self.shard_count == 0 {
            return Err(Error::config("shard_count must be at least 1"));
        }
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.precision) {
            return Err(Error::config(format!(
                "precision must be in [{MIN_PRECISION}, {MAX_PRECISION}], got {}",
                self.precision
            )));
        }
        self.retry.validate()
    }
}
