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

//! Recording claim events into the day and all-time sketches.
//!
//! For each event the tracker checks eligibility, derives the day and all-time
//! tokens for the address, routes each to its shard and increments both shard
//! sketches concurrently. Nothing about the outcome is reported back to the
//! recorder; degraded outcomes are only logged.

use std::sync::Arc;

use crate::anonymize::Anonymizer;
use crate::bucket::Bucket;
use crate::bucket::to_utc_day_start;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::config::TrackerConfig;
use crate::error::Error;
use crate::humanity::HumanityCheck;
use crate::shard::ShardRouter;
use crate::store::CounterStore;
use crate::store::SketchCounterStore;
use crate::store::SketchStore;
use crate::task::Dispatch;

/// What happened to one claim event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// No salt is configured, so nothing can be counted.
    MissingSalt,
    /// The address is not verified as human on any chain.
    NotHuman,
    /// The humanity check could not be completed; the address is not counted.
    VerificationFailed,
    /// Both increments were attempted.
    Counted {
        /// Whether the day-bucket increment was persisted.
        day_recorded: bool,
        /// Whether the all-time increment was persisted.
        all_time_recorded: bool,
    },
}

struct Inner {
    anonymizer: Option<Anonymizer>,
    router: ShardRouter,
    humanity: Arc<dyn HumanityCheck>,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl Inner {
    async fn count_claim(&self, address: &str, unix_secs: i64) -> ClaimOutcome {
        let Some(anonymizer) = &self.anonymizer else {
            tracing::error!("anonymization salt is not configured, claim not counted");
            return ClaimOutcome::MissingSalt;
        };

        match self.humanity.is_human_on_any_supported_chain(address).await {
            Ok(true) => {}
            Ok(false) => return ClaimOutcome::NotHuman,
            Err(err) => {
                tracing::debug!(error = %err, "humanity check inconclusive, claim not counted");
                return ClaimOutcome::VerificationFailed;
            }
        }

        let day_start = to_utc_day_start(unix_secs);
        let tokens = anonymizer.tokens(address, day_start);
        let day_key = self.router.counter_key(Bucket::Day(day_start), tokens.day);
        let all_time_key = self.router.counter_key(Bucket::AllTime, tokens.all_time);

        let (day_recorded, all_time_recorded) = futures::join!(
            self.store.increment(&day_key, tokens.day),
            self.store.increment(&all_time_key, tokens.all_time),
        );
        if !day_recorded {
            tracing::warn!(counter_key = %day_key, "increment exhausted retries, event dropped from estimate");
        }
        if !all_time_recorded {
            tracing::warn!(counter_key = %all_time_key, "increment exhausted retries, event dropped from estimate");
        }

        ClaimOutcome::Counted {
            day_recorded,
            all_time_recorded,
        }
    }
}

/// Counts unique verified claimers per UTC day and all-time.
///
/// Build one with [`ClaimTracker::builder`].
#[derive(Clone)]
pub struct ClaimTracker {
    inner: Arc<Inner>,
    dispatch: Dispatch,
}

impl ClaimTracker {
    /// Starts building a tracker from `config`.
    pub fn builder(config: TrackerConfig) -> ClaimTrackerBuilder {
        ClaimTrackerBuilder {
            config,
            humanity: None,
            store: None,
            clock: None,
            dispatch: None,
        }
    }

    /// Records a claim by `address` happening now.
    pub async fn record_claim(&self, address: &str) {
        let now = self.inner.clock.now_unix_secs();
        self.record_claim_at(address, now).await;
    }

    /// Records a claim by `address` at `unix_secs`.
    ///
    /// Never fails and reports nothing. With [`Dispatch::Detached`] this returns as
    /// soon as the counting task is spawned.
    pub async fn record_claim_at(&self, address: &str, unix_secs: i64) {
        match &self.dispatch {
            Dispatch::Detached(spawner) => {
                let inner = self.inner.clone();
                let address = address.to_owned();
                spawner.spawn(Box::pin(async move {
                    inner.count_claim(&address, unix_secs).await;
                }));
            }
            Dispatch::Inline => {
                self.inner.count_claim(address, unix_secs).await;
            }
        }
    }

    /// Runs the counting work for one event in place and returns its outcome.
    pub async fn count_claim(&self, address: &str, unix_secs: i64) -> ClaimOutcome {
        self.inner.count_claim(address, unix_secs).await
    }

    /// Returns the shard router.
    pub fn router(&self) -> &ShardRouter {
        &self.inner.router
    }

    /// Returns how claims are dispatched.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

/// Builder for [`ClaimTracker`].
pub struct ClaimTrackerBuilder {
    config: TrackerConfig,
    humanity: Option<Arc<dyn HumanityCheck>>,
    store: Option<Arc<dyn CounterStore>>,
    clock: Option<Arc<dyn Clock>>,
    dispatch: Option<Dispatch>,
}

impl ClaimTrackerBuilder {
    /// Set the eligibility check.
    pub fn humanity(mut self, humanity: Arc<dyn HumanityCheck>) -> Self {
        self.humanity = Some(humanity);
        self
    }

    /// Set the counter store.
    pub fn counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Count into sketches kept in `store`, using the configured precision and
    /// retry policy.
    pub fn sketch_store<S: SketchStore + 'static>(self, store: Arc<S>) -> Self {
        let counter = SketchCounterStore::new(store, self.config.precision, self.config.retry);
        self.counter_store(Arc::new(counter))
    }

    /// Set the clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the dispatch mode. Defaults to [`Dispatch::from_current_runtime`].
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Build the tracker.
    ///
    /// A missing salt does not fail the build; every counting attempt reports it.
    pub fn build(self) -> Result<ClaimTracker, Error> {
        self.config.validate()?;
        let humanity = self
            .humanity
            .ok_or_else(|| Error::invalid_argument("humanity check is required"))?;
        let store = self
            .store
            .ok_or_else(|| Error::invalid_argument("counter store is required"))?;
        let router = ShardRouter::new(self.config.shard_count)?;
        let anonymizer = match Anonymizer::new(self.config.salt) {
            Ok(anonymizer) => Some(anonymizer),
            Err(err) => {
                tracing::error!(error = %err, "claim counting is disabled");
                None
            }
        };
        Ok(ClaimTracker {
            inner: Arc::new(Inner {
                anonymizer,
                router,
                humanity,
                store,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            }),
            dispatch: self.dispatch.unwrap_or_else(Dispatch::from_current_runtime),
        })
    }
}
