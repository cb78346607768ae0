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

//! Privacy-preserving, sharded distinct counting of verified claimers.
//!
//! A claim by an address is turned into two salted one-way tokens, one scoped to the
//! UTC day of the claim and one to all time. Each token is routed to one of a fixed
//! number of shards of its bucket and added to that shard's HyperLogLog sketch.
//! Merging every shard sketch of a bucket estimates how many distinct addresses
//! claimed in it. No raw address or token is ever persisted.
//!
//! # Modules
//!
//! * [`hll`]: the HyperLogLog sketch (add, merge, estimate, serialization).
//! * [`anonymize`]: salted token derivation.
//! * [`bucket`] and [`shard`]: bucket keys and shard routing.
//! * [`aggregate`]: merging shard sketches into bucket-wide estimates.
//! * [`store`]: the counter store contract and a compare-and-set implementation.
//! * [`humanity`]: the eligibility gate.
//! * [`tracker`]: the claim recording entry point.
//!
//! # Examples
//!
//! ```
//! # use std::sync::Arc;
//! # use async_trait::async_trait;
//! # use claimcount::anonymize::Salt;
//! # use claimcount::bucket::Bucket;
//! # use claimcount::config::TrackerConfig;
//! # use claimcount::error::Error;
//! # use claimcount::humanity::HumanityCheck;
//! # use claimcount::shard::ShardRouter;
//! # use claimcount::store::MemorySketchStore;
//! # use claimcount::task::Dispatch;
//! # use claimcount::tracker::ClaimTracker;
//! struct Everyone;
//!
//! #[async_trait]
//! impl HumanityCheck for Everyone {
//!     async fn is_human_on_any_supported_chain(&self, _: &str) -> Result<bool, Error> {
//!         Ok(true)
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let store = Arc::new(MemorySketchStore::new());
//! let config = TrackerConfig::default()
//!     .with_salt(Salt::new("s3cret").unwrap())
//!     .with_shard_count(4);
//! let tracker = ClaimTracker::builder(config)
//!     .humanity(Arc::new(Everyone))
//!     .sketch_store(store.clone())
//!     .dispatch(Dispatch::Inline)
//!     .build()
//!     .unwrap();
//!
//! tracker.record_claim_at("0xAbC", 1_700_000_000).await;
//! tracker.record_claim_at("0xabc", 1_700_000_100).await;
//!
//! let router = ShardRouter::new(4).unwrap();
//! let all_time = claimcount::aggregate::estimate_bucket(&*store, &router, Bucket::AllTime, 10)
//!     .await
//!     .unwrap();
//! assert!((all_time.estimate - 1.0).abs() < 0.01);
//! # });
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod aggregate;
pub mod anonymize;
pub mod bucket;
pub mod clock;
pub mod config;
pub mod error;
pub mod hll;
pub mod humanity;
pub mod shard;
pub mod store;
pub mod task;
pub mod tracker;

mod codec;
