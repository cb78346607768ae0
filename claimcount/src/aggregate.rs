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

//! Bucket-wide estimates from per-shard sketches.

use crate::bucket::Bucket;
use crate::error::Error;
use crate::hll::HllSketch;
use crate::hll::ensure_precision;
use crate::shard::ShardRouter;
use crate::store::SketchStore;
use crate::store::decode_or_empty;

/// Merges shard sketches into the sketch of their whole bucket.
///
/// No input yields an empty sketch. Every input must have `precision`, which must
/// itself lie in [`MIN_PRECISION`, `MAX_PRECISION`].
///
/// [`MIN_PRECISION`]: crate::hll::MIN_PRECISION
/// [`MAX_PRECISION`]: crate::hll::MAX_PRECISION
pub fn aggregate<I>(precision: u8, shards: I) -> Result<HllSketch, Error>
where
    I: IntoIterator<Item = HllSketch>,
{
    ensure_precision(precision)?;
    let mut merged = HllSketch::new(precision);
    for shard in shards {
        merged.merge(&shard)?;
    }
    Ok(merged)
}

/// Distinct-count estimate for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEstimate {
    /// The bucket the estimate covers.
    pub bucket: Bucket,
    /// Number of shards that had a stored sketch.
    pub shards_read: u32,
    /// Estimated number of distinct tokens across all shards.
    pub estimate: f64,
}

/// Reads every shard of `bucket` and estimates the bucket's distinct count.
///
/// Missing shards count as empty; unreadable shards are reset to empty.
pub async fn estimate_bucket<S>(
    store: &S,
    router: &ShardRouter,
    bucket: Bucket,
    precision: u8,
) -> Result<BucketEstimate, Error>
where
    S: SketchStore + ?Sized,
{
    ensure_precision(precision)?;
    let mut shards = Vec::with_capacity(router.shard_count() as usize);
    for key in router.keys(bucket) {
        if let Some(stored) = store.get(&key).await? {
            shards.push(decode_or_empty(&key, &stored.bytes, precision));
        }
    }
    let shards_read = shards.len() as u32;
    let merged = aggregate(precision, shards)?;
    Ok(BucketEstimate {
        bucket,
        shards_read,
        estimate: merged.estimate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::CounterKey;
    use crate::error::ErrorKind;
    use crate::store::MemorySketchStore;

    #[test]
    fn test_aggregate_nothing_is_empty() {
        let merged = aggregate(10, Vec::new()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.estimate(), 0.0);
    }

    #[test]
    fn test_aggregate_rejects_mixed_precision() {
        let err = aggregate(10, vec![HllSketch::new(12)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_out_of_range_precision_is_rejected() {
        let err = aggregate(20, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let store = MemorySketchStore::new();
        let router = ShardRouter::new(2).unwrap();
        store.insert_raw(CounterKey::new(Bucket::AllTime, 0), b"stale".to_vec());
        let err = estimate_bucket(&store, &router, Bucket::AllTime, 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_estimate_bucket_reads_all_shards() {
        let store = MemorySketchStore::new();
        let router = ShardRouter::new(4).unwrap();
        let bucket = Bucket::Day(1_699_920_000);

        for (shard, token) in [(0, 1u64 << 63), (2, 1u64 << 62), (3, 1u64 << 61)] {
            let mut sketch = HllSketch::new(10);
            sketch.add(token);
            store.insert_raw(CounterKey::new(bucket, shard), sketch.serialize());
        }
        // unrelated bucket is ignored
        let mut other = HllSketch::new(10);
        other.add(5);
        store.insert_raw(CounterKey::new(Bucket::AllTime, 0), other.serialize());

        let estimate = estimate_bucket(&store, &router, bucket, 10).await.unwrap();
        assert_eq!(estimate.bucket, bucket);
        assert_eq!(estimate.shards_read, 3);
        assert!((estimate.estimate - 3.0).abs() < 0.05);
    }
}
