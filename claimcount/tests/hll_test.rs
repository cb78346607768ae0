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

use claimcount::hll::HllSketch;
use googletest::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn tokens(seed: u64, n: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<u64>()).collect()
}

fn sketch_of(precision: u8, tokens: &[u64]) -> HllSketch {
    let mut sketch = HllSketch::new(precision);
    for &token in tokens {
        sketch.add(token);
    }
    sketch
}

#[test]
fn test_empty_sketch_estimates_zero() {
    for precision in [4, 10, 18] {
        assert_eq!(HllSketch::new(precision).estimate(), 0.0);
    }
}

#[test]
fn test_single_token_estimates_one() {
    let mut sketch = HllSketch::new(10);
    sketch.add(0x45011eda8bccc569);
    assert_that!(sketch.estimate(), near(1.0, 0.01));
}

#[test]
fn test_add_is_idempotent() {
    for token in tokens(1, 200) {
        let mut once = HllSketch::new(10);
        once.add(token);
        let mut twice = once.clone();
        assert!(!twice.add(token));
        assert_eq!(twice, once);
        assert_eq!(twice.estimate(), once.estimate());
    }

    let inputs = tokens(2, 5_000);
    let first = sketch_of(10, &inputs);
    let mut replayed = first.clone();
    for &token in &inputs {
        replayed.add(token);
    }
    assert_eq!(replayed, first);
}

#[test]
fn test_registers_never_decrease() {
    let mut sketch = HllSketch::new(8);
    let mut previous = sketch.registers().to_vec();
    for (i, token) in tokens(3, 3_000).into_iter().enumerate() {
        if i % 500 == 0 {
            let other = sketch_of(8, &tokens(100 + i as u64, 50));
            sketch.merge(&other).unwrap();
        } else {
            sketch.add(token);
        }
        let current = sketch.registers();
        assert!(previous.iter().zip(current).all(|(old, new)| new >= old));
        previous = current.to_vec();
    }
}

#[test]
fn test_merge_laws() {
    let a = sketch_of(10, &tokens(10, 800));
    let b = sketch_of(10, &tokens(11, 300));
    let c = sketch_of(10, &tokens(12, 1_500));

    let mut ab = a.clone();
    ab.merge(&b).unwrap();
    let mut ba = b.clone();
    ba.merge(&a).unwrap();
    assert_eq!(ab, ba);

    let mut ab_c = ab.clone();
    ab_c.merge(&c).unwrap();
    let mut bc = b.clone();
    bc.merge(&c).unwrap();
    let mut a_bc = a.clone();
    a_bc.merge(&bc).unwrap();
    assert_eq!(ab_c, a_bc);

    let mut aa = a.clone();
    aa.merge(&a).unwrap();
    assert_eq!(aa, a);

    let mut with_empty = a.clone();
    with_empty.merge(&HllSketch::new(10)).unwrap();
    assert_eq!(with_empty, a);
}

#[test]
fn test_merge_equals_sketch_of_union() {
    let left = tokens(20, 700);
    let right = tokens(21, 900);
    let mut merged = sketch_of(12, &left);
    merged.merge(&sketch_of(12, &right)).unwrap();

    let union: Vec<u64> = left.iter().chain(right.iter()).copied().collect();
    assert_eq!(merged, sketch_of(12, &union));
}

#[test]
fn test_bounded_relative_error() {
    let sketch = sketch_of(10, &tokens(42, 10_000));
    // ~3 standard errors at 1024 registers
    assert_that!(sketch.estimate(), near(10_000.0, 1_000.0));
}

#[test]
fn test_disjoint_union_via_merge() {
    let all = tokens(7, 1_000);
    let a = sketch_of(10, &all[..500]);
    let b = sketch_of(10, &all[500..]);
    assert_that!(a.estimate(), near(500.0, 50.0));
    assert_that!(b.estimate(), near(500.0, 50.0));

    let mut merged = a.clone();
    merged.merge(&b).unwrap();
    assert_that!(merged.estimate(), near(1_000.0, 100.0));
}

#[test]
fn test_large_cardinality_stays_accurate() {
    let sketch = sketch_of(14, &tokens(99, 200_000));
    // 16384 registers: standard error ~0.8%
    assert_that!(sketch.estimate(), near(200_000.0, 10_000.0));
}

#[test]
fn test_serialization_round_trip_preserves_estimate() {
    let sketch = sketch_of(11, &tokens(5, 4_000));
    let restored = HllSketch::deserialize(&sketch.serialize()).unwrap();
    assert_eq!(restored, sketch);
    assert_eq!(restored.estimate(), sketch.estimate());

    let empty = HllSketch::new(11);
    let restored = HllSketch::deserialize(&empty.serialize()).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.precision(), 11);
}

#[test]
fn test_load_or_empty_defends_against_corruption() {
    let sketch = sketch_of(10, &tokens(6, 100));
    let mut bytes = sketch.serialize();
    bytes.truncate(bytes.len() / 2);
    assert!(HllSketch::deserialize(&bytes).is_err());
    let loaded = HllSketch::load_or_empty(&bytes, 10);
    assert!(loaded.is_empty());
    assert_eq!(loaded.num_registers(), 1024);
}
