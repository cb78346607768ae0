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

//! Bias-corrected HyperLogLog cardinality estimation.

/// `2^32`, the hash space the large-range correction is defined over.
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Alpha correction constant for `m` registers.
#[inline]
pub(super) fn alpha(m: f64) -> f64 {
    0.7213 / (1.0 + 1.079 / m)
}

/// Computes `2^-n` by directly subtracting from the IEEE754 double exponent.
#[inline]
fn inv_pow2(n: u8) -> f64 {
    let base = f64::to_bits(1.0);
    f64::from_bits(base - ((n as u64) << 52))
}

/// Raw harmonic-mean estimate `alpha(m) * m^2 / sum(2^-register)`.
pub(super) fn raw_estimate(registers: &[u8]) -> f64 {
    let m = registers.len() as f64;
    let sum: f64 = registers.iter().map(|&r| inv_pow2(r)).sum();
    alpha(m) * m * m / sum
}

/// Three-regime estimate from the register array and its zero-register count.
pub(super) fn estimate(registers: &[u8], num_zeros: u32) -> f64 {
    let m = registers.len() as f64;
    let raw = raw_estimate(registers);

    if raw <= 2.5 * m {
        if num_zeros > 0 {
            m * (m / num_zeros as f64).ln()
        } else {
            raw
        }
    } else if raw <= TWO_POW_32 / 30.0 {
        raw
    } else if raw < TWO_POW_32 {
        -TWO_POW_32 * (1.0 - raw / TWO_POW_32).ln()
    } else {
        // the correction is undefined once the raw estimate covers the whole hash space
        raw
    }
}
