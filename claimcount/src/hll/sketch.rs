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

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_preamble_ints_is;
use crate::codec::assert::ensure_serial_version_is;
use crate::codec::assert::insufficient_data;
use crate::codec::family::Family;
use crate::error::Error;
use crate::hll::MAX_PRECISION;
use crate::hll::MIN_PRECISION;
use crate::hll::estimator;
use crate::hll::rank;
use crate::hll::register_index;
use crate::hll::serialization::*;

/// HyperLogLog sketch with one byte per register.
///
/// See [`crate::hll`] for an overview of the algorithm and its accuracy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HllSketch {
    precision: u8,
    /// Direct byte array: registers[slot] = max rank seen
    registers: Box<[u8]>,
    /// Count of registers with value 0
    num_zeros: u32,
}

impl HllSketch {
    /// Creates an empty sketch with `2^precision` registers.
    ///
    /// # Panics
    ///
    /// Panics if `precision` is not in range [4, 18].
    pub fn new(precision: u8) -> Self {
        assert!(
            (MIN_PRECISION..=MAX_PRECISION).contains(&precision),
            "precision must be in [{MIN_PRECISION}, {MAX_PRECISION}], got {precision}"
        );
        let m = 1u32 << precision;
        Self {
            precision,
            registers: vec![0u8; m as usize].into_boxed_slice(),
            num_zeros: m,
        }
    }

    /// Returns the precision `p`.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Returns the number of registers, `2^p`.
    pub fn num_registers(&self) -> usize {
        self.registers.len()
    }

    /// Returns the register array.
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Returns the count of registers that are still zero.
    pub fn num_zero_registers(&self) -> u32 {
        self.num_zeros
    }

    /// Returns true if no token has been added.
    pub fn is_empty(&self) -> bool {
        self.num_zeros as usize == self.registers.len()
    }

    /// Adds a token, returning whether any register changed.
    ///
    /// Adding a token that was already added never changes the sketch.
    pub fn add(&mut self, token: u64) -> bool {
        let slot = register_index(token, self.precision);
        let new_value = rank(token, self.precision);
        let old_value = self.registers[slot];
        if new_value <= old_value {
            return false;
        }
        self.registers[slot] = new_value;
        if old_value == 0 {
            self.num_zeros -= 1;
        }
        true
    }

    /// Merges another sketch into this one by taking the element-wise register maximum.
    ///
    /// Both sketches must share the same precision.
    pub fn merge(&mut self, other: &HllSketch) -> Result<(), Error> {
        if other.precision != self.precision {
            return Err(Error::invalid_argument(format!(
                "cannot merge sketches with different precision: {} and {}",
                self.precision, other.precision
            )));
        }
        if other.is_empty() {
            return Ok(());
        }
        for (mine, theirs) in self.registers.iter_mut().zip(other.registers.iter()) {
            if *theirs > *mine {
                if *mine == 0 {
                    self.num_zeros -= 1;
                }
                *mine = *theirs;
            }
        }
        Ok(())
    }

    /// Returns the bias-corrected cardinality estimate.
    ///
    /// The result is always finite and non-negative; an empty sketch estimates zero.
    pub fn estimate(&self) -> f64 {
        estimator::estimate(&self.registers, self.num_zeros)
    }

    /// Resets the sketch to an empty state.
    pub fn reset(&mut self) {
        *self = Self::new(self.precision);
    }

    /// Serializes this sketch into a byte vector.
    pub fn serialize(&self) -> Vec<u8> {
        let empty = self.is_empty();
        let capacity = PREAMBLE_BYTES + if empty { 0 } else { self.registers.len() };
        let mut bytes = SketchBytes::with_capacity(capacity);
        bytes.write_u8(PREAMBLE_INTS);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::Hll.id());
        bytes.write_u8(self.precision);
        bytes.write_u8(if empty { FLAG_EMPTY } else { 0 });
        bytes.write_u8(0);
        bytes.write_u16_le(0);
        if !empty {
            bytes.write(&self.registers);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);
        let preamble_ints = cursor
            .read_u8()
            .map_err(insufficient_data("preamble_ints"))?;
        let serial_version = cursor
            .read_u8()
            .map_err(insufficient_data("serial_version"))?;
        let family_id = cursor.read_u8().map_err(insufficient_data("family_id"))?;
        Family::Hll.validate_id(family_id)?;
        ensure_serial_version_is(SERIAL_VERSION, serial_version)?;
        ensure_preamble_ints_is(PREAMBLE_INTS, preamble_ints)?;

        let precision = cursor.read_u8().map_err(insufficient_data("precision"))?;
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(Error::deserial(format!(
                "precision out of range; got {precision}"
            )));
        }
        let flags = cursor.read_u8().map_err(insufficient_data("flags"))?;
        cursor.read_u8().map_err(insufficient_data("reserved"))?;
        cursor
            .read_u16_le()
            .map_err(insufficient_data("reserved"))?;

        let mut sketch = Self::new(precision);
        if flags & FLAG_EMPTY != 0 {
            if cursor.remaining() != 0 {
                return Err(Error::deserial("empty sketch carries register data"));
            }
            return Ok(sketch);
        }

        let m = sketch.registers.len();
        if cursor.remaining() != m {
            return Err(Error::deserial(format!(
                "register count mismatch: expected {m}, got {}",
                cursor.remaining()
            )));
        }
        let mut registers = vec![0u8; m];
        cursor
            .read_exact(&mut registers)
            .map_err(insufficient_data("registers"))?;
        let max_rank = 64 - precision;
        if let Some(bad) = registers.iter().find(|&&r| r > max_rank) {
            return Err(Error::deserial(format!(
                "register value {bad} exceeds maximum rank {max_rank}"
            )));
        }
        sketch.num_zeros = registers.iter().filter(|&&r| r == 0).count() as u32;
        sketch.registers = registers.into_boxed_slice();
        Ok(sketch)
    }

    /// Deserializes a sketch and checks that it has the expected precision.
    pub fn load(bytes: &[u8], precision: u8) -> Result<Self, Error> {
        let sketch = Self::deserialize(bytes)?;
        if sketch.precision != precision {
            return Err(Error::deserial(format!(
                "precision mismatch: expected {precision}, got {}",
                sketch.precision
            )));
        }
        Ok(sketch)
    }

    /// Like [`HllSketch::load`], but any bytes that do not decode to a sketch of the
    /// expected precision yield an empty sketch instead of an error.
    pub fn load_or_empty(bytes: &[u8], precision: u8) -> Self {
        Self::load(bytes, precision).unwrap_or_else(|_| Self::new(precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_new_sketch_is_empty() {
        let sketch = HllSketch::new(10);
        assert_eq!(sketch.num_registers(), 1024);
        assert_eq!(sketch.num_zero_registers(), 1024);
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
    }

    #[test]
    #[should_panic(expected = "precision must be in [4, 18], got 3")]
    fn test_precision_too_small() {
        HllSketch::new(3);
    }

    #[test]
    fn test_add_updates_one_register() {
        let mut sketch = HllSketch::new(4);
        // slot 3, rank 2
        let token = (3u64 << 60) | (1u64 << 58);
        assert!(sketch.add(token));
        assert_eq!(sketch.registers()[3], 2);
        assert_eq!(sketch.num_zero_registers(), 15);

        // lower rank in the same slot is ignored
        assert!(!sketch.add((3u64 << 60) | (1u64 << 59)));
        assert_eq!(sketch.registers()[3], 2);

        // higher rank replaces it
        assert!(sketch.add((3u64 << 60) | (1u64 << 55)));
        assert_eq!(sketch.registers()[3], 5);
        assert!(sketch.add(3u64 << 60));
        assert_eq!(sketch.registers()[3], 60);
        assert_eq!(sketch.num_zero_registers(), 15);
    }

    #[test]
    fn test_merge_tracks_zero_registers() {
        let mut a = HllSketch::new(4);
        let mut b = HllSketch::new(4);
        a.add(1u64 << 63);
        b.add(1u64 << 62);
        a.merge(&b).unwrap();
        assert_eq!(a.num_zero_registers(), 14);
        assert_eq!(a.registers()[8], 60);
        assert_eq!(a.registers()[4], 60);
    }

    #[test]
    fn test_merge_precision_mismatch() {
        let mut a = HllSketch::new(10);
        let b = HllSketch::new(11);
        let err = a.merge(&b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_reset() {
        let mut sketch = HllSketch::new(6);
        sketch.add(12345);
        assert!(!sketch.is_empty());
        sketch.reset();
        assert!(sketch.is_empty());
        assert_eq!(sketch.precision(), 6);
    }

    #[test]
    fn test_serialize_layout() {
        let empty = HllSketch::new(4).serialize();
        assert_eq!(empty, vec![2, 1, 7, 4, FLAG_EMPTY, 0, 0, 0]);

        let mut sketch = HllSketch::new(4);
        sketch.add(1u64 << 59);
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), PREAMBLE_BYTES + 16);
        assert_eq!(bytes[4], 0);
        assert_eq!(bytes[PREAMBLE_BYTES], 1);
    }

    #[test]
    fn test_deserialize_rejects_bad_input() {
        let mut sketch = HllSketch::new(4);
        sketch.add(99);
        let bytes = sketch.serialize();

        let truncated = HllSketch::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(truncated.kind(), ErrorKind::InvalidData);

        let mut wrong_family = bytes.clone();
        wrong_family[2] = 3;
        assert!(HllSketch::deserialize(&wrong_family).is_err());

        let mut oversized_register = bytes.clone();
        oversized_register[PREAMBLE_BYTES] = 61;
        assert!(HllSketch::deserialize(&oversized_register).is_err());

        assert!(HllSketch::deserialize(&[]).is_err());
    }

    #[test]
    fn test_load_or_empty_resets_on_mismatch() {
        let mut sketch = HllSketch::new(8);
        sketch.add(7);
        let bytes = sketch.serialize();

        assert_eq!(HllSketch::load_or_empty(&bytes, 8), sketch);
        let reset = HllSketch::load_or_empty(&bytes, 10);
        assert!(reset.is_empty());
        assert_eq!(reset.precision(), 10);
        assert!(HllSketch::load_or_empty(b"not a sketch", 10).is_empty());
    }
}
