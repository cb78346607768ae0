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

//! Serialization constants for HLL sketches.
//!
//! Layout: an 8-byte preamble followed by one byte per register.
//!
//! ```text
//! byte 0: preamble ints (always 2)
//! byte 1: serial version
//! byte 2: family id
//! byte 3: precision
//! byte 4: flags
//! byte 5..8: reserved, zero
//! byte 8..: 2^precision registers, absent when the EMPTY flag is set
//! ```

/// Number of 32-bit words in the preamble.
pub const PREAMBLE_INTS: u8 = 2;
/// Serialization version.
pub const SERIAL_VERSION: u8 = 1;
/// Preamble size in bytes.
pub const PREAMBLE_BYTES: usize = PREAMBLE_INTS as usize * 4;

/// Set when every register is zero; registers are then omitted.
pub const FLAG_EMPTY: u8 = 1 << 2;
