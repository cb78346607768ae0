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

//! One-way derivation of countable tokens from addresses.
//!
//! A token is the first 64 bits (big-endian) of
//! `SHA-256("{salt}|{lowercase(address)}|{discriminator}")`, where the discriminator
//! is the UTC day-start for day buckets and `all` for the all-time bucket. Without
//! the salt the tokens cannot be linked back to an address by hashing candidate
//! addresses, and the day and all-time tokens of one address cannot be derived from
//! each other.

use std::fmt;

use serde::Deserialize;
use sha2::Digest;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::bucket::Bucket;
use crate::error::Error;

/// Secret mixed into every token. Wiped from memory on drop.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Salt(Zeroizing<String>);

impl Salt {
    /// Wraps a secret salt; an empty string is rejected.
    pub fn new(secret: impl Into<String>) -> Result<Self, Error> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(Error::config("salt must not be empty"));
        }
        Ok(Self(secret))
    }

    fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Salt {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Salt::new(value)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// Opaque 64-bit value fed to a sketch in place of an address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

impl Token {
    /// Wraps a raw token value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Takes the first 8 bytes of a digest as a big-endian integer.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(head))
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// The two tokens derived for one claim event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPair {
    /// Token for the day bucket the claim falls in.
    pub day: Token,
    /// Token for the all-time bucket.
    pub all_time: Token,
}

/// Derives salted tokens from addresses.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    salt: Salt,
}

impl Anonymizer {
    /// Creates an anonymizer.
    ///
    /// A missing salt is a configuration error: hashing without one would let anyone
    /// recover addresses by hashing a list of known candidates.
    pub fn new(salt: Option<Salt>) -> Result<Self, Error> {
        let salt = salt.ok_or_else(|| Error::config("anonymization salt is not configured"))?;
        Ok(Self { salt })
    }

    /// Token for `address` within `bucket`.
    pub fn token(&self, address: &str, bucket: &Bucket) -> Token {
        let address = address.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(address.as_bytes());
        hasher.update(b"|");
        hasher.update(bucket.discriminator().as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Token::from_digest(&digest)
    }

    /// Day and all-time tokens for a claim by `address` in the day starting at
    /// `day_start`.
    pub fn tokens(&self, address: &str, day_start: i64) -> TokenPair {
        TokenPair {
            day: self.token(address, &Bucket::Day(day_start)),
            all_time: self.token(address, &Bucket::AllTime),
        }
    }
}
