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

//! Eligibility gate: only addresses verified as human on some chain are counted.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::Error;

/// Decides whether an address may be counted at all.
#[async_trait]
pub trait HumanityCheck: Send + Sync {
    /// Returns whether `address` is verified as human on any supported chain.
    ///
    /// An `Err` means the answer is unknown; callers must not count the address.
    async fn is_human_on_any_supported_chain(&self, address: &str) -> Result<bool, Error>;
}

/// Humanity read against a single network.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Network name, used in logs and error context.
    fn chain(&self) -> &str;

    /// Returns whether `address` is verified as human on this network.
    async fn is_human(&self, address: &str) -> Result<bool, Error>;
}

/// [`HumanityCheck`] that asks every configured chain concurrently.
///
/// A single positive answer is enough. Without one, any failed read makes the whole
/// check fail, since a negative from every chain cannot be established.
#[derive(Clone, Default)]
pub struct MultiChainHumanity {
    readers: Vec<Arc<dyn ChainReader>>,
}

impl MultiChainHumanity {
    /// Creates a check over the given chains.
    pub fn new(readers: Vec<Arc<dyn ChainReader>>) -> Self {
        Self { readers }
    }

    /// Adds a chain.
    pub fn with_chain(mut self, reader: Arc<dyn ChainReader>) -> Self {
        self.readers.push(reader);
        self
    }

    /// Names of the configured chains.
    pub fn chains(&self) -> Vec<&str> {
        self.readers.iter().map(|r| r.chain()).collect()
    }
}

#[async_trait]
impl HumanityCheck for MultiChainHumanity {
    async fn is_human_on_any_supported_chain(&self, address: &str) -> Result<bool, Error> {
        let reads = join_all(self.readers.iter().map(|r| r.is_human(address))).await;

        let mut failure = None;
        for (reader, read) in self.readers.iter().zip(reads) {
            match read {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(chain = reader.chain(), error = %err, "humanity read failed");
                    if failure.is_none() {
                        failure = Some(err.with_context("chain", reader.chain()));
                    }
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Fixed {
        chain: &'static str,
        answer: Option<bool>,
    }

    #[async_trait]
    impl ChainReader for Fixed {
        fn chain(&self) -> &str {
            self.chain
        }

        async fn is_human(&self, _address: &str) -> Result<bool, Error> {
            self.answer
                .ok_or_else(|| Error::verification("rpc unavailable"))
        }
    }

    fn reader(chain: &'static str, answer: Option<bool>) -> Arc<dyn ChainReader> {
        Arc::new(Fixed { chain, answer })
    }

    #[tokio::test]
    async fn test_no_chains_is_negative() {
        let check = MultiChainHumanity::default();
        assert!(!check.is_human_on_any_supported_chain("0x1").await.unwrap());
    }

    #[tokio::test]
    async fn test_any_positive_wins() {
        let check = MultiChainHumanity::new(vec![
            reader("base", Some(false)),
            reader("optimism", None),
            reader("celo", Some(true)),
        ]);
        assert!(check.is_human_on_any_supported_chain("0x1").await.unwrap());
        assert_eq!(check.chains(), vec!["base", "optimism", "celo"]);
    }

    #[tokio::test]
    async fn test_failure_without_positive_is_error() {
        let check = MultiChainHumanity::default()
            .with_chain(reader("base", Some(false)))
            .with_chain(reader("optimism", None));
        let err = check
            .is_human_on_any_supported_chain("0x1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Verification);
        assert!(err.to_string().contains("chain: optimism"));
    }

    #[tokio::test]
    async fn test_all_negative() {
        let check = MultiChainHumanity::new(vec![
            reader("base", Some(false)),
            reader("celo", Some(false)),
        ]);
        assert!(!check.is_human_on_any_supported_chain("0x1").await.unwrap());
    }
}
