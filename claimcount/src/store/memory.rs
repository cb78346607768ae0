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

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bucket::CounterKey;
use crate::error::Error;
use crate::store::SketchStore;
use crate::store::Versioned;

/// In-process [`SketchStore`] backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemorySketchStore {
    entries: Mutex<BTreeMap<CounterKey, Versioned>>,
}

impl MemorySketchStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Every stored key, in key order.
    pub fn keys(&self) -> Vec<CounterKey> {
        self.entries.lock().keys().copied().collect()
    }

    /// Overwrites `key` regardless of its version.
    pub fn insert_raw(&self, key: CounterKey, bytes: Vec<u8>) {
        let mut entries = self.entries.lock();
        let version = entries.get(&key).map_or(1, |v| v.version + 1);
        entries.insert(key, Versioned { version, bytes });
    }
}

#[async_trait]
impl SketchStore for MemorySketchStore {
    async fn get(&self, key: &CounterKey) -> Result<Option<Versioned>, Error> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(
        &self,
        key: &CounterKey,
        bytes: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool, Error> {
        let mut entries = self.entries.lock();
        let current = entries.get(key).map(|v| v.version);
        if current != expected {
            return Ok(false);
        }
        let version = current.map_or(1, |v| v + 1);
        entries.insert(*key, Versioned { version, bytes });
        Ok(true)
    }
}
