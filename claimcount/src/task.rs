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

//! Dispatch of claim counting off the request path.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// Runs detached background work.
pub trait TaskSpawner: Send + Sync {
    /// Spawns `fut`; the caller never waits for it.
    fn spawn(&self, fut: BoxFuture<'static, ()>);
}

/// [`TaskSpawner`] on a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Spawns onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawns onto the runtime the caller is running in, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        // the join handle is dropped: the task is detached
        drop(self.handle.spawn(fut));
    }
}

/// How a recorded claim is counted relative to the caller.
#[derive(Clone)]
pub enum Dispatch {
    /// Counting runs as a detached task; recording returns immediately.
    Detached(Arc<dyn TaskSpawner>),
    /// Counting is awaited before recording returns, for environments that cannot
    /// keep work alive after the response is sent.
    Inline,
}

impl Dispatch {
    /// Detached on the current Tokio runtime when there is one, inline otherwise.
    pub fn from_current_runtime() -> Self {
        match TokioSpawner::try_current() {
            Some(spawner) => Dispatch::Detached(Arc::new(spawner)),
            None => Dispatch::Inline,
        }
    }

    /// Returns true for [`Dispatch::Detached`].
    pub fn is_detached(&self) -> bool {
        matches!(self, Dispatch::Detached(_))
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Detached(_) => f.write_str("Detached"),
            Dispatch::Inline => f.write_str("Inline"),
        }
    }
}
