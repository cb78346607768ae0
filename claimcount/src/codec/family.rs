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

use crate::error::Error;

/// Serialized sketch families understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    Hll,
}

impl Family {
    pub const fn id(self) -> u8 {
        match self {
            Family::Hll => 7,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Family::Hll => "HllSketch",
        }
    }

    pub fn validate_id(self, family_id: u8) -> Result<(), Error> {
        if family_id == self.id() {
            Ok(())
        } else {
            Err(Error::invalid_family(self.id(), family_id, self.name()))
        }
    }
}
