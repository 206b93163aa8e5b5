// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use serde::{Deserialize, Serialize};

/// A value to be written to (or compared against) a column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MutationValue {
    /// A value supplied by the client or fixed by a permission preset
    Literal(Val),
    /// A value taken from the session of the caller (for example `x-user-id`), resolved at execution time
    SessionVariable(String),
    /// A database expression such as a column default (`now()`, `nextval('...')`)
    Expression(String),
}

impl From<Val> for MutationValue {
    fn from(value: Val) -> Self {
        MutationValue::Literal(value)
    }
}
