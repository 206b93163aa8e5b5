// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::{BoolExp, ColumnInfo, MutationOutput};

/// Abstract representation of a delete mutation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotatedDelete {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    /// The client's filter conjoined with the delete permission's filter
    pub filter: BoolExp,
    pub output: MutationOutput,
}
