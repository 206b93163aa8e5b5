// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::{AnnotatedDelete, AnnotatedInsert, AnnotatedUpdate, MutationOutput};

/// The fully resolved form of one mutation field in a request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum AnnotatedMutation {
    Insert(AnnotatedInsert),
    Update(AnnotatedUpdate),
    Delete(AnnotatedDelete),
}

impl AnnotatedMutation {
    pub fn table(&self) -> &str {
        match self {
            AnnotatedMutation::Insert(insert) => &insert.insert.table,
            AnnotatedMutation::Update(update) => &update.table,
            AnnotatedMutation::Delete(delete) => &delete.table,
        }
    }

    pub fn output(&self) -> &MutationOutput {
        match self {
            AnnotatedMutation::Insert(insert) => &insert.output,
            AnnotatedMutation::Update(update) => &update.output,
            AnnotatedMutation::Delete(delete) => &delete.output,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AnnotatedMutation::Insert(_) => "insert",
            AnnotatedMutation::Update(_) => "update",
            AnnotatedMutation::Delete(_) => "delete",
        }
    }
}
