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

use crate::{BoolExp, ColumnInfo, MutationOutput, MutationValue};

/// Abstract representation of an update mutation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotatedUpdate {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub variant: UpdateVariant,
    /// Condition every updated row must satisfy after the update
    pub check: Option<BoolExp>,
    pub output: MutationOutput,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum UpdateVariant {
    SingleBatch(UpdateBatch),
    /// Batches are applied in order, each seeing the effect of the previous ones
    MultipleBatches(Vec<UpdateBatch>),
}

impl UpdateVariant {
    pub fn batches(&self) -> Vec<&UpdateBatch> {
        match self {
            UpdateVariant::SingleBatch(batch) => vec![batch],
            UpdateVariant::MultipleBatches(batches) => batches.iter().collect(),
        }
    }
}

/// A set of column operations applied to all rows matching a filter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdateBatch {
    /// No column appears more than once
    pub operations: Vec<ColumnUpdate>,
    /// The client's filter conjoined with the update permission's filter
    pub filter: BoolExp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnUpdate {
    pub column: String,
    pub operation: UpdateOperation,
}

impl ColumnUpdate {
    pub fn new(column: impl Into<String>, operation: UpdateOperation) -> Self {
        Self {
            column: column.into(),
            operation,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Replace the current value
    Set(MutationValue),
    /// Add to the current (numeric) value
    Increment(MutationValue),
    /// Append to the current JSON value
    Append(Val),
    /// Prepend to the current JSON value
    Prepend(Val),
    /// Remove a key from the current JSON object
    DeleteKey(String),
    /// Remove an element (negative indices count from the end) from the current JSON array
    DeleteElement(i64),
    /// Remove the value at a path in the current JSON value
    DeleteAtPath(Vec<String>),
}
