// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::BoolExp;

/// What the client asked to get back from a mutation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MutationOutput {
    /// The mutation response object (for mutations that affect many rows). Each field is paired with its alias.
    MultipleRows(Vec<(String, MutationOutputField)>),
    /// The mutated row itself (`null` if no row was affected)
    SingleRow(ReadProjection),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MutationOutputField {
    AffectedRows,
    Returning(ReadProjection),
    TypeName(String),
}

/// A projection of the mutated rows, restricted to what the caller may read
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReadProjection {
    pub table: String,
    /// Projected fields paired with their alias
    pub fields: Vec<(String, ProjectedField)>,
    /// Filter of the select permission. Mutated rows not satisfying it are not returned.
    pub filter: BoolExp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ProjectedField {
    Column(String),
    TypeName(String),
}
