// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The annotated mutation IR.
//!
//! An [AnnotatedMutation] declares the intention of a single mutation after every permission
//! has been resolved: the rows to insert (along with rows in related tables), the operations to
//! apply to each column of matching rows, or the rows to delete. Each variant also carries the
//! [MutationOutput] the client asked for.
//!
//! Nothing here knows about roles, GraphQL types, or how the operation will eventually be executed.
//! Values are [MutationValue]s, which may refer to session variables or column default expressions
//! that only the execution engine can evaluate.

mod bool_exp;
mod column;
mod delete;
mod insert;
mod mutation;
mod output;
mod update;
mod value;

pub use bool_exp::{BoolExp, ComparisonOperator};
pub use column::{ColumnInfo, ColumnType, ScalarKind};
pub use delete::AnnotatedDelete;
pub use insert::{
    AnnotatedInsert, ArrayRelationInsert, ConflictClause, InsertChecks, InsertRow,
    MultiRowInsert, ObjectRelationInsert, RelationshipInsertInfo,
};
pub use mutation::AnnotatedMutation;
pub use output::{MutationOutput, MutationOutputField, ProjectedField, ReadProjection};
pub use update::{AnnotatedUpdate, ColumnUpdate, UpdateBatch, UpdateOperation, UpdateVariant};
pub use value::MutationValue;
