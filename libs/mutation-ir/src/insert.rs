// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Abstraction to insert rows in a table as well as related tables.
//!
//! Consider the following mutation (`articles` has an object relationship `author` and an array
//! relationship `comments`):
//!
//! ```graphql
//! mutation {
//!   insert_articles(objects: [{
//!     title: "Hello",
//!     author: { data: { name: "Alice" }, on_conflict: { constraint: authors_name_key, update_columns: [] } },
//!     comments: { data: [{ body: "First!" }, { body: "Second!" }] }
//!   }]) {
//!     affected_rows
//!   }
//! }
//! ```
//!
//! This becomes a [MultiRowInsert] for `articles` with a single [InsertRow] that assigns `title`
//! explicitly and carries one [ObjectRelationInsert] (itself a single-row [MultiRowInsert] for
//! `authors` with a do-nothing [ConflictClause]) and one [ArrayRelationInsert] with two rows for
//! `comments`. Linking the rows through the relationship's column mapping is up to the execution
//! engine.

use common::value::Val;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{BoolExp, ColumnInfo, MutationOutput, MutationValue};

/// A root insert mutation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotatedInsert {
    pub insert: MultiRowInsert,
    pub output: MutationOutput,
}

/// Rows to insert into one table, along with everything needed to insert them on behalf of the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MultiRowInsert {
    pub table: String,
    /// All columns of the table (not just the ones being assigned)
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<InsertRow>,
    pub conflict: Option<ConflictClause>,
    pub checks: InsertChecks,
    /// Values for columns a row doesn't assign explicitly. Permission presets override
    /// column defaults declared in the catalog.
    pub defaults: IndexMap<String, MutationValue>,
}

/// One row to insert
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct InsertRow {
    /// Columns assigned by the client
    pub columns: IndexMap<String, MutationValue>,
    pub object_relationships: Vec<ObjectRelationInsert>,
    pub array_relationships: Vec<ArrayRelationInsert>,
}

impl InsertRow {
    pub fn column(&self, name: &str) -> Option<&MutationValue> {
        self.columns.get(name)
    }

    pub fn literal(&self, name: &str) -> Option<&Val> {
        match self.columns.get(name) {
            Some(MutationValue::Literal(value)) => Some(value),
            _ => None,
        }
    }
}

/// The relationship traversed by a nested insert
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RelationshipInsertInfo {
    pub name: String,
    pub target_table: String,
    /// Source column to target column
    pub column_mapping: IndexMap<String, String>,
}

/// A row inserted through an object relationship (at most one related row)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObjectRelationInsert {
    pub relationship: RelationshipInsertInfo,
    /// Always holds exactly one row
    pub insert: MultiRowInsert,
}

/// Rows inserted through an array relationship
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArrayRelationInsert {
    pub relationship: RelationshipInsertInfo,
    pub insert: MultiRowInsert,
}

/// Conditions each inserted row must satisfy.
///
/// With an upsert, a row may end up being inserted or updated, so the execution engine needs both
/// conditions to validate whichever actually happened.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InsertChecks {
    pub insert_check: BoolExp,
    pub update_check: Option<BoolExp>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ConflictClause {
    DoNothing {
        constraint: Option<String>,
    },
    Update {
        constraint: String,
        /// Columns overwritten from the incoming row
        columns: Vec<String>,
        /// Preset values of the update permission
        presets: IndexMap<String, MutationValue>,
        /// The client's filter conjoined with the update permission's filter
        filter: BoolExp,
    },
}
