// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

/// The type of a column as declared in the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    BigInt,
    Float,
    Numeric,
    Boolean,
    Text,
    Uuid,
    Date,
    Time,
    Timestamp,
    Json,
}

/// Coarse classification of column types.
///
/// The classification decides which update operators apply to a column (increment for numeric
/// columns, the JSON operators for JSON columns) and how argument values are checked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer,
    Decimal,
    Boolean,
    Text,
    Temporal,
    Json,
}

impl ColumnType {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ColumnType::Int | ColumnType::BigInt => ScalarKind::Integer,
            ColumnType::Float | ColumnType::Numeric => ScalarKind::Decimal,
            ColumnType::Boolean => ScalarKind::Boolean,
            ColumnType::Text | ColumnType::Uuid => ScalarKind::Text,
            ColumnType::Date | ColumnType::Time | ColumnType::Timestamp => ScalarKind::Temporal,
            ColumnType::Json => ScalarKind::Json,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind(), ScalarKind::Integer | ScalarKind::Decimal)
    }
}

/// A column of the table being mutated, as seen by the execution engine
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub typ: ColumnType,
    pub nullable: bool,
}
