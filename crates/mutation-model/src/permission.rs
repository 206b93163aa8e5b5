// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Permission grants of a role.
//!
//! Grants are resolved for a role before any mutation schema is built. A missing grant (`None`)
//! means the role has no rights of that kind on the table.

use std::collections::HashMap;

use indexmap::IndexMap;
use mutation_ir::{BoolExp, MutationValue};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InsertPermission {
    /// Columns the caller may set
    pub columns: Vec<String>,
    /// Condition each inserted row must satisfy
    #[serde(default = "BoolExp::always_true")]
    pub check: BoolExp,
    /// Values set on behalf of the caller
    #[serde(default)]
    pub presets: IndexMap<String, MutationValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdatePermission {
    pub columns: Vec<String>,
    /// Rows that may be updated
    #[serde(default = "BoolExp::always_true")]
    pub filter: BoolExp,
    /// Condition each updated row must satisfy after the update
    #[serde(default)]
    pub check: Option<BoolExp>,
    #[serde(default)]
    pub presets: IndexMap<String, MutationValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeletePermission {
    #[serde(default = "BoolExp::always_true")]
    pub filter: BoolExp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectPermission {
    pub columns: Vec<String>,
    #[serde(default = "BoolExp::always_true")]
    pub filter: BoolExp,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TablePermissions {
    #[serde(default)]
    pub insert: Option<InsertPermission>,
    #[serde(default)]
    pub update: Option<UpdatePermission>,
    #[serde(default)]
    pub delete: Option<DeletePermission>,
    #[serde(default)]
    pub select: Option<SelectPermission>,
}

/// Grants of one role, by table name
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RolePermissions {
    pub role: String,
    #[serde(default)]
    pub tables: HashMap<String, TablePermissions>,
}

/// A stable textual identity of a grant, used to key built shapes.
pub fn fingerprint<T: Serialize + std::fmt::Debug>(grant: &T) -> String {
    // Serialization only fails for non-string map keys, which grants don't have
    serde_json::to_string(grant).unwrap_or_else(|_| format!("{grant:?}"))
}

impl InsertPermission {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            check: BoolExp::always_true(),
            presets: IndexMap::new(),
        }
    }

    pub fn with_check(self, check: BoolExp) -> Self {
        Self { check, ..self }
    }

    pub fn with_preset(mut self, column: &str, value: MutationValue) -> Self {
        self.presets.insert(column.to_string(), value);
        self
    }

    pub fn allows(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

impl UpdatePermission {
    pub fn new(columns: &[&str], filter: BoolExp) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            filter,
            check: None,
            presets: IndexMap::new(),
        }
    }

    pub fn with_check(self, check: BoolExp) -> Self {
        Self {
            check: Some(check),
            ..self
        }
    }

    pub fn with_preset(mut self, column: &str, value: MutationValue) -> Self {
        self.presets.insert(column.to_string(), value);
        self
    }

    pub fn allows(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Whether an update can change anything at all (explicitly or through presets)
    pub fn has_effect(&self) -> bool {
        !self.columns.is_empty() || !self.presets.is_empty()
    }
}

impl DeletePermission {
    pub fn new(filter: BoolExp) -> Self {
        Self { filter }
    }
}

impl SelectPermission {
    pub fn new(columns: &[&str], filter: BoolExp) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            filter,
            limit: None,
        }
    }

    pub fn allows(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn allows_all<'a>(&self, mut columns: impl Iterator<Item = &'a str>) -> bool {
        columns.all(|column| self.allows(column))
    }
}

impl TablePermissions {
    pub fn is_empty(&self) -> bool {
        self.insert.is_none()
            && self.update.is_none()
            && self.delete.is_none()
            && self.select.is_none()
    }
}

impl RolePermissions {
    pub fn new(role: &str) -> Self {
        Self {
            role: role.to_string(),
            tables: HashMap::new(),
        }
    }

    pub fn with_table(mut self, table: &str, permissions: TablePermissions) -> Self {
        self.tables.insert(table.to_string(), permissions);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TablePermissions> {
        self.tables.get(name)
    }

    pub fn insert(&self, table: &str) -> Option<&InsertPermission> {
        self.table(table).and_then(|p| p.insert.as_ref())
    }

    pub fn update(&self, table: &str) -> Option<&UpdatePermission> {
        self.table(table).and_then(|p| p.update.as_ref())
    }

    pub fn delete(&self, table: &str) -> Option<&DeletePermission> {
        self.table(table).and_then(|p| p.delete.as_ref())
    }

    pub fn select(&self, table: &str) -> Option<&SelectPermission> {
        self.table(table).and_then(|p| p.select.as_ref())
    }
}
