// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Catalog records: tables, their columns, constraints, and relationships.
//!
//! The catalog is loaded (and validated for basic consistency) before any mutation schema is built,
//! and is immutable afterwards.

use std::ops;

use indexmap::IndexMap;
use mutation_ir::{ColumnInfo, ColumnType};
use serde::{Deserialize, Serialize};

use crate::mapped_arena::{MappedArena, SerializableSlabIndex};

pub type TableId = SerializableSlabIndex<Table>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Table {
    pub name: String,
    /// Name to use (instead of `name`) as the base of generated field and type names
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub custom_root_fields: CustomRootFields,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Column {
    pub name: String,
    pub typ: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Default expression declared in the database (such as `now()`)
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// At most one related row
    Object,
    /// Any number of related rows
    Array,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Relationship {
    pub name: String,
    pub kind: RelationshipKind,
    pub target_table: String,
    /// Column of this table to the column of the target table
    #[serde(default)]
    pub column_mapping: IndexMap<String, String>,
}

/// The mutation root fields a table may expose
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootFieldKind {
    Insert,
    InsertOne,
    Update,
    UpdateByPk,
    UpdateMany,
    Delete,
    DeleteByPk,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CustomRootField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CustomRootFields {
    pub insert: Option<CustomRootField>,
    pub insert_one: Option<CustomRootField>,
    pub update: Option<CustomRootField>,
    pub update_by_pk: Option<CustomRootField>,
    pub update_many: Option<CustomRootField>,
    pub delete: Option<CustomRootField>,
    pub delete_by_pk: Option<CustomRootField>,
}

impl RootFieldKind {
    pub const ALL: [RootFieldKind; 7] = [
        RootFieldKind::Insert,
        RootFieldKind::InsertOne,
        RootFieldKind::Update,
        RootFieldKind::UpdateByPk,
        RootFieldKind::UpdateMany,
        RootFieldKind::Delete,
        RootFieldKind::DeleteByPk,
    ];
}

impl CustomRootFields {
    pub fn get(&self, kind: RootFieldKind) -> Option<&CustomRootField> {
        match kind {
            RootFieldKind::Insert => self.insert.as_ref(),
            RootFieldKind::InsertOne => self.insert_one.as_ref(),
            RootFieldKind::Update => self.update.as_ref(),
            RootFieldKind::UpdateByPk => self.update_by_pk.as_ref(),
            RootFieldKind::UpdateMany => self.update_many.as_ref(),
            RootFieldKind::Delete => self.delete.as_ref(),
            RootFieldKind::DeleteByPk => self.delete_by_pk.as_ref(),
        }
    }
}

impl Column {
    pub fn info(&self) -> ColumnInfo {
        ColumnInfo {
            name: self.name.clone(),
            typ: self.typ,
            nullable: self.nullable,
        }
    }
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_infos(&self) -> Vec<ColumnInfo> {
        self.columns.iter().map(Column::info).collect()
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|constraint| constraint.kind == ConstraintKind::PrimaryKey)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.name == name)
    }

    /// The base for generated names
    pub fn base_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.name)
    }
}

/// All tables known to the system
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Catalog {
    tables: MappedArena<Table>,
}

impl Catalog {
    pub fn new(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut arena = MappedArena::default();
        for table in tables {
            let name = table.name.clone();
            arena.add(&name, table);
        }
        Self { tables: arena }
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables.get_id(name)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get_by_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableId, &Table)> {
        self.tables.iter()
    }
}

impl ops::Index<TableId> for Catalog {
    type Output = Table;

    fn index(&self, id: TableId) -> &Table {
        &self.tables[id]
    }
}
