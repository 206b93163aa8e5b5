// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Shared state while building the mutation schema of one role.
//!
//! Shapes are memoized by (table, kind of shape, permission fingerprint). Building an input object
//! type happens in two steps: a shallow placeholder is registered under its key first, and only then
//! its fields are computed. A recursive request for the same key (say, through a relationship that
//! leads back to the table being built) finds the placeholder and refers to it, which terminates the
//! recursion. Once expanded, the placeholder is replaced in place, so every reference sees the
//! complete type.

use std::collections::HashMap;

use mutation_model::{
    catalog::{Catalog, TableId},
    mapped_arena::MappedArena,
    permission::RolePermissions,
};

use crate::{
    config::MutationSchemaConfig,
    error::SchemaBuildingError,
    naming::{NamingConvention, TableNames},
    shape::{EnumType, EnumTypeId, InputObjectType, InputObjectTypeId},
    update_operator_builder::UpdateOperatorKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    InsertInput,
    ObjectRelationInsert,
    ArrayRelationInsert,
    OnConflict,
    ConstraintEnum,
    UpdateColumnEnum,
    UpdateOperator(UpdateOperatorKind),
    PrimaryKeyColumns,
    Updates,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    table: String,
    kind: ShapeKind,
    fingerprint: String,
}

impl ShapeKey {
    pub fn new(table: &str, kind: ShapeKind, fingerprint: String) -> Self {
        Self {
            table: table.to_string(),
            kind,
            fingerprint,
        }
    }
}

pub struct SchemaBuilding<'a> {
    pub catalog: &'a Catalog,
    pub permissions: &'a RolePermissions,
    pub config: &'a MutationSchemaConfig,
    pub input_types: MappedArena<InputObjectType>,
    pub enum_types: MappedArena<EnumType>,
    input_type_memo: HashMap<ShapeKey, InputObjectTypeId>,
    enum_type_memo: HashMap<ShapeKey, EnumTypeId>,
    expansions: HashMap<ShapeKey, usize>,
}

impl<'a> SchemaBuilding<'a> {
    pub fn new(
        catalog: &'a Catalog,
        permissions: &'a RolePermissions,
        config: &'a MutationSchemaConfig,
    ) -> Self {
        Self {
            catalog,
            permissions,
            config,
            input_types: MappedArena::default(),
            enum_types: MappedArena::default(),
            input_type_memo: HashMap::new(),
            enum_type_memo: HashMap::new(),
            expansions: HashMap::new(),
        }
    }

    pub fn naming(&self) -> NamingConvention {
        self.config.naming
    }

    pub fn table_names(&self, table_id: TableId) -> TableNames<'a> {
        let catalog: &'a Catalog = self.catalog;
        TableNames::new(&catalog[table_id], self.config.naming)
    }

    pub fn memoized_input_type(&self, key: &ShapeKey) -> Option<InputObjectTypeId> {
        self.input_type_memo.get(key).copied()
    }

    /// Get the input object type for `key`, expanding it if this is the first request.
    ///
    /// `expand` runs at most once per key. It may (directly or indirectly) request the same key
    /// again, in which case it gets the id of the (still shallow) type being built. A name already
    /// taken by a type of another key is an error, and the existing type is left untouched.
    pub fn input_type(
        &mut self,
        key: ShapeKey,
        name: String,
        expand: impl FnOnce(&mut SchemaBuilding<'a>) -> InputObjectType,
    ) -> Result<InputObjectTypeId, SchemaBuildingError> {
        if let Some(existing) = self.memoized_input_type(&key) {
            return Ok(existing);
        }
        if self.is_type_name_taken(&name) {
            return Err(SchemaBuildingError::DuplicateType(name));
        }

        let id = self
            .input_types
            .add(&name, InputObjectType::shallow(name.clone()));
        self.input_type_memo.insert(key.clone(), id);

        let expanded = expand(self);
        self.input_types[id] = expanded;
        *self.expansions.entry(key).or_default() += 1;

        Ok(id)
    }

    /// Input objects and enums share one namespace in the rendered schema
    fn is_type_name_taken(&self, name: &str) -> bool {
        self.input_types.get_id(name).is_some() || self.enum_types.get_id(name).is_some()
    }

    /// Get the enum type for `key`, building it if this is the first request
    pub fn enum_type(
        &mut self,
        key: ShapeKey,
        build: impl FnOnce(&SchemaBuilding<'a>) -> EnumType,
    ) -> Result<EnumTypeId, SchemaBuildingError> {
        if let Some(existing) = self.enum_type_memo.get(&key) {
            return Ok(*existing);
        }

        let enum_type = build(self);
        let name = enum_type.name.clone();
        if self.is_type_name_taken(&name) {
            return Err(SchemaBuildingError::DuplicateType(name));
        }

        let id = self.enum_types.add(&name, enum_type);
        self.enum_type_memo.insert(key.clone(), id);
        *self.expansions.entry(key).or_default() += 1;

        Ok(id)
    }

    #[cfg(test)]
    pub fn expansion_count(&self, key: &ShapeKey) -> usize {
        self.expansions.get(key).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn max_expansion_count(&self) -> usize {
        self.expansions.values().copied().max().unwrap_or(0)
    }

    pub fn into_types(self) -> (MappedArena<InputObjectType>, MappedArena<EnumType>) {
        (self.input_types, self.enum_types)
    }
}
