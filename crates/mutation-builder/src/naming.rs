// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Names of the generated root fields, types, fields, and enum values.
//!
//! Every generated name is derived from a snake_case form (such as `articles_insert_input`) and then
//! cased according to the naming convention in effect. Operator arguments (`_set`, `_inc`, etc.) and
//! `__typename` keep their form under every convention.

use std::sync::LazyLock;

use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToUpperCamelCase};
use regex::Regex;
use serde::{Deserialize, Serialize};

use mutation_model::catalog::{RootFieldKind, Table};

use crate::error::SchemaBuildingError;

static GRAPHQL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").expect("valid regex"));

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingConvention {
    /// Names as they appear in the catalog (`insert_articles`, `articles_insert_input`)
    #[default]
    HasuraDefault,
    /// camelCase fields, PascalCase types, and SCREAMING_CASE enum values
    GraphqlDefault,
}

impl NamingConvention {
    pub fn field_name(&self, snake: &str) -> String {
        match self {
            NamingConvention::HasuraDefault => snake.to_string(),
            NamingConvention::GraphqlDefault => snake.to_lower_camel_case(),
        }
    }

    pub fn type_name(&self, snake: &str) -> String {
        match self {
            NamingConvention::HasuraDefault => snake.to_string(),
            NamingConvention::GraphqlDefault => snake.to_upper_camel_case(),
        }
    }

    pub fn enum_value(&self, raw: &str) -> String {
        match self {
            NamingConvention::HasuraDefault => raw.to_string(),
            NamingConvention::GraphqlDefault => raw.to_shouty_snake_case(),
        }
    }
}

pub fn validate_name(name: &str) -> Result<(), SchemaBuildingError> {
    if GRAPHQL_NAME.is_match(name) {
        Ok(())
    } else {
        Err(SchemaBuildingError::InvalidName(name.to_string()))
    }
}

/// Generated names for one table
pub struct TableNames<'a> {
    table: &'a Table,
    naming: NamingConvention,
}

impl<'a> TableNames<'a> {
    pub fn new(table: &'a Table, naming: NamingConvention) -> Self {
        Self { table, naming }
    }

    fn typ(&self, suffix: &str) -> String {
        self.naming
            .type_name(&format!("{}_{suffix}", self.table.base_name()))
    }

    /// The name of the root field, honoring a custom name set on the table
    pub fn root_field(&self, kind: RootFieldKind) -> String {
        let custom = self
            .table
            .custom_root_fields
            .get(kind)
            .and_then(|custom| custom.name.clone());

        custom.unwrap_or_else(|| {
            let base = self.table.base_name();
            let snake = match kind {
                RootFieldKind::Insert => format!("insert_{base}"),
                RootFieldKind::InsertOne => format!("insert_{base}_one"),
                RootFieldKind::Update => format!("update_{base}"),
                RootFieldKind::UpdateByPk => format!("update_{base}_by_pk"),
                RootFieldKind::UpdateMany => format!("update_{base}_many"),
                RootFieldKind::Delete => format!("delete_{base}"),
                RootFieldKind::DeleteByPk => format!("delete_{base}_by_pk"),
            };
            self.naming.field_name(&snake)
        })
    }

    pub fn root_field_description(&self, kind: RootFieldKind) -> String {
        let custom = self
            .table
            .custom_root_fields
            .get(kind)
            .and_then(|custom| custom.comment.clone());

        custom.unwrap_or_else(|| {
            let table = &self.table.name;
            match kind {
                RootFieldKind::Insert => format!("insert data into the table: \"{table}\""),
                RootFieldKind::InsertOne => {
                    format!("insert a single row into the table: \"{table}\"")
                }
                RootFieldKind::Update => format!("update data of the table: \"{table}\""),
                RootFieldKind::UpdateByPk => {
                    format!("update single row of the table: \"{table}\"")
                }
                RootFieldKind::UpdateMany => {
                    format!("update multiples rows of table: \"{table}\"")
                }
                RootFieldKind::Delete => format!("delete data from the table: \"{table}\""),
                RootFieldKind::DeleteByPk => {
                    format!("delete single row from the table: \"{table}\"")
                }
            }
        })
    }

    /// The object type of a row (as used by `returning` and the single-row fields)
    pub fn row_type(&self) -> String {
        self.naming.type_name(self.table.base_name())
    }

    pub fn insert_input(&self) -> String {
        self.typ("insert_input")
    }

    pub fn obj_rel_insert_input(&self) -> String {
        self.typ("obj_rel_insert_input")
    }

    pub fn arr_rel_insert_input(&self) -> String {
        self.typ("arr_rel_insert_input")
    }

    pub fn on_conflict(&self) -> String {
        self.typ("on_conflict")
    }

    pub fn constraint(&self) -> String {
        self.typ("constraint")
    }

    pub fn update_column(&self) -> String {
        self.typ("update_column")
    }

    pub fn operator_input(&self, suffix: &str) -> String {
        self.typ(suffix)
    }

    pub fn pk_columns_input(&self) -> String {
        self.typ("pk_columns_input")
    }

    pub fn updates(&self) -> String {
        self.typ("updates")
    }

    pub fn mutation_response(&self) -> String {
        self.typ("mutation_response")
    }

    pub fn bool_exp(&self) -> String {
        self.typ("bool_exp")
    }

    pub fn column_field(&self, column: &str) -> String {
        self.naming.field_name(column)
    }

    /// Check the names every shape of this table generates.
    ///
    /// All type names share the table's base name, so checking one of them covers the rest.
    pub fn validate(&self) -> Result<(), SchemaBuildingError> {
        validate_name(&self.row_type())?;
        validate_name(&self.insert_input())?;
        for column in &self.table.columns {
            validate_name(&self.column_field(&column.name))?;
        }
        for relationship in &self.table.relationships {
            validate_name(&self.naming.field_name(&relationship.name))?;
        }
        Ok(())
    }
}
