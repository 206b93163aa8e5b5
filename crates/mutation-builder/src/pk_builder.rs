// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use common::value::Val;
use mutation_ir::{BoolExp, ColumnInfo};
use mutation_model::{catalog::TableId, permission::fingerprint};

use crate::{
    arguments::{check_column_value, field_value},
    building::{SchemaBuilding, ShapeKey, ShapeKind},
    conflict_builder::constraint_columns,
    error::{ArgumentErrors, ArgumentPath, SchemaBuildingError, collect_all},
    shape::{
        ArgumentDefinition, FieldSource, FieldType, InputField, InputObjectKind, InputObjectType,
        InputObjectTypeId, InputTypeRef,
    },
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PrimaryKeyColumn {
    pub field_name: String,
    pub column: ColumnInfo,
}

/// The primary key columns, identifying a single row
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PrimaryKeyShape {
    pub columns: Vec<PrimaryKeyColumn>,
}

/// Build the primary key shape of a table.
///
/// Returns `None` if the table has no primary key, or if the role may not read every one of its
/// columns (identifying a row by values one can't read would reveal them).
pub fn build_primary_key_shape(
    building: &SchemaBuilding,
    table_id: TableId,
) -> Result<Option<PrimaryKeyShape>, SchemaBuildingError> {
    let catalog = building.catalog;
    let table = &catalog[table_id];

    let Some(select) = building.permissions.select(&table.name) else {
        return Ok(None);
    };
    let Some(primary_key) = table.primary_key() else {
        return Ok(None);
    };

    let columns = constraint_columns(table, primary_key)?;
    if !select.allows_all(columns.iter().map(|column| column.name.as_str())) {
        return Ok(None);
    }

    let naming = building.naming();
    Ok(Some(PrimaryKeyShape {
        columns: columns
            .into_iter()
            .map(|column| PrimaryKeyColumn {
                field_name: naming.field_name(&column.name),
                column: column.info(),
            })
            .collect(),
    }))
}

impl PrimaryKeyShape {
    /// The primary key columns as top-level arguments (as used by `delete_<table>_by_pk`)
    pub fn argument_definitions(&self) -> Vec<ArgumentDefinition> {
        self.columns
            .iter()
            .map(|pk| ArgumentDefinition {
                name: pk.field_name.clone(),
                typ: FieldType::Plain(InputTypeRef::Scalar(pk.column.typ)),
                description: None,
            })
            .collect()
    }

    /// The `<table>_pk_columns_input` type (as used by `update_<table>_by_pk`)
    pub fn input_type(
        &self,
        building: &mut SchemaBuilding,
        table_id: TableId,
    ) -> Result<InputObjectTypeId, SchemaBuildingError> {
        let catalog = building.catalog;
        let table = &catalog[table_id];
        let type_name = building.table_names(table_id).pk_columns_input();
        let field_names: Vec<_> = self.columns.iter().map(|pk| &pk.field_name).collect();

        building.input_type(
            ShapeKey::new(
                &table.name,
                ShapeKind::PrimaryKeyColumns,
                fingerprint(&field_names),
            ),
            type_name.clone(),
            |_| InputObjectType {
                name: type_name,
                description: Some(format!(
                    "primary key columns input for table: {}",
                    table.name
                )),
                fields: self
                    .columns
                    .iter()
                    .map(|pk| InputField {
                        name: pk.field_name.clone(),
                        typ: FieldType::Plain(InputTypeRef::Scalar(pk.column.typ)),
                        description: None,
                        source: FieldSource::Column(pk.column.clone()),
                    })
                    .collect(),
                kind: InputObjectKind::PrimaryKeyColumns,
            },
        )
    }

    /// The filter selecting the row with the given key values
    pub fn lower(
        &self,
        values: &IndexMap<String, Val>,
        path: &ArgumentPath,
    ) -> Result<BoolExp, ArgumentErrors> {
        let mut comparisons = collect_all(self.columns.iter().map(|pk| {
            let value = field_value(values, &pk.field_name);
            check_column_value(&pk.column, value, &path.field(&pk.field_name))
                .map(|_| BoolExp::column_eq(&pk.column.name, value.clone()))
        }))?;

        Ok(if comparisons.len() == 1 {
            comparisons.remove(0)
        } else {
            BoolExp::And(comparisons)
        })
    }
}
