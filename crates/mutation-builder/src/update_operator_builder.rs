// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Update operators (`_set`, `_inc`, and the JSON operators) and their composition into the
//! column updates of one update.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use common::value::Val;
use mutation_ir::{ColumnInfo, ColumnType, ColumnUpdate, MutationValue, ScalarKind, UpdateOperation};
use mutation_model::{
    catalog::TableId,
    permission::{UpdatePermission, fingerprint},
};

use crate::{
    arguments::{check_column_value, invalid_type, list_items, object_fields},
    building::{SchemaBuilding, ShapeKey, ShapeKind},
    error::{ArgumentErrorKind, ArgumentErrors, ArgumentPath, ErrorCollector, SchemaBuildingError},
    request::LoweringContext,
    shape::{
        ArgumentDefinition, FieldSource, FieldType, InputField, InputObjectKind, InputObjectType,
        InputObjectTypeId, InputTypeRef,
    },
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperatorKind {
    Set,
    Inc,
    Append,
    Prepend,
    DeleteKey,
    DeleteElem,
    DeleteAtPath,
}

impl UpdateOperatorKind {
    /// All operators, in the order their arguments are offered and composed
    pub const ALL: [UpdateOperatorKind; 7] = [
        UpdateOperatorKind::Set,
        UpdateOperatorKind::Inc,
        UpdateOperatorKind::Append,
        UpdateOperatorKind::Prepend,
        UpdateOperatorKind::DeleteKey,
        UpdateOperatorKind::DeleteElem,
        UpdateOperatorKind::DeleteAtPath,
    ];

    pub fn argument_name(&self) -> &'static str {
        match self {
            UpdateOperatorKind::Set => "_set",
            UpdateOperatorKind::Inc => "_inc",
            UpdateOperatorKind::Append => "_append",
            UpdateOperatorKind::Prepend => "_prepend",
            UpdateOperatorKind::DeleteKey => "_delete_key",
            UpdateOperatorKind::DeleteElem => "_delete_elem",
            UpdateOperatorKind::DeleteAtPath => "_delete_at_path",
        }
    }

    fn type_suffix(&self) -> &'static str {
        match self {
            UpdateOperatorKind::Set => "set_input",
            UpdateOperatorKind::Inc => "inc_input",
            UpdateOperatorKind::Append => "append_input",
            UpdateOperatorKind::Prepend => "prepend_input",
            UpdateOperatorKind::DeleteKey => "delete_key_input",
            UpdateOperatorKind::DeleteElem => "delete_elem_input",
            UpdateOperatorKind::DeleteAtPath => "delete_at_path_input",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            UpdateOperatorKind::Set => "sets the columns of the filtered rows to the given values",
            UpdateOperatorKind::Inc => {
                "increments the numeric columns with given value of the filtered values"
            }
            UpdateOperatorKind::Append => {
                "append existing jsonb value of filtered columns with new jsonb value"
            }
            UpdateOperatorKind::Prepend => {
                "prepend existing jsonb value of filtered columns with new jsonb value"
            }
            UpdateOperatorKind::DeleteKey => {
                "delete key/value pair or string element. key/value pairs are matched based on their key value"
            }
            UpdateOperatorKind::DeleteElem => {
                "delete the array element with specified index (negative integers count from the end). throws an error if top level container is not an array"
            }
            UpdateOperatorKind::DeleteAtPath => {
                "delete the field or element with specified path (for JSON arrays, negative integers count from the end)"
            }
        }
    }

    /// Whether the operator can be applied to a column of the given kind
    pub fn applies_to(&self, kind: ScalarKind) -> bool {
        match (self, kind) {
            (UpdateOperatorKind::Set, _) => true,
            (UpdateOperatorKind::Inc, ScalarKind::Integer | ScalarKind::Decimal) => true,
            (UpdateOperatorKind::Inc, _) => false,
            (
                UpdateOperatorKind::Append
                | UpdateOperatorKind::Prepend
                | UpdateOperatorKind::DeleteKey
                | UpdateOperatorKind::DeleteElem
                | UpdateOperatorKind::DeleteAtPath,
                ScalarKind::Json,
            ) => true,
            (
                UpdateOperatorKind::Append
                | UpdateOperatorKind::Prepend
                | UpdateOperatorKind::DeleteKey
                | UpdateOperatorKind::DeleteElem
                | UpdateOperatorKind::DeleteAtPath,
                _,
            ) => false,
        }
    }

    /// The type of the per-column value of the operator
    fn value_type(&self, column_type: ColumnType) -> FieldType<InputTypeRef> {
        match self {
            UpdateOperatorKind::Set | UpdateOperatorKind::Inc => {
                FieldType::Plain(InputTypeRef::Scalar(column_type))
            }
            UpdateOperatorKind::Append | UpdateOperatorKind::Prepend => {
                FieldType::Plain(InputTypeRef::Scalar(ColumnType::Json))
            }
            UpdateOperatorKind::DeleteKey => FieldType::Plain(InputTypeRef::Scalar(ColumnType::Text)),
            UpdateOperatorKind::DeleteElem => FieldType::Plain(InputTypeRef::Scalar(ColumnType::Int)),
            UpdateOperatorKind::DeleteAtPath => {
                FieldType::Plain(InputTypeRef::Scalar(ColumnType::Text)).list()
            }
        }
    }

    /// Lower the value given for one column. A null value means "no operation", except for `_set`
    /// where it sets the column to null.
    fn lower_value(
        &self,
        column: &ColumnInfo,
        value: &Val,
        path: &ArgumentPath,
    ) -> Result<Option<UpdateOperation>, ArgumentErrors> {
        if value.is_null() && *self != UpdateOperatorKind::Set {
            return Ok(None);
        }

        let operation = match self {
            UpdateOperatorKind::Set => {
                check_column_value(column, value, path)?;
                UpdateOperation::Set(MutationValue::Literal(value.clone()))
            }
            UpdateOperatorKind::Inc => {
                check_column_value(column, value, path)?;
                UpdateOperation::Increment(MutationValue::Literal(value.clone()))
            }
            UpdateOperatorKind::Append => UpdateOperation::Append(value.clone()),
            UpdateOperatorKind::Prepend => UpdateOperation::Prepend(value.clone()),
            UpdateOperatorKind::DeleteKey => match value {
                Val::String(key) => UpdateOperation::DeleteKey(key.clone()),
                other => return Err(invalid_type(path, "String", other)),
            },
            UpdateOperatorKind::DeleteElem => match value.as_i64() {
                Some(index) => UpdateOperation::DeleteElement(index),
                None => return Err(invalid_type(path, "Int", value)),
            },
            UpdateOperatorKind::DeleteAtPath => {
                let mut elements = vec![];
                for (i, element) in list_items(value).into_iter().enumerate() {
                    match element {
                        Val::String(element) => elements.push(element.clone()),
                        other => return Err(invalid_type(&path.index(i), "String", other)),
                    }
                }
                UpdateOperation::DeleteAtPath(elements)
            }
        };

        Ok(Some(operation))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OperatorShape {
    pub kind: UpdateOperatorKind,
    pub input_type_id: InputObjectTypeId,
}

/// The operators available for updating a table, along with the presets applied to every update
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateOperatorsShape {
    pub operators: Vec<OperatorShape>,
    pub presets: IndexMap<String, MutationValue>,
}

/// Build the operators for the update grant. Columns with a preset value aren't updatable by the
/// client, and operators that apply to none of the updatable columns are left out.
///
/// Returns `None` if the grant can't change anything (no updatable columns and no presets).
pub fn build_update_operators(
    building: &mut SchemaBuilding,
    table_id: TableId,
    update: &UpdatePermission,
) -> Result<Option<UpdateOperatorsShape>, SchemaBuildingError> {
    if !update.has_effect() {
        return Ok(None);
    }

    let catalog = building.catalog;
    let table = &catalog[table_id];
    let names = building.table_names(table_id);
    let naming = building.naming();

    let updatable: Vec<_> = table
        .columns
        .iter()
        .filter(|column| {
            update.allows(&column.name) && !update.presets.contains_key(&column.name)
        })
        .collect();

    let operators = UpdateOperatorKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let applicable: Vec<_> = updatable
                .iter()
                .filter(|column| kind.applies_to(column.typ.kind()))
                .collect();

            if applicable.is_empty() {
                return None;
            }

            let key = ShapeKey::new(
                &table.name,
                ShapeKind::UpdateOperator(kind),
                fingerprint(update),
            );
            let type_name = names.operator_input(kind.type_suffix());

            let input_type_id = building.input_type(key, type_name.clone(), |_| InputObjectType {
                name: type_name,
                description: Some(format!(
                    "input type for the {} operator on table \"{}\"",
                    kind.argument_name(),
                    table.name
                )),
                fields: applicable
                    .iter()
                    .map(|column| InputField {
                        name: naming.field_name(&column.name),
                        typ: kind.value_type(column.typ).optional(),
                        description: column.description.clone(),
                        source: FieldSource::Column(column.info()),
                    })
                    .collect(),
                kind: InputObjectKind::UpdateOperator(kind),
            });

            Some(input_type_id.map(|input_type_id| OperatorShape {
                kind,
                input_type_id,
            }))
        })
        .collect::<Result<_, _>>()?;

    Ok(Some(UpdateOperatorsShape {
        operators,
        presets: update.presets.clone(),
    }))
}

impl UpdateOperatorsShape {
    pub fn argument_definitions(&self) -> Vec<ArgumentDefinition> {
        self.operators
            .iter()
            .map(|operator| ArgumentDefinition {
                name: operator.kind.argument_name().to_string(),
                typ: FieldType::Plain(InputTypeRef::Object(operator.input_type_id)).optional(),
                description: Some(operator.kind.description().to_string()),
            })
            .collect()
    }

    /// Fields of the same operators, for use inside an input object (such as `<table>_updates`)
    pub fn input_fields(&self) -> Vec<InputField> {
        self.argument_definitions()
            .into_iter()
            .map(|definition| InputField {
                name: definition.name,
                typ: definition.typ,
                description: definition.description,
                source: FieldSource::Structural,
            })
            .collect()
    }

    /// Compose the column updates requested through the operator arguments.
    ///
    /// Presets come first (as `_set` operations), followed by the requested operations in operator
    /// order, and within an operator, in the order the client listed the columns. A column may be
    /// targeted by at most one operator, and at least one column must be updated (explicitly or
    /// through a preset).
    pub fn lower(
        &self,
        ctx: &LoweringContext,
        arguments: &IndexMap<String, Val>,
        path: &ArgumentPath,
    ) -> Result<Vec<ColumnUpdate>, ArgumentErrors> {
        let mut collector = ErrorCollector::default();
        let mut requested: Vec<(UpdateOperatorKind, ColumnUpdate)> = vec![];

        for operator in &self.operators {
            let argument_name = operator.kind.argument_name();
            let value = match arguments.get(argument_name) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };

            let operator_path = path.field(argument_name);
            let input_type = &ctx.input_types[operator.input_type_id];

            let Some(fields) = collector.take(object_fields(value, input_type, &operator_path))
            else {
                continue;
            };

            for (name, value) in fields {
                let Some(FieldSource::Column(column)) =
                    input_type.field(name).map(|field| &field.source)
                else {
                    continue;
                };

                let field_path = operator_path.field(name);
                let lowered = operator.kind.lower_value(column, value, &field_path);
                if let Some(Some(operation)) = collector.take(lowered) {
                    requested.push((operator.kind, ColumnUpdate::new(&column.name, operation)));
                }
            }
        }

        let mut operators_by_column: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (kind, update) in &requested {
            operators_by_column
                .entry(update.column.as_str())
                .or_default()
                .insert(kind.argument_name());
        }
        for (column, operators) in operators_by_column {
            if operators.len() > 1 {
                collector.push(ArgumentErrors::new(
                    path,
                    ArgumentErrorKind::DuplicateColumn {
                        column: column.to_string(),
                        operators: operators.into_iter().map(str::to_string).collect(),
                    },
                ));
            }
        }

        if requested.is_empty() && self.presets.is_empty() {
            collector.push(ArgumentErrors::new(
                path,
                ArgumentErrorKind::MissingUpdateOperator(
                    self.operators
                        .iter()
                        .map(|operator| operator.kind.argument_name().to_string())
                        .collect(),
                ),
            ));
        }

        let updates = self
            .presets
            .iter()
            .map(|(column, value)| ColumnUpdate::new(column, UpdateOperation::Set(value.clone())))
            .chain(requested.into_iter().map(|(_, update)| update))
            .collect();

        collector.finish(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiplatform_test::multiplatform_test;

    use mutation_ir::BoolExp;
    use mutation_model::{catalog::Catalog, permission::RolePermissions};

    use crate::config::MutationSchemaConfig;
    use crate::test_utils::{articles_catalog, session, val, with_lowering};

    fn arguments(json: serde_json::Value) -> IndexMap<String, Val> {
        match val(json) {
            Val::Object(fields) => fields,
            _ => unreachable!(),
        }
    }

    fn catalog_and_permissions() -> (Catalog, RolePermissions) {
        (articles_catalog(), RolePermissions::new("editor"))
    }

    #[multiplatform_test]
    fn operator_applicability() {
        use UpdateOperatorKind::*;

        assert!(Set.applies_to(ScalarKind::Text));
        assert!(Inc.applies_to(ScalarKind::Integer));
        assert!(Inc.applies_to(ScalarKind::Decimal));
        assert!(!Inc.applies_to(ScalarKind::Json));
        assert!(Append.applies_to(ScalarKind::Json));
        assert!(!DeleteKey.applies_to(ScalarKind::Text));
    }

    #[multiplatform_test]
    fn operators_without_columns_are_omitted() {
        let update = UpdatePermission::new(&["name"], BoolExp::always_true());
        let (catalog, permissions) = catalog_and_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();

        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();
        let offered: Vec<_> = shape.operators.iter().map(|o| o.kind).collect();
        assert_eq!(offered, vec![UpdateOperatorKind::Set]);

        let update = UpdatePermission::new(&["name", "tags", "count"], BoolExp::always_true());
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();
        assert_eq!(shape.operators.len(), 7);

        let update = UpdatePermission::new(&[], BoolExp::always_true());
        assert!(
            build_update_operators(&mut building, table_id, &update)
                .unwrap()
                .is_none()
        );
    }

    #[multiplatform_test]
    fn composes_operators_in_order() {
        let update = UpdatePermission::new(&["name", "tags", "count"], BoolExp::always_true())
            .with_preset("name", session("x-hasura-user-name"));
        let (catalog, permissions) = catalog_and_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();
        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();

        let updates = with_lowering(&building, |ctx| {
            shape.lower(
                ctx,
                &arguments(serde_json::json!({
                    "_append": {"tags": {"x": 1}},
                    "_inc": {"count": 3},
                })),
                &ArgumentPath::root("update_t"),
            )
        })
        .unwrap();

        assert_eq!(
            updates,
            vec![
                ColumnUpdate::new("name", UpdateOperation::Set(session("x-hasura-user-name"))),
                ColumnUpdate::new(
                    "count",
                    UpdateOperation::Increment(MutationValue::Literal(Val::from(3i64)))
                ),
                ColumnUpdate::new(
                    "tags",
                    UpdateOperation::Append(val(serde_json::json!({"x": 1})))
                ),
            ]
        );
    }

    #[multiplatform_test]
    fn duplicate_columns_are_reported_once_each() {
        let update = UpdatePermission::new(&["name", "tags", "count"], BoolExp::always_true());
        let (catalog, permissions) = catalog_and_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();
        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();

        let errors = with_lowering(&building, |ctx| {
            shape.lower(
                ctx,
                &arguments(serde_json::json!({
                    "_set": {"name": "n", "count": 1, "tags": null},
                    "_inc": {"count": 2},
                    "_append": {"tags": [1]},
                    "_delete_key": {"tags": "a"},
                })),
                &ArgumentPath::root("update_t"),
            )
        })
        .unwrap_err();

        let messages: Vec<_> = errors.errors().iter().map(|e| e.kind.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "column 'count' found in multiple operators: _inc, _set",
                "column 'tags' found in multiple operators: _append, _delete_key, _set",
            ]
        );
        assert!(!messages.iter().any(|message| message.contains("'name'")));
    }

    #[multiplatform_test]
    fn empty_update() {
        let update = UpdatePermission::new(&["name", "count"], BoolExp::always_true());
        let (catalog, permissions) = catalog_and_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();
        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();

        let errors = with_lowering(&building, |ctx| {
            shape.lower(
                ctx,
                &arguments(serde_json::json!({"_set": {}, "_inc": {"count": null}})),
                &ArgumentPath::root("update_t"),
            )
        })
        .unwrap_err();
        assert_eq!(
            errors.errors()[0].kind,
            ArgumentErrorKind::MissingUpdateOperator(vec!["_set".to_string(), "_inc".to_string()])
        );

        let update = update.with_preset("name", session("x-hasura-user-name"));
        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();
        let updates = with_lowering(&building, |ctx| {
            shape.lower(ctx, &IndexMap::new(), &ArgumentPath::root("update_t"))
        })
        .unwrap();
        assert_eq!(
            updates,
            vec![ColumnUpdate::new(
                "name",
                UpdateOperation::Set(session("x-hasura-user-name"))
            )]
        );
    }

    #[multiplatform_test]
    fn invalid_operator_values() {
        let update = UpdatePermission::new(&["name", "tags", "count"], BoolExp::always_true());
        let (catalog, permissions) = catalog_and_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();
        let shape = build_update_operators(&mut building, table_id, &update)
            .unwrap()
            .unwrap();

        let errors = with_lowering(&building, |ctx| {
            shape.lower(
                ctx,
                &arguments(serde_json::json!({
                    "_set": {"name": 5},
                    "_inc": {"id": 1},
                    "_delete_elem": {"tags": "first"},
                })),
                &ArgumentPath::root("update_t"),
            )
        })
        .unwrap_err();

        let messages: Vec<_> = errors.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "expected String, but found integer (at 'update_t._set.name')",
                "field 'id' not found in type: 't_inc_input' (at 'update_t._inc.id')",
                "expected Int, but found string (at 'update_t._delete_elem.tags')",
            ]
        );
    }
}
