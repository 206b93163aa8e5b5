// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Insert inputs, including nested inserts through relationships.
//!
//! The insert input of a table offers its insertable columns, plus a field for each relationship
//! whose target table the role may insert into. Relationships may form cycles (a table referring to
//! itself, or two tables referring to each other), so the input types are built through the
//! memoizing placeholder mechanism of [`SchemaBuilding`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use common::value::Val;
use mutation_ir::{
    ArrayRelationInsert, InsertChecks, InsertRow, MultiRowInsert, MutationValue,
    ObjectRelationInsert, RelationshipInsertInfo,
};
use mutation_model::{
    catalog::{Relationship, RelationshipKind, Table, TableId},
    permission::{InsertPermission, fingerprint},
};

use crate::{
    arguments::{check_column_value, field_value, list_items, object_fields},
    building::{SchemaBuilding, ShapeKey, ShapeKind},
    conflict_builder::{ConflictShape, build_conflict_shape},
    error::{
        ArgumentErrorKind, ArgumentErrors, ArgumentPath, ErrorCollector, SchemaBuildingError,
        collect_all, join,
    },
    request::LoweringContext,
    shape::{
        FieldSource, FieldType, InputField, InputObjectKind, InputObjectType, InputObjectTypeId,
        InputTypeRef,
    },
};

/// Everything needed to lower rows inserted into one table
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InsertTargetShape {
    pub table_id: TableId,
    pub input_type_id: InputObjectTypeId,
    pub conflict: Option<ConflictShape>,
    pub checks: InsertChecks,
    /// Value of columns the client leaves out: the insert grant's preset, else the database default
    pub defaults: IndexMap<String, MutationValue>,
}

/// Build the insert shape of a table, or `None` if the role may not insert into it
pub fn build_insert_target(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<InsertTargetShape>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let Some(insert) = permissions.insert(&table.name) else {
        return Ok(None);
    };

    building.table_names(table_id).validate()?;
    let conflict = build_conflict_shape(building, table_id)?;

    Ok(Some(insert_target(building, table_id, insert, conflict)?))
}

fn insert_target(
    building: &mut SchemaBuilding,
    table_id: TableId,
    insert: &InsertPermission,
    conflict: Option<ConflictShape>,
) -> Result<InsertTargetShape, SchemaBuildingError> {
    let catalog = building.catalog;
    let table = &catalog[table_id];
    let input_type_id = build_insert_input_type(building, table_id, insert)?;

    let update_check = building
        .permissions
        .update(&table.name)
        .and_then(|update| update.check.clone());

    Ok(InsertTargetShape {
        table_id,
        input_type_id,
        conflict,
        checks: InsertChecks {
            insert_check: insert.check.clone(),
            update_check,
        },
        defaults: column_defaults(table, insert),
    })
}

fn column_defaults(table: &Table, insert: &InsertPermission) -> IndexMap<String, MutationValue> {
    table
        .columns
        .iter()
        .filter_map(|column| {
            insert
                .presets
                .get(&column.name)
                .cloned()
                .or_else(|| column.default.clone().map(MutationValue::Expression))
                .map(|value| (column.name.clone(), value))
        })
        .collect()
}

fn build_insert_input_type(
    building: &mut SchemaBuilding,
    table_id: TableId,
    insert: &InsertPermission,
) -> Result<InputObjectTypeId, SchemaBuildingError> {
    let catalog = building.catalog;
    let table = &catalog[table_id];
    let names = building.table_names(table_id);
    let naming = building.naming();
    let type_name = names.insert_input();

    building.input_type(
        ShapeKey::new(&table.name, ShapeKind::InsertInput, fingerprint(insert)),
        type_name.clone(),
        |building| {
            let mut fields: Vec<InputField> = table
                .columns
                .iter()
                .filter(|column| {
                    insert.allows(&column.name) && !insert.presets.contains_key(&column.name)
                })
                .map(|column| InputField {
                    name: names.column_field(&column.name),
                    typ: FieldType::Plain(InputTypeRef::Scalar(column.typ)).optional(),
                    description: column.description.clone(),
                    source: FieldSource::Column(column.info()),
                })
                .collect();

            for relationship in &table.relationships {
                match build_relationship_insert_type(building, relationship) {
                    Ok(Some((type_id, source))) => fields.push(InputField {
                        name: naming.field_name(&relationship.name),
                        typ: FieldType::Plain(InputTypeRef::Object(type_id)).optional(),
                        description: None,
                        source,
                    }),
                    Ok(None) => debug!(
                        table = %table.name,
                        relationship = %relationship.name,
                        "Target table is not insertable, leaving out the relationship"
                    ),
                    Err(error) => warn!(
                        table = %table.name,
                        relationship = %relationship.name,
                        %error,
                        "Unable to build the nested insert, leaving out the relationship"
                    ),
                }
            }

            InputObjectType {
                name: type_name,
                description: Some(format!(
                    "input type for inserting data into table \"{}\"",
                    table.name
                )),
                fields,
                kind: InputObjectKind::Insert {
                    table: table.name.clone(),
                },
            }
        },
    )
}

/// Build the `<target>_obj_rel_insert_input` or `<target>_arr_rel_insert_input` type for a
/// relationship, or `None` if the role may not insert into the target table.
///
/// Everything that may fail (including the target table's own insert type) is built before the
/// relationship type is registered, so a failure never leaves a placeholder behind. Recursion still
/// terminates, since the target's insert type is memoized before its relationships are visited.
fn build_relationship_insert_type(
    building: &mut SchemaBuilding,
    relationship: &Relationship,
) -> Result<Option<(InputObjectTypeId, FieldSource)>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;

    let target_id = catalog
        .table_id(&relationship.target_table)
        .ok_or_else(|| SchemaBuildingError::UnknownTable(relationship.target_table.clone()))?;
    let target = &catalog[target_id];

    let Some(insert) = permissions.insert(&target.name) else {
        return Ok(None);
    };

    let names = building.table_names(target_id);
    let naming = building.naming();
    let info = RelationshipInsertInfo {
        name: relationship.name.clone(),
        target_table: target.name.clone(),
        column_mapping: relationship.column_mapping.clone(),
    };
    let kind = relationship.kind;
    let (shape_kind, type_name, source) = match kind {
        RelationshipKind::Object => (
            ShapeKind::ObjectRelationInsert,
            names.obj_rel_insert_input(),
            FieldSource::ObjectRelationship(info),
        ),
        RelationshipKind::Array => (
            ShapeKind::ArrayRelationInsert,
            names.arr_rel_insert_input(),
            FieldSource::ArrayRelationship(info),
        ),
    };

    let key = ShapeKey::new(&target.name, shape_kind, fingerprint(insert));
    if let Some(existing) = building.memoized_input_type(&key) {
        return Ok(Some((existing, source)));
    }

    names.validate()?;
    let conflict = build_conflict_shape(building, target_id)?;
    let target_shape = insert_target(building, target_id, insert, conflict)?;

    let type_id = building.input_type(key, type_name.clone(), |_| {
        let row_type = FieldType::Plain(InputTypeRef::Object(target_shape.input_type_id));
        let (data_type, description) = match kind {
            RelationshipKind::Object => (row_type, "object"),
            RelationshipKind::Array => (row_type.list(), "array"),
        };

        let mut fields = vec![InputField::structural(
            naming.field_name("data"),
            data_type,
            "the rows to be inserted",
        )];
        if let Some(conflict) = &target_shape.conflict {
            fields.push(InputField::structural(
                naming.field_name("on_conflict"),
                FieldType::Plain(InputTypeRef::Object(conflict.input_type_id)).optional(),
                "upsert condition",
            ));
        }

        InputObjectType {
            name: type_name,
            description: Some(format!(
                "input type for inserting {description} relation for remote table \"{}\"",
                target.name
            )),
            fields,
            kind: InputObjectKind::RelationshipInsert {
                kind,
                target: Box::new(target_shape),
            },
        }
    })?;

    Ok(Some((type_id, source)))
}

enum LoweredRelationship {
    Object(ObjectRelationInsert),
    Array(ArrayRelationInsert),
}

impl InsertTargetShape {
    /// Lower the given rows (each with its location in the request) and the optional `on_conflict`
    /// value into an insert
    pub fn lower(
        &self,
        ctx: &LoweringContext,
        rows: Vec<(ArgumentPath, &Val)>,
        on_conflict: Option<(ArgumentPath, &Val)>,
    ) -> Result<MultiRowInsert, ArgumentErrors> {
        let table = &ctx.catalog[self.table_id];

        let rows = collect_all(
            rows.into_iter()
                .map(|(path, value)| lower_insert_row(ctx, self.input_type_id, value, &path)),
        );

        let conflict = match (on_conflict, &self.conflict) {
            (Some((path, value)), Some(shape)) if !value.is_null() => {
                shape.lower(ctx, table, value, &path).map(Some)
            }
            _ => Ok(None),
        };

        let (rows, conflict) = join(rows, conflict)?;

        Ok(MultiRowInsert {
            table: table.name.clone(),
            columns: table.column_infos(),
            rows,
            conflict,
            checks: self.checks.clone(),
            defaults: self.defaults.clone(),
        })
    }
}

fn lower_insert_row(
    ctx: &LoweringContext,
    input_type_id: InputObjectTypeId,
    value: &Val,
    path: &ArgumentPath,
) -> Result<InsertRow, ArgumentErrors> {
    let input_type = &ctx.input_types[input_type_id];
    let fields = object_fields(value, input_type, path)?;

    let mut collector = ErrorCollector::default();
    let mut row = InsertRow::default();

    for (name, value) in fields {
        let Some(field) = input_type.field(name) else {
            continue;
        };
        let field_path = path.field(name);

        match &field.source {
            FieldSource::Column(column) => {
                if collector
                    .take(check_column_value(column, value, &field_path))
                    .is_some()
                {
                    row.columns
                        .insert(column.name.clone(), MutationValue::Literal(value.clone()));
                }
            }
            FieldSource::ObjectRelationship(info) | FieldSource::ArrayRelationship(info) => {
                let InputTypeRef::Object(wrapper_id) = field.typ.innermost() else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }

                let lowered = lower_relationship(ctx, *wrapper_id, info, value, &field_path);
                match collector.take(lowered) {
                    Some(Some(LoweredRelationship::Object(insert))) => {
                        row.object_relationships.push(insert)
                    }
                    Some(Some(LoweredRelationship::Array(insert))) => {
                        row.array_relationships.push(insert)
                    }
                    _ => {}
                }
            }
            FieldSource::Structural => {}
        }
    }

    collector.finish(row)
}

/// Lower the value of a relationship field. An array relationship with no rows is dropped.
fn lower_relationship(
    ctx: &LoweringContext,
    wrapper_id: InputObjectTypeId,
    info: &RelationshipInsertInfo,
    value: &Val,
    path: &ArgumentPath,
) -> Result<Option<LoweredRelationship>, ArgumentErrors> {
    let wrapper = &ctx.input_types[wrapper_id];
    let InputObjectKind::RelationshipInsert { kind, target } = &wrapper.kind else {
        return Err(ArgumentErrors::new(
            path,
            ArgumentErrorKind::Invalid(format!(
                "'{}' is not a relationship insert type",
                wrapper.name
            )),
        ));
    };

    let fields = object_fields(value, wrapper, path)?;

    let data_name = ctx.naming.field_name("data");
    let data_path = path.field(&data_name);
    let data = field_value(fields, &data_name);

    let on_conflict_name = ctx.naming.field_name("on_conflict");
    let on_conflict = fields
        .get(&on_conflict_name)
        .map(|value| (path.field(&on_conflict_name), value));

    match kind {
        RelationshipKind::Object => {
            let insert = target.lower(ctx, vec![(data_path, data)], on_conflict)?;
            Ok(Some(LoweredRelationship::Object(ObjectRelationInsert {
                relationship: info.clone(),
                insert,
            })))
        }
        RelationshipKind::Array => {
            let items = list_items(data);
            if items.is_empty() {
                return Ok(None);
            }

            let rows = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (data_path.index(i), item))
                .collect();
            let insert = target.lower(ctx, rows, on_conflict)?;
            Ok(Some(LoweredRelationship::Array(ArrayRelationInsert {
                relationship: info.clone(),
                insert,
            })))
        }
    }
}
