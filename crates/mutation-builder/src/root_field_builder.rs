// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Mutation root fields of a table.
//!
//! Each builder returns `Ok(None)` when the role lacks what the field needs (the field is then
//! withheld), and an error when the catalog makes the field impossible to build.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use common::value::Val;
use mutation_ir::{
    AnnotatedDelete, AnnotatedInsert, AnnotatedMutation, AnnotatedUpdate, BoolExp, UpdateBatch,
    UpdateVariant,
};
use mutation_model::{
    catalog::{RootFieldKind, Table, TableId},
    permission::{DeletePermission, SelectPermission, UpdatePermission, fingerprint},
};

use crate::{
    arguments::{check_arguments, field_value, invalid_type, list_items, object_fields},
    building::{SchemaBuilding, ShapeKey, ShapeKind},
    error::{ArgumentErrors, ArgumentPath, SchemaBuildingError, collect_all, join},
    insert_builder::{InsertTargetShape, build_insert_target},
    naming::validate_name,
    output_builder::{MutationOutputShape, build_mutation_response, build_single_row},
    pk_builder::{PrimaryKeyShape, build_primary_key_shape},
    request::{FieldRequest, LoweringContext},
    shape::{
        ArgumentDefinition, FieldSource, FieldType, InputField, InputObjectKind, InputObjectType,
        InputObjectTypeId, InputTypeRef,
    },
    update_operator_builder::{UpdateOperatorsShape, build_update_operators},
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MutationField {
    pub name: String,
    pub description: Option<String>,
    pub kind: RootFieldKind,
    pub table_id: TableId,
    pub arguments: Vec<ArgumentDefinition>,
    pub output: MutationOutputShape,
    plan: MutationPlan,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
enum MutationPlan {
    Insert {
        target: InsertTargetShape,
        single_row: bool,
    },
    Update {
        operators: UpdateOperatorsShape,
        permission: UpdatePermission,
        select: Option<SelectPermission>,
        rows: UpdateRows,
    },
    Delete {
        permission: DeletePermission,
        select: Option<SelectPermission>,
        rows: DeleteRows,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
enum UpdateRows {
    Filtered,
    ByPrimaryKey(PrimaryKeyShape),
    Batches(InputObjectTypeId),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
enum DeleteRows {
    Filtered,
    ByPrimaryKey(PrimaryKeyShape),
}

fn root_field_name(
    building: &SchemaBuilding,
    table_id: TableId,
    kind: RootFieldKind,
) -> Result<(String, Option<String>), SchemaBuildingError> {
    let names = building.table_names(table_id);
    names.validate()?;

    let name = names.root_field(kind);
    validate_name(&name)?;

    Ok((name, Some(names.root_field_description(kind))))
}

fn where_argument(building: &SchemaBuilding, table_id: TableId, description: &str) -> ArgumentDefinition {
    ArgumentDefinition::new(
        building.naming().field_name("where"),
        FieldType::Plain(InputTypeRef::BoolExp(
            building.table_names(table_id).bool_exp(),
        )),
        description,
    )
}

fn on_conflict_argument(
    building: &SchemaBuilding,
    target: &InsertTargetShape,
) -> Option<ArgumentDefinition> {
    target.conflict.as_ref().map(|conflict| {
        ArgumentDefinition::new(
            building.naming().field_name("on_conflict"),
            FieldType::Plain(InputTypeRef::Object(conflict.input_type_id)).optional(),
            "upsert condition",
        )
    })
}

/// `insert_<table>(objects, on_conflict)`
pub fn build_insert(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    let Some(target) = build_insert_target(building, table_id)? else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::Insert)?;

    let mut arguments = vec![ArgumentDefinition::new(
        building.naming().field_name("objects"),
        FieldType::Plain(InputTypeRef::Object(target.input_type_id)).list(),
        "the rows to be inserted",
    )];
    arguments.extend(on_conflict_argument(building, &target));

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::Insert,
        table_id,
        arguments,
        output: build_mutation_response(building, table_id),
        plan: MutationPlan::Insert {
            target,
            single_row: false,
        },
    }))
}

/// `insert_<table>_one(object, on_conflict)`, offered only if the role may read the inserted row
pub fn build_insert_one(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    let catalog = building.catalog;
    let Some(select) = building.permissions.select(&catalog[table_id].name) else {
        return Ok(None);
    };
    let Some(target) = build_insert_target(building, table_id)? else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::InsertOne)?;

    let mut arguments = vec![ArgumentDefinition::new(
        building.naming().field_name("object"),
        FieldType::Plain(InputTypeRef::Object(target.input_type_id)),
        "the row to be inserted",
    )];
    arguments.extend(on_conflict_argument(building, &target));

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::InsertOne,
        table_id,
        arguments,
        output: build_single_row(building, table_id, select),
        plan: MutationPlan::Insert {
            target,
            single_row: true,
        },
    }))
}

/// `update_<table>(_set, _inc, ..., where)`
pub fn build_update(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let Some(update) = permissions.update(&table.name) else {
        return Ok(None);
    };
    let Some(operators) = build_update_operators(building, table_id, update)? else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::Update)?;

    let mut arguments = operators.argument_definitions();
    arguments.push(where_argument(
        building,
        table_id,
        "filter the rows which have to be updated",
    ));

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::Update,
        table_id,
        arguments,
        output: build_mutation_response(building, table_id),
        plan: MutationPlan::Update {
            operators,
            permission: update.clone(),
            select: permissions.select(&table.name).cloned(),
            rows: UpdateRows::Filtered,
        },
    }))
}

/// `update_<table>_by_pk(_set, _inc, ..., pk_columns)`
pub fn build_update_by_pk(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let (Some(update), Some(select)) = (
        permissions.update(&table.name),
        permissions.select(&table.name),
    ) else {
        return Ok(None);
    };
    let Some(primary_key) = build_primary_key_shape(building, table_id)? else {
        return Ok(None);
    };
    let Some(operators) = build_update_operators(building, table_id, update)? else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::UpdateByPk)?;

    let pk_columns_type_id = primary_key.input_type(building, table_id)?;

    let mut arguments = operators.argument_definitions();
    arguments.push(ArgumentDefinition {
        name: building.naming().field_name("pk_columns"),
        typ: FieldType::Plain(InputTypeRef::Object(pk_columns_type_id)),
        description: None,
    });

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::UpdateByPk,
        table_id,
        arguments,
        output: build_single_row(building, table_id, select),
        plan: MutationPlan::Update {
            operators,
            permission: update.clone(),
            select: Some(select.clone()),
            rows: UpdateRows::ByPrimaryKey(primary_key),
        },
    }))
}

/// `update_<table>_many(updates)`, where each update has its own operators and filter
pub fn build_update_many(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    if !building.config.update_many_enabled {
        return Ok(None);
    }

    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let Some(update) = permissions.update(&table.name) else {
        return Ok(None);
    };
    let Some(operators) = build_update_operators(building, table_id, update)? else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::UpdateMany)?;

    let type_name = building.table_names(table_id).updates();
    let mut fields = operators.input_fields();
    let filter = where_argument(
        building,
        table_id,
        "filter the rows which have to be updated",
    );
    fields.push(InputField {
        name: filter.name,
        typ: filter.typ,
        description: filter.description,
        source: FieldSource::Structural,
    });
    let updates_type_id = building.input_type(
        ShapeKey::new(&table.name, ShapeKind::Updates, fingerprint(update)),
        type_name.clone(),
        |_| InputObjectType {
            name: type_name,
            description: None,
            fields,
            kind: InputObjectKind::Updates,
        },
    )?;

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::UpdateMany,
        table_id,
        arguments: vec![ArgumentDefinition::new(
            building.naming().field_name("updates"),
            FieldType::Plain(InputTypeRef::Object(updates_type_id)).list(),
            "updates to execute, in order",
        )],
        output: build_mutation_response(building, table_id),
        plan: MutationPlan::Update {
            operators,
            permission: update.clone(),
            select: permissions.select(&table.name).cloned(),
            rows: UpdateRows::Batches(updates_type_id),
        },
    }))
}

/// `delete_<table>(where)`
pub fn build_delete(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let Some(delete) = permissions.delete(&table.name) else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::Delete)?;

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::Delete,
        table_id,
        arguments: vec![where_argument(
            building,
            table_id,
            "filter the rows which have to be deleted",
        )],
        output: build_mutation_response(building, table_id),
        plan: MutationPlan::Delete {
            permission: delete.clone(),
            select: permissions.select(&table.name).cloned(),
            rows: DeleteRows::Filtered,
        },
    }))
}

/// `delete_<table>_by_pk(<pk columns>)`
pub fn build_delete_by_pk(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let (Some(delete), Some(select)) = (
        permissions.delete(&table.name),
        permissions.select(&table.name),
    ) else {
        return Ok(None);
    };
    let Some(primary_key) = build_primary_key_shape(building, table_id)? else {
        return Ok(None);
    };
    let (name, description) = root_field_name(building, table_id, RootFieldKind::DeleteByPk)?;

    Ok(Some(MutationField {
        name,
        description,
        kind: RootFieldKind::DeleteByPk,
        table_id,
        arguments: primary_key.argument_definitions(),
        output: build_single_row(building, table_id, select),
        plan: MutationPlan::Delete {
            permission: delete.clone(),
            select: Some(select.clone()),
            rows: DeleteRows::ByPrimaryKey(primary_key),
        },
    }))
}

pub fn build_root_field(
    building: &mut SchemaBuilding,
    table_id: TableId,
    kind: RootFieldKind,
) -> Result<Option<MutationField>, SchemaBuildingError> {
    match kind {
        RootFieldKind::Insert => build_insert(building, table_id),
        RootFieldKind::InsertOne => build_insert_one(building, table_id),
        RootFieldKind::Update => build_update(building, table_id),
        RootFieldKind::UpdateByPk => build_update_by_pk(building, table_id),
        RootFieldKind::UpdateMany => build_update_many(building, table_id),
        RootFieldKind::Delete => build_delete(building, table_id),
        RootFieldKind::DeleteByPk => build_delete_by_pk(building, table_id),
    }
}

fn lower_where(
    ctx: &LoweringContext,
    table: &Table,
    select: Option<&SelectPermission>,
    arguments: &IndexMap<String, Val>,
    path: &ArgumentPath,
) -> Result<BoolExp, ArgumentErrors> {
    let where_name = ctx.naming.field_name("where");
    ctx.bool_exp_parser.parse(
        table,
        select,
        field_value(arguments, &where_name),
        &path.field(&where_name),
    )
}

/// One update: the requested operations on the rows matching both the client's filter and the
/// update grant's filter
fn lower_filtered_batch(
    ctx: &LoweringContext,
    table: &Table,
    operators: &UpdateOperatorsShape,
    permission: &UpdatePermission,
    select: Option<&SelectPermission>,
    arguments: &IndexMap<String, Val>,
    path: &ArgumentPath,
) -> Result<UpdateBatch, ArgumentErrors> {
    let operations = operators.lower(ctx, arguments, path);
    let filter = lower_where(ctx, table, select, arguments, path);
    let (operations, filter) = join(operations, filter)?;

    Ok(UpdateBatch {
        operations,
        filter: filter.and(permission.filter.clone()),
    })
}

impl MutationField {
    pub fn table<'a>(&self, ctx: &LoweringContext<'a>) -> &'a Table {
        &ctx.catalog[self.table_id]
    }

    /// Lower a request for this field into its annotated form.
    ///
    /// Problems in independent parts of the request (arguments and selection) are all reported.
    pub fn lower(
        &self,
        ctx: &LoweringContext,
        request: &FieldRequest,
    ) -> Result<AnnotatedMutation, ArgumentErrors> {
        let path = ArgumentPath::root(request.output_name());
        check_arguments(&request.arguments, &self.arguments, &self.name, &path)?;

        let table = self.table(ctx);
        let arguments = &request.arguments;
        let output = self.output.lower(ctx, &request.selection, &path);

        match &self.plan {
            MutationPlan::Insert { target, single_row } => {
                let rows_name = ctx
                    .naming
                    .field_name(if *single_row { "object" } else { "objects" });
                let rows_path = path.field(&rows_name);
                let rows_value = field_value(arguments, &rows_name);
                let rows = if *single_row {
                    vec![(rows_path, rows_value)]
                } else {
                    list_items(rows_value)
                        .into_iter()
                        .enumerate()
                        .map(|(i, row)| (rows_path.index(i), row))
                        .collect()
                };

                let conflict_name = ctx.naming.field_name("on_conflict");
                let on_conflict = arguments
                    .get(&conflict_name)
                    .map(|value| (path.field(&conflict_name), value));

                let (insert, output) = join(target.lower(ctx, rows, on_conflict), output)?;
                Ok(AnnotatedMutation::Insert(AnnotatedInsert { insert, output }))
            }
            MutationPlan::Update {
                operators,
                permission,
                select,
                rows,
            } => {
                let variant = match rows {
                    UpdateRows::Filtered => lower_filtered_batch(
                        ctx,
                        table,
                        operators,
                        permission,
                        select.as_ref(),
                        arguments,
                        &path,
                    )
                    .map(UpdateVariant::SingleBatch),
                    UpdateRows::ByPrimaryKey(primary_key) => {
                        let pk_name = ctx.naming.field_name("pk_columns");
                        let pk_path = path.field(&pk_name);
                        let key = match field_value(arguments, &pk_name) {
                            Val::Object(values) => primary_key.lower(values, &pk_path),
                            other => Err(invalid_type(&pk_path, "an object", other)),
                        };
                        let operations = operators.lower(ctx, arguments, &path);

                        join(operations, key).map(|(operations, key)| {
                            UpdateVariant::SingleBatch(UpdateBatch {
                                operations,
                                filter: key.and(permission.filter.clone()),
                            })
                        })
                    }
                    UpdateRows::Batches(updates_type_id) => {
                        let updates_name = ctx.naming.field_name("updates");
                        let updates_path = path.field(&updates_name);
                        let updates_type = &ctx.input_types[*updates_type_id];

                        collect_all(
                            list_items(field_value(arguments, &updates_name))
                                .into_iter()
                                .enumerate()
                                .map(|(i, update)| {
                                    let batch_path = updates_path.index(i);
                                    let fields = object_fields(update, updates_type, &batch_path)?;
                                    lower_filtered_batch(
                                        ctx,
                                        table,
                                        operators,
                                        permission,
                                        select.as_ref(),
                                        fields,
                                        &batch_path,
                                    )
                                }),
                        )
                        .map(UpdateVariant::MultipleBatches)
                    }
                };

                let (variant, output) = join(variant, output)?;
                Ok(AnnotatedMutation::Update(AnnotatedUpdate {
                    table: table.name.clone(),
                    columns: table.column_infos(),
                    variant,
                    check: permission.check.clone(),
                    output,
                }))
            }
            MutationPlan::Delete {
                permission,
                select,
                rows,
            } => {
                let filter = match rows {
                    DeleteRows::Filtered => {
                        lower_where(ctx, table, select.as_ref(), arguments, &path)
                    }
                    DeleteRows::ByPrimaryKey(primary_key) => primary_key.lower(arguments, &path),
                }
                .map(|filter| filter.and(permission.filter.clone()));

                let (filter, output) = join(filter, output)?;
                Ok(AnnotatedMutation::Delete(AnnotatedDelete {
                    table: table.name.clone(),
                    columns: table.column_infos(),
                    filter,
                    output,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiplatform_test::multiplatform_test;

    use mutation_model::{
        catalog::CustomRootField,
        permission::{InsertPermission, RolePermissions, TablePermissions},
    };

    use crate::config::MutationSchemaConfig;
    use crate::test_utils::{articles_catalog, author_permissions, editor_permissions};

    fn offered(permissions: &RolePermissions, table: &str) -> Vec<RootFieldKind> {
        let catalog = articles_catalog();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, permissions, &config);
        let table_id = catalog.table_id(table).unwrap();

        RootFieldKind::ALL
            .into_iter()
            .filter(|kind| {
                build_root_field(&mut building, table_id, *kind)
                    .unwrap()
                    .is_some()
            })
            .collect()
    }

    #[multiplatform_test]
    fn all_fields_with_full_grants() {
        assert_eq!(offered(&editor_permissions(), "t"), RootFieldKind::ALL.to_vec());
    }

    #[multiplatform_test]
    fn update_fields_withheld_without_effect() {
        let mut permissions = editor_permissions();
        permissions.tables.get_mut("t").unwrap().update =
            Some(UpdatePermission::new(&[], BoolExp::always_true()));

        assert_eq!(
            offered(&permissions, "t"),
            vec![
                RootFieldKind::Insert,
                RootFieldKind::InsertOne,
                RootFieldKind::Delete,
                RootFieldKind::DeleteByPk,
            ]
        );
    }

    #[multiplatform_test]
    fn single_row_fields_require_select() {
        let permissions = RolePermissions::new("writer").with_table(
            "t",
            TablePermissions {
                insert: Some(InsertPermission::new(&["name"])),
                update: Some(UpdatePermission::new(&["name"], BoolExp::always_true())),
                delete: Some(DeletePermission::new(BoolExp::always_true())),
                select: None,
            },
        );

        assert_eq!(
            offered(&permissions, "t"),
            vec![
                RootFieldKind::Insert,
                RootFieldKind::Update,
                RootFieldKind::UpdateMany,
                RootFieldKind::Delete,
            ]
        );
    }

    #[multiplatform_test]
    fn by_key_fields_require_readable_key() {
        let mut permissions = author_permissions();
        permissions
            .tables
            .get_mut("articles")
            .unwrap()
            .select
            .as_mut()
            .unwrap()
            .columns
            .retain(|column| column != "id");

        let offered = offered(&permissions, "articles");
        assert!(!offered.contains(&RootFieldKind::UpdateByPk));
        assert!(!offered.contains(&RootFieldKind::DeleteByPk));
        assert!(offered.contains(&RootFieldKind::InsertOne));
    }

    #[multiplatform_test]
    fn update_many_can_be_disabled() {
        let catalog = articles_catalog();
        let permissions = editor_permissions();
        let config = MutationSchemaConfig {
            update_many_enabled: false,
            ..Default::default()
        };
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);

        let field = build_update_many(&mut building, catalog.table_id("t").unwrap()).unwrap();
        assert!(field.is_none());
    }

    #[multiplatform_test]
    fn invalid_custom_name() {
        let mut table = articles_catalog().table("t").unwrap().clone();
        table.custom_root_fields.delete = Some(CustomRootField {
            name: Some("remove t".to_string()),
            comment: None,
        });
        let catalog = mutation_model::catalog::Catalog::new([table]);
        let permissions = editor_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();

        assert_eq!(
            build_delete(&mut building, table_id).unwrap_err(),
            SchemaBuildingError::InvalidName("remove t".to_string())
        );
        assert!(build_delete_by_pk(&mut building, table_id).unwrap().is_some());
    }

    #[multiplatform_test]
    fn arguments_of_insert() {
        let catalog = articles_catalog();
        let permissions = editor_permissions();
        let config = MutationSchemaConfig::default();
        let mut building = SchemaBuilding::new(&catalog, &permissions, &config);
        let table_id = catalog.table_id("t").unwrap();

        let field = build_insert(&mut building, table_id).unwrap().unwrap();
        assert_eq!(field.name, "insert_t");
        assert_eq!(
            field.description.as_deref(),
            Some("insert data into the table: \"t\"")
        );
        let names: Vec<_> = field.arguments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["objects", "on_conflict"]);
        assert!(field.arguments[0].typ.is_required());
        assert!(!field.arguments[1].typ.is_required());
    }
}
