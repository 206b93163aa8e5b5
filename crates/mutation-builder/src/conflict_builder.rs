// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `on_conflict` argument of inserts (upserts).
//!
//! Resolving a conflict by updating the existing row is an update, so the argument is offered only
//! to roles that may update the table.

use serde::{Deserialize, Serialize};

use common::value::Val;
use mutation_ir::{BoolExp, ConflictClause};
use mutation_model::{
    catalog::{Column, Constraint, Table, TableId},
    permission::{SelectPermission, UpdatePermission, fingerprint},
};

use crate::{
    arguments::{enum_value, field_value, list_items, object_fields},
    building::{SchemaBuilding, ShapeKey, ShapeKind},
    error::{
        ArgumentErrorKind, ArgumentErrors, ArgumentPath, SchemaBuildingError, collect_all, join,
    },
    request::LoweringContext,
    shape::{
        EnumTarget, EnumType, EnumTypeId, EnumValue, FieldType, InputField, InputObjectKind,
        InputObjectType, InputObjectTypeId, InputTypeRef,
    },
};

pub const PLACEHOLDER_ENUM_VALUE: &str = "_PLACEHOLDER";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConflictShape {
    pub input_type_id: InputObjectTypeId,
    pub constraint_enum_id: EnumTypeId,
    pub column_enum_id: EnumTypeId,
    /// The select grant, if any. Only a role that may read the table may filter conflicting rows.
    pub select: Option<SelectPermission>,
    pub update: UpdatePermission,
}

/// Columns of a constraint, all of which must exist in the table
pub(crate) fn constraint_columns<'t>(
    table: &'t Table,
    constraint: &Constraint,
) -> Result<Vec<&'t Column>, SchemaBuildingError> {
    if constraint.columns.is_empty() {
        return Err(SchemaBuildingError::UnresolvableConstraint {
            table: table.name.clone(),
            constraint: constraint.name.clone(),
        });
    }

    constraint
        .columns
        .iter()
        .map(|name| {
            table
                .column(name)
                .ok_or_else(|| SchemaBuildingError::UnresolvableConstraint {
                    table: table.name.clone(),
                    constraint: constraint.name.clone(),
                })
        })
        .collect()
}

/// Build the `on_conflict` shape of a table, or `None` if the role may not update the table or the
/// table has no unique constraints
pub fn build_conflict_shape(
    building: &mut SchemaBuilding,
    table_id: TableId,
) -> Result<Option<ConflictShape>, SchemaBuildingError> {
    let catalog = building.catalog;
    let permissions = building.permissions;
    let table = &catalog[table_id];

    let Some(update) = permissions.update(&table.name) else {
        return Ok(None);
    };
    if table.constraints.is_empty() {
        return Ok(None);
    }
    for constraint in &table.constraints {
        constraint_columns(table, constraint)?;
    }

    let select = permissions.select(&table.name);
    let names = building.table_names(table_id);
    let naming = building.naming();

    let constraint_enum_id = building.enum_type(
        ShapeKey::new(&table.name, ShapeKind::ConstraintEnum, String::new()),
        |_| EnumType {
            name: names.constraint(),
            description: Some(format!(
                "unique or primary key constraints on table \"{}\"",
                table.name
            )),
            values: table
                .constraints
                .iter()
                .map(|constraint| EnumValue {
                    name: naming.enum_value(&constraint.name),
                    target: EnumTarget::Constraint(constraint.name.clone()),
                })
                .collect(),
        },
    )?;

    let column_enum_id = building.enum_type(
        ShapeKey::new(
            &table.name,
            ShapeKind::UpdateColumnEnum,
            fingerprint(&update.columns),
        ),
        |_| {
            let mut values: Vec<_> = table
                .columns
                .iter()
                .filter(|column| update.allows(&column.name))
                .map(|column| EnumValue {
                    name: naming.enum_value(&column.name),
                    target: EnumTarget::Column(column.name.clone()),
                })
                .collect();

            if values.is_empty() {
                values.push(EnumValue {
                    name: PLACEHOLDER_ENUM_VALUE.to_string(),
                    target: EnumTarget::Placeholder,
                });
            }

            EnumType {
                name: names.update_column(),
                description: Some(format!(
                    "update columns of table \"{}\"",
                    table.name
                )),
                values,
            }
        },
    )?;

    let type_name = names.on_conflict();
    let input_type_id = building.input_type(
        ShapeKey::new(&table.name, ShapeKind::OnConflict, fingerprint(&(update, select))),
        type_name.clone(),
        |_| {
            let mut fields = vec![
                InputField::structural(
                    naming.field_name("constraint"),
                    FieldType::Plain(InputTypeRef::Enum(constraint_enum_id)),
                    "unique or primary key constraint on the table",
                ),
                InputField::structural(
                    naming.field_name("update_columns"),
                    FieldType::Plain(InputTypeRef::Enum(column_enum_id)).list(),
                    "columns to overwrite from the incoming row",
                ),
            ];
            if select.is_some() {
                fields.push(InputField::structural(
                    naming.field_name("where"),
                    FieldType::Plain(InputTypeRef::BoolExp(names.bool_exp())).optional(),
                    "rows to update on conflict",
                ));
            }

            InputObjectType {
                name: type_name,
                description: Some(format!(
                    "on_conflict condition type for table \"{}\"",
                    table.name
                )),
                fields,
                kind: InputObjectKind::OnConflict,
            }
        },
    )?;

    Ok(Some(ConflictShape {
        input_type_id,
        constraint_enum_id,
        column_enum_id,
        select: select.cloned(),
        update: update.clone(),
    }))
}

impl ConflictShape {
    /// Lower an `on_conflict` value.
    ///
    /// With no columns to overwrite, the conflicting row is left alone. Otherwise the conflicting
    /// row is updated if it passes both the client's filter and the update grant's filter.
    pub fn lower(
        &self,
        ctx: &LoweringContext,
        table: &Table,
        value: &Val,
        path: &ArgumentPath,
    ) -> Result<ConflictClause, ArgumentErrors> {
        let input_type = &ctx.input_types[self.input_type_id];
        let fields = object_fields(value, input_type, path)?;

        let constraint_name = ctx.naming.field_name("constraint");
        let columns_name = ctx.naming.field_name("update_columns");
        let where_name = ctx.naming.field_name("where");

        let constraint = {
            let path = path.field(&constraint_name);
            enum_value(
                &ctx.enum_types[self.constraint_enum_id],
                field_value(fields, &constraint_name),
                &path,
            )
            .and_then(|value| match &value.target {
                EnumTarget::Constraint(name) => Ok(name.clone()),
                _ => Err(ArgumentErrors::new(
                    &path,
                    ArgumentErrorKind::Invalid(format!("'{}' is not a constraint", value.name)),
                )),
            })
        };

        let columns = {
            let path = path.field(&columns_name);
            let column_enum = &ctx.enum_types[self.column_enum_id];
            collect_all(
                list_items(field_value(fields, &columns_name))
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        enum_value(column_enum, item, &path.index(i)).map(|value| {
                            match &value.target {
                                EnumTarget::Column(name) => Some(name.clone()),
                                _ => None,
                            }
                        })
                    }),
            )
            .map(|columns| columns.into_iter().flatten().collect::<Vec<_>>())
        };

        let filter = match fields.get(&where_name) {
            Some(value) if !value.is_null() => ctx
                .bool_exp_parser
                .parse(table, self.select.as_ref(), value, &path.field(&where_name))
                .map(Some),
            _ => Ok(None),
        };

        let ((constraint, columns), filter) = join(join(constraint, columns), filter)?;

        if columns.is_empty() {
            Ok(ConflictClause::DoNothing {
                constraint: Some(constraint),
            })
        } else {
            Ok(ConflictClause::Update {
                constraint,
                columns,
                presets: self.update.presets.clone(),
                filter: filter
                    .unwrap_or_else(BoolExp::always_true)
                    .and(self.update.filter.clone()),
            })
        }
    }
}
