// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use mutation_ir::{MutationOutput, MutationOutputField, ReadProjection};
use mutation_model::{catalog::TableId, permission::SelectPermission};

use crate::{
    building::SchemaBuilding,
    error::{ArgumentErrorKind, ArgumentErrors, ArgumentPath, collect_all},
    request::{LoweringContext, RequestedField},
};

/// Rows returned by a mutation, read with the role's select grant
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReturningShape {
    pub table_id: TableId,
    pub row_type: String,
    pub select: SelectPermission,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum MutationOutputShape {
    /// The `<table>_mutation_response` object: the number of affected rows, and the affected rows
    /// themselves if the role may read the table
    MultipleRows {
        type_name: String,
        returning: Option<ReturningShape>,
    },
    /// The affected row, if any
    SingleRow(ReturningShape),
}

pub fn build_mutation_response(building: &SchemaBuilding, table_id: TableId) -> MutationOutputShape {
    let catalog = building.catalog;
    let names = building.table_names(table_id);
    let returning = building
        .permissions
        .select(&catalog[table_id].name)
        .map(|select| ReturningShape {
            table_id,
            row_type: names.row_type(),
            select: select.clone(),
        });

    MutationOutputShape::MultipleRows {
        type_name: names.mutation_response(),
        returning,
    }
}

pub fn build_single_row(
    building: &SchemaBuilding,
    table_id: TableId,
    select: &SelectPermission,
) -> MutationOutputShape {
    MutationOutputShape::SingleRow(ReturningShape {
        table_id,
        row_type: building.table_names(table_id).row_type(),
        select: select.clone(),
    })
}

impl ReturningShape {
    fn lower(
        &self,
        ctx: &LoweringContext,
        selection: &[RequestedField],
        path: &ArgumentPath,
    ) -> Result<ReadProjection, ArgumentErrors> {
        ctx.selection_builder
            .build(&ctx.catalog[self.table_id], &self.select, selection, path)
    }
}

impl MutationOutputShape {
    pub fn type_name(&self) -> &str {
        match self {
            MutationOutputShape::MultipleRows { type_name, .. } => type_name,
            MutationOutputShape::SingleRow(returning) => &returning.row_type,
        }
    }

    pub fn lower(
        &self,
        ctx: &LoweringContext,
        selection: &[RequestedField],
        path: &ArgumentPath,
    ) -> Result<MutationOutput, ArgumentErrors> {
        match self {
            MutationOutputShape::SingleRow(returning) => returning
                .lower(ctx, selection, path)
                .map(MutationOutput::SingleRow),
            MutationOutputShape::MultipleRows {
                type_name,
                returning,
            } => {
                let affected_rows = ctx.naming.field_name("affected_rows");
                let returning_name = ctx.naming.field_name("returning");

                let fields = collect_all(selection.iter().map(|requested| {
                    let field_path = path.field(requested.output_name());

                    let field = if requested.name == affected_rows {
                        Ok(MutationOutputField::AffectedRows)
                    } else if requested.name == "__typename" {
                        Ok(MutationOutputField::TypeName(type_name.clone()))
                    } else {
                        match returning {
                            Some(returning) if requested.name == returning_name => returning
                                .lower(ctx, &requested.selection, &field_path)
                                .map(MutationOutputField::Returning),
                            _ => Err(ArgumentErrors::new(
                                &field_path,
                                ArgumentErrorKind::UnexpectedField {
                                    field: requested.name.clone(),
                                    type_name: type_name.clone(),
                                },
                            )),
                        }
                    }?;

                    Ok((requested.output_name().to_string(), field))
                }))?;

                Ok(MutationOutput::MultipleRows(fields))
            }
        }
    }
}
