// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use mutation_ir::{ProjectedField, ReadProjection};
use mutation_model::{catalog::Table, permission::SelectPermission};

use crate::{
    error::{ArgumentErrorKind, ArgumentErrors, ArgumentPath, collect_all},
    naming::{NamingConvention, TableNames},
    request::RequestedField,
};

/// Turns the selection on returned rows into a read projection, limited by the select grant.
pub trait ReadSelectionBuilder: Send + Sync {
    fn build(
        &self,
        table: &Table,
        select: &SelectPermission,
        selection: &[RequestedField],
        path: &ArgumentPath,
    ) -> Result<ReadProjection, ArgumentErrors>;
}

/// Projects readable columns (and `__typename`) of the table
pub struct ColumnSelectionBuilder {
    naming: NamingConvention,
}

impl ColumnSelectionBuilder {
    pub fn new(naming: NamingConvention) -> Self {
        Self { naming }
    }
}

impl ReadSelectionBuilder for ColumnSelectionBuilder {
    fn build(
        &self,
        table: &Table,
        select: &SelectPermission,
        selection: &[RequestedField],
        path: &ArgumentPath,
    ) -> Result<ReadProjection, ArgumentErrors> {
        let row_type = TableNames::new(table, self.naming).row_type();

        let fields = collect_all(selection.iter().map(|requested| {
            let field_path = path.field(requested.output_name());
            let projected = if requested.name == "__typename" {
                Ok(ProjectedField::TypeName(row_type.clone()))
            } else {
                table
                    .columns
                    .iter()
                    .find(|column| {
                        self.naming.field_name(&column.name) == requested.name
                            && select.allows(&column.name)
                    })
                    .map(|column| ProjectedField::Column(column.name.clone()))
                    .ok_or_else(|| {
                        ArgumentErrors::new(
                            &field_path,
                            ArgumentErrorKind::UnexpectedField {
                                field: requested.name.clone(),
                                type_name: row_type.clone(),
                            },
                        )
                    })
            }?;

            if requested.selection.is_empty() {
                Ok((requested.output_name().to_string(), projected))
            } else {
                Err(ArgumentErrors::new(
                    &field_path,
                    ArgumentErrorKind::Invalid(format!(
                        "field '{}' must not have a selection since it is a scalar",
                        requested.name
                    )),
                ))
            }
        }))?;

        Ok(ReadProjection {
            table: table.name.clone(),
            fields,
            filter: select.filter.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiplatform_test::multiplatform_test;

    use mutation_ir::{BoolExp, MutationValue};

    use crate::test_utils::articles_catalog;

    #[multiplatform_test]
    fn readable_columns() {
        let catalog = articles_catalog();
        let table = catalog.table("articles").unwrap();
        let select = SelectPermission::new(
            &["id", "title"],
            BoolExp::column_eq(
                "author_id",
                MutationValue::SessionVariable("x-hasura-user-id".to_string()),
            ),
        );
        let builder = ColumnSelectionBuilder::new(NamingConvention::HasuraDefault);

        let projection = builder
            .build(
                table,
                &select,
                &[
                    RequestedField::new("id"),
                    RequestedField {
                        alias: Some("heading".to_string()),
                        name: "title".to_string(),
                        selection: vec![],
                    },
                    RequestedField::new("__typename"),
                ],
                &ArgumentPath::root("returning"),
            )
            .unwrap();

        assert_eq!(
            projection.fields,
            vec![
                ("id".to_string(), ProjectedField::Column("id".to_string())),
                (
                    "heading".to_string(),
                    ProjectedField::Column("title".to_string())
                ),
                (
                    "__typename".to_string(),
                    ProjectedField::TypeName("articles".to_string())
                ),
            ]
        );
        assert_eq!(projection.filter, select.filter);

        let errors = builder
            .build(
                table,
                &select,
                &[RequestedField::new("rating")],
                &ArgumentPath::root("returning"),
            )
            .unwrap_err();
        assert_eq!(
            errors.to_string(),
            "field 'rating' not found in type: 'articles' (at 'returning.rating')"
        );
    }
}
