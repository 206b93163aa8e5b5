// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Build the mutation schema of a role and lower requests against it.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, debug_span, warn};

use mutation_ir::AnnotatedMutation;
use mutation_model::{
    catalog::{Catalog, RootFieldKind},
    mapped_arena::MappedArena,
    permission::RolePermissions,
};

use crate::{
    bool_exp::{BoolExpParser, ColumnBoolExpParser},
    building::SchemaBuilding,
    config::MutationSchemaConfig,
    error::{ArgumentErrorKind, ArgumentErrors, ArgumentPath, SchemaBuildingError},
    naming::NamingConvention,
    request::{FieldRequest, LoweringContext},
    root_field_builder::{MutationField, build_root_field},
    selection::{ColumnSelectionBuilder, ReadSelectionBuilder},
    shape::{EnumType, InputObjectType},
};

/// Filter parsing and row projection, supplied by the query side of the system
#[derive(Clone)]
pub struct Collaborators {
    pub bool_exp_parser: Arc<dyn BoolExpParser>,
    pub selection_builder: Arc<dyn ReadSelectionBuilder>,
}

impl Collaborators {
    pub fn column_based(naming: NamingConvention) -> Self {
        Self {
            bool_exp_parser: Arc::new(ColumnBoolExpParser::new(naming)),
            selection_builder: Arc::new(ColumnSelectionBuilder::new(naming)),
        }
    }
}

/// A field that could not be built. The rest of the schema is unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Skipped {kind:?} field of table '{table}': {error}")]
pub struct FieldBuildError {
    pub table: String,
    pub kind: RootFieldKind,
    #[source]
    pub error: SchemaBuildingError,
}

pub struct MutationSchema {
    pub role: String,
    pub naming: NamingConvention,
    /// Offered fields, in catalog order
    pub fields: IndexMap<String, MutationField>,
    pub input_types: MappedArena<InputObjectType>,
    pub enum_types: MappedArena<EnumType>,
    pub build_errors: Vec<FieldBuildError>,
    catalog: Arc<Catalog>,
    collaborators: Collaborators,
}

pub fn build_mutation_schema(
    catalog: Arc<Catalog>,
    permissions: &RolePermissions,
    config: &MutationSchemaConfig,
    collaborators: Collaborators,
) -> MutationSchema {
    let _span = debug_span!("build_mutation_schema", role = %permissions.role).entered();

    let mut building = SchemaBuilding::new(&catalog, permissions, config);
    let mut fields: IndexMap<String, MutationField> = IndexMap::new();
    let mut build_errors = vec![];

    for (table_id, table) in catalog.iter() {
        let writable = permissions.table(&table.name).is_some_and(|grants| {
            grants.insert.is_some() || grants.update.is_some() || grants.delete.is_some()
        });
        if !writable {
            continue;
        }

        for kind in RootFieldKind::ALL {
            let built = build_root_field(&mut building, table_id, kind).and_then(|field| match field {
                Some(field) if fields.contains_key(&field.name) => {
                    Err(SchemaBuildingError::DuplicateField(field.name))
                }
                other => Ok(other),
            });

            match built {
                Ok(Some(field)) => {
                    debug!(field = %field.name, table = %table.name, "Built mutation field");
                    fields.insert(field.name.clone(), field);
                }
                Ok(None) => {
                    debug!(table = %table.name, ?kind, "Mutation field withheld");
                }
                Err(error) => {
                    warn!(
                        role = %permissions.role,
                        table = %table.name,
                        ?kind,
                        %error,
                        "Skipping mutation field"
                    );
                    build_errors.push(FieldBuildError {
                        table: table.name.clone(),
                        kind,
                        error,
                    });
                }
            }
        }
    }

    let (input_types, enum_types) = building.into_types();

    MutationSchema {
        role: permissions.role.clone(),
        naming: config.naming,
        fields,
        input_types,
        enum_types,
        build_errors,
        catalog,
        collaborators,
    }
}

/// Build the schemas of several roles. Roles are independent, so each is built on its own thread.
pub fn build_mutation_schemas(
    catalog: Arc<Catalog>,
    roles: &[RolePermissions],
    config: &MutationSchemaConfig,
    collaborators: &Collaborators,
) -> IndexMap<String, MutationSchema> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = roles
            .iter()
            .map(|permissions| {
                let catalog = catalog.clone();
                let collaborators = collaborators.clone();
                scope.spawn(move || {
                    build_mutation_schema(catalog, permissions, config, collaborators)
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(roles)
            .filter_map(|(handle, permissions)| match handle.join() {
                Ok(schema) => Some((schema.role.clone(), schema)),
                Err(_) => {
                    warn!(role = %permissions.role, "Building the mutation schema panicked");
                    None
                }
            })
            .collect()
    })
}

impl MutationSchema {
    pub fn field(&self, name: &str) -> Option<&MutationField> {
        self.fields.get(name)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn lowering_context(&self) -> LoweringContext<'_> {
        LoweringContext {
            catalog: &self.catalog,
            input_types: &self.input_types,
            enum_types: &self.enum_types,
            naming: self.naming,
            bool_exp_parser: self.collaborators.bool_exp_parser.as_ref(),
            selection_builder: self.collaborators.selection_builder.as_ref(),
        }
    }

    /// Lower a request for one of the offered fields
    pub fn lower(&self, request: &FieldRequest) -> Result<AnnotatedMutation, ArgumentErrors> {
        let Some(field) = self.fields.get(&request.name) else {
            return Err(ArgumentErrors::new(
                &ArgumentPath::root(request.output_name()),
                ArgumentErrorKind::UnknownMutationField(request.name.clone()),
            ));
        };

        let mutation = field.lower(&self.lowering_context(), request)?;
        debug!(
            field = %field.name,
            table = mutation.table(),
            kind = mutation.kind_name(),
            "Lowered mutation"
        );

        Ok(mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiplatform_test::multiplatform_test;

    use common::value::Val;
    use mutation_ir::{
        BoolExp, ColumnUpdate, ConflictClause, MutationOutput, MutationOutputField,
        MutationValue, UpdateOperation, UpdateVariant,
    };
    use mutation_model::{
        catalog::{CustomRootField, Table},
        permission::{InsertPermission, SelectPermission, TablePermissions, UpdatePermission},
    };

    use crate::request::RequestedField;
    use crate::test_utils::{
        articles_catalog, author_permissions, editor_permissions, selection, session, val,
    };

    fn build(catalog: Catalog, permissions: &RolePermissions) -> MutationSchema {
        build_with(catalog, permissions, MutationSchemaConfig::default())
    }

    fn build_with(
        catalog: Catalog,
        permissions: &RolePermissions,
        config: MutationSchemaConfig,
    ) -> MutationSchema {
        let collaborators = Collaborators::column_based(config.naming);
        build_mutation_schema(Arc::new(catalog), permissions, &config, collaborators)
    }

    fn field_names(schema: &MutationSchema) -> Vec<&str> {
        schema.fields.keys().map(String::as_str).collect()
    }

    #[multiplatform_test]
    fn fields_follow_grants() {
        let schema = build(articles_catalog(), &author_permissions());

        assert_eq!(
            field_names(&schema),
            vec![
                "insert_authors",
                "insert_authors_one",
                "update_authors",
                "update_authors_by_pk",
                "update_authors_many",
                "insert_articles",
                "insert_articles_one",
                "update_articles",
                "update_articles_by_pk",
                "update_articles_many",
                "delete_articles",
                "delete_articles_by_pk",
            ]
        );
        assert!(schema.build_errors.is_empty());
    }

    #[multiplatform_test]
    fn insert_many() {
        let permissions = RolePermissions::new("user").with_table(
            "t",
            TablePermissions {
                insert: Some(InsertPermission::new(&["name", "tags"])),
                ..Default::default()
            },
        );
        let schema = build(articles_catalog(), &permissions);
        assert_eq!(field_names(&schema), vec!["insert_t"]);

        let request = FieldRequest::new("insert_t")
            .with_argument(
                "objects",
                val(serde_json::json!([{"name": "a"}, {"name": "b"}])),
            )
            .with_selection(selection(&["affected_rows"]));

        let AnnotatedMutation::Insert(insert) = schema.lower(&request).unwrap() else {
            panic!("expected an insert");
        };

        let rows: Vec<_> = insert
            .insert
            .rows
            .iter()
            .map(|row| row.literal("name").cloned())
            .collect();
        assert_eq!(rows, vec![Some(Val::from("a")), Some(Val::from("b"))]);
        assert!(insert.insert.rows.iter().all(|row| row.columns.len() == 1));
        assert_eq!(insert.insert.conflict, None);
        assert_eq!(
            insert.insert.defaults.get("id"),
            Some(&MutationValue::Expression("nextval('t_id_seq')".to_string()))
        );
        assert_eq!(
            insert.output,
            MutationOutput::MultipleRows(vec![(
                "affected_rows".to_string(),
                MutationOutputField::AffectedRows
            )])
        );
    }

    #[multiplatform_test]
    fn insert_with_conflict() {
        let schema = build(articles_catalog(), &editor_permissions());

        let request = FieldRequest::new("insert_t_one")
            .with_argument("object", val(serde_json::json!({"id": 1, "name": "a"})))
            .with_argument(
                "on_conflict",
                val(serde_json::json!({"constraint": "t_pkey", "update_columns": ["name"]})),
            )
            .with_selection(selection(&["id"]));

        let AnnotatedMutation::Insert(insert) = schema.lower(&request).unwrap() else {
            panic!("expected an insert");
        };
        assert_eq!(insert.insert.rows.len(), 1);
        assert_eq!(
            insert.insert.conflict,
            Some(ConflictClause::Update {
                constraint: "t_pkey".to_string(),
                columns: vec!["name".to_string()],
                presets: Default::default(),
                filter: BoolExp::And(vec![BoolExp::always_true(), BoolExp::always_true()]),
            })
        );
        let MutationOutput::SingleRow(projection) = &insert.output else {
            panic!("expected a single row");
        };
        assert_eq!(projection.table, "t");
    }

    #[multiplatform_test]
    fn update_by_pk() {
        let mut permissions = editor_permissions();
        let update_filter = BoolExp::column_eq("name", session("x-hasura-user-name"));
        permissions.tables.get_mut("t").unwrap().update = Some(UpdatePermission::new(
            &["name", "tags", "count"],
            update_filter.clone(),
        ));
        let schema = build(articles_catalog(), &permissions);

        let request = FieldRequest::new("update_t_by_pk")
            .with_argument("_inc", val(serde_json::json!({"count": 3})))
            .with_argument("pk_columns", val(serde_json::json!({"id": 5})))
            .with_selection(selection(&["id", "count"]));

        let AnnotatedMutation::Update(update) = schema.lower(&request).unwrap() else {
            panic!("expected an update");
        };

        assert_eq!(update.table, "t");
        assert_eq!(
            update.variant,
            UpdateVariant::SingleBatch(mutation_ir::UpdateBatch {
                operations: vec![ColumnUpdate::new(
                    "count",
                    UpdateOperation::Increment(MutationValue::Literal(Val::from(3i64)))
                )],
                filter: BoolExp::And(vec![
                    BoolExp::column_eq("id", Val::from(5i64)),
                    update_filter,
                ]),
            })
        );
        assert_eq!(update.check, None);
    }

    #[multiplatform_test]
    fn update_many_batches() {
        let schema = build(articles_catalog(), &editor_permissions());

        let request = FieldRequest::new("update_t_many")
            .with_argument(
                "updates",
                val(serde_json::json!([
                    {"_set": {"name": "x"}, "where": {"id": {"_eq": 1}}},
                    {"_inc": {"count": 1}, "where": {}}
                ])),
            )
            .with_selection(selection(&["affected_rows"]));

        let AnnotatedMutation::Update(update) = schema.lower(&request).unwrap() else {
            panic!("expected an update");
        };
        let UpdateVariant::MultipleBatches(batches) = &update.variant else {
            panic!("expected batches");
        };

        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0].operations,
            vec![ColumnUpdate::new(
                "name",
                UpdateOperation::Set(MutationValue::Literal(Val::from("x")))
            )]
        );
        assert_eq!(
            batches[0].filter,
            BoolExp::And(vec![
                BoolExp::column_eq("id", Val::from(1i64)),
                BoolExp::always_true()
            ])
        );
        assert_eq!(
            batches[1].filter,
            BoolExp::And(vec![BoolExp::always_true(), BoolExp::always_true()])
        );
    }

    #[multiplatform_test]
    fn update_many_reports_every_batch() {
        let schema = build(articles_catalog(), &editor_permissions());

        let request = FieldRequest::new("update_t_many").with_argument(
            "updates",
            val(serde_json::json!([
                {"where": {}},
                {"_set": {"count": 1}, "_inc": {"count": 2}, "where": {}}
            ])),
        );

        let messages: Vec<_> = schema
            .lower(&request)
            .unwrap_err()
            .errors()
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "at least one of _set, _inc, _append, _prepend, _delete_key, _delete_elem, _delete_at_path is required (at 'update_t_many.updates[0]')",
                "column 'count' found in multiple operators: _inc, _set (at 'update_t_many.updates[1]')",
            ]
        );
    }

    #[multiplatform_test]
    fn delete_with_filter() {
        let permissions = author_permissions();
        let schema = build(articles_catalog(), &permissions);

        let request = FieldRequest::new("delete_articles")
            .with_argument("where", val(serde_json::json!({"rating": {"_lt": 2}})))
            .with_selection(vec![RequestedField::with_selection(
                "returning",
                selection(&["id"]),
            )]);

        let AnnotatedMutation::Delete(delete) = schema.lower(&request).unwrap() else {
            panic!("expected a delete");
        };
        assert_eq!(delete.table, "articles");
        assert_eq!(
            delete.filter,
            BoolExp::And(vec![
                BoolExp::Compare {
                    column: "rating".to_string(),
                    op: mutation_ir::ComparisonOperator::Lt,
                    value: MutationValue::Literal(Val::from(2i64)),
                },
                permissions.delete("articles").unwrap().filter.clone(),
            ])
        );
    }

    #[multiplatform_test]
    fn delete_by_pk() {
        let schema = build(articles_catalog(), &editor_permissions());

        let request = FieldRequest::new("delete_t_by_pk")
            .with_argument("id", Val::from(7i64))
            .with_selection(selection(&["name"]));

        let AnnotatedMutation::Delete(delete) = schema.lower(&request).unwrap() else {
            panic!("expected a delete");
        };
        assert_eq!(
            delete.filter,
            BoolExp::And(vec![
                BoolExp::column_eq("id", Val::from(7i64)),
                BoolExp::always_true()
            ])
        );
    }

    #[multiplatform_test]
    fn unknown_field() {
        let schema = build(articles_catalog(), &author_permissions());

        let errors = schema.lower(&FieldRequest::new("delete_authors")).unwrap_err();
        assert_eq!(
            errors.to_string(),
            "no mutation field named 'delete_authors' (at 'delete_authors')"
        );
    }

    #[multiplatform_test]
    fn arguments_and_selection_errors_are_reported_together() {
        let schema = build(articles_catalog(), &editor_permissions());

        let request = FieldRequest::new("update_t")
            .with_argument("_set", val(serde_json::json!({"name": 3})))
            .with_argument("where", val(serde_json::json!({})))
            .with_selection(selection(&["affected_rows", "total"]));

        let messages: Vec<_> = schema
            .lower(&request)
            .unwrap_err()
            .errors()
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "expected String, but found integer (at 'update_t._set.name')",
                "field 'total' not found in type: 't_mutation_response' (at 'update_t.total')",
            ]
        );
    }

    #[multiplatform_test]
    fn stray_and_missing_arguments() {
        let schema = build(articles_catalog(), &editor_permissions());

        let request = FieldRequest::new("delete_t").with_argument("limit", Val::from(1i64));
        let messages: Vec<_> = schema
            .lower(&request)
            .unwrap_err()
            .errors()
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "'delete_t' has no argument named 'limit' (at 'delete_t.limit')",
                "missing required field 'where' (at 'delete_t')",
            ]
        );
    }

    #[multiplatform_test]
    fn graphql_default_naming() {
        let config = MutationSchemaConfig {
            naming: NamingConvention::GraphqlDefault,
            ..Default::default()
        };
        let schema = build_with(articles_catalog(), &editor_permissions(), config);

        assert_eq!(
            field_names(&schema),
            vec![
                "insertT",
                "insertTOne",
                "updateT",
                "updateTByPk",
                "updateTMany",
                "deleteT",
                "deleteTByPk",
            ]
        );

        let request = FieldRequest::new("updateTByPk")
            .with_argument("_set", val(serde_json::json!({"name": "renamed"})))
            .with_argument("pkColumns", val(serde_json::json!({"id": 1})))
            .with_selection(selection(&["name"]));
        assert!(schema.lower(&request).is_ok());
    }

    #[multiplatform_test]
    fn invalid_names_only_affect_their_field() {
        let mut catalog = articles_catalog();
        let mut t = catalog.table("t").unwrap().clone();
        t.custom_root_fields.insert_one = Some(CustomRootField {
            name: Some("insert one t".to_string()),
            comment: None,
        });
        let others: Vec<_> = catalog
            .iter()
            .filter(|(_, table)| table.name != "t")
            .map(|(_, table)| table.clone())
            .collect();
        catalog = Catalog::new(others.into_iter().chain([t]));

        let schema = build(catalog, &editor_permissions());

        assert!(!schema.fields.values().any(|f| f.kind == RootFieldKind::InsertOne));
        assert_eq!(schema.fields.len(), 6);
        assert_eq!(
            schema.build_errors,
            vec![FieldBuildError {
                table: "t".to_string(),
                kind: RootFieldKind::InsertOne,
                error: SchemaBuildingError::InvalidName("insert one t".to_string()),
            }]
        );
    }

    #[multiplatform_test]
    fn duplicate_field_names() {
        let mut catalog = articles_catalog();
        let mut t = catalog.table("t").unwrap().clone();
        t.custom_root_fields.delete = Some(CustomRootField {
            name: Some("insert_t".to_string()),
            comment: None,
        });
        catalog = Catalog::new([t]);

        let schema = build(catalog, &editor_permissions());

        assert_eq!(
            schema.build_errors,
            vec![FieldBuildError {
                table: "t".to_string(),
                kind: RootFieldKind::Delete,
                error: SchemaBuildingError::DuplicateField("insert_t".to_string()),
            }]
        );
        assert_eq!(schema.field("insert_t").unwrap().kind, RootFieldKind::Insert);
    }

    #[multiplatform_test]
    fn colliding_type_names_keep_the_first_table() {
        let t = articles_catalog().table("t").unwrap().clone();
        let snake = Table {
            name: "order_items".to_string(),
            ..t.clone()
        };
        let camel = Table {
            name: "orderItems".to_string(),
            ..t
        };
        let catalog = Catalog::new([snake, camel]);

        let permissions = RolePermissions::new("user")
            .with_table(
                "order_items",
                TablePermissions {
                    insert: Some(InsertPermission::new(&["name"])),
                    ..Default::default()
                },
            )
            .with_table(
                "orderItems",
                TablePermissions {
                    insert: Some(InsertPermission::new(&["count"])),
                    ..Default::default()
                },
            );
        let config = MutationSchemaConfig {
            naming: NamingConvention::GraphqlDefault,
            ..Default::default()
        };
        let schema = build_with(catalog, &permissions, config);

        assert_eq!(
            schema.build_errors,
            vec![FieldBuildError {
                table: "orderItems".to_string(),
                kind: RootFieldKind::Insert,
                error: SchemaBuildingError::DuplicateType("OrderItemsInsertInput".to_string()),
            }]
        );
        assert_eq!(field_names(&schema), vec!["insertOrderItems"]);

        let input_type = schema.input_types.get_by_key("OrderItemsInsertInput").unwrap();
        assert!(input_type.field("name").is_some());
        assert!(input_type.field("count").is_none());

        let granted = FieldRequest::new("insertOrderItems")
            .with_argument("objects", val(serde_json::json!([{"name": "n"}])))
            .with_selection(selection(&["affectedRows"]));
        let AnnotatedMutation::Insert(insert) = schema.lower(&granted).unwrap() else {
            panic!("expected an insert");
        };
        assert_eq!(insert.insert.table, "order_items");

        let other_grant = FieldRequest::new("insertOrderItems")
            .with_argument("objects", val(serde_json::json!([{"name": "n", "count": 1}])))
            .with_selection(selection(&["affectedRows"]));
        let errors = schema.lower(&other_grant).unwrap_err();
        assert!(errors.errors().iter().any(|error| matches!(
            &error.kind,
            ArgumentErrorKind::UnexpectedField { field, .. } if field == "count"
        )));
    }

    #[multiplatform_test]
    fn schemas_for_several_roles() {
        let reader = RolePermissions::new("reader").with_table(
            "t",
            TablePermissions {
                select: Some(SelectPermission::new(&["id"], BoolExp::always_true())),
                ..Default::default()
            },
        );
        let roles = [author_permissions(), editor_permissions(), reader];
        let config = MutationSchemaConfig::default();

        let schemas = build_mutation_schemas(
            Arc::new(articles_catalog()),
            &roles,
            &config,
            &Collaborators::column_based(config.naming),
        );

        let role_names: Vec<_> = schemas.keys().map(String::as_str).collect();
        assert_eq!(role_names, vec!["author", "editor", "reader"]);
        assert_eq!(schemas["editor"].fields.len(), 7);
        assert!(schemas["reader"].fields.is_empty());
    }
}
