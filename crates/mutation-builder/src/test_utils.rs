// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use common::value::Val;
use mutation_ir::{BoolExp, ColumnType, MutationValue};
use mutation_model::{
    catalog::{
        Catalog, Column, Constraint, ConstraintKind, CustomRootFields, Relationship,
        RelationshipKind, Table,
    },
    permission::{
        DeletePermission, InsertPermission, RolePermissions, SelectPermission, TablePermissions,
        UpdatePermission,
    },
};

use crate::{
    bool_exp::ColumnBoolExpParser,
    building::SchemaBuilding,
    request::{LoweringContext, RequestedField},
    selection::ColumnSelectionBuilder,
};

pub fn val(json: serde_json::Value) -> Val {
    Val::from(json)
}

pub fn session(name: &str) -> MutationValue {
    MutationValue::SessionVariable(name.to_string())
}

pub fn selection(names: &[&str]) -> Vec<RequestedField> {
    names.iter().map(|name| RequestedField::new(name)).collect()
}

/// Run `f` with a lowering context over the types built so far, using the column-based
/// collaborators
pub fn with_lowering<R>(building: &SchemaBuilding, f: impl FnOnce(&LoweringContext) -> R) -> R {
    let naming = building.naming();
    let bool_exp_parser = ColumnBoolExpParser::new(naming);
    let selection_builder = ColumnSelectionBuilder::new(naming);

    let ctx = LoweringContext {
        catalog: building.catalog,
        input_types: &building.input_types,
        enum_types: &building.enum_types,
        naming,
        bool_exp_parser: &bool_exp_parser,
        selection_builder: &selection_builder,
    };

    f(&ctx)
}

fn column(name: &str, typ: ColumnType) -> Column {
    Column {
        name: name.to_string(),
        typ,
        nullable: false,
        description: None,
        default: None,
    }
}

fn nullable(name: &str, typ: ColumnType) -> Column {
    Column {
        nullable: true,
        ..column(name, typ)
    }
}

fn with_default(name: &str, typ: ColumnType, default: &str) -> Column {
    Column {
        default: Some(default.to_string()),
        ..column(name, typ)
    }
}

fn constraint(name: &str, kind: ConstraintKind, columns: &[&str]) -> Constraint {
    Constraint {
        name: name.to_string(),
        kind,
        columns: columns.iter().map(|c| c.to_string()).collect(),
    }
}

fn relationship(
    name: &str,
    kind: RelationshipKind,
    target_table: &str,
    mapping: (&str, &str),
) -> Relationship {
    Relationship {
        name: name.to_string(),
        kind,
        target_table: target_table.to_string(),
        column_mapping: IndexMap::from([(mapping.0.to_string(), mapping.1.to_string())]),
    }
}

fn table(
    name: &str,
    columns: Vec<Column>,
    constraints: Vec<Constraint>,
    relationships: Vec<Relationship>,
) -> Table {
    Table {
        name: name.to_string(),
        custom_name: None,
        description: None,
        columns,
        constraints,
        relationships,
        custom_root_fields: CustomRootFields::default(),
    }
}

/// Authors (who may have a mentor) writing articles, and two standalone tables
pub fn articles_catalog() -> Catalog {
    let authors = table(
        "authors",
        vec![
            with_default("id", ColumnType::Int, "nextval('authors_id_seq')"),
            column("name", ColumnType::Text),
            nullable("mentor_id", ColumnType::Int),
            nullable("profile", ColumnType::Json),
        ],
        vec![
            constraint("authors_pkey", ConstraintKind::PrimaryKey, &["id"]),
            constraint("authors_name_key", ConstraintKind::Unique, &["name"]),
        ],
        vec![
            relationship(
                "articles",
                RelationshipKind::Array,
                "articles",
                ("id", "author_id"),
            ),
            relationship(
                "mentor",
                RelationshipKind::Object,
                "authors",
                ("mentor_id", "id"),
            ),
        ],
    );

    let articles = table(
        "articles",
        vec![
            with_default("id", ColumnType::Int, "nextval('articles_id_seq')"),
            column("title", ColumnType::Text),
            column("author_id", ColumnType::Int),
            nullable("rating", ColumnType::Int),
            nullable("metadata", ColumnType::Json),
            with_default("created_at", ColumnType::Timestamp, "now()"),
        ],
        vec![constraint("articles_pkey", ConstraintKind::PrimaryKey, &["id"])],
        vec![relationship(
            "author",
            RelationshipKind::Object,
            "authors",
            ("author_id", "id"),
        )],
    );

    let t = table(
        "t",
        vec![
            with_default("id", ColumnType::Int, "nextval('t_id_seq')"),
            column("name", ColumnType::Text),
            nullable("tags", ColumnType::Json),
            nullable("count", ColumnType::Int),
        ],
        vec![constraint("t_pkey", ConstraintKind::PrimaryKey, &["id"])],
        vec![],
    );

    let memberships = table(
        "memberships",
        vec![
            column("id", ColumnType::Int),
            column("tenant_id", ColumnType::Int),
            column("role", ColumnType::Text),
        ],
        vec![constraint(
            "memberships_pkey",
            ConstraintKind::PrimaryKey,
            &["id", "tenant_id"],
        )],
        vec![],
    );

    Catalog::new([authors, articles, t, memberships])
}

/// An author may edit their own profile and write articles under their own name
pub fn author_permissions() -> RolePermissions {
    let own_profile = BoolExp::column_eq("id", session("x-hasura-user-id"));
    let own_articles = BoolExp::column_eq("author_id", session("x-hasura-user-id"));

    RolePermissions::new("author")
        .with_table(
            "authors",
            TablePermissions {
                insert: Some(InsertPermission::new(&["name", "mentor_id", "profile"])),
                select: Some(SelectPermission::new(
                    &["id", "name", "mentor_id"],
                    BoolExp::always_true(),
                )),
                update: Some(UpdatePermission::new(&["name", "profile"], own_profile)),
                delete: None,
            },
        )
        .with_table(
            "articles",
            TablePermissions {
                insert: Some(
                    InsertPermission::new(&["title", "rating", "metadata"])
                        .with_preset("author_id", session("x-hasura-user-id"))
                        .with_check(own_articles.clone()),
                ),
                select: Some(SelectPermission::new(
                    &["id", "title", "author_id", "rating"],
                    BoolExp::always_true(),
                )),
                update: Some(UpdatePermission::new(
                    &["title", "rating", "metadata"],
                    own_articles.clone(),
                )),
                delete: Some(DeletePermission::new(own_articles)),
            },
        )
}

/// Every right on every column of `t`
pub fn editor_permissions() -> RolePermissions {
    let columns = ["id", "name", "tags", "count"];

    RolePermissions::new("editor").with_table(
        "t",
        TablePermissions {
            insert: Some(InsertPermission::new(&columns)),
            select: Some(SelectPermission::new(&columns, BoolExp::always_true())),
            update: Some(UpdatePermission::new(&columns, BoolExp::always_true())),
            delete: Some(DeletePermission::new(BoolExp::always_true())),
        },
    )
}
