// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Accepted input shapes: the input object types, enum types, and arguments offered to a role.
//!
//! Types refer to each other by index into the arenas held by the schema, so recursive shapes (a
//! table whose insert input refers back to itself through relationships) are plain data.

use serde::{Deserialize, Serialize};

use mutation_ir::{ColumnInfo, ColumnType, RelationshipInsertInfo};
use mutation_model::{catalog::RelationshipKind, mapped_arena::SerializableSlabIndex};

use crate::{insert_builder::InsertTargetShape, update_operator_builder::UpdateOperatorKind};

pub type InputObjectTypeId = SerializableSlabIndex<InputObjectType>;
pub type EnumTypeId = SerializableSlabIndex<EnumType>;

/// Type with modifiers. `Plain` is a required (non-null) value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FieldType<T> {
    Plain(T),
    Optional(Box<FieldType<T>>),
    List(Box<FieldType<T>>),
}

impl<T> FieldType<T> {
    pub fn optional(self) -> Self {
        match self {
            FieldType::Optional(_) => self,
            _ => FieldType::Optional(Box::new(self)),
        }
    }

    /// A required list of this type
    pub fn list(self) -> Self {
        FieldType::List(Box::new(self))
    }

    pub fn innermost(&self) -> &T {
        match self {
            FieldType::Plain(t) => t,
            FieldType::Optional(inner) | FieldType::List(inner) => inner.innermost(),
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, FieldType::Optional(_))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum InputTypeRef {
    Scalar(ColumnType),
    Enum(EnumTypeId),
    Object(InputObjectTypeId),
    /// Filter type produced by the boolean-expression collaborator
    BoolExp(String),
}

/// Where the value of an input field goes once lowered
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FieldSource {
    Column(ColumnInfo),
    ObjectRelationship(RelationshipInsertInfo),
    ArrayRelationship(RelationshipInsertInfo),
    /// Fields such as `data`, `constraint`, or `where` read by the owning shape itself
    Structural,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InputField {
    pub name: String,
    pub typ: FieldType<InputTypeRef>,
    pub description: Option<String>,
    pub source: FieldSource,
}

impl InputField {
    pub fn structural(name: String, typ: FieldType<InputTypeRef>, description: &str) -> Self {
        Self {
            name,
            typ,
            description: Some(description.to_string()),
            source: FieldSource::Structural,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum InputObjectKind {
    /// Registered, but not expanded yet
    Shallow,
    Insert {
        table: String,
    },
    RelationshipInsert {
        kind: RelationshipKind,
        target: Box<InsertTargetShape>,
    },
    OnConflict,
    UpdateOperator(UpdateOperatorKind),
    PrimaryKeyColumns,
    Updates,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<InputField>,
    pub kind: InputObjectKind,
}

impl InputObjectType {
    pub fn shallow(name: String) -> Self {
        Self {
            name,
            description: None,
            fields: vec![],
            kind: InputObjectKind::Shallow,
        }
    }

    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn is_shallow(&self) -> bool {
        matches!(self.kind, InputObjectKind::Shallow)
    }
}

/// What an enum value stands for
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum EnumTarget {
    Constraint(String),
    Column(String),
    /// Stands in when no real value exists (GraphQL enums must not be empty)
    Placeholder,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub target: EnumTarget,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValue>,
}

impl EnumType {
    pub fn value(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|value| value.name == name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub typ: FieldType<InputTypeRef>,
    pub description: Option<String>,
}

impl ArgumentDefinition {
    pub fn new(name: String, typ: FieldType<InputTypeRef>, description: &str) -> Self {
        Self {
            name,
            typ,
            description: Some(description.to_string()),
        }
    }
}

/// The GraphQL scalar a column type is exposed as
pub fn scalar_type_name(typ: ColumnType) -> &'static str {
    match typ {
        ColumnType::Int => "Int",
        ColumnType::BigInt => "bigint",
        ColumnType::Float => "Float",
        ColumnType::Numeric => "numeric",
        ColumnType::Boolean => "Boolean",
        ColumnType::Text => "String",
        ColumnType::Uuid => "uuid",
        ColumnType::Date => "date",
        ColumnType::Time => "time",
        ColumnType::Timestamp => "timestamptz",
        ColumnType::Json => "jsonb",
    }
}
