// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Checks of argument values against the accepted shapes.

use indexmap::IndexMap;

use common::value::Val;
use mutation_ir::{ColumnInfo, ColumnType, ScalarKind};

use crate::{
    error::{ArgumentErrorKind, ArgumentErrors, ArgumentPath, ErrorCollector},
    shape::{ArgumentDefinition, EnumType, EnumValue, InputObjectType, scalar_type_name},
};

static NULL: Val = Val::Null;

/// The value of a field, treating an absent field as null
pub(crate) fn field_value<'v>(fields: &'v IndexMap<String, Val>, name: &str) -> &'v Val {
    fields.get(name).unwrap_or(&NULL)
}

pub(crate) fn invalid_type(path: &ArgumentPath, expected: &str, found: &Val) -> ArgumentErrors {
    ArgumentErrors::new(
        path,
        ArgumentErrorKind::InvalidType {
            expected: expected.to_string(),
            found: found.kind_name().to_string(),
        },
    )
}

/// The fields of an input object value, after checking them against the accepted type.
///
/// Reports every field the type doesn't have and every required field that is missing (or null).
pub(crate) fn object_fields<'v>(
    value: &'v Val,
    typ: &InputObjectType,
    path: &ArgumentPath,
) -> Result<&'v IndexMap<String, Val>, ArgumentErrors> {
    let Val::Object(fields) = value else {
        return Err(invalid_type(
            path,
            &format!("an object of type '{}'", typ.name),
            value,
        ));
    };

    let mut collector = ErrorCollector::default();

    for name in fields.keys() {
        if typ.field(name).is_none() {
            collector.push(ArgumentErrors::new(
                &path.field(name),
                ArgumentErrorKind::UnexpectedField {
                    field: name.clone(),
                    type_name: typ.name.clone(),
                },
            ));
        }
    }

    for field in typ.fields.iter().filter(|field| field.typ.is_required()) {
        match fields.get(&field.name) {
            None => collector.push(ArgumentErrors::new(
                path,
                ArgumentErrorKind::MissingField(field.name.clone()),
            )),
            Some(Val::Null) => collector.push(invalid_type(
                &path.field(&field.name),
                "a non-null value",
                &Val::Null,
            )),
            Some(_) => {}
        }
    }

    collector.finish(fields)
}

/// Check the arguments of a root field against its definitions
pub(crate) fn check_arguments(
    arguments: &IndexMap<String, Val>,
    definitions: &[ArgumentDefinition],
    field_name: &str,
    path: &ArgumentPath,
) -> Result<(), ArgumentErrors> {
    let mut collector = ErrorCollector::default();

    for name in arguments.keys() {
        if !definitions.iter().any(|definition| &definition.name == name) {
            collector.push(ArgumentErrors::new(
                &path.field(name),
                ArgumentErrorKind::Invalid(format!(
                    "'{field_name}' has no argument named '{name}'"
                )),
            ));
        }
    }

    for definition in definitions.iter().filter(|d| d.typ.is_required()) {
        match arguments.get(&definition.name) {
            None => collector.push(ArgumentErrors::new(
                path,
                ArgumentErrorKind::MissingField(definition.name.clone()),
            )),
            Some(Val::Null) => collector.push(invalid_type(
                &path.field(&definition.name),
                "a non-null value",
                &Val::Null,
            )),
            Some(_) => {}
        }
    }

    collector.finish(())
}

/// Elements of a list value. A single value stands for a list of one element.
pub(crate) fn list_items(value: &Val) -> Vec<&Val> {
    match value {
        Val::List(items) => items.iter().collect(),
        Val::Null => vec![],
        other => vec![other],
    }
}

pub(crate) fn enum_value<'e>(
    enum_type: &'e EnumType,
    value: &Val,
    path: &ArgumentPath,
) -> Result<&'e EnumValue, ArgumentErrors> {
    let name = match value {
        Val::Enum(name) | Val::String(name) => name,
        other => {
            return Err(invalid_type(
                path,
                &format!("a value of enum '{}'", enum_type.name),
                other,
            ));
        }
    };

    enum_type.value(name).ok_or_else(|| {
        ArgumentErrors::new(
            path,
            ArgumentErrorKind::UnknownEnumValue {
                enum_name: enum_type.name.clone(),
                value: name.clone(),
            },
        )
    })
}

/// Check a value for a column. Null is accepted only for nullable columns.
pub(crate) fn check_column_value(
    column: &ColumnInfo,
    value: &Val,
    path: &ArgumentPath,
) -> Result<(), ArgumentErrors> {
    if value.is_null() {
        if column.nullable {
            Ok(())
        } else {
            Err(invalid_type(
                path,
                &format!("a non-null {}", scalar_type_name(column.typ)),
                value,
            ))
        }
    } else {
        check_scalar(column.typ, value, path)
    }
}

pub(crate) fn check_scalar(
    typ: ColumnType,
    value: &Val,
    path: &ArgumentPath,
) -> Result<(), ArgumentErrors> {
    let accepted = match typ.kind() {
        ScalarKind::Integer => match value {
            Val::Number(n) => match (typ, n.as_i64()) {
                (ColumnType::Int, Some(n)) => i32::try_from(n).is_ok(),
                (_, n) => n.is_some(),
            },
            // bigint values outside the range of JSON numbers are sent as strings
            Val::String(s) => typ == ColumnType::BigInt && s.parse::<i64>().is_ok(),
            _ => false,
        },
        ScalarKind::Decimal => match value {
            Val::Number(_) => true,
            Val::String(s) => typ == ColumnType::Numeric && s.parse::<f64>().is_ok(),
            _ => false,
        },
        ScalarKind::Boolean => matches!(value, Val::Bool(_)),
        ScalarKind::Text | ScalarKind::Temporal => matches!(value, Val::String(_)),
        ScalarKind::Json => !value.is_null(),
    };

    if accepted {
        Ok(())
    } else {
        Err(invalid_type(path, scalar_type_name(typ), value))
    }
}
