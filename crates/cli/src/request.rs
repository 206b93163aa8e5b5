// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Turn a GraphQL mutation document into field requests.

use anyhow::{Result, anyhow, bail};
use async_graphql_parser::{
    Positioned,
    types::{DocumentOperations, Field, OperationType, Selection, SelectionSet},
};
use async_graphql_value::ConstValue;

use common::value::Val;
use mutation_builder::{FieldRequest, RequestedField};

/// The root fields of the (single) mutation operation in `query`.
///
/// Variables are substituted from `variables`. Fragments are not supported.
pub fn parse_mutation(
    query: &str,
    variables: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<FieldRequest>> {
    let document = async_graphql_parser::parse_query(query)?;

    let operation = match document.operations {
        DocumentOperations::Single(operation) => operation,
        DocumentOperations::Multiple(operations) => {
            let mut operations = operations.into_values();
            match (operations.next(), operations.next()) {
                (Some(operation), None) => operation,
                _ => bail!("Expected exactly one operation in the document"),
            }
        }
    };

    if operation.node.ty != OperationType::Mutation {
        bail!("Expected a mutation, found a {}", operation.node.ty);
    }

    operation
        .node
        .selection_set
        .node
        .items
        .iter()
        .map(|selection| {
            let field = selection_field(selection)?;

            let arguments = field
                .node
                .arguments
                .iter()
                .map(|(name, value)| {
                    let value = value.node.clone().into_const_with(|variable| {
                        variables
                            .get(variable.as_str())
                            .map(|value| ConstValue::from_json(value.clone()))
                            .transpose()?
                            .ok_or_else(|| anyhow!("Variable '${variable}' is not provided"))
                    })?;

                    Ok((name.node.to_string(), Val::try_from(value)?))
                })
                .collect::<Result<_>>()?;

            Ok(FieldRequest {
                name: field.node.name.node.to_string(),
                alias: field.node.alias.as_ref().map(|alias| alias.node.to_string()),
                arguments,
                selection: requested_fields(&field.node.selection_set)?,
            })
        })
        .collect()
}

fn selection_field(selection: &Positioned<Selection>) -> Result<&Positioned<Field>> {
    match &selection.node {
        Selection::Field(field) => Ok(field),
        Selection::FragmentSpread(_) | Selection::InlineFragment(_) => Err(anyhow!(
            "Fragments are not supported (at line {}, column {})",
            selection.pos.line,
            selection.pos.column
        )),
    }
}

fn requested_fields(selection_set: &Positioned<SelectionSet>) -> Result<Vec<RequestedField>> {
    selection_set
        .node
        .items
        .iter()
        .map(|selection| {
            let field = selection_field(selection)?;
            Ok(RequestedField {
                alias: field.node.alias.as_ref().map(|alias| alias.node.to_string()),
                name: field.node.name.node.to_string(),
                selection: requested_fields(&field.node.selection_set)?,
            })
        })
        .collect()
}
