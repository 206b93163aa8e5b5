// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Parsing of client-supplied `where` arguments.

use common::value::Val;
use mutation_ir::{BoolExp, ComparisonOperator, MutationValue};
use mutation_model::{
    catalog::{Column, Table},
    permission::SelectPermission,
};

use crate::{
    arguments::{check_scalar, invalid_type, list_items},
    error::{ArgumentErrorKind, ArgumentErrors, ArgumentPath, collect_all},
    naming::{NamingConvention, TableNames},
};

/// Turns a `where` argument into a predicate over the columns of `table`.
///
/// `select` is the select grant of the role on the table; only readable columns may be used.
pub trait BoolExpParser: Send + Sync {
    fn parse(
        &self,
        table: &Table,
        select: Option<&SelectPermission>,
        value: &Val,
        path: &ArgumentPath,
    ) -> Result<BoolExp, ArgumentErrors>;
}

/// Parses `{ _and, _or, _not, <column>: { _eq, _neq, _gt, _lt, _gte, _lte, _in, _nin, _is_null } }`
pub struct ColumnBoolExpParser {
    naming: NamingConvention,
}

impl ColumnBoolExpParser {
    pub fn new(naming: NamingConvention) -> Self {
        Self { naming }
    }

    fn parse_comparisons(
        &self,
        column: &Column,
        value: &Val,
        path: &ArgumentPath,
    ) -> Result<BoolExp, ArgumentErrors> {
        let Val::Object(operators) = value else {
            return Err(invalid_type(path, "an object of comparisons", value));
        };

        let comparisons = collect_all(operators.iter().map(|(operator, operand)| {
            let operand_path = path.field(operator);
            let compare = |op| {
                check_scalar(column.typ, operand, &operand_path).map(|_| BoolExp::Compare {
                    column: column.name.clone(),
                    op,
                    value: MutationValue::Literal(operand.clone()),
                })
            };

            match operator.as_str() {
                "_eq" => compare(ComparisonOperator::Eq),
                "_neq" => compare(ComparisonOperator::Neq),
                "_gt" => compare(ComparisonOperator::Gt),
                "_lt" => compare(ComparisonOperator::Lt),
                "_gte" => compare(ComparisonOperator::Gte),
                "_lte" => compare(ComparisonOperator::Lte),
                "_in" | "_nin" => {
                    let values = collect_all(list_items(operand).into_iter().enumerate().map(
                        |(i, item)| {
                            check_scalar(column.typ, item, &operand_path.index(i))
                                .map(|_| MutationValue::Literal(item.clone()))
                        },
                    ))?;
                    Ok(BoolExp::In {
                        column: column.name.clone(),
                        values,
                        negated: operator == "_nin",
                    })
                }
                "_is_null" => match operand {
                    Val::Bool(is_null) => Ok(BoolExp::IsNull {
                        column: column.name.clone(),
                        is_null: *is_null,
                    }),
                    other => Err(invalid_type(&operand_path, "Boolean", other)),
                },
                _ => Err(ArgumentErrors::new(
                    &operand_path,
                    ArgumentErrorKind::Invalid(format!(
                        "unknown comparison operator '{operator}'"
                    )),
                )),
            }
        }))?;

        Ok(conjunction(comparisons))
    }
}

impl BoolExpParser for ColumnBoolExpParser {
    fn parse(
        &self,
        table: &Table,
        select: Option<&SelectPermission>,
        value: &Val,
        path: &ArgumentPath,
    ) -> Result<BoolExp, ArgumentErrors> {
        let type_name = TableNames::new(table, self.naming).bool_exp();

        let Val::Object(fields) = value else {
            return Err(invalid_type(
                path,
                &format!("an object of type '{type_name}'"),
                value,
            ));
        };

        let expressions = collect_all(fields.iter().map(|(name, operand)| {
            let operand_path = path.field(name);
            match name.as_str() {
                "_and" | "_or" => {
                    let parts = collect_all(list_items(operand).into_iter().enumerate().map(
                        |(i, item)| self.parse(table, select, item, &operand_path.index(i)),
                    ))?;
                    Ok(if name == "_and" {
                        BoolExp::And(parts)
                    } else {
                        BoolExp::Or(parts)
                    })
                }
                "_not" => self
                    .parse(table, select, operand, &operand_path)
                    .map(|e| BoolExp::Not(Box::new(e))),
                _ => {
                    let column = table.columns.iter().find(|column| {
                        self.naming.field_name(&column.name) == *name
                            && select.is_some_and(|select| select.allows(&column.name))
                    });

                    match column {
                        Some(column) => self.parse_comparisons(column, operand, &operand_path),
                        None => Err(ArgumentErrors::new(
                            &operand_path,
                            ArgumentErrorKind::UnexpectedField {
                                field: name.clone(),
                                type_name: type_name.clone(),
                            },
                        )),
                    }
                }
            }
        }))?;

        Ok(conjunction(expressions))
    }
}

fn conjunction(mut expressions: Vec<BoolExp>) -> BoolExp {
    if expressions.len() == 1 {
        expressions.remove(0)
    } else {
        BoolExp::And(expressions)
    }
}
