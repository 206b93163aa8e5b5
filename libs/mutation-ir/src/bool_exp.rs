// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::MutationValue;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A boolean predicate over the columns of a single table.
///
/// Used for client-supplied `where` arguments as well as for row filters and check conditions
/// of permission grants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BoolExp {
    /// Conjunction. An empty conjunction is `true`.
    And(Vec<BoolExp>),
    /// Disjunction. An empty disjunction is `false`.
    Or(Vec<BoolExp>),
    Not(Box<BoolExp>),
    Compare {
        column: String,
        op: ComparisonOperator,
        value: MutationValue,
    },
    In {
        column: String,
        values: Vec<MutationValue>,
        negated: bool,
    },
    IsNull {
        column: String,
        is_null: bool,
    },
}

impl BoolExp {
    pub fn always_true() -> Self {
        BoolExp::And(vec![])
    }

    pub fn always_false() -> Self {
        BoolExp::Or(vec![])
    }

    pub fn is_always_true(&self) -> bool {
        matches!(self, BoolExp::And(exprs) if exprs.is_empty())
    }

    pub fn column_eq(column: impl Into<String>, value: impl Into<MutationValue>) -> Self {
        BoolExp::Compare {
            column: column.into(),
            op: ComparisonOperator::Eq,
            value: value.into(),
        }
    }

    /// Conjunction of `self` and `other`.
    ///
    /// Neither side is simplified away (not even an always-true side): the execution engine receives
    /// both predicates exactly as they were combined.
    pub fn and(self, other: BoolExp) -> Self {
        BoolExp::And(vec![self, other])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::value::Val;
    use multiplatform_test::multiplatform_test;

    #[multiplatform_test]
    fn and_keeps_both_sides() {
        let permission =
            BoolExp::column_eq("owner_id", MutationValue::SessionVariable("x-user-id".into()));

        let combined = BoolExp::always_true().and(permission.clone());
        assert_eq!(
            combined,
            BoolExp::And(vec![BoolExp::always_true(), permission])
        );
        assert!(!combined.is_always_true());
    }

    #[multiplatform_test]
    fn eq_from_literal() {
        assert_eq!(
            BoolExp::column_eq("id", Val::from(5)),
            BoolExp::Compare {
                column: "id".into(),
                op: ComparisonOperator::Eq,
                value: MutationValue::Literal(Val::from(5)),
            }
        );
    }
}
