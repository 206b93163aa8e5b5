// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use async_graphql_value::ConstValue;
use indexmap::IndexMap;
use serde::de::Error;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ValNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl ValNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            ValNumber::I64(n) => *n as f64,
            ValNumber::U64(n) => *n as f64,
            ValNumber::F64(n) => *n,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValNumber::I64(n) => Some(*n),
            ValNumber::U64(n) => i64::try_from(*n).ok(),
            ValNumber::F64(_) => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, ValNumber::F64(_))
    }
}

impl Display for ValNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValNumber::I64(n) => write!(f, "{n}"),
            ValNumber::U64(n) => write!(f, "{n}"),
            ValNumber::F64(n) => write!(f, "{n}"),
        }
    }
}

impl From<serde_json::Number> for ValNumber {
    fn from(value: serde_json::Number) -> Self {
        if let Some(n) = value.as_i64() {
            ValNumber::I64(n)
        } else if let Some(n) = value.as_u64() {
            ValNumber::U64(n)
        } else {
            // serde_json numbers are always one of i64, u64, or a finite f64
            ValNumber::F64(value.as_f64().unwrap_or_default())
        }
    }
}

impl TryFrom<ValNumber> for serde_json::Number {
    type Error = serde_json::Error;

    fn try_from(value: ValNumber) -> Result<Self, Self::Error> {
        match value {
            ValNumber::I64(n) => Ok(serde_json::Number::from(n)),
            ValNumber::U64(n) => Ok(serde_json::Number::from(n)),
            ValNumber::F64(n) => serde_json::Number::from_f64(n)
                .ok_or_else(|| serde_json::Error::custom(format!("Invalid number {n}"))),
        }
    }
}

impl From<i32> for ValNumber {
    fn from(value: i32) -> Self {
        ValNumber::I64(value as i64)
    }
}

impl From<i64> for ValNumber {
    fn from(value: i64) -> Self {
        ValNumber::I64(value)
    }
}

impl From<f64> for ValNumber {
    fn from(value: f64) -> Self {
        ValNumber::F64(value)
    }
}

/// An argument value as seen by the mutation builders.
///
/// Objects keep the order in which the client supplied their fields, so anything derived from
/// them (such as the list of update operations) is deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Val {
    Bool(bool),
    Number(ValNumber),
    String(String),
    List(Vec<Val>),
    Object(IndexMap<String, Val>),
    Enum(String),
    Null,
}

impl Val {
    pub fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Object(o) => o.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Val::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// The name of the kind of value, used when reporting a mismatch against the expected type.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Val::Bool(_) => "boolean",
            Val::Number(n) if n.is_integral() => "integer",
            Val::Number(_) => "float",
            Val::String(_) => "string",
            Val::List(_) => "list",
            Val::Object(_) => "object",
            Val::Enum(_) => "enum",
            Val::Null => "null",
        }
    }
}

impl From<&str> for Val {
    fn from(value: &str) -> Self {
        Val::String(value.to_string())
    }
}

impl From<i64> for Val {
    fn from(value: i64) -> Self {
        Val::Number(ValNumber::I64(value))
    }
}

impl From<bool> for Val {
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Bool(b) => write!(f, "{b}"),
            Val::Number(n) => write!(f, "{n}"),
            Val::String(s) => write!(f, "\"{s}\""),
            Val::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Val::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Val::Enum(e) => write!(f, "{e}"),
            Val::Null => write!(f, "null"),
        }
    }
}

impl TryFrom<Val> for serde_json::Value {
    type Error = serde_json::Error;

    fn try_from(value: Val) -> Result<Self, Self::Error> {
        match value {
            Val::Null => Ok(serde_json::Value::Null),
            Val::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Val::Number(n) => Ok(serde_json::Value::Number(n.try_into()?)),
            Val::String(s) | Val::Enum(s) => Ok(serde_json::Value::String(s)),
            Val::List(l) => Ok(serde_json::Value::Array(
                l.into_iter()
                    .map(|v| v.try_into())
                    .collect::<Result<_, _>>()?,
            )),
            Val::Object(o) => Ok(serde_json::Value::Object(
                o.into_iter()
                    .map(|(k, v)| Ok((k, v.try_into()?)))
                    .collect::<Result<_, serde_json::Error>>()?,
            )),
        }
    }
}

impl TryFrom<ConstValue> for Val {
    type Error = serde_json::Error;

    fn try_from(value: ConstValue) -> Result<Self, Self::Error> {
        match value {
            ConstValue::Null => Ok(Val::Null),
            ConstValue::Boolean(b) => Ok(Val::Bool(b)),
            ConstValue::Number(n) => Ok(Val::Number(n.into())),
            ConstValue::String(s) => Ok(Val::String(s)),
            ConstValue::List(l) => Ok(Val::List(
                l.into_iter()
                    .map(|v| v.try_into())
                    .collect::<Result<_, _>>()?,
            )),
            ConstValue::Object(o) => Ok(Val::Object(
                o.into_iter()
                    .map(|(k, v)| Ok((k.to_string(), v.try_into()?)))
                    .collect::<Result<_, serde_json::Error>>()?,
            )),
            ConstValue::Enum(e) => Ok(Val::Enum(e.to_string())),
            ConstValue::Binary(_) => Err(serde_json::Error::custom(
                "Binary values are not supported in mutation arguments",
            )),
        }
    }
}

impl From<serde_json::Value> for Val {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Val::Null,
            serde_json::Value::Bool(b) => Val::Bool(b),
            serde_json::Value::Number(n) => Val::Number(n.into()),
            serde_json::Value::String(s) => Val::String(s),
            serde_json::Value::Array(l) => Val::List(l.into_iter().map(|v| v.into()).collect()),
            serde_json::Value::Object(o) => {
                Val::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
