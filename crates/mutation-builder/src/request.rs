// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use common::value::Val;
use mutation_model::{catalog::Catalog, mapped_arena::MappedArena};

use crate::{
    bool_exp::BoolExpParser,
    naming::NamingConvention,
    selection::ReadSelectionBuilder,
    shape::{EnumType, InputObjectType},
};

/// A parsed mutation root field, with argument values already resolved (variables substituted)
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRequest {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Val>,
    pub selection: Vec<RequestedField>,
}

impl FieldRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
            arguments: IndexMap::new(),
            selection: vec![],
        }
    }

    pub fn with_argument(mut self, name: &str, value: Val) -> Self {
        self.arguments.insert(name.to_string(), value);
        self
    }

    pub fn with_selection(mut self, selection: Vec<RequestedField>) -> Self {
        self.selection = selection;
        self
    }

    /// The name the response uses for this field
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestedField {
    #[serde(default)]
    pub alias: Option<String>,
    pub name: String,
    #[serde(default)]
    pub selection: Vec<RequestedField>,
}

impl RequestedField {
    pub fn new(name: &str) -> Self {
        Self {
            alias: None,
            name: name.to_string(),
            selection: vec![],
        }
    }

    pub fn with_selection(name: &str, selection: Vec<RequestedField>) -> Self {
        Self {
            alias: None,
            name: name.to_string(),
            selection,
        }
    }

    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// What lowering a request needs from the built schema
pub struct LoweringContext<'a> {
    pub catalog: &'a Catalog,
    pub input_types: &'a MappedArena<InputObjectType>,
    pub enum_types: &'a MappedArena<EnumType>,
    pub naming: NamingConvention,
    pub bool_exp_parser: &'a dyn BoolExpParser,
    pub selection_builder: &'a dyn ReadSelectionBuilder,
}
