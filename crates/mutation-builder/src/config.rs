// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::env::{EnvError, Environment};

use crate::naming::NamingConvention;

pub const EXO_MUTATION_NAMING_CONVENTION: &str = "EXO_MUTATION_NAMING_CONVENTION";
pub const EXO_MUTATION_UPDATE_MANY: &str = "EXO_MUTATION_UPDATE_MANY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSchemaConfig {
    pub naming: NamingConvention,
    /// Offer `update_<table>_many` (batched updates)
    pub update_many_enabled: bool,
}

impl Default for MutationSchemaConfig {
    fn default() -> Self {
        Self {
            naming: NamingConvention::HasuraDefault,
            update_many_enabled: true,
        }
    }
}

impl MutationSchemaConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        let naming = match env.get(EXO_MUTATION_NAMING_CONVENTION) {
            None => NamingConvention::default(),
            Some(value) => match value.as_str() {
                "hasura-default" => NamingConvention::HasuraDefault,
                "graphql-default" => NamingConvention::GraphqlDefault,
                _ => {
                    return Err(EnvError::InvalidEnum {
                        env_key: EXO_MUTATION_NAMING_CONVENTION,
                        env_value: value,
                        message: "Must be one of hasura-default, graphql-default".to_string(),
                    });
                }
            },
        };

        Ok(Self {
            naming,
            update_many_enabled: env.enabled(EXO_MUTATION_UPDATE_MANY, true)?,
        })
    }
}
