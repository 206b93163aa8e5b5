// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Build the permission-gated mutation fields (insert, update, and delete) of a role, and lower
//! requests for them into the annotated IR consumed by the execution engine.
//!
//! Building happens once per role: for each table the role may write to, the builders derive the
//! accepted input shapes from the role's grants (memoized, so recursive relationships terminate and
//! shapes are shared). Lowering then happens per request against the built [`MutationSchema`].

mod arguments;
mod building;
mod conflict_builder;
mod insert_builder;
mod output_builder;
mod pk_builder;
mod root_field_builder;
mod sdl;
mod update_operator_builder;

pub mod bool_exp;
pub mod config;
pub mod error;
pub mod naming;
pub mod request;
pub mod selection;
pub mod shape;
pub mod system_builder;

#[cfg(test)]
mod test_utils;

pub use error::{ArgumentError, ArgumentErrorKind, ArgumentErrors, ArgumentPath, SchemaBuildingError};
pub use output_builder::{MutationOutputShape, ReturningShape};
pub use request::{FieldRequest, RequestedField};
pub use root_field_builder::MutationField;
pub use system_builder::{
    Collaborators, FieldBuildError, MutationSchema, build_mutation_schema, build_mutation_schemas,
};
pub use update_operator_builder::UpdateOperatorKind;
