// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use common::env::SystemEnvironment;
use mutation_builder::{
    Collaborators, MutationSchema, build_mutation_schema, build_mutation_schemas,
    config::MutationSchemaConfig,
};
use mutation_model::{
    catalog::{Catalog, Table},
    permission::RolePermissions,
};

use super::command::{get, get_required};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Unable to open {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("Unable to parse {}", path.display()))
}

/// Build the mutation schemas of the requested role (or of every role) from the files given on the
/// command line
pub(super) fn build_schemas(matches: &ArgMatches) -> Result<IndexMap<String, MutationSchema>> {
    let catalog_path: PathBuf = get_required(matches, "catalog")?;
    let permissions_path: PathBuf = get_required(matches, "permissions")?;
    let role: Option<String> = get(matches, "role");

    let tables: Vec<Table> = read_json(&catalog_path)?;
    let catalog = Arc::new(Catalog::new(tables));
    let roles: Vec<RolePermissions> = read_json(&permissions_path)?;

    let config = MutationSchemaConfig::from_env(&SystemEnvironment)?;
    let collaborators = Collaborators::column_based(config.naming);

    let schemas = match role {
        Some(role) => {
            let permissions = roles
                .iter()
                .find(|permissions| permissions.role == role)
                .ok_or_else(|| anyhow!("Role '{role}' not found in {}", permissions_path.display()))?;
            let schema = build_mutation_schema(catalog, permissions, &config, collaborators);
            IndexMap::from([(schema.role.clone(), schema)])
        }
        None => build_mutation_schemas(catalog, &roles, &config, &collaborators),
    };

    for schema in schemas.values() {
        for error in &schema.build_errors {
            eprintln!("{} {}: {error}", "warning:".yellow(), schema.role);
        }
    }

    Ok(schemas)
}

/// Write to the `output` file if one was given, otherwise to stdout
pub(super) fn write_output(matches: &ArgMatches, content: &str) -> Result<()> {
    match get::<PathBuf>(matches, "output") {
        Some(output) => {
            if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            File::create(&output)?.write_all(content.as_bytes())?;
        }
        None => println!("{content}"),
    }

    Ok(())
}
