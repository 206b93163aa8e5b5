// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Arg, ArgGroup, ArgMatches, Command};
use colored::Colorize;
use indexmap::IndexMap;
use tracing::debug;

use super::{
    command::{CommandDefinition, catalog_arg, get, get_required, output_arg, permissions_arg},
    util::{build_schemas, write_output},
};
use crate::request::parse_mutation;

pub(crate) struct LowerCommandDefinition {}

impl CommandDefinition for LowerCommandDefinition {
    fn command(&self) -> Command {
        Command::new("lower")
            .about("Resolve a mutation request into its annotated form (JSON)")
            .arg(catalog_arg())
            .arg(permissions_arg())
            .arg(
                Arg::new("role")
                    .help("The role making the request")
                    .long("role")
                    .short('r')
                    .required(true)
                    .num_args(1),
            )
            .arg(
                Arg::new("query")
                    .help("The mutation document")
                    .long("query")
                    .short('q')
                    .num_args(1),
            )
            .arg(
                Arg::new("query-file")
                    .help("A file containing the mutation document")
                    .long("query-file")
                    .value_parser(clap::value_parser!(PathBuf))
                    .num_args(1),
            )
            .group(
                ArgGroup::new("request")
                    .args(["query", "query-file"])
                    .required(true),
            )
            .arg(
                Arg::new("variables")
                    .help("Variables for the mutation document (a JSON object)")
                    .long("variables")
                    .num_args(1),
            )
            .arg(output_arg())
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let role: String = get_required(matches, "role")?;

        let query = match get::<PathBuf>(matches, "query-file") {
            Some(path) => fs::read_to_string(&path)
                .with_context(|| format!("Unable to read {}", path.display()))?,
            None => get_required(matches, "query")?,
        };

        let variables = match get::<String>(matches, "variables") {
            Some(variables) => match serde_json::from_str(&variables)? {
                serde_json::Value::Object(variables) => variables,
                _ => bail!("Variables must be a JSON object"),
            },
            None => serde_json::Map::new(),
        };

        let schemas = build_schemas(matches)?;
        let schema = schemas
            .get(&role)
            .ok_or_else(|| anyhow!("Role '{role}' not found"))?;

        let requests = parse_mutation(&query, &variables)?;

        let mut lowered = IndexMap::new();
        let mut failures = 0;

        for request in &requests {
            match schema.lower(request) {
                Ok(mutation) => {
                    debug!(field = %request.name, kind = mutation.kind_name(), "Lowered");
                    lowered.insert(request.output_name().to_string(), mutation);
                }
                Err(errors) => {
                    for error in errors.errors() {
                        eprintln!("{} {error}", "error:".red());
                    }
                    failures += errors.errors().len();
                }
            }
        }

        if failures > 0 {
            bail!("The request has {failures} invalid argument(s)");
        }

        write_output(matches, &serde_json::to_string_pretty(&lowered)?)
    }
}
