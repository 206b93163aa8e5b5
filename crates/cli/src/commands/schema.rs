// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueEnum, builder::PossibleValue};
use indexmap::IndexMap;

use super::{
    command::{
        CommandDefinition, catalog_arg, get, output_arg, permissions_arg, role_arg,
    },
    util::{build_schemas, write_output},
};

pub(crate) struct SchemaCommandDefinition {}

impl CommandDefinition for SchemaCommandDefinition {
    fn command(&self) -> Command {
        Command::new("schema")
            .about("Print the mutation schema of a role (or of every role)")
            .arg(catalog_arg())
            .arg(permissions_arg())
            .arg(role_arg())
            .arg(output_arg())
            .arg(
                Arg::new("format")
                    .long("format")
                    .short('f')
                    .value_parser(clap::builder::EnumValueParser::<SchemaFormat>::new())
                    .help("Output format. Default: graphql (sdl)")
                    .default_value("graphql"),
            )
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let schemas = build_schemas(matches)?;
        let format: SchemaFormat = get(matches, "format").unwrap_or(SchemaFormat::Graphql);

        let output = match format {
            SchemaFormat::Graphql => schemas
                .values()
                .map(|schema| format!("# role: {}\n{}", schema.role, schema.to_sdl()))
                .collect::<Vec<_>>()
                .join("\n"),
            SchemaFormat::Json => {
                let fields: IndexMap<_, _> = schemas
                    .iter()
                    .map(|(role, schema)| (role, &schema.fields))
                    .collect();
                serde_json::to_string_pretty(&fields)?
            }
        };

        write_output(matches, &output)
    }
}

#[derive(Clone, Debug)]
enum SchemaFormat {
    Json,
    Graphql,
}

impl ValueEnum for SchemaFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Graphql]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::Json => Some(PossibleValue::new("json")),
            Self::Graphql => Some(PossibleValue::new("graphql")),
        }
    }
}
