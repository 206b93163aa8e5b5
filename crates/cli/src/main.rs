// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use anyhow::Result;
use common::logging_tracing;

use commands::{
    command::{CommandDefinition, SubcommandDefinition},
    lower::LowerCommandDefinition,
    schema::SchemaCommandDefinition,
};

mod commands;
mod request;

fn main() -> Result<()> {
    logging_tracing::init()?;

    let subcommand_definition = SubcommandDefinition::new(
        "mutation-schema",
        "Inspect the mutation schema of a role and the IR its requests lower to",
        vec![
            Box::new(SchemaCommandDefinition {}),
            Box::new(LowerCommandDefinition {}),
        ],
    );

    let command = subcommand_definition
        .command()
        .version(env!("CARGO_PKG_VERSION"));

    let matches = command.get_matches();

    subcommand_definition.execute(&matches)
}
