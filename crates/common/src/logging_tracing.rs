// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! # Tracing configuration setup.
//!
//! The builders are instrumented with Rust's `tracing` framework. Library code only emits events;
//! binaries call [`init`] once to install a subscriber.
//!
//! The filter follows the value of the `EXO_LOG` environment variable, which uses the same
//! conventions as `RUST_LOG` (for example `EXO_LOG=mutation_builder=debug`). Without it, only
//! warnings and errors are printed.

use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};

const EXO_LOG: &str = "EXO_LOG";

#[derive(Debug, thiserror::Error)]
#[error("Unable to initialize tracing: {0}")]
pub struct TracingInitError(String);

/// Initialize the global tracing subscriber with a compact console layer.
pub fn init() -> Result<(), TracingInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(EXO_LOG)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TracingInitError(e.to_string()))
}
