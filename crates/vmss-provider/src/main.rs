use std::io;

use clap::Parser;
use snafu::{ResultExt, Snafu};
use tracing::debug;
use vmss_provider::cli::{self, Cli};
use vmss_telemetry::Tracing;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize tracing"))]
    InitTracing {
        source: vmss_telemetry::tracing::Error,
    },

    #[snafu(display("failed to run command"))]
    Run { source: cli::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let Cli {
        command,
        provider,
        telemetry,
    } = Cli::parse();

    let _tracing_guard = Tracing::pre_configured(env!("CARGO_PKG_NAME"), telemetry)
        .init()
        .context(InitTracingSnafu)?;
    debug!(?provider, "starting");

    command.run(&mut io::stdout().lock()).context(RunSnafu)
}
