//! Command line options and the offline commands of the provider binary.
//!
//! [`ProviderOptions`] are shared with hosts embedding the lifecycle, the
//! [`Command`]s only work on files and never contact the remote API.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use snafu::{ResultExt as _, Snafu};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vmss_shared::time::Duration;
use vmss_telemetry::tracing::TelemetryOptions;

use crate::{
    mapper,
    model::{OperatingSystemType, VirtualMachineScaleSet},
    operation::OperationContext,
    schema::{self, SchemaErrors},
    value::{self, Block},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read file {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse configuration tree from {path:?}"))]
    ParseConfig {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse scale set response from {path:?}"))]
    ParseResponse {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[snafu(display("configuration does not match the schema"))]
    ApplySchema { source: SchemaErrors },

    #[snafu(display("failed to read scale set name"))]
    ReadName { source: value::Error },

    #[snafu(display("failed to expand configuration"))]
    Expand { source: mapper::Error },

    #[snafu(display("failed to flatten response"))]
    Flatten { source: mapper::Error },

    #[snafu(display("failed to serialize output as JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("failed to serialize output as YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: std::io::Error },
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // IMPORTANT: All (flattened) sub structs should be placed at the end to ensure the help
    // headings are correct.
    #[command(flatten)]
    pub provider: ProviderOptions,

    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the configuration schema of a scale set as YAML.
    Schema {
        #[arg(long, default_value_t = OperatingSystemType::Linux)]
        os_type: OperatingSystemType,
    },

    /// Check a YAML configuration tree against the schema and print the
    /// request body creating it as JSON.
    Expand {
        #[arg(long, default_value_t = OperatingSystemType::Linux)]
        os_type: OperatingSystemType,

        /// The configuration tree to expand.
        file: PathBuf,
    },

    /// Turn a JSON scale set response into a configuration tree and print it
    /// as YAML.
    Flatten {
        #[arg(long, default_value_t = OperatingSystemType::Linux)]
        os_type: OperatingSystemType,

        /// The configuration tree the write-only fields are carried over from.
        #[arg(long, value_name = "FILE")]
        prior: Option<PathBuf>,

        /// The API response to flatten.
        file: PathBuf,
    },
}

impl Command {
    /// Runs the command, writing its result to `out`.
    pub fn run(&self, out: &mut impl Write) -> Result<()> {
        match self {
            Command::Schema { os_type } => {
                serde_yaml::to_writer(&mut *out, &schema::resource_schema(*os_type))
                    .context(SerializeYamlSnafu)?;
            }
            Command::Expand { os_type, file } => {
                let config = read_config(*os_type, file)?;
                let name = config.required_str("name").context(ReadNameSnafu)?;
                let body =
                    mapper::expand_scale_set(*os_type, name, &config).context(ExpandSnafu)?;

                serde_json::to_writer_pretty(&mut *out, &body).context(SerializeJsonSnafu)?;
                writeln!(out).context(WriteOutputSnafu)?;
            }
            Command::Flatten {
                os_type,
                prior,
                file,
            } => {
                let contents = read_file(file)?;
                let response: VirtualMachineScaleSet =
                    serde_json::from_str(&contents).context(ParseResponseSnafu { path: file })?;

                let prior = match prior {
                    Some(path) => parse_config(path)?,
                    None => Block::new(),
                };

                let block =
                    mapper::flatten_scale_set(*os_type, &response, &prior).context(FlattenSnafu)?;
                serde_yaml::to_writer(&mut *out, &block).context(SerializeYamlSnafu)?;
            }
        }

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(ReadFileSnafu { path })
}

fn parse_config(path: &Path) -> Result<Block> {
    serde_yaml::from_str(&read_file(path)?).context(ParseConfigSnafu { path })
}

/// Reads a configuration tree and applies the schema of `os_type` to it.
fn read_config(os_type: OperatingSystemType, path: &Path) -> Result<Block> {
    let tree = parse_config(path)?;
    debug!(path = %path.display(), fields = tree.len(), "read configuration tree");

    schema::apply(&schema::resource_schema(os_type), &tree).context(ApplySchemaSnafu)
}

/// Options controlling how the provider talks to the remote API.
#[derive(Clone, Debug, PartialEq, Eq, Args)]
#[command(next_help_heading = "Provider Options")]
pub struct ProviderOptions {
    /// Don't check whether a scale set with the same name already exists before creating it.
    ///
    /// WARNING: Without the check, an existing scale set is silently taken over and overwritten
    /// instead of having to be imported.
    #[arg(long, env)]
    pub disable_import_existing_check: bool,

    /// Interval in which the status of long-running operations is polled.
    #[arg(long, env, value_name = "DURATION", default_value = "10s")]
    pub poll_interval: Duration,

    /// Maximum DURATION a single create, update or delete may take.
    #[arg(long, env, value_name = "DURATION", default_value = "1h")]
    pub operation_timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            disable_import_existing_check: false,
            poll_interval: Duration::from_secs(10),
            operation_timeout: Duration::from_minutes_unchecked(60),
        }
    }
}

impl ProviderOptions {
    /// Builds the context of one lifecycle invocation. The deadline starts
    /// now.
    pub fn operation_context(&self, cancellation: CancellationToken) -> OperationContext {
        OperationContext::new(cancellation)
            .with_poll_interval(*self.poll_interval)
            .with_timeout(*self.operation_timeout)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use indoc::indoc;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::{mapper::tests::linux_config, value::Value};

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn provider_option_defaults() {
        let cli = Cli::parse_from(["vmss-provider", "schema"]);

        assert_eq!(cli.provider, ProviderOptions::default());
        assert_eq!(cli.command, Command::Schema {
            os_type: OperatingSystemType::Linux
        });
    }

    #[rstest]
    #[case("windows", OperatingSystemType::Windows)]
    #[case("Windows", OperatingSystemType::Windows)]
    #[case("linux", OperatingSystemType::Linux)]
    fn parse_os_type(#[case] input: &str, #[case] expected: OperatingSystemType) {
        let cli = Cli::parse_from([
            "vmss-provider",
            "--poll-interval",
            "30s",
            "schema",
            "--os-type",
            input,
        ]);

        assert_eq!(cli.provider.poll_interval, Duration::from_secs(30));
        assert_eq!(cli.command, Command::Schema { os_type: expected });
    }

    #[test]
    fn print_schema() {
        let mut out = Vec::new();
        Command::Schema {
            os_type: OperatingSystemType::Windows,
        }
        .run(&mut out)
        .unwrap();

        let schema: serde_yaml::Value = serde_yaml::from_slice(&out).unwrap();
        assert!(schema.get("timezone").is_some());
        assert!(schema.get("admin_ssh_key").is_none());
    }

    #[test]
    fn expand_and_flatten_files() {
        let config = temp_file(&serde_yaml::to_string(&linux_config()).unwrap());

        let mut body = Vec::new();
        Command::Expand {
            os_type: OperatingSystemType::Linux,
            file: config.path().to_owned(),
        }
        .run(&mut body)
        .unwrap();

        let mut response: serde_json::Value = serde_json::from_slice(&body).unwrap();
        response["id"] = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Compute/virtualMachineScaleSets/example-vmss".into();
        let response = temp_file(&response.to_string());

        let mut out = Vec::new();
        Command::Flatten {
            os_type: OperatingSystemType::Linux,
            prior: Some(config.path().to_owned()),
            file: response.path().to_owned(),
        }
        .run(&mut out)
        .unwrap();

        let block: Block = serde_yaml::from_slice(&out).unwrap();
        assert_eq!(block.get("name"), Some(&Value::from("example-vmss")));
        assert_eq!(block.get("sku"), Some(&Value::from("Standard_F2")));
        assert_eq!(
            block.get("admin_password"),
            Some(&Value::from("P@ssw0rd1234!"))
        );
    }

    #[test]
    fn expand_rejects_invalid_configuration() {
        let config = temp_file(indoc! {"
            name: example-vmss
            instances: -1
        "});

        let err = Command::Expand {
            os_type: OperatingSystemType::Linux,
            file: config.path().to_owned(),
        }
        .run(&mut Vec::new())
        .unwrap_err();

        let Error::ApplySchema { source } = err else {
            panic!("expected schema errors, got {err:?}");
        };
        assert!(source.iter().any(|error| error.path().to_string() == "instances"));
    }

    #[test]
    fn missing_file() {
        let err = Command::Expand {
            os_type: OperatingSystemType::Linux,
            file: PathBuf::from("/does/not/exist.yaml"),
        }
        .run(&mut Vec::new())
        .unwrap_err();

        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
