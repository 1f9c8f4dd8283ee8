//! Subscriber setup for the provider binary.
//!
//! Logs go to stderr, so commands can keep stdout for their output, and
//! optionally to rolling JSON files. See [`Tracing`].

use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender { source: InitError },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

/// Holds the configured log outputs.
///
/// The subscribers stay installed for the lifetime of the process once
/// [`Tracing::init`] succeeded. Keep the returned guard in a named variable
/// (not `let _ = ..`) until `main` returns.
///
/// ```no_run
/// use vmss_telemetry::tracing::{Error, TelemetryOptions, Tracing};
///
/// fn main() -> Result<(), Error> {
///     let _tracing_guard =
///         Tracing::pre_configured("vmss-provider", TelemetryOptions::default()).init()?;
///
///     tracing::info!("ready");
///     Ok(())
/// }
/// ```
///
/// The level filters can be overridden with `CONSOLE_LOG_LEVEL` and
/// `FILE_LOG_LEVEL`, using the `RUST_LOG` directive syntax.
#[derive(Debug, PartialEq, Eq)]
pub struct Tracing {
    service_name: &'static str,
    console: Option<ConsoleLog>,
    file: Option<FileLog>,
}

#[derive(Debug, PartialEq, Eq)]
struct ConsoleLog {
    default_level: LevelFilter,
    format: Format,
}

#[derive(Debug, PartialEq, Eq)]
struct FileLog {
    default_level: LevelFilter,
    directory: PathBuf,
    rotation_period: RotationPeriod,
    max_files: Option<usize>,
}

impl Tracing {
    pub const CONSOLE_LOG_LEVEL: &str = "CONSOLE_LOG_LEVEL";
    pub const FILE_LOG_LEVEL: &str = "FILE_LOG_LEVEL";

    /// Appended to the service name to form the log file names.
    pub const FILE_LOG_SUFFIX: &str = "provider.json";

    /// Console logs are on unless disabled, file logs only when a directory
    /// is given. Both default to INFO.
    pub fn pre_configured(service_name: &'static str, options: TelemetryOptions) -> Self {
        let TelemetryOptions {
            console_log_disabled,
            console_log_format,
            file_log_directory,
            file_log_rotation_period,
            file_log_max_files,
        } = options;

        Self {
            service_name,
            console: (!console_log_disabled).then(|| ConsoleLog {
                default_level: LevelFilter::INFO,
                format: console_log_format.unwrap_or_default(),
            }),
            file: file_log_directory.map(|directory| FileLog {
                default_level: LevelFilter::INFO,
                directory,
                rotation_period: file_log_rotation_period.unwrap_or_default(),
                max_files: file_log_max_files,
            }),
        }
    }

    /// Installs the configured subscribers as the global default.
    pub fn init(self) -> Result<Self> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if let Some(console) = &self.console {
            let filter = env_filter(Self::CONSOLE_LOG_LEVEL, console.default_level);
            let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

            layers.push(match console.format {
                Format::Plain => layer.with_filter(filter).boxed(),
                Format::Json => layer.json().with_filter(filter).boxed(),
            });
        }

        if let Some(file) = &self.file {
            let mut appender = RollingFileAppender::builder()
                .rotation(file.rotation_period.into())
                .filename_prefix(self.service_name)
                .filename_suffix(Self::FILE_LOG_SUFFIX);
            if let Some(max_files) = file.max_files {
                appender = appender.max_log_files(max_files);
            }
            let appender = appender
                .build(&file.directory)
                .context(InitRollingFileAppenderSnafu)?;

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(appender)
                    .with_filter(env_filter(Self::FILE_LOG_LEVEL, file.default_level))
                    .boxed(),
            );
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        Ok(self)
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }
}

impl Drop for Tracing {
    fn drop(&mut self) {
        tracing::debug!(
            console.enabled = self.console.is_some(),
            file.enabled = self.file.is_some(),
            "shutting down tracing subscribers"
        );
    }
}

fn env_filter(env_var: &str, default_level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env_var)
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Logging options of the binary, flattened into its CLI when the `clap`
/// feature is enabled.
#[cfg_attr(feature = "clap", derive(clap::Args, PartialEq, Eq))]
#[cfg_attr(feature = "clap", command(next_help_heading = "Logging Options"))]
#[derive(Debug, Default)]
pub struct TelemetryOptions {
    /// Disable console logs.
    #[cfg_attr(feature = "clap", arg(long, env))]
    pub console_log_disabled: bool,

    /// Output FORMAT of the console logs.
    #[cfg_attr(feature = "clap", arg(long, env, value_name = "FORMAT"))]
    pub console_log_format: Option<Format>,

    /// Enable logging to files located in the specified DIRECTORY.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "DIRECTORY", group = "file_log")
    )]
    pub file_log_directory: Option<PathBuf>,

    /// Time PERIOD after which log files are rolled over.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "PERIOD", requires = "file_log")
    )]
    pub file_log_rotation_period: Option<RotationPeriod>,

    /// Maximum NUMBER of rolled log files to keep.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "NUMBER", requires = "file_log")
    )]
    pub file_log_max_files: Option<usize>,
}

/// Console log event formats.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    /// Plain text. Colors can be disabled with `NO_COLOR`.
    #[default]
    Plain,

    /// One JSON object per event, including the fields of all parent spans.
    Json,
}

#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "PascalCase")]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn default_options_log_to_console() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions::default());

        assert_eq!(tracing.service_name(), "test");
        assert_eq!(
            tracing.console,
            Some(ConsoleLog {
                default_level: LevelFilter::INFO,
                format: Format::Plain,
            })
        );
        assert_eq!(tracing.file, None);
    }

    #[test]
    fn file_options() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions {
            console_log_disabled: true,
            console_log_format: Some(Format::Json),
            file_log_directory: Some(PathBuf::from("/logs")),
            file_log_rotation_period: Some(RotationPeriod::Daily),
            file_log_max_files: Some(3),
        });

        assert_eq!(tracing.console, None);
        assert_eq!(
            tracing.file,
            Some(FileLog {
                default_level: LevelFilter::INFO,
                directory: PathBuf::from("/logs"),
                rotation_period: RotationPeriod::Daily,
                max_files: Some(3),
            })
        );
    }

    #[test]
    fn init_without_outputs() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions {
            console_log_disabled: true,
            ..Default::default()
        });

        assert!(tracing.init().is_ok());
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");

        // The global subscriber may already be taken by another test
        let _ = Tracing::pre_configured("test", TelemetryOptions {
            console_log_disabled: true,
            file_log_directory: Some(log_dir.clone()),
            ..Default::default()
        })
        .init();

        assert!(log_dir.is_dir());
    }

    #[rstest]
    #[case("Hourly", RotationPeriod::Hourly)]
    #[case("Never", RotationPeriod::Never)]
    fn parse_rotation_period(#[case] input: &str, #[case] expected: RotationPeriod) {
        assert_eq!(input.parse::<RotationPeriod>().unwrap(), expected);
    }

    #[test]
    fn parse_format() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(Format::Plain.to_string(), "plain");
    }
}
