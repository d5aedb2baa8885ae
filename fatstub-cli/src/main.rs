#![doc = include_str!("../README.md")]

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{Map, Source, Value, ValueKind};
use slog::{Drain, Fuse, Level, Logger, debug};
use slog_term::Decorator;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fatstub_common::{Arch, BinaryFileLoader, StdResult};

use fatstub_cli::commands::{ArchsCommand, InfoCommand, MachOCommand, stub::StubCommands};
use fatstub_cli::{CommandContext, DEFAULT_ARCH_PARAMETER};

enum LogOutputType {
    StdErr,
    File(String),
}

impl LogOutputType {
    fn get_writer(&self) -> StdResult<Box<dyn Write + Send>> {
        let writer: Box<dyn Write + Send> = match self {
            LogOutputType::StdErr => Box::new(std::io::stderr()),
            LogOutputType::File(filepath) => Box::new(
                File::create(filepath)
                    .with_context(|| format!("Can not create output log file: {filepath}"))?,
            ),
        };

        Ok(writer)
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(name = "fatstub")]
#[clap(
    about = "This program inspects fat, Mach-O and text-based stub files.",
    long_about = None
)]
#[command(version)]
pub struct Args {
    /// Available commands
    #[clap(subcommand)]
    command: FileCommands,

    /// Run Mode.
    #[clap(long, env = "RUN_MODE", default_value = "dev")]
    run_mode: String,

    /// Verbosity level (-v=warning, -vv=info, -vvv=debug).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory where configuration file is located.
    #[clap(long, default_value = "./config")]
    pub config_directory: PathBuf,

    /// Override the configured architecture used when `--arch` is not given.
    #[clap(long, env = "DEFAULT_ARCH")]
    default_arch: Option<Arch>,

    /// Enable JSON output for logs displayed according to verbosity level
    #[clap(long)]
    log_format_json: bool,

    /// Redirect the logs to a file
    #[clap(long, alias("o"))]
    log_output: Option<String>,
}

impl Args {
    pub fn execute(&self, root_logger: Logger) -> StdResult<()> {
        debug!(
            root_logger,
            "fatstub CLI version: {}",
            env!("CARGO_PKG_VERSION")
        );
        debug!(root_logger, "Run Mode: {}", self.run_mode);
        let filename = format!("{}/{}.json", self.config_directory.display(), self.run_mode);
        debug!(root_logger, "Reading configuration file '{filename}'.");
        let config = config::Config::builder()
            .add_source(config::File::with_name(&filename).required(false))
            .add_source(config::Environment::with_prefix("FATSTUB"))
            .add_source(self.clone());
        let reader = Arc::new(BinaryFileLoader::new(root_logger.clone()));
        let context = CommandContext::new(config, reader, root_logger);

        self.command.execute(&context)
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::Error,
            1 => Level::Warning,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    fn get_log_output_type(&self) -> LogOutputType {
        if let Some(output_filepath) = &self.log_output {
            LogOutputType::File(output_filepath.to_string())
        } else {
            LogOutputType::StdErr
        }
    }

    fn wrap_drain<D: Decorator + Send + 'static>(&self, decorator: D) -> Fuse<slog_async::Async> {
        let drain = slog_term::CompactFormat::new(decorator).build().fuse();
        let drain = slog::LevelFilter::new(drain, self.log_level()).fuse();

        slog_async::Async::new(drain).build().fuse()
    }

    fn build_logger(&self) -> StdResult<Logger> {
        let log_output_type = self.get_log_output_type();
        let writer = log_output_type.get_writer()?;

        let drain = if self.log_format_json {
            let drain = slog_bunyan::with_name("fatstub", writer)
                .set_pretty(false)
                .build()
                .fuse();
            let drain = slog::LevelFilter::new(drain, self.log_level()).fuse();

            slog_async::Async::new(drain).build().fuse()
        } else {
            match log_output_type {
                LogOutputType::StdErr => self.wrap_drain(slog_term::TermDecorator::new().build()),
                LogOutputType::File(_) => self.wrap_drain(slog_term::PlainDecorator::new(writer)),
            }
        };

        Ok(Logger::root(Arc::new(drain), slog::o!()))
    }
}

impl Source for Args {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        let mut map = Map::new();
        let namespace = "clap arguments".to_string();

        if let Some(default_arch) = self.default_arch {
            map.insert(
                DEFAULT_ARCH_PARAMETER.to_string(),
                Value::new(Some(&namespace), ValueKind::from(default_arch.name())),
            );
        }

        Ok(map)
    }
}

#[derive(Subcommand, Debug, Clone)]
enum FileCommands {
    /// Show the kind, architectures and main properties of a file
    Info(InfoCommand),

    /// List the architectures of a file
    Archs(ArchsCommand),

    /// Show the Mach-O view of one architecture of a file
    #[clap(alias("mach-o"))]
    Macho(MachOCommand),

    /// Text-based stub files inspection
    #[clap(subcommand)]
    Stub(StubCommands),
}

impl FileCommands {
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        match self {
            Self::Info(cmd) => cmd.execute(context),
            Self::Archs(cmd) => cmd.execute(context),
            Self::Macho(cmd) => cmd.execute(context),
            Self::Stub(cmd) => cmd.execute(context),
        }
    }
}

fn main() -> StdResult<()> {
    let args = Args::parse();
    let logger = args.build_logger()?;

    args.execute(logger)
}

#[cfg(test)]
mod tests {
    use fatstub_common::test_utils::TempDir;
    use fatstub_common::test_utils::tbd_samples::TBD_V4_APPKIT;

    use super::*;

    fn discard_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn default_arch_argument_is_a_configuration_source() {
        let args = Args::try_parse_from([
            "fatstub",
            "--default-arch",
            "arm64e",
            "archs",
            "libfoo.dylib",
        ])
        .unwrap();

        let map = args.collect().unwrap();

        assert_eq!(
            Some("arm64e".to_string()),
            map.get(DEFAULT_ARCH_PARAMETER)
                .map(|value| value.clone().into_string().unwrap())
        );
    }

    #[test]
    fn unknown_default_arch_argument_is_rejected() {
        Args::try_parse_from(["fatstub", "--default-arch", "sparc", "archs", "libfoo"])
            .expect_err("sparc is not an architecture");
    }

    #[test]
    fn execute_a_command_on_a_file() {
        let directory = TempDir::create("fatstub_cli", "execute_a_command_on_a_file");
        let path = directory.join("AppKit.tbd");
        std::fs::write(&path, TBD_V4_APPKIT).unwrap();
        let path = path.to_string_lossy().to_string();
        let config_directory = directory.to_string_lossy().to_string();

        let args = Args::try_parse_from([
            "fatstub",
            "--config-directory",
            config_directory.as_str(),
            "macho",
            path.as_str(),
            "--json",
        ])
        .unwrap();

        args.execute(discard_logger()).unwrap();
    }

    #[test]
    fn execute_fails_on_a_missing_file() {
        let directory = TempDir::create("fatstub_cli", "execute_fails_on_a_missing_file");
        let path = directory.join("missing.tbd").to_string_lossy().to_string();

        let args = Args::try_parse_from(["fatstub", "stub", "data", path.as_str()]).unwrap();

        let error = args.execute(discard_logger()).unwrap_err();

        assert!(
            error.to_string().contains("Could not read file"),
            "error: {error}"
        );
    }
}
