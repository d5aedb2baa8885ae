//! Commands for text-based stub files
mod data;
mod symbols;

pub use data::*;
pub use symbols::*;

use anyhow::anyhow;
use clap::Subcommand;
use std::path::Path;

use fatstub_common::{BinaryFile, StdResult, StubFile};

use crate::CommandContext;

/// Text-based stub files inspection
#[derive(Subcommand, Debug, Clone)]
pub enum StubCommands {
    /// Dump the raw top-level fields of a stub file
    #[clap(arg_required_else_help = true)]
    Data(StubDataCommand),

    /// List the names a stub file exports for an architecture
    #[clap(arg_required_else_help = true)]
    Symbols(StubSymbolsCommand),
}

impl StubCommands {
    /// Execute stub file command
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        match self {
            Self::Data(cmd) => cmd.execute(context),
            Self::Symbols(cmd) => cmd.execute(context),
        }
    }
}

fn read_stub_file(context: &CommandContext, path: &Path) -> StdResult<StubFile> {
    match context.read_binary_file(path)? {
        BinaryFile::Stub(stub_file) => Ok(stub_file),
        other => Err(anyhow!(
            "'{}' is not a stub file but a {} file",
            path.display(),
            other.kind()
        )),
    }
}
