use clap::Parser;
use std::path::PathBuf;

use fatstub_common::{ArchContainer, StdResult};

use crate::CommandContext;

/// List the architectures of a file, one per line
#[derive(Parser, Debug, Clone)]
pub struct ArchsCommand {
    /// Path of the file to inspect
    path: PathBuf,
}

impl ArchsCommand {
    /// Main command execution
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        println!("{}", self.render(context)?);

        Ok(())
    }

    fn render(&self, context: &CommandContext) -> StdResult<String> {
        let binary_file = context.read_binary_file(&self.path)?;

        Ok(binary_file.arch_names().join("\n"))
    }
}
