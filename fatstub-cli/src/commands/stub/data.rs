use clap::Parser;
use std::path::PathBuf;

use fatstub_common::StdResult;

use super::read_stub_file;
use crate::CommandContext;

/// Stub file DATA command
#[derive(Parser, Debug, Clone)]
pub struct StubDataCommand {
    /// Path of the stub file
    path: PathBuf,

    /// Enable JSON output, YAML is used otherwise
    #[clap(long)]
    json: bool,
}

impl StubDataCommand {
    /// Main command execution
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        println!("{}", self.render(context)?);

        Ok(())
    }

    fn render(&self, context: &CommandContext) -> StdResult<String> {
        let stub_file = read_stub_file(context, &self.path)?;

        if self.json {
            Ok(serde_json::to_string(stub_file.stubbed_data())?)
        } else {
            Ok(serde_yaml::to_string(stub_file.stubbed_data())?)
        }
    }
}
