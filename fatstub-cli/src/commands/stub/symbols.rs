use clap::Parser;
use cli_table::Cell;
use std::collections::BTreeSet;
use std::path::PathBuf;

use fatstub_common::macho_file::ExportedSymbols;
use fatstub_common::{Arch, StdResult};

use super::read_stub_file;
use crate::CommandContext;
use crate::commands::render_table;

/// Stub file SYMBOLS command
#[derive(Parser, Debug, Clone)]
pub struct StubSymbolsCommand {
    /// Path of the stub file
    path: PathBuf,

    /// Architecture the names are exported for
    #[clap(long)]
    arch: Arch,

    /// Enable JSON output
    #[clap(long)]
    json: bool,
}

impl StubSymbolsCommand {
    /// Main command execution
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        println!("{}", self.render(context)?);

        Ok(())
    }

    fn render(&self, context: &CommandContext) -> StdResult<String> {
        let stub_file = read_stub_file(context, &self.path)?;
        let macho_file = stub_file.macho_file_with_arch(&self.arch)?;
        let exported = macho_file.exported_symbols().cloned().unwrap_or_default();

        if self.json {
            Ok(serde_json::to_string(&exported)?)
        } else {
            render_table(vec!["Kind".cell(), "Name".cell()], rows(&exported))
        }
    }
}

fn rows(exported: &ExportedSymbols) -> Vec<Vec<cli_table::CellStruct>> {
    let sections: [(&str, &BTreeSet<String>); 6] = [
        ("symbol", &exported.symbols),
        ("weak", &exported.weak_symbols),
        ("thread-local", &exported.thread_local_symbols),
        ("objc-class", &exported.objc_classes),
        ("objc-eh-type", &exported.objc_eh_types),
        ("objc-ivar", &exported.objc_ivars),
    ];

    sections
        .into_iter()
        .flat_map(|(kind, names)| names.iter().map(move |name| vec![kind.cell(), name.cell()]))
        .collect()
}
