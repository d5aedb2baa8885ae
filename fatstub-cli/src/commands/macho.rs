use anyhow::anyhow;
use clap::Parser;
use cli_table::{Cell, format::Justify};
use slog::debug;
use std::path::PathBuf;

use fatstub_common::macho_file::LoadCommand;
use fatstub_common::{Arch, ArchContainer, BinaryFile, MachOFile, StdResult};

use crate::commands::render_table;
use crate::{CommandContext, ConfigParameters, DEFAULT_ARCH_PARAMETER};

/// Architecture looked for when neither `--arch` nor the `default_arch` parameter is set.
pub const FALLBACK_ARCH: &str = "arm64";

/// Show the Mach-O view of one architecture of a file
#[derive(Parser, Debug, Clone)]
pub struct MachOCommand {
    /// Path of the file to inspect
    path: PathBuf,

    /// Architecture to show, it must exactly match one of the file.
    ///
    /// When absent, the architecture of the file that best matches the configured `default_arch`
    /// is shown.
    #[clap(long)]
    arch: Option<Arch>,

    /// Enable JSON output
    #[clap(long)]
    json: bool,
}

impl MachOCommand {
    /// Main command execution
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        println!("{}", self.render(context)?);

        Ok(())
    }

    fn render(&self, context: &CommandContext) -> StdResult<String> {
        let binary_file = context.read_binary_file(&self.path)?;
        let arch = self.target_arch(&binary_file, &context.config_parameters()?)?;
        debug!(context.logger(), "Showing Mach-O file"; "arch" => arch.name());
        let macho_file = binary_file.macho_file_with_arch(&arch)?;

        if self.json {
            Ok(serde_json::to_string(&macho_file)?)
        } else {
            Self::to_table(&macho_file)
        }
    }

    fn target_arch(
        &self,
        binary_file: &BinaryFile,
        parameters: &ConfigParameters,
    ) -> StdResult<Arch> {
        if let Some(arch) = self.arch {
            return Ok(arch);
        }

        let default_arch = match parameters.get_arch(DEFAULT_ARCH_PARAMETER)? {
            Some(arch) => arch,
            None => FALLBACK_ARCH.parse()?,
        };
        binary_file
            .best_match_for_arch(&default_arch)
            .ok_or_else(|| anyhow!("File '{}' has no architecture", binary_file.filename()))
    }

    fn to_table(macho_file: &MachOFile) -> StdResult<String> {
        let header = macho_file.header();
        let mut rows = vec![
            vec!["filename".cell(), macho_file.filename().cell()],
            vec!["architecture".cell(), header.arch.name().cell()],
            vec!["filetype".cell(), header.filetype.cell()],
            vec![
                "byte order".cell(),
                format!("{:?}", header.byte_order).cell(),
            ],
            vec!["flags".cell(), format!("0x{:08x}", header.flags).cell()],
        ];
        if let Some(name) = macho_file.import_base_name() {
            rows.push(vec!["import base name".cell(), name.cell()]);
        }
        if let Some(exported) = macho_file.exported_symbols() {
            rows.push(vec!["exported names".cell(), exported.len().cell()]);
        }
        let mut output = render_table(vec!["Property".cell(), "Value".cell()], rows)?;

        let commands = macho_file
            .load_commands()
            .iter()
            .enumerate()
            .map(|(index, command)| {
                let (kind, details) = describe(command);
                vec![
                    index.cell().justify(Justify::Right),
                    kind.cell(),
                    details.cell(),
                ]
            })
            .collect();
        output.push('\n');
        output.push_str(&render_table(
            vec![
                "#".cell().justify(Justify::Right),
                "Load command".cell(),
                "Details".cell(),
            ],
            commands,
        )?);

        Ok(output)
    }
}

fn describe(command: &LoadCommand) -> (String, String) {
    match command {
        LoadCommand::Segment {
            name,
            vmaddr,
            vmsize,
            is_64,
            ..
        } => (
            if *is_64 { "segment_64" } else { "segment" }.to_string(),
            format!("{name} vmaddr 0x{vmaddr:x} vmsize 0x{vmsize:x}"),
        ),
        LoadCommand::Dylib { kind, dylib } => (
            format!("dylib ({kind})"),
            format!(
                "{} (compatibility version {}, current version {})",
                dylib.name, dylib.compatibility_version, dylib.current_version
            ),
        ),
        LoadCommand::Uuid(uuid) => ("uuid".to_string(), uuid.to_string()),
        LoadCommand::Rpath(path) => ("rpath".to_string(), path.clone()),
        LoadCommand::Unknown { cmd, cmdsize } => (format!("0x{cmd:x}"), format!("{cmdsize} bytes")),
    }
}
