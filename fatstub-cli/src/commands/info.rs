use clap::Parser;
use cli_table::{Cell, format::Justify};
use serde::Serialize;
use slog::debug;
use std::path::PathBuf;

use fatstub_common::{ArchContainer, BinaryFile, FatArch, StdResult};

use crate::CommandContext;
use crate::commands::render_table;

/// Show the kind, architectures and main properties of a file
#[derive(Parser, Debug, Clone)]
pub struct InfoCommand {
    /// Path of the file to inspect
    path: PathBuf,

    /// Enable JSON output
    #[clap(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    filename: String,
    kind: &'static str,
    arches: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    slices: Vec<FatArch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    properties: Vec<(&'static str, String)>,
}

impl FileInfo {
    fn new(binary_file: &BinaryFile) -> Self {
        let (slices, properties) = match binary_file {
            BinaryFile::Fat(fat_file) => (fat_file.fat_arches().to_vec(), vec![]),
            BinaryFile::MachO(macho_file) => {
                let mut properties = vec![("filetype", macho_file.filetype().to_string())];
                if let Some(install_name) = macho_file.install_name() {
                    properties.push(("install name", install_name.to_string()));
                }
                if let Some(uuid) = macho_file.uuid() {
                    properties.push(("uuid", uuid.to_string()));
                }
                (vec![], properties)
            }
            BinaryFile::Stub(stub_file) => {
                let mut properties = vec![
                    ("format", stub_file.version().to_string()),
                    ("install name", stub_file.install_name().to_string()),
                    ("import base name", stub_file.import_base_name()),
                    ("current version", stub_file.current_version().to_string()),
                    (
                        "compatibility version",
                        stub_file.compatibility_version().to_string(),
                    ),
                ];
                if let Some(platform) = stub_file.platform() {
                    properties.push(("platform", platform.to_string()));
                }
                if !stub_file.inlined_libraries().is_empty() {
                    properties.push((
                        "inlined libraries",
                        stub_file
                            .inlined_libraries()
                            .iter()
                            .map(|library| library.install_name.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    ));
                }
                (vec![], properties)
            }
        };

        Self {
            filename: binary_file.filename().to_string(),
            kind: binary_file.kind(),
            arches: binary_file.arch_names(),
            slices,
            properties,
        }
    }

    fn to_table(&self) -> StdResult<String> {
        let mut rows = vec![
            vec!["filename".cell(), self.filename.clone().cell()],
            vec!["kind".cell(), self.kind.cell()],
            vec!["architectures".cell(), self.arches.join(", ").cell()],
        ];
        for (name, value) in &self.properties {
            rows.push(vec![name.cell(), value.clone().cell()]);
        }
        let mut output = render_table(vec!["Property".cell(), "Value".cell()], rows)?;

        if !self.slices.is_empty() {
            let slices = self
                .slices
                .iter()
                .map(|slice| {
                    vec![
                        slice.arch.name().cell(),
                        slice.offset.cell().justify(Justify::Right),
                        slice.size.cell().justify(Justify::Right),
                        format!("2^{}", slice.align).cell().justify(Justify::Right),
                    ]
                })
                .collect();
            output.push('\n');
            output.push_str(&render_table(
                vec![
                    "Architecture".cell(),
                    "Offset".cell().justify(Justify::Right),
                    "Size".cell().justify(Justify::Right),
                    "Align".cell().justify(Justify::Right),
                ],
                slices,
            )?);
        }

        Ok(output)
    }
}

impl InfoCommand {
    /// Main command execution
    pub fn execute(&self, context: &CommandContext) -> StdResult<()> {
        println!("{}", self.render(context)?);

        Ok(())
    }

    fn render(&self, context: &CommandContext) -> StdResult<String> {
        let binary_file = context.read_binary_file(&self.path)?;
        debug!(context.logger(), "Showing file information"; "kind" => binary_file.kind());
        let info = FileInfo::new(&binary_file);

        if self.json {
            Ok(serde_json::to_string(&info)?)
        } else {
            info.to_table()
        }
    }
}

#[cfg(test)]
mod tests {
    use fatstub_common::Arch;
    use fatstub_common::macho_file::{DylibKind, MachOFileType};
    use fatstub_common::test_utils::tbd_samples::TBD_V3_LIBOBJC;
    use fatstub_common::test_utils::{FatBuilder, MachOBuilder};

    use super::*;
    use crate::commands::test_utils::{context_reading, load};

    fn arch(name: &str) -> Arch {
        Arch::from_name(name).unwrap()
    }

    fn command(path: &str, json: bool) -> InfoCommand {
        InfoCommand {
            path: PathBuf::from(path),
            json,
        }
    }

    #[test]
    fn fat_file_info_lists_the_slices() {
        let data = FatBuilder::new()
            .with_slice(
                arch("x86_64"),
                MachOBuilder::new(arch("x86_64"), MachOFileType::Execute).build(),
            )
            .with_slice(
                arch("arm64"),
                MachOBuilder::new(arch("arm64"), MachOFileType::Execute).build(),
            )
            .build();
        let context = context_reading("/bin/tool", load(&data, "/bin/tool"), &[]);

        let output = command("/bin/tool", false).render(&context).unwrap();

        assert!(output.contains("fat"), "output:\n{output}");
        assert!(output.contains("x86_64, arm64"), "output:\n{output}");
        assert!(output.contains("2^12"), "output:\n{output}");
    }

    #[test]
    fn macho_file_info_as_json() {
        let data = MachOBuilder::new(arch("arm64"), MachOFileType::Dylib)
            .with_dylib(DylibKind::Id, "/usr/lib/libfoo.dylib")
            .with_uuid([0xab; 16])
            .build();
        let context = context_reading("libfoo.dylib", load(&data, "libfoo.dylib"), &[]);

        let output = command("libfoo.dylib", true).render(&context).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!("mach-o", json["kind"]);
        assert_eq!(serde_json::json!(["arm64"]), json["arches"]);
        assert_eq!(
            serde_json::json!(["install name", "/usr/lib/libfoo.dylib"]),
            json["properties"][1]
        );
        assert!(json.get("slices").is_none());
    }

    #[test]
    fn stub_file_info_shows_the_library() {
        let context = context_reading(
            "libobjc.tbd",
            load(TBD_V3_LIBOBJC.as_bytes(), "libobjc.tbd"),
            &[],
        );

        let output = command("libobjc.tbd", false).render(&context).unwrap();

        assert!(
            output.contains("/usr/lib/libobjc.A.dylib"),
            "output:\n{output}"
        );
        assert!(output.contains("v3"), "output:\n{output}");
        assert!(output.contains("objc"), "output:\n{output}");
        assert!(
            output.contains("/usr/lib/system/libdyld.dylib"),
            "output:\n{output}"
        );
    }
}
