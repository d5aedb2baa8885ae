//! Thin Mach-O files: a header followed by load commands.

mod exported_symbols;
mod header;
mod load_command;

pub use exported_symbols::ExportedSymbols;
pub use header::{MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64, MachOFileType, MachOHeader};
pub use load_command::{DylibKind, DylibReference, LoadCommand, Uuid, cmd};

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::Arch;
use crate::byte_order::ByteOrder;

/// [MachOFile] decoding errors.
#[derive(Error, Debug)]
pub enum MachOFileError {
    /// Raised when the data does not start with a Mach-O magic number.
    #[error("Not a Mach-O file, unexpected magic 0x{0:08x}")]
    InvalidMagic(u32),

    /// Raised when the data ends before a structure is complete.
    #[error("Mach-O data is truncated while reading the {0}")]
    Truncated(&'static str),

    /// Raised when a load command is inconsistent with its size or the file size.
    #[error("Malformed load command #{index}: {reason}")]
    MalformedLoadCommand {
        /// Position of the command.
        index: u32,
        /// What is wrong with it.
        reason: String,
    },
}

pub(crate) fn truncated<E>(what: &'static str) -> impl Fn(nom::Err<E>) -> MachOFileError {
    move |_| MachOFileError::Truncated(what)
}

/// A decoded single architecture Mach-O file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachOFile {
    filename: String,
    header: MachOHeader,
    load_commands: Vec<LoadCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported: Option<ExportedSymbols>,
}

impl MachOFile {
    /// Decode a Mach-O file from its bytes.
    pub fn from_bytes(data: &[u8], filename: &str) -> Result<Self, MachOFileError> {
        let header = MachOHeader::parse(data)?;
        let commands_end = header
            .size()
            .checked_add(header.sizeofcmds as usize)
            .filter(|end| *end <= data.len())
            .ok_or(MachOFileError::Truncated("load commands"))?;
        let load_commands = LoadCommand::parse_all(
            &data[header.size()..commands_end],
            header.ncmds,
            header.byte_order,
        )?;

        Ok(Self {
            filename: filename.to_string(),
            header,
            load_commands,
            exported: None,
        })
    }

    /// Build a Mach-O file that has no binary representation, ie: one materialized from a stub.
    pub(crate) fn synthesized(
        filename: &str,
        arch: Arch,
        filetype: MachOFileType,
        load_commands: Vec<LoadCommand>,
        exported: ExportedSymbols,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            header: MachOHeader {
                byte_order: ByteOrder::Little,
                is_64: arch.uses_64bit_abi(),
                arch,
                filetype,
                ncmds: load_commands.len() as u32,
                sizeofcmds: 0,
                flags: 0,
            },
            load_commands,
            exported: Some(exported),
        }
    }

    /// Name of the file this Mach-O was read from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Decoded header.
    pub fn header(&self) -> &MachOHeader {
        &self.header
    }

    /// Architecture of the file.
    pub fn arch(&self) -> Arch {
        self.header.arch
    }

    /// Kind of the file.
    pub fn filetype(&self) -> MachOFileType {
        self.header.filetype
    }

    /// All the decoded load commands, in file order.
    pub fn load_commands(&self) -> &[LoadCommand] {
        &self.load_commands
    }

    /// `true` for dynamic libraries, including stub-only ones.
    pub fn is_dynamic_library(&self) -> bool {
        matches!(
            self.header.filetype,
            MachOFileType::Dylib | MachOFileType::DylibStub
        )
    }

    /// Install name from the `LC_ID_DYLIB` command.
    pub fn install_name(&self) -> Option<&str> {
        self.dylib_references(|kind| kind == DylibKind::Id)
            .next()
            .map(|dylib| dylib.name.as_str())
    }

    /// Libraries referenced by this file, every dylib command but `LC_ID_DYLIB`.
    pub fn dylib_load_commands(&self) -> Vec<(DylibKind, &DylibReference)> {
        self.load_commands
            .iter()
            .filter_map(|command| match command {
                LoadCommand::Dylib { kind, dylib } if *kind != DylibKind::Id => {
                    Some((*kind, dylib))
                }
                _ => None,
            })
            .collect()
    }

    /// Uuid from the `LC_UUID` command.
    pub fn uuid(&self) -> Option<Uuid> {
        self.load_commands.iter().find_map(|command| match command {
            LoadCommand::Uuid(uuid) => Some(*uuid),
            _ => None,
        })
    }

    /// Runpaths from the `LC_RPATH` commands.
    pub fn rpaths(&self) -> Vec<&str> {
        self.load_commands
            .iter()
            .filter_map(|command| match command {
                LoadCommand::Rpath(path) => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Segment command with the given name.
    pub fn segment_with_name(&self, segment_name: &str) -> Option<&LoadCommand> {
        self.load_commands.iter().find(|command| match command {
            LoadCommand::Segment { name, .. } => name == segment_name,
            _ => false,
        })
    }

    /// Name used when importing this library, ie: `objc` for `/usr/lib/libobjc.A.dylib`.
    ///
    /// Only dynamic libraries have one.
    pub fn import_base_name(&self) -> Option<String> {
        if self.is_dynamic_library() {
            Some(import_base_name_of(&self.filename))
        } else {
            None
        }
    }

    /// Symbols exported by the library, only known for files materialized from a stub.
    pub fn exported_symbols(&self) -> Option<&ExportedSymbols> {
        self.exported.as_ref()
    }

    fn dylib_references<F>(&self, filter: F) -> impl Iterator<Item = &DylibReference>
    where
        F: Fn(DylibKind) -> bool,
    {
        self.load_commands
            .iter()
            .filter_map(move |command| match command {
                LoadCommand::Dylib { kind, dylib } if filter(*kind) => Some(dylib),
                _ => None,
            })
    }
}

/// Last path component of `path`, without its `lib` prefix and everything after the first dot
/// when it has that prefix.
pub(crate) fn import_base_name_of(path: &str) -> String {
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    match file_name.strip_prefix("lib") {
        Some(stripped) => stripped.split('.').next().unwrap_or(stripped).to_string(),
        None => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MachOBuilder;

    fn arm64() -> Arch {
        Arch::from_name("arm64").unwrap()
    }

    #[test]
    fn decode_a_dylib() {
        let data = MachOBuilder::new(arm64(), MachOFileType::Dylib)
            .with_dylib(DylibKind::Id, "/usr/lib/libobjc.A.dylib")
            .with_dylib(DylibKind::Load, "/usr/lib/libSystem.B.dylib")
            .with_dylib(DylibKind::Weak, "/usr/lib/libc++.1.dylib")
            .with_segment("__TEXT")
            .with_uuid([7; 16])
            .with_rpath("@loader_path/../Frameworks")
            .build();

        let macho = MachOFile::from_bytes(&data, "/usr/lib/libobjc.A.dylib").unwrap();

        assert_eq!(arm64(), macho.arch());
        assert!(macho.header().is_64);
        assert_eq!(6, macho.load_commands().len());
        assert!(macho.is_dynamic_library());
        assert_eq!(Some("/usr/lib/libobjc.A.dylib"), macho.install_name());
        assert_eq!(Some(Uuid([7; 16])), macho.uuid());
        assert_eq!(vec!["@loader_path/../Frameworks"], macho.rpaths());
        assert!(macho.segment_with_name("__TEXT").is_some());
        assert!(macho.segment_with_name("__DATA").is_none());
        assert_eq!(
            vec![
                (DylibKind::Load, "/usr/lib/libSystem.B.dylib"),
                (DylibKind::Weak, "/usr/lib/libc++.1.dylib"),
            ],
            macho
                .dylib_load_commands()
                .into_iter()
                .map(|(kind, dylib)| (kind, dylib.name.as_str()))
                .collect::<Vec<_>>()
        );
        assert_eq!(None, macho.exported_symbols());
    }

    #[test]
    fn decode_a_big_endian_32bit_executable() {
        let ppc = Arch::from_name("ppc").unwrap();
        let data = MachOBuilder::new(ppc, MachOFileType::Execute)
            .big_endian()
            .with_segment("__PAGEZERO")
            .with_dylib(DylibKind::Load, "/usr/lib/libSystem.B.dylib")
            .build();

        let macho = MachOFile::from_bytes(&data, "a.out").unwrap();

        assert_eq!(ppc, macho.arch());
        assert_eq!(ByteOrder::Big, macho.header().byte_order);
        assert!(!macho.header().is_64);
        assert!(matches!(
            macho.segment_with_name("__PAGEZERO"),
            Some(LoadCommand::Segment { is_64: false, .. })
        ));
        assert_eq!(None, macho.install_name());
        assert_eq!(None, macho.import_base_name());
    }

    #[test]
    fn sizeofcmds_past_the_end_is_truncated() {
        let mut data = MachOBuilder::new(arm64(), MachOFileType::Dylib)
            .with_dylib(DylibKind::Id, "/usr/lib/libfoo.dylib")
            .build();
        data.truncate(data.len() - 4);

        let error = MachOFile::from_bytes(&data, "libfoo.dylib").unwrap_err();

        assert!(matches!(error, MachOFileError::Truncated("load commands")));
    }

    #[test]
    fn invalid_magic_is_reported() {
        let error = MachOFile::from_bytes(b"\x7fELF\x02\x01\x01", "elf").unwrap_err();

        assert!(matches!(error, MachOFileError::InvalidMagic(0x7f45_4c46)));
    }

    #[test]
    fn import_base_name_strips_lib_prefix_and_extensions() {
        assert_eq!("objc", import_base_name_of("/usr/lib/libobjc.A.dylib"));
        assert_eq!("z", import_base_name_of("libz.1.2.11.dylib"));
        assert_eq!(
            "Foundation",
            import_base_name_of("/System/Library/Frameworks/Foundation.framework/Foundation")
        );
        assert_eq!("Foo.dylib", import_base_name_of("Foo.dylib"));
    }

    #[test]
    fn import_base_name_only_for_dynamic_libraries() {
        let dylib = MachOFile::from_bytes(
            &MachOBuilder::new(arm64(), MachOFileType::Dylib).build(),
            "/usr/lib/libsqlite3.dylib",
        )
        .unwrap();
        let bundle = MachOFile::from_bytes(
            &MachOBuilder::new(arm64(), MachOFileType::Bundle).build(),
            "/usr/lib/libsqlite3.dylib",
        )
        .unwrap();

        assert_eq!(Some("sqlite3".to_string()), dylib.import_base_name());
        assert_eq!(None, bundle.import_base_name());
    }
}
