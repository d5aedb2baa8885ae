//! Text-based dynamic library stubs (`.tbd`).
//!
//! A stub file describes a dynamic library, its architectures and its exported symbols without
//! any machine code. Like a [fat file][crate::FatFile] it covers several architectures, and a
//! [Mach-O view][crate::MachOFile] of the library can be materialized for any one of them.

mod library;
mod text_stub;

pub use library::{ExportSection, ReexportedLibrary, StubLibrary};
pub use text_stub::TbdVersion;

use serde::Deserialize;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::macho_file::{
    DylibKind, DylibReference, LoadCommand, MachOFile, MachOFileType, import_base_name_of,
};
use crate::{Arch, PackedVersion};

/// Extension of text-based stub files.
pub const STUB_FILE_EXTENSION: &str = "tbd";

// ld64 records this timestamp for every dylib it links against.
const DYLIB_TIMESTAMP: u32 = 2;

/// [StubFile] decoding errors.
#[derive(Error, Debug)]
pub enum StubFileError {
    /// Raised when the data is not UTF-8 text.
    #[error("Stub file is not UTF-8 text")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// Raised when the data is not valid YAML, or does not have the expected structure.
    #[error("Invalid stub file YAML")]
    Yaml(#[from] serde_yaml::Error),

    /// Raised when the file does not contain any document.
    #[error("Stub file does not contain any document")]
    EmptyDocument,

    /// Raised when a document is not a mapping.
    #[error("Stub file document is not a mapping")]
    NotAMapping,

    /// Raised when a top-level key is not a string.
    #[error("Stub file top-level key is not a string: {0}")]
    NonStringKey(String),

    /// Raised when a mandatory field is absent.
    #[error("Stub file is missing the mandatory field '{0}'")]
    MissingField(&'static str),

    /// Raised when a field value can not be interpreted.
    #[error("Invalid value for field '{field}': '{value}'")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Faulty value.
        value: String,
    },

    /// Raised when an architecture name is unknown.
    #[error("Unknown architecture name in stub file: '{0}'")]
    UnknownArch(String),

    /// Raised when the document tag or `tbd-version` is not supported.
    #[error("Unsupported stub file version: '{0}'")]
    UnsupportedVersion(String),

    /// Raised when the stub does not cover the requested architecture.
    #[error("Architecture '{arch}' not found, available: {available}")]
    ArchNotFound {
        /// Requested architecture.
        arch: Arch,
        /// Available architectures, comma separated.
        available: String,
    },
}

/// A decoded text-based stub file.
#[derive(Debug, Clone)]
pub struct StubFile {
    filename: String,
    version: TbdVersion,
    stubbed_data: BTreeMap<String, Value>,
    library: StubLibrary,
    inlined_libraries: Vec<StubLibrary>,
}

impl StubFile {
    /// `true` if `data` looks like a text-based stub: UTF-8 text whose first meaningful line
    /// opens a YAML document, or a file with the `.tbd` extension.
    pub fn is_stub(data: &[u8], filename: &str) -> bool {
        let has_stub_extension = Path::new(filename)
            .extension()
            .is_some_and(|extension| extension == STUB_FILE_EXTENSION);
        let starts_with_document = std::str::from_utf8(data).is_ok_and(|text| {
            text.lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('#'))
                .is_some_and(|line| line.starts_with("---"))
        });

        has_stub_extension || starts_with_document
    }

    /// Decode a stub file from its bytes, `filename` being the path it was read from.
    pub fn from_bytes(data: &[u8], filename: &str) -> Result<Self, StubFileError> {
        let text = std::str::from_utf8(data)?;
        let mut documents = vec![];
        for document in serde_yaml::Deserializer::from_str(text) {
            let (tag, value) = match Value::deserialize(document)? {
                Value::Tagged(tagged) => {
                    let TaggedValue { tag, value } = *tagged;
                    (Some(tag.to_string().trim_start_matches('!').to_string()), value)
                }
                value => (None, value),
            };
            match value {
                Value::Null => continue,
                Value::Mapping(mapping) => documents.push((tag, mapping)),
                _ => return Err(StubFileError::NotAMapping),
            }
        }

        let mut documents = documents.into_iter();
        let (tag, mapping) = documents.next().ok_or(StubFileError::EmptyDocument)?;
        let version = TbdVersion::from_tag(tag.as_deref(), &mapping)?;
        let stubbed_data = stubbed_data_of(&mapping)?;
        let library = text_stub::parse_document(version, mapping)?;
        let inlined_libraries = documents
            .map(|(tag, mapping)| {
                let version = TbdVersion::from_tag(tag.as_deref(), &mapping)?;
                text_stub::parse_document(version, mapping)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filename: filename.to_string(),
            version,
            stubbed_data,
            library,
            inlined_libraries,
        })
    }

    /// Raw top-level fields of the library document.
    pub fn stubbed_data(&self) -> &BTreeMap<String, Value> {
        &self.stubbed_data
    }

    /// Path the stub was read from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Name used when importing this library, derived from its install name.
    pub fn import_base_name(&self) -> String {
        import_base_name_of(&self.library.install_name)
    }

    /// Format version of the library document.
    pub fn version(&self) -> TbdVersion {
        self.version
    }

    /// The library described by the first document.
    pub fn library(&self) -> &StubLibrary {
        &self.library
    }

    /// Libraries described by the documents following the first one.
    pub fn inlined_libraries(&self) -> &[StubLibrary] {
        &self.inlined_libraries
    }

    /// Install name of the library.
    pub fn install_name(&self) -> &str {
        &self.library.install_name
    }

    /// Current version of the library.
    pub fn current_version(&self) -> PackedVersion {
        self.library.current_version
    }

    /// Compatibility version of the library.
    pub fn compatibility_version(&self) -> PackedVersion {
        self.library.compatibility_version
    }

    /// First platform of the library.
    pub fn platform(&self) -> Option<&str> {
        self.library.platforms.first().map(String::as_str)
    }

    /// Architectures covered by the stub, in declaration order.
    pub fn arches(&self) -> &[Arch] {
        &self.library.arches
    }

    /// Materialize the Mach-O view of the library for `arch`.
    ///
    /// The resulting file is a [stub dylib][MachOFileType::DylibStub] named after the install
    /// name, carrying the `LC_ID_DYLIB` and `LC_REEXPORT_DYLIB` commands and the symbols
    /// exported for that architecture.
    pub fn macho_file_with_arch(&self, arch: &Arch) -> Result<MachOFile, StubFileError> {
        let arch = self
            .library
            .arches
            .iter()
            .find(|candidate| candidate.matches(arch))
            .copied()
            .ok_or_else(|| StubFileError::ArchNotFound {
                arch: *arch,
                available: self
                    .library
                    .arches
                    .iter()
                    .map(Arch::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let id_command = LoadCommand::Dylib {
            kind: DylibKind::Id,
            dylib: DylibReference {
                name: self.library.install_name.clone(),
                timestamp: DYLIB_TIMESTAMP,
                current_version: self.library.current_version,
                compatibility_version: self.library.compatibility_version,
            },
        };
        let reexport_commands = self
            .library
            .reexported_libraries_for(&arch)
            .into_iter()
            .map(|install_name| LoadCommand::Dylib {
                kind: DylibKind::Reexport,
                dylib: DylibReference {
                    name: install_name.to_string(),
                    timestamp: DYLIB_TIMESTAMP,
                    current_version: PackedVersion::ONE,
                    compatibility_version: PackedVersion::ONE,
                },
            });
        let load_commands = std::iter::once(id_command)
            .chain(reexport_commands)
            .collect();

        Ok(MachOFile::synthesized(
            &self.library.install_name,
            arch,
            MachOFileType::DylibStub,
            load_commands,
            self.library.exported_symbols_for(&arch),
        ))
    }
}

fn stubbed_data_of(mapping: &Mapping) -> Result<BTreeMap<String, Value>, StubFileError> {
    mapping
        .iter()
        .map(|(key, value)| match key {
            Value::String(key) => Ok((key.clone(), value.clone())),
            other => Err(StubFileError::NonStringKey(format!("{other:?}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::test_utils::tbd_samples::{
        TBD_V1_SQLITE, TBD_V2_FOUNDATION, TBD_V3_LIBOBJC, TBD_V4_APPKIT,
    };

    fn arch(name: &str) -> Arch {
        Arch::from_name(name).unwrap()
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn arch_names(stub_file: &StubFile) -> Vec<String> {
        stub_file.arches().iter().map(Arch::name).collect()
    }

    #[test]
    fn detect_stub_files() {
        assert!(StubFile::is_stub(TBD_V3_LIBOBJC.as_bytes(), "whatever"));
        assert!(StubFile::is_stub(b"# comment\n\n--- !tapi-tbd\n", "libfoo.txt"));
        assert!(StubFile::is_stub(b"", "/sdk/usr/lib/libz.tbd"));
        assert!(!StubFile::is_stub(b"\xcf\xfa\xed\xfe", "libfoo.dylib"));
        assert!(!StubFile::is_stub(b"archs: [ arm64 ]", "libfoo.yaml"));
    }

    #[test]
    fn decode_v1_stub() {
        let stub_file =
            StubFile::from_bytes(TBD_V1_SQLITE.as_bytes(), "/sdk/libsqlite3.tbd").unwrap();

        assert_eq!(TbdVersion::V1, stub_file.version());
        assert_eq!("/sdk/libsqlite3.tbd", stub_file.filename());
        assert_eq!("/usr/lib/libsqlite3.dylib", stub_file.install_name());
        assert_eq!("sqlite3", stub_file.import_base_name());
        assert_eq!(PackedVersion::new(274, 8, 1), stub_file.current_version());
        assert_eq!(
            PackedVersion::new(9, 0, 0),
            stub_file.compatibility_version()
        );
        assert_eq!(Some("ios"), stub_file.platform());
        assert_eq!(vec!["armv7", "arm64"], arch_names(&stub_file));
    }

    #[test]
    fn stubbed_data_holds_the_raw_top_level_fields() {
        let stub_file =
            StubFile::from_bytes(TBD_V2_FOUNDATION.as_bytes(), "Foundation.tbd").unwrap();
        let stubbed_data = stub_file.stubbed_data();

        assert_eq!(
            vec![
                "archs",
                "compatibility-version",
                "current-version",
                "exports",
                "install-name",
                "objc-constraint",
                "platform",
                "uuids"
            ],
            stubbed_data.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert_eq!(
            Some(&Value::String("none".to_string())),
            stubbed_data.get("objc-constraint")
        );
        assert!(matches!(stubbed_data.get("exports"), Some(Value::Sequence(_))));
    }

    #[test]
    fn decode_v2_stub_with_reexports() {
        let stub_file =
            StubFile::from_bytes(TBD_V2_FOUNDATION.as_bytes(), "Foundation.tbd").unwrap();
        let library = stub_file.library();

        assert_eq!(TbdVersion::V2, stub_file.version());
        assert_eq!("Foundation", stub_file.import_base_name());
        assert_eq!(PackedVersion::new(1349, 13, 0), stub_file.current_version());
        assert_eq!(
            vec!["/usr/lib/libobjc.A.dylib"],
            library.reexported_libraries_for(&arch("armv7s"))
        );
    }

    #[test]
    fn decode_v3_stub_with_inlined_library() {
        let stub_file = StubFile::from_bytes(TBD_V3_LIBOBJC.as_bytes(), "libobjc.tbd").unwrap();

        assert_eq!(TbdVersion::V3, stub_file.version());
        assert_eq!("objc", stub_file.import_base_name());
        assert_eq!(vec!["x86_64", "arm64e"], arch_names(&stub_file));
        assert_eq!(1, stub_file.inlined_libraries().len());

        let inlined = &stub_file.inlined_libraries()[0];
        assert_eq!("/usr/lib/system/libdyld.dylib", inlined.install_name);
        assert_eq!(Some("System".to_string()), inlined.parent_umbrella);
        assert_eq!(PackedVersion::new(832, 7, 3), inlined.current_version);
    }

    #[test]
    fn decode_v4_stub() {
        let stub_file = StubFile::from_bytes(TBD_V4_APPKIT.as_bytes(), "AppKit.tbd").unwrap();
        let library = stub_file.library();

        assert_eq!(TbdVersion::V4, stub_file.version());
        assert_eq!("AppKit", stub_file.import_base_name());
        assert_eq!(vec!["x86_64", "arm64", "arm64e"], arch_names(&stub_file));
        assert_eq!(Some("macos"), stub_file.platform());
        assert_eq!(Some("Cocoa".to_string()), library.parent_umbrella);
        assert_eq!(
            vec!["UIKitMacHelper".to_string()],
            library.allowable_clients
        );
        assert_eq!(
            PackedVersion::new(2022, 50, 114),
            stub_file.current_version()
        );
        assert_eq!(
            PackedVersion::new(45, 0, 0),
            stub_file.compatibility_version()
        );
    }

    #[test]
    fn macho_file_with_arch_materializes_a_stub_dylib() {
        let stub_file =
            StubFile::from_bytes(TBD_V2_FOUNDATION.as_bytes(), "Foundation.tbd").unwrap();

        let macho = stub_file.macho_file_with_arch(&arch("arm64")).unwrap();

        assert_eq!(arch("arm64"), macho.arch());
        assert_eq!(MachOFileType::DylibStub, macho.filetype());
        assert!(macho.is_dynamic_library());
        assert_eq!(
            "/System/Library/Frameworks/Foundation.framework/Foundation",
            macho.filename()
        );
        assert_eq!(
            Some("/System/Library/Frameworks/Foundation.framework/Foundation"),
            macho.install_name()
        );
        assert_eq!(Some("Foundation".to_string()), macho.import_base_name());
        assert_eq!(
            vec![(DylibKind::Reexport, "/usr/lib/libobjc.A.dylib")],
            macho
                .dylib_load_commands()
                .into_iter()
                .map(|(kind, dylib)| (kind, dylib.name.as_str()))
                .collect::<Vec<_>>()
        );

        let exported = macho.exported_symbols().unwrap();
        assert_eq!(
            vec!["_NSLog", "_NSStringFromClass"],
            names(&exported.symbols)
        );
        assert_eq!(vec!["NSArray", "NSString"], names(&exported.objc_classes));
        assert_eq!(vec!["NSArray._count"], names(&exported.objc_ivars));
        assert_eq!(vec!["_NSWeakOnlyOnArm64"], names(&exported.weak_symbols));
        assert!(exported.exports_objc_class("NSString"));
    }

    #[test]
    fn macho_file_with_arch_only_keeps_the_sections_of_that_arch() {
        let stub_file = StubFile::from_bytes(TBD_V1_SQLITE.as_bytes(), "libsqlite3.tbd").unwrap();

        let armv7 = stub_file.macho_file_with_arch(&arch("armv7")).unwrap();
        let arm64 = stub_file.macho_file_with_arch(&arch("arm64")).unwrap();

        assert_eq!(
            vec!["_sqlite3_close", "_sqlite3_open"],
            names(&armv7.exported_symbols().unwrap().symbols)
        );
        assert_eq!(
            vec!["_sqlite3_close", "_sqlite3_open", "_sqlite3_open_v2"],
            names(&arm64.exported_symbols().unwrap().symbols)
        );
    }

    #[test]
    fn macho_file_with_arch_merges_v4_reexported_symbols() {
        let stub_file = StubFile::from_bytes(TBD_V4_APPKIT.as_bytes(), "AppKit.tbd").unwrap();

        let x86_64 = stub_file.macho_file_with_arch(&arch("x86_64")).unwrap();
        let arm64e = stub_file.macho_file_with_arch(&arch("arm64e")).unwrap();

        assert_eq!(
            vec!["_NSApp", "_NSApplicationMain", "_NSLegacyX86Only"],
            names(&x86_64.exported_symbols().unwrap().symbols)
        );
        assert_eq!(
            vec!["_NSApp", "_NSApplicationMain", "_NSReexportedOnArm"],
            names(&arm64e.exported_symbols().unwrap().symbols)
        );
        assert_eq!(
            vec!["NSApplication", "NSView", "NSWindow"],
            names(&arm64e.exported_symbols().unwrap().objc_classes)
        );
        assert_eq!(2, arm64e.load_commands().len());
    }

    #[test]
    fn macho_file_with_missing_arch_fails() {
        let stub_file = StubFile::from_bytes(TBD_V3_LIBOBJC.as_bytes(), "libobjc.tbd").unwrap();

        let error = stub_file
            .macho_file_with_arch(&arch("armv7"))
            .expect_err("armv7 is not covered by the stub");

        assert!(matches!(error, StubFileError::ArchNotFound { .. }));
        assert!(error.to_string().contains("x86_64, arm64e"));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            StubFile::from_bytes(b"\xff\xfe", "bad.tbd"),
            Err(StubFileError::NotUtf8(_))
        ));
        assert!(matches!(
            StubFile::from_bytes(b"--- [ a, b ]\n", "bad.tbd"),
            Err(StubFileError::NotAMapping)
        ));
        assert!(matches!(
            StubFile::from_bytes(b"---\n...\n", "bad.tbd"),
            Err(StubFileError::EmptyDocument)
        ));
        assert!(matches!(
            StubFile::from_bytes(b"---\narchs: [ arm64\n", "bad.tbd"),
            Err(StubFileError::Yaml(_))
        ));
        assert!(matches!(
            StubFile::from_bytes(
                b"---\narchs: [ sparc ]\ninstall-name: /usr/lib/libfoo.dylib\n",
                "bad.tbd"
            ),
            Err(StubFileError::UnknownArch(_))
        ));
        assert!(matches!(
            StubFile::from_bytes(b"---\n1: one\n", "bad.tbd"),
            Err(StubFileError::NonStringKey(_))
        ));
    }
}
