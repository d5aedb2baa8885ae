//! Load any supported binary file from disk or from raw bytes.

use anyhow::Context;
use slog::{Logger, debug};
use std::path::Path;
use thiserror::Error;

use crate::logging::LoggerExtensions;
use crate::macho_file::MachOHeader;
use crate::{Arch, FatFile, MachOFile, StdResult, StubFile};

/// [BinaryFile] loading errors.
#[derive(Error, Debug)]
pub enum BinaryFileError {
    /// Raised when the data is neither a fat file, a Mach-O file nor a stub file.
    #[error("Unknown file format for '{0}'")]
    UnknownFormat(String),

    /// Raised when a thin Mach-O file is asked for another architecture than its own.
    #[error("Architecture '{arch}' not found, available: {available}")]
    ArchNotFound {
        /// Requested architecture.
        arch: Arch,
        /// Architecture of the file.
        available: Arch,
    },
}

/// A file that bundles one Mach-O view per architecture.
pub trait ArchContainer {
    /// Architectures of the container, in file order.
    fn arches(&self) -> Vec<Arch>;

    /// Mach-O view of the container for the architecture that exactly matches `arch`.
    fn macho_file_with_arch(&self, arch: &Arch) -> StdResult<MachOFile>;

    /// Names of the architectures, in file order.
    fn arch_names(&self) -> Vec<String> {
        self.arches().iter().map(Arch::name).collect()
    }

    /// `true` if an architecture of the container exactly matches `arch`.
    fn contains_arch(&self, arch: &Arch) -> bool {
        self.arches().iter().any(|other| other.matches(arch))
    }

    /// The architecture of the container that best matches `arch`, see [Arch::best_match].
    fn best_match_for_arch(&self, arch: &Arch) -> Option<Arch> {
        Arch::best_match(arch, &self.arches())
    }
}

impl ArchContainer for FatFile {
    fn arches(&self) -> Vec<Arch> {
        FatFile::arches(self)
    }

    fn macho_file_with_arch(&self, arch: &Arch) -> StdResult<MachOFile> {
        Ok(FatFile::macho_file_with_arch(self, arch)?)
    }
}

impl ArchContainer for StubFile {
    fn arches(&self) -> Vec<Arch> {
        StubFile::arches(self).to_vec()
    }

    fn macho_file_with_arch(&self, arch: &Arch) -> StdResult<MachOFile> {
        Ok(StubFile::macho_file_with_arch(self, arch)?)
    }
}

impl ArchContainer for MachOFile {
    fn arches(&self) -> Vec<Arch> {
        vec![self.arch()]
    }

    fn macho_file_with_arch(&self, arch: &Arch) -> StdResult<MachOFile> {
        if self.arch().matches(arch) {
            Ok(self.clone())
        } else {
            Err(BinaryFileError::ArchNotFound {
                arch: *arch,
                available: self.arch(),
            }
            .into())
        }
    }
}

/// A decoded binary file.
#[derive(Debug, Clone)]
pub enum BinaryFile {
    /// Universal file with several Mach-O slices.
    Fat(FatFile),

    /// Single architecture Mach-O file.
    MachO(MachOFile),

    /// Text-based dynamic library stub.
    Stub(StubFile),
}

impl BinaryFile {
    /// Name of the file the data was read from.
    pub fn filename(&self) -> &str {
        match self {
            BinaryFile::Fat(fat_file) => fat_file.filename(),
            BinaryFile::MachO(macho_file) => macho_file.filename(),
            BinaryFile::Stub(stub_file) => stub_file.filename(),
        }
    }

    /// Short name of the kind of file.
    pub fn kind(&self) -> &'static str {
        match self {
            BinaryFile::Fat(_) => "fat",
            BinaryFile::MachO(_) => "mach-o",
            BinaryFile::Stub(_) => "stub",
        }
    }

    fn as_arch_container(&self) -> &dyn ArchContainer {
        match self {
            BinaryFile::Fat(fat_file) => fat_file,
            BinaryFile::MachO(macho_file) => macho_file,
            BinaryFile::Stub(stub_file) => stub_file,
        }
    }
}

impl ArchContainer for BinaryFile {
    fn arches(&self) -> Vec<Arch> {
        self.as_arch_container().arches()
    }

    fn macho_file_with_arch(&self, arch: &Arch) -> StdResult<MachOFile> {
        self.as_arch_container().macho_file_with_arch(arch)
    }
}

/// Read a [BinaryFile] from a path.
pub trait BinaryFileReader: Send + Sync {
    /// Read and decode the file at `path`.
    fn read(&self, path: &Path) -> StdResult<BinaryFile>;
}

/// Recognizes the format of a file from its content and decodes it.
pub struct BinaryFileLoader {
    logger: Logger,
}

impl BinaryFileLoader {
    /// `BinaryFileLoader` factory
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Read the file at `path` and decode it.
    pub fn load_path(&self, path: &Path) -> StdResult<BinaryFile> {
        let data = std::fs::read(path)
            .with_context(|| format!("Could not read file '{}'", path.display()))?;

        self.load_bytes(data, &path.to_string_lossy())
    }

    /// Decode `data`, `filename` being the path it was read from.
    ///
    /// Formats are tried in this order: fat file, Mach-O file, then text-based stub.
    pub fn load_bytes(&self, data: Vec<u8>, filename: &str) -> StdResult<BinaryFile> {
        let logger = self.logger.new_with_filename(filename);

        let binary_file = if FatFile::is_fat(&data) {
            let fat_file = FatFile::from_bytes(data, filename)
                .with_context(|| format!("Could not decode fat file '{filename}'"))?;
            BinaryFile::Fat(fat_file)
        } else if MachOHeader::detect(&data).is_some() {
            let macho_file = MachOFile::from_bytes(&data, filename)
                .with_context(|| format!("Could not decode Mach-O file '{filename}'"))?;
            BinaryFile::MachO(macho_file)
        } else if StubFile::is_stub(&data, filename) {
            let stub_file = StubFile::from_bytes(&data, filename)
                .with_context(|| format!("Could not decode stub file '{filename}'"))?;
            BinaryFile::Stub(stub_file)
        } else {
            return Err(BinaryFileError::UnknownFormat(filename.to_string()).into());
        };

        debug!(
            logger, "Loaded binary file";
            "kind" => binary_file.kind(),
            "arches" => binary_file.arch_names().join(",")
        );

        Ok(binary_file)
    }
}

impl BinaryFileReader for BinaryFileLoader {
    fn read(&self, path: &Path) -> StdResult<BinaryFile> {
        self.load_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat_file::FatFileError;
    use crate::macho_file::{DylibKind, MachOFileType};
    use crate::stub_file::StubFileError;
    use crate::test_utils::tbd_samples::{TBD_V3_LIBOBJC, TBD_V4_APPKIT};
    use crate::test_utils::{FatBuilder, MachOBuilder, TempDir, TestLogger};

    fn arch(name: &str) -> Arch {
        Arch::from_name(name).unwrap()
    }

    fn loader() -> BinaryFileLoader {
        BinaryFileLoader::new(TestLogger::stdout())
    }

    fn dylib(arch_name: &str) -> Vec<u8> {
        MachOBuilder::new(arch(arch_name), MachOFileType::Dylib)
            .with_dylib(DylibKind::Id, "/usr/lib/libfoo.dylib")
            .build()
    }

    #[test]
    fn load_a_fat_file() {
        let data = FatBuilder::new()
            .with_slice(arch("x86_64"), dylib("x86_64"))
            .with_slice(arch("arm64"), dylib("arm64"))
            .build();

        let binary_file = loader().load_bytes(data, "libfoo.dylib").unwrap();

        assert!(matches!(binary_file, BinaryFile::Fat(_)));
        assert_eq!("fat", binary_file.kind());
        assert_eq!("libfoo.dylib", binary_file.filename());
        assert_eq!(vec!["x86_64", "arm64"], binary_file.arch_names());
        assert_eq!(
            Some("/usr/lib/libfoo.dylib"),
            binary_file
                .macho_file_with_arch(&arch("x86_64"))
                .unwrap()
                .install_name()
        );
    }

    #[test]
    fn load_a_thin_macho_file() {
        let binary_file = loader().load_bytes(dylib("arm64"), "libfoo.dylib").unwrap();

        assert!(matches!(binary_file, BinaryFile::MachO(_)));
        assert_eq!(vec![arch("arm64")], binary_file.arches());
        assert!(binary_file.contains_arch(&arch("arm64")));
        assert_eq!(
            arch("arm64"),
            binary_file
                .macho_file_with_arch(&arch("arm64"))
                .unwrap()
                .arch()
        );
    }

    #[test]
    fn thin_macho_file_has_no_other_arch() {
        let binary_file = loader().load_bytes(dylib("arm64"), "libfoo.dylib").unwrap();

        let error = binary_file
            .macho_file_with_arch(&arch("x86_64"))
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<BinaryFileError>(),
            Some(BinaryFileError::ArchNotFound { .. })
        ));
        assert_eq!(
            Some(arch("arm64")),
            binary_file.best_match_for_arch(&arch("arm64e"))
        );
    }

    #[test]
    fn load_a_stub_file() {
        let binary_file = loader()
            .load_bytes(TBD_V4_APPKIT.as_bytes().to_vec(), "AppKit.tbd")
            .unwrap();

        assert!(matches!(binary_file, BinaryFile::Stub(_)));
        assert_eq!("stub", binary_file.kind());
        assert_eq!(vec!["x86_64", "arm64", "arm64e"], binary_file.arch_names());
        assert_eq!(
            MachOFileType::DylibStub,
            binary_file
                .macho_file_with_arch(&arch("arm64e"))
                .unwrap()
                .filetype()
        );
    }

    #[test]
    fn decoding_errors_are_kept_as_source() {
        let error = loader()
            .load_bytes(b"\xca\xfe\xba\xbe\x00\x00\x00\x00".to_vec(), "empty")
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<FatFileError>(),
            Some(FatFileError::InvalidArchCount(0))
        ));

        let data = b"--- !tapi-tbd-v9\narchs: [ arm64 ]\n".to_vec();
        let error = loader().load_bytes(data, "libfoo.tbd").unwrap_err();
        assert!(matches!(
            error.downcast_ref::<StubFileError>(),
            Some(StubFileError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn unknown_content_is_rejected() {
        let error = loader()
            .load_bytes(b"\x7fELF\x02\x01\x01".to_vec(), "a.out")
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<BinaryFileError>(),
            Some(BinaryFileError::UnknownFormat(filename)) if filename == "a.out"
        ));
    }

    #[test]
    fn read_a_file_from_disk() {
        let path = TempDir::create("binary_file", "read_a_file_from_disk").join("libobjc.tbd");
        std::fs::write(&path, TBD_V3_LIBOBJC).unwrap();

        let binary_file = loader().read(&path).unwrap();

        assert_eq!(path.to_string_lossy(), binary_file.filename());
        assert_eq!(vec!["x86_64", "arm64e"], binary_file.arch_names());
    }

    #[test]
    fn read_a_missing_file_fails() {
        let path = TempDir::create("binary_file", "read_a_missing_file_fails").join("missing");

        let error = loader().read(&path).unwrap_err();

        assert!(error.to_string().contains("Could not read file"));
    }
}
