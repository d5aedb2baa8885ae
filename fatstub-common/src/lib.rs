#![warn(missing_docs)]

//! Shared datatypes and decoders used by fatstub rust projects
//!
//! Provide:
//! - [Architecture selectors][arch] naming the slices of a multi-architecture file.
//! - A [fat file][fat_file] decoder that lists slices and resolves them by architecture.
//! - A [Mach-O file][macho_file] decoder for thin files and fat slices.
//! - A [stub file][stub_file] decoder for text-based dynamic library stubs (`.tbd`).
//! - A [loader][binary_file] that recognizes any of the above from raw bytes.
//! - useful test utilities, like fixture builders and test loggers ([test_utils]).

pub mod arch;
pub mod binary_file;
pub mod fat_file;
pub mod logging;
pub mod macho_file;
pub mod stub_file;

#[cfg(any(test, feature = "test_tools"))]
pub mod test_utils;

mod byte_order;
mod packed_version;

pub use arch::Arch;
pub use binary_file::{ArchContainer, BinaryFile, BinaryFileLoader, BinaryFileReader};
pub use byte_order::ByteOrder;
pub use fat_file::{FatArch, FatFile};
pub use macho_file::MachOFile;
pub use packed_version::{PackedVersion, PackedVersionParseError};
pub use stub_file::StubFile;

/// Generic error type
pub type StdError = anyhow::Error;

/// Generic result type
pub type StdResult<T> = anyhow::Result<T, StdError>;
