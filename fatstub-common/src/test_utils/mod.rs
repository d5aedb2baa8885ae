//! Test utilities
//!
//! They contain:
//! * Builders encoding fat and Mach-O files.
//! * Sample text-based stub files, one per format version.
//! * A temp directory builder and loggers for tests.

mod fat_builder;
mod macho_builder;
pub mod tbd_samples;
mod temp_dir;
mod test_logger;

pub use fat_builder::FatBuilder;
pub use macho_builder::MachOBuilder;
pub use temp_dir::TempDir;
pub use test_logger::TestLogger;
