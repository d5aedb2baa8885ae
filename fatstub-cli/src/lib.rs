#![warn(missing_docs)]

//! CLI tool to inspect fat, Mach-O and text-based stub files.
//!
//! The commands are split in their own modules, each one reading its input through the
//! [BinaryFileReader][fatstub_common::BinaryFileReader] held by the [CommandContext].

mod command_context;
pub mod commands;
mod configuration;

pub use command_context::*;
pub use configuration::*;
