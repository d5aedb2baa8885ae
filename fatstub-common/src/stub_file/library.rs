use serde::Serialize;

use crate::macho_file::ExportedSymbols;
use crate::{Arch, PackedVersion};

/// Symbols exported for a set of architectures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSection {
    /// Architectures the symbols are exported for.
    pub arches: Vec<Arch>,

    /// Exported names.
    pub exported: ExportedSymbols,
}

/// A library re-exported for a set of architectures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReexportedLibrary {
    /// Architectures re-exporting the library.
    pub arches: Vec<Arch>,

    /// Install name of the re-exported library.
    pub install_name: String,
}

/// A dynamic library described by a text-based stub document, whatever its format version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StubLibrary {
    /// Path where the library is installed.
    pub install_name: String,

    /// Current version of the library.
    pub current_version: PackedVersion,

    /// Oldest version the library is compatible with.
    pub compatibility_version: PackedVersion,

    /// Platforms of the library (ie: `ios`, `macos`), in declaration order.
    pub platforms: Vec<String>,

    /// Architectures of the library, in declaration order.
    pub arches: Vec<Arch>,

    /// Umbrella framework this library is part of.
    pub parent_umbrella: Option<String>,

    /// Clients allowed to link against this library.
    pub allowable_clients: Vec<String>,

    /// Libraries whose symbols are re-exported.
    pub reexported_libraries: Vec<ReexportedLibrary>,

    /// Exported symbols sections.
    pub exports: Vec<ExportSection>,
}

impl StubLibrary {
    /// Install names of the libraries re-exported for `arch`.
    pub fn reexported_libraries_for(&self, arch: &Arch) -> Vec<&str> {
        self.reexported_libraries
            .iter()
            .filter(|library| applies_to(&library.arches, arch))
            .map(|library| library.install_name.as_str())
            .collect()
    }

    /// Every name exported for `arch`.
    pub fn exported_symbols_for(&self, arch: &Arch) -> ExportedSymbols {
        self.exports
            .iter()
            .filter(|section| applies_to(&section.arches, arch))
            .fold(ExportedSymbols::default(), |mut exported, section| {
                exported.extend(section.exported.clone());
                exported
            })
    }
}

fn applies_to(arches: &[Arch], arch: &Arch) -> bool {
    arches.iter().any(|candidate| candidate.matches(arch))
}
