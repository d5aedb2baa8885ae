use serde::Serialize;
use std::collections::BTreeSet;

/// Symbols a dynamic library makes available to its clients.
///
/// Only known for Mach-O files materialized from a [stub file][crate::StubFile], a binary
/// Mach-O would need its export trie decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportedSymbols {
    /// Plain symbols (functions, globals), with their leading underscore.
    pub symbols: BTreeSet<String>,

    /// Objective-C class names.
    pub objc_classes: BTreeSet<String>,

    /// Objective-C classes exporting an exception handling type.
    pub objc_eh_types: BTreeSet<String>,

    /// Objective-C instance variables, as `Class.ivar`.
    pub objc_ivars: BTreeSet<String>,

    /// Weak definitions.
    pub weak_symbols: BTreeSet<String>,

    /// Thread local variables.
    pub thread_local_symbols: BTreeSet<String>,
}

impl ExportedSymbols {
    /// Merge `other` into this set of symbols.
    pub fn extend(&mut self, other: ExportedSymbols) {
        self.symbols.extend(other.symbols);
        self.objc_classes.extend(other.objc_classes);
        self.objc_eh_types.extend(other.objc_eh_types);
        self.objc_ivars.extend(other.objc_ivars);
        self.weak_symbols.extend(other.weak_symbols);
        self.thread_local_symbols.extend(other.thread_local_symbols);
    }

    /// Total number of exported names.
    pub fn len(&self) -> usize {
        self.symbols.len()
            + self.objc_classes.len()
            + self.objc_eh_types.len()
            + self.objc_ivars.len()
            + self.weak_symbols.len()
            + self.thread_local_symbols.len()
    }

    /// `true` if nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if `name` is exported as an Objective-C class.
    pub fn exports_objc_class(&self, name: &str) -> bool {
        self.objc_classes.contains(name)
    }
}
