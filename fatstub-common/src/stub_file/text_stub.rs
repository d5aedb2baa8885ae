use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use strum::Display;

use crate::macho_file::ExportedSymbols;
use crate::stub_file::StubFileError;
use crate::stub_file::library::{ExportSection, ReexportedLibrary, StubLibrary};
use crate::{Arch, PackedVersion};

/// Format version of a text-based stub document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TbdVersion {
    /// Untagged documents or `!tapi-tbd-v1`
    V1,
    /// `!tapi-tbd-v2`
    V2,
    /// `!tapi-tbd-v3`
    V3,
    /// `!tapi-tbd` with `tbd-version: 4`
    V4,
}

impl TbdVersion {
    pub(crate) fn from_tag(tag: Option<&str>, mapping: &Mapping) -> Result<Self, StubFileError> {
        match tag {
            None | Some("tapi-tbd-v1") => Ok(Self::V1),
            Some("tapi-tbd-v2") => Ok(Self::V2),
            Some("tapi-tbd-v3") => Ok(Self::V3),
            Some("tapi-tbd") => match mapping.get("tbd-version") {
                Some(value) => Self::from_tbd_version(value),
                None => Err(StubFileError::MissingField("tbd-version")),
            },
            Some(other) => Err(StubFileError::UnsupportedVersion(other.to_string())),
        }
    }

    /// `tbd-version` may be written as a number or as a quoted string.
    fn from_tbd_version(value: &Value) -> Result<Self, StubFileError> {
        let number = match value {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse::<u64>().ok(),
            _ => None,
        };

        match number {
            Some(4) => Ok(Self::V4),
            Some(other) => {
                let version = format!("tapi-tbd version {other}");
                Err(StubFileError::UnsupportedVersion(version))
            }
            None => Err(StubFileError::InvalidField {
                field: "tbd-version",
                value: format!("{value:?}"),
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ArchDocument {
    archs: Option<Vec<String>>,
    platform: Option<String>,
    install_name: Option<String>,
    current_version: Option<Value>,
    compatibility_version: Option<Value>,
    parent_umbrella: Option<String>,
    #[serde(default)]
    exports: Vec<ArchSection>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
struct ArchSection {
    archs: Vec<String>,
    #[serde(alias = "allowed-clients")]
    allowable_clients: Vec<String>,
    re_exports: Vec<String>,
    symbols: Vec<String>,
    objc_classes: Vec<String>,
    objc_eh_types: Vec<String>,
    objc_ivars: Vec<String>,
    weak_def_symbols: Vec<String>,
    thread_local_symbols: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TargetDocument {
    targets: Option<Vec<String>>,
    install_name: Option<String>,
    current_version: Option<Value>,
    compatibility_version: Option<Value>,
    #[serde(default)]
    parent_umbrella: Vec<UmbrellaSection>,
    #[serde(default)]
    allowable_clients: Vec<ClientsSection>,
    #[serde(default)]
    reexported_libraries: Vec<LibrariesSection>,
    #[serde(default)]
    exports: Vec<TargetSection>,
    #[serde(default)]
    reexports: Vec<TargetSection>,
}

#[derive(Deserialize)]
struct UmbrellaSection {
    umbrella: String,
}

#[derive(Deserialize)]
struct ClientsSection {
    #[serde(default)]
    clients: Vec<String>,
}

#[derive(Deserialize)]
struct LibrariesSection {
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    libraries: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
struct TargetSection {
    targets: Vec<String>,
    symbols: Vec<String>,
    objc_classes: Vec<String>,
    objc_eh_types: Vec<String>,
    objc_ivars: Vec<String>,
    weak_symbols: Vec<String>,
    thread_local_symbols: Vec<String>,
}

/// Decode one stub document into a [StubLibrary].
pub(crate) fn parse_document(
    version: TbdVersion,
    mapping: Mapping,
) -> Result<StubLibrary, StubFileError> {
    let value = Value::Mapping(mapping);
    match version {
        TbdVersion::V4 => parse_target_document(serde_yaml::from_value(value)?),
        _ => parse_arch_document(version, serde_yaml::from_value(value)?),
    }
}

fn parse_arch_document(
    version: TbdVersion,
    document: ArchDocument,
) -> Result<StubLibrary, StubFileError> {
    let arch_names = document.archs.ok_or(StubFileError::MissingField("archs"))?;
    let install_name = document
        .install_name
        .ok_or(StubFileError::MissingField("install-name"))?;
    // Before v3 Objective-C names kept the underscore of their symbol.
    let objc_name = |name: String| -> String {
        if version < TbdVersion::V3 {
            name.strip_prefix('_').map(str::to_string).unwrap_or(name)
        } else {
            name
        }
    };

    let mut allowable_clients = vec![];
    let mut reexported_libraries = vec![];
    let mut exports = vec![];
    for section in document.exports {
        let arches = parse_arches(&section.archs)?;
        push_unique(&mut allowable_clients, section.allowable_clients);
        for install_name in section.re_exports {
            reexported_libraries.push(ReexportedLibrary {
                arches: arches.clone(),
                install_name,
            });
        }
        exports.push(ExportSection {
            arches,
            exported: ExportedSymbols {
                symbols: section.symbols.into_iter().collect(),
                objc_classes: section.objc_classes.into_iter().map(objc_name).collect(),
                objc_eh_types: section.objc_eh_types.into_iter().map(objc_name).collect(),
                objc_ivars: section.objc_ivars.into_iter().map(objc_name).collect(),
                weak_symbols: section.weak_def_symbols.into_iter().collect(),
                thread_local_symbols: section.thread_local_symbols.into_iter().collect(),
            },
        });
    }

    Ok(StubLibrary {
        install_name,
        current_version: parse_version("current-version", document.current_version)?,
        compatibility_version: parse_version(
            "compatibility-version",
            document.compatibility_version,
        )?,
        platforms: document.platform.into_iter().collect(),
        arches: parse_arches(&arch_names)?,
        parent_umbrella: document.parent_umbrella,
        allowable_clients,
        reexported_libraries,
        exports,
    })
}

fn parse_target_document(document: TargetDocument) -> Result<StubLibrary, StubFileError> {
    let targets = document
        .targets
        .ok_or(StubFileError::MissingField("targets"))?;
    let install_name = document
        .install_name
        .ok_or(StubFileError::MissingField("install-name"))?;

    let mut arches = vec![];
    let mut platforms = vec![];
    for target in &targets {
        let (arch, platform) = parse_target(target)?;
        push_unique(&mut arches, [arch]);
        push_unique(&mut platforms, [platform]);
    }

    let mut allowable_clients = vec![];
    for section in document.allowable_clients {
        push_unique(&mut allowable_clients, section.clients);
    }

    let mut reexported_libraries = vec![];
    for section in document.reexported_libraries {
        let arches = target_arches(&section.targets)?;
        for install_name in section.libraries {
            reexported_libraries.push(ReexportedLibrary {
                arches: arches.clone(),
                install_name,
            });
        }
    }

    let exports = document
        .exports
        .into_iter()
        .chain(document.reexports)
        .map(|section| {
            Ok(ExportSection {
                arches: target_arches(&section.targets)?,
                exported: ExportedSymbols {
                    symbols: section.symbols.into_iter().collect(),
                    objc_classes: section.objc_classes.into_iter().collect(),
                    objc_eh_types: section.objc_eh_types.into_iter().collect(),
                    objc_ivars: section.objc_ivars.into_iter().collect(),
                    weak_symbols: section.weak_symbols.into_iter().collect(),
                    thread_local_symbols: section.thread_local_symbols.into_iter().collect(),
                },
            })
        })
        .collect::<Result<Vec<_>, StubFileError>>()?;

    Ok(StubLibrary {
        install_name,
        current_version: parse_version("current-version", document.current_version)?,
        compatibility_version: parse_version(
            "compatibility-version",
            document.compatibility_version,
        )?,
        platforms,
        arches,
        parent_umbrella: document
            .parent_umbrella
            .into_iter()
            .next()
            .map(|section| section.umbrella),
        allowable_clients,
        reexported_libraries,
        exports,
    })
}

fn parse_version(
    field: &'static str,
    value: Option<Value>,
) -> Result<PackedVersion, StubFileError> {
    let text = match value {
        None => return Ok(PackedVersion::ONE),
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => {
            return Err(StubFileError::InvalidField {
                field,
                value: format!("{other:?}"),
            });
        }
    };

    text.parse()
        .map_err(|_| StubFileError::InvalidField { field, value: text })
}

fn parse_arches(names: &[String]) -> Result<Vec<Arch>, StubFileError> {
    let mut arches = vec![];
    for name in names {
        let arch = Arch::from_name(name).ok_or_else(|| StubFileError::UnknownArch(name.clone()))?;
        push_unique(&mut arches, [arch]);
    }

    Ok(arches)
}

/// Split a `<arch>-<platform>` target, ie: `arm64-ios-simulator`.
fn parse_target(target: &str) -> Result<(Arch, String), StubFileError> {
    let (arch_name, platform) = target
        .split_once('-')
        .ok_or_else(|| StubFileError::InvalidField {
            field: "targets",
            value: target.to_string(),
        })?;
    let arch = Arch::from_name(arch_name)
        .ok_or_else(|| StubFileError::UnknownArch(arch_name.to_string()))?;

    Ok((arch, platform.to_string()))
}

fn target_arches(targets: &[String]) -> Result<Vec<Arch>, StubFileError> {
    let mut arches = vec![];
    for target in targets {
        let (arch, _) = parse_target(target)?;
        push_unique(&mut arches, [arch]);
    }

    Ok(arches)
}

fn push_unique<T: PartialEq>(target: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
