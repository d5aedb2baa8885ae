//! Architecture selectors: a cpu type and a cpu subtype identifying one slice of a
//! multi-architecture file.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Cpu type flag marking a 64-bit ABI.
pub const CPU_ARCH_ABI64: i32 = 0x0100_0000;

/// Cpu type flag marking an ILP32 ABI on 64-bit hardware.
pub const CPU_ARCH_ABI64_32: i32 = 0x0200_0000;

/// Capability bits of a cpu type.
pub const CPU_ARCH_MASK: i32 = 0xff00_0000_u32 as i32;

/// Capability bits of a cpu subtype.
pub const CPU_SUBTYPE_MASK: i32 = 0xff00_0000_u32 as i32;

/// Intel 32-bit.
pub const CPU_TYPE_X86: i32 = 7;
/// Intel 64-bit.
pub const CPU_TYPE_X86_64: i32 = CPU_TYPE_X86 | CPU_ARCH_ABI64;
/// ARM 32-bit.
pub const CPU_TYPE_ARM: i32 = 12;
/// ARM 64-bit.
pub const CPU_TYPE_ARM64: i32 = CPU_TYPE_ARM | CPU_ARCH_ABI64;
/// ARM 64-bit hardware with 32-bit pointers.
pub const CPU_TYPE_ARM64_32: i32 = CPU_TYPE_ARM | CPU_ARCH_ABI64_32;
/// PowerPC 32-bit.
pub const CPU_TYPE_POWERPC: i32 = 18;
/// PowerPC 64-bit.
pub const CPU_TYPE_POWERPC64: i32 = CPU_TYPE_POWERPC | CPU_ARCH_ABI64;

const KNOWN_ARCHES: &[(&str, i32, i32)] = &[
    ("i386", CPU_TYPE_X86, 3),
    ("x86_64", CPU_TYPE_X86_64, 3),
    ("x86_64h", CPU_TYPE_X86_64, 8),
    ("armv6", CPU_TYPE_ARM, 6),
    ("armv7", CPU_TYPE_ARM, 9),
    ("armv7s", CPU_TYPE_ARM, 11),
    ("armv7k", CPU_TYPE_ARM, 12),
    ("arm64", CPU_TYPE_ARM64, 0),
    ("arm64e", CPU_TYPE_ARM64, 2),
    ("arm64_32", CPU_TYPE_ARM64_32, 1),
    ("ppc", CPU_TYPE_POWERPC, 0),
    ("ppc64", CPU_TYPE_POWERPC64, 0),
];

/// A cpu type and subtype pair selecting one architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arch {
    /// Cpu type, including its capability bits.
    pub cputype: i32,

    /// Cpu subtype, including its capability bits.
    pub cpusubtype: i32,
}

/// [Arch] parsing error.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown architecture name: '{0}'")]
pub struct ArchParseError(pub String);

impl Arch {
    /// Arch factory
    pub const fn new(cputype: i32, cpusubtype: i32) -> Self {
        Self {
            cputype,
            cpusubtype,
        }
    }

    /// Look up an architecture by name.
    ///
    /// Accepts the names of the known architectures table (`arm64`, `x86_64`, ...) and the
    /// `0x<cputype>:0x<cpusubtype>` form that [Arch::name] produces for unknown pairs.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some((_, cputype, cpusubtype)) =
            KNOWN_ARCHES.iter().find(|(known, _, _)| *known == name)
        {
            return Some(Self::new(*cputype, *cpusubtype));
        }

        let (cputype, cpusubtype) = name.split_once(':')?;
        Some(Self::new(parse_hex_i32(cputype)?, parse_hex_i32(cpusubtype)?))
    }

    /// Name of this architecture, or `0x<cputype>:0x<cpusubtype>` if it is not a known one.
    pub fn name(&self) -> String {
        let masked_subtype = self.masked_cpusubtype();
        KNOWN_ARCHES
            .iter()
            .find(|(_, cputype, cpusubtype)| {
                *cputype == self.cputype && *cpusubtype == masked_subtype
            })
            .map(|(name, _, _)| name.to_string())
            .unwrap_or_else(|| format!("0x{:x}:0x{:x}", self.cputype, self.cpusubtype))
    }

    /// Cpu type without its capability bits.
    pub fn masked_cputype(&self) -> i32 {
        self.cputype & !CPU_ARCH_MASK
    }

    /// Cpu subtype without its capability bits (ie: pointer authentication flags on `arm64e`).
    pub fn masked_cpusubtype(&self) -> i32 {
        self.cpusubtype & !CPU_SUBTYPE_MASK
    }

    /// `true` if the cpu type uses the 64-bit ABI.
    pub fn uses_64bit_abi(&self) -> bool {
        self.cputype & CPU_ARCH_ABI64 == CPU_ARCH_ABI64
    }

    /// `true` if both architectures have the same cpu type and the same masked subtype.
    pub fn matches(&self, other: &Arch) -> bool {
        self.cputype == other.cputype && self.masked_cpusubtype() == other.masked_cpusubtype()
    }

    /// Pick, in `candidates`, the architecture that best matches `target`.
    ///
    /// Preference order: exact match, same cpu family with the 64-bit ABI, same cpu family
    /// without it, any 64-bit architecture, then any other architecture.
    pub fn best_match<'a, I>(target: &Arch, candidates: I) -> Option<Arch>
    where
        I: IntoIterator<Item = &'a Arch>,
    {
        let candidates: Vec<&Arch> = candidates.into_iter().collect();
        let target_family = target.masked_cputype();

        let exact = candidates.iter().find(|arch| arch.matches(target));
        let same_family_64 = || {
            candidates
                .iter()
                .find(|arch| arch.masked_cputype() == target_family && arch.uses_64bit_abi())
        };
        let same_family_32 = || {
            candidates
                .iter()
                .find(|arch| arch.masked_cputype() == target_family && !arch.uses_64bit_abi())
        };
        let any_64 = || candidates.iter().find(|arch| arch.uses_64bit_abi());
        let any = || candidates.first();

        exact
            .or_else(same_family_64)
            .or_else(same_family_32)
            .or_else(any_64)
            .or_else(any)
            .map(|arch| **arch)
    }
}

fn parse_hex_i32(value: &str) -> Option<i32> {
    let digits = value.strip_prefix("0x")?;
    u32::from_str_radix(digits, 16).ok().map(|v| v as i32)
}

impl Display for Arch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Arch {
    type Err = ArchParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::from_name(name).ok_or_else(|| ArchParseError(name.to_string()))
    }
}
