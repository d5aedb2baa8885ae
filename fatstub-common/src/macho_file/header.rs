use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::Arch;
use crate::byte_order::ByteOrder;
use crate::macho_file::{MachOFileError, truncated};

/// 32-bit Mach-O magic, as read in the file byte order.
pub const MH_MAGIC: u32 = 0xfeed_face;
/// 32-bit Mach-O magic, byte swapped.
pub const MH_CIGAM: u32 = 0xcefa_edfe;
/// 64-bit Mach-O magic, as read in the file byte order.
pub const MH_MAGIC_64: u32 = 0xfeed_facf;
/// 64-bit Mach-O magic, byte swapped.
pub const MH_CIGAM_64: u32 = 0xcffa_edfe;

pub(crate) const HEADER_SIZE_32: usize = 28;
pub(crate) const HEADER_SIZE_64: usize = 32;

/// Kind of a Mach-O file, from the `filetype` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachOFileType {
    /// Relocatable object file
    Object,
    /// Demand paged executable
    Execute,
    /// Fixed VM shared library
    FixedVmLib,
    /// Core file
    Core,
    /// Preloaded executable
    Preload,
    /// Dynamically bound shared library
    Dylib,
    /// Dynamic link editor
    Dylinker,
    /// Dynamically bound bundle
    Bundle,
    /// Shared library stub for static linking only, no section contents
    DylibStub,
    /// Companion file with only debug sections
    Dsym,
    /// x86_64 kernel extension
    KextBundle,
    /// Set of Mach-O files
    FileSet,
    /// A file type this decoder does not know about
    Unknown(u32),
}

impl From<u32> for MachOFileType {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Object,
            2 => Self::Execute,
            3 => Self::FixedVmLib,
            4 => Self::Core,
            5 => Self::Preload,
            6 => Self::Dylib,
            7 => Self::Dylinker,
            8 => Self::Bundle,
            9 => Self::DylibStub,
            10 => Self::Dsym,
            11 => Self::KextBundle,
            12 => Self::FileSet,
            other => Self::Unknown(other),
        }
    }
}

impl Display for MachOFileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "Unknown({value})"),
            known => write!(f, "{known:?}"),
        }
    }
}

impl From<MachOFileType> for u32 {
    fn from(value: MachOFileType) -> Self {
        match value {
            MachOFileType::Object => 1,
            MachOFileType::Execute => 2,
            MachOFileType::FixedVmLib => 3,
            MachOFileType::Core => 4,
            MachOFileType::Preload => 5,
            MachOFileType::Dylib => 6,
            MachOFileType::Dylinker => 7,
            MachOFileType::Bundle => 8,
            MachOFileType::DylibStub => 9,
            MachOFileType::Dsym => 10,
            MachOFileType::KextBundle => 11,
            MachOFileType::FileSet => 12,
            MachOFileType::Unknown(other) => other,
        }
    }
}

/// The fixed size header at the start of a Mach-O file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachOHeader {
    /// Byte order of the file.
    pub byte_order: ByteOrder,

    /// `true` for the 64-bit header layout.
    pub is_64: bool,

    /// Architecture of the file.
    pub arch: Arch,

    /// Kind of file.
    pub filetype: MachOFileType,

    /// Number of load commands following the header.
    pub ncmds: u32,

    /// Size in bytes of all the load commands.
    pub sizeofcmds: u32,

    /// Header flags (`MH_*`).
    pub flags: u32,
}

impl MachOHeader {
    /// Size in bytes of the header, load commands start right after it.
    pub fn size(&self) -> usize {
        if self.is_64 {
            HEADER_SIZE_64
        } else {
            HEADER_SIZE_32
        }
    }

    /// Detect the byte order and header layout from the first four bytes of a file.
    pub fn detect(data: &[u8]) -> Option<(ByteOrder, bool)> {
        let (_, magic) = ByteOrder::Little.u32(data).ok()?;
        match magic {
            MH_MAGIC => Some((ByteOrder::Little, false)),
            MH_MAGIC_64 => Some((ByteOrder::Little, true)),
            MH_CIGAM => Some((ByteOrder::Big, false)),
            MH_CIGAM_64 => Some((ByteOrder::Big, true)),
            _ => None,
        }
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, MachOFileError> {
        let Some((byte_order, is_64)) = Self::detect(data) else {
            let magic = ByteOrder::Big.u32(data).map_or(0, |(_, magic)| magic);
            return Err(MachOFileError::InvalidMagic(magic));
        };
        let input = &data[4..];
        let (input, cputype) = byte_order.i32(input).map_err(truncated("header"))?;
        let (input, cpusubtype) = byte_order.i32(input).map_err(truncated("header"))?;
        let (input, filetype) = byte_order.u32(input).map_err(truncated("header"))?;
        let (input, ncmds) = byte_order.u32(input).map_err(truncated("header"))?;
        let (input, sizeofcmds) = byte_order.u32(input).map_err(truncated("header"))?;
        let (input, flags) = byte_order.u32(input).map_err(truncated("header"))?;
        if is_64 {
            // reserved
            byte_order.u32(input).map_err(truncated("header"))?;
        }

        Ok(Self {
            byte_order,
            is_64,
            arch: Arch::new(cputype, cpusubtype),
            filetype: filetype.into(),
            ncmds,
            sizeofcmds,
            flags,
        })
    }
}
