//! Fat (universal) files: a big-endian table of per architecture slices.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::Arch;
use crate::ArchContainer;
use crate::byte_order::ByteOrder;
use crate::macho_file::{MachOFile, MachOFileError};

/// Magic of a fat file using 32-bit slice entries.
pub const FAT_MAGIC: u32 = 0xcafe_babe;

/// Magic of a fat file using 64-bit slice entries.
pub const FAT_MAGIC_64: u32 = 0xcafe_babf;

/// Above this number of slices the data is rather a Java class file, which shares the
/// [FAT_MAGIC] magic.
pub const MAX_FAT_ARCHES: u32 = 30;

const FAT_HEADER_SIZE: usize = 8;
const FAT_ARCH_SIZE: usize = 20;
const FAT_ARCH_64_SIZE: usize = 32;

/// [FatFile] decoding errors.
#[derive(Error, Debug)]
pub enum FatFileError {
    /// Raised when the data does not start with a fat magic number.
    #[error("Not a fat file, unexpected magic 0x{0:08x}")]
    InvalidMagic(u32),

    /// Raised when the data ends before the slice table.
    #[error("Fat file is truncated while reading the {0}")]
    Truncated(&'static str),

    /// Raised when the declared number of slices is zero or implausible.
    #[error("Invalid number of architectures in fat file: {0}")]
    InvalidArchCount(u32),

    /// Raised when a slice extends past the end of the data.
    #[error(
        "Slice for '{arch}' at offset {offset} with size {size} exceeds the file size {file_size}"
    )]
    SliceOutOfBounds {
        /// Architecture of the slice.
        arch: Arch,
        /// Offset of the slice.
        offset: u64,
        /// Size of the slice.
        size: u64,
        /// Size of the whole fat file.
        file_size: usize,
    },

    /// Raised when no slice matches the requested architecture.
    #[error("Architecture '{arch}' not found, available: {available}")]
    ArchNotFound {
        /// Requested architecture.
        arch: Arch,
        /// Available architectures, comma separated.
        available: String,
    },

    /// Raised when a slice content declares another architecture than its table entry.
    #[error("Slice declared as '{declared}' contains a '{actual}' Mach-O file")]
    ArchMismatch {
        /// Architecture in the slice table.
        declared: Arch,
        /// Architecture in the Mach-O header.
        actual: Arch,
    },

    /// Raised when a slice is not a valid Mach-O file.
    #[error("Invalid Mach-O slice for '{arch}'")]
    InvalidSlice {
        /// Architecture of the slice.
        arch: Arch,
        /// Decoding error.
        #[source]
        source: MachOFileError,
    },
}

/// One slice entry of a fat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FatArch {
    /// Architecture of the slice.
    pub arch: Arch,

    /// Offset of the slice from the start of the file.
    pub offset: u64,

    /// Size of the slice.
    pub size: u64,

    /// Alignment of the slice, as a power of two.
    pub align: u32,
}

/// A decoded fat file.
#[derive(Debug, Clone)]
pub struct FatFile {
    filename: String,
    data: Arc<[u8]>,
    arches: Vec<FatArch>,
}

impl FatFile {
    /// `true` if `data` starts with a fat magic number.
    pub fn is_fat(data: &[u8]) -> bool {
        matches!(
            ByteOrder::Big.u32(data),
            Ok((_, FAT_MAGIC)) | Ok((_, FAT_MAGIC_64))
        )
    }

    /// Decode the slice table of a fat file.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>, filename: &str) -> Result<Self, FatFileError> {
        let data: Arc<[u8]> = data.into();
        let (input, magic) = ByteOrder::Big
            .u32(&data)
            .map_err(|_| FatFileError::Truncated("header"))?;
        let is_64 = match magic {
            FAT_MAGIC => false,
            FAT_MAGIC_64 => true,
            other => return Err(FatFileError::InvalidMagic(other)),
        };
        let (_, nfat_arch) = ByteOrder::Big
            .u32(input)
            .map_err(|_| FatFileError::Truncated("header"))?;
        if nfat_arch == 0 || nfat_arch > MAX_FAT_ARCHES {
            return Err(FatFileError::InvalidArchCount(nfat_arch));
        }

        let entry_size = if is_64 {
            FAT_ARCH_64_SIZE
        } else {
            FAT_ARCH_SIZE
        };
        let table_end = FAT_HEADER_SIZE + entry_size * nfat_arch as usize;
        if data.len() < table_end {
            return Err(FatFileError::Truncated("architecture table"));
        }

        let arches = data[FAT_HEADER_SIZE..table_end]
            .chunks_exact(entry_size)
            .map(|entry| {
                let fat_arch = parse_fat_arch(entry, is_64)
                    .ok_or(FatFileError::Truncated("architecture table"))?;
                check_slice_bounds(&fat_arch, data.len())?;
                Ok(fat_arch)
            })
            .collect::<Result<Vec<_>, FatFileError>>()?;

        Ok(Self {
            filename: filename.to_string(),
            data,
            arches,
        })
    }

    /// Name of the file.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Slice entries, in file order.
    pub fn fat_arches(&self) -> &[FatArch] {
        &self.arches
    }

    /// Architectures of the slices, in file order.
    pub fn arches(&self) -> Vec<Arch> {
        self.arches.iter().map(|fat_arch| fat_arch.arch).collect()
    }

    /// Raw bytes of the slice that exactly matches `arch`.
    pub fn slice_data(&self, arch: &Arch) -> Option<&[u8]> {
        let fat_arch = self.fat_arch(arch)?;
        let start = fat_arch.offset as usize;

        Some(&self.data[start..start + fat_arch.size as usize])
    }

    /// Decode the slice that exactly matches `arch`.
    pub fn macho_file_with_arch(&self, arch: &Arch) -> Result<MachOFile, FatFileError> {
        let fat_arch = self.fat_arch(arch).ok_or_else(|| FatFileError::ArchNotFound {
            arch: *arch,
            available: self.arch_names().join(", "),
        })?;
        let slice = self.slice_data(&fat_arch.arch).unwrap_or_default();
        let macho = MachOFile::from_bytes(slice, &self.filename)
            .map_err(|source| FatFileError::InvalidSlice {
                arch: fat_arch.arch,
                source,
            })?;

        if !macho.arch().matches(&fat_arch.arch) {
            return Err(FatFileError::ArchMismatch {
                declared: fat_arch.arch,
                actual: macho.arch(),
            });
        }

        Ok(macho)
    }

    fn fat_arch(&self, arch: &Arch) -> Option<&FatArch> {
        self.arches
            .iter()
            .find(|fat_arch| fat_arch.arch.matches(arch))
    }
}

fn parse_fat_arch(entry: &[u8], is_64: bool) -> Option<FatArch> {
    let order = ByteOrder::Big;
    let (input, cputype) = order.i32(entry).ok()?;
    let (input, cpusubtype) = order.i32(input).ok()?;
    let (input, offset, size) = if is_64 {
        let (input, offset) = order.u64(input).ok()?;
        let (input, size) = order.u64(input).ok()?;
        (input, offset, size)
    } else {
        let (input, offset) = order.u32(input).ok()?;
        let (input, size) = order.u32(input).ok()?;
        (input, u64::from(offset), u64::from(size))
    };
    let (_, align) = order.u32(input).ok()?;

    Some(FatArch {
        arch: Arch::new(cputype, cpusubtype),
        offset,
        size,
        align,
    })
}

fn check_slice_bounds(fat_arch: &FatArch, file_size: usize) -> Result<(), FatFileError> {
    let in_bounds = fat_arch
        .offset
        .checked_add(fat_arch.size)
        .is_some_and(|end| end <= file_size as u64);

    if in_bounds {
        Ok(())
    } else {
        Err(FatFileError::SliceOutOfBounds {
            arch: fat_arch.arch,
            offset: fat_arch.offset,
            size: fat_arch.size,
            file_size,
        })
    }
}
