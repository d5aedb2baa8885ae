use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use strum::{Display as StrumDisplay, EnumIter, IntoEnumIterator};

use crate::PackedVersion;
use crate::byte_order::{ByteOrder, c_string, fixed_bytes};
use crate::macho_file::MachOFileError;

/// Load command identifiers decoded by [LoadCommand::parse].
pub mod cmd {
    /// Flag set on commands that dyld must understand.
    pub const LC_REQ_DYLD: u32 = 0x8000_0000;
    /// 32-bit segment
    pub const LC_SEGMENT: u32 = 0x1;
    /// Dylib linked by the file
    pub const LC_LOAD_DYLIB: u32 = 0xc;
    /// Install name of a dylib
    pub const LC_ID_DYLIB: u32 = 0xd;
    /// 64-bit segment
    pub const LC_SEGMENT_64: u32 = 0x19;
    /// Uuid of the file
    pub const LC_UUID: u32 = 0x1b;
    /// Dylib linked by the file, may be missing at runtime
    pub const LC_LOAD_WEAK_DYLIB: u32 = 0x18 | LC_REQ_DYLD;
    /// Runpath added to the dylib search paths
    pub const LC_RPATH: u32 = 0x1c | LC_REQ_DYLD;
    /// Dylib whose symbols are re-exported
    pub const LC_REEXPORT_DYLIB: u32 = 0x1f | LC_REQ_DYLD;
    /// Dylib loaded on first use
    pub const LC_LAZY_LOAD_DYLIB: u32 = 0x20;
    /// Dylib linked with an upward dependency
    pub const LC_LOAD_UPWARD_DYLIB: u32 = 0x23 | LC_REQ_DYLD;
}

const LOAD_COMMAND_HEADER_SIZE: usize = 8;

/// Role of a dylib reference in a Mach-O file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DylibKind {
    /// Install name of the file itself (`LC_ID_DYLIB`)
    Id,
    /// `LC_LOAD_DYLIB`
    Load,
    /// `LC_LOAD_WEAK_DYLIB`
    Weak,
    /// `LC_REEXPORT_DYLIB`
    Reexport,
    /// `LC_LAZY_LOAD_DYLIB`
    Lazy,
    /// `LC_LOAD_UPWARD_DYLIB`
    Upward,
}

impl DylibKind {
    /// Load command identifier for this kind of reference.
    pub fn cmd(&self) -> u32 {
        match self {
            DylibKind::Id => cmd::LC_ID_DYLIB,
            DylibKind::Load => cmd::LC_LOAD_DYLIB,
            DylibKind::Weak => cmd::LC_LOAD_WEAK_DYLIB,
            DylibKind::Reexport => cmd::LC_REEXPORT_DYLIB,
            DylibKind::Lazy => cmd::LC_LAZY_LOAD_DYLIB,
            DylibKind::Upward => cmd::LC_LOAD_UPWARD_DYLIB,
        }
    }

    /// Kind for a load command identifier, `None` if it is not a dylib command.
    pub fn from_cmd(value: u32) -> Option<Self> {
        Self::iter().find(|kind| kind.cmd() == value)
    }
}

/// A dylib referenced by a load command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DylibReference {
    /// Install name of the library.
    pub name: String,

    /// Build timestamp recorded by the linker.
    pub timestamp: u32,

    /// Current version of the library.
    pub current_version: PackedVersion,

    /// Oldest version the library is compatible with.
    pub compatibility_version: PackedVersion,
}

/// 128-bit identifier of a Mach-O image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uuid(pub [u8; 16]);

impl Display for Uuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hex = hex::encode_upper(self.0);
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

impl Serialize for Uuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decoded load command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LoadCommand {
    /// `LC_SEGMENT` or `LC_SEGMENT_64`
    Segment {
        /// Segment name (ie: `__TEXT`)
        name: String,
        /// Virtual memory address
        vmaddr: u64,
        /// Virtual memory size
        vmsize: u64,
        /// File offset of the segment content
        fileoff: u64,
        /// Size of the segment content in the file
        filesize: u64,
        /// Number of sections
        nsects: u32,
        /// `true` for `LC_SEGMENT_64`
        is_64: bool,
    },
    /// Any of the dylib commands
    Dylib {
        /// Role of the reference
        kind: DylibKind,
        /// Referenced library
        dylib: DylibReference,
    },
    /// `LC_UUID`
    Uuid(Uuid),
    /// `LC_RPATH`
    Rpath(String),
    /// A command this decoder keeps opaque
    Unknown {
        /// Command identifier
        cmd: u32,
        /// Command size in bytes
        cmdsize: u32,
    },
}

impl LoadCommand {
    /// Parse the `ncmds` load commands stored in `commands`.
    pub(crate) fn parse_all(
        commands: &[u8],
        ncmds: u32,
        byte_order: ByteOrder,
    ) -> Result<Vec<LoadCommand>, MachOFileError> {
        let mut load_commands = Vec::with_capacity(ncmds.min(1024) as usize);
        let mut offset = 0;

        for index in 0..ncmds {
            let malformed = |reason: &str| MachOFileError::MalformedLoadCommand {
                index,
                reason: reason.to_string(),
            };
            let remaining = &commands[offset..];
            let (_, cmd) = byte_order
                .u32(remaining)
                .map_err(|_| malformed("command header is past the end of the load commands"))?;
            let (_, cmdsize) = byte_order
                .u32(&remaining[4.min(remaining.len())..])
                .map_err(|_| malformed("command header is past the end of the load commands"))?;
            let cmdsize = cmdsize as usize;
            if cmdsize < LOAD_COMMAND_HEADER_SIZE {
                return Err(malformed("command size is smaller than its header"));
            }
            if cmdsize > remaining.len() {
                return Err(malformed("command extends past the end of the load commands"));
            }

            let command = &remaining[..cmdsize];
            let load_command = Self::parse(cmd, command, byte_order)
                .ok_or_else(|| malformed("command is too short for its type"))?;
            load_commands.push(load_command);
            offset += cmdsize;
        }

        Ok(load_commands)
    }

    /// Parse a single load command, `command` including its `cmd` and `cmdsize` fields.
    ///
    /// Return `None` if the command is too short for its type or if a string offset points
    /// outside of the command.
    fn parse(cmd: u32, command: &[u8], byte_order: ByteOrder) -> Option<LoadCommand> {
        let body = &command[LOAD_COMMAND_HEADER_SIZE..];

        match cmd {
            cmd::LC_SEGMENT => {
                let (input, name) = fixed_bytes(body, 16).ok()?;
                let (input, vmaddr) = byte_order.u32(input).ok()?;
                let (input, vmsize) = byte_order.u32(input).ok()?;
                let (input, fileoff) = byte_order.u32(input).ok()?;
                let (input, filesize) = byte_order.u32(input).ok()?;
                // maxprot, initprot
                let (input, _) = fixed_bytes(input, 8).ok()?;
                let (_, nsects) = byte_order.u32(input).ok()?;

                Some(LoadCommand::Segment {
                    name: c_string(name),
                    vmaddr: vmaddr.into(),
                    vmsize: vmsize.into(),
                    fileoff: fileoff.into(),
                    filesize: filesize.into(),
                    nsects,
                    is_64: false,
                })
            }
            cmd::LC_SEGMENT_64 => {
                let (input, name) = fixed_bytes(body, 16).ok()?;
                let (input, vmaddr) = byte_order.u64(input).ok()?;
                let (input, vmsize) = byte_order.u64(input).ok()?;
                let (input, fileoff) = byte_order.u64(input).ok()?;
                let (input, filesize) = byte_order.u64(input).ok()?;
                let (input, _) = fixed_bytes(input, 8).ok()?;
                let (_, nsects) = byte_order.u32(input).ok()?;

                Some(LoadCommand::Segment {
                    name: c_string(name),
                    vmaddr,
                    vmsize,
                    fileoff,
                    filesize,
                    nsects,
                    is_64: true,
                })
            }
            cmd::LC_UUID => {
                let (_, uuid) = fixed_bytes(body, 16).ok()?;

                Some(LoadCommand::Uuid(Uuid(uuid.try_into().ok()?)))
            }
            cmd::LC_RPATH => {
                let (_, path_offset) = byte_order.u32(body).ok()?;

                Some(LoadCommand::Rpath(string_in_command(command, path_offset)?))
            }
            other => match DylibKind::from_cmd(other) {
                Some(kind) => {
                    let (input, name_offset) = byte_order.u32(body).ok()?;
                    let (input, timestamp) = byte_order.u32(input).ok()?;
                    let (input, current_version) = byte_order.u32(input).ok()?;
                    let (_, compatibility_version) = byte_order.u32(input).ok()?;

                    Some(LoadCommand::Dylib {
                        kind,
                        dylib: DylibReference {
                            name: string_in_command(command, name_offset)?,
                            timestamp,
                            current_version: PackedVersion(current_version),
                            compatibility_version: PackedVersion(compatibility_version),
                        },
                    })
                }
                None => Some(LoadCommand::Unknown {
                    cmd: other,
                    cmdsize: command.len() as u32,
                }),
            },
        }
    }
}

fn string_in_command(command: &[u8], offset: u32) -> Option<String> {
    let offset = offset as usize;
    if offset < LOAD_COMMAND_HEADER_SIZE || offset >= command.len() {
        return None;
    }

    Some(c_string(&command[offset..]))
}
