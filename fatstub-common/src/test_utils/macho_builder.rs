use crate::Arch;
use crate::byte_order::ByteOrder;
use crate::macho_file::{DylibKind, MH_MAGIC, MH_MAGIC_64, MachOFileType, cmd};

enum FixtureCommand {
    Dylib(DylibKind, String),
    Segment(String),
    Uuid([u8; 16]),
    Rpath(String),
}

/// Encode Mach-O files for tests.
pub struct MachOBuilder {
    arch: Arch,
    filetype: MachOFileType,
    byte_order: ByteOrder,
    commands: Vec<FixtureCommand>,
}

impl MachOBuilder {
    /// Start a little endian file, using the 64-bit layout for 64-bit architectures.
    pub fn new(arch: Arch, filetype: MachOFileType) -> Self {
        Self {
            arch,
            filetype,
            byte_order: ByteOrder::Little,
            commands: vec![],
        }
    }

    /// Encode integers most significant byte first.
    pub fn big_endian(mut self) -> Self {
        self.byte_order = ByteOrder::Big;
        self
    }

    /// Add a dylib command, versions are `1.0`.
    pub fn with_dylib(mut self, kind: DylibKind, name: &str) -> Self {
        self.commands.push(FixtureCommand::Dylib(kind, name.to_string()));
        self
    }

    /// Add an empty segment.
    pub fn with_segment(mut self, name: &str) -> Self {
        self.commands.push(FixtureCommand::Segment(name.to_string()));
        self
    }

    /// Add an uuid command.
    pub fn with_uuid(mut self, uuid: [u8; 16]) -> Self {
        self.commands.push(FixtureCommand::Uuid(uuid));
        self
    }

    /// Add a runpath command.
    pub fn with_rpath(mut self, path: &str) -> Self {
        self.commands.push(FixtureCommand::Rpath(path.to_string()));
        self
    }

    /// Encode the file.
    pub fn build(&self) -> Vec<u8> {
        let is_64 = self.arch.uses_64bit_abi();
        let alignment = if is_64 { 8 } else { 4 };
        let commands: Vec<Vec<u8>> = self
            .commands
            .iter()
            .map(|command| self.encode_command(command, is_64, alignment))
            .collect();
        let sizeofcmds: usize = commands.iter().map(Vec::len).sum();

        let order = self.byte_order;
        let mut bytes = Vec::new();
        bytes.extend(order.u32_bytes(if is_64 { MH_MAGIC_64 } else { MH_MAGIC }));
        bytes.extend(order.u32_bytes(self.arch.cputype as u32));
        bytes.extend(order.u32_bytes(self.arch.cpusubtype as u32));
        bytes.extend(order.u32_bytes(self.filetype.into()));
        bytes.extend(order.u32_bytes(commands.len() as u32));
        bytes.extend(order.u32_bytes(sizeofcmds as u32));
        bytes.extend(order.u32_bytes(0));
        if is_64 {
            bytes.extend(order.u32_bytes(0));
        }
        for command in commands {
            bytes.extend(command);
        }

        bytes
    }

    fn encode_command(&self, command: &FixtureCommand, is_64: bool, alignment: usize) -> Vec<u8> {
        let order = self.byte_order;
        let (cmd, mut body) = match command {
            FixtureCommand::Dylib(kind, name) => {
                let mut body = Vec::new();
                body.extend(order.u32_bytes(24));
                body.extend(order.u32_bytes(2));
                body.extend(order.u32_bytes(0x0001_0000));
                body.extend(order.u32_bytes(0x0001_0000));
                body.extend(name.as_bytes());
                body.push(0);
                (kind.cmd(), body)
            }
            FixtureCommand::Segment(name) => {
                let mut body = segment_name(name).to_vec();
                if is_64 {
                    for _ in 0..4 {
                        body.extend(order.u64_bytes(0));
                    }
                } else {
                    for _ in 0..4 {
                        body.extend(order.u32_bytes(0));
                    }
                }
                // maxprot, initprot, nsects, flags
                for _ in 0..4 {
                    body.extend(order.u32_bytes(0));
                }
                let cmd = if is_64 {
                    cmd::LC_SEGMENT_64
                } else {
                    cmd::LC_SEGMENT
                };
                (cmd, body)
            }
            FixtureCommand::Uuid(uuid) => (cmd::LC_UUID, uuid.to_vec()),
            FixtureCommand::Rpath(path) => {
                let mut body = order.u32_bytes(12).to_vec();
                body.extend(path.as_bytes());
                body.push(0);
                (cmd::LC_RPATH, body)
            }
        };
        while (body.len() + 8) % alignment != 0 {
            body.push(0);
        }

        let mut bytes = order.u32_bytes(cmd).to_vec();
        bytes.extend(order.u32_bytes((body.len() + 8) as u32));
        bytes.extend(body);
        bytes
    }
}

fn segment_name(name: &str) -> [u8; 16] {
    let mut bytes = [0; 16];
    let len = name.len().min(16);
    bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
    bytes
}
