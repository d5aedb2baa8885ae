use crate::Arch;
use crate::fat_file::{FAT_MAGIC, FAT_MAGIC_64};

const DEFAULT_ALIGN: u32 = 12;

/// Encode fat files for tests.
pub struct FatBuilder {
    is_64: bool,
    align: u32,
    slices: Vec<(Arch, Vec<u8>)>,
}

impl Default for FatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FatBuilder {
    /// Start an empty fat file using 32-bit slice entries, slices aligned on 4096 bytes.
    pub fn new() -> Self {
        Self {
            is_64: false,
            align: DEFAULT_ALIGN,
            slices: vec![],
        }
    }

    /// Use 64-bit slice entries.
    pub fn fat_64(mut self) -> Self {
        self.is_64 = true;
        self
    }

    /// Add a slice, its table entry declares `arch` whatever its content is.
    pub fn with_slice(mut self, arch: Arch, content: Vec<u8>) -> Self {
        self.slices.push((arch, content));
        self
    }

    /// Encode the file, the last slice ends the file.
    pub fn build(&self) -> Vec<u8> {
        let entry_size = if self.is_64 { 32 } else { 20 };
        let alignment = 1_usize << self.align;
        let mut offset = 8 + entry_size * self.slices.len();
        let mut offsets = Vec::with_capacity(self.slices.len());
        for (_, content) in &self.slices {
            offset = offset.next_multiple_of(alignment);
            offsets.push(offset);
            offset += content.len();
        }

        let mut bytes = Vec::new();
        let magic = if self.is_64 { FAT_MAGIC_64 } else { FAT_MAGIC };
        bytes.extend(magic.to_be_bytes());
        bytes.extend((self.slices.len() as u32).to_be_bytes());
        for ((arch, content), offset) in self.slices.iter().zip(&offsets) {
            bytes.extend(arch.cputype.to_be_bytes());
            bytes.extend(arch.cpusubtype.to_be_bytes());
            if self.is_64 {
                bytes.extend((*offset as u64).to_be_bytes());
                bytes.extend((content.len() as u64).to_be_bytes());
                bytes.extend(self.align.to_be_bytes());
                bytes.extend(0_u32.to_be_bytes());
            } else {
                bytes.extend((*offset as u32).to_be_bytes());
                bytes.extend((content.len() as u32).to_be_bytes());
                bytes.extend(self.align.to_be_bytes());
            }
        }
        for ((_, content), offset) in self.slices.iter().zip(&offsets) {
            bytes.resize(*offset, 0);
            bytes.extend(content);
        }

        bytes
    }
}
