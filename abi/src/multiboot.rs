//! Multiboot v1 boot information record.
//!
//! The kernel only tests the `flags` word; the remaining fields are carried
//! so the record can be logged and handed on unchanged.

use bitflags::bitflags;

/// Magic placed in the image header for the boot loader to find.
pub const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Magic the boot loader leaves in `eax` when it jumps to the kernel.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Header flags: align modules on page boundaries, provide memory info.
pub const MULTIBOOT_HEADER_FLAGS: u32 = 0x0000_0003;

/// Header checksum: magic + flags + checksum wraps to zero.
pub const MULTIBOOT_HEADER_CHECKSUM: u32 =
    0u32.wrapping_sub(MULTIBOOT_HEADER_MAGIC.wrapping_add(MULTIBOOT_HEADER_FLAGS));

bitflags! {
    /// Sections of [`MultibootInfo`] the boot loader filled in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BootInfoFlags: u32 {
        const MEM = 1 << 0;
        const BOOT_DEVICE = 1 << 1;
        const CMDLINE = 1 << 2;
        const MODULES = 1 << 3;
        const AOUT_SYM = 1 << 4;
        const ELF_SYM = 1 << 5;
        const MMAP = 1 << 6;
    }
}

/// Boot information record as laid out by the boot loader.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct MultibootInfo {
    pub flags: u32,
    /// KiB of memory below 1MiB.
    pub mem_lower: u32,
    /// KiB of memory above 1MiB.
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline_addr: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    /// ELF section header table (or a.out symbol table, per `flags`).
    pub shdr_num: u32,
    pub shdr_size: u32,
    pub shdr_addr: u32,
    pub shdr_shndx: u32,
    pub mmap_length: u32,
    pub mmap_addr: u32,
}

impl MultibootInfo {
    /// Flags word with unknown bits dropped.
    #[inline]
    pub fn info_flags(&self) -> BootInfoFlags {
        BootInfoFlags::from_bits_truncate(self.flags)
    }

    #[inline]
    pub fn has(&self, section: BootInfoFlags) -> bool {
        self.info_flags().contains(section)
    }

    /// Whether any symbol table (a.out or ELF) was provided.
    pub fn has_symbols(&self) -> bool {
        self.info_flags()
            .intersects(BootInfoFlags::AOUT_SYM | BootInfoFlags::ELF_SYM)
    }
}

const _: () = {
    assert!(core::mem::size_of::<MultibootInfo>() == 13 * 4);
    assert!(
        MULTIBOOT_HEADER_MAGIC
            .wrapping_add(MULTIBOOT_HEADER_FLAGS)
            .wrapping_add(MULTIBOOT_HEADER_CHECKSUM)
            == 0
    );
};
