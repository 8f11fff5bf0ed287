//! Global Descriptor Table (GDT) layouts.
//!
//! This module defines **all** segment-descriptor types, constants, and
//! descriptor constructors for Kestrel. The `boot` crate owns the live table
//! and only installs what is built here.
//!
//! # What lives here
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`SegmentSelector`] | Type-safe segment selector with named constants |
//! | [`SegmentAccess`] | Access byte (bits 40-47) |
//! | [`SegmentFlags`] | Flags nibble (bits 52-55) |
//! | [`SegmentDescriptor`] | 8-byte descriptor with explicit pack/unpack |
//! | [`CodeSegment`] / [`DataSegment`] | Typed settings for code/data descriptors |
//! | `FLAT_*` constants | The flat 4GiB layout used at boot |

use bitflags::bitflags;
use x86_64::PrivilegeLevel;

// =========================================================================
// Segment Selector
// =========================================================================

/// x86 segment selector.
///
/// Layout (16 bits):
/// - Bits 0-1: Requested Privilege Level (RPL)
/// - Bit 2: Table Indicator (0 = GDT, 1 = LDT)
/// - Bits 3-15: Descriptor index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SegmentSelector(pub u16);

impl SegmentSelector {
    /// Null selector (index 0, GDT, RPL 0).
    pub const NULL: Self = Self(0);

    /// Kernel code segment (GDT index 1, RPL 0) = 0x08.
    pub const KERNEL_CODE: Self = Self::new(1, false, PrivilegeLevel::Ring0);

    /// Kernel data segment (GDT index 2, RPL 0) = 0x10.
    pub const KERNEL_DATA: Self = Self::new(2, false, PrivilegeLevel::Ring0);

    /// Create a new segment selector.
    #[inline]
    pub const fn new(index: u16, ldt: bool, rpl: PrivilegeLevel) -> Self {
        let ti = if ldt { 1 << 2 } else { 0 };
        Self((index << 3) | ti | (rpl as u16 & 0x3))
    }

    /// Get the descriptor table index.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Check if this selector references the LDT.
    #[inline]
    pub const fn is_ldt(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    /// Get the requested privilege level.
    #[inline]
    pub fn rpl(self) -> PrivilegeLevel {
        privilege_from_bits(self.0 as u8)
    }

    /// Get the raw selector value for loading into a segment register.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// Decode the low two bits of `bits` as a privilege level.
pub fn privilege_from_bits(bits: u8) -> PrivilegeLevel {
    match bits & 0x3 {
        0 => PrivilegeLevel::Ring0,
        1 => PrivilegeLevel::Ring1,
        2 => PrivilegeLevel::Ring2,
        _ => PrivilegeLevel::Ring3,
    }
}

// =========================================================================
// Access byte (bits 40-47) and flags nibble (bits 52-55)
// =========================================================================

bitflags! {
    /// Segment descriptor access byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SegmentAccess: u8 {
        /// Set by the CPU on first use.
        const ACCESSED = 1 << 0;
        /// Readable (code) or writable (data).
        const READ_WRITE = 1 << 1;
        /// Conforming (code) or expand-down (data).
        const DIRECTION_CONFORMING = 1 << 2;
        const EXECUTABLE = 1 << 3;
        /// Descriptor type: 1 for code/data, 0 for system segments.
        const SEGMENT = 1 << 4;
        const DPL_LOW = 1 << 5;
        const DPL_HIGH = 1 << 6;
        const PRESENT = 1 << 7;
    }
}

impl SegmentAccess {
    /// Privilege bits for `level`.
    #[inline]
    pub const fn with_privilege(level: PrivilegeLevel) -> Self {
        Self::from_bits_retain(((level as u8) & 0x3) << 5)
    }

    /// Descriptor privilege level encoded in bits 5-6.
    #[inline]
    pub fn privilege(self) -> PrivilegeLevel {
        privilege_from_bits(self.bits() >> 5)
    }
}

bitflags! {
    /// Segment descriptor flags nibble.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u8 {
        /// Available for system software.
        const AVAILABLE = 1 << 0;
        /// 64-bit code segment (must be clear in protected mode).
        const LONG_MODE = 1 << 1;
        /// D/B: 32-bit default operand size.
        const SIZE_32 = 1 << 2;
        /// G: limit counts 4KiB pages.
        const GRANULARITY = 1 << 3;
    }
}

/// Largest encodable limit (20 bits).
pub const SEGMENT_LIMIT_MAX: u32 = 0x000F_FFFF;

/// Page size used when [`SegmentFlags::GRANULARITY`] is set.
pub const SEGMENT_GRANULE: u64 = 4096;

// =========================================================================
// Descriptor
// =========================================================================

/// Build a 64-bit segment descriptor from its individual sub-fields.
///
/// Bit layout:
/// - Bits  0-15: Limit (low 16 bits)
/// - Bits 16-31: Base (low 16 bits)
/// - Bits 32-39: Base (middle 8 bits)
/// - Bits 40-47: Access byte
/// - Bits 48-51: Limit (high 4 bits)
/// - Bits 52-55: Flags
/// - Bits 56-63: Base (high 8 bits)
pub const fn make_descriptor(
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    limit_high: u8,
    flags: u8,
    base_high: u8,
) -> u64 {
    (limit_low as u64)
        | ((base_low as u64) << 16)
        | ((base_mid as u64) << 32)
        | ((access as u64) << 40)
        | (((limit_high & 0xF) as u64) << 48)
        | (((flags & 0xF) as u64) << 52)
        | ((base_high as u64) << 56)
}

/// One 8-byte GDT entry.
///
/// Hardware-defined layout: the wrapped `u64` is exactly what the CPU reads.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SegmentDescriptor(u64);

impl SegmentDescriptor {
    /// Null descriptor, mandatory at GDT index 0.
    pub const NULL: Self = Self(0);

    /// Pack `base`, `limit`, `access` and `flags` into the hardware layout.
    ///
    /// Bits beyond each field's width are dropped: `limit` keeps 20 bits and
    /// `flags` keeps 4. Nothing is validated; a nonsensical descriptor only
    /// faults once a selector referencing it is loaded.
    pub const fn build(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        let limit = limit & SEGMENT_LIMIT_MAX;
        Self(make_descriptor(
            (limit & 0xFFFF) as u16,
            (base & 0xFFFF) as u16,
            ((base >> 16) & 0xFF) as u8,
            access,
            ((limit >> 16) & 0xF) as u8,
            flags,
            ((base >> 24) & 0xFF) as u8,
        ))
    }

    /// Build a code segment descriptor.
    pub const fn code(base: u32, limit: u32, settings: CodeSegment) -> Self {
        let mut access = SegmentAccess::SEGMENT.bits() | SegmentAccess::EXECUTABLE.bits();
        if settings.readable {
            access |= SegmentAccess::READ_WRITE.bits();
        }
        if settings.conforming {
            access |= SegmentAccess::DIRECTION_CONFORMING.bits();
        }
        access |= settings.common.access_bits();
        Self::build(base, limit, access, settings.common.flag_bits())
    }

    /// Build a data segment descriptor.
    pub const fn data(base: u32, limit: u32, settings: DataSegment) -> Self {
        let mut access = SegmentAccess::SEGMENT.bits();
        if settings.writable {
            access |= SegmentAccess::READ_WRITE.bits();
        }
        if settings.expand_down {
            access |= SegmentAccess::DIRECTION_CONFORMING.bits();
        }
        access |= settings.common.access_bits();
        Self::build(base, limit, access, settings.common.flag_bits())
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn base(self) -> u32 {
        let low = (self.0 >> 16) & 0xFFFF;
        let mid = (self.0 >> 32) & 0xFF;
        let high = (self.0 >> 56) & 0xFF;
        (low | (mid << 16) | (high << 24)) as u32
    }

    pub const fn limit(self) -> u32 {
        let low = self.0 & 0xFFFF;
        let high = (self.0 >> 48) & 0xF;
        (low | (high << 16)) as u32
    }

    pub const fn access(self) -> u8 {
        (self.0 >> 40) as u8
    }

    pub const fn flags(self) -> u8 {
        ((self.0 >> 52) & 0xF) as u8
    }

    #[inline]
    pub const fn access_flags(self) -> SegmentAccess {
        SegmentAccess::from_bits_retain(self.access())
    }

    #[inline]
    pub const fn segment_flags(self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.flags())
    }

    #[inline]
    pub const fn is_present(self) -> bool {
        self.access_flags().contains(SegmentAccess::PRESENT)
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Number of addressable bytes, honouring the granularity bit.
    pub const fn byte_span(self) -> u64 {
        let units = self.limit() as u64 + 1;
        if self.segment_flags().contains(SegmentFlags::GRANULARITY) {
            units * SEGMENT_GRANULE
        } else {
            units
        }
    }
}

impl core::fmt::Debug for SegmentDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SegmentDescriptor")
            .field("base", &format_args!("0x{:08x}", self.base()))
            .field("limit", &format_args!("0x{:05x}", self.limit()))
            .field("access", &format_args!("0x{:02x}", self.access()))
            .field("flags", &format_args!("0x{:x}", self.flags()))
            .finish()
    }
}

// =========================================================================
// Typed settings
// =========================================================================

/// Settings shared by code and data descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentCommon {
    /// Limit counts 4KiB pages instead of bytes.
    pub granularity: bool,
    pub present: bool,
    pub accessed: bool,
    pub privilege: PrivilegeLevel,
}

impl SegmentCommon {
    /// Present, ring 0, page granular.
    pub const KERNEL: Self = Self {
        granularity: true,
        present: true,
        accessed: false,
        privilege: PrivilegeLevel::Ring0,
    };

    const fn access_bits(self) -> u8 {
        let mut bits = SegmentAccess::with_privilege(self.privilege).bits();
        if self.present {
            bits |= SegmentAccess::PRESENT.bits();
        }
        if self.accessed {
            bits |= SegmentAccess::ACCESSED.bits();
        }
        bits
    }

    // Protected-mode descriptors always use 32-bit operands.
    const fn flag_bits(self) -> u8 {
        let mut bits = SegmentFlags::SIZE_32.bits();
        if self.granularity {
            bits |= SegmentFlags::GRANULARITY.bits();
        }
        bits
    }
}

/// Code segment settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeSegment {
    pub conforming: bool,
    pub readable: bool,
    pub common: SegmentCommon,
}

/// Data segment settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataSegment {
    pub expand_down: bool,
    pub writable: bool,
    pub common: SegmentCommon,
}

// =========================================================================
// Flat layout
// =========================================================================

/// Ring-0 code, execute + read, base 0, 4GiB.
pub const FLAT_KERNEL_CODE: SegmentDescriptor = SegmentDescriptor::code(
    0,
    SEGMENT_LIMIT_MAX,
    CodeSegment {
        conforming: false,
        readable: true,
        common: SegmentCommon::KERNEL,
    },
);

/// Ring-0 data, read + write, base 0, 4GiB.
pub const FLAT_KERNEL_DATA: SegmentDescriptor = SegmentDescriptor::data(
    0,
    SEGMENT_LIMIT_MAX,
    DataSegment {
        expand_down: false,
        writable: true,
        common: SegmentCommon::KERNEL,
    },
);

/// Flat entries in the order expected by the kernel.
///
/// Index 0: null, 1: kernel code, 2: kernel data.
pub const FLAT_ENTRIES: [SegmentDescriptor; 3] = [
    SegmentDescriptor::NULL,
    FLAT_KERNEL_CODE,
    FLAT_KERNEL_DATA,
];

/// Slots in the kernel GDT. Slots past [`FLAT_ENTRIES`] stay null until
/// something claims them.
pub const GDT_ENTRY_COUNT: usize = 8;

// =========================================================================
// Compile-time safety assertions
// =========================================================================

const _: () = {
    assert!(SegmentSelector::KERNEL_CODE.0 == 0x08);
    assert!(SegmentSelector::KERNEL_DATA.0 == 0x10);

    assert!(core::mem::size_of::<SegmentDescriptor>() == 8);

    assert!(FLAT_KERNEL_CODE.raw() == 0x00CF_9A00_0000_FFFF);
    assert!(FLAT_KERNEL_DATA.raw() == 0x00CF_9200_0000_FFFF);

    assert!(FLAT_ENTRIES.len() <= GDT_ENTRY_COUNT);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_selector_values() {
        assert_eq!(SegmentSelector::KERNEL_CODE.bits(), 0x08);
        assert_eq!(SegmentSelector::KERNEL_DATA.bits(), 0x10);
        assert_eq!(SegmentSelector::NULL.index(), 0);
    }

    #[test]
    fn segment_selector_decomposition() {
        let sel = SegmentSelector::new(5, true, PrivilegeLevel::Ring3);
        assert_eq!(sel.index(), 5);
        assert_eq!(sel.rpl(), PrivilegeLevel::Ring3);
        assert!(sel.is_ldt());
    }

    #[test]
    fn build_round_trips_every_field() {
        let cases: [(u32, u32, u8, u8); 5] = [
            (0, 0, 0, 0),
            (0x1234_5678, 0x000A_BCDE, 0x9A, 0xC),
            (0xFFFF_FFFF, SEGMENT_LIMIT_MAX, 0xFF, 0xF),
            (0x00C0_FFEE, 0x0000_0FFF, 0x92, 0x4),
            (0x8000_0001, 0x0008_0000, 0x01, 0x8),
        ];
        for (base, limit, access, flags) in cases {
            let desc = SegmentDescriptor::build(base, limit, access, flags);
            assert_eq!(desc.base(), base);
            assert_eq!(desc.limit(), limit);
            assert_eq!(desc.access(), access);
            assert_eq!(desc.flags(), flags);
        }
    }

    #[test]
    fn oversized_fields_are_truncated_not_rejected() {
        let desc = SegmentDescriptor::build(0, 0x001F_FFFF, 0x92, 0xFC);
        assert_eq!(desc.limit(), 0x000F_FFFF);
        assert_eq!(desc.flags(), 0xC);
        // Truncation must not bleed into the neighbouring base byte.
        assert_eq!(desc.base(), 0);
    }

    #[test]
    fn flat_code_spans_four_gib() {
        let code = FLAT_KERNEL_CODE;
        assert_eq!(code.limit(), 0xFFFFF);
        assert!(code.segment_flags().contains(SegmentFlags::GRANULARITY));
        assert!(code.segment_flags().contains(SegmentFlags::SIZE_32));
        assert!(!code.segment_flags().contains(SegmentFlags::LONG_MODE));
        assert_eq!(code.byte_span(), 1 << 32);
        assert!(code.access_flags().contains(
            SegmentAccess::PRESENT
                | SegmentAccess::SEGMENT
                | SegmentAccess::EXECUTABLE
                | SegmentAccess::READ_WRITE
        ));
        assert_eq!(code.access_flags().privilege(), PrivilegeLevel::Ring0);
    }

    #[test]
    fn flat_data_is_writable_and_not_executable() {
        let data = FLAT_KERNEL_DATA;
        assert!(data.access_flags().contains(SegmentAccess::READ_WRITE));
        assert!(!data.access_flags().contains(SegmentAccess::EXECUTABLE));
        assert_eq!(data.base(), 0);
        assert_eq!(data.byte_span(), 1 << 32);
    }

    #[test]
    fn byte_granular_span_counts_bytes() {
        let desc = SegmentDescriptor::build(0x1000, 0xFFFF, 0x92, 0x4);
        assert_eq!(desc.byte_span(), 0x1_0000);
    }

    #[test]
    fn user_code_settings_encode_dpl_and_conforming() {
        let desc = SegmentDescriptor::code(
            0,
            SEGMENT_LIMIT_MAX,
            CodeSegment {
                conforming: true,
                readable: false,
                common: SegmentCommon {
                    granularity: false,
                    present: true,
                    accessed: true,
                    privilege: PrivilegeLevel::Ring3,
                },
            },
        );
        assert_eq!(desc.access(), 0x80 | 0x60 | 0x10 | 0x08 | 0x04 | 0x01);
        assert_eq!(desc.flags(), 0x4);
        assert_eq!(desc.access_flags().privilege(), PrivilegeLevel::Ring3);
    }

    #[test]
    fn null_descriptor_is_all_zero() {
        assert!(FLAT_ENTRIES[0].is_null());
        assert!(!FLAT_ENTRIES[0].is_present());
    }
}
