//! Interrupt Descriptor Table (IDT) definitions.
//!
//! This module provides constants for CPU exception vectors, hardware IRQ
//! base vectors, the software interrupt vector, and the 32-bit gate
//! descriptor with its explicit pack/unpack routines.

use x86_64::PrivilegeLevel;

use super::gdt::privilege_from_bits;

// =============================================================================
// Gate Types
// =============================================================================

/// Gate type nibble (bits 40-43).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GateKind {
    /// 32-bit task gate.
    Task32 = 0x5,
    /// 16-bit interrupt gate.
    Interrupt16 = 0x6,
    /// 16-bit trap gate.
    Trap16 = 0x7,
    /// 32-bit interrupt gate. Clears IF on entry.
    Interrupt32 = 0xE,
    /// 32-bit trap gate. Leaves IF untouched.
    Trap32 = 0xF,
}

impl GateKind {
    /// Decode a type nibble. Reserved encodings yield `None`.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0xF {
            0x5 => Some(Self::Task32),
            0x6 => Some(Self::Interrupt16),
            0x7 => Some(Self::Trap16),
            0xE => Some(Self::Interrupt32),
            0xF => Some(Self::Trap32),
            _ => None,
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Type attribute byte for a present ring-0 32-bit interrupt gate.
pub const IDT_GATE_INTERRUPT: u8 = 0x8E;

// =============================================================================
// CPU Exception Vectors (0-31)
// =============================================================================

pub const EXCEPTION_DIVIDE_ERROR: u8 = 0;
pub const EXCEPTION_DEBUG: u8 = 1;
pub const EXCEPTION_NMI: u8 = 2;
pub const EXCEPTION_BREAKPOINT: u8 = 3;
pub const EXCEPTION_OVERFLOW: u8 = 4;
pub const EXCEPTION_BOUND_RANGE: u8 = 5;
pub const EXCEPTION_INVALID_OPCODE: u8 = 6;
pub const EXCEPTION_DEVICE_NOT_AVAIL: u8 = 7;
pub const EXCEPTION_DOUBLE_FAULT: u8 = 8;
/// Coprocessor Segment Overrun - vector 9 (reserved on modern parts).
pub const EXCEPTION_COPROCESSOR_OVERRUN: u8 = 9;
pub const EXCEPTION_INVALID_TSS: u8 = 10;
pub const EXCEPTION_SEGMENT_NOT_PRES: u8 = 11;
pub const EXCEPTION_STACK_FAULT: u8 = 12;
pub const EXCEPTION_GENERAL_PROTECTION: u8 = 13;
pub const EXCEPTION_PAGE_FAULT: u8 = 14;
pub const EXCEPTION_RESERVED_15: u8 = 15;
pub const EXCEPTION_FPU_ERROR: u8 = 16;
pub const EXCEPTION_ALIGNMENT_CHECK: u8 = 17;
pub const EXCEPTION_MACHINE_CHECK: u8 = 18;
pub const EXCEPTION_SIMD_FP_EXCEPTION: u8 = 19;
pub const EXCEPTION_VIRTUALIZATION: u8 = 20;
pub const EXCEPTION_CONTROL_PROTECTION: u8 = 21;
// Vectors 22-28 are reserved
pub const EXCEPTION_HYPERVISOR_INJECTION: u8 = 28;
pub const EXCEPTION_VMM_COMMUNICATION: u8 = 29;
pub const EXCEPTION_SECURITY: u8 = 30;

/// First vector available to anything other than CPU exceptions.
pub const FIRST_NON_EXCEPTION_VECTOR: u8 = 32;

// =============================================================================
// Hardware IRQ and Software Interrupt Vectors
// =============================================================================

/// Base vector for the master controller (IRQ0 maps to this vector).
pub const IRQ_BASE_VECTOR: u8 = 32;

/// Base vector for the slave controller (IRQ8 maps to this vector).
pub const IRQ_SLAVE_BASE_VECTOR: u8 = IRQ_BASE_VECTOR + 8;

/// Number of legacy hardware interrupt lines.
pub const IRQ_LINES: usize = 16;

/// Software interrupt vector (int 0x80).
pub const SYSCALL_VECTOR: u8 = 0x80;

// =============================================================================
// IDT Size
// =============================================================================

/// Number of entries in the IDT (256 vectors).
pub const IDT_ENTRIES: usize = 256;

/// Byte size of a full IDT minus one, as loaded into IDTR.
pub const IDT_LIMIT: u16 = (IDT_ENTRIES * core::mem::size_of::<GateDescriptor>() - 1) as u16;

// =============================================================================
// Gate Descriptor
// =============================================================================

/// 32-bit IDT gate.
///
/// Layout must match the hardware-defined format (Intel SDM Vol. 3A, 6.11):
/// - Bits  0-15: Offset (low 16 bits)
/// - Bits 16-31: Segment selector
/// - Bits 32-39: Reserved, zero
/// - Bits 40-43: Gate type
/// - Bit  44:    Storage segment (zero for gates)
/// - Bits 45-46: Descriptor privilege level
/// - Bit  47:    Present
/// - Bits 48-63: Offset (high 16 bits)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct GateDescriptor(u64);

impl GateDescriptor {
    /// Not-present gate. Any delivery through it raises #NP.
    pub const MISSING: Self = Self(0);

    /// Pack a gate. `privilege` keeps its low two bits.
    pub const fn build_gate(
        offset: u32,
        selector: u16,
        gate_type: GateKind,
        privilege: u8,
        present: bool,
    ) -> Self {
        let type_attr = (gate_type as u8 & 0xF)
            | ((privilege & 0x3) << 5)
            | if present { 1 << 7 } else { 0 };
        Self(
            (offset as u64 & 0xFFFF)
                | ((selector as u64) << 16)
                | ((type_attr as u64) << 40)
                | (((offset as u64 >> 16) & 0xFFFF) << 48),
        )
    }

    /// Present ring-0 32-bit interrupt gate into the kernel code segment.
    pub const fn kernel_interrupt(offset: u32) -> Self {
        Self::build_gate(
            offset,
            super::gdt::SegmentSelector::KERNEL_CODE.bits(),
            GateKind::Interrupt32,
            0,
            true,
        )
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn offset(self) -> u32 {
        ((self.0 & 0xFFFF) | ((self.0 >> 48) << 16)) as u32
    }

    pub const fn selector(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Full type attribute byte (type, storage segment, DPL, present).
    pub const fn type_attr(self) -> u8 {
        (self.0 >> 40) as u8
    }

    pub const fn gate_type_bits(self) -> u8 {
        self.type_attr() & 0xF
    }

    pub const fn gate_type(self) -> Option<GateKind> {
        GateKind::from_bits(self.gate_type_bits())
    }

    pub const fn privilege_bits(self) -> u8 {
        (self.type_attr() >> 5) & 0x3
    }

    pub fn privilege(self) -> PrivilegeLevel {
        privilege_from_bits(self.privilege_bits())
    }

    pub const fn is_present(self) -> bool {
        self.type_attr() & 0x80 != 0
    }
}

impl core::fmt::Debug for GateDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GateDescriptor")
            .field("offset", &format_args!("0x{:08x}", self.offset()))
            .field("selector", &format_args!("0x{:04x}", self.selector()))
            .field("type_attr", &format_args!("0x{:02x}", self.type_attr()))
            .finish()
    }
}

// =============================================================================
// Vector helpers
// =============================================================================

/// Whether the CPU pushes an error code before entering `vector`.
///
/// Entry stubs for every other vector push a zero so all frames share one
/// layout.
pub const fn vector_pushes_error_code(vector: u8) -> bool {
    matches!(
        vector,
        EXCEPTION_DOUBLE_FAULT
            | EXCEPTION_INVALID_TSS
            | EXCEPTION_SEGMENT_NOT_PRES
            | EXCEPTION_STACK_FAULT
            | EXCEPTION_GENERAL_PROTECTION
            | EXCEPTION_PAGE_FAULT
            | EXCEPTION_ALIGNMENT_CHECK
            | EXCEPTION_CONTROL_PROTECTION
            | EXCEPTION_VMM_COMMUNICATION
            | EXCEPTION_SECURITY
    )
}

/// Human readable name of a vector, for diagnostics.
pub fn exception_name(vector: u8) -> &'static str {
    match vector {
        EXCEPTION_DIVIDE_ERROR => "Divide Error",
        EXCEPTION_DEBUG => "Debug",
        EXCEPTION_NMI => "Non-Maskable Interrupt",
        EXCEPTION_BREAKPOINT => "Breakpoint",
        EXCEPTION_OVERFLOW => "Overflow",
        EXCEPTION_BOUND_RANGE => "Bound Range Exceeded",
        EXCEPTION_INVALID_OPCODE => "Invalid Opcode",
        EXCEPTION_DEVICE_NOT_AVAIL => "Device Not Available",
        EXCEPTION_DOUBLE_FAULT => "Double Fault",
        EXCEPTION_COPROCESSOR_OVERRUN => "Coprocessor Segment Overrun",
        EXCEPTION_INVALID_TSS => "Invalid TSS",
        EXCEPTION_SEGMENT_NOT_PRES => "Segment Not Present",
        EXCEPTION_STACK_FAULT => "Stack Fault",
        EXCEPTION_GENERAL_PROTECTION => "General Protection",
        EXCEPTION_PAGE_FAULT => "Page Fault",
        EXCEPTION_FPU_ERROR => "x87 FPU Error",
        EXCEPTION_ALIGNMENT_CHECK => "Alignment Check",
        EXCEPTION_MACHINE_CHECK => "Machine Check",
        EXCEPTION_SIMD_FP_EXCEPTION => "SIMD Floating Point",
        EXCEPTION_VIRTUALIZATION => "Virtualization",
        EXCEPTION_CONTROL_PROTECTION => "Control Protection",
        EXCEPTION_HYPERVISOR_INJECTION => "Hypervisor Injection",
        EXCEPTION_VMM_COMMUNICATION => "VMM Communication",
        EXCEPTION_SECURITY => "Security",
        15 | 22..=27 | 31 => "Reserved",
        SYSCALL_VECTOR => "Software Interrupt",
        IRQ_BASE_VECTOR..=0x2F => "Hardware IRQ",
        _ => "Unknown",
    }
}

// =============================================================================
// Compile-time safety assertions
// =============================================================================

const _: () = {
    assert!(core::mem::size_of::<GateDescriptor>() == 8);
    assert!(IDT_LIMIT == 2047);
    assert!(IRQ_BASE_VECTOR >= FIRST_NON_EXCEPTION_VECTOR);
    assert!(GateDescriptor::kernel_interrupt(0).type_attr() == IDT_GATE_INTERRUPT);
};
