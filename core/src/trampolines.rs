//! The 256 interrupt entry stubs.
//!
//! Each stub is 16 bytes apart, so the entry point of vector `v` is
//! `isr_stub_table + 16 * v`. A stub pushes a zero error code when the CPU
//! does not push one, pushes its vector number and jumps to `isr_common`.
//! `isr_common` saves the general purpose and data segment registers, loads
//! the kernel data selector, and calls
//! [`kestrel_interrupt_entry`](crate::interrupts::kestrel_interrupt_entry)
//! with a pointer to the resulting [`InterruptFrame`](kestrel_lib::InterruptFrame).
//!
//! Hosts that are not 32-bit x86 get a placeholder table with the same
//! geometry so that IDT construction can be exercised in unit tests.

use kestrel_abi::arch::x86::idt::IDT_ENTRIES;

/// Distance between consecutive stubs.
pub const TRAMPOLINE_STRIDE: usize = 16;

/// Bit `v` set when the CPU pushes an error code for vector `v` (< 32).
pub const ERROR_CODE_VECTOR_MASK: u32 = 0x6022_7D00;

#[cfg(target_arch = "x86")]
mod stubs {
    use kestrel_abi::arch::x86::gdt::SegmentSelector;

    use super::{ERROR_CODE_VECTOR_MASK, TRAMPOLINE_STRIDE};

    core::arch::global_asm!(
        r#"
        .pushsection .text.isr_stubs, "ax"
        .balign {stride}
        .global isr_stub_table
    isr_stub_table:
        .set isr_vector, 0
        .rept 256
        .balign {stride}
        .set isr_has_error, 0
        .if isr_vector < 32
        .set isr_has_error, ({mask} >> isr_vector) & 1
        .endif
        .if isr_has_error == 0
        pushl $0
        .endif
        pushl $isr_vector
        jmp isr_common
        .set isr_vector, isr_vector + 1
        .endr

    isr_common:
        pushal
        pushl %ds
        pushl %es
        pushl %fs
        pushl %gs
        movw ${data}, %ax
        movw %ax, %ds
        movw %ax, %es
        movw %ax, %fs
        movw %ax, %gs
        cld
        pushl %esp
        call kestrel_interrupt_entry
        addl $4, %esp
        popl %gs
        popl %fs
        popl %es
        popl %ds
        popal
        addl $8, %esp
        iret
        .popsection
        "#,
        stride = const TRAMPOLINE_STRIDE,
        mask = const ERROR_CODE_VECTOR_MASK,
        data = const SegmentSelector::KERNEL_DATA.bits(),
        options(att_syntax)
    );

    unsafe extern "C" {
        static isr_stub_table: u8;
    }

    #[inline]
    pub fn table_base() -> usize {
        (&raw const isr_stub_table) as usize
    }
}

#[cfg(not(target_arch = "x86"))]
mod stubs {
    use kestrel_abi::arch::x86::idt::IDT_ENTRIES;

    use super::TRAMPOLINE_STRIDE;

    #[repr(C, align(16))]
    struct PlaceholderStubs([[u8; TRAMPOLINE_STRIDE]; IDT_ENTRIES]);

    // int3 filler; never executed.
    static PLACEHOLDER: PlaceholderStubs =
        PlaceholderStubs([[0xCC; TRAMPOLINE_STRIDE]; IDT_ENTRIES]);

    #[inline]
    pub fn table_base() -> usize {
        PLACEHOLDER.0.as_ptr() as usize
    }
}

/// Entry stub address for `vector`.
#[inline]
pub fn trampoline_address(vector: u8) -> usize {
    stubs::table_base() + vector as usize * TRAMPOLINE_STRIDE
}

/// Vector whose stub starts at `address`, if any.
pub fn vector_for_trampoline(address: usize) -> Option<u8> {
    let offset = address.checked_sub(stubs::table_base())?;
    if offset % TRAMPOLINE_STRIDE != 0 {
        return None;
    }
    let index = offset / TRAMPOLINE_STRIDE;
    if index < IDT_ENTRIES {
        Some(index as u8)
    } else {
        None
    }
}
