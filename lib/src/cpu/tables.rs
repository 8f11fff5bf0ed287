//! Descriptor table registers: lgdt/lidt, sgdt/sidt, segment reload.
//!
//! Hosted builds record every load so the installed tables can be read back
//! through [`sgdt`] / [`sidt`] exactly as on hardware, together with the
//! interrupt state observed at load time.

use kestrel_abi::arch::x86::{DescriptorTablePointer, SegmentSelector};

#[cfg(target_os = "none")]
mod imp {
    use core::arch::asm;

    use kestrel_abi::arch::x86::{DescriptorTablePointer, SegmentSelector};

    #[inline(always)]
    pub unsafe fn lgdt(ptr: &DescriptorTablePointer) {
        unsafe { asm!("lgdt [{0}]", in(reg) ptr, options(readonly, nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub unsafe fn lidt(ptr: &DescriptorTablePointer) {
        unsafe { asm!("lidt [{0}]", in(reg) ptr, options(readonly, nostack, preserves_flags)) };
    }

    #[inline(always)]
    pub fn sgdt() -> DescriptorTablePointer {
        let mut ptr = DescriptorTablePointer::NULL;
        unsafe {
            asm!("sgdt [{0}]", in(reg) &mut ptr, options(nostack, preserves_flags));
        }
        ptr
    }

    #[inline(always)]
    pub fn sidt() -> DescriptorTablePointer {
        let mut ptr = DescriptorTablePointer::NULL;
        unsafe {
            asm!("sidt [{0}]", in(reg) &mut ptr, options(nostack, preserves_flags));
        }
        ptr
    }

    pub unsafe fn reload_segments(code: SegmentSelector, data: SegmentSelector) {
        unsafe {
            asm!(
                "pushl {code:e}",
                "leal 2f, {tmp:e}",
                "pushl {tmp:e}",
                "lretl",
                "2:",
                "movw {data:x}, %ds",
                "movw {data:x}, %es",
                "movw {data:x}, %fs",
                "movw {data:x}, %gs",
                "movw {data:x}, %ss",
                code = in(reg) code.bits() as u32,
                data = in(reg) data.bits() as u32,
                tmp = out(reg) _,
                options(att_syntax)
            );
        }
    }
}

#[cfg(not(target_os = "none"))]
mod imp {
    use kestrel_abi::arch::x86::{DescriptorTablePointer, SegmentSelector};
    use spin::Mutex;

    use super::TableLoad;
    use crate::cpu::interrupts::are_interrupts_enabled;

    static GDTR: Mutex<TableLoad> = Mutex::new(TableLoad::NONE);
    static IDTR: Mutex<TableLoad> = Mutex::new(TableLoad::NONE);
    static SEGMENTS: Mutex<Option<(SegmentSelector, SegmentSelector)>> = Mutex::new(None);

    fn record(register: &Mutex<TableLoad>, ptr: &DescriptorTablePointer) {
        let mut reg = register.lock();
        reg.pointer = *ptr;
        reg.interrupts_enabled = are_interrupts_enabled();
        reg.count += 1;
    }

    pub unsafe fn lgdt(ptr: &DescriptorTablePointer) {
        record(&GDTR, ptr);
    }

    pub unsafe fn lidt(ptr: &DescriptorTablePointer) {
        record(&IDTR, ptr);
    }

    pub fn sgdt() -> DescriptorTablePointer {
        GDTR.lock().pointer
    }

    pub fn sidt() -> DescriptorTablePointer {
        IDTR.lock().pointer
    }

    pub unsafe fn reload_segments(code: SegmentSelector, data: SegmentSelector) {
        *SEGMENTS.lock() = Some((code, data));
    }

    pub fn last_gdt_load() -> TableLoad {
        *GDTR.lock()
    }

    pub fn last_idt_load() -> TableLoad {
        *IDTR.lock()
    }

    pub fn loaded_segments() -> Option<(SegmentSelector, SegmentSelector)> {
        *SEGMENTS.lock()
    }
}

/// A table register load as seen by the hosted model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableLoad {
    pub pointer: DescriptorTablePointer,
    /// Interrupt flag at the moment of the load.
    pub interrupts_enabled: bool,
    /// Number of loads so far.
    pub count: u32,
}

impl TableLoad {
    pub const NONE: Self = Self {
        pointer: DescriptorTablePointer::NULL,
        interrupts_enabled: false,
        count: 0,
    };
}

/// Load GDTR.
///
/// # Safety
/// `ptr` must describe a valid GDT that outlives its installation.
#[inline(always)]
pub unsafe fn lgdt(ptr: &DescriptorTablePointer) {
    unsafe { imp::lgdt(ptr) }
}

/// Load IDTR.
///
/// # Safety
/// `ptr` must describe a valid IDT that outlives its installation.
#[inline(always)]
pub unsafe fn lidt(ptr: &DescriptorTablePointer) {
    unsafe { imp::lidt(ptr) }
}

/// Read GDTR.
#[inline(always)]
pub fn sgdt() -> DescriptorTablePointer {
    imp::sgdt()
}

/// Read IDTR.
#[inline(always)]
pub fn sidt() -> DescriptorTablePointer {
    imp::sidt()
}

/// Far-return into `code` and load `data` into every data segment register.
///
/// # Safety
/// Both selectors must name present descriptors of the right kind in the
/// currently loaded GDT.
#[inline]
pub unsafe fn reload_segments(code: SegmentSelector, data: SegmentSelector) {
    unsafe { imp::reload_segments(code, data) }
}

/// Most recent GDTR load (hosted model only).
#[cfg(not(target_os = "none"))]
pub fn last_gdt_load() -> TableLoad {
    imp::last_gdt_load()
}

/// Most recent IDTR load (hosted model only).
#[cfg(not(target_os = "none"))]
pub fn last_idt_load() -> TableLoad {
    imp::last_idt_load()
}

/// Selectors passed to the last segment reload (hosted model only).
#[cfg(not(target_os = "none"))]
pub fn loaded_segments() -> Option<(SegmentSelector, SegmentSelector)> {
    imp::loaded_segments()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::interrupts::{HOSTED_CPU_LOCK, without_interrupts};

    #[test]
    fn hosted_registers_read_back_loads() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        static TABLE: [u64; 4] = [0; 4];
        let ptr = DescriptorTablePointer::for_table(&TABLE);

        let before = last_idt_load().count;
        without_interrupts(|| unsafe { lidt(&ptr) });

        assert_eq!(sidt(), ptr);
        let load = last_idt_load();
        assert_eq!(load.count, before + 1);
        assert_eq!(load.pointer.entry_count::<u64>(), 4);
    }
}
