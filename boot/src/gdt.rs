//! Live segment descriptor table.
//!
//! The kernel runs on the flat layout from [`FLAT_ENTRIES`]; the remaining
//! slots stay null until something claims them with [`gdt_set_entry`].

use kestrel_abi::arch::x86::gdt::{FLAT_ENTRIES, GDT_ENTRY_COUNT};
use kestrel_abi::arch::x86::{DescriptorTablePointer, SegmentDescriptor, SegmentSelector};
use kestrel_lib::cpu::{lgdt, reload_segments, sgdt, without_interrupts};
use kestrel_lib::{InitFlag, IrqMutex, klog_debug, klog_warn};

static GDT: IrqMutex<[SegmentDescriptor; GDT_ENTRY_COUNT]> = IrqMutex::new(initial_table());
static GDT_INSTALLED: InitFlag = InitFlag::new();

const fn initial_table() -> [SegmentDescriptor; GDT_ENTRY_COUNT] {
    let mut table = [SegmentDescriptor::NULL; GDT_ENTRY_COUNT];
    let mut i = 0;
    while i < FLAT_ENTRIES.len() {
        table[i] = FLAT_ENTRIES[i];
        i += 1;
    }
    table
}

/// Point GDTR at `table` and reload every segment register with the kernel
/// selectors. Interrupts are disabled for the whole switch.
///
/// # Safety
/// `table` must stay at its address for as long as it is installed, and
/// must hold a ring-0 code descriptor at index 1 and a ring-0 data
/// descriptor at index 2.
pub unsafe fn gdt_load(table: &[SegmentDescriptor]) {
    let pointer = DescriptorTablePointer::for_table(table);
    without_interrupts(|| unsafe {
        lgdt(&pointer);
        reload_segments(SegmentSelector::KERNEL_CODE, SegmentSelector::KERNEL_DATA);
    });
}

/// Install the kernel's table.
pub fn gdt_install() {
    {
        let table = GDT.lock();
        // SAFETY: the table is a static and the flat entries occupy slots 1 and 2.
        unsafe { gdt_load(&table[..]) };
    }
    GDT_INSTALLED.mark_set();

    let pointer = sgdt();
    let (base, limit) = (pointer.base, pointer.limit);
    klog_debug!("GDT: installed at 0x{:08x}, limit {}", base, limit);
}

pub fn gdt_is_installed() -> bool {
    GDT_INSTALLED.is_set()
}

/// Replace slot `index`. Slot 0 stays null and the kernel segments cannot be
/// overwritten once the table is live.
pub fn gdt_set_entry(index: usize, descriptor: SegmentDescriptor) -> bool {
    let kernel_slot = index == SegmentSelector::KERNEL_CODE.index() as usize
        || index == SegmentSelector::KERNEL_DATA.index() as usize;
    if index == 0 || index >= GDT_ENTRY_COUNT || (kernel_slot && gdt_is_installed()) {
        klog_warn!("GDT: refusing to replace entry {}", index);
        return false;
    }
    GDT.lock()[index] = descriptor;
    true
}

/// Slot `index` of the kernel table, whether or not it is installed.
pub fn gdt_entry(index: usize) -> Option<SegmentDescriptor> {
    GDT.lock().get(index).copied()
}

/// Current GDTR contents.
pub fn gdt_current_pointer() -> DescriptorTablePointer {
    sgdt()
}

/// Read slot `index` through the live GDTR.
pub fn gdt_read_back(index: usize) -> Option<SegmentDescriptor> {
    let pointer = sgdt();
    let base = pointer.base;
    if base == 0 || index >= pointer.entry_count::<SegmentDescriptor>() {
        return None;
    }
    // SAFETY: GDTR only ever points at a table installed by `gdt_load`,
    // whose contract keeps it alive, and `index` is within its limit.
    let entry = unsafe { core::ptr::read_volatile((base as *const SegmentDescriptor).add(index)) };
    Some(entry)
}
