//! Live interrupt descriptor table.
//!
//! Every slot points at its vector's trampoline, so activating the table
//! never exposes a missing gate. What a vector does is decided later by the
//! dispatch table in `kestrel-core`.

use kestrel_abi::arch::x86::idt::{IDT_ENTRIES, exception_name};
use kestrel_abi::arch::x86::{DescriptorTablePointer, GateDescriptor};
use kestrel_core::trampoline_address;
use kestrel_lib::cpu::{lidt, sidt, without_interrupts};
use kestrel_lib::{InitFlag, IrqMutex, klog_debug, klog_warn};

static IDT: IrqMutex<[GateDescriptor; IDT_ENTRIES]> =
    IrqMutex::new([GateDescriptor::MISSING; IDT_ENTRIES]);
static IDT_BUILT: InitFlag = InitFlag::new();
static IDT_INSTALLED: InitFlag = InitFlag::new();

/// Gate routing `vector` to its trampoline.
pub fn trampoline_gate(vector: u8) -> GateDescriptor {
    GateDescriptor::kernel_interrupt(trampoline_address(vector) as u32)
}

/// Fill all 256 slots with ring-0 interrupt gates to the trampolines.
pub fn idt_build() {
    {
        let mut table = IDT.lock();
        for (vector, gate) in table.iter_mut().enumerate() {
            *gate = trampoline_gate(vector as u8);
        }
    }
    IDT_BUILT.mark_set();
    klog_debug!("IDT: {} gates point at the vector trampolines", IDT_ENTRIES);
}

/// Point IDTR at `table` with interrupts disabled.
///
/// # Safety
/// `table` must stay at its address for as long as it is installed and
/// every present gate must lead to valid entry code.
pub unsafe fn idt_load(table: &[GateDescriptor; IDT_ENTRIES]) {
    let pointer = DescriptorTablePointer::for_table(&table[..]);
    without_interrupts(|| unsafe { lidt(&pointer) });
}

/// Install the kernel's table, building it first if nobody has.
pub fn idt_install() {
    if !IDT_BUILT.is_set() {
        idt_build();
    }
    {
        let table = IDT.lock();
        // SAFETY: the table is a static and every slot targets a trampoline.
        unsafe { idt_load(&table) };
    }
    IDT_INSTALLED.mark_set();
    klog_debug!("IDT: installed");
}

pub fn idt_is_installed() -> bool {
    IDT_INSTALLED.is_set()
}

pub fn idt_get_gate(vector: u8) -> GateDescriptor {
    IDT.lock()[vector as usize]
}

/// Rewrite one slot. The live table sees the change on the next delivery.
pub fn idt_set_gate(vector: u8, gate: GateDescriptor) {
    if !gate.is_present() {
        klog_warn!(
            "IDT: vector {} ({}) marked not present",
            vector,
            exception_name(vector)
        );
    }
    IDT.lock()[vector as usize] = gate;
}

/// Current IDTR contents.
pub fn idt_current_pointer() -> DescriptorTablePointer {
    sidt()
}

/// Read the gate for `vector` through the live IDTR.
pub fn idt_read_back(vector: u8) -> Option<GateDescriptor> {
    let pointer = sidt();
    let base = pointer.base;
    if base == 0 || vector as usize >= pointer.entry_count::<GateDescriptor>() {
        return None;
    }
    // SAFETY: IDTR only ever points at a table installed by `idt_load`.
    let gate = unsafe {
        core::ptr::read_volatile((base as *const GateDescriptor).add(vector as usize))
    };
    Some(gate)
}

/// Software model of the CPU taking `vector` through the installed IDT.
///
/// Resolves the gate via IDTR, follows its offset back to a trampoline and
/// runs the dispatcher on a frame shaped like the one the trampoline builds.
#[cfg(not(target_os = "none"))]
pub fn deliver(vector: u8) -> kestrel_core::DispatchOutcome {
    use kestrel_core::{DispatchOutcome, dispatch};
    use kestrel_lib::InterruptFrame;

    let Some(gate) = idt_read_back(vector).filter(|g| g.is_present()) else {
        return DispatchOutcome::Unhandled;
    };
    let target = (0..=u8::MAX).find(|v| trampoline_address(*v) as u32 == gate.offset());
    let Some(target) = target else {
        return DispatchOutcome::Unhandled;
    };

    let mut frame = InterruptFrame::for_vector(target);
    frame.cs = gate.selector() as u32;
    dispatch(&mut frame)
}
