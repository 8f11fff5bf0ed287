//! Interrupt delivery through the live IDT and the real entry stubs.

use core::sync::atomic::{AtomicU32, Ordering};

use kestrel_abi::arch::x86::SegmentSelector;
use kestrel_abi::arch::x86::idt::{EXCEPTION_BREAKPOINT, IDT_ENTRIES, IDT_LIMIT, SYSCALL_VECTOR};
use kestrel_core::{delivery_count, get_handler, set_handler, trampoline_address};
use kestrel_lib::testing::TestResult;
use kestrel_lib::{
    InterruptFrame, assert_eq_test, assert_test, cpu, define_test_suite, fail, pass,
};

use crate::idt::{idt_current_pointer, idt_read_back};

static SEEN_VECTOR: AtomicU32 = AtomicU32::new(u32::MAX);
static SEEN_CS: AtomicU32 = AtomicU32::new(0);
static SEEN_ERROR: AtomicU32 = AtomicU32::new(u32::MAX);

fn record_frame(frame: &mut InterruptFrame) {
    SEEN_VECTOR.store(frame.vector, Ordering::SeqCst);
    SEEN_CS.store(frame.cs, Ordering::SeqCst);
    SEEN_ERROR.store(frame.error_code, Ordering::SeqCst);
}

fn reset_seen() {
    SEEN_VECTOR.store(u32::MAX, Ordering::SeqCst);
    SEEN_CS.store(0, Ordering::SeqCst);
    SEEN_ERROR.store(u32::MAX, Ordering::SeqCst);
}

pub fn test_idtr_covers_all_vectors() -> TestResult {
    let pointer = idt_current_pointer();
    let limit = pointer.limit;
    assert_eq_test!(limit, IDT_LIMIT);
    for vector in 0..IDT_ENTRIES {
        let vector = vector as u8;
        let Some(gate) = idt_read_back(vector) else {
            return fail!("vector {} beyond IDTR", vector);
        };
        assert_test!(gate.is_present(), "vector {} not present", vector);
        assert_eq_test!(gate.offset() as usize, trampoline_address(vector));
        assert_eq_test!(gate.selector(), SegmentSelector::KERNEL_CODE.bits());
    }
    pass!()
}

pub fn test_software_interrupt_reaches_handler() -> TestResult {
    let previous = get_handler(SYSCALL_VECTOR);
    set_handler(SYSCALL_VECTOR, record_frame);
    reset_seen();

    let before = delivery_count(SYSCALL_VECTOR);
    unsafe { cpu::raise_software_interrupt() };
    let after = delivery_count(SYSCALL_VECTOR);

    if let Some(previous) = previous {
        set_handler(SYSCALL_VECTOR, previous);
    }

    assert_eq_test!(after, before + 1, "delivery count");
    assert_eq_test!(SEEN_VECTOR.load(Ordering::SeqCst), SYSCALL_VECTOR as u32);
    assert_eq_test!(
        SEEN_CS.load(Ordering::SeqCst),
        SegmentSelector::KERNEL_CODE.bits() as u32
    );
    assert_eq_test!(SEEN_ERROR.load(Ordering::SeqCst), 0, "dummy error code");
    pass!()
}

pub fn test_breakpoint_resumes() -> TestResult {
    let previous = get_handler(EXCEPTION_BREAKPOINT);
    set_handler(EXCEPTION_BREAKPOINT, record_frame);
    reset_seen();

    unsafe { cpu::raise_breakpoint() };

    if let Some(previous) = previous {
        set_handler(EXCEPTION_BREAKPOINT, previous);
    }

    assert_eq_test!(
        SEEN_VECTOR.load(Ordering::SeqCst),
        EXCEPTION_BREAKPOINT as u32
    );
    pass!()
}

pub fn test_interrupt_flag_survives_delivery() -> TestResult {
    let was_enabled = cpu::are_interrupts_enabled();
    unsafe { cpu::raise_software_interrupt() };
    assert_eq_test!(cpu::are_interrupts_enabled(), was_enabled);
    pass!()
}

define_test_suite!(
    idt,
    [
        test_idtr_covers_all_vectors,
        test_software_interrupt_reaches_handler,
        test_breakpoint_resumes,
        test_interrupt_flag_survives_delivery,
    ]
);
