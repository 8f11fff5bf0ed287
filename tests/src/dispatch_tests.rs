//! Dispatch table behaviour on synthetic frames. Nothing here raises a
//! real interrupt, so the vectors below are restored before returning.

use core::sync::atomic::{AtomicU32, Ordering};

use kestrel_abi::arch::x86::idt::{
    EXCEPTION_DOUBLE_FAULT, EXCEPTION_GENERAL_PROTECTION, EXCEPTION_PAGE_FAULT, IRQ_BASE_VECTOR,
    IRQ_LINES, exception_name, vector_pushes_error_code,
};
use kestrel_core::{
    DispatchOutcome, clear_handler, delivery_count, dispatch, get_handler, set_handler,
    trampoline_address, vector_for_trampoline,
};
use kestrel_drivers::pic::pic_vector_for_line;
use kestrel_lib::testing::TestResult;
use kestrel_lib::{InterruptFrame, assert_eq_test, assert_test, define_test_suite, fail, pass};

// Unused by the kernel.
const SCRATCH_VECTOR: u8 = 0xF0;

static RUNS: AtomicU32 = AtomicU32::new(0);

fn counting_handler(frame: &mut InterruptFrame) {
    RUNS.fetch_add(1, Ordering::SeqCst);
    frame.eax = frame.vector;
}

pub fn test_dispatch_runs_handler_once() -> TestResult {
    let previous = set_handler(SCRATCH_VECTOR, counting_handler);
    let runs = RUNS.load(Ordering::SeqCst);
    let deliveries = delivery_count(SCRATCH_VECTOR);

    let mut frame = InterruptFrame::for_vector(SCRATCH_VECTOR);
    let outcome = dispatch(&mut frame);

    match previous {
        Some(handler) => {
            set_handler(SCRATCH_VECTOR, handler);
        }
        None => {
            clear_handler(SCRATCH_VECTOR);
        }
    }

    assert_eq_test!(outcome, DispatchOutcome::Handled);
    assert_eq_test!(RUNS.load(Ordering::SeqCst), runs + 1);
    assert_eq_test!(delivery_count(SCRATCH_VECTOR), deliveries + 1);
    assert_eq_test!(frame.eax, SCRATCH_VECTOR as u32);
    pass!()
}

pub fn test_cleared_vector_is_unhandled() -> TestResult {
    let previous = clear_handler(SCRATCH_VECTOR);
    let mut frame = InterruptFrame::for_vector(SCRATCH_VECTOR);
    let outcome = dispatch(&mut frame);
    if let Some(handler) = previous {
        set_handler(SCRATCH_VECTOR, handler);
    }
    assert_eq_test!(outcome, DispatchOutcome::Unhandled);
    pass!()
}

pub fn test_exceptions_have_kernel_handlers() -> TestResult {
    for vector in [
        EXCEPTION_DOUBLE_FAULT,
        EXCEPTION_GENERAL_PROTECTION,
        EXCEPTION_PAGE_FAULT,
    ] {
        assert_test!(
            get_handler(vector).is_some(),
            "no handler for {}",
            exception_name(vector)
        );
        assert_test!(vector_pushes_error_code(vector));
    }
    pass!()
}

pub fn test_trampolines_map_back_to_vectors() -> TestResult {
    for vector in 0..=u8::MAX {
        assert_eq_test!(
            vector_for_trampoline(trampoline_address(vector)),
            Some(vector)
        );
    }
    pass!()
}

pub fn test_irq_lines_avoid_exception_vectors() -> TestResult {
    for line in 0..IRQ_LINES as u8 {
        let Some(vector) = pic_vector_for_line(line) else {
            return fail!("line {} has no vector", line);
        };
        assert_test!(vector >= IRQ_BASE_VECTOR, "line {} on vector {}", line, vector);
    }
    pass!()
}

define_test_suite!(
    dispatch,
    [
        test_dispatch_runs_handler_once,
        test_cleared_vector_is_unhandled,
        test_exceptions_have_kernel_handlers,
        test_trampolines_map_back_to_vectors,
        test_irq_lines_avoid_exception_vectors,
    ]
);
