use kestrel_abi::arch::x86::idt::{IRQ_BASE_VECTOR, IRQ_SLAVE_BASE_VECTOR};
use kestrel_lib::testing::TestResult;
use kestrel_lib::{assert_eq_test, assert_test, define_test_suite, pass};

use crate::irq::{IrqOutcome, irq_dispatch, irq_line_stats};
use crate::pic::{
    PicState, pic_is_masked, pic_line_for_vector, pic_mask_line, pic_masks, pic_remap,
    pic_set_masks, pic_state, pic_unmask_line, pic_vector_for_line,
};
use kestrel_lib::InterruptFrame;

// Line 6 is the floppy controller, absent on the test machine.
const SCRATCH_LINE: u8 = 6;

pub fn test_pic_is_remapped() -> TestResult {
    assert_eq_test!(pic_state(), PicState::Remapped);
    assert_eq_test!(pic_vector_for_line(0), Some(IRQ_BASE_VECTOR));
    assert_eq_test!(pic_vector_for_line(8), Some(IRQ_SLAVE_BASE_VECTOR));
    assert_eq_test!(pic_line_for_vector(IRQ_BASE_VECTOR - 1), None);
    pass!()
}

pub fn test_pic_remap_preserves_masks() -> TestResult {
    let before = pic_masks();
    pic_remap(IRQ_BASE_VECTOR, IRQ_SLAVE_BASE_VECTOR);
    assert_eq_test!(pic_masks(), before, "masks changed across remap");
    pass!()
}

pub fn test_pic_mask_round_trip() -> TestResult {
    let saved = pic_masks();

    pic_unmask_line(SCRATCH_LINE);
    assert_test!(!pic_is_masked(SCRATCH_LINE));
    pic_mask_line(SCRATCH_LINE);
    assert_test!(pic_is_masked(SCRATCH_LINE));

    pic_set_masks(saved.0, saved.1);
    assert_eq_test!(pic_masks(), saved);
    pass!()
}

pub fn test_pic_invalid_line_is_masked() -> TestResult {
    assert_test!(pic_is_masked(16));
    assert_eq_test!(pic_vector_for_line(16), None);
    pass!()
}

pub fn test_irq_unhandled_line_gets_masked() -> TestResult {
    let saved = pic_masks();
    let mut frame = InterruptFrame::for_vector(IRQ_BASE_VECTOR + SCRATCH_LINE);

    let outcome = irq_dispatch(&mut frame);
    assert_eq_test!(outcome, IrqOutcome::Unhandled);
    assert_test!(pic_is_masked(SCRATCH_LINE));
    assert_test!(irq_line_stats(SCRATCH_LINE).is_some_and(|s| s.masked && s.count >= 1));

    pic_set_masks(saved.0, saved.1);
    pass!()
}

define_test_suite!(
    pic,
    [
        test_pic_is_remapped,
        test_pic_remap_preserves_masks,
        test_pic_mask_round_trip,
        test_pic_invalid_line_is_masked,
        test_irq_unhandled_line_gets_masked,
    ]
);
