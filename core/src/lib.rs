//! Vector dispatch: the 256 fixed entry stubs and the runtime handler table
//! they forward to.

#![cfg_attr(not(test), no_std)]

pub mod interrupts;
pub mod trampolines;

pub use interrupts::{
    DispatchOutcome, InterruptHandler, clear_handler, delivery_count, dispatch, get_handler,
    set_handler,
};
pub use trampolines::{TRAMPOLINE_STRIDE, trampoline_address, vector_for_trampoline};
