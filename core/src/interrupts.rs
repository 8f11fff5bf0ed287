//! Runtime interrupt handler table.
//!
//! Every IDT gate points at a fixed entry stub (see [`crate::trampolines`]).
//! The stubs all funnel into [`kestrel_interrupt_entry`], which looks the
//! vector up here. Changing what a vector does is a pointer swap in this
//! table; the IDT itself is never rebuilt.
//!
//! Registration is a single atomic store per vector, so it is safe against
//! delivery of the same vector at any point. A vector without a handler is
//! fatal: the entry path logs the frame and halts with interrupts disabled.

use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use kestrel_abi::arch::x86::idt::{IDT_ENTRIES, exception_name};
use kestrel_lib::{InterruptFrame, cpu, kdiag_dump_interrupt_frame, klog_error};

/// High-level handler for one vector.
pub type InterruptHandler = fn(&mut InterruptFrame);

/// Result of routing one interrupt through the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The registered handler ran and returned.
    Handled,
    /// No handler is registered; the caller must take the fault path.
    Unhandled,
}

// Null means "no handler".
static HANDLERS: [AtomicPtr<()>; IDT_ENTRIES] =
    [const { AtomicPtr::new(ptr::null_mut()) }; IDT_ENTRIES];

static DELIVERIES: [AtomicU32; IDT_ENTRIES] = [const { AtomicU32::new(0) }; IDT_ENTRIES];

#[inline]
fn decode(raw: *mut ()) -> Option<InterruptHandler> {
    if raw.is_null() {
        None
    } else {
        // SAFETY: only `encode`d `InterruptHandler`s are ever stored.
        Some(unsafe { core::mem::transmute::<*mut (), InterruptHandler>(raw) })
    }
}

#[inline]
fn encode(handler: Option<InterruptHandler>) -> *mut () {
    handler.map_or(ptr::null_mut(), |h| h as *mut ())
}

/// Handler currently registered for `vector`.
pub fn get_handler(vector: u8) -> Option<InterruptHandler> {
    decode(HANDLERS[vector as usize].load(Ordering::Acquire))
}

/// Register `handler` for `vector`, returning the handler it replaces.
pub fn set_handler(vector: u8, handler: InterruptHandler) -> Option<InterruptHandler> {
    decode(HANDLERS[vector as usize].swap(encode(Some(handler)), Ordering::AcqRel))
}

/// Remove the handler for `vector`. Later deliveries take the fault path.
pub fn clear_handler(vector: u8) -> Option<InterruptHandler> {
    decode(HANDLERS[vector as usize].swap(encode(None), Ordering::AcqRel))
}

/// How many times a handler has run for `vector`.
pub fn delivery_count(vector: u8) -> u32 {
    DELIVERIES[vector as usize].load(Ordering::Relaxed)
}

/// Run the handler registered for the frame's vector, once.
pub fn dispatch(frame: &mut InterruptFrame) -> DispatchOutcome {
    let vector = frame.vector();
    let Some(handler) = get_handler(vector) else {
        return DispatchOutcome::Unhandled;
    };
    DELIVERIES[vector as usize].fetch_add(1, Ordering::Relaxed);
    handler(frame);
    DispatchOutcome::Handled
}

/// Default action for a vector nobody claimed.
pub fn unhandled_interrupt(frame: &InterruptFrame) -> ! {
    cpu::disable_interrupts();
    klog_error!(
        "INTERRUPT: unhandled vector {} ({}), halting",
        frame.vector,
        exception_name(frame.vector())
    );
    kdiag_dump_interrupt_frame(frame);
    cpu::halt_forever()
}

/// Called by the common entry stub with a pointer to the saved frame.
///
/// # Safety
/// `frame` must point at the frame built by the entry stub on the current
/// stack.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kestrel_interrupt_entry(frame: *mut InterruptFrame) {
    let Some(frame) = (unsafe { frame.as_mut() }) else {
        klog_error!("INTERRUPT: null frame from entry stub");
        cpu::halt_forever();
    };
    if dispatch(frame) == DispatchOutcome::Unhandled {
        unhandled_interrupt(frame);
    }
}
