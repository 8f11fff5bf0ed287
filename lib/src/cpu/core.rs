//! Primitive CPU instructions: hlt and the halt loops.

/// Execute the HLT instruction, halting the CPU until the next interrupt.
#[cfg(target_os = "none")]
#[inline(always)]
pub fn hlt() {
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }
}

/// Hosted stand-in for HLT.
#[cfg(not(target_os = "none"))]
#[inline(always)]
pub fn hlt() {
    core::hint::spin_loop();
}

/// Halt forever in a loop. Does not return.
#[inline(always)]
pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}

/// Disable interrupts and halt forever.
///
/// The terminal state for unrecoverable faults: nothing, not even an NMI
/// returning through `iret`, resumes execution.
#[cfg(target_os = "none")]
#[inline(always)]
pub fn halt_forever() -> ! {
    super::interrupts::disable_interrupts();
    halt_loop()
}

/// Hosted stand-in: a halted machine with interrupts off never runs again,
/// so the calling thread unwinds instead of spinning.
#[cfg(not(target_os = "none"))]
pub fn halt_forever() -> ! {
    super::interrupts::disable_interrupts();
    panic!("cpu halted with interrupts disabled")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{HOSTED_CPU_LOCK, are_interrupts_enabled, enable_interrupts};

    #[test]
    fn halt_forever_leaves_interrupts_disabled() {
        let _cpu = HOSTED_CPU_LOCK.lock();
        enable_interrupts();
        let halted = std::panic::catch_unwind(|| {
            halt_forever();
        });
        assert!(halted.is_err());
        assert!(!are_interrupts_enabled());
    }
}
