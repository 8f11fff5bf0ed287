//! Interrupt flag management: sti, cli, irqsave/irqrestore.
//!
//! Hosted builds keep the interrupt flag in software so that code relying on
//! the interrupts-disabled discipline can be exercised in unit tests.

/// IF bit in EFLAGS.
pub const EFLAGS_IF: u32 = 1 << 9;

/// Bit 1 of EFLAGS reads as one.
const EFLAGS_RESERVED: u32 = 1 << 1;

#[cfg(target_os = "none")]
mod imp {
    use core::arch::asm;

    #[inline(always)]
    pub fn sti() {
        unsafe {
            asm!("sti", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn cli() {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn read_eflags() -> u32 {
        let flags: u32;
        unsafe {
            asm!("pushfd; pop {}", out(reg) flags, options(nomem, preserves_flags));
        }
        flags
    }

    #[inline(always)]
    pub fn save_flags_cli() -> u32 {
        let flags: u32;
        unsafe {
            asm!(
                "pushfd",
                "pop {}",
                "cli",
                out(reg) flags,
                options(nomem)
            );
        }
        flags
    }
}

#[cfg(not(target_os = "none"))]
mod imp {
    use core::sync::atomic::{AtomicBool, Ordering};

    use super::{EFLAGS_IF, EFLAGS_RESERVED};

    // Starts cleared, as on entry from the boot loader.
    static INTERRUPT_FLAG: AtomicBool = AtomicBool::new(false);

    fn eflags_for(enabled: bool) -> u32 {
        EFLAGS_RESERVED | if enabled { EFLAGS_IF } else { 0 }
    }

    pub fn sti() {
        INTERRUPT_FLAG.store(true, Ordering::SeqCst);
    }

    pub fn cli() {
        INTERRUPT_FLAG.store(false, Ordering::SeqCst);
    }

    pub fn read_eflags() -> u32 {
        eflags_for(INTERRUPT_FLAG.load(Ordering::SeqCst))
    }

    pub fn save_flags_cli() -> u32 {
        eflags_for(INTERRUPT_FLAG.swap(false, Ordering::SeqCst))
    }
}

/// Enable interrupts (STI).
#[inline(always)]
pub fn enable_interrupts() {
    imp::sti();
}

/// Disable interrupts (CLI).
#[inline(always)]
pub fn disable_interrupts() {
    imp::cli();
}

/// Save EFLAGS and disable interrupts (irqsave pattern).
/// Returns the saved EFLAGS value.
#[inline(always)]
pub fn save_flags_cli() -> u32 {
    imp::save_flags_cli()
}

/// Restore interrupt flag from saved EFLAGS (irqrestore pattern).
/// Only re-enables interrupts if they were enabled in the saved flags.
#[inline(always)]
pub fn restore_flags(flags: u32) {
    if flags & EFLAGS_IF != 0 {
        enable_interrupts();
    }
}

/// Read EFLAGS without modifying interrupt state.
#[inline(always)]
pub fn read_eflags() -> u32 {
    imp::read_eflags()
}

/// Returns true if interrupts are currently enabled (IF bit set).
#[inline(always)]
pub fn are_interrupts_enabled() -> bool {
    (read_eflags() & EFLAGS_IF) != 0
}

/// Serialises hosted tests that drive the modelled interrupt flag or table
/// registers. The model is process-wide, test harnesses are not.
#[cfg(not(target_os = "none"))]
pub static HOSTED_CPU_LOCK: spin::Mutex<()> = spin::Mutex::new(());

/// Run `f` with interrupts disabled, restoring the previous state after.
#[inline]
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let flags = save_flags_cli();
    let ret = f();
    restore_flags(flags);
    ret
}

/// Raise the software interrupt vector (`int 0x80`).
///
/// # Safety
/// An IDT with a present gate for vector 0x80 must be installed.
#[cfg(target_os = "none")]
#[inline(always)]
pub unsafe fn raise_software_interrupt() {
    unsafe {
        core::arch::asm!("int 0x80", options(nomem, nostack));
    }
}

/// Raise the breakpoint exception (`int3`).
///
/// # Safety
/// An IDT with a present gate for vector 3 must be installed.
#[cfg(target_os = "none")]
#[inline(always)]
pub unsafe fn raise_breakpoint() {
    unsafe {
        core::arch::asm!("int3", options(nomem, nostack));
    }
}
