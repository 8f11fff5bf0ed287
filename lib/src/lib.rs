#![cfg_attr(not(test), no_std)]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod cpu;

pub mod io;
pub mod ports;

pub mod tsc {
    /// Read the time-stamp counter. Hosted builds report zero.
    #[cfg(target_os = "none")]
    #[inline(always)]
    pub fn rdtsc() -> u64 {
        let lo: u32;
        let hi: u32;
        unsafe {
            core::arch::asm!(
                "rdtsc",
                out("eax") lo,
                out("edx") hi,
                options(nomem, nostack, preserves_flags)
            );
        }
        ((hi as u64) << 32) | (lo as u64)
    }

    #[cfg(not(target_os = "none"))]
    #[inline(always)]
    pub fn rdtsc() -> u64 {
        0
    }
}

pub mod init_flag;
pub mod kdiag;
pub mod klog;
pub mod spinlock;
pub mod testing;

#[doc(hidden)]
pub use paste;

pub use init_flag::{InitFlag, StateFlag};
pub use io::{HardwarePorts, Port, PortIo, io_wait};
pub use kdiag::{InterruptFrame, kdiag_dump_interrupt_frame};
pub use klog::{
    KlogLevel, klog_get_level, klog_init, klog_is_enabled, klog_register_backend, klog_set_level,
};
pub use ports::COM1;
pub use spinlock::{IrqMutex, IrqMutexGuard};
