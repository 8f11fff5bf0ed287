//! Atomic initialization and state flags for kernel subsystems.
//!
//! ```ignore
//! static GDT_INSTALLED: InitFlag = InitFlag::new();
//!
//! pub fn install() {
//!     if !GDT_INSTALLED.init_once() {
//!         return;
//!     }
//!     // ...
//! }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// "Has X been done?" Monotonic unless explicitly reset.
#[repr(transparent)]
pub struct InitFlag {
    flag: AtomicBool,
}

impl InitFlag {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Returns `true` for the one call that flips the flag.
    #[inline]
    pub fn init_once(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    #[inline]
    pub fn mark_set(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// "Is X currently happening?" Can toggle.
#[repr(transparent)]
pub struct StateFlag {
    flag: AtomicBool,
}

impl StateFlag {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Returns `true` if this call entered the state.
    #[inline]
    pub fn enter(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    #[inline]
    pub fn leave(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Default for StateFlag {
    fn default() -> Self {
        Self::new()
    }
}
