use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::cpu;

/// Mutex that disables interrupts while held.
///
/// For state touched both by normal code and by interrupt handlers: with a
/// single CPU, holding the lock with interrupts enabled would let a handler
/// spin forever on it.
pub struct IrqMutex<T> {
    inner: spin::Mutex<T>,
}

pub struct IrqMutexGuard<'a, T> {
    guard: ManuallyDrop<spin::MutexGuard<'a, T>>,
    saved_flags: u32,
}

impl<T> IrqMutex<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            inner: spin::Mutex::new(data),
        }
    }

    /// Check if the lock is currently held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    #[inline]
    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        let saved_flags = cpu::save_flags_cli();
        IrqMutexGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            saved_flags,
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<IrqMutexGuard<'_, T>> {
        let saved_flags = cpu::save_flags_cli();
        match self.inner.try_lock() {
            Some(guard) => Some(IrqMutexGuard {
                guard: ManuallyDrop::new(guard),
                saved_flags,
            }),
            None => {
                cpu::restore_flags(saved_flags);
                None
            }
        }
    }
}

impl<'a, T> Deref for IrqMutexGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<'a, T> DerefMut for IrqMutexGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<'a, T> Drop for IrqMutexGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        // Release before re-enabling interrupts.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        cpu::restore_flags(self.saved_flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_lock_and_try_lock_backs_off() {
        let _cpu = cpu::HOSTED_CPU_LOCK.lock();
        let m = IrqMutex::new(5u8);
        {
            let mut g = m.lock();
            *g += 1;
            assert!(m.is_locked());
            assert!(m.try_lock().is_none());
        }
        assert!(!m.is_locked());
        assert_eq!(*m.lock(), 6);

        cpu::enable_interrupts();
        {
            let _g = m.lock();
            assert!(!cpu::are_interrupts_enabled());
        }
        assert!(cpu::are_interrupts_enabled());
        cpu::disable_interrupts();
    }
}
