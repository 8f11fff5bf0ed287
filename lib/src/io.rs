//! Type-safe x86 I/O port access.
//!
//! Two layers live here:
//! - [`Port<T>`]: a fixed port address of a fixed width, used for constants
//!   such as `COM1` or the delay port.
//! - [`PortIo`]: the port bus as a value, so drivers that run long command
//!   sequences can be handed either the real bus ([`HardwarePorts`]) or a
//!   recording stand-in.
//!
//! Hosted builds (anything not targeting bare metal) have no port space:
//! reads float high and writes are discarded.

use core::marker::PhantomData;

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Trait for types that can be read from and written to I/O ports.
/// Sealed: only implemented for `u8`, `u16`, `u32`.
pub trait PortValue: private::Sealed + Copy {
    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    unsafe fn read_from_port(port: u16) -> Self;

    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    unsafe fn write_to_port(port: u16, value: Self);
}

#[cfg(target_os = "none")]
mod hw {
    use core::arch::asm;

    use super::PortValue;

    impl PortValue for u8 {
        #[inline(always)]
        unsafe fn read_from_port(port: u16) -> u8 {
            let value: u8;
            unsafe {
                asm!(
                    "in al, dx",
                    out("al") value,
                    in("dx") port,
                    options(nomem, nostack, preserves_flags)
                );
            }
            value
        }

        #[inline(always)]
        unsafe fn write_to_port(port: u16, value: u8) {
            unsafe {
                asm!(
                    "out dx, al",
                    in("dx") port,
                    in("al") value,
                    options(nomem, nostack, preserves_flags)
                );
            }
        }
    }

    impl PortValue for u16 {
        #[inline(always)]
        unsafe fn read_from_port(port: u16) -> u16 {
            let value: u16;
            unsafe {
                asm!(
                    "in ax, dx",
                    out("ax") value,
                    in("dx") port,
                    options(nomem, nostack, preserves_flags)
                );
            }
            value
        }

        #[inline(always)]
        unsafe fn write_to_port(port: u16, value: u16) {
            unsafe {
                asm!(
                    "out dx, ax",
                    in("dx") port,
                    in("ax") value,
                    options(nomem, nostack, preserves_flags)
                );
            }
        }
    }

    impl PortValue for u32 {
        #[inline(always)]
        unsafe fn read_from_port(port: u16) -> u32 {
            let value: u32;
            unsafe {
                asm!(
                    "in eax, dx",
                    out("eax") value,
                    in("dx") port,
                    options(nomem, nostack, preserves_flags)
                );
            }
            value
        }

        #[inline(always)]
        unsafe fn write_to_port(port: u16, value: u32) {
            unsafe {
                asm!(
                    "out dx, eax",
                    in("dx") port,
                    in("eax") value,
                    options(nomem, nostack, preserves_flags)
                );
            }
        }
    }
}

#[cfg(not(target_os = "none"))]
mod hosted {
    use super::PortValue;

    macro_rules! floating_port_value {
        ($($ty:ty),*) => {
            $(
                impl PortValue for $ty {
                    #[inline(always)]
                    unsafe fn read_from_port(_port: u16) -> $ty {
                        <$ty>::MAX
                    }

                    #[inline(always)]
                    unsafe fn write_to_port(_port: u16, _value: $ty) {}
                }
            )*
        };
    }

    floating_port_value!(u8, u16, u32);
}

/// Type-safe I/O port. `T` must be `u8`, `u16`, or `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port<T: PortValue> {
    port: u16,
    _phantom: PhantomData<T>,
}

impl<T: PortValue> Port<T> {
    #[inline]
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            _phantom: PhantomData,
        }
    }

    #[inline]
    pub const fn address(&self) -> u16 {
        self.port
    }

    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self::new(self.port.wrapping_add(off))
    }

    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    #[inline(always)]
    pub unsafe fn read(&self) -> T {
        unsafe { T::read_from_port(self.port) }
    }

    /// # Safety
    /// Port I/O can have arbitrary side effects on hardware state.
    #[inline(always)]
    pub unsafe fn write(&self, value: T) {
        unsafe { T::write_to_port(self.port, value) }
    }
}

impl<T: PortValue> core::fmt::Debug for Port<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Port")
            .field("address", &format_args!("0x{:04x}", self.port))
            .field("size", &core::mem::size_of::<T>())
            .finish()
    }
}

/// I/O delay via port 0x80 (POST diagnostic port).
///
/// # Safety
/// Should only be called in contexts where port I/O is appropriate.
#[inline(always)]
pub unsafe fn io_wait() {
    unsafe { crate::ports::IO_DELAY.write(0) }
}

// ---------------------------------------------------------------------------
// Port bus
// ---------------------------------------------------------------------------

/// The I/O port space.
///
/// Implementors either touch real hardware or stand in for it. Obtaining a
/// hardware implementor is the unsafe step; once held, every access is
/// considered sound.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn read_u16(&mut self, port: u16) -> u16;
    fn read_u32(&mut self, port: u16) -> u32;

    fn write_u8(&mut self, port: u16, value: u8);
    fn write_u16(&mut self, port: u16, value: u16);
    fn write_u32(&mut self, port: u16, value: u32);

    /// Fixed settle delay between writes to slow devices.
    fn wait(&mut self);
}

/// The machine's real port space.
#[derive(Debug)]
pub struct HardwarePorts {
    _private: (),
}

impl HardwarePorts {
    /// # Safety
    /// The holder may drive any I/O port. Callers must make sure devices
    /// reached through this handle are not concurrently programmed elsewhere.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PortIo for HardwarePorts {
    #[inline]
    fn read_u8(&mut self, port: u16) -> u8 {
        unsafe { Port::<u8>::new(port).read() }
    }

    #[inline]
    fn read_u16(&mut self, port: u16) -> u16 {
        unsafe { Port::<u16>::new(port).read() }
    }

    #[inline]
    fn read_u32(&mut self, port: u16) -> u32 {
        unsafe { Port::<u32>::new(port).read() }
    }

    #[inline]
    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe { Port::<u8>::new(port).write(value) }
    }

    #[inline]
    fn write_u16(&mut self, port: u16, value: u16) {
        unsafe { Port::<u16>::new(port).write(value) }
    }

    #[inline]
    fn write_u32(&mut self, port: u16, value: u32) {
        unsafe { Port::<u32>::new(port).write(value) }
    }

    #[inline]
    fn wait(&mut self) {
        unsafe { io_wait() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_offset_wraps() {
        let base: Port<u8> = Port::new(0xFFFF);
        assert_eq!(base.offset(2).address(), 0x0001);
        assert_eq!(Port::<u16>::new(0x3F8).offset(5).address(), 0x3FD);
    }

    #[test]
    fn hosted_bus_floats_high() {
        let mut bus = unsafe { HardwarePorts::new() };
        assert_eq!(bus.read_u8(0x21), 0xFF);
        assert_eq!(bus.read_u16(0x21), 0xFFFF);
        assert_eq!(bus.read_u32(0xCFC), u32::MAX);
        bus.write_u8(0x21, 0);
        bus.wait();
    }
}
