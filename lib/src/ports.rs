use crate::io::Port;

pub const COM1: Port<u8> = Port::new(0x3F8);

pub const QEMU_DEBUG_EXIT: Port<u8> = Port::new(0xF4);

pub const IO_DELAY: Port<u8> = Port::new(0x80);

pub const UART_REG_THR: u16 = 0;
pub const UART_REG_DLL: u16 = 0;
pub const UART_REG_IER: u16 = 1;
pub const UART_REG_DLM: u16 = 1;
pub const UART_REG_FCR: u16 = 2;
pub const UART_REG_LCR: u16 = 3;
pub const UART_REG_MCR: u16 = 4;
pub const UART_REG_LSR: u16 = 5;

pub const UART_LCR_DLAB: u8 = 0x80;
pub const UART_LCR_8N1: u8 = 0x03;
pub const UART_FCR_ENABLE_FIFO: u8 = 0x01;
pub const UART_FCR_CLEAR_RX: u8 = 0x02;
pub const UART_FCR_CLEAR_TX: u8 = 0x04;
pub const UART_FCR_14_BYTE_THRESHOLD: u8 = 0xC0;
pub const UART_LSR_TX_EMPTY: u8 = 0x20;
pub const UART_MCR_DTR: u8 = 0x01;
pub const UART_MCR_RTS: u8 = 0x02;
pub const UART_MCR_AUX2: u8 = 0x08;

/// Divisor for 115200 baud from the 1.8432MHz UART clock.
pub const UART_DIVISOR_115200: u16 = 1;

// ---------------------------------------------------------------------------
// Low-level serial I/O primitives
// ---------------------------------------------------------------------------
//
// Every path that writes to a serial port funnels through here: the early
// klog backend and the panic path. The functions take no locks; callers
// serialise (interrupts off during boot and panic).

/// Program a UART for 115200 8N1 with FIFOs enabled and its interrupts off.
///
/// # Safety
///
/// Port I/O. `base` must be an 8250/16550-compatible UART nobody else is
/// programming.
pub unsafe fn serial_init(base: Port<u8>) {
    unsafe {
        base.offset(UART_REG_IER).write(0x00);
        base.offset(UART_REG_LCR).write(UART_LCR_DLAB);
        base.offset(UART_REG_DLL)
            .write((UART_DIVISOR_115200 & 0xFF) as u8);
        base.offset(UART_REG_DLM)
            .write((UART_DIVISOR_115200 >> 8) as u8);
        base.offset(UART_REG_LCR).write(UART_LCR_8N1);
        base.offset(UART_REG_FCR).write(
            UART_FCR_ENABLE_FIFO
                | UART_FCR_CLEAR_RX
                | UART_FCR_CLEAR_TX
                | UART_FCR_14_BYTE_THRESHOLD,
        );
        base.offset(UART_REG_MCR)
            .write(UART_MCR_DTR | UART_MCR_RTS | UART_MCR_AUX2);
    }
}

/// Write one byte to a UART, polling the Line Status Register until the
/// transmit holding register is empty.
///
/// # Safety
///
/// Port I/O.  Caller must ensure `base` refers to a valid, initialised
/// 8250/16550-compatible UART and that concurrent access is serialised.
#[inline(always)]
pub unsafe fn serial_putc(base: Port<u8>, byte: u8) {
    let lsr = base.offset(UART_REG_LSR);
    let thr = base.offset(UART_REG_THR);
    unsafe {
        while (lsr.read() & UART_LSR_TX_EMPTY) == 0 {
            core::hint::spin_loop();
        }
        thr.write(byte);
    }
}

/// Write a byte slice to a UART, converting lone `\n` into `\r\n`.
///
/// # Safety
///
/// Same requirements as [`serial_putc`].
#[inline]
pub unsafe fn serial_write_bytes(base: Port<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == b'\n' {
            unsafe { serial_putc(base, b'\r') };
        }
        unsafe { serial_putc(base, b) };
    }
}
