//! Legacy 8259 programmable interrupt controller: ports and command words.

/// Master controller command port.
pub const PIC1_COMMAND: u16 = 0x20;
/// Master controller data (mask) port.
pub const PIC1_DATA: u16 = 0x21;
/// Slave controller command port.
pub const PIC2_COMMAND: u16 = 0xA0;
/// Slave controller data (mask) port.
pub const PIC2_DATA: u16 = 0xA1;

/// ICW1: initialise, ICW4 will follow.
pub const ICW1_INIT: u8 = 0x10;
pub const ICW1_ICW4: u8 = 0x01;
/// ICW1 as sent during remap (0x11).
pub const ICW1_INIT_ICW4: u8 = ICW1_INIT | ICW1_ICW4;

/// ICW3 for the master: slave attached on line 2.
pub const ICW3_MASTER_SLAVE_ON_IRQ2: u8 = 1 << PIC_CASCADE_LINE;
/// ICW3 for the slave: its cascade identity.
pub const ICW3_SLAVE_CASCADE_ID: u8 = PIC_CASCADE_LINE;

/// ICW4: 8086/88 mode.
pub const ICW4_8086: u8 = 0x01;

/// OCW2: non-specific end of interrupt.
pub const PIC_EOI: u8 = 0x20;

/// OCW3: next read of the command port returns the in-service register.
pub const OCW3_READ_ISR: u8 = 0x0B;
/// OCW3: next read of the command port returns the request register.
pub const OCW3_READ_IRR: u8 = 0x0A;

/// Master line the slave is wired to.
pub const PIC_CASCADE_LINE: u8 = 2;

/// Lines per controller.
pub const PIC_LINES_PER_CHIP: u8 = 8;

/// Lines that can report spurious interrupts (lowest priority per chip).
pub const PIC1_SPURIOUS_LINE: u8 = 7;
pub const PIC2_SPURIOUS_LINE: u8 = 15;

/// Mask value with every line disabled.
pub const PIC_MASK_ALL: u8 = 0xFF;

const _: () = {
    assert!(ICW1_INIT_ICW4 == 0x11);
    assert!(ICW3_MASTER_SLAVE_ON_IRQ2 == 0x04);
    assert!(ICW3_SLAVE_CASCADE_ID == 0x02);
};
