//! Legacy 8259 interrupt controller pair.
//!
//! Out of reset the two chips deliver lines 0-7 on vectors 0x08-0x0F and
//! lines 8-15 on 0x70-0x77, colliding with CPU exceptions. [`ChainedPics::remap`]
//! moves both banks to caller-chosen vector bases.
//!
//! The driver is generic over [`PortIo`] so the command sequences can be
//! checked against a model controller. The kernel's instance lives behind an
//! [`IrqMutex`], which keeps interrupts disabled across every multi-step
//! exchange with the chips.

use kestrel_abi::arch::x86::idt::{IRQ_BASE_VECTOR, IRQ_LINES, IRQ_SLAVE_BASE_VECTOR};
use kestrel_abi::arch::x86::pic::{
    ICW1_INIT_ICW4, ICW3_MASTER_SLAVE_ON_IRQ2, ICW3_SLAVE_CASCADE_ID, ICW4_8086, OCW3_READ_IRR,
    OCW3_READ_ISR, PIC_CASCADE_LINE, PIC_EOI, PIC_LINES_PER_CHIP, PIC_MASK_ALL, PIC1_COMMAND,
    PIC1_DATA, PIC1_SPURIOUS_LINE, PIC2_COMMAND, PIC2_DATA, PIC2_SPURIOUS_LINE,
};
use kestrel_lib::{HardwarePorts, IrqMutex, PortIo, klog_debug, klog_warn};

/// Vector bases programmed by the BIOS.
pub const BIOS_MASTER_OFFSET: u8 = 0x08;
pub const BIOS_SLAVE_OFFSET: u8 = 0x70;

/// In 8086 mode ICW2 bits 0-2 are ignored; the chip fills them in with the line.
const VECTOR_BASE_MASK: u8 = !(PIC_LINES_PER_CHIP - 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PicState {
    Uninitialized,
    Remapped,
}

pub struct ChainedPics<B: PortIo> {
    bus: B,
    master_offset: u8,
    slave_offset: u8,
    state: PicState,
}

#[inline]
fn line_in_range(line: u8) -> bool {
    (line as usize) < IRQ_LINES
}

impl<B: PortIo> ChainedPics<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            master_offset: BIOS_MASTER_OFFSET,
            slave_offset: BIOS_SLAVE_OFFSET,
            state: PicState::Uninitialized,
        }
    }

    pub fn state(&self) -> PicState {
        self.state
    }

    /// Vector bases of the master and slave chips.
    pub fn offsets(&self) -> (u8, u8) {
        (self.master_offset, self.slave_offset)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[inline]
    fn write_paced(&mut self, port: u16, value: u8) {
        self.bus.write_u8(port, value);
        self.bus.wait();
    }

    /// Reprogram both chips so line 0 lands on `irq0_offset` and line 8 on
    /// `irq8_offset`. Mask registers survive the reprogramming.
    ///
    /// Offsets are rounded down to a multiple of eight, which is what the
    /// chips deliver on regardless of the low bits written.
    ///
    /// Safe to repeat; every call sends the whole initialisation sequence.
    pub fn remap(&mut self, irq0_offset: u8, irq8_offset: u8) {
        let master_offset = irq0_offset & VECTOR_BASE_MASK;
        let slave_offset = irq8_offset & VECTOR_BASE_MASK;
        if master_offset != irq0_offset || slave_offset != irq8_offset {
            klog_warn!(
                "PIC: vector bases {}/{} not 8-aligned, using {}/{}",
                irq0_offset,
                irq8_offset,
                master_offset,
                slave_offset
            );
        }

        let (mask1, mask2) = self.masks();

        // ICW1: start initialisation, ICW4 follows.
        self.write_paced(PIC1_COMMAND, ICW1_INIT_ICW4);
        self.write_paced(PIC2_COMMAND, ICW1_INIT_ICW4);
        // ICW2: vector offsets.
        self.write_paced(PIC1_DATA, master_offset);
        self.write_paced(PIC2_DATA, slave_offset);
        // ICW3: cascade wiring.
        self.write_paced(PIC1_DATA, ICW3_MASTER_SLAVE_ON_IRQ2);
        self.write_paced(PIC2_DATA, ICW3_SLAVE_CASCADE_ID);
        // ICW4: 8086 mode.
        self.write_paced(PIC1_DATA, ICW4_8086);
        self.write_paced(PIC2_DATA, ICW4_8086);

        self.set_masks(mask1, mask2);

        self.master_offset = master_offset;
        self.slave_offset = slave_offset;
        self.state = PicState::Remapped;
    }

    /// Current (master, slave) interrupt mask registers.
    pub fn masks(&mut self) -> (u8, u8) {
        (self.bus.read_u8(PIC1_DATA), self.bus.read_u8(PIC2_DATA))
    }

    pub fn set_masks(&mut self, master: u8, slave: u8) {
        self.write_paced(PIC1_DATA, master);
        self.write_paced(PIC2_DATA, slave);
    }

    #[inline]
    fn mask_port_and_bit(line: u8) -> (u16, u8) {
        if line < PIC_LINES_PER_CHIP {
            (PIC1_DATA, 1 << line)
        } else {
            (PIC2_DATA, 1 << (line - PIC_LINES_PER_CHIP))
        }
    }

    pub fn mask_line(&mut self, line: u8) {
        if !line_in_range(line) {
            klog_warn!("PIC: mask request for invalid line {}", line);
            return;
        }
        let (port, bit) = Self::mask_port_and_bit(line);
        let mask = self.bus.read_u8(port);
        self.write_paced(port, mask | bit);
    }

    /// Unmask `line`. Slave lines also open the cascade line on the master.
    pub fn unmask_line(&mut self, line: u8) {
        if !line_in_range(line) {
            klog_warn!("PIC: unmask request for invalid line {}", line);
            return;
        }
        let (port, bit) = Self::mask_port_and_bit(line);
        let mask = self.bus.read_u8(port);
        self.write_paced(port, mask & !bit);
        if line >= PIC_LINES_PER_CHIP {
            let master = self.bus.read_u8(PIC1_DATA);
            let cascade = 1 << PIC_CASCADE_LINE;
            if master & cascade != 0 {
                self.write_paced(PIC1_DATA, master & !cascade);
            }
        }
    }

    pub fn is_masked(&mut self, line: u8) -> bool {
        if !line_in_range(line) {
            return true;
        }
        let (port, bit) = Self::mask_port_and_bit(line);
        self.bus.read_u8(port) & bit != 0
    }

    /// Mask every line on both chips.
    pub fn disable(&mut self) {
        self.set_masks(PIC_MASK_ALL, PIC_MASK_ALL);
    }

    /// Acknowledge `line`. Slave lines acknowledge the slave first, then the
    /// master that relayed them.
    pub fn signal_eoi(&mut self, line: u8) {
        if !line_in_range(line) {
            klog_warn!("PIC: EOI for invalid line {}", line);
            return;
        }
        if line >= PIC_LINES_PER_CHIP {
            self.bus.write_u8(PIC2_COMMAND, PIC_EOI);
        }
        self.bus.write_u8(PIC1_COMMAND, PIC_EOI);
    }

    fn read_register(&mut self, ocw3: u8) -> u16 {
        self.bus.write_u8(PIC1_COMMAND, ocw3);
        self.bus.write_u8(PIC2_COMMAND, ocw3);
        let master = self.bus.read_u8(PIC1_COMMAND) as u16;
        let slave = self.bus.read_u8(PIC2_COMMAND) as u16;
        (slave << 8) | master
    }

    /// In-service register, slave in the high byte.
    pub fn read_isr(&mut self) -> u16 {
        self.read_register(OCW3_READ_ISR)
    }

    /// Interrupt request register, slave in the high byte.
    pub fn read_irr(&mut self) -> u16 {
        self.read_register(OCW3_READ_IRR)
    }

    /// Whether a delivery on `line` was spurious.
    ///
    /// Only lines 7 and 15 can be. A spurious line 15 still went through the
    /// master's cascade input, so the master is acknowledged here; the slave
    /// must not be.
    pub fn is_spurious(&mut self, line: u8) -> bool {
        if line != PIC1_SPURIOUS_LINE && line != PIC2_SPURIOUS_LINE {
            return false;
        }
        let isr = self.read_isr();
        if isr & (1 << line) != 0 {
            return false;
        }
        if line == PIC2_SPURIOUS_LINE {
            self.bus.write_u8(PIC1_COMMAND, PIC_EOI);
        }
        true
    }

    /// Vector `line` is delivered on.
    pub fn vector_for_line(&self, line: u8) -> Option<u8> {
        if !line_in_range(line) {
            return None;
        }
        if line < PIC_LINES_PER_CHIP {
            Some(self.master_offset.wrapping_add(line))
        } else {
            Some(self.slave_offset.wrapping_add(line - PIC_LINES_PER_CHIP))
        }
    }

    /// Line delivered on `vector`, if it belongs to either chip.
    pub fn line_for_vector(&self, vector: u8) -> Option<u8> {
        let in_bank = |base: u8| {
            vector
                .checked_sub(base)
                .filter(|off| *off < PIC_LINES_PER_CHIP)
        };
        if let Some(off) = in_bank(self.master_offset) {
            Some(off)
        } else {
            in_bank(self.slave_offset).map(|off| off + PIC_LINES_PER_CHIP)
        }
    }
}

// =============================================================================
// Kernel instance
// =============================================================================

pub(crate) static PICS: IrqMutex<ChainedPics<HardwarePorts>> =
    IrqMutex::new(ChainedPics::new(unsafe { HardwarePorts::new() }));

/// Remap the controllers with interrupts disabled for the whole sequence.
pub fn pic_remap(irq0_offset: u8, irq8_offset: u8) {
    let (master, slave) = {
        let mut pics = PICS.lock();
        pics.remap(irq0_offset, irq8_offset);
        pics.offsets()
    };
    klog_debug!("PIC: remapped IRQ0-7 to {}, IRQ8-15 to {}", master, slave);
}

/// Remap to the kernel's standard vector bases.
pub fn pic_init() {
    pic_remap(IRQ_BASE_VECTOR, IRQ_SLAVE_BASE_VECTOR);
}

/// Mask every line on both controllers.
pub fn pic_disable() {
    PICS.lock().disable();
}

pub fn pic_mask_line(line: u8) {
    PICS.lock().mask_line(line);
}

pub fn pic_unmask_line(line: u8) {
    PICS.lock().unmask_line(line);
}

pub fn pic_is_masked(line: u8) -> bool {
    PICS.lock().is_masked(line)
}

pub fn pic_masks() -> (u8, u8) {
    PICS.lock().masks()
}

pub fn pic_set_masks(master: u8, slave: u8) {
    PICS.lock().set_masks(master, slave);
}

pub fn pic_line_for_vector(vector: u8) -> Option<u8> {
    PICS.lock().line_for_vector(vector)
}

pub fn pic_vector_for_line(line: u8) -> Option<u8> {
    PICS.lock().vector_for_line(line)
}

pub fn pic_state() -> PicState {
    PICS.lock().state()
}

/// Mask everything and clear any in-service line on both chips.
pub fn pic_quiesce_disable() {
    let mut pics = PICS.lock();
    pics.disable();
    pics.bus_mut().write_u8(PIC1_COMMAND, PIC_EOI);
    pics.bus_mut().write_u8(PIC2_COMMAND, PIC_EOI);
}
