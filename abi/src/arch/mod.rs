//! Architecture-specific definitions.

pub mod x86;

pub use x86::*;

/// Base vector for hardware IRQs (IRQ0 maps to this vector).
pub use x86::idt::IRQ_BASE_VECTOR;

/// Software interrupt vector (int 0x80).
pub use x86::idt::SYSCALL_VECTOR;
