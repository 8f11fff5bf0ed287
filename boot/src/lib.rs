#![cfg_attr(not(test), no_std)]

pub mod early_init;
pub mod gdt;
pub mod idt;
#[cfg(all(feature = "itests", target_os = "none"))]
pub mod idt_tests;
pub mod panic;

pub use early_init::{BootError, boot_steps, is_kernel_initialized, kernel_main};
pub use gdt::{gdt_current_pointer, gdt_install, gdt_read_back, gdt_set_entry};
pub use idt::{idt_build, idt_get_gate, idt_install, idt_set_gate};
pub use panic::panic_handler_impl;
