//! Kestrel hardware record layouts.
//!
//! This crate is the single source of truth for every bit-exact structure the
//! CPU or the boot loader hands to the kernel:
//! - segment and gate descriptors (`arch::x86::{gdt, idt}`)
//! - descriptor table pointers (`arch::x86::table`)
//! - legacy interrupt controller ports and command words (`arch::x86::pic`)
//! - the multiboot information record (`multiboot`)
//!
//! Everything here is pure data and `const fn` packing; no code in this crate
//! touches hardware.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod arch;
pub mod multiboot;

pub use arch::x86::{
    DescriptorTablePointer, GateDescriptor, GateKind, SegmentAccess, SegmentDescriptor,
    SegmentFlags, SegmentSelector,
};
pub use multiboot::{BootInfoFlags, MultibootInfo};
