//! 32-bit protected-mode x86 structures.

pub mod gdt;
pub mod idt;
pub mod pic;
pub mod table;

pub use gdt::{SegmentAccess, SegmentDescriptor, SegmentFlags, SegmentSelector};
pub use idt::{GateDescriptor, GateKind};
pub use table::DescriptorTablePointer;
