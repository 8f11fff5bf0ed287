pub mod core;
pub mod interrupts;
pub mod tables;

pub use self::core::*;
pub use interrupts::*;
pub use tables::*;
