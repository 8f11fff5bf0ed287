#![cfg_attr(not(test), no_std)]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod irq;
pub mod pic;

#[cfg(feature = "itests")]
pub mod pic_tests;

pub use irq::{IrqError, IrqHandler, IrqOutcome, irq_dispatch, irq_register, irq_unregister};
pub use pic::{ChainedPics, PicState};
