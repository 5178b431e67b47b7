//! Shared primitives describing the x86-64 instruction set.
//!
//! This crate has no behaviour of its own: it is the vocabulary that the
//! instruction-set cleanup pipeline (`x86-isa`) and the out-of-order
//! simulator (`x86-sim`) both speak. Keeping it separate means the two
//! subsystems agree on what a register, an addressing mode or an operand
//! encoding slot *is* without either one owning the other.

mod addressing;
mod encoding;
mod operand;
mod register;

pub use addressing::AddressingMode;
pub use encoding::{
    EncodingSlot,
    FixedRegister,
};
pub use operand::{
    Operand,
    RegisterClass,
    Usage,
};
pub use register::{
    Register,
    RegisterUnit,
    SubRegisterWidth,
    NUM_REGISTER_UNITS_PER_GPR,
};
