//! Static taxonomy of operand names as they appear in the Intel vendor
//! syntax (`"r/m64"`, `"xmm1"`, `"imm8"`, `"<XMM0>"`, ...).
//!
//! This is the lookup table side of C2/C3: the operand-info assigner
//! (`operand_info::add_operand_info`) consults [`lookup`] for every operand
//! name it sees and fills in the fields the name alone determines
//! (addressing mode, size, register class); fields that depend on
//! context (the slot it actually ends up bound to, its usage) are filled in
//! by the assigner itself.
//!
//! The table below is representative rather than exhaustive: it covers every
//! operand-name family the cleanup transforms in this crate reference, which
//! is enough to drive the pipeline end to end, but a production instruction
//! database would need the rest of the several hundred names found in the
//! SDM's operand-encoding tables (§3.1.1.1-3.1.1.3).

use x86_model::{AddressingMode, EncodingSlot, RegisterClass};

/// The name-independent facts the taxonomy can derive about an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandTemplate {
    pub addressing_mode: AddressingMode,
    /// `0` when the name does not pin down a size (e.g. `"mem"`).
    pub value_size_bits: u32,
    pub register_class: RegisterClass,
    /// Set when the name itself determines the operand's encoding slot,
    /// independently of its position (fixed registers named in angle
    /// brackets, and ST(i)-style stack operands).
    pub fixed_encoding: Option<EncodingSlot>,
}

const fn reg(size: u32, class: RegisterClass) -> OperandTemplate {
    OperandTemplate {
        addressing_mode: AddressingMode::DirectAddressing,
        value_size_bits: size,
        register_class: class,
        fixed_encoding: None,
    }
}

const fn mem(size: u32) -> OperandTemplate {
    OperandTemplate {
        addressing_mode: AddressingMode::IndirectAddressing,
        value_size_bits: size,
        register_class: RegisterClass::InvalidRegisterClass,
        fixed_encoding: None,
    }
}

const fn vsib_mem(size: u32) -> OperandTemplate {
    OperandTemplate {
        addressing_mode: AddressingMode::IndirectAddressingWithVsib,
        value_size_bits: size,
        register_class: RegisterClass::InvalidRegisterClass,
        // Not fixed: this operand still consumes the `Vsib` slot positionally
        // out of the encoding's available-slot queue, same as an `r/m`
        // operand consumes whatever `ModrmRm`/`Vsib` slot the parsed
        // encoding specification exposes in that position.
        fixed_encoding: None,
    }
}

const fn imm(size: u32) -> OperandTemplate {
    OperandTemplate {
        addressing_mode: AddressingMode::NoAddressing,
        value_size_bits: size,
        register_class: RegisterClass::InvalidRegisterClass,
        fixed_encoding: Some(EncodingSlot::ImmediateValue),
    }
}

/// Looks up the static template for a vendor-syntax operand name.
///
/// `r/m8`-style names (register-or-memory) and plain register/memory names
/// are both handled; the `/` form resolves to
/// [`AddressingMode::AnyAddressingWithFlexibleRegisters`], since the actual
/// addressing mode depends on the ModR/M byte at runtime, not on the name.
pub fn lookup(name: &str) -> Option<OperandTemplate> {
    if let Some(template) = lookup_exact(name) {
        return Some(template);
    }
    if let Some(size) = reg_mem_size(name) {
        return Some(OperandTemplate {
            addressing_mode: AddressingMode::AnyAddressingWithFlexibleRegisters,
            value_size_bits: size,
            register_class: gpr_class_for_size(size),
            fixed_encoding: None,
        });
    }
    None
}

fn reg_mem_size(name: &str) -> Option<u32> {
    match name {
        "r/m8" => Some(8),
        "r/m16" => Some(16),
        "r/m32" => Some(32),
        "r/m64" => Some(64),
        _ => None,
    }
}

fn gpr_class_for_size(size: u32) -> RegisterClass {
    match size {
        8 => RegisterClass::GeneralPurposeRegister8Bit,
        16 => RegisterClass::GeneralPurposeRegister16Bit,
        32 => RegisterClass::GeneralPurposeRegister32Bit,
        64 => RegisterClass::GeneralPurposeRegister64Bit,
        _ => RegisterClass::InvalidRegisterClass,
    }
}

fn lookup_exact(name: &str) -> Option<OperandTemplate> {
    use AddressingMode as A;
    use RegisterClass as C;
    Some(match name {
        "r8" => reg(8, C::GeneralPurposeRegister8Bit),
        "r16" => reg(16, C::GeneralPurposeRegister16Bit),
        "r32" => reg(32, C::GeneralPurposeRegister32Bit),
        "r64" => reg(64, C::GeneralPurposeRegister64Bit),
        "m8" => mem(8),
        "m16" => mem(16),
        "m32" => mem(32),
        "m64" => mem(64),
        "m128" => mem(128),
        "m256" => mem(256),
        "m512" => mem(512),
        "m16&16" | "m16&32" | "m16&64" | "m16int" => mem(0),
        // VSIB memory operands (gather/scatter): SIB.index names a vector
        // register, so the operand's own value size is the gathered
        // element's address width, not a register width.
        "vm32x" | "vm32y" | "vm32z" | "vm64x" | "vm64y" | "vm64z" => vsib_mem(0),
        "mem" => OperandTemplate {
            addressing_mode: A::AnyAddressingMode,
            value_size_bits: 0,
            register_class: C::InvalidRegisterClass,
            fixed_encoding: None,
        },
        "imm8" => imm(8),
        "imm16" => imm(16),
        "imm32" => imm(32),
        "imm64" => imm(64),
        "xmm1" | "xmm2" | "xmm3" | "xmm4" => reg(128, C::VectorRegister128Bit),
        "xmm2/m64" | "xmm3/m64" => OperandTemplate {
            addressing_mode: A::AnyAddressingWithFlexibleRegisters,
            value_size_bits: 64,
            register_class: C::VectorRegister128Bit,
            fixed_encoding: None,
        },
        "xmm2/m128" | "xmm3/m128" => OperandTemplate {
            addressing_mode: A::AnyAddressingWithFlexibleRegisters,
            value_size_bits: 128,
            register_class: C::VectorRegister128Bit,
            fixed_encoding: None,
        },
        "ymm1" | "ymm2" | "ymm3" => reg(256, C::VectorRegister256Bit),
        "zmm1" | "zmm2" | "zmm3" => reg(512, C::VectorRegister512Bit),
        "k1" | "k2" | "k3" => reg(64, C::MaskRegister),
        "mm" | "mm1" | "mm2" => reg(64, C::MmxStackRegister),
        "ST(0)" => OperandTemplate {
            addressing_mode: A::AnyAddressingMode,
            value_size_bits: 80,
            register_class: C::FloatingPointStackRegister,
            fixed_encoding: Some(EncodingSlot::X86FixedRegister(x86_model::FixedRegister::St0)),
        },
        "ST(i)" => reg(80, C::FloatingPointStackRegister),
        "<XMM0>" => OperandTemplate {
            addressing_mode: A::NoAddressing,
            value_size_bits: 128,
            register_class: C::VectorRegister128Bit,
            fixed_encoding: Some(EncodingSlot::X86FixedRegister(x86_model::FixedRegister::Xmm0)),
        },
        "AL" => fixed_gpr(8, x86_model::FixedRegister::Al),
        "AX" => fixed_gpr(16, x86_model::FixedRegister::Ax),
        "EAX" => fixed_gpr(32, x86_model::FixedRegister::Eax),
        "RAX" => fixed_gpr(64, x86_model::FixedRegister::Rax),
        "DX" => fixed_gpr(16, x86_model::FixedRegister::Dx),
        "CL" => fixed_gpr(8, x86_model::FixedRegister::Cl),
        "rel8" => OperandTemplate {
            addressing_mode: A::NoAddressing,
            value_size_bits: 8,
            register_class: C::InvalidRegisterClass,
            fixed_encoding: None,
        },
        "rel32" => OperandTemplate {
            addressing_mode: A::NoAddressing,
            value_size_bits: 32,
            register_class: C::InvalidRegisterClass,
            fixed_encoding: None,
        },
        "moffs8" | "moffs16" | "moffs32" | "moffs64" => OperandTemplate {
            addressing_mode: A::DirectAddressing,
            value_size_bits: moffs_size(name),
            register_class: C::InvalidRegisterClass,
            fixed_encoding: None,
        },
        // String-instruction implicit memory operands: `FixOperandsOfCmpsAndMovs`,
        // `FixOperandsOfInsAndOuts` and `FixOperandsOfLodsScasAndStos` rename a
        // instruction's memory operand to one of these two tokens instead of
        // leaving it as a general `m8`/`m16`/`m32`/`m64` ModR/M operand, since
        // the real addressing is hardwired to `RSI`/`RDI` and never goes
        // through ModR/M at all.
        "(RSI)" => OperandTemplate {
            addressing_mode: A::IndirectAddressingByRsi,
            value_size_bits: 0,
            register_class: C::InvalidRegisterClass,
            fixed_encoding: Some(EncodingSlot::ImplicitEncoding),
        },
        "(RDI)" => OperandTemplate {
            addressing_mode: A::IndirectAddressingByRdi,
            value_size_bits: 0,
            register_class: C::InvalidRegisterClass,
            fixed_encoding: Some(EncodingSlot::ImplicitEncoding),
        },
        "AL/AX/EAX/RAX" => OperandTemplate {
            addressing_mode: A::NoAddressing,
            value_size_bits: 0,
            register_class: C::InvalidRegisterClass,
            fixed_encoding: Some(EncodingSlot::ImplicitEncoding),
        },
        _ => return None,
    })
}

const fn fixed_gpr(size: u32, register: x86_model::FixedRegister) -> OperandTemplate {
    OperandTemplate {
        addressing_mode: AddressingMode::NoAddressing,
        value_size_bits: size,
        register_class: match size {
            8 => RegisterClass::GeneralPurposeRegister8Bit,
            16 => RegisterClass::GeneralPurposeRegister16Bit,
            32 => RegisterClass::GeneralPurposeRegister32Bit,
            _ => RegisterClass::GeneralPurposeRegister64Bit,
        },
        fixed_encoding: Some(EncodingSlot::X86FixedRegister(register)),
    }
}

fn moffs_size(name: &str) -> u32 {
    match name {
        "moffs8" => 8,
        "moffs16" => 16,
        "moffs32" => 32,
        _ => 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_register_operand() {
        let template = lookup("r32").unwrap();
        assert_eq!(template.value_size_bits, 32);
        assert_eq!(template.register_class, RegisterClass::GeneralPurposeRegister32Bit);
    }

    #[test]
    fn looks_up_register_or_memory_operand() {
        let template = lookup("r/m64").unwrap();
        assert_eq!(template.addressing_mode, AddressingMode::AnyAddressingWithFlexibleRegisters);
        assert_eq!(template.value_size_bits, 64);
    }

    #[test]
    fn unknown_name_returns_none() {
        assert!(lookup("not_a_real_operand").is_none());
    }

    #[test]
    fn vsib_memory_operand_is_not_fixed() {
        let template = lookup("vm32x").unwrap();
        assert_eq!(template.addressing_mode, AddressingMode::IndirectAddressingWithVsib);
        assert!(template.fixed_encoding.is_none());
    }
}
