use crate::{
    addressing::AddressingMode,
    encoding::EncodingSlot,
};

/// The register file an operand's value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterClass {
    InvalidRegisterClass,
    GeneralPurposeRegister8Bit,
    GeneralPurposeRegister16Bit,
    GeneralPurposeRegister32Bit,
    GeneralPurposeRegister64Bit,
    VectorRegister128Bit,
    VectorRegister256Bit,
    VectorRegister512Bit,
    RegisterBlock128Bit,
    RegisterBlock256Bit,
    RegisterBlock512Bit,
    MaskRegister,
    MmxStackRegister,
    FloatingPointStackRegister,
    SpecialRegisterSegment,
    SpecialRegisterControl,
    SpecialRegisterDebug,
    SpecialRegisterMpxBounds,
}

impl Default for RegisterClass {
    fn default() -> Self {
        Self::InvalidRegisterClass
    }
}

/// Whether an operand is read, written, or both, by the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Usage {
    UsageUnknown,
    UsageRead,
    UsageWrite,
    UsageReadWrite,
}

impl Default for Usage {
    fn default() -> Self {
        Self::UsageUnknown
    }
}

impl Usage {
    /// `true` for `UsageWrite` and `UsageReadWrite`.
    pub fn is_write(self) -> bool {
        matches!(self, Self::UsageWrite | Self::UsageReadWrite)
    }

    /// `true` for `UsageRead` and `UsageReadWrite`.
    pub fn is_read(self) -> bool {
        matches!(self, Self::UsageRead | Self::UsageReadWrite)
    }
}

/// A single operand of a `vendor_syntax`, as it stands after the cleanup
/// pipeline has finished with it.
///
/// This is the unit of work that `x86-isa`'s operand-info assigner (C3)
/// fills in one field at a time: `addressing_mode` and `value_size_bits`
/// from the static name tables, `encoding` from either the name tables or
/// the positional fallback, `register_class` from the register-class table,
/// and `usage` last, since it sometimes depends on the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operand {
    /// The operand token as it appears in the vendor syntax, e.g. `"r/m64"`,
    /// `"xmm1"`, `"BYTE PTR [RSI]"`, `"<XMM0>"`, `"ST(i)"`, `"imm8"`.
    pub name: String,
    pub addressing_mode: AddressingMode,
    pub encoding: EncodingSlot,
    /// 0 means unknown/not applicable.
    pub value_size_bits: u32,
    pub register_class: RegisterClass,
    pub usage: Usage,
    /// Free-form decorations carried alongside the operand, e.g. `"k1"`,
    /// `"z"`, `"sae"`.
    pub tags: Vec<String>,
}

impl Operand {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether this operand is a pseudo-operand carried only by a tag (e.g.
    /// rounding control), which is exempt from the "value size must be set"
    /// consistency check.
    pub fn is_tag_only_pseudo_operand(&self) -> bool {
        self.name.is_empty() && !self.tags.is_empty()
    }
}
