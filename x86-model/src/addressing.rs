/// How an operand's value is addressed.
///
/// Mirrors the `AddressingMode` enumeration of the instruction database: an
/// operand is either a register named directly in the encoding, a memory
/// reference assembled from some subset of base/index/scale/displacement, or
/// one of a handful of special cases (string-op implicit addressing, VSIB
/// gather/scatter, `lea`'s address-without-access, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressingMode {
    /// Not yet determined, or not applicable to this operand kind.
    AnyAddressingMode,
    /// A register or immediate named directly by the encoding.
    DirectAddressing,
    /// A full ModR/M memory operand: `[base + index*scale + disp]`.
    IndirectAddressing,
    /// String-instruction implicit source: `[rsi]`.
    IndirectAddressingByRsi,
    /// String-instruction implicit destination: `[rdi]`.
    IndirectAddressingByRdi,
    /// Memory operand with only a base register, no index or displacement.
    IndirectAddressingWithBase,
    /// Memory operand with a base register and a displacement.
    IndirectAddressingWithBaseAndDisplacement,
    /// Gather/scatter memory operand whose index is a vector register.
    IndirectAddressingWithVsib,
    /// A register operand whose class is only pinned down by another operand.
    AnyAddressingWithFlexibleRegisters,
    /// A register operand with a statically known, fixed register.
    AnyAddressingWithFixedRegisters,
    /// `lea`-style: the operand computes an address without accessing memory.
    LoadEffectiveAddress,
    /// A block of memory addressed as a whole (e.g. `m80bcd`, descriptor
    /// tables).
    BlockDirectAddressing,
    /// The operand carries no addressing information at all (pseudo-operand,
    /// e.g. a rounding-control tag).
    NoAddressing,
}

impl Default for AddressingMode {
    fn default() -> Self {
        Self::AnyAddressingMode
    }
}
