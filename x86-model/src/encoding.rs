/// The slot of the binary encoding that carries an operand's value.
///
/// Every explicit operand of an instruction ends up bound to exactly one of
/// these; the instruction's parsed [`EncodingSpecification`](https://en.wikipedia.org/wiki/X86)-style
/// record (built by `x86-isa`) exposes a multiset of slots that is consumed
/// one-for-one as operands are assigned (see `x86-isa::operand_info`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodingSlot {
    /// Not yet assigned.
    AnyEncoding,
    /// The operand is not encoded at all; it is implied by the opcode.
    ImplicitEncoding,
    /// ModR/M.reg field.
    ModrmReg,
    /// ModR/M.rm field (register or memory).
    ModrmRm,
    /// A register encoded in the low 3 bits of the opcode byte (`+rb`/`+rd`).
    Opcode,
    /// An immediate value trailing the instruction.
    ImmediateValue,
    /// VEX/EVEX.vvvv field.
    VexV,
    /// The high nibble of a trailing immediate byte (`/is4`).
    VexSuffix,
    /// SIB.index, when it names a vector register (gather/scatter).
    Vsib,
    /// A property of the encoding itself rather than a register or memory
    /// operand (e.g. the `{k1}` mask register is encoded here but is really
    /// read as a predicate, not a GPR-like value).
    X86StaticProperty,
    /// A fixed, statically-known register implied by the opcode (`<EAX>`,
    /// `<XMM0>`, `ST(0)`, ...). Carries which one.
    X86FixedRegister(FixedRegister),
}

impl Default for EncodingSlot {
    fn default() -> Self {
        Self::AnyEncoding
    }
}

/// The architectural registers that can appear pinned to an
/// [`EncodingSlot::X86FixedRegister`] slot, i.e. registers that are named by
/// the opcode rather than encoded in a ModR/M or VEX field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixedRegister {
    Al,
    Ax,
    Eax,
    Rax,
    Dx,
    Cl,
    St0,
    Xmm0,
}
