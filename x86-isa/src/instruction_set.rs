//! The in-memory instruction database the cleanup pipeline operates on,
//! standing in for the original `InstructionSetProto`/`InstructionProto`
//! pair without the protobuf machinery.

use x86_model::Operand;

use crate::encoding_specification::EncodingSpecification;

/// One syntax alternative for an instruction, e.g. both the Intel-syntax and
/// the (rare) alternate mnemonic form of the same binary encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VendorSyntax {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
}

/// One entry of the instruction database: a mnemonic, its binary encoding,
/// and everything the cleanup pipeline derives about its operands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instruction {
    pub vendor_syntax: Vec<VendorSyntax>,
    pub raw_encoding_specification: String,
    pub encoding_specification: Option<EncodingSpecification>,
    pub feature_name: String,
    pub description: String,
    /// Set once `ParseEncodingSpecifications` has successfully parsed
    /// `raw_encoding_specification`; transforms downstream of it may assume
    /// this is `true`.
    pub encoding_specification_parsed: bool,
}

impl Instruction {
    pub fn new(mnemonic: impl Into<String>, raw_encoding_specification: impl Into<String>) -> Self {
        Self {
            vendor_syntax: vec![VendorSyntax { mnemonic: mnemonic.into(), operands: Vec::new() }],
            raw_encoding_specification: raw_encoding_specification.into(),
            ..Default::default()
        }
    }

    /// The mnemonic of the instruction's first vendor syntax, or `""` if it
    /// has none (a state no well-formed instruction should be in once
    /// `CheckHasVendorSyntax` has run).
    pub fn mnemonic(&self) -> &str {
        self.vendor_syntax.first().map(|syntax| syntax.mnemonic.as_str()).unwrap_or("")
    }
}

/// The full instruction database a pipeline run operates on, plus the
/// accumulated non-fatal warnings transforms may emit along the way.
#[derive(Debug, Clone, Default)]
pub struct InstructionSet {
    pub instructions: Vec<Instruction>,
}

impl InstructionSet {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}
