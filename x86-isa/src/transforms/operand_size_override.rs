//! Bucketing instructions by whether they need the `66` operand-size
//! override prefix.
//!
//! Grounded on `cleanup_instruction_set_operand_size_override.cc`.

use std::collections::HashMap;

use crate::error::{Result, Status};
use crate::instruction_set::{Instruction, InstructionSet};

/// Mnemonics of 16-bit string/stack instructions documented with no
/// operands at all, so nothing in their vendor syntax gives away their
/// size.
const IMPLICIT_OPERAND_16_BIT_MNEMONICS: &[&str] =
    &["CMPSW", "CBW", "CWD", "INSW", "IRET", "LODSW", "MOVSW", "OUTSW", "POPF", "PUSHF", "SCASW", "STOSW"];

fn mark_operand_size_override(instruction: &mut Instruction) {
    if !instruction.raw_encoding_specification.starts_with("66 ") {
        instruction.raw_encoding_specification = format!("66 {}", instruction.raw_encoding_specification);
    }
}

/// Instructions with no operands at all can't be bucketed by operand size
/// the way [`add_operand_size_override_prefix`] buckets everything else;
/// this matches them by mnemonic instead.
///
/// Corresponds to `AddOperandSizeOverrideToInstructionsWithImplicitOperands`
/// (named `...ToImplicitOperands` here for brevity).
pub fn add_operand_size_override_to_implicit_operands(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if IMPLICIT_OPERAND_16_BIT_MNEMONICS.contains(&instruction.mnemonic()) {
            mark_operand_size_override(instruction);
        }
    }
    Ok(())
}

/// A handful of instructions give away their 16-bit-ness through one
/// specific operand rather than through the overall bucketing rule in
/// [`add_operand_size_override_prefix`] (their raw encoding also covers a
/// 32-bit or 64-bit form whose *other* operands have a fixed, non-16-bit
/// size, so the generic "does any operand have size 16" rule used there
/// would misfire). Each entry names the raw encoding and the operand index
/// whose name decides the instruction's bucket.
///
/// Corresponds to `AddOperandSizeOverrideToSpecialCaseInstructions`.
pub fn add_operand_size_override_to_special_case_instructions(instruction_set: &mut InstructionSet) -> Result<()> {
    let operand_index_by_encoding: HashMap<&str, usize> = HashMap::from([
        ("0F 01 /4", 0),  // SMSW r/m16; SMSW r32/m16
        ("0F B2 /r", 0),  // LSS r16,m16:16; LSS r32,m16:32
        ("0F B4 /r", 0),  // LFS r16,m16:16; LFS r32,m16:32
        ("0F B5 /r", 0),  // LGS r16,m16:16; LGS r32,m16:32
        ("50+rw", 0),     // PUSH r16; PUSH r64
        ("58+rw", 0),     // POP r16; POP r64
        ("62 /r", 0),     // BOUND r16,m16&16; BOUND r32,m32&32
        ("8F /0", 0),     // POP r/m16; POP r/m64
        ("C4 /r", 0),     // LES r16,m16:16; LES r32,m16:32
        ("C5 /r", 0),     // LDS r16,m16:16; LDS r32,m16:32
        ("F2 0F 38 F1 /r", 1), // CRC32 r32,r/m16; CRC32 r32,r/m32
        ("FF /6", 0),     // PUSH r/m16; PUSH r/m64
    ]);
    const SIXTEEN_BIT_OPERANDS: [&str; 2] = ["r16", "r/m16"];

    for instruction in &mut instruction_set.instructions {
        let Some(&operand_index) = operand_index_by_encoding.get(instruction.raw_encoding_specification.as_str())
        else {
            continue;
        };
        for syntax in &mut instruction.vendor_syntax {
            let Some(operand) = syntax.operands.get(operand_index) else {
                return Err(Status::invalid_argument(format!(
                    "unexpected number of operands for instruction '{}'",
                    instruction.raw_encoding_specification
                )));
            };
            if SIXTEEN_BIT_OPERANDS.contains(&operand.name.as_str()) {
                mark_operand_size_override(instruction);
                break;
            }
        }
    }
    Ok(())
}

fn has_data_operand_of_size(instruction: &Instruction, size: u32) -> bool {
    instruction
        .vendor_syntax
        .iter()
        .any(|syntax| syntax.operands.iter().any(|operand| operand.value_size_bits == size))
}

/// The general case: instructions are clustered by their raw encoding minus
/// its immediate-value size (which legitimately varies independently of the
/// 16/32-bit dichotomy); any cluster with both a 16-bit and a 32-bit
/// operand variant gets the 16-bit variant tagged with the operand-size
/// override prefix.
///
/// Skips instructions with a code-offset operand (whose effective width is
/// controlled by the *address*-size override, not this one) and VEX/EVEX
/// instructions (immune to this SDM-table inconsistency entirely).
///
/// Corresponds to `AddOperandSizeOverridePrefix`.
pub fn add_operand_size_override_prefix(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, instruction) in instruction_set.instructions.iter().enumerate() {
        let Some(spec) = &instruction.encoding_specification else {
            return Err(Status::failed_precondition(
                "add_operand_size_override_prefix requires encoding specifications to be parsed",
            ));
        };
        if spec.code_offset_bytes > 0 || spec.vex_prefix.is_some() {
            continue;
        }
        // Cluster key: raw spec with the immediate size erased.
        let key = strip_immediate_suffix(&instruction.raw_encoding_specification);
        buckets.entry(key).or_default().push(index);
    }

    let mut to_mark = Vec::new();
    for indices in buckets.values() {
        if indices.len() <= 1 {
            continue;
        }
        let mut sixteen_bit = Vec::new();
        let mut has_32_bit = false;
        for &index in indices {
            let instruction = &instruction_set.instructions[index];
            if has_data_operand_of_size(instruction, 32) {
                has_32_bit = true;
            } else if has_data_operand_of_size(instruction, 16) {
                sixteen_bit.push(index);
            }
        }
        if has_32_bit && !sixteen_bit.is_empty() {
            to_mark.extend(sixteen_bit);
        }
    }
    for index in to_mark {
        mark_operand_size_override(&mut instruction_set.instructions[index]);
    }
    Ok(())
}

fn strip_immediate_suffix(raw_encoding_specification: &str) -> String {
    raw_encoding_specification
        .split_whitespace()
        .filter(|token| !matches!(*token, "ib" | "iw" | "id" | "io"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use x86_model::Operand;

    fn operand(name: &str, size: u32) -> Operand {
        Operand { name: name.to_string(), value_size_bits: size, ..Operand::named(name) }
    }

    #[test]
    fn implicit_operand_instructions_get_tagged() {
        let mut instruction_set = InstructionSet::new(vec![Instruction::new("CBW", "98")]);
        add_operand_size_override_to_implicit_operands(&mut instruction_set).unwrap();
        assert_eq!(instruction_set.instructions[0].raw_encoding_specification, "66 98");
    }

    #[test]
    fn sixteen_and_thirtytwo_bit_cluster_tags_only_sixteen_bit_variant() {
        let mut sixteen = Instruction::new("LFS", "0F B4 /r");
        sixteen.vendor_syntax[0].operands = vec![operand("r16", 16), operand("m16&16", 0)];
        let mut thirtytwo = Instruction::new("LFS", "0F B4 /r");
        thirtytwo.vendor_syntax[0].operands = vec![operand("r32", 32), operand("m16&32", 0)];
        let mut instruction_set = InstructionSet::new(vec![sixteen, thirtytwo]);
        for instruction in &mut instruction_set.instructions {
            instruction.encoding_specification =
                Some(crate::encoding_specification::parse(&instruction.raw_encoding_specification).unwrap());
        }
        add_operand_size_override_prefix(&mut instruction_set).unwrap();
        assert!(instruction_set.instructions[0].raw_encoding_specification.starts_with("66 "));
        assert!(!instruction_set.instructions[1].raw_encoding_specification.starts_with("66 "));
    }
}
