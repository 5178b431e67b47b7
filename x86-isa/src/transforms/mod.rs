//! The concrete instruction-set cleanup transforms (C5), plus the
//! consistency checks that run at the end of the pipeline.
//!
//! Each transform here is grounded on one function from
//! `cleanup_instruction_set_encoding.cc`, `cleanup_instruction_set_fix_operands.cc`,
//! `cleanup_instruction_set_operand_info.cc` or
//! `cleanup_instruction_set_operand_size_override.cc`; see the doc comment on
//! each function for its specific source. The registration priorities below
//! preserve the original pipeline's ordering constraints (parse before fix,
//! fix before operand-info assignment, operand-info assignment before
//! register-class assignment, checks last) without reproducing its exact
//! numeric priorities, which were never meaningful beyond relative order.

mod checks;
mod encoding_fixes;
mod fix_operands;
mod operand_info;
mod operand_size_override;

use crate::error::Result;
use crate::instruction_set::InstructionSet;
use crate::registry::{Registry, Transform};

/// Wraps a plain `fn(&mut InstructionSet) -> Result<()>` as a [`Transform`],
/// since none of the cleanup transforms need any state of their own.
struct FnTransform {
    name: &'static str,
    priority: i32,
    run: fn(&mut InstructionSet) -> Result<()>,
}

impl Transform for FnTransform {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn run(&self, instruction_set: &mut InstructionSet) -> Result<()> {
        (self.run)(instruction_set)
    }
}

macro_rules! register {
    ($registry:expr, $priority:expr, $($f:path),+ $(,)?) => {
        $(
            $registry.register(Box::new(FnTransform {
                name: stringify!($f),
                priority: $priority,
                run: $f,
            }));
        )+
    };
}

/// Builds the registry the pipeline runs by default: every transform in
/// this module, in the order the original pipeline depends on.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();

    register!(registry, 1000, encoding_fixes::parse_encoding_specifications);

    register!(
        registry,
        1500,
        encoding_fixes::fix_rex_prefix_specification,
        encoding_fixes::drop_modrm_mod_details_from_encoding_specifications,
        encoding_fixes::add_missing_memory_offset_encoding,
        encoding_fixes::fix_encoding_specification_of_pop_fs_and_gs,
        encoding_fixes::fix_encoding_specification_of_push_fs_and_gs,
        encoding_fixes::fix_encoding_specification_of_xbegin,
        encoding_fixes::fix_encoding_specification_of_set_instructions,
        encoding_fixes::convert_encoding_specification_of_x87_fpu_with_direct_addressing,
        encoding_fixes::add_rex_w_prefixed_version_of_str,
    );

    register!(
        registry,
        2000,
        fix_operands::rename_operands,
        fix_operands::fix_operands_of_cmps_and_movs,
        fix_operands::fix_operands_of_ins_and_outs,
        fix_operands::fix_operands_of_lddqu,
        fix_operands::fix_operands_of_lods_scas_and_stos,
        fix_operands::fix_operands_of_sgdt_and_sidt,
        fix_operands::fix_operands_of_vmovq,
        fix_operands::fix_reg_operands,
        fix_operands::remove_implicit_st0_operand,
        fix_operands::remove_implicit_xmm0_operand,
    );

    register!(
        registry,
        3000,
        operand_size_override::add_operand_size_override_to_implicit_operands,
        operand_size_override::add_operand_size_override_to_special_case_instructions,
    );
    register!(registry, 3500, operand_size_override::add_operand_size_override_prefix);

    register!(registry, 4000, operand_info::add_operand_info);
    register!(
        registry,
        4500,
        operand_info::add_missing_operand_usage,
        operand_info::add_missing_operand_usage_to_vblend_instructions,
        operand_info::add_missing_vex_v_operand_usage,
        operand_info::add_register_class_to_operands,
    );

    register!(
        registry,
        9000,
        checks::check_opcode_format,
        checks::check_operand_info,
        checks::check_special_case_instructions,
        checks::check_has_vendor_syntax,
    );

    registry
}
