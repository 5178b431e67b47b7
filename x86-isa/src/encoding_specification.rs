//! Parses the textual encoding-specification mini-language used throughout
//! the Intel SDM (e.g. `"F3 0F AE /3"`, `"VEX.128.66.0F38.W0 2F /r"`) into a
//! structured [`EncodingSpecification`], and back.
//!
//! Grounded on `exegesis/x86/encoding_specification.h`'s
//! `ParseEncodingSpecification`/`GenerateEncodingSpec`/`GetAvailableEncodings`
//! trio; the tokens recognized here are exactly the ones listed in that
//! header's module comment (Intel SDM Vol. 2, §3.1.1).

use std::fmt;

use x86_model::{EncodingSlot, FixedRegister};

use crate::error::{Result, Status};

/// `NP`/`66`/`67`/`F2`/`F3`, and the less common `NFx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegacyPrefixes {
    /// `NP`: the instruction must *not* carry a mandatory prefix.
    pub no_mandatory_prefix: bool,
    /// `NFx`: the instruction must not be preceded by `9B` (`FWAIT`).
    pub no_fwait_prefix: bool,
    /// `66`, as a mandatory (not operand-size-override) prefix.
    pub mandatory_66: bool,
    /// `F2`, as a mandatory prefix.
    pub mandatory_f2: bool,
    /// `F3`, as a mandatory prefix.
    pub mandatory_f3: bool,
    /// A bare `66` used for its legacy meaning, operand-size override,
    /// rather than as a mandatory prefix. Set by
    /// `AddOperandSizeOverridePrefix` rather than by the parser.
    pub operand_size_override: bool,
    /// `67`: address-size override.
    pub address_size_override: bool,
}

/// How the instruction's REX.W bit is constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RexWUsage {
    /// The specification does not mention `REX.W`.
    #[default]
    Unspecified,
    /// The specification requires `REX.W` (`"REX.W + <opcode>"` or a VEX/EVEX
    /// prefix with `.W1`).
    Required,
    /// The specification explicitly excludes `REX.W` (VEX/EVEX `.W0`).
    Excluded,
}

/// `0F`, `0F 38` or `0F 3A` — the three opcode maps reachable without a
/// VEX/EVEX prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpcodeMap {
    #[default]
    OneByteOpcode,
    Map0F,
    Map0F38,
    Map0F3A,
}

impl OpcodeMap {
    /// The literal escape byte(s) this map prepends to an instruction's
    /// opcode byte(s), most significant byte first.
    pub fn escape_bytes(self) -> &'static [u8] {
        match self {
            Self::OneByteOpcode => &[],
            Self::Map0F => &[0x0F],
            Self::Map0F38 => &[0x0F, 0x38],
            Self::Map0F3A => &[0x0F, 0x3A],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSize {
    Bits128,
    Bits256,
    Bits512,
    /// `LIG`: vector length is ignored.
    Ignored,
}

/// `VEX` or `EVEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VexEncodingKind {
    Vex,
    Evex,
}

/// The role `VEX.vvvv`/`EVEX.vvvv` plays, as named directly by the `NDS`/
/// `NDD`/`DDS` grammar token (spec.md §4.1). `AddMissingVexVOperandUsage`
/// (`transforms::operand_info::add_missing_vex_v_operand_usage`) only
/// reconstructs this role for the post-2018 SDM revisions that dropped the
/// token from the specification text; when the token is present, as here,
/// the role is already unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VexOperandUsage {
    /// `NDS`: `vvvv` is the first (non-destructive) source register.
    FirstSourceRegister,
    /// `DDS`: `vvvv` is the second source register.
    SecondSourceRegister,
    /// `NDD`: `vvvv` is the destination register.
    DestinationRegister,
}

/// The `VEX.<size>.<mandatory-prefix>.<map>.<W>` (or `EVEX...`) prefix of an
/// instruction's encoding specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VexPrefix {
    pub kind: VexEncodingKind,
    pub vector_size: VectorSize,
    pub mandatory_prefix: Option<u8>,
    pub map: OpcodeMap,
    pub rex_w: RexWUsage,
    /// Whether the instruction reads a second source register through the
    /// `VEX.vvvv`/`EVEX.vvvv` field.
    pub has_vvvv: bool,
    /// The role `vvvv` plays, when the `NDS`/`NDD`/`DDS` token names it
    /// directly. `None` when `has_vvvv` is `false`, or when the
    /// specification text omits the token (pre-vs-post-2018-SDM
    /// revisions; see [`VexOperandUsage`]'s doc comment).
    pub vex_operand_usage: Option<VexOperandUsage>,
    /// `EVEX` only: the instruction supports the `{k1}` opmask.
    pub has_opmask: bool,
    /// `EVEX` only: the instruction supports `{z}` (zeroing-masking).
    pub has_zeroing_mask: bool,
    /// `EVEX` only: the instruction supports `{1toN}` broadcasting.
    pub has_broadcast: bool,
}

/// How the ModR/M byte, if any, is used by the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModRmUsage {
    #[default]
    NoModRm,
    /// `/r`: ModR/M.reg names a register operand, ModR/M.rm names a register
    /// or memory operand.
    FullModRm,
    /// `/0` through `/7`: ModR/M.reg is a fixed opcode extension;
    /// ModR/M.rm still names a register or memory operand.
    OpcodeExtension(u8),
}

/// A trailing `+rb`/`+rw`/`+rd`/`+ro`/`+i` suffix on the last opcode byte:
/// the low 3 bits of that byte encode a register or (for `+i`) an XMM
/// register used as an implicit operand index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeRegisterSuffix {
    /// `+rb`/`+rw`/`+rd`/`+ro`: register encoded in the opcode byte, with the
    /// operand width implied by the suffix letter.
    PlusR,
    /// `+i`: register index encoded in the opcode byte (used by `x87`
    /// `FXCH`-style instructions).
    PlusI,
}

/// A fully parsed instruction encoding specification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodingSpecification {
    pub legacy_prefixes: LegacyPrefixes,
    pub vex_prefix: Option<VexPrefix>,
    pub rex_w: RexWUsage,
    /// The escape sequence (`0F`/`0F 38`/`0F 3A`) that precedes `opcode_bytes`
    /// for a *legacy* (non-VEX/EVEX) encoding. Always `OneByteOpcode` when
    /// `vex_prefix` is set, since a VEX/EVEX prefix's `map` field (inside
    /// [`VexPrefix`]) carries the same information there instead — the VEX
    /// textual grammar never spells the escape bytes out literally.
    pub opcode_map: OpcodeMap,
    /// The opcode byte(s) that follow `opcode_map`'s escape, most
    /// significant byte first. Combine with `opcode_map` (or, for a
    /// VEX/EVEX instruction, with `vex_prefix`'s `map`) via [`Self::opcode`]
    /// to recover the full big-endian packed opcode (e.g. `0x0F58`,
    /// `0x0F38F1`).
    pub opcode_bytes: Vec<u8>,
    pub opcode_register_suffix: Option<OpcodeRegisterSuffix>,
    pub modrm_usage: ModRmUsage,
    /// `/vsib`: the ModR/M.rm slot (if any) is replaced by a SIB byte whose
    /// index field names a vector register, used by gather/scatter
    /// instructions. Takes the `ModrmRm` encoding slot's place in
    /// [`available_encodings`].
    pub vsib: bool,
    /// `/is4`: a trailing immediate byte whose high nibble selects a
    /// register (AVX's 4-operand instructions).
    pub has_vex_suffix_immediate: bool,
    /// `ib`/`iw`/`id`/`io` suffixes, in the order they appear (width in
    /// bytes: 1/2/4/8); at most two, per spec.
    pub immediate_value_bytes: Vec<u8>,
    /// `cb`/`cw`/`cd`/`cp`: width in bytes of a trailing code offset (0 if
    /// none).
    pub code_offset_bytes: u32,
    /// `m16&32`, `m16&16`, ... trailing memory-size tags that do not affect
    /// the binary encoding but disambiguate the operand's size.
    pub memory_size_tag: Option<String>,
}

impl EncodingSpecification {
    /// The full big-endian packed opcode, escape bytes included
    /// (e.g. `0x0F38F1`). For a VEX/EVEX instruction the escape comes from
    /// `vex_prefix`'s `map` instead of `opcode_map`, since the textual
    /// grammar folds it into the VEX prefix rather than spelling it out as
    /// opcode bytes.
    pub fn opcode(&self) -> u32 {
        let map = match &self.vex_prefix {
            Some(vex) => vex.map,
            None => self.opcode_map,
        };
        let mut value: u32 = 0;
        for byte in map.escape_bytes() {
            value = (value << 8) | u32::from(*byte);
        }
        for byte in &self.opcode_bytes {
            value = (value << 8) | u32::from(*byte);
        }
        value
    }
}

impl fmt::Display for OpcodeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneByteOpcode => write!(f, ""),
            Self::Map0F => write!(f, "0F"),
            Self::Map0F38 => write!(f, "0F38"),
            Self::Map0F3A => write!(f, "0F3A"),
        }
    }
}

/// Tokenizes on ASCII whitespace and parses each token in sequence. The
/// grammar does not require backtracking: legacy prefixes and the VEX/EVEX
/// prefix always come first, then opcode bytes, then `/r` or `/0`-`/7`, then
/// suffixes.
pub fn parse(specification: &str) -> Result<EncodingSpecification> {
    let tokens: Vec<&str> = specification.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(Status::invalid_argument("empty encoding specification"));
    }

    let mut spec = EncodingSpecification::default();
    let mut index = 0;

    while index < tokens.len() {
        let token = tokens[index];
        if let Some(vex) = parse_vex_prefix(token)? {
            if spec.vex_prefix.is_some() {
                return Err(Status::invalid_argument(format!(
                    "duplicate VEX/EVEX prefix in '{specification}'"
                )));
            }
            spec.rex_w = vex.rex_w;
            spec.vex_prefix = Some(vex);
            index += 1;
            continue;
        }
        match token {
            "NP" => {
                spec.legacy_prefixes.no_mandatory_prefix = true;
                index += 1;
            }
            "NFx" => {
                spec.legacy_prefixes.no_fwait_prefix = true;
                index += 1;
            }
            "66" => {
                spec.legacy_prefixes.mandatory_66 = true;
                index += 1;
            }
            "67" => {
                spec.legacy_prefixes.address_size_override = true;
                index += 1;
            }
            "F2" => {
                spec.legacy_prefixes.mandatory_f2 = true;
                index += 1;
            }
            "F3" => {
                spec.legacy_prefixes.mandatory_f3 = true;
                index += 1;
            }
            "REX" | "+" => {
                index += 1;
            }
            "REX.W" => {
                spec.rex_w = RexWUsage::Required;
                index += 1;
            }
            "/r" => {
                spec.modrm_usage = ModRmUsage::FullModRm;
                index += 1;
            }
            "/is4" => {
                spec.has_vex_suffix_immediate = true;
                index += 1;
            }
            "/vsib" => {
                spec.vsib = true;
                if spec.modrm_usage == ModRmUsage::NoModRm {
                    spec.modrm_usage = ModRmUsage::FullModRm;
                }
                index += 1;
            }
            "ib" => {
                push_immediate_value_bytes(&mut spec, 1)?;
                index += 1;
            }
            "iw" => {
                push_immediate_value_bytes(&mut spec, 2)?;
                index += 1;
            }
            "id" => {
                push_immediate_value_bytes(&mut spec, 4)?;
                index += 1;
            }
            "io" => {
                push_immediate_value_bytes(&mut spec, 8)?;
                index += 1;
            }
            "cb" => {
                spec.code_offset_bytes = 1;
                index += 1;
            }
            "cw" => {
                spec.code_offset_bytes = 2;
                index += 1;
            }
            "cd" => {
                spec.code_offset_bytes = 4;
                index += 1;
            }
            "cp" => {
                spec.code_offset_bytes = 6;
                index += 1;
            }
            _ if token.len() == 2 && token.starts_with('/') && token.as_bytes()[1].is_ascii_digit() => {
                let digit = token.as_bytes()[1] - b'0';
                if digit > 7 {
                    return Err(Status::invalid_argument(format!(
                        "opcode extension out of range in '{token}'"
                    )));
                }
                spec.modrm_usage = ModRmUsage::OpcodeExtension(digit);
                index += 1;
            }
            _ if token.starts_with("m") && token.contains('&') => {
                spec.memory_size_tag = Some(token.to_string());
                index += 1;
            }
            _ => {
                let (byte, suffix) = parse_opcode_byte(token)?;
                spec.opcode_bytes.push(byte);
                if let Some(suffix) = suffix {
                    spec.opcode_register_suffix = Some(suffix);
                }
                index += 1;
            }
        }
    }

    if spec.opcode_bytes.is_empty() {
        return Err(Status::invalid_argument(format!(
            "encoding specification '{specification}' has no opcode byte"
        )));
    }
    if spec.vex_prefix.is_none()
        && matches!(
            spec.opcode_bytes.as_slice(),
            [0x0F] | [0x0F, 0x38] | [0x0F, 0x3A]
        )
    {
        return Err(Status::invalid_argument(format!(
            "encoding specification '{specification}' is a bare escape byte, not a complete opcode"
        )));
    }
    extract_opcode_map(&mut spec);
    Ok(spec)
}

fn push_immediate_value_bytes(spec: &mut EncodingSpecification, width: u8) -> Result<()> {
    if spec.immediate_value_bytes.len() >= 2 {
        return Err(Status::invalid_argument(
            "encoding specification has more than two immediate-value suffixes",
        ));
    }
    spec.immediate_value_bytes.push(width);
    Ok(())
}

/// Splits the leading escape bytes (`0F`, `0F 38`, `0F 3A`) off the front of
/// `opcode_bytes` into `opcode_map`, for `vex_prefix`-free instructions, so
/// that `opcode_bytes` only ever holds the bytes actually fed to the
/// mnemonic's numeric encoding (matching `GetAvailableEncodings`' assumption
/// that the *last* opcode byte is the one that may carry a `+r`/`+i` suffix)
/// while `opcode_map`/[`EncodingSpecification::opcode`] still recover the
/// full packed value, escape included.
fn extract_opcode_map(spec: &mut EncodingSpecification) {
    if spec.vex_prefix.is_some() {
        return;
    }
    if spec.opcode_bytes.starts_with(&[0x0F, 0x38]) {
        spec.opcode_map = OpcodeMap::Map0F38;
        spec.opcode_bytes.drain(0..2);
    } else if spec.opcode_bytes.starts_with(&[0x0F, 0x3A]) {
        spec.opcode_map = OpcodeMap::Map0F3A;
        spec.opcode_bytes.drain(0..2);
    } else if spec.opcode_bytes.first() == Some(&0x0F) {
        spec.opcode_map = OpcodeMap::Map0F;
        spec.opcode_bytes.remove(0);
    }
}

fn parse_opcode_byte(token: &str) -> Result<(u8, Option<OpcodeRegisterSuffix>)> {
    let (hex, suffix) = if let Some(stripped) = token.strip_suffix("+rb") {
        (stripped, Some(OpcodeRegisterSuffix::PlusR))
    } else if let Some(stripped) = token.strip_suffix("+rw") {
        (stripped, Some(OpcodeRegisterSuffix::PlusR))
    } else if let Some(stripped) = token.strip_suffix("+rd") {
        (stripped, Some(OpcodeRegisterSuffix::PlusR))
    } else if let Some(stripped) = token.strip_suffix("+ro") {
        (stripped, Some(OpcodeRegisterSuffix::PlusR))
    } else if let Some(stripped) = token.strip_suffix("+i") {
        (stripped, Some(OpcodeRegisterSuffix::PlusI))
    } else {
        (token, None)
    };
    let byte = u8::from_str_radix(hex, 16)
        .map_err(|_| Status::invalid_argument(format!("'{token}' is not a valid opcode byte")))?;
    Ok((byte, suffix))
}

fn parse_vex_prefix(token: &str) -> Result<Option<VexPrefix>> {
    let kind = if let Some(rest) = token.strip_prefix("VEX.") {
        (VexEncodingKind::Vex, rest)
    } else if let Some(rest) = token.strip_prefix("EVEX.") {
        (VexEncodingKind::Evex, rest)
    } else {
        return Ok(None);
    };
    let (encoding_kind, rest) = kind;
    let parts: Vec<&str> = rest.split('.').collect();

    let mut vector_size = VectorSize::Ignored;
    let mut mandatory_prefix = None;
    let mut map = OpcodeMap::OneByteOpcode;
    let mut rex_w = RexWUsage::Unspecified;
    let mut has_vvvv = false;
    let mut vex_operand_usage = None;
    let mut has_opmask = false;
    let mut has_zeroing_mask = false;
    let mut has_broadcast = false;

    for part in parts {
        match part {
            "128" => vector_size = VectorSize::Bits128,
            "256" => vector_size = VectorSize::Bits256,
            "512" => vector_size = VectorSize::Bits512,
            "LIG" | "LZ" => vector_size = VectorSize::Ignored,
            // `L0`/`L1` pin the VEX.L bit's literal value (bit-is-zero /
            // bit-is-one) rather than naming a vector width directly, but
            // for a classic (non-EVEX) VEX prefix that bit *is* the vector
            // width selector, so `L0` means the same 128-bit width as the
            // literal `128` token and `L1` the same 256-bit width as `256`
            // (spec.md §4.1: `VEX.{…,LIG,L0,L1,LZ,128,256}`).
            "L0" => vector_size = VectorSize::Bits128,
            "L1" => vector_size = VectorSize::Bits256,
            "66" => mandatory_prefix = Some(0x66),
            "F2" => mandatory_prefix = Some(0xF2),
            "F3" => mandatory_prefix = Some(0xF3),
            "0F" => map = OpcodeMap::Map0F,
            "0F38" => map = OpcodeMap::Map0F38,
            "0F3A" => map = OpcodeMap::Map0F3A,
            "W0" => rex_w = RexWUsage::Excluded,
            "W1" => rex_w = RexWUsage::Required,
            "WIG" => rex_w = RexWUsage::Unspecified,
            "NDS" => {
                has_vvvv = true;
                vex_operand_usage = Some(VexOperandUsage::FirstSourceRegister);
            }
            "DDS" => {
                has_vvvv = true;
                vex_operand_usage = Some(VexOperandUsage::SecondSourceRegister);
            }
            "NDD" => {
                has_vvvv = true;
                vex_operand_usage = Some(VexOperandUsage::DestinationRegister);
            }
            _ => {
                return Err(Status::invalid_argument(format!(
                    "unrecognized VEX/EVEX component '{part}' in '{token}'"
                )))
            }
        }
    }
    if encoding_kind == VexEncodingKind::Evex {
        has_opmask = true;
        has_zeroing_mask = true;
        has_broadcast = matches!(vector_size, VectorSize::Bits128 | VectorSize::Bits256 | VectorSize::Bits512);
    } else if vector_size == VectorSize::Bits512 {
        return Err(Status::invalid_argument(format!(
            "'{token}' is illegal: VEX does not support a 512-bit vector size (EVEX only)"
        )));
    }
    Ok(Some(VexPrefix {
        kind: encoding_kind,
        vector_size,
        mandatory_prefix,
        map,
        rex_w,
        has_vvvv,
        vex_operand_usage,
        has_opmask,
        has_zeroing_mask,
        has_broadcast,
    }))
}

/// Regenerates the canonical textual form of `spec`, the inverse of
/// [`parse`]. Supplements the distilled spec with the original's
/// `GenerateEncodingSpec`, used by the pipeline's own round-trip tests and by
/// debug output.
pub fn generate(spec: &EncodingSpecification) -> String {
    let mut tokens = Vec::new();
    if let Some(vex) = &spec.vex_prefix {
        let mut vex_token = String::from(if vex.kind == VexEncodingKind::Vex { "VEX" } else { "EVEX" });
        vex_token.push('.');
        vex_token.push_str(match vex.vector_size {
            VectorSize::Bits128 => "128",
            VectorSize::Bits256 => "256",
            VectorSize::Bits512 => "512",
            VectorSize::Ignored => "LIG",
        });
        if let Some(prefix) = vex.mandatory_prefix {
            vex_token.push('.');
            vex_token.push_str(match prefix {
                0x66 => "66",
                0xF2 => "F2",
                0xF3 => "F3",
                _ => "NP",
            });
        }
        vex_token.push('.');
        vex_token.push_str(&vex.map.to_string());
        vex_token.push('.');
        vex_token.push_str(match vex.rex_w {
            RexWUsage::Required => "W1",
            RexWUsage::Excluded => "W0",
            RexWUsage::Unspecified => "WIG",
        });
        tokens.push(vex_token);
    } else {
        if spec.legacy_prefixes.no_mandatory_prefix {
            tokens.push("NP".to_string());
        }
        if spec.legacy_prefixes.no_fwait_prefix {
            tokens.push("NFx".to_string());
        }
        if spec.legacy_prefixes.mandatory_66 {
            tokens.push("66".to_string());
        }
        if spec.legacy_prefixes.address_size_override {
            tokens.push("67".to_string());
        }
        if spec.legacy_prefixes.mandatory_f2 {
            tokens.push("F2".to_string());
        }
        if spec.legacy_prefixes.mandatory_f3 {
            tokens.push("F3".to_string());
        }
        if spec.rex_w == RexWUsage::Required {
            tokens.push("REX.W".to_string());
        }
    }
    if spec.vex_prefix.is_none() {
        for escape_byte in spec.opcode_map.escape_bytes() {
            tokens.push(format!("{escape_byte:02X}"));
        }
    }
    for (position, byte) in spec.opcode_bytes.iter().enumerate() {
        let mut byte_token = format!("{byte:02X}");
        if position + 1 == spec.opcode_bytes.len() {
            match spec.opcode_register_suffix {
                Some(OpcodeRegisterSuffix::PlusR) => byte_token.push_str("+rb"),
                Some(OpcodeRegisterSuffix::PlusI) => byte_token.push_str("+i"),
                None => {}
            }
        }
        tokens.push(byte_token);
    }
    match spec.modrm_usage {
        ModRmUsage::FullModRm if spec.vsib => tokens.push("/vsib".to_string()),
        ModRmUsage::FullModRm => tokens.push("/r".to_string()),
        ModRmUsage::OpcodeExtension(digit) => {
            tokens.push(format!("/{digit}"));
            if spec.vsib {
                tokens.push("/vsib".to_string());
            }
        }
        ModRmUsage::NoModRm => {}
    }
    if spec.has_vex_suffix_immediate {
        tokens.push("/is4".to_string());
    }
    for width in &spec.immediate_value_bytes {
        tokens.push(
            match width {
                1 => "ib",
                2 => "iw",
                4 => "id",
                8 => "io",
                _ => continue,
            }
            .to_string(),
        );
    }
    match spec.code_offset_bytes {
        1 => tokens.push("cb".to_string()),
        2 => tokens.push("cw".to_string()),
        4 => tokens.push("cd".to_string()),
        6 => tokens.push("cp".to_string()),
        _ => {}
    }
    if let Some(tag) = &spec.memory_size_tag {
        tokens.push(tag.clone());
    }
    tokens.join(" ")
}

/// Returns the multiset of operand encoding slots this specification makes
/// available, in the order they would be consumed: ModR/M.reg before
/// ModR/M.rm, then the opcode-embedded register, then VEX.vvvv, then the
/// `/is4` suffix register, then the immediate.
///
/// Mirrors `GetAvailableEncodings`: implicit operands are never returned
/// here, since they are not encoded in the binary specification at all.
pub fn available_encodings(spec: &EncodingSpecification) -> Vec<EncodingSlot> {
    let mut slots = Vec::new();
    match spec.modrm_usage {
        ModRmUsage::FullModRm => {
            slots.push(EncodingSlot::ModrmReg);
            if spec.vsib {
                slots.push(EncodingSlot::Vsib);
            } else {
                slots.push(EncodingSlot::ModrmRm);
            }
        }
        ModRmUsage::OpcodeExtension(_) => {
            slots.push(if spec.vsib { EncodingSlot::Vsib } else { EncodingSlot::ModrmRm });
        }
        ModRmUsage::NoModRm => {}
    }
    if matches!(spec.opcode_register_suffix, Some(OpcodeRegisterSuffix::PlusR | OpcodeRegisterSuffix::PlusI)) {
        slots.push(EncodingSlot::Opcode);
    }
    if let Some(vex) = &spec.vex_prefix {
        if vex.has_vvvv {
            slots.push(EncodingSlot::VexV);
        }
    }
    if spec.has_vex_suffix_immediate {
        slots.push(EncodingSlot::VexSuffix);
    }
    for _ in &spec.immediate_value_bytes {
        slots.push(EncodingSlot::ImmediateValue);
    }
    if spec.code_offset_bytes > 0 {
        slots.push(EncodingSlot::ImmediateValue);
    }
    slots
}

/// The implicit register an `X86FixedRegister` encoding slot stands for, for
/// the handful of registers the encoding grammar itself can name (`AL`,
/// `<XMM0>`, ...). Most fixed registers are not visible in the binary
/// encoding specification at all and are instead recognized from the
/// vendor-syntax operand name (see `operand_tables`).
pub fn fixed_register_name(register: FixedRegister) -> &'static str {
    match register {
        FixedRegister::Al => "AL",
        FixedRegister::Ax => "AX",
        FixedRegister::Eax => "EAX",
        FixedRegister::Rax => "RAX",
        FixedRegister::Dx => "DX",
        FixedRegister::Cl => "CL",
        FixedRegister::St0 => "ST(0)",
        FixedRegister::Xmm0 => "<XMM0>",
    }
}
