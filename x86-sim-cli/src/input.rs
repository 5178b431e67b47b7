//! The CLI's input front-end (spec.md §6 "Input text (per file)").
//!
//! Real disassembly — turning raw instruction bytes or a full assembler
//! grammar into [`x86_sim::basic_block::Instruction`]s — and the IACA
//! marker locator in ELF object files are both named in spec.md §1 as
//! external collaborators this crate only describes an interface for, not
//! implements. This module is the CLI's own stand-in for that interface: a
//! small line-oriented textual format that already carries the scheduling-
//! class key and register read/write facts a real front end would have
//! resolved, so the rest of the CLI can exercise the whole `--input_type`
//! surface end to end without a decoder dependency. `--input_type=bin`
//! locates the IACA marker byte sequences (spec.md §6) over the raw file
//! and then expects the marked region itself to hold this same text format
//! — consistent with spec.md's "bytes are counted, not decoded" framing.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use x86_model::{Register, SubRegisterWidth};
use x86_sim::basic_block::{BasicBlock, Instruction, RegisterOperand};

/// Selects which operand-token dialect the line parser accepts
/// (spec.md §6 `--input_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum InputType {
    /// An IACA-marked binary object; see module docs.
    Bin,
    /// Intel-syntax register tokens, written bare (`eax`).
    IntelAsm,
    /// AT&T-syntax register tokens, written `%`-prefixed (`%eax`).
    AttAsm,
}

/// Opening IACA marker byte sequence (spec.md §6).
const IACA_START_MARKER: [u8; 10] = [0x0F, 0x0B, 0xBB, 0x6F, 0x00, 0x00, 0x00, 0x64, 0x67, 0x90];
/// Closing IACA marker byte sequence (spec.md §6).
const IACA_END_MARKER: [u8; 10] = [0xBB, 0xDE, 0x00, 0x00, 0x00, 0x64, 0x67, 0x90, 0x0F, 0x0B];

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("no IACA-marked region found in {path}")]
    NoMarkedRegion { path: PathBuf },
    #[error("{path}: marked region is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },
    #[error("{path}:{line}: {message}")]
    Parse { path: PathBuf, line: usize, message: String },
    #[error("{path}: no instructions found")]
    Empty { path: PathBuf },
}

/// Reads `path` under `input_type` and builds the [`BasicBlock`] the
/// simulator should run, looping if `is_loop` is set (spec.md §6
/// `--loop_body`).
pub fn read_basic_block(input_type: InputType, path: &Path, is_loop: bool) -> Result<BasicBlock, InputError> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Io { path: path.to_path_buf(), source })?;
    let dialect = match input_type {
        InputType::AttAsm => Dialect::Att,
        InputType::Bin | InputType::IntelAsm => Dialect::Intel,
    };
    let text = match input_type {
        InputType::Bin => {
            let region = extract_marked_region(&bytes).ok_or_else(|| InputError::NoMarkedRegion { path: path.to_path_buf() })?;
            std::str::from_utf8(region).map_err(|_| InputError::NotUtf8 { path: path.to_path_buf() })?.to_string()
        }
        InputType::IntelAsm | InputType::AttAsm => {
            String::from_utf8(bytes).map_err(|_| InputError::NotUtf8 { path: path.to_path_buf() })?
        }
    };

    let mut instructions = Vec::new();
    for (line_number, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let instruction = parse_line(dialect, line)
            .map_err(|message| InputError::Parse { path: path.to_path_buf(), line: line_number + 1, message })?;
        instructions.push(instruction);
    }
    if instructions.is_empty() {
        return Err(InputError::Empty { path: path.to_path_buf() });
    }
    Ok(BasicBlock::new(instructions, is_loop))
}

/// Finds the first `IACA_START_MARKER .. IACA_END_MARKER` span in
/// `bytes` and returns the slice strictly between the two markers, or
/// `None` if no complete marked region exists — spec.md §6: "Only the
/// first marked region in any executable section is used." (This crate
/// has no section table of its own; it scans the whole file as one.)
fn extract_marked_region(bytes: &[u8]) -> Option<&[u8]> {
    let start = find_subsequence(bytes, &IACA_START_MARKER)? + IACA_START_MARKER.len();
    let end = find_subsequence(&bytes[start..], &IACA_END_MARKER)?;
    Some(&bytes[start..start + end])
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Intel,
    Att,
}

/// Parses one line of the form `mnemonic sched_class bytes [op...]`, where
/// each operand token is a read/write sigil (`+` write, `=` read-write,
/// nothing means read) followed by a register name in the dialect's
/// syntax (`%`-prefixed for AT&T).
fn parse_line(dialect: Dialect, line: &str) -> Result<Instruction, String> {
    let mut tokens = line.split_whitespace();
    let mnemonic = tokens.next().ok_or("missing mnemonic")?;
    let sched_class = tokens.next().ok_or("missing scheduling class")?;
    let bytes: u32 = tokens.next().ok_or("missing encoded byte count")?.parse().map_err(|_| "encoded byte count must be an integer".to_string())?;

    let mut registers = Vec::new();
    for token in tokens {
        registers.push(parse_operand(dialect, token)?);
    }

    Ok(Instruction::new(mnemonic, sched_class, bytes).with_registers(registers))
}

fn parse_operand(dialect: Dialect, token: &str) -> Result<RegisterOperand, String> {
    let (usage_tag, rest) = match token.chars().next() {
        Some('+') => ('+', &token[1..]),
        Some('=') => ('=', &token[1..]),
        _ => (' ', token),
    };
    let register_name = match dialect {
        Dialect::Att => rest.strip_prefix('%').ok_or_else(|| format!("AT&T register operand `{token}` must start with `%`"))?,
        Dialect::Intel => rest,
    };
    let (register, width) = register_token(register_name).ok_or_else(|| format!("unknown register `{register_name}`"))?;
    Ok(match usage_tag {
        '+' => RegisterOperand::write(register, width),
        '=' => RegisterOperand { register, width, usage: x86_model::Usage::UsageReadWrite },
        _ => RegisterOperand::read(register, width),
    })
}

/// The sixty-four-odd spellings of the sixteen general-purpose registers
/// across all four sub-register widths this crate models.
fn register_token(token: &str) -> Option<(Register, SubRegisterWidth)> {
    use Register::*;
    use SubRegisterWidth::*;
    const TABLE: &[(&str, Register, SubRegisterWidth)] = &[
        ("rax", Rax, Bits64), ("eax", Rax, Bits32), ("ax", Rax, Bits16), ("al", Rax, Bits8), ("ah", Rax, Bits8),
        ("rcx", Rcx, Bits64), ("ecx", Rcx, Bits32), ("cx", Rcx, Bits16), ("cl", Rcx, Bits8), ("ch", Rcx, Bits8),
        ("rdx", Rdx, Bits64), ("edx", Rdx, Bits32), ("dx", Rdx, Bits16), ("dl", Rdx, Bits8), ("dh", Rdx, Bits8),
        ("rbx", Rbx, Bits64), ("ebx", Rbx, Bits32), ("bx", Rbx, Bits16), ("bl", Rbx, Bits8), ("bh", Rbx, Bits8),
        ("rsp", Rsp, Bits64), ("esp", Rsp, Bits32), ("sp", Rsp, Bits16), ("spl", Rsp, Bits8),
        ("rbp", Rbp, Bits64), ("ebp", Rbp, Bits32), ("bp", Rbp, Bits16), ("bpl", Rbp, Bits8),
        ("rsi", Rsi, Bits64), ("esi", Rsi, Bits32), ("si", Rsi, Bits16), ("sil", Rsi, Bits8),
        ("rdi", Rdi, Bits64), ("edi", Rdi, Bits32), ("di", Rdi, Bits16), ("dil", Rdi, Bits8),
        ("r8", R8, Bits64), ("r8d", R8, Bits32), ("r8w", R8, Bits16), ("r8b", R8, Bits8),
        ("r9", R9, Bits64), ("r9d", R9, Bits32), ("r9w", R9, Bits16), ("r9b", R9, Bits8),
        ("r10", R10, Bits64), ("r10d", R10, Bits32), ("r10w", R10, Bits16), ("r10b", R10, Bits8),
        ("r11", R11, Bits64), ("r11d", R11, Bits32), ("r11w", R11, Bits16), ("r11b", R11, Bits8),
        ("r12", R12, Bits64), ("r12d", R12, Bits32), ("r12w", R12, Bits16), ("r12b", R12, Bits8),
        ("r13", R13, Bits64), ("r13d", R13, Bits32), ("r13w", R13, Bits16), ("r13b", R13, Bits8),
        ("r14", R14, Bits64), ("r14d", R14, Bits32), ("r14w", R14, Bits16), ("r14b", R14, Bits8),
        ("r15", R15, Bits64), ("r15d", R15, Bits32), ("r15w", R15, Bits16), ("r15b", R15, Bits8),
    ];
    let needle = token.to_ascii_lowercase();
    TABLE.iter().find(|(name, _, _)| *name == needle).map(|(_, register, width)| (*register, *width))
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputType::Bin => "bin",
            InputType::IntelAsm => "intel_asm",
            InputType::AttAsm => "att_asm",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile_path::TempPath {
        tempfile_path::write(contents)
    }

    // A tiny local stand-in for a temp-file helper so this module's tests
    // don't need a dev-dependency just to write one file.
    mod tempfile_path {
        use std::path::PathBuf;

        pub struct TempPath(pub PathBuf);
        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
        impl std::ops::Deref for TempPath {
            type Target = std::path::Path;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        pub fn write(contents: &str) -> TempPath {
            use std::io::Write as _;
            let mut path = std::env::temp_dir();
            path.push(format!("x86-sim-cli-test-{}-{:?}", std::process::id(), std::thread::current().id()));
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(contents.as_bytes()).unwrap();
            TempPath(path)
        }
    }

    #[test]
    fn parses_intel_dialect_register_operands() {
        let path = write_tmp("mov WriteALU 3 +eax ecx\n");
        let block = read_basic_block(InputType::IntelAsm, &path, false).unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(block.instructions[0].mnemonic, "mov");
        assert_eq!(block.instructions[0].explicit_registers.len(), 2);
        assert!(block.instructions[0].explicit_registers[0].usage.is_write());
        assert!(block.instructions[0].explicit_registers[1].usage.is_read());
    }

    #[test]
    fn parses_att_dialect_requiring_percent_sigil() {
        let path = write_tmp("add WriteALU 2 +%eax %ecx\n");
        let block = read_basic_block(InputType::AttAsm, &path, false).unwrap();
        assert_eq!(block.instructions[0].explicit_registers.len(), 2);
    }

    #[test]
    fn att_dialect_rejects_bare_register_names() {
        let path = write_tmp("add WriteALU 2 +eax\n");
        assert!(read_basic_block(InputType::AttAsm, &path, false).is_err());
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let path = write_tmp("# a comment\n\nmov WriteALU 3 +eax\n; another comment\n");
        let block = read_basic_block(InputType::IntelAsm, &path, false).unwrap();
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        let path = write_tmp("# nothing but comments\n");
        assert!(matches!(read_basic_block(InputType::IntelAsm, &path, false), Err(InputError::Empty { .. })));
    }

    #[test]
    fn bin_mode_extracts_the_marked_region() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"junk-before");
        bytes.extend_from_slice(&IACA_START_MARKER);
        bytes.extend_from_slice(b"mov WriteALU 3 +eax\n");
        bytes.extend_from_slice(&IACA_END_MARKER);
        bytes.extend_from_slice(b"junk-after");
        let mut path = std::env::temp_dir();
        path.push(format!("x86-sim-cli-test-bin-{}", std::process::id()));
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();
        let block = read_basic_block(InputType::Bin, &path, false).unwrap();
        assert_eq!(block.len(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bin_mode_without_markers_is_rejected() {
        let mut path = std::env::temp_dir();
        path.push(format!("x86-sim-cli-test-nomarker-{}", std::process::id()));
        std::fs::File::create(&path).unwrap().write_all(b"no markers here").unwrap();
        assert!(matches!(read_basic_block(InputType::Bin, &path, false), Err(InputError::NoMarkedRegion { .. })));
        let _ = std::fs::remove_file(&path);
    }
}
