//! Two-pass RV32I assembler: assembly text -> a sequence of 32-bit
//! instruction words.
//!
//! Pass 1 walks the source once to record label addresses without
//! emitting anything; pass 2 walks it again, resolving labels against
//! the table pass 1 built and encoding each instruction. One assembly
//! line yields at most one instruction.

use std::collections::HashMap;

use crate::error::AssemblyError;
use crate::opcodes::*;

/// Encode an R-type instruction: `(funct7<<25)|(rs2<<20)|(rs1<<15)|(funct3<<12)|(rd<<7)|op`.
fn encode_rtype(op: u32, funct3: u32, funct7: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | op
}

/// Encode an I-type instruction. `imm` is masked to 12 bits.
fn encode_itype(op: u32, funct3: u32, rd: u32, rs1: u32, imm: u32) -> u32 {
    ((imm & 0xfff) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | op
}

/// Encode an S-type instruction, splitting `imm[11:5]` and `imm[4:0]`.
fn encode_stype(op: u32, funct3: u32, rs1: u32, rs2: u32, imm: u32) -> u32 {
    let imm = imm & 0xfff;
    let imm11_5 = (imm >> 5) & 0x7f;
    let imm4_0 = imm & 0x1f;
    (imm11_5 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (imm4_0 << 7) | op
}

/// Encode a B-type instruction, scrambling the 13-bit signed byte
/// offset into imm[12]->31, imm[10:5]->30:25, imm[4:1]->11:8, imm[11]->7.
fn encode_btype(op: u32, funct3: u32, rs1: u32, rs2: u32, imm: u32) -> u32 {
    let imm = imm & 0x1fff;
    let imm12 = (imm >> 12) & 0x1;
    let imm10_5 = (imm >> 5) & 0x3f;
    let imm4_1 = (imm >> 1) & 0xf;
    let imm11 = (imm >> 11) & 0x1;
    (imm12 << 31) | (imm10_5 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (imm4_1 << 8) | (imm11 << 7) | op
}

/// Encode a U-type instruction; the low 12 bits of `imm` are ignored.
fn encode_utype(op: u32, rd: u32, imm: u32) -> u32 {
    (imm & 0xffff_f000) | (rd << 7) | op
}

/// Encode a J-type instruction, scrambling the 21-bit signed byte
/// offset into imm[20]->31, imm[10:1]->30:21, imm[11]->20, imm[19:12]->19:12.
fn encode_jtype(op: u32, rd: u32, imm: u32) -> u32 {
    let imm = imm & 0x1f_ffff;
    let imm20 = (imm >> 20) & 0x1;
    let imm10_1 = (imm >> 1) & 0x3ff;
    let imm11 = (imm >> 11) & 0x1;
    let imm19_12 = (imm >> 12) & 0xff;
    (imm20 << 31) | (imm19_12 << 12) | (imm11 << 20) | (imm10_1 << 21) | (rd << 7) | op
}

/// Resolve an architectural or ABI register name to its index.
/// Case-insensitive.
fn parse_register(token: &str, line: usize) -> Result<u32, AssemblyError> {
    let name = token.trim().to_ascii_lowercase();
    let index = match name.as_str() {
        "x0" | "zero" => 0,
        "x1" | "ra" => 1,
        "x2" | "sp" => 2,
        "x3" | "gp" => 3,
        "x4" | "tp" => 4,
        "x5" | "t0" => 5,
        "x6" | "t1" => 6,
        "x7" | "t2" => 7,
        "x8" | "s0" | "fp" => 8,
        "x9" | "s1" => 9,
        "x10" | "a0" => 10,
        "x11" | "a1" => 11,
        "x12" | "a2" => 12,
        "x13" | "a3" => 13,
        "x14" | "a4" => 14,
        "x15" | "a5" => 15,
        "x16" | "a6" => 16,
        "x17" | "a7" => 17,
        "x18" | "s2" => 18,
        "x19" | "s3" => 19,
        "x20" | "s4" => 20,
        "x21" | "s5" => 21,
        "x22" | "s6" => 22,
        "x23" | "s7" => 23,
        "x24" | "s8" => 24,
        "x25" | "s9" => 25,
        "x26" | "s10" => 26,
        "x27" | "s11" => 27,
        "x28" | "t3" => 28,
        "x29" | "t4" => 29,
        "x30" | "t5" => 30,
        "x31" | "t6" => 31,
        _ => {
            return Err(AssemblyError::UnknownRegister {
                line,
                token: token.to_string(),
            })
        }
    };
    Ok(index)
}

/// Parse a decimal, `0x`-hex, or `0b`-binary immediate. Negative
/// decimals are permitted; negative hex/binary are rejected as
/// malformed rather than guessed at.
fn parse_immediate(token: &str, line: usize) -> Result<i64, AssemblyError> {
    let trimmed = token.trim();
    let malformed = || AssemblyError::MalformedImmediate {
        line,
        token: token.to_string(),
    };
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| malformed())
    } else if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).map_err(|_| malformed())
    } else {
        trimmed.parse::<i64>().map_err(|_| malformed())
    }
}

/// Parse a memory operand of the form `offset(basereg)` into its
/// immediate and base-register fields.
fn parse_memory_operand(token: &str, line: usize) -> Result<(i64, u32), AssemblyError> {
    let malformed = || AssemblyError::MalformedOperand {
        line,
        token: token.to_string(),
    };
    let open = token.find('(').ok_or_else(malformed)?;
    if !token.ends_with(')') {
        return Err(malformed());
    }
    let offset_str = &token[..open];
    let reg_str = &token[open + 1..token.len() - 1];
    let offset = parse_immediate(offset_str, line)?;
    let base = parse_register(reg_str, line)?;
    Ok((offset, base))
}

/// Strip a `#`-prefixed comment, if any.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split a `name:` label prefix from the remainder of the line, if
/// present. Returns `(label, remainder)`.
fn split_label(line: &str) -> (Option<&str>, &str) {
    match line.find(':') {
        Some(idx) => (Some(line[..idx].trim()), line[idx + 1..].trim()),
        None => (None, line.trim()),
    }
}

/// Tokenize an instruction's operand text: commas act as separators
/// alongside whitespace, producing `[mnemonic, operand, operand, ...]`.
fn tokenize(text: &str) -> Vec<String> {
    text.replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn require_operand<'a>(parts: &'a [String], index: usize, line: usize) -> Result<&'a str, AssemblyError> {
    parts
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| AssemblyError::MissingOperand {
            line,
            token: parts.first().cloned().unwrap_or_default(),
        })
}

/// Resolve a branch/jump target: either a known label (resolved to a
/// pc-relative byte offset) or a literal numeric offset.
fn resolve_target(
    token: &str,
    pc: u32,
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<i64, AssemblyError> {
    if let Some(&addr) = symbols.get(token) {
        Ok(i64::from(addr) - i64::from(pc))
    } else if token.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-') {
        parse_immediate(token, line)
    } else {
        Err(AssemblyError::UndefinedLabel {
            line,
            token: token.to_string(),
        })
    }
}

struct RtypeSpec {
    funct3: u32,
    funct7: u32,
}

fn rtype_spec(mnemonic: &str) -> Option<RtypeSpec> {
    let (funct3, funct7) = match mnemonic {
        "add" => (FUNCT3_ADD_SUB, FUNCT7_ZERO),
        "sub" => (FUNCT3_ADD_SUB, FUNCT7_ALT),
        "sll" => (FUNCT3_SLL, FUNCT7_ZERO),
        "slt" => (FUNCT3_SLT, FUNCT7_ZERO),
        "sltu" => (FUNCT3_SLTU, FUNCT7_ZERO),
        "xor" => (FUNCT3_XOR, FUNCT7_ZERO),
        "srl" => (FUNCT3_SRL_SRA, FUNCT7_ZERO),
        "sra" => (FUNCT3_SRL_SRA, FUNCT7_ALT),
        "or" => (FUNCT3_OR, FUNCT7_ZERO),
        "and" => (FUNCT3_AND, FUNCT7_ZERO),
        _ => return None,
    };
    Some(RtypeSpec { funct3, funct7 })
}

fn itype_arith_funct3(mnemonic: &str) -> Option<u32> {
    Some(match mnemonic {
        "addi" => FUNCT3_ADDI,
        "slti" => FUNCT3_SLTI,
        "sltiu" => FUNCT3_SLTIU,
        "xori" => FUNCT3_XORI,
        "ori" => FUNCT3_ORI,
        "andi" => FUNCT3_ANDI,
        "slli" => FUNCT3_SLLI,
        "srli" | "srai" => FUNCT3_SRLI_SRAI,
        _ => return None,
    })
}

fn load_funct3(mnemonic: &str) -> Option<u32> {
    Some(match mnemonic {
        "lb" => FUNCT3_B,
        "lh" => FUNCT3_H,
        "lw" => FUNCT3_W,
        "lbu" => FUNCT3_BU,
        "lhu" => FUNCT3_HU,
        _ => return None,
    })
}

fn store_funct3(mnemonic: &str) -> Option<u32> {
    Some(match mnemonic {
        "sb" => FUNCT3_B,
        "sh" => FUNCT3_H,
        "sw" => FUNCT3_W,
        _ => return None,
    })
}

fn branch_funct3(mnemonic: &str) -> Option<u32> {
    Some(match mnemonic {
        "beq" => FUNCT3_BEQ,
        "bne" => FUNCT3_BNE,
        "blt" => FUNCT3_BLT,
        "bge" => FUNCT3_BGE,
        "bltu" => FUNCT3_BLTU,
        "bgeu" => FUNCT3_BGEU,
        _ => return None,
    })
}

/// Assemble a single instruction's token list into a 32-bit word.
/// `pc` is the byte address this instruction will be loaded at.
fn assemble_instruction(
    parts: &[String],
    pc: u32,
    symbols: &HashMap<String, u32>,
    line: usize,
) -> Result<u32, AssemblyError> {
    let mnemonic = parts[0].to_ascii_lowercase();

    if let Some(spec) = rtype_spec(&mnemonic) {
        let rd = parse_register(require_operand(parts, 1, line)?, line)?;
        let rs1 = parse_register(require_operand(parts, 2, line)?, line)?;
        let rs2 = parse_register(require_operand(parts, 3, line)?, line)?;
        return Ok(encode_rtype(OP_REG, spec.funct3, spec.funct7, rd, rs1, rs2));
    }

    if let Some(funct3) = itype_arith_funct3(&mnemonic) {
        let rd = parse_register(require_operand(parts, 1, line)?, line)?;
        let rs1 = parse_register(require_operand(parts, 2, line)?, line)?;
        let imm_token = require_operand(parts, 3, line)?;
        let mut imm = parse_immediate(imm_token, line)? as u32;
        if mnemonic == "srai" {
            imm |= 0x400;
        }
        return Ok(encode_itype(OP_IMM, funct3, rd, rs1, imm));
    }

    if let Some(funct3) = load_funct3(&mnemonic) {
        let rd = parse_register(require_operand(parts, 1, line)?, line)?;
        let (offset, base) = parse_memory_operand(require_operand(parts, 2, line)?, line)?;
        return Ok(encode_itype(OP_LOAD, funct3, rd, base, offset as u32));
    }

    if let Some(funct3) = store_funct3(&mnemonic) {
        let rs2 = parse_register(require_operand(parts, 1, line)?, line)?;
        let (offset, base) = parse_memory_operand(require_operand(parts, 2, line)?, line)?;
        return Ok(encode_stype(OP_STORE, funct3, base, rs2, offset as u32));
    }

    if let Some(funct3) = branch_funct3(&mnemonic) {
        let rs1 = parse_register(require_operand(parts, 1, line)?, line)?;
        let rs2 = parse_register(require_operand(parts, 2, line)?, line)?;
        let target_token = require_operand(parts, 3, line)?;
        let imm = resolve_target(target_token, pc, symbols, line)?;
        return Ok(encode_btype(OP_BRANCH, funct3, rs1, rs2, imm as u32));
    }

    match mnemonic.as_str() {
        "jal" => {
            let rd = parse_register(require_operand(parts, 1, line)?, line)?;
            let target_token = require_operand(parts, 2, line)?;
            let imm = resolve_target(target_token, pc, symbols, line)?;
            Ok(encode_jtype(OP_JAL, rd, imm as u32))
        }
        "jalr" => {
            let rd = parse_register(require_operand(parts, 1, line)?, line)?;
            let rs1 = parse_register(require_operand(parts, 2, line)?, line)?;
            let imm = match parts.get(3) {
                Some(token) => parse_immediate(token, line)?,
                None => 0,
            };
            Ok(encode_itype(OP_JALR, FUNCT3_JALR, rd, rs1, imm as u32))
        }
        "lui" => {
            let rd = parse_register(require_operand(parts, 1, line)?, line)?;
            let imm = parse_immediate(require_operand(parts, 2, line)?, line)?;
            Ok(encode_utype(OP_LUI, rd, imm as u32))
        }
        "auipc" => {
            let rd = parse_register(require_operand(parts, 1, line)?, line)?;
            let imm = parse_immediate(require_operand(parts, 2, line)?, line)?;
            Ok(encode_utype(OP_AUIPC, rd, imm as u32))
        }
        "ecall" => Ok(OP_SYSTEM | (IMM_ECALL << 20)),
        "ebreak" => Ok(OP_SYSTEM | (IMM_EBREAK << 20)),
        _ => Err(AssemblyError::UnknownMnemonic {
            line,
            token: parts[0].clone(),
        }),
    }
}

/// Assemble RISC-V assembly source text into a sequence of 32-bit
/// instruction words. All-or-nothing: on any error, no partial output
/// is returned.
pub fn assemble(source: &str) -> Result<Vec<u32>, AssemblyError> {
    let lines: Vec<&str> = source.lines().collect();

    // Pass 1: label discovery.
    let mut symbols: HashMap<String, u32> = HashMap::new();
    let mut pc = 0u32;
    for (line_no, raw_line) in lines.iter().enumerate() {
        let stripped = strip_comment(raw_line);
        let (label, remainder) = split_label(stripped);
        if let Some(label) = label {
            if !label.is_empty() {
                if symbols.contains_key(label) {
                    return Err(AssemblyError::DuplicateLabel {
                        line: line_no + 1,
                        token: label.to_string(),
                    });
                }
                symbols.insert(label.to_string(), pc);
            }
        }
        if !remainder.is_empty() {
            pc += 4;
        }
    }

    // Pass 2: emission.
    let mut words = Vec::new();
    let mut pc = 0u32;
    for (line_no, raw_line) in lines.iter().enumerate() {
        let stripped = strip_comment(raw_line);
        let (_, remainder) = split_label(stripped);
        if remainder.is_empty() {
            continue;
        }
        let parts = tokenize(remainder);
        if parts.is_empty() {
            continue;
        }
        let word = assemble_instruction(&parts, pc, &symbols, line_no + 1)?;
        words.push(word);
        pc += 4;
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_addi_add_sub() {
        let words = assemble(
            "addi x1,x0,10\naddi x2,x0,20\nadd x3,x1,x2\nsub x4,x2,x1\necall\n",
        )
        .unwrap();
        assert_eq!(words.len(), 5);
    }

    #[test]
    fn binary_and_decimal_immediates() {
        let words = assemble("addi x1,x0,0b1100\naddi x2,x0,0b1010\n").unwrap();
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn hex_immediate() {
        let words = assemble("addi x1,x0,0xFF\n").unwrap();
        let imm = (words[0] >> 20) & 0xfff;
        assert_eq!(imm, 0xff);
    }

    #[test]
    fn label_resolves_to_relative_offset() {
        let words = assemble("jal x1, L\naddi x2,x0,99\nL: addi x3,x0,50\necall\n").unwrap();
        assert_eq!(words.len(), 4);
        // jal's immediate field should encode +8 (two instructions forward).
        let imm20 = (words[0] >> 31) & 0x1;
        assert_eq!(imm20, 0); // positive offset, sign bit clear
    }

    #[test]
    fn label_and_instruction_share_a_line() {
        let words = assemble("start: addi x1,x0,1\nbne x1,x0,start\n").unwrap();
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn jalr_defaults_missing_immediate_to_zero() {
        let words = assemble("jalr x1, x2\n").unwrap();
        let imm = (words[0] as i32) >> 20;
        assert_eq!(imm, 0);
    }

    #[test]
    fn unknown_mnemonic_fails() {
        let err = assemble("frobnicate x1,x2,x3\n").unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownMnemonic { .. }));
    }

    #[test]
    fn unknown_register_fails() {
        let err = assemble("addi x99,x0,1\n").unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownRegister { .. }));
    }

    #[test]
    fn undefined_label_fails() {
        let err = assemble("jal x1, nowhere\n").unwrap_err();
        assert!(matches!(err, AssemblyError::UndefinedLabel { .. }));
    }

    #[test]
    fn duplicate_label_fails() {
        let err = assemble("a: addi x1,x0,1\na: addi x2,x0,2\n").unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicateLabel { .. }));
    }

    #[test]
    fn malformed_memory_operand_fails() {
        let err = assemble("lw x1, 0x2\n").unwrap_err();
        assert!(matches!(err, AssemblyError::MalformedOperand { .. }));
    }

    #[test]
    fn all_or_nothing_on_failure() {
        // The second line is bad; assembling must not leak a partial
        // vector to the caller through a panic or default value.
        let result = assemble("addi x1,x0,1\nnotarealop x1\n");
        assert!(result.is_err());
    }

    #[test]
    fn srai_sets_bit_30() {
        let words = assemble("srai x1,x2,4\n").unwrap();
        assert_ne!(words[0] & (1 << 30), 0);
    }

    #[test]
    fn register_names_are_case_insensitive() {
        let words = assemble("ADDI X1, ZERO, 5\n").unwrap();
        assert_eq!(words.len(), 1);
    }

    #[test]
    fn blank_lines_and_comment_only_lines_are_skipped() {
        let words = assemble("\n# a comment\naddi x1,x0,1\n   \n").unwrap();
        assert_eq!(words.len(), 1);
    }
}
