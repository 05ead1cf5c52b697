//! Decoded instruction formats
//!
//! A 32-bit instruction word is first classified by opcode, then its
//! remaining fields are pulled out into one of these small structs,
//! which the executor matches on directly instead of re-extracting
//! fields inline throughout `exec.rs`.

use crate::fields::{
    funct3, funct7, imm_btype, imm_itype, imm_jtype, imm_stype, imm_utype, opcode, rd, rs1, rs2,
};

#[derive(Debug, Clone, Copy)]
pub struct Rtype {
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u32,
    pub funct7: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Itype {
    pub rd: u8,
    pub rs1: u8,
    pub funct3: u32,
    /// Sign-extended 12-bit immediate.
    pub imm: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Stype {
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u32,
    /// Sign-extended 12-bit immediate.
    pub imm: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Btype {
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u32,
    /// Sign-extended 13-bit byte offset (bit 0 always clear).
    pub imm: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Utype {
    pub rd: u8,
    /// Upper 20 bits already shifted into [31:12].
    pub imm: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Jtype {
    pub rd: u8,
    /// Sign-extended 21-bit byte offset (bit 0 always clear).
    pub imm: u32,
}

pub fn decode_rtype(instr: u32) -> Rtype {
    Rtype {
        rd: rd(instr),
        rs1: rs1(instr),
        rs2: rs2(instr),
        funct3: funct3(instr),
        funct7: funct7(instr),
    }
}

pub fn decode_itype(instr: u32) -> Itype {
    Itype {
        rd: rd(instr),
        rs1: rs1(instr),
        funct3: funct3(instr),
        imm: imm_itype(instr),
    }
}

pub fn decode_stype(instr: u32) -> Stype {
    Stype {
        rs1: rs1(instr),
        rs2: rs2(instr),
        funct3: funct3(instr),
        imm: imm_stype(instr),
    }
}

pub fn decode_btype(instr: u32) -> Btype {
    Btype {
        rs1: rs1(instr),
        rs2: rs2(instr),
        funct3: funct3(instr),
        imm: imm_btype(instr),
    }
}

pub fn decode_utype(instr: u32) -> Utype {
    Utype {
        rd: rd(instr),
        imm: imm_utype(instr),
    }
}

pub fn decode_jtype(instr: u32) -> Jtype {
    Jtype {
        rd: rd(instr),
        imm: imm_jtype(instr),
    }
}

pub fn instr_opcode(instr: u32) -> u32 {
    opcode(instr)
}
