//! Fetch/decode/execute for a single RV32I instruction word.
//!
//! Dispatch is a tagged `match` on the opcode field, with an inner
//! `match` on `(funct3, funct7)` where the opcode alone doesn't
//! determine the operation. This is a deliberate choice over a
//! table-driven decoder: at RV32I scale (eleven opcodes) a nested
//! match is both clearer to read against the ISA manual and faster
//! than building and walking a signature table.

use crate::error::{DecodeError, ExecutionError};
use crate::instr_type::{decode_btype, decode_itype, decode_jtype, decode_rtype, decode_stype, decode_utype};
use crate::opcodes::*;
use crate::state::MachineState;

/// Decode and execute one instruction word against `state`, mutating
/// `pc` and/or a register as a side effect. Does not touch
/// `instruction_count` or `running` bookkeeping — that is the facade's
/// job (`simulator.rs`), since it also has to build the execution log.
pub fn execute(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let op = crate::fields::opcode(instr);
    match op {
        OP_REG => execute_rtype(state, instr),
        OP_IMM => execute_itype_arith(state, instr),
        OP_LOAD => execute_load(state, instr),
        OP_STORE => execute_store(state, instr),
        OP_BRANCH => execute_branch(state, instr),
        OP_JAL => execute_jal(state, instr),
        OP_JALR => execute_jalr(state, instr),
        OP_LUI => execute_lui(state, instr),
        OP_AUIPC => execute_auipc(state, instr),
        OP_SYSTEM => execute_system(state, instr),
        other => Err(DecodeError::UnknownOpcode(other).into()),
    }
}

fn signed(value: u32) -> i32 {
    crate::fields::as_signed(value)
}

fn execute_rtype(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_rtype(instr);
    let val1 = state.registers.read(fields.rs1)?;
    let val2 = state.registers.read(fields.rs2)?;

    let result = match (fields.funct3, fields.funct7) {
        (FUNCT3_ADD_SUB, FUNCT7_ZERO) => val1.wrapping_add(val2),
        (FUNCT3_ADD_SUB, FUNCT7_ALT) => val1.wrapping_sub(val2),
        (FUNCT3_SLL, FUNCT7_ZERO) => val1.wrapping_shl(val2 & 0x1f),
        (FUNCT3_SLT, FUNCT7_ZERO) => u32::from(signed(val1) < signed(val2)),
        (FUNCT3_SLTU, FUNCT7_ZERO) => u32::from(val1 < val2),
        (FUNCT3_XOR, FUNCT7_ZERO) => val1 ^ val2,
        (FUNCT3_SRL_SRA, FUNCT7_ZERO) => val1.wrapping_shr(val2 & 0x1f),
        (FUNCT3_SRL_SRA, FUNCT7_ALT) => (signed(val1) >> (val2 & 0x1f)) as u32,
        (FUNCT3_OR, FUNCT7_ZERO) => val1 | val2,
        (FUNCT3_AND, FUNCT7_ZERO) => val1 & val2,
        (f3, f7) => {
            return Err(DecodeError::UnknownFunct {
                opcode: OP_REG,
                funct3: f3,
                funct7: f7,
            }
            .into())
        }
    };

    state.registers.write(fields.rd, result)?;
    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

fn execute_itype_arith(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_itype(instr);
    let val = state.registers.read(fields.rs1)?;
    let imm = fields.imm;

    let result = match fields.funct3 {
        FUNCT3_ADDI => val.wrapping_add(imm),
        FUNCT3_SLTI => u32::from(signed(val) < signed(imm)),
        FUNCT3_SLTIU => u32::from(val < imm),
        FUNCT3_XORI => val ^ imm,
        FUNCT3_ORI => val | imm,
        FUNCT3_ANDI => val & imm,
        FUNCT3_SLLI => {
            let shamt = imm & 0x1f;
            val.wrapping_shl(shamt)
        }
        FUNCT3_SRLI_SRAI => {
            let shamt = imm & 0x1f;
            // Bit 10 of the 12-bit immediate field (bit 30 of the
            // instruction word) distinguishes SRAI from SRLI.
            if (imm >> 10) & 1 == 1 {
                (signed(val) >> shamt) as u32
            } else {
                val.wrapping_shr(shamt)
            }
        }
        other => {
            return Err(DecodeError::UnknownFunct3 {
                opcode: OP_IMM,
                funct3: other,
            }
            .into())
        }
    };

    state.registers.write(fields.rd, result)?;
    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

fn execute_load(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_itype(instr);
    let base = state.registers.read(fields.rs1)?;
    let addr = base.wrapping_add(fields.imm);

    let value = match fields.funct3 {
        FUNCT3_B => crate::fields::sign_extend(state.memory.read(addr, 1)?, 8),
        FUNCT3_H => crate::fields::sign_extend(state.memory.read(addr, 2)?, 16),
        FUNCT3_W => state.memory.read(addr, 4)?,
        FUNCT3_BU => state.memory.read(addr, 1)?,
        FUNCT3_HU => state.memory.read(addr, 2)?,
        other => {
            return Err(DecodeError::UnknownFunct3 {
                opcode: OP_LOAD,
                funct3: other,
            }
            .into())
        }
    };

    state.registers.write(fields.rd, value)?;
    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

fn execute_store(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_stype(instr);
    let base = state.registers.read(fields.rs1)?;
    let addr = base.wrapping_add(fields.imm);
    let value = state.registers.read(fields.rs2)?;

    match fields.funct3 {
        FUNCT3_B => state.memory.write(addr, value, 1)?,
        FUNCT3_H => state.memory.write(addr, value, 2)?,
        FUNCT3_W => state.memory.write(addr, value, 4)?,
        other => {
            return Err(DecodeError::UnknownFunct3 {
                opcode: OP_STORE,
                funct3: other,
            }
            .into())
        }
    };

    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

fn execute_branch(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_btype(instr);
    let val1 = state.registers.read(fields.rs1)?;
    let val2 = state.registers.read(fields.rs2)?;

    let taken = match fields.funct3 {
        FUNCT3_BEQ => val1 == val2,
        FUNCT3_BNE => val1 != val2,
        FUNCT3_BLT => signed(val1) < signed(val2),
        FUNCT3_BGE => signed(val1) >= signed(val2),
        FUNCT3_BLTU => val1 < val2,
        FUNCT3_BGEU => val1 >= val2,
        other => {
            return Err(DecodeError::UnknownFunct3 {
                opcode: OP_BRANCH,
                funct3: other,
            }
            .into())
        }
    };

    state.pc = if taken {
        state.pc.wrapping_add(fields.imm)
    } else {
        state.pc.wrapping_add(4)
    };
    Ok(())
}

fn execute_jal(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_jtype(instr);
    let return_address = state.pc.wrapping_add(4);
    state.registers.write(fields.rd, return_address)?;
    state.pc = state.pc.wrapping_add(fields.imm);
    Ok(())
}

fn execute_jalr(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_itype(instr);
    let base = state.registers.read(fields.rs1)?;
    // Only the LSB is cleared; bit 1 is left alone, so there is no
    // alignment trap on a misaligned target.
    let target = base.wrapping_add(fields.imm) & 0xffff_fffe;
    let return_address = state.pc.wrapping_add(4);
    state.registers.write(fields.rd, return_address)?;
    state.pc = target;
    Ok(())
}

fn execute_lui(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_utype(instr);
    state.registers.write(fields.rd, fields.imm)?;
    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

fn execute_auipc(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let fields = decode_utype(instr);
    let result = state.pc.wrapping_add(fields.imm);
    state.registers.write(fields.rd, result)?;
    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

fn execute_system(state: &mut MachineState, instr: u32) -> Result<(), ExecutionError> {
    let imm = crate::fields::extract_field(instr, 31, 20);
    match imm {
        IMM_ECALL | IMM_EBREAK => {
            state.running = false;
        }
        other => return Err(DecodeError::UnknownSystemImmediate(other).into()),
    }
    state.pc = state.pc.wrapping_add(4);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    fn run_all(state: &mut MachineState, words: &[u32]) {
        for &w in words {
            execute(state, w).unwrap();
        }
    }

    #[test]
    fn add_and_sub() {
        let mut state = MachineState::new(64);
        let words = assemble("addi x1,x0,10\naddi x2,x0,20\nadd x3,x1,x2\nsub x4,x2,x1\n").unwrap();
        run_all(&mut state, &words);
        assert_eq!(state.registers.read(3).unwrap(), 30);
        assert_eq!(state.registers.read(4).unwrap(), 10);
    }

    #[test]
    fn srai_divides_toward_negative_infinity() {
        let mut state = MachineState::new(64);
        let words = assemble("addi x1,x0,-7\nsrai x2,x1,1\n").unwrap();
        run_all(&mut state, &words);
        // -7 >> 1 arithmetic == -4 (floor division), not -3 (truncation).
        assert_eq!(state.registers.read(2).unwrap() as i32, -4);
    }

    #[test]
    fn rtype_with_rd_zero_only_advances_pc() {
        let mut state = MachineState::new(64);
        state.registers.write(1, 5).unwrap();
        state.registers.write(2, 7).unwrap();
        let before = state.registers.snapshot();
        let words = assemble("add x0,x1,x2\n").unwrap();
        execute(&mut state, words[0]).unwrap();
        assert_eq!(state.registers.snapshot(), before);
        assert_eq!(state.pc, 4);
    }

    #[test]
    fn lb_sign_extends_lhu_zero_extends() {
        let mut state = MachineState::new(128);
        let words =
            assemble("addi x1,x0,0xFF\naddi x2,x0,100\nsb x1,0(x2)\nlb x3,0(x2)\nlbu x4,0(x2)\n")
                .unwrap();
        run_all(&mut state, &words);
        assert_eq!(state.registers.read(3).unwrap(), 0xffff_ffff);
        assert_eq!(state.registers.read(4).unwrap(), 0x0000_00ff);
    }

    #[test]
    fn unknown_opcode_errors() {
        let mut state = MachineState::new(64);
        // All-ones low 7 bits is not a valid RV32I opcode.
        let result = execute(&mut state, 0x7f);
        assert!(result.is_err());
    }
}
