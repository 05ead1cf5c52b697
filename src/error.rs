//! Structured error types for every failure domain in the simulator.
//!
//! Each domain gets its own `thiserror`-derived enum so callers can match
//! on the specific failure; the facade (`simulator.rs`) surfaces these
//! directly through `Result`-returning operations.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid register index {0} (must be 0..=31)")]
    InvalidRegister(u8),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MemoryError {
    #[error("memory access out of bounds: address 0x{address:x}, size {size}, memory size 0x{memory_size:x}")]
    OutOfBounds {
        address: u32,
        size: u32,
        memory_size: usize,
    },
    #[error("invalid memory access size {0} (must be 1, 2, or 4)")]
    InvalidSize(u32),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode 0b{0:07b}")]
    UnknownOpcode(u32),
    #[error("unknown funct3/funct7 combination (0b{funct3:03b}, 0b{funct7:07b}) for opcode 0b{opcode:07b}")]
    UnknownFunct { opcode: u32, funct3: u32, funct7: u32 },
    #[error("unknown funct3 0b{funct3:03b} for opcode 0b{opcode:07b}")]
    UnknownFunct3 { opcode: u32, funct3: u32 },
    #[error("unknown system instruction immediate 0x{0:x} (expected 0 for ecall or 1 for ebreak)")]
    UnknownSystemImmediate(u32),
}

/// Errors raised while executing a single decoded instruction against
/// machine state. Combines decode failures (an unrecognized
/// instruction word) with the memory/register failures that can occur
/// mid-execution.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("line {line}: unknown mnemonic '{token}'")]
    UnknownMnemonic { line: usize, token: String },
    #[error("line {line}: unknown register '{token}'")]
    UnknownRegister { line: usize, token: String },
    #[error("line {line}: undefined label '{token}'")]
    UndefinedLabel { line: usize, token: String },
    #[error("line {line}: duplicate label '{token}'")]
    DuplicateLabel { line: usize, token: String },
    #[error("line {line}: malformed operand '{token}'")]
    MalformedOperand { line: usize, token: String },
    #[error("line {line}: malformed immediate '{token}'")]
    MalformedImmediate { line: usize, token: String },
    #[error("line {line}: expected operand after '{token}'")]
    MissingOperand { line: usize, token: String },
}

/// Top-level error type for the simulator facade's fallible operations.
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("program counter out of bounds (end of program)")]
    ProgramBound,
    #[error("invalid instruction (0x0) - end of program")]
    ZeroInstruction,
    #[error("maximum instruction count reached")]
    StepLimit,
}
