//! Machine State: registers, program counter, memory, and run control.

use crate::memory::{Memory, DEFAULT_MEMORY_SIZE};
use crate::registers::RegisterFile;

/// Safety limit on retired instructions within a single `run`, guarding
/// against runaway programs that never reach the end of loaded memory.
pub const DEFAULT_MAX_INSTRUCTIONS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct MachineState {
    pub registers: RegisterFile,
    pub pc: u32,
    pub memory: Memory,
    pub instruction_count: u64,
    pub running: bool,
    pub max_instructions: u64,
    /// Number of bytes of the currently loaded program, recorded at
    /// load time and used to bound `step`/`run`: execution halts once
    /// `pc` reaches this address rather than scanning memory for a
    /// terminator.
    pub program_size: u32,
}

impl MachineState {
    pub fn new(memory_size: usize) -> Self {
        Self {
            registers: RegisterFile::new(),
            pc: 0,
            memory: Memory::new(memory_size),
            instruction_count: 0,
            running: false,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
            program_size: 0,
        }
    }

    /// Reset registers, pc, instruction count, and run state. Memory
    /// contents and `program_size` are left untouched, so a program
    /// can be stepped again from the top over data it already wrote.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.pc = 0;
        self.instruction_count = 0;
        self.running = false;
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}
