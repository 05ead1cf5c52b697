//! The simulator facade: the single entry point embedders use to load
//! a program, step or run it, and inspect its state afterward.
//!
//! This ties the assembler, decoder/executor, and machine state
//! together and adds the bookkeeping none of those care about on
//! their own: the bounded execution log and the load-time program
//! bound that `step`/`run` use to know when a program has finished.

use std::collections::VecDeque;

use crate::assembler::assemble;
use crate::error::{AssemblyError, SimulatorError};
use crate::memory::DEFAULT_MEMORY_SIZE;
use crate::registers::REGISTER_NAMES;
use crate::state::MachineState;

/// How many recent steps `Simulator::log` retains.
pub const LOG_CAPACITY: usize = 10;

/// A single register changed by one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChange {
    pub index: u8,
    pub old: u32,
    pub new: u32,
}

/// One executed instruction's effect on the register file, recorded
/// for the execution log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub pc_before: u32,
    pub instruction_word: u32,
    /// Every register the instruction changed. Empty for instructions
    /// that only move `pc` (branches, stores).
    pub changed_registers: Vec<RegisterChange>,
}

/// A read-only snapshot of the machine, returned by `Simulator::state`.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub registers: [u32; 32],
    pub pc: u32,
    pub instruction_count: u64,
    pub running: bool,
    pub program_size: u32,
}

pub struct Simulator {
    state: MachineState,
    log: VecDeque<LogEntry>,
}

impl Simulator {
    /// Create a simulator with `memory_size` bytes of byte-addressable
    /// memory and nothing loaded.
    pub fn new(memory_size: usize) -> Self {
        Self {
            state: MachineState::new(memory_size),
            log: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    /// Assemble `source` and load the resulting words at address 0,
    /// resetting machine state first.
    pub fn load_assembly(&mut self, source: &str) -> Result<(), AssemblyError> {
        let words = assemble(source)?;
        self.load_words(&words);
        Ok(())
    }

    /// Load pre-assembled instruction words at address 0, resetting
    /// machine state first. Each word is written little-endian.
    ///
    /// Does not touch `running`: loading a program does not start it,
    /// matching `load_program` in the source, which never assigns
    /// `self.running`. Only `run` sets `running = true`.
    pub fn load_words(&mut self, words: &[u32]) {
        self.state.reset();
        self.log.clear();
        for (index, &word) in words.iter().enumerate() {
            let address = (index * 4) as u32;
            // load time, so out-of-range programs are a logic error,
            // not a runtime condition: unwrap is appropriate here.
            self.state
                .memory
                .write(address, word, 4)
                .expect("program exceeds configured memory size");
        }
        self.state.program_size = (words.len() * 4) as u32;
    }

    /// Execute exactly one instruction. Does not consult or update
    /// `running` except indirectly, through `ecall`/`ebreak` clearing
    /// it as a side effect of execution: a direct caller of `step` (a
    /// debugger single-stepping through a breakpoint, say) keeps
    /// stepping past a halt just as the source's `step` does, since it
    /// never reads `self.cpu.running` either. Only `run`'s loop treats
    /// `running` as a stop condition.
    pub fn step(&mut self) -> Result<(), SimulatorError> {
        if self.state.instruction_count >= self.state.max_instructions {
            return Err(SimulatorError::StepLimit);
        }
        if self.state.pc >= self.state.program_size {
            return Err(SimulatorError::ProgramBound);
        }

        let pc_before = self.state.pc;
        let instr = self.state.memory.read(pc_before, 4)?;
        if instr == 0 {
            return Err(SimulatorError::ZeroInstruction);
        }

        let before = self.state.registers.snapshot();
        crate::exec::execute(&mut self.state, instr)?;
        let after = self.state.registers.snapshot();

        let changed_registers = before
            .iter()
            .zip(after.iter())
            .enumerate()
            .filter(|(_, (b, a))| b != a)
            .map(|(i, (&b, &a))| RegisterChange {
                index: i as u8,
                old: b,
                new: a,
            })
            .collect();

        self.push_log(LogEntry {
            pc_before,
            instruction_word: instr,
            changed_registers,
        });
        self.state.instruction_count += 1;

        Ok(())
    }

    /// Step repeatedly until `running` becomes false (via `ecall`/
    /// `ebreak`) or `max_steps` have been executed, whichever comes
    /// first. Sets `running = true` on entry. A step failure — the
    /// step-limit cap, or running off the end of the loaded program
    /// without halting — aborts the run and propagates the error,
    /// rather than being swallowed as a quiet stop.
    pub fn run(&mut self, max_steps: u64) -> Result<u64, SimulatorError> {
        self.state.running = true;
        let mut steps = 0u64;
        while self.state.running && steps < max_steps {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Reset registers, pc, instruction count and run state while
    /// leaving loaded memory and the program bound untouched, so a
    /// program can be replayed from the top.
    pub fn reset(&mut self) {
        self.state.reset();
        self.log.clear();
    }

    pub fn state(&self) -> StateSnapshot {
        StateSnapshot {
            registers: self.state.registers.snapshot(),
            pc: self.state.pc,
            instruction_count: self.state.instruction_count,
            running: self.state.running,
            program_size: self.state.program_size,
        }
    }

    /// Dump `size` bytes of memory starting at `start` as `(address,
    /// word32)` pairs, one per 4-byte-aligned word in range. `start` is
    /// rounded down to a 4-byte boundary first.
    pub fn memory_dump(&self, start: u32, size: u32) -> Result<Vec<(u32, u32)>, SimulatorError> {
        let aligned_start = start & !0x3;
        let word_count = size.div_ceil(4);
        let mut words = Vec::with_capacity(word_count as usize);
        for i in 0..word_count {
            let address = aligned_start.wrapping_add(i * 4);
            let word = self.state.memory.read(address, 4)?;
            words.push((address, word));
        }
        Ok(words)
    }

    /// The last [`LOG_CAPACITY`] executed steps, oldest first.
    pub fn log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    /// Human-readable ABI names for x0..x31, for display purposes.
    pub fn register_names(&self) -> &'static [&'static str; 32] {
        &REGISTER_NAMES
    }

    fn push_log(&mut self, entry: LogEntry) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(entry);
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

/// Assemble and load one of the bundled example programs by name.
pub fn example_program(name: &str) -> Option<&'static str> {
    crate::programs::example_program(name)
}
