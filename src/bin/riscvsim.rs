//! CLI front-end for the simulator: assembles a source file, runs it,
//! and prints final state. `--step` switches to single-instruction
//! mode, advancing one instruction per Enter press.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_num::maybe_hex;
use itertools::Itertools;
use rustyline::DefaultEditor;

use riscvsim::simulator::Simulator;
use riscvsim::SimulatorError;

#[derive(Parser, Debug)]
#[command(name = "riscvsim", about = "Assemble and run an RV32I program")]
struct Args {
    /// Path to an assembly source file.
    input: PathBuf,

    /// Maximum number of instructions to execute.
    #[arg(long, default_value_t = 1000)]
    max_steps: u64,

    /// Single-step interactively, printing state after each step.
    #[arg(short, long)]
    step: bool,

    /// Switch to single-step mode once pc reaches this address.
    #[arg(long, value_parser = maybe_hex::<u32>)]
    pc_breakpoint: Option<u32>,

    /// Print an 8-word memory dump from this address after each step
    /// in single-step mode.
    #[arg(long, value_parser = maybe_hex::<u32>)]
    memory: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let mut sim = Simulator::default();
    if let Err(e) = sim.load_assembly(&source) {
        eprintln!("assembly error: {e}");
        return ExitCode::FAILURE;
    }

    let mut editor = DefaultEditor::new().ok();
    let mut steps_run = 0u64;
    let mut interactive = args.step;

    loop {
        if steps_run >= args.max_steps {
            println!("stopped: reached --max-steps limit ({})", args.max_steps);
            break;
        }
        if let Some(bp) = args.pc_breakpoint {
            if sim.state().pc == bp {
                interactive = true;
            }
        }

        // step does not consult or stop for `running`; it only errors
        // once there is nothing left to fetch (program end) or a real
        // execution fault occurs, matching the source's `step`.
        match sim.step() {
            Ok(()) => {}
            Err(SimulatorError::ProgramBound | SimulatorError::ZeroInstruction) => break,
            Err(e) => {
                eprintln!("execution error at pc=0x{:x}: {e}", sim.state().pc);
                print_final_state(&sim);
                return ExitCode::FAILURE;
            }
        }
        steps_run += 1;

        if interactive {
            print_step(&sim);
            if let Some(addr) = args.memory {
                print_memory(&sim, addr);
            }
            if let Some(editor) = editor.as_mut() {
                let _ = editor.readline("-- press Enter to continue --");
            }
        }
    }

    print_final_state(&sim);
    ExitCode::SUCCESS
}

fn print_step(sim: &Simulator) {
    let state = sim.state();
    println!(
        "pc=0x{:08x} instructions={} registers: {}",
        state.pc,
        state.instruction_count,
        state
            .registers
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| format!("x{i}=0x{v:x}"))
            .join(", "),
    );
}

fn print_memory(sim: &Simulator, start: u32) {
    match sim.memory_dump(start, 32) {
        Ok(words) => {
            let dump = words
                .iter()
                .map(|(address, word)| format!("0x{address:08x}: 0x{word:08x}"))
                .join("\n");
            println!("{dump}");
        }
        Err(e) => eprintln!("memory dump error: {e}"),
    }
}

fn print_final_state(sim: &Simulator) {
    let state = sim.state();
    println!("--- final state ---");
    println!("pc=0x{:08x}", state.pc);
    println!("instructions executed: {}", state.instruction_count);
    println!("running: {}", state.running);
    let names = sim.register_names();
    for (i, value) in state.registers.iter().enumerate() {
        println!("{:<9} = 0x{value:08x} ({value})", names[i]);
    }
    println!("--- last steps ---");
    for entry in sim.log() {
        println!(
            "pc=0x{:08x} word=0x{:08x} changed={:?}",
            entry.pc_before, entry.instruction_word, entry.changed_registers
        );
    }
}
