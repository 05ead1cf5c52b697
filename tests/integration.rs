//! End-to-end scenarios exercised through the public `Simulator` facade,
//! assembling text and checking machine state after running to completion.

use riscvsim::Simulator;

fn run_to_completion(source: &str) -> Simulator {
    let mut sim = Simulator::new(4096);
    sim.load_assembly(source).unwrap();
    sim.run(10_000).unwrap();
    sim
}

#[test]
fn addi_add_sub() {
    let sim = run_to_completion(
        "addi x1,x0,10\naddi x2,x0,20\nadd x3,x1,x2\nsub x4,x2,x1\necall\n",
    );
    let s = sim.state();
    assert_eq!(s.registers[1], 10);
    assert_eq!(s.registers[2], 20);
    assert_eq!(s.registers[3], 30);
    assert_eq!(s.registers[4], 10);
}

#[test]
fn bitwise_and_or_xor() {
    let sim = run_to_completion(
        "addi x1,x0,0b1100\naddi x2,x0,0b1010\nand x3,x1,x2\nor x4,x1,x2\nxor x5,x1,x2\necall\n",
    );
    let s = sim.state();
    assert_eq!(s.registers[3], 0b1000);
    assert_eq!(s.registers[4], 0b1110);
    assert_eq!(s.registers[5], 0b0110);
}

#[test]
fn shift_instructions() {
    let sim = run_to_completion("addi x1,x0,8\nslli x2,x1,2\nsrli x3,x1,1\necall\n");
    let s = sim.state();
    assert_eq!(s.registers[2], 32);
    assert_eq!(s.registers[3], 4);
}

#[test]
fn store_and_load_word() {
    let sim = run_to_completion(
        "addi x1,x0,42\naddi x2,x0,100\nsw x1,0(x2)\nlw x3,0(x2)\necall\n",
    );
    let s = sim.state();
    assert_eq!(s.registers[3], 42);
    let dump = sim.memory_dump(100, 4).unwrap();
    assert_eq!(dump, vec![(100, 42)]);
}

#[test]
fn fibonacci_loop_eleventh_term() {
    let source = "\
addi x1, x0, 0
addi x2, x0, 1
addi x10, x0, 10
addi x9, x0, 0
loop:
beq x9, x10, done
add x11, x1, x2
addi x1, x2, 0
addi x2, x11, 0
addi x9, x9, 1
jal x0, loop
done:
ecall
";
    let sim = run_to_completion(source);
    assert_eq!(sim.state().registers[11], 89);
}

#[test]
fn store_and_load_byte_sign_and_zero_extend() {
    let sim = run_to_completion(
        "addi x1,x0,0xFF\naddi x2,x0,100\nsb x1,0(x2)\nlb x3,0(x2)\nlbu x4,0(x2)\necall\n",
    );
    let s = sim.state();
    assert_eq!(s.registers[3], 0xFFFF_FFFF);
    assert_eq!(s.registers[4], 0x0000_00FF);
}

#[test]
fn jal_skip_and_link() {
    let sim = run_to_completion("jal x1, L\naddi x2,x0,99\nL: addi x3,x0,50\necall\n");
    let s = sim.state();
    assert_eq!(s.registers[2], 0);
    assert_eq!(s.registers[3], 50);
    // x1 holds the return address: the instruction right after `jal`.
    assert_eq!(s.registers[1], 4);
}

#[test]
fn register_zero_is_always_zero() {
    let sim = run_to_completion("add x0,x1,x2\naddi x0,x0,99\necall\n");
    assert_eq!(sim.state().registers[0], 0);
}

#[test]
fn pc_is_word_aligned_after_every_step() {
    let mut sim = Simulator::new(4096);
    sim.load_assembly("addi x1,x0,1\naddi x2,x0,2\naddi x3,x0,3\necall\n")
        .unwrap();
    while sim.step().is_ok() {
        assert_eq!(sim.state().pc % 4, 0);
    }
}

#[test]
fn rtype_with_rd_zero_changes_nothing_but_pc_and_count() {
    let mut sim = Simulator::new(4096);
    sim.load_assembly("addi x1,x0,5\naddi x2,x0,7\nadd x0,x1,x2\necall\n")
        .unwrap();
    sim.step().unwrap();
    sim.step().unwrap();
    let before = sim.state();
    sim.step().unwrap();
    let after = sim.state();
    assert_eq!(before.registers, after.registers);
    assert_eq!(after.pc, before.pc + 4);
    assert_eq!(after.instruction_count, before.instruction_count + 1);
}

#[test]
fn srai_rounds_toward_negative_infinity() {
    let sim = run_to_completion("addi x1,x0,-7\nsrai x2,x1,1\necall\n");
    assert_eq!(sim.state().registers[2] as i32, -4);
}

#[test]
fn assemble_then_execute_matches_preassembled_words() {
    let source = "addi x1,x0,10\naddi x2,x0,20\nadd x3,x1,x2\necall\n";
    let words = riscvsim::assembler::assemble(source).unwrap();

    let mut via_source = Simulator::new(256);
    via_source.load_assembly(source).unwrap();
    via_source.run(100).unwrap();

    let mut via_words = Simulator::new(256);
    via_words.load_words(&words);
    via_words.run(100).unwrap();

    assert_eq!(via_source.state().registers, via_words.state().registers);
    assert_eq!(via_source.state().pc, via_words.state().pc);
}

#[test]
fn reset_preserves_memory_but_clears_registers_and_pc() {
    let mut sim = Simulator::new(4096);
    sim.load_assembly("addi x1,x0,77\nsw x1,0(x0)\necall\n").unwrap();
    sim.run(100).unwrap();
    assert_ne!(sim.state().registers[1], 0);

    sim.reset();
    assert_eq!(sim.state().pc, 0);
    assert_eq!(sim.state().instruction_count, 0);
    assert_eq!(sim.state().registers[1], 0);
    let dump = sim.memory_dump(0, 4).unwrap();
    assert_eq!(dump, vec![(0, 77)]);
}

#[test]
fn out_of_bounds_memory_access_is_an_error_not_a_panic() {
    let mut sim = Simulator::new(16);
    sim.load_assembly("addi x1,x0,1\naddi x2,x0,1000\nsw x1,0(x2)\necall\n")
        .unwrap();
    let result = sim.run(100);
    assert!(result.is_err());
}
