//! A small library of example assembly programs, used by demos and
//! by the CLI's `--example` flag so a user can try the simulator
//! without writing assembly first.

/// Computes the `n`th Fibonacci number (n hardcoded to 10 here) into
/// `x3`, looping with a branch back to `loop_start`.
pub const FIBONACCI: &str = "\
addi x1, x0, 0
addi x2, x0, 1
addi x5, x0, 10
addi x6, x0, 0
loop_start:
beq x6, x5, done
add x3, x1, x2
addi x1, x2, 0
addi x2, x3, 0
addi x6, x6, 1
jal x0, loop_start
done:
ecall
";

/// Computes 6! into `x2` by repeated multiplication implemented with
/// a shift-and-add loop (no M-extension `mul` available).
pub const FACTORIAL: &str = "\
addi x1, x0, 6
addi x2, x0, 1
loop_start:
beq x1, x0, done
addi x4, x0, 0
addi x5, x0, 0
mul_loop:
beq x5, x1, mul_done
add x4, x4, x2
addi x5, x5, 1
jal x0, mul_loop
mul_done:
addi x2, x4, 0
addi x1, x1, -1
jal x0, loop_start
done:
ecall
";

/// Sums a 4-word array stored at the start of memory into `x3`.
pub const ARRAY_SUM: &str = "\
addi x10, x0, 10
sw x10, 0(x0)
addi x10, x0, 20
sw x10, 4(x0)
addi x10, x0, 30
sw x10, 8(x0)
addi x10, x0, 40
sw x10, 12(x0)
addi x1, x0, 0
addi x2, x0, 0
addi x5, x0, 4
loop_start:
beq x2, x5, done
slli x6, x2, 2
lw x7, 0(x6)
add x1, x1, x7
addi x2, x2, 1
jal x0, loop_start
done:
ecall
";

/// Adds two immediates and halts; the smallest possible smoke test.
pub const SIMPLE_ADD: &str = "\
addi x1, x0, 7
addi x2, x0, 35
add x3, x1, x2
ecall
";

/// Look up a bundled example program by name. Returns `None` for an
/// unrecognized name.
pub fn example_program(name: &str) -> Option<&'static str> {
    match name {
        "fibonacci" => Some(FIBONACCI),
        "factorial" => Some(FACTORIAL),
        "array_sum" => Some(ARRAY_SUM),
        "simple_add" => Some(SIMPLE_ADD),
        _ => None,
    }
}

/// Names of every bundled example program, in a stable order.
pub const EXAMPLE_NAMES: [&str; 4] = ["fibonacci", "factorial", "array_sum", "simple_add"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    #[test]
    fn all_examples_assemble_cleanly() {
        for name in EXAMPLE_NAMES {
            let source = example_program(name).unwrap();
            assemble(source).unwrap_or_else(|e| panic!("{name} failed to assemble: {e}"));
        }
    }

    #[test]
    fn unknown_example_name_returns_none() {
        assert!(example_program("does-not-exist").is_none());
    }
}
