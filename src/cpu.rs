//! An 8-bit CPU: a two-pass assembly parser and a fetch/execute loop
//!
//! The CPU accepts textual assembly in a two-pass manner. The first pass
//! resolves labels into instruction indices without recording them as
//! instructions; the second pass collects the instructions themselves.
//! Comments start with a semicolon (`;`) and continue to the end of the
//! line, and may follow an instruction on the same line. Labels stand on
//! their own line, terminated by a colon:
//!
//! ```text
//! ldi A 10   ; A = 10
//! ldi B 10
//! cmp
//! jne skip
//! ldi A 1
//! skip:
//! hlt
//! ```
//!
//! The machine has two 8-bit registers A and B, a zero and a carry flag,
//! 256 bytes of memory, and a stack that grows downward from the top of
//! memory. Execution starts at instruction 0 and stops at `hlt` or when the
//! program counter runs past the last instruction. A backward `jmp` with no
//! terminating condition loops forever; there is no cycle limit.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

/// Default number of memory cells
pub const DEFAULT_MEMORY_SIZE: usize = 256;
/// Default number of cells reserved for the hardware stack
pub const DEFAULT_STACK_SIZE: usize = 32;

/// A single parsed assembly instruction. Unused arguments stay empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: String,
    pub arg1: String,
    pub arg2: String,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.arg1.is_empty() {
            write!(f, " {}", self.arg1)?;
        }
        if !self.arg2.is_empty() {
            write!(f, " {}", self.arg2)?;
        }
        Ok(())
    }
}

/// An error that stops execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `push` moved the stack pointer below the stack region
    StackOverflow,
    /// A `pop` moved the stack pointer above the stack region
    StackUnderflow,
    /// A jump targeted a label that was never defined
    UndefinedLabel { label: String },
    /// An opcode outside the instruction set
    UnknownOpcode { opcode: String },
    /// An argument that is neither a register name nor a decimal integer,
    /// or a register operand where only A or B is allowed
    InvalidOperand { operand: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StackOverflow => write!(f, "Stack overflow"),
            Error::StackUnderflow => write!(f, "Stack underflow"),
            Error::UndefinedLabel { label } => write!(f, "undefined label '{}'", label),
            Error::UnknownOpcode { opcode } => write!(f, "unknown opcode '{}'", opcode),
            Error::InvalidOperand { operand } => write!(f, "invalid operand '{}'", operand),
        }
    }
}

impl std::error::Error for Error {}

/// The machine state: registers, flags, memory, and the loaded program
pub struct Cpu {
    reg_a: u8,
    reg_b: u8,
    pc: u8,
    sp: u8,
    zero_flag: bool,
    carry_flag: bool,
    memory: Vec<u8>,
    stack_base: usize,
    stack_size: usize,
    instructions: Vec<Instruction>,
    labels: HashMap<String, u8>,
}

impl Cpu {
    /// A CPU with the default memory and stack sizes
    pub fn new() -> Cpu {
        Cpu::with_sizes(DEFAULT_MEMORY_SIZE, DEFAULT_STACK_SIZE)
    }

    /// A CPU with `memory_size` cells, the topmost `stack_size` of which
    /// form the hardware stack. `memory_size` must not exceed 256, the
    /// reach of an 8-bit address
    pub fn with_sizes(memory_size: usize, stack_size: usize) -> Cpu {
        assert!(
            (1..=256).contains(&memory_size),
            "memory is limited to 8-bit addresses"
        );
        assert!(stack_size <= memory_size);
        Cpu {
            reg_a: 0,
            reg_b: 0,
            pc: 0,
            sp: (memory_size - 1) as u8,
            zero_flag: false,
            carry_flag: false,
            memory: vec![0; memory_size],
            stack_base: memory_size - stack_size,
            stack_size,
            instructions: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Parse an assembly listing into the instruction list and label table
    pub fn load_program(&mut self, assembly: &str) {
        self.parse(assembly);
    }

    /// Execute the loaded program from instruction 0 until `hlt`, the end
    /// of the program, or a fault
    pub fn run(&mut self) -> Result<(), Error> {
        self.pc = 0;
        while (self.pc as usize) < self.instructions.len() {
            let instruction = self.instructions[self.pc as usize].clone();
            if instruction.opcode == "hlt" {
                break;
            }
            self.execute(&instruction)?;
        }
        Ok(())
    }

    // =========================================================================
    // Assembly parsing
    // =========================================================================

    /// Strip the comment and surrounding whitespace from a line
    fn clean(line: &str) -> &str {
        line.split(';').next().unwrap_or("").trim()
    }

    fn parse(&mut self, assembly: &str) {
        // First pass: map labels to the index of their successor instruction
        let mut index: u8 = 0;
        for line in assembly.lines() {
            let line = Cpu::clean(line);
            if line.is_empty() {
                continue;
            }
            if let Some(label) = line.strip_suffix(':') {
                // A later definition of the same name wins
                self.labels.insert(label.to_string(), index);
            } else {
                index = index.wrapping_add(1);
            }
        }

        // Second pass: collect instructions, skipping label-only lines
        let field = Regex::new(r"\S+").unwrap();
        for line in assembly.lines() {
            let line = Cpu::clean(line);
            if line.is_empty() || line.ends_with(':') {
                continue;
            }
            let mut fields = field.find_iter(line).map(|m| m.as_str().to_string());
            self.instructions.push(Instruction {
                opcode: fields.next().unwrap_or_default(),
                arg1: fields.next().unwrap_or_default(),
                arg2: fields.next().unwrap_or_default(),
            });
        }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Resolve an argument: a register name reads the register, anything
    /// else parses as a decimal integer truncated to 8 bits
    fn value_of(&self, arg: &str) -> Result<u8, Error> {
        match arg {
            "A" => Ok(self.reg_a),
            "B" => Ok(self.reg_b),
            _ => arg
                .parse::<i64>()
                .map(|value| value as u8)
                .map_err(|_| Error::InvalidOperand {
                    operand: arg.to_string(),
                }),
        }
    }

    fn label_target(&self, label: &str) -> Result<u8, Error> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::UndefinedLabel {
                label: label.to_string(),
            })
    }

    fn write_register(&mut self, name: &str, value: u8) -> Result<(), Error> {
        match name {
            "A" => self.reg_a = value,
            "B" => self.reg_b = value,
            _ => {
                return Err(Error::InvalidOperand {
                    operand: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), Error> {
        // Jumps overwrite this; everything else falls through to it
        let mut next_pc = self.pc.wrapping_add(1);

        match instruction.opcode.as_str() {
            "ldi" => {
                let value = self.value_of(&instruction.arg2)?;
                self.write_register(&instruction.arg1, value)?;
            }
            "lda" => {
                let address = self.value_of(&instruction.arg1)?;
                self.reg_a = self.memory[address as usize];
            }
            "sta" => {
                let address = self.value_of(&instruction.arg1)?;
                self.memory[address as usize] = self.reg_a;
            }
            "mov" => {
                let value = self.value_of(&instruction.arg2)?;
                self.write_register(&instruction.arg1, value)?;
            }
            "add" => {
                let result = self.reg_a as u16 + self.reg_b as u16;
                self.reg_a = result as u8;
                self.carry_flag = result > 255;
                self.zero_flag = self.reg_a == 0;
            }
            "sub" => {
                let result = (self.reg_a as u16).wrapping_sub(self.reg_b as u16);
                self.reg_a = result as u8;
                // The borrow test reads A after the write, so it compares B
                // against the difference rather than the old A
                self.carry_flag = self.reg_b > self.reg_a;
                self.zero_flag = self.reg_a == 0;
            }
            "cmp" => {
                self.zero_flag = self.reg_a == self.reg_b;
                self.carry_flag = self.reg_b > self.reg_a;
            }
            "jmp" => {
                next_pc = self.label_target(&instruction.arg1)?;
            }
            "jne" => {
                if !self.zero_flag {
                    next_pc = self.label_target(&instruction.arg1)?;
                }
            }
            "push" => {
                let value = self.value_of(&instruction.arg1)?;
                self.memory[self.sp as usize] = value;
                self.sp = self.sp.wrapping_sub(1);
                if (self.sp as usize) < self.stack_base {
                    return Err(Error::StackOverflow);
                }
            }
            "pop" => {
                // The upper bound is stack_base + stack_size, which equals
                // 256 under the defaults; the check runs in wide arithmetic
                // because an 8-bit SP cannot represent it
                let raised = self.sp as usize + 1;
                if raised >= self.stack_base + self.stack_size {
                    return Err(Error::StackUnderflow);
                }
                self.sp = raised as u8;
                let value = self.memory[self.sp as usize];
                self.write_register(&instruction.arg1, value)?;
            }
            // `hlt` stops the run loop before execute is reached
            "hlt" => {}
            _ => {
                return Err(Error::UnknownOpcode {
                    opcode: instruction.opcode.clone(),
                });
            }
        }

        self.pc = next_pc;
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn reg_a(&self) -> u8 {
        self.reg_a
    }

    pub fn reg_b(&self) -> u8 {
        self.reg_b
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn zero_flag(&self) -> bool {
        self.zero_flag
    }

    pub fn carry_flag(&self) -> bool {
        self.carry_flag
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &HashMap<String, u8> {
        &self.labels
    }

    /// Print registers and flags in the driver's format
    pub fn print_state(&self) {
        println!("--- CPU State ---");
        println!("A: {} B: {}", self.reg_a, self.reg_b);
        println!("PC: {} SP: {}", self.pc, self.sp);
        println!("Zero: {} Carry: {}", self.zero_flag, self.carry_flag);
    }

    /// Print a window of memory cells starting at `start`
    pub fn print_memory(&self, start: usize, count: usize) {
        println!("--- CPU Memory State ---");
        for address in start..start + count {
            println!("Address [{}]: {}", address, self.memory[address]);
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(assembly: &str) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(assembly);
        cpu.run().unwrap();
        cpu
    }

    // =========================================================================
    // Assembly parsing
    // =========================================================================

    #[test]
    fn comments_blank_lines_and_indentation_are_ignored() {
        let mut cpu = Cpu::new();
        cpu.load_program("; a comment\n\n   ldi A 1  ; trailing comment\n\t\nhlt\n");
        assert_eq!(
            cpu.instructions(),
            &[
                Instruction {
                    opcode: "ldi".to_string(),
                    arg1: "A".to_string(),
                    arg2: "1".to_string(),
                },
                Instruction {
                    opcode: "hlt".to_string(),
                    arg1: String::new(),
                    arg2: String::new(),
                },
            ]
        );
    }

    #[test]
    fn labels_resolve_to_their_successor_instruction() {
        let mut cpu = Cpu::new();
        cpu.load_program("start:\nldi A 1\nmiddle:\nldi B 2\nend:\nhlt");
        assert_eq!(cpu.labels()["start"], 0);
        assert_eq!(cpu.labels()["middle"], 1);
        assert_eq!(cpu.labels()["end"], 2);
        assert_eq!(cpu.instructions().len(), 3);
    }

    #[test]
    fn a_duplicate_label_is_overwritten_by_the_later_one() {
        let mut cpu = Cpu::new();
        cpu.load_program("here:\nldi A 1\nhere:\nhlt");
        assert_eq!(cpu.labels()["here"], 1);
    }

    #[test]
    fn missing_arguments_parse_as_empty_strings() {
        let mut cpu = Cpu::new();
        cpu.load_program("add");
        assert_eq!(cpu.instructions()[0].arg1, "");
        assert_eq!(cpu.instructions()[0].arg2, "");
    }

    #[test]
    fn reparsing_rendered_instructions_is_lossless() {
        let source = "start:\nldi A 10 ; comment\npush A\npop B\njmp start\nhlt";
        let mut cpu = Cpu::new();
        cpu.load_program(source);
        let rendered: String = cpu
            .instructions()
            .iter()
            .map(|i| format!("{}\n", i))
            .collect();
        let mut reparsed = Cpu::new();
        reparsed.load_program(&rendered);
        assert_eq!(cpu.instructions(), reparsed.instructions());
    }

    // =========================================================================
    // Instruction semantics
    // =========================================================================

    #[test]
    fn ldi_loads_either_register() {
        let cpu = run("ldi A 12\nldi B 34\nhlt");
        assert_eq!(cpu.reg_a(), 12);
        assert_eq!(cpu.reg_b(), 34);
    }

    #[test]
    fn lda_and_sta_round_trip_through_memory() {
        let cpu = run("ldi A 99\nsta 5\nldi A 0\nlda 5\nhlt");
        assert_eq!(cpu.reg_a(), 99);
        assert_eq!(cpu.memory()[5], 99);
    }

    #[test]
    fn mov_copies_between_registers() {
        let cpu = run("ldi A 7\nmov B A\nldi A 0\nmov A B\nhlt");
        assert_eq!(cpu.reg_a(), 7);
        assert_eq!(cpu.reg_b(), 7);
    }

    #[test]
    fn add_sets_zero_and_carry_on_overflow_to_zero() {
        let cpu = run("ldi A 255\nldi B 1\nadd\nhlt");
        assert_eq!(cpu.reg_a(), 0);
        assert!(cpu.zero_flag());
        assert!(cpu.carry_flag());
    }

    #[test]
    fn add_without_overflow_clears_both_flags() {
        let cpu = run("ldi A 10\nldi B 20\nadd\nhlt");
        assert_eq!(cpu.reg_a(), 30);
        assert!(!cpu.zero_flag());
        assert!(!cpu.carry_flag());
    }

    #[test]
    fn sub_wraps_at_eight_bits() {
        let cpu = run("ldi A 0\nldi B 1\nsub\nhlt");
        assert_eq!(cpu.reg_a(), 255);
        assert!(!cpu.zero_flag());
        // The borrow test compares B against the wrapped difference, so the
        // underflow that just happened does not raise carry
        assert!(!cpu.carry_flag());
    }

    #[test]
    fn sub_carry_compares_b_against_the_new_a() {
        // 10 - 3 = 7; carry = (3 > 7) = false
        let cpu = run("ldi A 10\nldi B 3\nsub\nhlt");
        assert_eq!(cpu.reg_a(), 7);
        assert!(!cpu.carry_flag());

        // 10 - 7 = 3; carry = (7 > 3) = true, even though nothing borrowed
        let cpu = run("ldi A 10\nldi B 7\nsub\nhlt");
        assert_eq!(cpu.reg_a(), 3);
        assert!(cpu.carry_flag());
    }

    #[test]
    fn sub_to_zero_sets_the_zero_flag() {
        let cpu = run("ldi A 5\nldi B 5\nsub\nhlt");
        assert_eq!(cpu.reg_a(), 0);
        assert!(cpu.zero_flag());
    }

    #[test]
    fn cmp_sets_flags_without_touching_registers() {
        let cpu = run("ldi A 4\nldi B 4\ncmp\nhlt");
        assert_eq!(cpu.reg_a(), 4);
        assert_eq!(cpu.reg_b(), 4);
        assert!(cpu.zero_flag());
        assert!(!cpu.carry_flag());

        let cpu = run("ldi A 3\nldi B 9\ncmp\nhlt");
        assert!(!cpu.zero_flag());
        assert!(cpu.carry_flag());
    }

    #[test]
    fn jmp_skips_over_instructions() {
        let cpu = run("jmp end\nldi A 1\nend:\nhlt");
        assert_eq!(cpu.reg_a(), 0);
    }

    #[test]
    fn jne_is_taken_only_when_the_zero_flag_is_clear() {
        let cpu = run("ldi A 1\nldi B 2\ncmp\njne skip\nldi A 99\nskip:\nhlt");
        assert_eq!(cpu.reg_a(), 1);

        let cpu = run("ldi A 2\nldi B 2\ncmp\njne skip\nldi A 99\nskip:\nhlt");
        assert_eq!(cpu.reg_a(), 99);
    }

    #[test]
    fn a_backward_jmp_loops_until_the_condition_flips() {
        // Counts A down from 3 to 0
        let cpu = run("ldi A 3\nldi B 1\nloop:\nsub\njne loop\nhlt");
        assert_eq!(cpu.reg_a(), 0);
        assert!(cpu.zero_flag());
    }

    #[test]
    fn push_and_pop_use_the_top_of_memory() {
        let cpu = run("ldi A 42\npush A\nldi A 0\npop B\nhlt");
        assert_eq!(cpu.reg_b(), 42);
        assert_eq!(cpu.sp(), 255);
        assert_eq!(cpu.memory()[255], 42);
    }

    #[test]
    fn sp_stays_inside_the_stack_region_of_a_clean_run() {
        let mut cpu = Cpu::new();
        cpu.load_program("ldi A 1\npush A\npush A\npop B\npop B\nhlt");
        cpu.run().unwrap();
        let sp = cpu.sp() as usize;
        assert!((DEFAULT_MEMORY_SIZE - DEFAULT_STACK_SIZE..DEFAULT_MEMORY_SIZE).contains(&sp));
    }

    #[test]
    fn pushing_past_the_stack_region_overflows() {
        let mut cpu = Cpu::with_sizes(256, 2);
        cpu.load_program("ldi A 1\npush A\npush A\npush A\nhlt");
        assert_eq!(cpu.run(), Err(Error::StackOverflow));
    }

    #[test]
    fn popping_an_empty_stack_underflows() {
        let mut cpu = Cpu::new();
        cpu.load_program("pop A\nhlt");
        assert_eq!(cpu.run(), Err(Error::StackUnderflow));
    }

    #[test]
    fn pop_underflow_respects_a_configured_stack_size() {
        // With a 16-cell stack the bound is memory_size - 16 + 16 = 256 as
        // well, so shrink memory too: cells 0..64, stack 48..64
        let mut cpu = Cpu::with_sizes(64, 16);
        cpu.load_program("pop A\nhlt");
        assert_eq!(cpu.run(), Err(Error::StackUnderflow));

        // A balanced push/pop pair still works
        let mut cpu = Cpu::with_sizes(64, 16);
        cpu.load_program("ldi A 9\npush A\npop B\nhlt");
        cpu.run().unwrap();
        assert_eq!(cpu.reg_b(), 9);
    }

    #[test]
    fn hlt_stops_before_later_instructions_run() {
        let cpu = run("ldi A 1\nhlt\nldi A 99");
        assert_eq!(cpu.reg_a(), 1);
        // PC rests on the hlt instruction
        assert_eq!(cpu.pc(), 1);
    }

    #[test]
    fn running_off_the_end_terminates() {
        let cpu = run("ldi A 1\nldi B 2");
        assert_eq!(cpu.pc() as usize, cpu.instructions().len());
    }

    // =========================================================================
    // Faults
    // =========================================================================

    #[test]
    fn an_undefined_label_is_an_error() {
        let mut cpu = Cpu::new();
        cpu.load_program("jmp nowhere\nhlt");
        assert_eq!(
            cpu.run(),
            Err(Error::UndefinedLabel {
                label: "nowhere".to_string()
            })
        );
    }

    #[test]
    fn an_unknown_opcode_is_an_error() {
        let mut cpu = Cpu::new();
        cpu.load_program("frob A 1\nhlt");
        assert_eq!(
            cpu.run(),
            Err(Error::UnknownOpcode {
                opcode: "frob".to_string()
            })
        );
    }

    #[test]
    fn a_malformed_operand_is_an_error() {
        let mut cpu = Cpu::new();
        cpu.load_program("ldi A banana\nhlt");
        assert_eq!(
            cpu.run(),
            Err(Error::InvalidOperand {
                operand: "banana".to_string()
            })
        );
    }

    #[test]
    fn ldi_into_something_other_than_a_register_is_an_error() {
        let mut cpu = Cpu::new();
        cpu.load_program("ldi C 1\nhlt");
        assert_eq!(
            cpu.run(),
            Err(Error::InvalidOperand {
                operand: "C".to_string()
            })
        );
    }
}
