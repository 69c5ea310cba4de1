use std::{env, fs};
use microcc::cpu::Cpu;
use microcc::logging::error;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <program.asm>", args[0]);
        std::process::exit(1);
    }

    let assembly = fs::read_to_string(&args[1])
        .unwrap_or_else(|e| {
            error(format!("failed to read input file: {}", e));
            std::process::exit(2);
        });

    let mut cpu = Cpu::new();
    cpu.load_program(&assembly);
    if let Err(e) = cpu.run() {
        error(format!("CPU Simulation Error: {}", e));
        std::process::exit(3);
    }

    cpu.print_state();
    cpu.print_memory(0, 8);
}
