//! The pipeline driver: source text in; tokens, AST, assembly, and final
//! machine state out

use std::{env, fs, process};

use microcc::codegen::CodeGenerator;
use microcc::cpu::Cpu;
use microcc::lexer;
use microcc::logging::{error, section};
use microcc::parser::Parser;
use microcc::pipeline::{self, Error};

/// The program the driver runs when no source file is given
const DEMO_SOURCE: &str = "\
// Variable declaration
int a;
int b;
int c;
// Assignment
a = 10;
b = 20;
c = a + b;
// Conditional
if (c == 30) {
    c = c + 1;
}
";

fn main() {
    let args: Vec<String> = env::args().collect();
    let source = match args.len() {
        1 => DEMO_SOURCE.to_string(),
        2 => fs::read_to_string(&args[1]).unwrap_or_else(|e| {
            error(format!("failed to read {}: {}", args[1], e));
            process::exit(1);
        }),
        _ => {
            eprintln!("Usage: {} [source_file]", args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = run(&source) {
        error(e.to_string());
        process::exit(1);
    }
}

fn run(source: &str) -> Result<(), Error> {
    let source = pipeline::strip_comments(source);

    let tokens = lexer::tokenize(&source);
    section("Lexer Output");
    for token in &tokens {
        println!("Type: {:?}, Value: '{}'", token.kind, token.lexeme);
    }

    let program = Parser::new(tokens).parse()?;
    println!();
    section("AST Output");
    print!("{}", program);
    println!("\nParsing completed successfully.");

    let mut generator = CodeGenerator::new();
    let assembly = generator.generate(&program)?;
    println!();
    section("Assembly Output");
    println!("{}", assembly);
    println!("Code generation completed successfully.");

    let mut cpu = Cpu::new();
    cpu.load_program(&assembly);
    cpu.run()?;
    println!();
    section("Simulation Results");
    cpu.print_state();
    cpu.print_memory(0, generator.variables_allocated());
    println!("\nIntegration test completed successfully.");
    Ok(())
}
