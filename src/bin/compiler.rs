use std::{env, fs};
use microcc::logging::error;
use microcc::pipeline;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <input.c> [output.asm]", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];

    let source = fs::read_to_string(input_path)
        .unwrap_or_else(|e| {
            error(format!("failed to read input file: {}", e));
            std::process::exit(2);
        });

    let assembly = pipeline::compile(&pipeline::strip_comments(&source))
        .unwrap_or_else(|e| {
            error(e.to_string());
            std::process::exit(2);
        });

    match args.get(2) {
        Some(output_path) => fs::write(output_path, assembly)
            .unwrap_or_else(|e| {
                error(format!("failed to write to output file: {}", e));
                std::process::exit(3);
            }),
        None => print!("{}", assembly),
    }
}
