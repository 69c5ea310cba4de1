//! Wires the stages together: source text in, assembly text out
//!
//! Each stage halts at its first error, which travels up unchanged inside a
//! stage-tagged [`Error`] whose display form is the single diagnostic line
//! the driver prints.

use std::fmt;

use crate::codegen::{self, CodeGenerator};
use crate::lexer;
use crate::parser::{self, Parser};
use crate::{ast::Program, cpu};

/// An error from any stage of the pipeline, tagged with its origin
#[derive(Debug)]
pub enum Error {
    Parser(parser::Error),
    CodeGenerator(codegen::Error),
    Cpu(cpu::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parser(e) => write!(f, "Parser Error: {}", e),
            Error::CodeGenerator(e) => write!(f, "CodeGenerator Error: {}", e),
            Error::Cpu(e) => write!(f, "CPU Simulation Error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parser(e) => Some(e),
            Error::CodeGenerator(e) => Some(e),
            Error::Cpu(e) => Some(e),
        }
    }
}

impl From<parser::Error> for Error {
    fn from(e: parser::Error) -> Error {
        Error::Parser(e)
    }
}

impl From<codegen::Error> for Error {
    fn from(e: codegen::Error) -> Error {
        Error::CodeGenerator(e)
    }
}

impl From<cpu::Error> for Error {
    fn from(e: cpu::Error) -> Error {
        Error::Cpu(e)
    }
}

/// Remove `//` line comments from source text. The lexer never sees
/// comments; this runs before it
pub fn strip_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lex and parse comment-stripped source into an AST
pub fn parse(source: &str) -> Result<Program, Error> {
    let tokens = lexer::tokenize(source);
    Ok(Parser::new(tokens).parse()?)
}

/// Compile comment-stripped source text into assembly
pub fn compile(source: &str) -> Result<String, Error> {
    let program = parse(source)?;
    Ok(CodeGenerator::new().generate(&program)?)
}
