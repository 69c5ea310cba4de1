//! The abstract syntax tree produced by the parser
//!
//! Nodes own their children outright, so dropping a [`Program`] releases the
//! whole tree. Printing a [`Program`] with `{}` renders the indented tree
//! that the pipeline driver shows after parsing.

use std::fmt;

/// A binary operator of the source language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Equal,
}

impl BinOp {
    /// The operator as it appears in source text
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Equal => "==",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An expression node. Evaluating an expression leaves its value in
/// register A of the generated code
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An integer literal (e.g. `10`)
    Number(i32),
    /// A variable reference (e.g. `a`)
    Identifier(String),
    /// A binary operation (e.g. `a + b`)
    Binary {
        op: BinOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

/// A braced sequence of statements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

/// A statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A variable declaration (e.g. `int a;`)
    VarDecl { name: String },
    /// An assignment (e.g. `a = 10;`)
    Assignment { name: String, value: Expression },
    /// A block of statements (e.g. `{ ... }`)
    Block(Block),
    /// A conditional (e.g. `if (c == 30) { ... }`)
    If { condition: Expression, body: Block },
}

/// The root of the AST, owning every top-level statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Program")?;
        for statement in &self.statements {
            fmt_statement(f, statement, 1)?;
        }
        Ok(())
    }
}

fn fmt_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, indent: usize) -> fmt::Result {
    let indentation = "  ".repeat(indent);
    match statement {
        Statement::VarDecl { name } => writeln!(f, "{}VarDecl: {}", indentation, name),
        Statement::Assignment { name, value } => {
            writeln!(f, "{}Assignment: {}", indentation, name)?;
            fmt_expression(f, value, indent + 1)
        }
        Statement::Block(block) => {
            writeln!(f, "{}Block", indentation)?;
            for statement in &block.statements {
                fmt_statement(f, statement, indent + 1)?;
            }
            Ok(())
        }
        Statement::If { condition, body } => {
            writeln!(f, "{}IfStatement", indentation)?;
            writeln!(f, "{}  Condition:", indentation)?;
            fmt_expression(f, condition, indent + 2)?;
            writeln!(f, "{}  Body:", indentation)?;
            writeln!(f, "{}    Block", indentation)?;
            for statement in &body.statements {
                fmt_statement(f, statement, indent + 3)?;
            }
            Ok(())
        }
    }
}

fn fmt_expression(f: &mut fmt::Formatter<'_>, expression: &Expression, indent: usize) -> fmt::Result {
    let indentation = "  ".repeat(indent);
    match expression {
        Expression::Number(value) => writeln!(f, "{}Number: {}", indentation, value),
        Expression::Identifier(name) => writeln!(f, "{}Identifier: {}", indentation, name),
        Expression::Binary { op, left, right } => {
            writeln!(f, "{}BinaryOp: {}", indentation, op)?;
            fmt_expression(f, left, indent + 1)?;
            fmt_expression(f, right, indent + 1)
        }
    }
}
