//! Lowers the AST to textual assembly for the 8-bit CPU
//!
//! The generator walks the tree with one contract throughout: after the code
//! for any expression runs, its value sits in register A. Register B and the
//! data stack may be clobbered by sub-expressions. Binary operations save
//! the left operand on the stack while the right side evaluates, so the
//! machine needs no second scratch register beyond B.
//!
//! Variables live in low memory: each declaration claims the next free cell
//! starting from address 0. Equality is only meaningful as the top operator
//! of an `if` condition, where it compiles to `cmp` plus a `jne` past the
//! body.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{BinOp, Block, Expression, Program, Statement};

/// An error raised during code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A variable was referenced before being declared
    UndefinedVariable { name: String },
    /// A variable was declared twice
    RedeclaredVariable { name: String },
    /// An operator with no counterpart in the instruction set, e.g. `==`
    /// outside an `if` condition
    UnsupportedOperator { op: String },
    /// An `if` condition that is not an equality check
    InvalidCondition,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UndefinedVariable { name } => {
                write!(f, "undefined variable '{}'", name)
            }
            Error::RedeclaredVariable { name } => {
                write!(f, "variable '{}' is already declared", name)
            }
            Error::UnsupportedOperator { op } => {
                write!(f, "unsupported binary operator '{}'", op)
            }
            Error::InvalidCondition => {
                write!(f, "if condition must be an equality '==' check")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Walks a [`Program`] and accumulates assembly text
pub struct CodeGenerator {
    assembly: String,
    variable_addresses: HashMap<String, u8>,
    next_address: u8,
    label_counter: usize,
}

impl CodeGenerator {
    pub fn new() -> CodeGenerator {
        CodeGenerator {
            assembly: String::new(),
            variable_addresses: HashMap::new(),
            next_address: 0,
            label_counter: 0,
        }
    }

    /// Generate assembly for a whole program, ending with `hlt`
    pub fn generate(&mut self, program: &Program) -> Result<String, Error> {
        for statement in &program.statements {
            self.visit_statement(statement)?;
        }
        self.emit("hlt");
        Ok(self.assembly.clone())
    }

    /// Number of memory cells claimed by variable declarations so far
    pub fn variables_allocated(&self) -> usize {
        self.next_address as usize
    }

    /// The memory address assigned to a variable, if it was declared
    pub fn address_of(&self, name: &str) -> Option<u8> {
        self.variable_addresses.get(name).copied()
    }

    fn emit(&mut self, line: &str) {
        self.assembly.push_str(line);
        self.assembly.push('\n');
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    fn lookup(&self, name: &str) -> Result<u8, Error> {
        self.variable_addresses
            .get(name)
            .copied()
            .ok_or_else(|| Error::UndefinedVariable {
                name: name.to_string(),
            })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn visit_statement(&mut self, statement: &Statement) -> Result<(), Error> {
        match statement {
            Statement::VarDecl { name } => self.visit_var_decl(name),
            Statement::Assignment { name, value } => self.visit_assignment(name, value),
            Statement::Block(block) => self.visit_block(block),
            Statement::If { condition, body } => self.visit_if(condition, body),
        }
    }

    /// Claim a memory cell for the variable. No code is emitted, only a
    /// comment recording the allocation
    fn visit_var_decl(&mut self, name: &str) -> Result<(), Error> {
        if self.variable_addresses.contains_key(name) {
            return Err(Error::RedeclaredVariable {
                name: name.to_string(),
            });
        }
        let address = self.next_address;
        self.next_address += 1;
        self.variable_addresses.insert(name.to_string(), address);
        self.emit(&format!(
            "; Variable '{}' allocated at address {}",
            name, address
        ));
        Ok(())
    }

    fn visit_assignment(&mut self, name: &str, value: &Expression) -> Result<(), Error> {
        // Evaluate the right-hand side; its value lands in A
        self.visit_expression(value)?;
        let address = self.lookup(name)?;
        self.emit(&format!("sta {} ; {} = A", address, name));
        Ok(())
    }

    fn visit_block(&mut self, block: &Block) -> Result<(), Error> {
        for statement in &block.statements {
            self.visit_statement(statement)?;
        }
        Ok(())
    }

    fn visit_if(&mut self, condition: &Expression, body: &Block) -> Result<(), Error> {
        let end_label = self.fresh_label();

        let Expression::Binary {
            op: BinOp::Equal,
            left,
            right,
        } = condition
        else {
            return Err(Error::InvalidCondition);
        };

        // Left operand waits on the stack while the right one evaluates
        self.visit_expression(left)?;
        self.emit("push A");
        self.visit_expression(right)?;
        self.emit("mov B A");
        self.emit("pop A");

        self.emit("cmp");
        self.emit(&format!("jne {} ; Jump if not equal", end_label));

        self.visit_block(body)?;

        self.emit(&format!("{}:", end_label));
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn visit_expression(&mut self, expression: &Expression) -> Result<(), Error> {
        match expression {
            Expression::Number(value) => {
                self.emit(&format!("ldi A {}", value));
                Ok(())
            }
            Expression::Identifier(name) => {
                let address = self.lookup(name)?;
                self.emit(&format!("lda {}", address));
                Ok(())
            }
            Expression::Binary { op, left, right } => self.visit_binary(*op, left, right),
        }
    }

    fn visit_binary(
        &mut self,
        op: BinOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<(), Error> {
        self.visit_expression(left)?;
        self.emit("push A");
        self.visit_expression(right)?;
        self.emit("mov B A");
        self.emit("pop A");

        match op {
            BinOp::Add => self.emit("add"),
            BinOp::Sub => self.emit("sub"),
            // Equality is handled by the if-statement visitor
            BinOp::Equal => {
                return Err(Error::UnsupportedOperator {
                    op: op.symbol().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
