//! AST to postfix translation
//!
//! Operands are emitted right to left so the evaluator's first pop is the left
//! operand. Sub-formula variables are translated once into their own block;
//! blocks run first, in slot order, and leave their results at the bottom of
//! the stack where `Load` copies them from.

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::error::CompileError;
use crate::opcode::Opcode;
use crate::program::{Instruction, Program};
use crate::registry::FunctionRegistry;
use crate::variables::{VariableKind, VariableTable};
use glam::Vec3;
use std::collections::{BTreeSet, HashMap};

/// Output of [`Translator::translate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// Sub-formula blocks in slot order followed by the main expression
    pub instructions: Vec<Instruction>,
    /// Number of sub-formula blocks, and so of `Load`-addressable slots
    pub slot_count: usize,
    /// Named variables referenced directly or through sub-formulas
    pub used_variables: BTreeSet<String>,
}

impl Translation {
    /// Validate into a runnable program
    pub fn into_program(self) -> Result<Program, CompileError> {
        Program::new(self.instructions, self.slot_count + 1)
    }
}

/// Compiles ASTs against a function registry
#[derive(Debug, Clone, Copy)]
pub struct Translator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Translator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Translate `ast`
    ///
    /// Identifiers resolve first against `parameters` (by position), then against
    /// `variables`. Unknown names are declared in `variables` with the kind their
    /// prefix implies.
    pub fn translate(
        &self,
        ast: &Node,
        variables: &mut VariableTable,
        parameters: &[String],
    ) -> Result<Translation, CompileError> {
        if parameters.len() > usize::from(u8::MAX) + 1 {
            return Err(CompileError::TooManyParameters(parameters.len()));
        }

        let parameters: Vec<String> = parameters.iter().map(|p| p.to_lowercase()).collect();
        let mut session = Session {
            registry: self.registry,
            variables,
            parameters: &parameters,
            slots: HashMap::new(),
            blocks: Vec::new(),
            used: BTreeSet::new(),
        };

        let mut main = Vec::new();
        session.emit(ast, &mut main)?;

        let slot_count = session.blocks.len();
        let mut instructions: Vec<Instruction> = session.blocks.into_iter().flatten().collect();
        instructions.extend(main);

        Ok(Translation {
            instructions,
            slot_count,
            used_variables: session.used,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum SlotState {
    InProgress,
    Resolved(u8),
}

/// State for one translation
struct Session<'a> {
    registry: &'a FunctionRegistry,
    variables: &'a mut VariableTable,
    parameters: &'a [String],
    slots: HashMap<String, SlotState>,
    /// Completed sub-formula blocks; block `i` owns slot `i + 1`
    blocks: Vec<Vec<Instruction>>,
    used: BTreeSet<String>,
}

impl Session<'_> {
    fn emit(&mut self, node: &Node, out: &mut Vec<Instruction>) -> Result<(), CompileError> {
        match node {
            Node::Constant(value) => out.push(Instruction::constant(Vec3::splat(*value))),
            Node::Variable(name) => self.emit_variable(name, out)?,
            Node::Unary { op, operand } => {
                self.emit(operand, out)?;
                if *op == UnaryOp::Minus {
                    out.push(Instruction::op(Opcode::Negate));
                }
            }
            Node::Binary { op, left, right } => {
                self.emit(right, out)?;
                self.emit(left, out)?;
                out.push(Instruction::op(binary_opcode(*op)));
            }
            Node::Call { name, args } => {
                let opcode = self.registry.resolve(name, args.len())?;
                for arg in args.iter().rev() {
                    self.emit(arg, out)?;
                }
                out.push(Instruction::op(opcode));
            }
        }
        Ok(())
    }

    fn emit_variable(&mut self, name: &str, out: &mut Vec<Instruction>) -> Result<(), CompileError> {
        if let Some(index) = self.parameters.iter().position(|p| p == name) {
            out.push(Instruction::param(index as u8));
            return Ok(());
        }

        let index = self.variables.find_or_insert(name);
        self.used.insert(name.to_string());

        let variable = self.variables.at(index);
        if variable.kind != VariableKind::SubFormula {
            out.push(Instruction::constant(variable.constant_value()));
            return Ok(());
        }

        match self.slots.get(name) {
            Some(SlotState::InProgress) => {
                Err(CompileError::RecursiveDefinition(name.to_string()))
            }
            Some(SlotState::Resolved(slot)) => {
                out.push(Instruction::load(*slot));
                Ok(())
            }
            None => {
                self.slots.insert(name.to_string(), SlotState::InProgress);

                // Nested translation may insert variables, so the index is stale after this
                let ast = self.variables.at_mut(index).sub_formula_ast()?;
                let mut block = Vec::new();
                self.emit(&ast, &mut block)?;

                let slot = u8::try_from(self.blocks.len() + 1)
                    .map_err(|_| CompileError::TooManySubFormulas)?;
                self.blocks.push(block);
                self.slots.insert(name.to_string(), SlotState::Resolved(slot));
                out.push(Instruction::load(slot));
                Ok(())
            }
        }
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
    }
}
