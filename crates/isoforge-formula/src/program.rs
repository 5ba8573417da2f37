//! Compiled, immutable instruction buffers

use crate::error::{CompileError, Result};
use crate::opcode::Opcode;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stack machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Pushed value for `Const`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub immediate: Vec3,
    /// Parameter index for `Param`, 1-based result slot for `Load`
    #[serde(default, skip_serializing_if = "is_zero_slot")]
    pub slot: u8,
}

fn is_zero(v: &Vec3) -> bool {
    *v == Vec3::ZERO
}

fn is_zero_slot(slot: &u8) -> bool {
    *slot == 0
}

impl Instruction {
    pub fn constant(value: Vec3) -> Self {
        Self {
            opcode: Opcode::Const,
            immediate: value,
            slot: 0,
        }
    }

    pub fn param(index: u8) -> Self {
        Self {
            opcode: Opcode::Param,
            immediate: Vec3::ZERO,
            slot: index,
        }
    }

    pub fn load(slot: u8) -> Self {
        Self {
            opcode: Opcode::Load,
            immediate: Vec3::ZERO,
            slot,
        }
    }

    pub fn op(opcode: Opcode) -> Self {
        Self {
            opcode,
            immediate: Vec3::ZERO,
            slot: 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Const => write!(
                f,
                "const ({}, {}, {})",
                self.immediate.x, self.immediate.y, self.immediate.z
            ),
            Opcode::Param | Opcode::Load => write!(f, "{} {}", self.opcode.mnemonic(), self.slot),
            op => write!(f, "{}", op.mnemonic()),
        }
    }
}

/// A validated postfix program
///
/// Construction simulates the stack once to reject malformed sequences and to
/// compute the exact stack depth the evaluator must reserve. A `Program` is never
/// mutated after construction; live edits replace it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProgramData", into = "ProgramData")]
pub struct Program {
    instructions: Box<[Instruction]>,
    expected_final_stack_size: usize,
    max_stack_depth: usize,
    parameter_count: usize,
}

/// Serialized form; depth and parameter count are recomputed on load
#[derive(Serialize, Deserialize)]
struct ProgramData {
    instructions: Vec<Instruction>,
    expected_final_stack_size: usize,
}

impl TryFrom<ProgramData> for Program {
    type Error = CompileError;

    fn try_from(data: ProgramData) -> std::result::Result<Self, Self::Error> {
        Program::new(data.instructions, data.expected_final_stack_size)
    }
}

impl From<Program> for ProgramData {
    fn from(program: Program) -> Self {
        Self {
            instructions: program.instructions.into_vec(),
            expected_final_stack_size: program.expected_final_stack_size,
        }
    }
}

impl Program {
    /// Validate an instruction sequence
    ///
    /// `expected_final_stack_size` is the number of sub-formula results left
    /// below the main result, plus one.
    pub fn new(
        instructions: Vec<Instruction>,
        expected_final_stack_size: usize,
    ) -> std::result::Result<Self, CompileError> {
        if instructions.is_empty() {
            return Err(CompileError::InvalidProgram("no instructions".into()));
        }

        let mut depth = 0usize;
        let mut max_stack_depth = 0usize;
        let mut parameter_count = 0usize;

        for (pc, instruction) in instructions.iter().enumerate() {
            match instruction.opcode {
                Opcode::Invalid => {
                    return Err(CompileError::InvalidProgram(format!(
                        "invalid opcode at {}",
                        pc
                    )));
                }
                Opcode::Load => {
                    let slot = instruction.slot as usize;
                    if slot == 0 || slot > depth {
                        return Err(CompileError::InvalidProgram(format!(
                            "load of slot {} at {} with stack depth {}",
                            slot, pc, depth
                        )));
                    }
                }
                Opcode::Param => {
                    parameter_count = parameter_count.max(instruction.slot as usize + 1);
                }
                _ => {}
            }

            let arity = instruction.opcode.arity();
            if depth < arity {
                return Err(CompileError::InvalidProgram(format!(
                    "stack underflow at {} ({} needs {} operands, {} available)",
                    pc,
                    instruction.opcode.mnemonic(),
                    arity,
                    depth
                )));
            }
            depth = depth - arity + 1;
            max_stack_depth = max_stack_depth.max(depth);
        }

        if depth != expected_final_stack_size {
            return Err(CompileError::InvalidProgram(format!(
                "final stack depth {} does not match expected {}",
                depth, expected_final_stack_size
            )));
        }

        Ok(Self {
            instructions: instructions.into_boxed_slice(),
            expected_final_stack_size,
            max_stack_depth,
            parameter_count,
        })
    }

    /// Program that ignores its parameters and returns `value`
    pub fn constant(value: Vec3) -> Self {
        Self {
            instructions: Box::new([Instruction::constant(value)]),
            expected_final_stack_size: 1,
            max_stack_depth: 1,
            parameter_count: 0,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn expected_final_stack_size(&self) -> usize {
        self.expected_final_stack_size
    }

    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// Minimum length of the parameter slice passed to the evaluator
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate a program
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "; {} instructions, max depth {}, final depth {}",
            self.instructions.len(),
            self.max_stack_depth,
            self.expected_final_stack_size
        )?;
        for (pc, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{:4}  {}", pc, instruction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_max_depth_is_simulated() {
        // 1 + (2 * (3 - 4)) in postfix with right-to-left operands
        let program = Program::new(
            vec![
                Instruction::constant(Vec3::splat(4.0)),
                Instruction::constant(Vec3::splat(3.0)),
                Instruction::op(Opcode::Sub),
                Instruction::constant(Vec3::splat(2.0)),
                Instruction::op(Opcode::Mul),
                Instruction::constant(Vec3::ONE),
                Instruction::op(Opcode::Add),
            ],
            1,
        )
        .unwrap();
        assert_eq!(program.max_stack_depth(), 2);
        assert_eq!(program.parameter_count(), 0);
    }

    #[test]
    fn test_rejects_underflow() {
        let err = Program::new(vec![Instruction::op(Opcode::Add)], 1).unwrap_err();
        assert!(matches!(err, CompileError::InvalidProgram(_)));
    }

    #[test]
    fn test_rejects_wrong_final_depth() {
        let err = Program::new(
            vec![Instruction::constant(Vec3::ONE), Instruction::constant(Vec3::ONE)],
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("final stack depth 2"));
    }

    #[test]
    fn test_rejects_sentinel_and_bad_loads() {
        assert!(Program::new(vec![Instruction::op(Opcode::Invalid)], 1).is_err());
        assert!(Program::new(vec![Instruction::load(1)], 1).is_err());
        assert!(
            Program::new(
                vec![Instruction::constant(Vec3::ONE), Instruction::load(0)],
                2
            )
            .is_err()
        );
    }

    #[test]
    fn test_parameter_count() {
        let program = Program::new(
            vec![
                Instruction::param(2),
                Instruction::param(0),
                Instruction::op(Opcode::Add),
            ],
            1,
        )
        .unwrap();
        assert_eq!(program.parameter_count(), 3);
    }

    #[test]
    fn test_json_revalidates() {
        let program = Program::new(
            vec![
                Instruction::constant(Vec3::new(1.0, 2.0, 3.0)),
                Instruction::param(0),
                Instruction::op(Opcode::Mul),
            ],
            1,
        )
        .unwrap();
        let json = program.to_json().unwrap();
        assert_eq!(Program::from_json(&json).unwrap(), program);

        let broken = r#"{"instructions":[{"opcode":"add"}],"expected_final_stack_size":1}"#;
        assert!(Program::from_json(broken).is_err());
    }

    #[test]
    fn test_disassembly() {
        let program = Program::new(
            vec![
                Instruction::constant(Vec3::splat(2.0)),
                Instruction::load(1),
                Instruction::op(Opcode::Sub),
            ],
            2,
        );
        // load(1) with depth 1 is valid, but the final depth is 1, not 2
        assert!(program.is_err());

        let program = Program::new(
            vec![
                Instruction::constant(Vec3::splat(2.0)),
                Instruction::load(1),
                Instruction::op(Opcode::Sin),
            ],
            2,
        )
        .unwrap();
        let listing = program.to_string();
        assert!(listing.contains("const (2, 2, 2)"));
        assert!(listing.contains("load 1"));
        assert!(listing.contains("sin"));
    }
}
