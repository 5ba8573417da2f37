//! Stack machine evaluator
//!
//! [`EvalState`] owns a reusable value stack and nothing else, so one state per
//! worker thread can evaluate any number of programs. A validated [`Program`]
//! never trips the assertions here; hitting one means the compiler or a
//! hand-built program broke the stack contract.

use crate::noise;
use crate::opcode::Opcode;
use crate::program::Program;
use glam::Vec3;

/// Reusable evaluation scratch space
#[derive(Debug, Default, Clone)]
pub struct EvalState {
    stack: Vec<Vec3>,
}

impl EvalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `program` with the given parameter vectors and return its result
    ///
    /// # Panics
    ///
    /// Panics if `params` is shorter than [`Program::parameter_count`] or if the
    /// program violates its declared stack bounds.
    pub fn run(&mut self, program: &Program, params: &[Vec3]) -> Vec3 {
        assert!(
            params.len() >= program.parameter_count(),
            "program reads {} parameters, {} supplied",
            program.parameter_count(),
            params.len()
        );

        let max_depth = program.max_stack_depth();
        self.stack.clear();
        self.stack.reserve(max_depth);

        for instruction in program.instructions() {
            let value = match instruction.opcode {
                Opcode::Const => instruction.immediate,
                Opcode::Param => params[instruction.slot as usize],
                Opcode::Load => {
                    let slot = instruction.slot as usize;
                    assert!(
                        slot >= 1 && slot <= self.stack.len(),
                        "load of slot {} with stack depth {}",
                        slot,
                        self.stack.len()
                    );
                    self.stack[slot - 1]
                }

                Opcode::Negate => -self.pop(),
                Opcode::X => Vec3::splat(self.pop().x),
                Opcode::Y => Vec3::splat(self.pop().y),
                Opcode::Z => Vec3::splat(self.pop().z),
                Opcode::Sin => map(self.pop(), f32::sin),
                Opcode::Cos => map(self.pop(), f32::cos),
                Opcode::Tan => map(self.pop(), f32::tan),
                Opcode::Abs => self.pop().abs(),
                Opcode::Sqrt => map(self.pop(), f32::sqrt),
                Opcode::Saturate => self.pop().clamp(Vec3::ZERO, Vec3::ONE),
                Opcode::ValueNoise => Vec3::splat(noise::value_noise(self.pop())),
                Opcode::PerlinNoise => Vec3::splat(noise::perlin_noise(self.pop())),
                Opcode::SimplexNoise => Vec3::splat(noise::simplex_noise(self.pop())),
                Opcode::RotatingNoise => {
                    let v = self.pop();
                    noise::rotating_simplex_noise(v.truncate(), v.z)
                }
                Opcode::Fbm => Vec3::splat(noise::fbm(self.pop(), 1.0, 5, 0.4)),
                Opcode::Splat => Vec3::splat(self.pop().x),

                // Operands were emitted right to left, so the first pop is the left operand
                Opcode::Add => {
                    let (a, b) = self.pop2();
                    a + b
                }
                Opcode::Sub => {
                    let (a, b) = self.pop2();
                    a - b
                }
                Opcode::Mul => {
                    let (a, b) = self.pop2();
                    a * b
                }
                Opcode::Div => {
                    let (a, b) = self.pop2();
                    a / b
                }
                Opcode::Mod => {
                    let (a, b) = self.pop2();
                    a % b
                }
                Opcode::Min => {
                    let (a, b) = self.pop2();
                    a.min(b)
                }
                Opcode::Max => {
                    let (a, b) = self.pop2();
                    a.max(b)
                }
                Opcode::Pow => {
                    let (a, b) = self.pop2();
                    Vec3::new(a.x.powf(b.x), a.y.powf(b.y), a.z.powf(b.z))
                }
                Opcode::Dist => {
                    let (a, b) = self.pop2();
                    Vec3::splat(a.distance(b))
                }
                Opcode::SqDist => {
                    let (a, b) = self.pop2();
                    Vec3::splat(a.distance_squared(b))
                }
                Opcode::Box => {
                    let (p, half_extents) = self.pop2();
                    Vec3::splat(box_distance(p, half_extents))
                }

                Opcode::Vec3 => {
                    let x = self.pop().x;
                    let y = self.pop().x;
                    let z = self.pop().x;
                    Vec3::new(x, y, z)
                }

                Opcode::FbmDetailed => {
                    let position = self.pop();
                    let persistence = self.pop().x;
                    let octaves = self.pop().x as i32;
                    let lacunarity = self.pop().x;
                    Vec3::splat(noise::fbm(position, persistence, octaves, lacunarity))
                }

                Opcode::Invalid => panic!("invalid opcode in program"),
            };

            assert!(
                self.stack.len() < max_depth,
                "stack overflow: program declared max depth {}",
                max_depth
            );
            self.stack.push(value);
        }

        assert_eq!(
            self.stack.len(),
            program.expected_final_stack_size(),
            "final stack depth does not match the program"
        );
        *self.stack.last().unwrap_or(&Vec3::ZERO)
    }

    fn pop(&mut self) -> Vec3 {
        match self.stack.pop() {
            Some(value) => value,
            None => panic!("stack underflow"),
        }
    }

    fn pop2(&mut self) -> (Vec3, Vec3) {
        let a = self.pop();
        let b = self.pop();
        (a, b)
    }
}

impl Program {
    /// Evaluate once with a fresh state
    ///
    /// Prefer a long-lived [`EvalState`] in loops.
    pub fn eval(&self, params: &[Vec3]) -> Vec3 {
        EvalState::new().run(self, params)
    }
}

fn map(v: Vec3, f: impl Fn(f32) -> f32) -> Vec3 {
    Vec3::new(f(v.x), f(v.y), f(v.z))
}

/// Signed distance from `p` to an origin-centred box with the given half extents
fn box_distance(p: Vec3, half_extents: Vec3) -> f32 {
    let q = p.abs() - half_extents;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::program::Instruction;
    use approx::assert_relative_eq;

    fn program(instructions: Vec<Instruction>, final_size: usize) -> Program {
        Program::new(instructions, final_size).unwrap()
    }

    #[test]
    fn test_division_operand_order() {
        let p = program(
            vec![
                Instruction::constant(Vec3::splat(3.0)),
                Instruction::constant(Vec3::splat(6.0)),
                Instruction::op(Opcode::Div),
            ],
            1,
        );
        assert_eq!(p.eval(&[]), Vec3::splat(2.0));
    }

    #[test]
    fn test_load_copies_slots_from_the_bottom() {
        // pops Ld1 (5) then Ld2 (10): 5 / 10
        let p = program(
            vec![
                Instruction::constant(Vec3::splat(5.0)),
                Instruction::constant(Vec3::splat(10.0)),
                Instruction::load(2),
                Instruction::load(1),
                Instruction::op(Opcode::Div),
            ],
            3,
        );
        assert_relative_eq!(p.eval(&[]).x, 0.5);

        let p = program(
            vec![
                Instruction::constant(Vec3::splat(10.0)),
                Instruction::constant(Vec3::splat(5.0)),
                Instruction::load(1),
                Instruction::load(2),
                Instruction::op(Opcode::Div),
            ],
            3,
        );
        assert_relative_eq!(p.eval(&[]).x, 0.5);
    }

    #[test]
    fn test_params() {
        let p = program(
            vec![
                Instruction::param(0),
                Instruction::param(1),
                Instruction::op(Opcode::Add),
            ],
            1,
        );
        let result = p.eval(&[Vec3::new(1.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 3.0)]);
        assert_eq!(result, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_vec3_takes_x_components_in_order() {
        let p = program(
            vec![
                Instruction::constant(Vec3::splat(3.0)),
                Instruction::constant(Vec3::splat(2.0)),
                Instruction::constant(Vec3::splat(1.0)),
                Instruction::op(Opcode::Vec3),
            ],
            1,
        );
        assert_eq!(p.eval(&[]), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_box_distance() {
        assert_relative_eq!(box_distance(Vec3::new(2.0, 0.0, 0.0), Vec3::ONE), 1.0);
        assert_relative_eq!(box_distance(Vec3::ZERO, Vec3::ONE), -1.0);
    }

    #[test]
    fn test_state_is_reusable() {
        let p = program(
            vec![
                Instruction::param(0),
                Instruction::op(Opcode::Negate),
            ],
            1,
        );
        let mut state = EvalState::new();
        assert_eq!(state.run(&p, &[Vec3::ONE]), -Vec3::ONE);
        assert_eq!(state.run(&p, &[Vec3::X]), -Vec3::X);
    }

    #[test]
    #[should_panic(expected = "parameters")]
    fn test_missing_parameters_panic() {
        let p = program(vec![Instruction::param(1)], 1);
        let _ = p.eval(&[Vec3::ZERO]);
    }
}
