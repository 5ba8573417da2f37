//! Instruction set of the formula stack machine

use serde::{Deserialize, Serialize};

/// Stack machine operation
///
/// Every opcode declares how many operands it pops through [`Opcode::arity`]; the
/// result is always a single pushed vector. Callable opcodes also carry the
/// surface name used in formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Opcode {
    /// Sentinel; never emitted by the compiler and rejected by program validation
    Invalid,

    // 0-ary
    Const,
    Param,
    Load,

    // 1-ary
    Negate,
    X,
    Y,
    Z,
    Sin,
    Cos,
    Tan,
    Abs,
    Sqrt,
    Saturate,
    ValueNoise,
    PerlinNoise,
    SimplexNoise,
    /// Rotating-gradient simplex noise; returns value and xy derivatives
    RotatingNoise,
    Fbm,
    Splat,

    // 2-ary
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Pow,
    Dist,
    SqDist,
    Box,

    // 3-ary
    Vec3,

    // 4-ary
    FbmDetailed,
}

impl Opcode {
    /// Every opcode in declaration order; `ALL[op as usize] == op`
    pub const ALL: [Opcode; 33] = [
        Opcode::Invalid,
        Opcode::Const,
        Opcode::Param,
        Opcode::Load,
        Opcode::Negate,
        Opcode::X,
        Opcode::Y,
        Opcode::Z,
        Opcode::Sin,
        Opcode::Cos,
        Opcode::Tan,
        Opcode::Abs,
        Opcode::Sqrt,
        Opcode::Saturate,
        Opcode::ValueNoise,
        Opcode::PerlinNoise,
        Opcode::SimplexNoise,
        Opcode::RotatingNoise,
        Opcode::Fbm,
        Opcode::Splat,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Min,
        Opcode::Max,
        Opcode::Pow,
        Opcode::Dist,
        Opcode::SqDist,
        Opcode::Box,
        Opcode::Vec3,
        Opcode::FbmDetailed,
    ];

    /// Number of operands popped
    pub const fn arity(self) -> usize {
        match self {
            Opcode::Invalid | Opcode::Const | Opcode::Param | Opcode::Load => 0,
            Opcode::Negate
            | Opcode::X
            | Opcode::Y
            | Opcode::Z
            | Opcode::Sin
            | Opcode::Cos
            | Opcode::Tan
            | Opcode::Abs
            | Opcode::Sqrt
            | Opcode::Saturate
            | Opcode::ValueNoise
            | Opcode::PerlinNoise
            | Opcode::SimplexNoise
            | Opcode::RotatingNoise
            | Opcode::Fbm
            | Opcode::Splat => 1,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Min
            | Opcode::Max
            | Opcode::Pow
            | Opcode::Dist
            | Opcode::SqDist
            | Opcode::Box => 2,
            Opcode::Vec3 => 3,
            Opcode::FbmDetailed => 4,
        }
    }

    /// Name under which the opcode can be called from formula text
    ///
    /// Several opcodes share a name and differ only in arity (`fbm`, `v3`).
    pub const fn function_name(self) -> Option<&'static str> {
        Some(match self {
            Opcode::Invalid | Opcode::Const | Opcode::Param | Opcode::Load => return None,
            Opcode::Negate => "neg",
            Opcode::X => "x",
            Opcode::Y => "y",
            Opcode::Z => "z",
            Opcode::Sin => "sin",
            Opcode::Cos => "cos",
            Opcode::Tan => "tan",
            Opcode::Abs => "abs",
            Opcode::Sqrt => "sqrt",
            Opcode::Saturate => "saturate",
            Opcode::ValueNoise => "vnoise",
            Opcode::PerlinNoise => "cnoise",
            Opcode::SimplexNoise => "snoise",
            Opcode::RotatingNoise => "srdnoise",
            Opcode::Fbm | Opcode::FbmDetailed => "fbm",
            Opcode::Splat | Opcode::Vec3 => "v3",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Min => "min",
            Opcode::Max => "max",
            Opcode::Pow => "pow",
            Opcode::Dist => "dist",
            Opcode::SqDist => "sqdist",
            Opcode::Box => "box",
        })
    }

    /// Lower-case mnemonic used in disassembly
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Invalid => "invalid",
            Opcode::Const => "const",
            Opcode::Param => "param",
            Opcode::Load => "load",
            Opcode::Fbm => "fbm1",
            Opcode::FbmDetailed => "fbm4",
            Opcode::Splat => "splat",
            Opcode::Vec3 => "v3",
            other => match other.function_name() {
                Some(name) => name,
                None => "invalid",
            },
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL.get(value as usize).copied().ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_declaration_order() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i, "{:?} out of place", op);
            assert_eq!(Opcode::try_from(i as u8), Ok(*op));
        }
        assert_eq!(Opcode::try_from(Opcode::ALL.len() as u8), Err(33));
    }

    #[test]
    fn test_every_real_opcode_has_a_signature() {
        for op in Opcode::ALL {
            match op {
                Opcode::Invalid => assert!(op.function_name().is_none()),
                Opcode::Const | Opcode::Param | Opcode::Load => assert_eq!(op.arity(), 0),
                _ => assert!(op.function_name().is_some(), "{:?} is not callable", op),
            }
        }
    }
}
