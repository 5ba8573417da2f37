//! Lookup from surface function names to opcodes

use crate::error::CompileError;
use crate::opcode::Opcode;
use std::collections::HashMap;

/// One callable arity of a function name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overload {
    pub arity: usize,
    pub opcode: Opcode,
}

/// Immutable table of callable functions grouped by name
///
/// Built once from [`Opcode::ALL`] and handed to the translator; there is no
/// global instance.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Vec<Overload>>,
}

impl FunctionRegistry {
    /// Registry of every callable built-in opcode
    pub fn builtin() -> Self {
        let mut functions: HashMap<&'static str, Vec<Overload>> = HashMap::new();
        for opcode in Opcode::ALL {
            if let Some(name) = opcode.function_name() {
                functions.entry(name).or_default().push(Overload {
                    arity: opcode.arity(),
                    opcode,
                });
            }
        }
        for overloads in functions.values_mut() {
            overloads.sort_by_key(|o| o.arity);
        }
        Self { functions }
    }

    /// All overloads registered under `name`
    pub fn overloads(&self, name: &str) -> Option<&[Overload]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    /// Pick the overload of `name` taking `arity` arguments
    pub fn resolve(&self, name: &str, arity: usize) -> Result<Opcode, CompileError> {
        let overloads = self
            .overloads(name)
            .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;

        overloads
            .iter()
            .find(|o| o.arity == arity)
            .map(|o| o.opcode)
            .ok_or_else(|| CompileError::WrongArgumentCount {
                name: name.to_string(),
                expected: overloads
                    .iter()
                    .map(|o| o.arity.to_string())
                    .collect::<Vec<_>>()
                    .join(" or "),
                got: arity,
            })
    }

    /// Sorted list of function names
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
