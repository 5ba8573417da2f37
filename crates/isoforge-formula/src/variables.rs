//! Named variables referenced by formulas
//!
//! Variables are kept sorted by name so the translator can binary-search them
//! and insert newly referenced names in place.

use crate::ast::Node;
use crate::error::CompileError;
use crate::parser::parse;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// How a named variable produces its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Constant vector
    Vector3,
    /// Constant scalar, taken from `value.x` and broadcast
    Float,
    /// Expression compiled once and shared by every reference
    SubFormula,
}

impl VariableKind {
    /// Default kind for a name first seen in formula text
    ///
    /// Names starting with `f` are floats, names starting with `s` are
    /// sub-formulas, everything else is a vector.
    pub fn from_name(name: &str) -> Self {
        match name.chars().next() {
            Some('f') => VariableKind::Float,
            Some('s') => VariableKind::SubFormula,
            _ => VariableKind::Vector3,
        }
    }
}

/// A user-declared named value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaVariable {
    name: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub value: Vec3,
    #[serde(default)]
    sub_formula: String,
    #[serde(skip)]
    parsed: Option<Arc<Node>>,
}

impl PartialEq for FormulaVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.value == other.value
            && self.sub_formula == other.sub_formula
    }
}

impl FormulaVariable {
    /// Variable with the kind implied by its name and a zero value
    pub fn new(name: &str) -> Self {
        let name = name.to_lowercase();
        Self {
            kind: VariableKind::from_name(&name),
            name,
            value: Vec3::ZERO,
            sub_formula: String::new(),
            parsed: None,
        }
    }

    pub fn vector(name: &str, value: Vec3) -> Self {
        Self {
            kind: VariableKind::Vector3,
            value,
            ..Self::new(name)
        }
    }

    pub fn float(name: &str, value: f32) -> Self {
        Self {
            kind: VariableKind::Float,
            value: Vec3::new(value, 0.0, 0.0),
            ..Self::new(name)
        }
    }

    pub fn sub_formula(name: &str, source: impl Into<String>) -> Self {
        Self {
            kind: VariableKind::SubFormula,
            sub_formula: source.into(),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_formula_source(&self) -> &str {
        &self.sub_formula
    }

    /// Replace the sub-formula text, dropping the cached AST
    pub fn set_sub_formula(&mut self, source: impl Into<String>) {
        self.sub_formula = source.into();
        self.parsed = None;
    }

    /// Parsed sub-formula, parsed on first use and cached
    pub fn sub_formula_ast(&mut self) -> Result<Arc<Node>, CompileError> {
        if let Some(ast) = &self.parsed {
            return Ok(Arc::clone(ast));
        }

        let ast = parse(&self.sub_formula)
            .map_err(|source| CompileError::InvalidSubFormula {
                name: self.name.clone(),
                source,
            })?
            .ok_or_else(|| CompileError::EmptySubFormula(self.name.clone()))?;

        let ast = Arc::new(ast);
        self.parsed = Some(Arc::clone(&ast));
        Ok(ast)
    }

    /// Constant pushed for non sub-formula variables
    pub fn constant_value(&self) -> Vec3 {
        match self.kind {
            VariableKind::Float => Vec3::splat(self.value.x),
            VariableKind::Vector3 | VariableKind::SubFormula => self.value,
        }
    }
}

/// Name-sorted list of named variables with unique names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FormulaVariable>", into = "Vec<FormulaVariable>")]
pub struct VariableTable {
    variables: Vec<FormulaVariable>,
}

impl From<Vec<FormulaVariable>> for VariableTable {
    fn from(variables: Vec<FormulaVariable>) -> Self {
        let mut table = Self::default();
        for mut variable in variables {
            variable.name = variable.name.to_lowercase();
            table.set(variable);
        }
        table
    }
}

impl From<VariableTable> for Vec<FormulaVariable> {
    fn from(table: VariableTable) -> Self {
        table.variables
    }
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormulaVariable> {
        self.variables.iter()
    }

    fn search(&self, name: &str) -> Result<usize, usize> {
        self.variables
            .binary_search_by(|v| v.name.as_str().cmp(name))
    }

    pub fn get(&self, name: &str) -> Option<&FormulaVariable> {
        let name = name.to_lowercase();
        self.search(&name).ok().map(|i| &self.variables[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FormulaVariable> {
        let name = name.to_lowercase();
        self.search(&name).ok().map(|i| &mut self.variables[i])
    }

    /// Insert or replace a variable, keeping the table sorted
    pub fn set(&mut self, variable: FormulaVariable) {
        match self.search(&variable.name) {
            Ok(i) => self.variables[i] = variable,
            Err(i) => self.variables.insert(i, variable),
        }
    }

    /// Index of `name`, inserting a default variable if it is not declared
    ///
    /// `name` must already be lower case, as produced by the lexer.
    pub fn find_or_insert(&mut self, name: &str) -> usize {
        match self.search(name) {
            Ok(i) => i,
            Err(i) => {
                tracing::debug!("Declaring variable {} on first reference", name);
                self.variables.insert(i, FormulaVariable::new(name));
                i
            }
        }
    }

    pub(crate) fn at(&self, index: usize) -> &FormulaVariable {
        &self.variables[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut FormulaVariable {
        &mut self.variables[index]
    }

    pub fn remove(&mut self, name: &str) -> Option<FormulaVariable> {
        let name = name.to_lowercase();
        self.search(&name).ok().map(|i| self.variables.remove(i))
    }

    /// Drop every variable whose name is not in `used`
    pub fn retain_used(&mut self, used: &BTreeSet<String>) {
        self.variables.retain(|v| used.contains(&v.name));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name_prefix() {
        assert_eq!(VariableKind::from_name("freq"), VariableKind::Float);
        assert_eq!(VariableKind::from_name("shape"), VariableKind::SubFormula);
        assert_eq!(VariableKind::from_name("offset"), VariableKind::Vector3);
    }

    #[test]
    fn test_table_stays_sorted() {
        let mut table = VariableTable::new();
        for name in ["m", "c", "x", "a", "q"] {
            table.find_or_insert(name);
        }
        let names: Vec<_> = table.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["a", "c", "m", "q", "x"]);
        assert_eq!(table.find_or_insert("m"), 2);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut table = VariableTable::new();
        table.set(FormulaVariable::vector("Offset", Vec3::X));
        assert_eq!(table.get("OFFSET").unwrap().value, Vec3::X);
    }

    #[test]
    fn test_sub_formula_cache_is_invalidated() {
        let mut variable = FormulaVariable::sub_formula("s", "1+2");
        assert_eq!(variable.sub_formula_ast().unwrap().to_string(), "(1 + 2)");
        variable.set_sub_formula("3*4");
        assert_eq!(variable.sub_formula_ast().unwrap().to_string(), "(3 * 4)");
    }

    #[test]
    fn test_empty_sub_formula() {
        let mut variable = FormulaVariable::new("shape");
        assert_eq!(
            variable.sub_formula_ast().unwrap_err(),
            CompileError::EmptySubFormula("shape".into())
        );
    }

    #[test]
    fn test_float_broadcasts() {
        let variable = FormulaVariable::float("f", 2.5);
        assert_eq!(variable.constant_value(), Vec3::splat(2.5));
    }

    #[test]
    fn test_deserialize_sorts_and_dedups() {
        let json = r#"[
            {"name": "b", "kind": "float", "value": [1.0, 0.0, 0.0]},
            {"name": "a", "kind": "sub_formula", "sub_formula": "b * 2"},
            {"name": "b", "kind": "float", "value": [3.0, 0.0, 0.0]}
        ]"#;
        let table: VariableTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().next().unwrap().name(), "a");
        assert_eq!(table.get("b").unwrap().value.x, 3.0);
    }
}
