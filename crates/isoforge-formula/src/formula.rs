//! Formula documents: source text plus the names it is compiled against

use crate::error::Result;
use crate::parser::parse;
use crate::program::Program;
use crate::registry::FunctionRegistry;
use crate::translator::Translator;
use crate::variables::{FormulaVariable, VariableTable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// An editable density formula
///
/// Serialized as JSON:
///
/// ```json
/// {
///   "source": "fbm(coords) * famp - y(coords)",
///   "parameters": ["coords"],
///   "variables": [{ "name": "famp", "kind": "float", "value": [2.0, 0.0, 0.0] }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub source: String,
    #[serde(default)]
    parameters: Vec<String>,
    #[serde(default)]
    pub variables: VariableTable,
}

/// A compiled formula and the named variables it referenced
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    pub program: Program,
    pub used_variables: BTreeSet<String>,
}

impl Formula {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Set the runtime parameter names, in the order values are passed to the evaluator
    pub fn with_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_parameters(names);
        self
    }

    pub fn with_variable(mut self, variable: FormulaVariable) -> Self {
        self.variables.set(variable);
        self
    }

    pub fn set_parameters<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parameters = names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect();
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Parse and translate the source
    ///
    /// Names referenced but not yet declared are added to [`Formula::variables`].
    /// Empty source compiles to a program returning zero.
    pub fn compile(&mut self, registry: &FunctionRegistry) -> Result<CompiledFormula> {
        let Some(ast) = parse(&self.source)? else {
            return Ok(CompiledFormula {
                program: Program::constant(Vec3::ZERO),
                used_variables: BTreeSet::new(),
            });
        };

        let translation =
            Translator::new(registry).translate(&ast, &mut self.variables, &self.parameters)?;
        let used_variables = translation.used_variables.clone();
        let program = translation.into_program()?;

        tracing::debug!(
            "Compiled formula into {} instructions (max depth {})",
            program.len(),
            program.max_stack_depth()
        );

        Ok(CompiledFormula {
            program,
            used_variables,
        })
    }

    /// Drop declared variables the last compilation did not reference
    pub fn prune_unused(&mut self, used: &BTreeSet<String>) {
        let before = self.variables.len();
        self.variables.retain_used(used);
        let removed = before - self.variables.len();
        if removed > 0 {
            tracing::debug!("Pruned {} unused variables", removed);
        }
    }

    /// Load a formula file
    ///
    /// `.json` files hold a full document; anything else is bare source text
    /// compiled with no parameters until [`set_parameters`](Self::set_parameters)
    /// is called.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|e| e == "json") {
            Ok(serde_json::from_str(&text)?)
        } else {
            Ok(Self::new(text.trim()))
        }
    }

    /// Write the formula as a JSON document
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
