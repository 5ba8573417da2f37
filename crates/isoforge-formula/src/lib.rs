//! # Isoforge Formula
//!
//! A small expression language for density fields, compiled to a branch-free
//! stack machine over 3-component vectors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use isoforge_formula::prelude::*;
//!
//! let mut formula = Formula::new("fbm(coords) * 4 - y(coords)").with_parameters(["coords"]);
//! let program = formula.compile(&FunctionRegistry::builtin())?.program;
//!
//! let density = program.eval(&[Vec3::new(1.0, 2.0, 3.0)]).x;
//! ```
//!
//! ## Pipeline
//!
//! text → [`lexer`] → [`parser`] → [`ast::Node`] → [`translator`] → [`Program`] → [`EvalState::run`]
//!
//! ## Language
//!
//! - Numbers, identifiers (case-insensitive), `+ - * / %`, unary `+ -`, parentheses
//! - Calls `name(arg, ...)` resolved by name and argument count through [`FunctionRegistry`]
//! - Identifiers name runtime parameters or [`FormulaVariable`]s; sub-formula
//!   variables are compiled once and shared

pub mod ast;
pub mod eval;
pub mod formula;
pub mod lexer;
pub mod live;
pub mod noise;
pub mod opcode;
pub mod parser;
pub mod program;
pub mod registry;
pub mod translator;
pub mod variables;

#[cfg(feature = "file-watcher")]
pub mod watcher;

mod error;

pub use ast::Node;
pub use error::{CompileError, Error, ParseError, Result};
pub use eval::EvalState;
pub use formula::{CompiledFormula, Formula};
pub use live::{LiveProgram, LiveStatus, Recompiled};
pub use opcode::Opcode;
pub use parser::parse;
pub use program::{Instruction, Program};
pub use registry::FunctionRegistry;
pub use translator::{Translation, Translator};
pub use variables::{FormulaVariable, VariableKind, VariableTable};

#[cfg(feature = "file-watcher")]
pub use watcher::{FormulaWatcher, WatchEvent};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CompiledFormula, EvalState, Formula, FormulaVariable, FunctionRegistry, LiveProgram,
        LiveStatus, Program, VariableKind,
    };

    // Math (re-export glam)
    pub use glam::Vec3;

    // Error handling
    pub use crate::{Error, Result};
}
