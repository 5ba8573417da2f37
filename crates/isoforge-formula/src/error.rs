//! Error types for the formula engine

use thiserror::Error;

/// Result type alias using the formula engine's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A lexical or syntax error, reported with the byte offset where it was detected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Errors raised while translating an AST into a program
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// No function with this name exists
    #[error("Unknown function {0}")]
    UnknownFunction(String),

    /// The function exists but not with this number of arguments
    #[error("Function {name} expects {expected} arguments, got {got}")]
    WrongArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },

    /// A sub-formula refers back to itself, directly or through other sub-formulas
    #[error("Recursive definition of {0}")]
    RecursiveDefinition(String),

    /// A sub-formula's source text failed to parse
    #[error("Invalid sub-formula {name}: {source}")]
    InvalidSubFormula { name: String, source: ParseError },

    /// A referenced sub-formula has no source text
    #[error("Sub-formula {0} is empty")]
    EmptySubFormula(String),

    /// More runtime parameters than an instruction can address
    #[error("Too many parameters: {0} (maximum 256)")]
    TooManyParameters(usize),

    /// More sub-formula slots than an instruction can address
    #[error("Too many sub-formulas (maximum 255)")]
    TooManySubFormulas,

    /// An instruction sequence that would violate the evaluator's invariants
    #[error("Invalid program: {0}")]
    InvalidProgram(String),
}

/// Errors that can occur in formula operations
#[derive(Error, Debug)]
pub enum Error {
    /// Formula text is malformed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Formula is well-formed but cannot be compiled
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File watcher setup or runtime failure
    #[error("Watch error: {0}")]
    Watch(String),
}
