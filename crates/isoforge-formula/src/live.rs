//! Live editing of a published program
//!
//! [`LiveProgram`] holds the program new evaluations should use. A recompile
//! builds the replacement without holding the lock, then swaps the pointer.
//! Work already running keeps the `Arc` it took from [`LiveProgram::current`],
//! so the previous program is freed when the last of that work finishes.

use crate::error::Result;
use crate::formula::Formula;
use crate::program::Program;
use crate::registry::FunctionRegistry;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::Arc;

/// State of the most recent edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveStatus {
    /// The published program matches the last submitted source
    Clean,
    /// A new program is being compiled; the old one is still published
    Recompiling,
    /// The last edit failed; the previous program is still published
    Error(String),
}

struct Published {
    program: Arc<Program>,
    generation: u64,
    status: LiveStatus,
}

/// Hot-swappable compiled formula
pub struct LiveProgram {
    registry: FunctionRegistry,
    published: RwLock<Published>,
    /// Serializes recompiles so statuses and generations stay ordered
    compiling: Mutex<()>,
}

/// Result of a successful recompile
#[derive(Debug, Clone)]
pub struct Recompiled {
    pub generation: u64,
    pub used_variables: BTreeSet<String>,
}

impl LiveProgram {
    /// Publish an already compiled program as generation 0
    pub fn new(program: Program) -> Self {
        Self::with_registry(FunctionRegistry::builtin(), program)
    }

    /// Compile `formula` and publish it
    pub fn compile(formula: &mut Formula) -> Result<Self> {
        let registry = FunctionRegistry::builtin();
        let compiled = formula.compile(&registry)?;
        Ok(Self::with_registry(registry, compiled.program))
    }

    fn with_registry(registry: FunctionRegistry, program: Program) -> Self {
        Self {
            registry,
            published: RwLock::new(Published {
                program: Arc::new(program),
                generation: 0,
                status: LiveStatus::Clean,
            }),
            compiling: Mutex::new(()),
        }
    }

    /// The program new work should evaluate
    pub fn current(&self) -> Arc<Program> {
        Arc::clone(&self.published.read().program)
    }

    /// The current program together with its generation
    pub fn snapshot(&self) -> (Arc<Program>, u64) {
        let published = self.published.read();
        (Arc::clone(&published.program), published.generation)
    }

    pub fn generation(&self) -> u64 {
        self.published.read().generation
    }

    pub fn status(&self) -> LiveStatus {
        self.published.read().status.clone()
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Recompile after an edit
    ///
    /// On success the new program is published under the next generation. On
    /// failure the previous program stays published, the status records the
    /// message, and the error is returned.
    pub fn recompile(&self, formula: &mut Formula) -> Result<Recompiled> {
        let _guard = self.compiling.lock();
        self.published.write().status = LiveStatus::Recompiling;

        match formula.compile(&self.registry) {
            Ok(compiled) => {
                let (previous, generation) = {
                    let mut published = self.published.write();
                    let previous = std::mem::replace(
                        &mut published.program,
                        Arc::new(compiled.program),
                    );
                    published.generation += 1;
                    published.status = LiveStatus::Clean;
                    (previous, published.generation)
                };

                let in_flight = Arc::strong_count(&previous) - 1;
                if in_flight > 0 {
                    tracing::debug!(
                        "Previous program still referenced by {} in-flight users",
                        in_flight
                    );
                }
                tracing::info!("Formula recompiled (generation {})", generation);

                Ok(Recompiled {
                    generation,
                    used_variables: compiled.used_variables,
                })
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Formula edit rejected: {}", message);
                self.published.write().status = LiveStatus::Error(message);
                Err(e)
            }
        }
    }
}
