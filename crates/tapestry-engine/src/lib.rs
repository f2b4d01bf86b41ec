//! Plan-and-execute task orchestration engine.
//!
//! Takes one user request, asks a language model to decompose it into a
//! dependency-ordered set of atomic subtasks, executes each subtask in
//! isolation through an iterative model/tool loop, and propagates
//! failure through the dependency graph while accumulating cross-task
//! context. Failed plans are pruned by a conservative replanner so
//! independent work keeps going, and every run ends with a synthesized
//! summary of what succeeded and what failed.
//!
//! The engine is an in-process library: the terminal UI, the model
//! transport, and the concrete tools are external collaborators behind
//! the traits in [`tapestry_core`].

/// Request classification and context extraction.
pub mod analyzer;
/// Model-driven task decomposition with a single-task fallback.
pub mod decomposer;
/// The per-task model/tool execution loop.
pub mod executor;
/// Findings extraction from free-text answers.
pub mod extract;
/// High-level plan driver.
pub mod orchestrator;
/// Prompt assembly.
pub mod prompts;
/// Post-failure replanning.
pub mod replan;
/// The authoritative plan store.
pub mod store;
/// Plan summary rendering.
pub mod synthesis;

pub use analyzer::{QueryAnalysis, QueryAnalyzer, TaskType};
pub use decomposer::{Decomposition, TaskDecomposer};
pub use executor::TaskExecutor;
pub use extract::{ExtractedFindings, FindingsExtractor, HeadingExtractor};
pub use orchestrator::{PlanOrchestrator, PlanRunOutcome};
pub use replan::{ReplanOutcome, Replanner};
pub use store::TaskStore;
pub use synthesis::ContextSynthesizer;
