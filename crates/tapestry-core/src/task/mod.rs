//! Task, plan, and result types for the orchestration engine.
//!
//! A [`TaskPlan`] owns the decomposed [`Task`]s for one user request
//! along with a topological execution order; each task carries its own
//! lifecycle status, execution context, and eventual [`TaskResult`].

mod core;
mod plan;
mod result;

pub use plan::*;
pub use result::*;
pub use self::core::*;
