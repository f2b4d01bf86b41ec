use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tapestry_core::{
    Error, ModelClient, PlanObserver, PlanStatus, PlanningConfig, Result, TaskDefinition,
    ToolDispatcher,
};

use crate::analyzer::QueryAnalyzer;
use crate::decomposer::{Decomposition, TaskDecomposer};
use crate::executor::TaskExecutor;
use crate::replan::Replanner;
use crate::store::TaskStore;
use crate::synthesis::ContextSynthesizer;

/// Outcome of running one plan to quiescence.
#[derive(Debug, Clone)]
pub struct PlanRunOutcome {
    /// Final plan status.
    pub plan_status: PlanStatus,
    /// Synthesized human-readable summary of the run.
    pub summary: String,
    /// Whether decomposition substituted the fallback plan.
    pub used_fallback: bool,
    /// Number of tasks that were executed.
    pub executed: usize,
}

/// High-level driver that wires the planning components together.
///
/// Control flow per run: analyze the request, decompose it into tasks,
/// create the plan, then repeatedly pull the next runnable task and
/// execute it, replanning after failures so independent work continues,
/// and finally synthesize a summary.
pub struct PlanOrchestrator {
    config: PlanningConfig,
    decomposer: TaskDecomposer,
    executor: TaskExecutor,
    store: TaskStore,
}

impl PlanOrchestrator {
    /// Creates an orchestrator over the two external collaborators.
    pub fn new(
        config: PlanningConfig,
        client: Arc<dyn ModelClient>,
        tools: Arc<dyn ToolDispatcher>,
    ) -> Self {
        let decomposer = TaskDecomposer::new(Arc::clone(&client), config.clone());
        let executor = TaskExecutor::new(client, tools);
        Self {
            config,
            decomposer,
            executor,
            store: TaskStore::new(),
        }
    }

    /// Replaces the task executor (used to swap extraction strategies).
    #[must_use]
    pub fn with_executor(mut self, executor: TaskExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Registers a plan lifecycle subscriber.
    pub fn subscribe<O: PlanObserver + 'static>(&mut self, observer: O) {
        self.store.subscribe(observer);
    }

    /// The store backing the current run.
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Runs one request to quiescence.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] when the run is cancelled; store
    /// errors indicate a bug in the orchestration loop rather than a
    /// failed plan, which is reported through the outcome instead.
    pub async fn run(
        &mut self,
        goal: &str,
        cancel: &CancellationToken,
    ) -> Result<PlanRunOutcome> {
        self.store.clear();

        let analysis = QueryAnalyzer::analyze(goal);
        tracing::debug!("Request classified as {}", analysis.task_type);

        let Decomposition {
            definitions,
            used_fallback,
        } = if self.config.enabled {
            self.decomposer.decompose(goal, &analysis, cancel).await?
        } else {
            // Planning disabled: single task over the verbatim goal,
            // no model round-trip.
            Decomposition {
                definitions: vec![TaskDefinition::new(
                    "Complete the request".to_owned(),
                    goal.to_owned(),
                )],
                used_fallback: false,
            }
        };

        self.store.create_plan(goal, definitions)?;

        let mut executed = 0;
        loop {
            let Some(task_id) = self.store.next_task()? else {
                break;
            };

            self.executor
                .execute_task(&mut self.store, task_id, cancel)
                .await?;
            executed += 1;

            if Replanner::should_replan(&self.store) {
                let outcome = Replanner::simple_replan(&mut self.store)?;
                if !outcome.can_continue {
                    break;
                }
            }
        }

        let plan = self.store.plan().ok_or(Error::PlanMissing)?;
        Ok(PlanRunOutcome {
            plan_status: plan.status,
            summary: ContextSynthesizer::synthesize_plan(plan),
            used_fallback,
            executed,
        })
    }
}
