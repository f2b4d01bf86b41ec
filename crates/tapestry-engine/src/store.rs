use std::collections::{HashMap, HashSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use tapestry_core::{
    AccumulatedContext, DependencyResult, Error, PlanEvent, PlanId, PlanObserver, PlanStatus,
    Result, StatusSummary, Task, TaskContext, TaskDefinition, TaskId, TaskPlan, TaskResult,
    TaskStatus,
};

/// Owns the authoritative [`TaskPlan`] for one run.
///
/// One plan per store; create a fresh store (or [`TaskStore::clear`])
/// for a new run. All mutation goes through the store so status
/// transitions stay legal, blocking cascades, and subscribers observe
/// every lifecycle edge.
#[derive(Default)]
pub struct TaskStore {
    plan: Option<TaskPlan>,
    observers: Vec<Box<dyn PlanObserver>>,
}

impl TaskStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the active plan, keeping subscribers.
    pub fn clear(&mut self) {
        self.plan = None;
    }

    /// The active plan, if any.
    pub fn plan(&self) -> Option<&TaskPlan> {
        self.plan.as_ref()
    }

    /// Registers a lifecycle event subscriber.
    ///
    /// Handlers run synchronously in registration order; a failing
    /// handler is logged and never blocks the rest.
    pub fn subscribe<O: PlanObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    /// Creates a plan from decomposed definitions and starts executing.
    ///
    /// # Errors
    /// Returns [`Error::CyclicDependencies`] when the dependency graph
    /// contains a cycle, or [`Error::Other`] for an empty task list.
    pub fn create_plan(&mut self, goal: &str, definitions: Vec<TaskDefinition>) -> Result<PlanId> {
        if definitions.is_empty() {
            return Err(Error::Other("cannot create a plan with no tasks".to_owned()));
        }

        let tasks: Vec<Task> = definitions.into_iter().map(Task::new).collect();
        if has_cycles(&tasks) {
            return Err(Error::CyclicDependencies(format!(
                "dependency graph among {} tasks contains a cycle",
                tasks.len()
            )));
        }

        let mut plan = TaskPlan::new(goal, tasks);
        plan.execution_order = topological_order(&plan.tasks);
        plan.status = PlanStatus::Executing;

        let plan_id = plan.id;
        let task_count = plan.tasks.len();
        self.plan = Some(plan);

        tracing::debug!("Created plan {plan_id} with {task_count} tasks");
        self.emit(&PlanEvent::PlanCreated {
            plan_id,
            task_count,
        });
        Ok(plan_id)
    }

    /// Returns the next runnable task id, if any.
    ///
    /// Scans the execution order for the first pending task whose
    /// dependencies are all completed. As a side effect, any pending
    /// task with a failed dependency encountered during the scan is
    /// blocked before the scan continues. Returns `Ok(None)` when
    /// nothing is runnable (the plan may still hold blocked or
    /// in-progress tasks).
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`] when no plan is active.
    pub fn next_task(&mut self) -> Result<Option<TaskId>> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;

        let mut events = Vec::new();
        let mut next = None;
        let order = plan.execution_order.clone();

        for task_id in order {
            let Some(task) = plan.task(task_id) else {
                continue;
            };
            if task.status != TaskStatus::Pending {
                continue;
            }

            let dependencies = task.definition.dependencies.clone();
            let failed_dependency = dependencies.iter().copied().find(|dependency| {
                plan.task(*dependency)
                    .is_some_and(|dep| dep.status == TaskStatus::Failed)
            });

            if let Some(failed_id) = failed_dependency {
                let reason = format!(
                    "dependency '{}' failed",
                    plan.task(failed_id)
                        .map_or_else(|| failed_id.to_string(), |dep| dep.definition.title.clone())
                );
                if let Some(blocked) = plan.task_mut(task_id) {
                    blocked.block(reason.clone())?;
                    events.push(PlanEvent::TaskBlocked {
                        task_id,
                        reason,
                    });
                }
                continue;
            }

            let all_completed = dependencies.iter().all(|dependency| {
                plan.task(*dependency)
                    .is_some_and(|dep| dep.status == TaskStatus::Completed)
            });
            if all_completed {
                next = Some(task_id);
                break;
            }
        }

        self.emit_all(events);
        Ok(next)
    }

    /// Marks a task in progress.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`], [`Error::TaskNotFound`], or
    /// [`Error::InvalidTransition`] when the task is not pending.
    pub fn start_task(&mut self, task_id: TaskId) -> Result<()> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;
        let task = plan
            .task_mut(task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        task.start()?;
        let title = task.definition.title.clone();

        tracing::debug!("Task {task_id} started: {title}");
        self.emit(&PlanEvent::TaskStarted { task_id, title });
        Ok(())
    }

    /// Marks a task completed with its result.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`], [`Error::TaskNotFound`], or
    /// [`Error::InvalidTransition`] when the task is not in progress.
    pub fn complete_task(&mut self, task_id: TaskId, result: TaskResult) -> Result<()> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;
        let task = plan
            .task_mut(task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        task.complete(result.clone())?;

        let mut events = vec![PlanEvent::TaskCompleted {
            task_id,
            result: Box::new(result),
        }];
        if let Some(plan_event) = check_plan_settled(plan) {
            events.push(plan_event);
        }

        self.emit_all(events);
        Ok(())
    }

    /// Marks a task failed and cascades blocking to its dependents.
    ///
    /// Every pending task that directly depends on the failed task is
    /// blocked with a reason naming the dependency, and blocking
    /// recurses transitively through the blocked tasks' own dependents.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`], [`Error::TaskNotFound`], or
    /// [`Error::InvalidTransition`] when the task is not in progress.
    pub fn fail_task(&mut self, task_id: TaskId, result: TaskResult) -> Result<()> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;
        let error = result
            .error
            .clone()
            .unwrap_or_else(|| result.summary.clone());
        let task = plan
            .task_mut(task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        task.fail(result)?;

        tracing::debug!("Task {task_id} failed: {error}");
        let mut events = vec![PlanEvent::TaskFailed { task_id, error }];
        cascade_blocking(plan, task_id, &mut events)?;
        if let Some(plan_event) = check_plan_settled(plan) {
            events.push(plan_event);
        }

        self.emit_all(events);
        Ok(())
    }

    /// Skips a blocked task (replanning only).
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`], [`Error::TaskNotFound`], or
    /// [`Error::InvalidTransition`] when the task is not blocked.
    pub fn skip_task(&mut self, task_id: TaskId) -> Result<()> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;
        let task = plan
            .task_mut(task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        task.skip()?;

        let mut events = vec![PlanEvent::TaskSkipped { task_id }];
        if let Some(plan_event) = check_plan_settled(plan) {
            events.push(plan_event);
        }

        self.emit_all(events);
        Ok(())
    }

    /// Appends tasks to the plan and recomputes the execution order.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`], or [`Error::CyclicDependencies`]
    /// when the additions would introduce a cycle (the plan is left
    /// unchanged).
    pub fn add_tasks(&mut self, definitions: Vec<TaskDefinition>) -> Result<()> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;

        let previous_len = plan.tasks.len();
        plan.tasks.extend(definitions.into_iter().map(Task::new));
        if has_cycles(&plan.tasks) {
            plan.tasks.truncate(previous_len);
            return Err(Error::CyclicDependencies(
                "added tasks introduce a dependency cycle".to_owned(),
            ));
        }

        plan.execution_order = topological_order(&plan.tasks);
        let event = PlanEvent::PlanUpdated {
            plan_id: plan.id,
            task_count: plan.tasks.len(),
        };
        self.emit(&event);
        Ok(())
    }

    /// Removes a task and recomputes the execution order.
    ///
    /// The removed id is also stripped from other tasks' dependency
    /// lists so dependents do not wait on a task that no longer exists.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`] or [`Error::TaskNotFound`].
    pub fn remove_task(&mut self, task_id: TaskId) -> Result<()> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;
        if plan.task(task_id).is_none() {
            return Err(Error::TaskNotFound(task_id));
        }

        plan.tasks.retain(|task| task.id() != task_id);
        for task in &mut plan.tasks {
            task.definition
                .dependencies
                .retain(|dependency| *dependency != task_id);
        }

        plan.execution_order = topological_order(&plan.tasks);
        let event = PlanEvent::PlanUpdated {
            plan_id: plan.id,
            task_count: plan.tasks.len(),
        };
        self.emit(&event);
        Ok(())
    }

    /// Context accumulated from all completed tasks, recomputed fresh.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`] when no plan is active.
    pub fn accumulated_context(&self) -> Result<AccumulatedContext> {
        let plan = self.plan.as_ref().ok_or(Error::PlanMissing)?;
        Ok(plan.accumulated_context())
    }

    /// Results of a task's direct dependencies, in dependency order.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`] or [`Error::TaskNotFound`].
    pub fn dependency_results(&self, task_id: TaskId) -> Result<Vec<DependencyResult>> {
        let plan = self.plan.as_ref().ok_or(Error::PlanMissing)?;
        let task = plan.task(task_id).ok_or(Error::TaskNotFound(task_id))?;

        Ok(task
            .definition
            .dependencies
            .iter()
            .filter_map(|dependency| plan.task(*dependency))
            .filter_map(|dependency| {
                dependency.result.as_ref().map(|result| DependencyResult {
                    id: dependency.id(),
                    title: dependency.definition.title.clone(),
                    result: result.clone(),
                })
            })
            .collect())
    }

    /// Per-status task counts.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`] when no plan is active.
    pub fn status_summary(&self) -> Result<StatusSummary> {
        let plan = self.plan.as_ref().ok_or(Error::PlanMissing)?;
        Ok(plan.status_summary())
    }

    /// Mutable access to a task's execution context.
    ///
    /// Reserved for the executor that owns the task's run.
    ///
    /// # Errors
    /// Returns [`Error::PlanMissing`] or [`Error::TaskNotFound`].
    pub fn task_context_mut(&mut self, task_id: TaskId) -> Result<&mut TaskContext> {
        let plan = self.plan.as_mut().ok_or(Error::PlanMissing)?;
        plan.task_mut(task_id)
            .map(|task| &mut task.context)
            .ok_or(Error::TaskNotFound(task_id))
    }

    fn emit(&self, event: &PlanEvent) {
        for observer in &self.observers {
            if let Err(error) = observer.on_event(event) {
                tracing::warn!("Plan event handler failed: {error}");
            }
        }
    }

    fn emit_all(&self, events: Vec<PlanEvent>) {
        for event in events {
            self.emit(&event);
        }
    }
}

/// Blocks every pending transitive dependent of `failed_id`.
fn cascade_blocking(
    plan: &mut TaskPlan,
    failed_id: TaskId,
    events: &mut Vec<PlanEvent>,
) -> Result<()> {
    let mut worklist = vec![(failed_id, "failed")];

    while let Some((current, verb)) = worklist.pop() {
        let current_title = plan
            .task(current)
            .map_or_else(|| current.to_string(), |task| task.definition.title.clone());

        let dependents: Vec<TaskId> = plan
            .tasks
            .iter()
            .filter(|task| {
                task.status == TaskStatus::Pending
                    && task.definition.dependencies.contains(&current)
            })
            .map(Task::id)
            .collect();

        for dependent_id in dependents {
            let reason = format!("dependency '{current_title}' {verb}");
            if let Some(dependent) = plan.task_mut(dependent_id) {
                dependent.block(reason.clone())?;
                events.push(PlanEvent::TaskBlocked {
                    task_id: dependent_id,
                    reason,
                });
                worklist.push((dependent_id, "was blocked"));
            }
        }
    }
    Ok(())
}

/// Settles the plan when nothing is pending or in progress.
///
/// Returns the plan-level event to emit, at most once per plan: the
/// status guard means a settled plan never re-emits.
fn check_plan_settled(plan: &mut TaskPlan) -> Option<PlanEvent> {
    if plan.status != PlanStatus::Executing {
        return None;
    }
    let summary = plan.status_summary();
    if !summary.is_settled() {
        return None;
    }

    if summary.failed == 0 && summary.blocked == 0 {
        plan.status = PlanStatus::Completed;
        tracing::debug!("Plan {} completed", plan.id);
        Some(PlanEvent::PlanCompleted { plan_id: plan.id })
    } else {
        plan.status = PlanStatus::Failed;
        tracing::debug!("Plan {} failed", plan.id);
        Some(PlanEvent::PlanFailed { plan_id: plan.id })
    }
}

/// Detects dependency cycles with an explicit graph check.
fn has_cycles(tasks: &[Task]) -> bool {
    let mut graph = DiGraph::<TaskId, ()>::new();
    let mut nodes = HashMap::new();

    for task in tasks {
        let node = graph.add_node(task.id());
        nodes.insert(task.id(), node);
    }
    for task in tasks {
        let task_node = nodes[&task.id()];
        for dependency in &task.definition.dependencies {
            if let Some(&dependency_node) = nodes.get(dependency) {
                graph.add_edge(dependency_node, task_node, ());
            }
        }
    }

    is_cyclic_directed(&graph)
}

/// Depth-first topological sort: dependencies are visited before the
/// tasks that need them. Unknown dependency ids are ignored; cycles are
/// rejected before this runs (see [`TaskStore::create_plan`]).
fn topological_order(tasks: &[Task]) -> Vec<TaskId> {
    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|task| (task.id(), task)).collect();
    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(tasks.len());

    for task in tasks {
        visit(task.id(), &by_id, &mut visited, &mut order);
    }
    order
}

fn visit(
    task_id: TaskId,
    by_id: &HashMap<TaskId, &Task>,
    visited: &mut HashSet<TaskId>,
    order: &mut Vec<TaskId>,
) {
    if !visited.insert(task_id) {
        return;
    }
    let Some(task) = by_id.get(&task_id) else {
        return;
    };
    for dependency in &task.definition.dependencies {
        if by_id.contains_key(dependency) {
            visit(*dependency, by_id, visited, order);
        }
    }
    order.push(task_id);
}
