//! ExecutionState - per-user DAG state for one planning cycle.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::foundation::{TaskId, Timestamp, UserId, ValidationError};

use super::{TaskRecord, TaskStatus};

/// All task records for one user, in registration order.
///
/// Created lazily on the first register call and torn down when the user
/// disconnects or an explicit teardown is requested. Records are never
/// removed individually. Mutation happens only under the orchestrator's
/// per-user lock.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionState {
    pub user_id: UserId,
    tasks: Vec<TaskRecord>,
    pub updated_at: Timestamp,
}

impl ExecutionState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            tasks: Vec::new(),
            updated_at: Timestamp::now(),
        }
    }

    /// Inserts a record, rejecting a task id already present in the state.
    pub fn add_task(&mut self, record: TaskRecord) -> Result<(), ValidationError> {
        if self.task(record.task_id()).is_some() {
            return Err(ValidationError::invalid_format(
                "task_id",
                format!("duplicate task id '{}'", record.task_id()),
            ));
        }
        self.tasks.push(record);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|r| r.task_id() == task_id)
    }

    pub fn task_mut(&mut self, task_id: &TaskId) -> Option<&mut TaskRecord> {
        self.tasks.iter_mut().find(|r| r.task_id() == task_id)
    }

    /// All records in registration order.
    pub fn records(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&TaskRecord> {
        self.tasks.iter().filter(|r| r.status == status).collect()
    }

    pub fn completed_ids(&self) -> HashSet<&TaskId> {
        self.tasks
            .iter()
            .filter(|r| r.status == TaskStatus::Completed)
            .map(|r| r.task_id())
            .collect()
    }

    /// Whether all dependencies of a task are completed in this state.
    pub fn dependencies_met(&self, task_id: &TaskId) -> bool {
        match self.task(task_id) {
            Some(record) => {
                let completed = self.completed_ids();
                record.depends_on().iter().all(|dep| completed.contains(dep))
            }
            None => false,
        }
    }

    /// Stamp a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    pub fn summary(&self) -> ExecutionSummary {
        let mut summary = ExecutionSummary {
            total: self.tasks.len(),
            ..ExecutionSummary::default()
        };
        for record in &self.tasks {
            match record.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

/// Counts by status for one user's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ExecutionSummary {
    /// Drained means nothing is pending or running; the driver can exit.
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.running == 0
    }

    /// Completed share of all tasks, as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{ExecutionTarget, Task, TaskError, TaskOutput};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn task_id(id: &str) -> TaskId {
        TaskId::new(id).unwrap()
    }

    fn pending(id: &str) -> TaskRecord {
        TaskRecord::pending(Task::new(task_id(id), "web_search", ExecutionTarget::Server))
    }

    #[test]
    fn add_task_preserves_registration_order() {
        let mut state = ExecutionState::new(user());
        state.add_task(pending("b")).unwrap();
        state.add_task(pending("a")).unwrap();
        state.add_task(pending("c")).unwrap();

        let ids: Vec<&str> = state.records().iter().map(|r| r.task_id().as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn add_task_rejects_duplicate_id() {
        let mut state = ExecutionState::new(user());
        state.add_task(pending("a")).unwrap();
        assert!(state.add_task(pending("a")).is_err());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn dependencies_met_requires_completed_status() {
        let mut state = ExecutionState::new(user());
        state.add_task(pending("a")).unwrap();
        let dependent = TaskRecord::pending(
            Task::new(task_id("b"), "web_search", ExecutionTarget::Server)
                .with_dependency(task_id("a")),
        );
        state.add_task(dependent).unwrap();

        assert!(!state.dependencies_met(&task_id("b")));

        let record = state.task_mut(&task_id("a")).unwrap();
        record.start().unwrap();
        record.complete(TaskOutput::success(Default::default())).unwrap();

        assert!(state.dependencies_met(&task_id("b")));
    }

    #[test]
    fn failed_dependency_never_satisfies_dependent() {
        let mut state = ExecutionState::new(user());
        state.add_task(pending("a")).unwrap();
        let dependent = TaskRecord::pending(
            Task::new(task_id("b"), "web_search", ExecutionTarget::Server)
                .with_dependency(task_id("a")),
        );
        state.add_task(dependent).unwrap();

        let record = state.task_mut(&task_id("a")).unwrap();
        record.start().unwrap();
        record.fail(&TaskError::execution("boom")).unwrap();

        assert!(!state.dependencies_met(&task_id("b")));
    }

    #[test]
    fn summary_counts_by_status() {
        let mut state = ExecutionState::new(user());
        state.add_task(pending("a")).unwrap();
        state.add_task(pending("b")).unwrap();
        state.add_task(pending("c")).unwrap();

        state.task_mut(&task_id("a")).unwrap().start().unwrap();
        state
            .task_mut(&task_id("a"))
            .unwrap()
            .complete(TaskOutput::success(Default::default()))
            .unwrap();
        state.task_mut(&task_id("b")).unwrap().start().unwrap();

        let summary = state.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.running, 1);
        assert_eq!(summary.pending, 1);
        assert!(!summary.is_drained());
    }

    #[test]
    fn summary_is_drained_when_only_terminal_tasks_remain() {
        let mut state = ExecutionState::new(user());
        state.add_task(pending("a")).unwrap();
        state.task_mut(&task_id("a")).unwrap().start().unwrap();
        state
            .task_mut(&task_id("a"))
            .unwrap()
            .fail(&TaskError::execution("boom"))
            .unwrap();

        assert!(state.summary().is_drained());
    }

    #[test]
    fn success_rate_is_completed_share() {
        let mut state = ExecutionState::new(user());
        for id in ["a", "b", "c", "d"] {
            state.add_task(pending(id)).unwrap();
        }
        for id in ["a", "b", "c"] {
            let record = state.task_mut(&task_id(id)).unwrap();
            record.start().unwrap();
            record.complete(TaskOutput::success(Default::default())).unwrap();
        }

        assert_eq!(state.summary().success_rate(), 75.0);
    }

    #[test]
    fn empty_summary_has_zero_success_rate() {
        let state = ExecutionState::new(user());
        assert_eq!(state.summary().success_rate(), 0.0);
        assert!(state.summary().is_drained());
    }
}
