//! Ordered task collection with pomodoro progress.
//!
//! Every mutation looks its task up by id; unknown ids are ignored so a
//! stale reference from the front end never turns into an error.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{NewTask, Task, TaskId, TaskPatch, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTracker {
    tasks: Vec<Task>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a tracker from persisted tasks, sorted by their `order` field.
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| t.order);
        let mut tracker = Self { tasks };
        tracker.renumber();
        tracker
    }

    /// Tasks in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Id of the task at a display position.
    pub fn id_at(&self, index: usize) -> Option<TaskId> {
        self.tasks.get(index).map(|t| t.id)
    }

    pub fn add_task(&mut self, data: NewTask, now: DateTime<Utc>) -> TaskId {
        let id = Uuid::new_v4();
        self.tasks.push(Task {
            id,
            title: data.title,
            description: data.description,
            estimated_pomodoros: data.estimated_pomodoros.max(1),
            completed_pomodoros: 0,
            status: TaskStatus::Pending,
            created_at: now,
            completed_at: None,
            order: self.tasks.len(),
        });
        debug!(task_id = %id, "Task added");
        id
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) {
        let Some(task) = self.get_mut(id) else {
            return;
        };
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(estimate) = patch.estimated_pomodoros {
            task.estimated_pomodoros = estimate.max(1);
        }
    }

    pub fn delete_task(&mut self, id: TaskId) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() != before {
            self.renumber();
        }
    }

    pub fn complete_task(&mut self, id: TaskId, now: DateTime<Utc>) {
        let Some(task) = self.get_mut(id) else {
            return;
        };
        if task.is_completed() {
            return;
        }
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
        debug!(task_id = %id, "Task completed");
    }

    /// Undoes [`complete_task`](Self::complete_task).
    pub fn reopen_task(&mut self, id: TaskId) {
        let Some(task) = self.get_mut(id) else {
            return;
        };
        if !task.is_completed() {
            return;
        }
        task.status = if task.completed_pomodoros > 0 {
            TaskStatus::InProgress
        } else {
            TaskStatus::Pending
        };
        task.completed_at = None;
    }

    /// Adds one finished pomodoro to the task. The first one moves a pending
    /// task to in-progress. Returns the new count.
    pub fn increment_pomodoro(&mut self, id: TaskId) -> Option<u32> {
        let task = self.get_mut(id)?;
        task.completed_pomodoros += 1;
        if task.status == TaskStatus::Pending {
            task.status = TaskStatus::InProgress;
        }
        Some(task.completed_pomodoros)
    }

    /// Moves the task at `from` to position `to` and renumbers every task.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.tasks.len() || to >= self.tasks.len() || from == to {
            return;
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.renumber();
    }

    /// First task in display order that is not completed.
    pub fn next_available_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| !t.is_completed())
    }

    /// Removes every completed task. Returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.is_completed());
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.renumber();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn renumber(&mut self) {
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.order = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn tracker_with(titles: &[&str]) -> (TaskTracker, Vec<TaskId>) {
        let mut tracker = TaskTracker::new();
        let ids = titles
            .iter()
            .map(|title| tracker.add_task(NewTask::new(*title, 2), now()))
            .collect();
        (tracker, ids)
    }

    fn titles(tracker: &TaskTracker) -> Vec<&str> {
        tracker.tasks().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_add_task_defaults() {
        let (tracker, ids) = tracker_with(&["write report"]);
        let task = tracker.get(ids[0]).unwrap();
        assert_eq!(task.title, "write report");
        assert_eq!(task.completed_pomodoros, 0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at, now());
        assert_eq!(task.completed_at, None);
        assert_eq!(task.order, 0);
    }

    #[test]
    fn test_add_task_ids_are_unique_and_ordered() {
        let (tracker, ids) = tracker_with(&["a", "b", "c"]);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        let orders: Vec<usize> = tracker.tasks().iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_add_task_clamps_estimate() {
        let mut tracker = TaskTracker::new();
        let id = tracker.add_task(NewTask::new("tiny", 0), now());
        assert_eq!(tracker.get(id).unwrap().estimated_pomodoros, 1);
    }

    #[test]
    fn test_update_task_partial() {
        let (mut tracker, ids) = tracker_with(&["draft"]);
        tracker.update_task(
            ids[0],
            TaskPatch {
                title: Some("final".to_string()),
                estimated_pomodoros: Some(5),
                ..TaskPatch::default()
            },
        );
        let task = tracker.get(ids[0]).unwrap();
        assert_eq!(task.title, "final");
        assert_eq!(task.estimated_pomodoros, 5);
        assert_eq!(task.description, "");
    }

    #[test]
    fn test_missing_id_is_silent_noop() {
        let (mut tracker, _) = tracker_with(&["a", "b"]);
        let snapshot = tracker.clone();
        let ghost = Uuid::new_v4();

        tracker.update_task(
            ghost,
            TaskPatch {
                title: Some("x".to_string()),
                ..TaskPatch::default()
            },
        );
        tracker.delete_task(ghost);
        tracker.complete_task(ghost, now());
        tracker.reopen_task(ghost);
        assert_eq!(tracker.increment_pomodoro(ghost), None);

        assert_eq!(tracker, snapshot);
    }

    #[test]
    fn test_increment_moves_pending_to_in_progress_once() {
        let (mut tracker, ids) = tracker_with(&["a"]);
        assert_eq!(tracker.increment_pomodoro(ids[0]), Some(1));
        assert_eq!(tracker.get(ids[0]).unwrap().status, TaskStatus::InProgress);
        assert_eq!(tracker.increment_pomodoro(ids[0]), Some(2));
        assert_eq!(tracker.get(ids[0]).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn test_increment_keeps_completed_status() {
        let (mut tracker, ids) = tracker_with(&["a"]);
        tracker.complete_task(ids[0], now());
        tracker.increment_pomodoro(ids[0]);
        assert_eq!(tracker.get(ids[0]).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn test_complete_and_reopen() {
        let (mut tracker, ids) = tracker_with(&["a", "b"]);
        tracker.complete_task(ids[0], now());
        let task = tracker.get(ids[0]).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now()));

        tracker.reopen_task(ids[0]);
        let task = tracker.get(ids[0]).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.completed_at, None);

        tracker.increment_pomodoro(ids[1]);
        tracker.complete_task(ids[1], now());
        tracker.reopen_task(ids[1]);
        assert_eq!(tracker.get(ids[1]).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn test_reorder_renumbers() {
        let (mut tracker, ids) = tracker_with(&["a", "b", "c"]);
        tracker.reorder(2, 0);
        assert_eq!(titles(&tracker), vec!["c", "a", "b"]);
        assert_eq!(tracker.get(ids[2]).unwrap().order, 0);
        assert_eq!(tracker.get(ids[0]).unwrap().order, 1);
        assert_eq!(tracker.get(ids[1]).unwrap().order, 2);
    }

    #[test]
    fn test_reorder_out_of_range_is_noop() {
        let (mut tracker, _) = tracker_with(&["a", "b"]);
        tracker.reorder(0, 5);
        tracker.reorder(7, 0);
        assert_eq!(titles(&tracker), vec!["a", "b"]);
    }

    #[test]
    fn test_delete_renumbers() {
        let (mut tracker, ids) = tracker_with(&["a", "b", "c"]);
        tracker.delete_task(ids[0]);
        assert_eq!(titles(&tracker), vec!["b", "c"]);
        let orders: Vec<usize> = tracker.tasks().iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn test_next_available_task() {
        let (mut tracker, ids) = tracker_with(&["a", "b"]);
        assert_eq!(tracker.next_available_task().unwrap().id, ids[0]);
        tracker.complete_task(ids[0], now());
        assert_eq!(tracker.next_available_task().unwrap().id, ids[1]);
        tracker.complete_task(ids[1], now());
        assert!(tracker.next_available_task().is_none());
    }

    #[test]
    fn test_clear_completed() {
        let (mut tracker, ids) = tracker_with(&["a", "b", "c"]);
        tracker.complete_task(ids[1], now());
        assert_eq!(tracker.clear_completed(), 1);
        assert_eq!(titles(&tracker), vec!["a", "c"]);
        assert_eq!(tracker.get(ids[2]).unwrap().order, 1);
    }

    #[test]
    fn test_from_tasks_sorts_by_order() {
        let (mut tracker, _) = tracker_with(&["a", "b", "c"]);
        tracker.reorder(0, 2);
        let mut persisted = tracker.tasks().to_vec();
        persisted.reverse();
        let restored = TaskTracker::from_tasks(persisted);
        assert_eq!(titles(&restored), vec!["b", "c", "a"]);
    }
}
