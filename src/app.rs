//! Main application state and logic.
//!
//! [`App`] owns the timer, the task tracker and the session log, and is the
//! only place where an event touching more than one of them is handled. A
//! completion runs in a fixed order: session append, task increment, mode
//! transition, optional auto-start, notification.

use chrono::{DateTime, Local, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::insights::{self, EstimateAccuracy};
use crate::models::{
    AppSettings, DailyStat, NewTask, SessionRecord, SettingsPatch, TaskId, TaskPatch, TimerMode,
};
use crate::notifications::Notifier;
use crate::persistence::{Database, DatabaseError, StoredState};
use crate::sessions::SessionLog;
use crate::tasks::TaskTracker;
use crate::timer::{TickOutcome, TimerState};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Emitted once per finished interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionEvent {
    pub completed_mode: TimerMode,
    pub next_mode: TimerMode,
    /// Work sessions completed today, including this one.
    pub pomodoros_today: u32,
    /// Task credited with the pomodoro, for work intervals.
    pub task_id: Option<TaskId>,
    /// Whether the next interval started on its own.
    pub auto_started: bool,
}

/// Bookkeeping for the interval currently loaded in the timer.
#[derive(Debug, Clone, Copy)]
struct ArmedInterval {
    started_at: DateTime<Utc>,
    planned_secs: u32,
}

pub struct App {
    timer: TimerState,
    tasks: TaskTracker,
    sessions: SessionLog,
    settings: AppSettings,
    db: Database,
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
    /// Set the moment an interval is completed; cleared when a new one is
    /// armed by start, reset, set_mode or an auto-start.
    completion_latched: bool,
    interval: Option<ArmedInterval>,
}

impl App {
    /// Creates the application from persisted settings and tasks.
    pub fn new(
        db: Database,
        clock: Box<dyn Clock>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let stored = db.load_state()?;
        let mut settings = stored.settings;
        settings.timer = settings.timer.clamped();
        let tasks = TaskTracker::from_tasks(stored.tasks);
        info!(tasks = tasks.len(), "Loaded stored state");

        Ok(Self {
            timer: TimerState::new(&settings.timer),
            tasks,
            sessions: SessionLog::new(),
            settings,
            db,
            clock,
            notifier,
            completion_latched: false,
            interval: None,
        })
    }

    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    pub fn sessions(&self) -> &SessionLog {
        &self.sessions
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn is_completion_latched(&self) -> bool {
        self.completion_latched
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Local calendar date of the injected clock.
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }

    // ---- timer -------------------------------------------------------------

    /// Starts or resumes the timer.
    pub fn start(&mut self) {
        if self.timer.is_running() {
            return;
        }
        let now = self.now();
        if self.interval.is_none() {
            self.interval = Some(ArmedInterval {
                started_at: now,
                planned_secs: self.timer.remaining_secs(),
            });
        }
        self.timer.start(now);
        if self.timer.is_running() {
            self.completion_latched = false;
            debug!(mode = %self.timer.mode(), remaining = self.timer.remaining_secs(), "Timer started");
        }
    }

    /// Pauses a running timer. An interval that already ran out, e.g.
    /// while the machine slept, completes here instead of freezing at zero.
    pub fn pause(&mut self) -> Option<CompletionEvent> {
        if !self.timer.is_running() {
            return None;
        }
        let now = self.now();
        self.timer.pause(now);
        if self.timer.remaining_secs() == 0 {
            return self.complete_pomodoro();
        }
        debug!(remaining = self.timer.remaining_secs(), "Timer paused");
        None
    }

    /// Discards the current interval and reloads the full duration. An
    /// interval that had already run is logged as abandoned.
    pub fn reset(&mut self) {
        let now = self.now();
        self.record_abandoned(now);
        self.timer.reset(&self.settings.timer);
        self.completion_latched = false;
    }

    /// Switches mode manually, e.g. to skip ahead to a break.
    pub fn set_mode(&mut self, mode: TimerMode) {
        let now = self.now();
        self.record_abandoned(now);
        self.timer.set_mode(mode, &self.settings.timer);
        self.completion_latched = false;
        debug!(%mode, "Mode switched");
    }

    /// Periodic trigger. Returns the completion event when this trigger
    /// observed the end of the interval.
    pub fn tick(&mut self) -> Option<CompletionEvent> {
        let now = self.now();
        match self.timer.tick(now) {
            TickOutcome::Finished => self.complete_pomodoro(),
            TickOutcome::Counting { .. } | TickOutcome::Inactive => None,
        }
    }

    /// Recomputes the remaining time without completing the interval.
    pub fn sync_timer(&mut self) -> u32 {
        let now = self.now();
        self.timer.sync(now)
    }

    /// Handler for the front end coming back after a suspension. Catches up
    /// on drift and completes the interval if it ran out meanwhile.
    pub fn visibility_regained(&mut self) -> Option<CompletionEvent> {
        let remaining = self.sync_timer();
        debug!(remaining, "Timer synced after wake-up");
        if remaining == 0 && self.timer.is_running() {
            return self.tick();
        }
        None
    }

    /// Finishes the armed interval and moves to the next mode.
    ///
    /// Runs at most once per interval: every caller after the first is a
    /// no-op until a new interval is armed. Also a no-op when nothing was
    /// ever started.
    pub fn complete_pomodoro(&mut self) -> Option<CompletionEvent> {
        if self.completion_latched {
            debug!("Completion already handled, ignoring");
            return None;
        }
        let interval = self.interval.take()?;
        self.completion_latched = true;

        let now = self.now();
        // Finishing early leaves time on the clock; freeze it first.
        self.timer.pause(now);
        let ending_mode = self.timer.mode();
        let task_id = match ending_mode {
            TimerMode::Work => self.timer.assigned_task_id(),
            TimerMode::ShortBreak | TimerMode::LongBreak => None,
        };

        self.sessions.add_session(SessionRecord {
            mode: ending_mode,
            task_id,
            started_at: interval.started_at,
            completed_at: Some(now),
            duration_seconds: interval
                .planned_secs
                .saturating_sub(self.timer.remaining_secs()),
            was_completed: true,
        });

        let config = self.settings.timer.clone();
        let (next_mode, auto_start) = match ending_mode {
            TimerMode::Work => {
                self.timer.advance_cycle();
                if let Some(id) = task_id {
                    self.credit_task(id, now);
                }
                let next = if self.timer.is_long_break_due(config.long_break_interval) {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                };
                (next, config.auto_start_breaks)
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                if ending_mode == TimerMode::LongBreak {
                    self.timer.reset_cycle();
                }
                (TimerMode::Work, config.auto_start_work)
            }
        };

        self.timer.set_mode(next_mode, &config);
        if auto_start {
            self.start();
        }

        let event = CompletionEvent {
            completed_mode: ending_mode,
            next_mode,
            pomodoros_today: self.today_stat().completed_pomodoros,
            task_id,
            auto_started: auto_start,
        };
        info!(
            completed = %ending_mode,
            next = %next_mode,
            cycle = self.timer.pomodoros_in_cycle(),
            auto_started = auto_start,
            "Interval complete"
        );
        self.notifier.notify(&event, self.settings.notifications);
        Some(event)
    }

    fn credit_task(&mut self, id: TaskId, now: DateTime<Utc>) {
        let Some(count) = self.tasks.increment_pomodoro(id) else {
            // Assigned task no longer exists.
            self.timer.assign_task(None);
            return;
        };
        let reached_estimate = self
            .tasks
            .get(id)
            .is_some_and(|t| !t.is_completed() && count >= t.estimated_pomodoros);
        if self.settings.auto_complete_tasks && reached_estimate {
            self.tasks.complete_task(id, now);
            let next = self.tasks.next_available_task().map(|t| t.id);
            self.timer.assign_task(next);
            info!(task_id = %id, "Task reached its estimate and was completed");
        }
        self.persist();
    }

    fn record_abandoned(&mut self, now: DateTime<Utc>) {
        let Some(interval) = self.interval.take() else {
            return;
        };
        let remaining = self.timer.sync(now);
        let elapsed = interval.planned_secs.saturating_sub(remaining);
        if elapsed == 0 {
            return;
        }
        let mode = self.timer.mode();
        self.sessions.add_session(SessionRecord {
            mode,
            task_id: (mode == TimerMode::Work)
                .then(|| self.timer.assigned_task_id())
                .flatten(),
            started_at: interval.started_at,
            completed_at: None,
            duration_seconds: elapsed,
            was_completed: false,
        });
        debug!(%mode, elapsed, "Interval abandoned");
    }

    // ---- tasks -------------------------------------------------------------

    pub fn add_task(&mut self, data: NewTask) -> TaskId {
        let now = self.now();
        let id = self.tasks.add_task(data, now);
        self.persist();
        id
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) {
        self.tasks.update_task(id, patch);
        self.persist();
    }

    pub fn delete_task(&mut self, id: TaskId) {
        self.tasks.delete_task(id);
        if self.timer.assigned_task_id() == Some(id) {
            self.timer.assign_task(None);
        }
        self.persist();
    }

    /// Marks a task done by hand. A completed task cannot stay assigned.
    pub fn complete_task(&mut self, id: TaskId) {
        let now = self.now();
        self.tasks.complete_task(id, now);
        if self.timer.assigned_task_id() == Some(id) {
            self.timer.assign_task(None);
        }
        self.persist();
    }

    pub fn reopen_task(&mut self, id: TaskId) {
        self.tasks.reopen_task(id);
        self.persist();
    }

    pub fn reorder_tasks(&mut self, from: usize, to: usize) {
        self.tasks.reorder(from, to);
        self.persist();
    }

    pub fn clear_completed_tasks(&mut self) -> usize {
        let removed = self.tasks.clear_completed();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Points the timer at a task. Unknown or completed tasks are ignored;
    /// `None` clears the assignment.
    pub fn assign_task(&mut self, id: Option<TaskId>) {
        match id {
            Some(id) => {
                if self.tasks.get(id).is_some_and(|t| !t.is_completed()) {
                    self.timer.assign_task(Some(id));
                }
            }
            None => self.timer.assign_task(None),
        }
    }

    /// Assigns the first task that is not completed, if any.
    pub fn assign_next_available(&mut self) -> Option<TaskId> {
        let next = self.tasks.next_available_task().map(|t| t.id);
        self.timer.assign_task(next);
        next
    }

    // ---- settings ----------------------------------------------------------

    /// Merges a partial settings update. An untouched idle timer picks up the
    /// new duration right away.
    pub fn update_settings(&mut self, patch: SettingsPatch) {
        patch.apply(&mut self.settings);
        if patch.affects_durations() && self.timer.is_idle() && self.interval.is_none() {
            self.timer.reset(&self.settings.timer);
        }
        self.persist();
    }

    // ---- insights ----------------------------------------------------------

    pub fn daily_stats(&self, days: u32) -> Vec<DailyStat> {
        self.sessions.daily_stats(days, self.today())
    }

    pub fn today_stat(&self) -> DailyStat {
        let today = self.today();
        self.sessions
            .daily_stats(1, today)
            .pop()
            .unwrap_or_else(|| DailyStat::new(today))
    }

    pub fn accuracy_report(&self) -> Vec<EstimateAccuracy> {
        insights::estimate_accuracy_report(self.tasks.tasks())
    }

    // ---- data --------------------------------------------------------------

    /// Deletes everything stored and returns to a fresh state.
    pub fn wipe_all_data(&mut self) -> Result<(), AppError> {
        self.db.wipe()?;
        self.settings = AppSettings::default();
        self.tasks.clear();
        self.sessions.clear();
        self.timer = TimerState::new(&self.settings.timer);
        self.completion_latched = false;
        self.interval = None;
        info!("All data wiped");
        Ok(())
    }

    fn persist(&self) {
        let state = StoredState {
            settings: self.settings.clone(),
            tasks: self.tasks.tasks().to_vec(),
        };
        if let Err(e) = self.db.save_state(&state) {
            error!(error = %e, "Failed to save state");
        }
    }
}
