//! Timer state machine with wall-clock drift compensation.
//!
//! Remaining time is never decremented per trigger. Every recomputation
//! derives it from the anchor instant recorded when the current running
//! period began, so late, coalesced, or missing triggers cannot skew it.

use chrono::{DateTime, Utc};

use crate::models::{resolve_duration, TaskId, TimerConfiguration, TimerMode, TimerStatus};

/// Result of a [`TimerState::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer was not running; nothing changed.
    Inactive,
    /// Timer is still counting down.
    Counting { remaining_secs: u32 },
    /// This tick observed zero and moved the timer to Idle.
    Finished,
}

/// Live runtime state of the countdown.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    status: TimerStatus,
    mode: TimerMode,
    remaining_secs: u32,
    anchor: Option<DateTime<Utc>>,
    total_secs: u32,
    pomodoros_in_cycle: u32,
    assigned_task_id: Option<TaskId>,
}

impl TimerState {
    /// Idle, in Work mode, with the full work duration loaded.
    pub fn new(config: &TimerConfiguration) -> Self {
        let total_secs = resolve_duration(TimerMode::Work, config);
        Self {
            status: TimerStatus::Idle,
            mode: TimerMode::Work,
            remaining_secs: total_secs,
            anchor: None,
            total_secs,
            pomodoros_in_cycle: 0,
            assigned_task_id: None,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    pub fn pomodoros_in_cycle(&self) -> u32 {
        self.pomodoros_in_cycle
    }

    pub fn assigned_task_id(&self) -> Option<TaskId> {
        self.assigned_task_id
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_idle(&self) -> bool {
        self.status == TimerStatus::Idle
    }

    /// Begins or resumes counting. The remaining time becomes the total of
    /// the new running period so a resumed timer keeps its partial progress.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.is_running() || self.remaining_secs == 0 {
            return;
        }
        self.status = TimerStatus::Running;
        self.anchor = Some(now);
        self.total_secs = self.remaining_secs;
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if !self.is_running() {
            return;
        }
        self.remaining_secs = self.compute_remaining(now);
        self.status = TimerStatus::Paused;
        self.anchor = None;
    }

    /// Discards any progress and reloads the full duration of the current mode.
    pub fn reset(&mut self, config: &TimerConfiguration) {
        self.load_mode(self.mode, config);
    }

    /// Recomputes the remaining time from the anchor. When zero is reached
    /// the timer drops to Idle and the caller is told via [`TickOutcome::Finished`].
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Inactive;
        }
        self.remaining_secs = self.compute_remaining(now);
        if self.remaining_secs == 0 {
            self.status = TimerStatus::Idle;
            self.anchor = None;
            TickOutcome::Finished
        } else {
            TickOutcome::Counting {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Same recomputation as [`tick`](Self::tick) without the zero-reached
    /// transition. Returns the remaining seconds.
    pub fn sync(&mut self, now: DateTime<Utc>) -> u32 {
        if self.is_running() {
            self.remaining_secs = self.compute_remaining(now);
        }
        self.remaining_secs
    }

    /// Switches to `mode` and loads its full duration, leaving the timer Idle.
    pub fn set_mode(&mut self, mode: TimerMode, config: &TimerConfiguration) {
        self.load_mode(mode, config);
    }

    pub fn assign_task(&mut self, task_id: Option<TaskId>) {
        self.assigned_task_id = task_id;
    }

    /// Counts one more finished work interval in the current cycle.
    pub fn advance_cycle(&mut self) {
        self.pomodoros_in_cycle += 1;
    }

    pub fn reset_cycle(&mut self) {
        self.pomodoros_in_cycle = 0;
    }

    /// True when the cycle count has just hit a multiple of `interval`.
    pub fn is_long_break_due(&self, interval: u32) -> bool {
        interval > 0 && self.pomodoros_in_cycle > 0 && self.pomodoros_in_cycle % interval == 0
    }

    /// Seconds elapsed since the anchor, floored. A clock that stepped
    /// backwards counts as no time passed.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u32 {
        match self.anchor {
            Some(anchor) => {
                let secs = (now - anchor).num_seconds().max(0);
                u32::try_from(secs).unwrap_or(u32::MAX)
            }
            None => 0,
        }
    }

    fn compute_remaining(&self, now: DateTime<Utc>) -> u32 {
        self.total_secs.saturating_sub(self.elapsed_secs(now))
    }

    fn load_mode(&mut self, mode: TimerMode, config: &TimerConfiguration) {
        let total_secs = resolve_duration(mode, config);
        self.status = TimerStatus::Idle;
        self.mode = mode;
        self.anchor = None;
        self.total_secs = total_secs;
        self.remaining_secs = total_secs;
    }
}

/// Formats time in MM:SS format.
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// One-line status shown after every state change.
pub fn format_status_line(state: &TimerState) -> String {
    let icon = match (state.status(), state.mode()) {
        (TimerStatus::Paused, _) => "⏸",
        (_, TimerMode::Work) => "🍅",
        (_, TimerMode::ShortBreak | TimerMode::LongBreak) => "☕",
    };
    let status = match state.status() {
        TimerStatus::Idle => "ready",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
    };
    format!(
        "{} {} {} ({})",
        icon,
        state.mode(),
        format_time(state.remaining_secs()),
        status
    )
}
