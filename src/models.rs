//! Data models for the Pomotask application.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a task in the tracker.
pub type TaskId = Uuid;

/// Identifier of a session log record.
pub type SessionId = Uuid;

/// Allowed range for every configured duration, in minutes.
pub const DURATION_MINS_RANGE: (u32, u32) = (1, 60);

/// Allowed range for the number of pomodoros before a long break.
pub const LONG_BREAK_INTERVAL_RANGE: (u32, u32) = (2, 10);

/// Which kind of interval the timer is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Focus",
            Self::ShortBreak => "Short break",
            Self::LongBreak => "Long break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run status of the timer, orthogonal to [`TimerMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Durations and cadence of the pomodoro cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerConfiguration {
    /// Duration of a work session in minutes.
    pub work_duration: u32,
    /// Duration of a short break in minutes.
    pub short_break_duration: u32,
    /// Duration of a long break in minutes.
    pub long_break_duration: u32,
    /// Number of pomodoros before a long break.
    pub long_break_interval: u32,
    /// Start breaks without waiting for the user.
    pub auto_start_breaks: bool,
    /// Start work sessions without waiting for the user.
    pub auto_start_work: bool,
}

impl Default for TimerConfiguration {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            long_break_interval: 4,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }
}

impl TimerConfiguration {
    /// Returns a copy with every numeric field pulled into its allowed range.
    pub fn clamped(&self) -> Self {
        let (min_mins, max_mins) = DURATION_MINS_RANGE;
        let (min_interval, max_interval) = LONG_BREAK_INTERVAL_RANGE;
        Self {
            work_duration: self.work_duration.clamp(min_mins, max_mins),
            short_break_duration: self.short_break_duration.clamp(min_mins, max_mins),
            long_break_duration: self.long_break_duration.clamp(min_mins, max_mins),
            long_break_interval: self.long_break_interval.clamp(min_interval, max_interval),
            ..self.clone()
        }
    }

    fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_duration,
            TimerMode::ShortBreak => self.short_break_duration,
            TimerMode::LongBreak => self.long_break_duration,
        }
    }
}

/// Canonical length of an interval of `mode`, in seconds.
pub fn resolve_duration(mode: TimerMode, config: &TimerConfiguration) -> u32 {
    config.minutes_for(mode) * 60
}

/// Flags handed to the notifier on every completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub sound: bool,
    pub vibration: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            vibration: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Everything the user can configure. Persisted under the `settings` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    #[serde(flatten)]
    pub timer: TimerConfiguration,
    pub notifications: NotificationSettings,
    pub theme: Theme,
    /// Complete the assigned task once its estimate is reached.
    pub auto_complete_tasks: bool,
}

/// Partial settings update. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub work_duration: Option<u32>,
    pub short_break_duration: Option<u32>,
    pub long_break_duration: Option<u32>,
    pub long_break_interval: Option<u32>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_work: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub notification_sound: Option<bool>,
    pub notification_vibration: Option<bool>,
    pub theme: Option<Theme>,
    pub auto_complete_tasks: Option<bool>,
}

impl SettingsPatch {
    /// Merges the patch into `settings` and clamps the result.
    pub fn apply(&self, settings: &mut AppSettings) {
        let timer = &mut settings.timer;
        if let Some(v) = self.work_duration {
            timer.work_duration = v;
        }
        if let Some(v) = self.short_break_duration {
            timer.short_break_duration = v;
        }
        if let Some(v) = self.long_break_duration {
            timer.long_break_duration = v;
        }
        if let Some(v) = self.long_break_interval {
            timer.long_break_interval = v;
        }
        if let Some(v) = self.auto_start_breaks {
            timer.auto_start_breaks = v;
        }
        if let Some(v) = self.auto_start_work {
            timer.auto_start_work = v;
        }
        *timer = timer.clamped();

        let notifications = &mut settings.notifications;
        if let Some(v) = self.notifications_enabled {
            notifications.enabled = v;
        }
        if let Some(v) = self.notification_sound {
            notifications.sound = v;
        }
        if let Some(v) = self.notification_vibration {
            notifications.vibration = v;
        }
        if let Some(v) = self.theme {
            settings.theme = v;
        }
        if let Some(v) = self.auto_complete_tasks {
            settings.auto_complete_tasks = v;
        }
    }

    /// True when the patch touches a field that changes interval lengths.
    pub fn affects_durations(&self) -> bool {
        self.work_duration.is_some()
            || self.short_break_duration.is_some()
            || self.long_break_duration.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// A unit of work the user plans to spend pomodoros on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub order: usize,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// User-supplied fields for a new task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub estimated_pomodoros: u32,
}

impl NewTask {
    pub fn new(title: impl Into<String>, estimated_pomodoros: u32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            estimated_pomodoros,
        }
    }
}

/// Partial task edit. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub estimated_pomodoros: Option<u32>,
}

/// One completed or abandoned timer interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub id: SessionId,
    pub mode: TimerMode,
    pub task_id: Option<TaskId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: u32,
    pub was_completed: bool,
}

/// Fields of a session before the log assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub mode: TimerMode,
    pub task_id: Option<TaskId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: u32,
    pub was_completed: bool,
}

/// Per-day work totals, derived from the session log on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub completed_pomodoros: u32,
    pub total_work_minutes: u32,
    pub tasks_completed: u32,
}

impl DailyStat {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            completed_pomodoros: 0,
            total_work_minutes: 0,
            tasks_completed: 0,
        }
    }
}
