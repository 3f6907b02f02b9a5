//! Append-only log of timer intervals.

use std::collections::HashSet;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{DailyStat, SessionId, SessionRecord, TimerMode, TimerSession};

/// Longest window, in days, that daily stats are computed over.
pub const MAX_STATS_DAYS: u32 = 365;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLog {
    sessions: Vec<TimerSession>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record under a fresh id. No deduplication is done here.
    pub fn add_session(&mut self, record: SessionRecord) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.push(TimerSession {
            id,
            mode: record.mode,
            task_id: record.task_id,
            started_at: record.started_at,
            completed_at: record.completed_at,
            duration_seconds: record.duration_seconds,
            was_completed: record.was_completed,
        });
        id
    }

    pub fn sessions(&self) -> &[TimerSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions whose start lies within `[start, end]`, inclusive.
    pub fn sessions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<&TimerSession> {
        self.sessions
            .iter()
            .filter(|s| s.started_at >= start && s.started_at <= end)
            .collect()
    }

    /// Work totals for each of the last `days` local calendar days ending at
    /// `today`, oldest first. Only completed work sessions count. The window
    /// is capped at [`MAX_STATS_DAYS`].
    pub fn daily_stats(&self, days: u32, today: NaiveDate) -> Vec<DailyStat> {
        (0..days.min(MAX_STATS_DAYS))
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
            .map(|date| self.stat_for(date))
            .collect()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    fn stat_for(&self, date: NaiveDate) -> DailyStat {
        let mut stat = DailyStat::new(date);
        let mut seconds: u64 = 0;
        let mut task_ids = HashSet::new();

        for session in self.completed_work_sessions() {
            if session.started_at.with_timezone(&Local).date_naive() != date {
                continue;
            }
            stat.completed_pomodoros += 1;
            seconds += u64::from(session.duration_seconds);
            if let Some(task_id) = session.task_id {
                task_ids.insert(task_id);
            }
        }

        stat.total_work_minutes = round_minutes(seconds);
        stat.tasks_completed = task_ids.len() as u32;
        stat
    }

    pub(crate) fn completed_work_sessions(&self) -> impl Iterator<Item = &TimerSession> {
        self.sessions
            .iter()
            .filter(|s| s.was_completed && s.mode == TimerMode::Work)
    }
}

/// Seconds to whole minutes, rounding half up.
pub(crate) fn round_minutes(seconds: u64) -> u32 {
    ((seconds + 30) / 60) as u32
}
