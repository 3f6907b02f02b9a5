//! Read-side projections over tasks and the session log.
//!
//! Nothing here is cached; every figure is recomputed from its sources on
//! each call.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{DailyStat, Task, TaskId, TimerMode};
use crate::sessions::{round_minutes, SessionLog};

/// Accuracy values are capped at this percentage.
pub const MAX_ACCURACY: u32 = 200;

/// Inclusive bounds of the "good" accuracy band.
pub const GOOD_ACCURACY_RANGE: (u32, u32) = (80, 120);

/// How an estimate compared with the pomodoros actually spent.
///
/// The labels follow the accuracy ratio `estimated / completed`: a ratio
/// below the good band is reported as underestimated and above it as
/// overestimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccuracyRating {
    Good,
    Underestimated,
    Overestimated,
}

impl AccuracyRating {
    pub fn from_accuracy(accuracy: u32) -> Self {
        let (low, high) = GOOD_ACCURACY_RANGE;
        if accuracy < low {
            Self::Underestimated
        } else if accuracy > high {
            Self::Overestimated
        } else {
            Self::Good
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Underestimated => "Underestimated",
            Self::Overestimated => "Overestimated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateAccuracy {
    pub task_id: TaskId,
    pub title: String,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    /// `estimated / completed` as a rounded percentage, capped at [`MAX_ACCURACY`].
    pub accuracy: u32,
    /// `completed - estimated`; positive means more pomodoros than planned.
    pub over_under: i64,
    pub rating: AccuracyRating,
}

/// Accuracy for a single task, or `None` when it is not completed or has no
/// pomodoros to compare against.
pub fn estimate_accuracy(task: &Task) -> Option<EstimateAccuracy> {
    if !task.is_completed() || task.completed_pomodoros == 0 {
        return None;
    }
    let estimated = f64::from(task.estimated_pomodoros);
    let completed = f64::from(task.completed_pomodoros);
    let accuracy = ((estimated / completed) * 100.0).round() as u32;
    let accuracy = accuracy.min(MAX_ACCURACY);

    Some(EstimateAccuracy {
        task_id: task.id,
        title: task.title.clone(),
        estimated_pomodoros: task.estimated_pomodoros,
        completed_pomodoros: task.completed_pomodoros,
        accuracy,
        over_under: i64::from(task.completed_pomodoros) - i64::from(task.estimated_pomodoros),
        rating: AccuracyRating::from_accuracy(accuracy),
    })
}

/// Accuracy for every eligible task, in task order.
pub fn estimate_accuracy_report(tasks: &[Task]) -> Vec<EstimateAccuracy> {
    tasks.iter().filter_map(estimate_accuracy).collect()
}

/// Mean accuracy over a report, rounded. `None` for an empty report.
pub fn average_accuracy(report: &[EstimateAccuracy]) -> Option<u32> {
    if report.is_empty() {
        return None;
    }
    let sum: u64 = report.iter().map(|r| u64::from(r.accuracy)).sum();
    Some((sum as f64 / report.len() as f64).round() as u32)
}

/// Totals over a window of daily stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsSummary {
    pub days: u32,
    pub total_pomodoros: u32,
    pub total_work_minutes: u32,
    pub active_days: u32,
    /// Mean pomodoros over days with at least one, rounded to one decimal.
    pub average_per_active_day: f64,
    pub best_day: Option<DailyStat>,
    /// Consecutive days with work, counted back from the newest day.
    pub current_streak: u32,
}

/// Summarises stats ordered oldest first, as [`SessionLog::daily_stats`] returns them.
pub fn summarize(stats: &[DailyStat]) -> InsightsSummary {
    let total_pomodoros = stats.iter().map(|s| s.completed_pomodoros).sum();
    let total_work_minutes = stats.iter().map(|s| s.total_work_minutes).sum();
    let active_days = stats.iter().filter(|s| s.completed_pomodoros > 0).count() as u32;
    let average_per_active_day = if active_days > 0 {
        (f64::from(total_pomodoros) / f64::from(active_days) * 10.0).round() / 10.0
    } else {
        0.0
    };

    // Earliest day wins a tie.
    let best_day = stats
        .iter()
        .filter(|s| s.completed_pomodoros > 0)
        .fold(None::<&DailyStat>, |best, s| match best {
            Some(b) if b.completed_pomodoros >= s.completed_pomodoros => Some(b),
            _ => Some(s),
        })
        .cloned();

    let current_streak = stats
        .iter()
        .rev()
        .take_while(|s| s.completed_pomodoros > 0)
        .count() as u32;

    InsightsSummary {
        days: stats.len() as u32,
        total_pomodoros,
        total_work_minutes,
        active_days,
        average_per_active_day,
        best_day,
        current_streak,
    }
}

/// Minutes of completed focus time logged against each task.
pub fn focus_minutes_by_task(log: &SessionLog) -> HashMap<TaskId, u32> {
    let mut seconds: HashMap<TaskId, u64> = HashMap::new();
    for session in log.completed_work_sessions() {
        if let Some(task_id) = session.task_id {
            *seconds.entry(task_id).or_default() += u64::from(session.duration_seconds);
        }
    }
    seconds
        .into_iter()
        .map(|(id, secs)| (id, round_minutes(secs)))
        .collect()
}

/// Share of started work intervals that ran to completion, as a rounded
/// percentage. `None` when no work interval was recorded.
pub fn completion_rate(log: &SessionLog) -> Option<u32> {
    let work: Vec<_> = log
        .sessions()
        .iter()
        .filter(|s| s.mode == TimerMode::Work)
        .collect();
    if work.is_empty() {
        return None;
    }
    let completed = work.iter().filter(|s| s.was_completed).count();
    Some(((completed as f64 / work.len() as f64) * 100.0).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionRecord, TaskStatus};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn task(estimated: u32, completed: u32, status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "task".to_string(),
            description: String::new(),
            estimated_pomodoros: estimated,
            completed_pomodoros: completed,
            status,
            created_at: at(),
            completed_at: (status == TaskStatus::Completed).then(at),
            order: 0,
        }
    }

    fn day(d: u32, pomodoros: u32) -> DailyStat {
        DailyStat {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            completed_pomodoros: pomodoros,
            total_work_minutes: pomodoros * 25,
            tasks_completed: 0,
        }
    }

    #[test]
    fn test_accuracy_more_pomodoros_than_planned() {
        let result = estimate_accuracy(&task(4, 5, TaskStatus::Completed)).unwrap();
        assert_eq!(result.accuracy, 80);
        assert_eq!(result.over_under, 1);
        assert_eq!(result.rating, AccuracyRating::Good);
    }

    #[test]
    fn test_accuracy_is_capped() {
        let result = estimate_accuracy(&task(10, 1, TaskStatus::Completed)).unwrap();
        assert_eq!(result.accuracy, MAX_ACCURACY);
        assert_eq!(result.over_under, -9);
        assert_eq!(result.rating, AccuracyRating::Overestimated);
    }

    #[test]
    fn test_accuracy_rating_bands() {
        assert_eq!(AccuracyRating::from_accuracy(79), AccuracyRating::Underestimated);
        assert_eq!(AccuracyRating::from_accuracy(80), AccuracyRating::Good);
        assert_eq!(AccuracyRating::from_accuracy(120), AccuracyRating::Good);
        assert_eq!(AccuracyRating::from_accuracy(121), AccuracyRating::Overestimated);

        let result = estimate_accuracy(&task(2, 4, TaskStatus::Completed)).unwrap();
        assert_eq!(result.accuracy, 50);
        assert_eq!(result.rating, AccuracyRating::Underestimated);
        assert_eq!(result.rating.label(), "Underestimated");
    }

    #[test]
    fn test_accuracy_skips_ineligible_tasks() {
        assert!(estimate_accuracy(&task(3, 3, TaskStatus::InProgress)).is_none());
        assert!(estimate_accuracy(&task(3, 0, TaskStatus::Completed)).is_none());

        let tasks = vec![
            task(3, 3, TaskStatus::Completed),
            task(3, 2, TaskStatus::InProgress),
            task(2, 4, TaskStatus::Completed),
        ];
        let report = estimate_accuracy_report(&tasks);
        assert_eq!(report.len(), 2);
        assert_eq!(average_accuracy(&report), Some(75));
        assert_eq!(average_accuracy(&[]), None);
    }

    #[test]
    fn test_summarize_window() {
        let stats = vec![day(1, 3), day(2, 0), day(3, 5), day(4, 5), day(5, 2)];
        let summary = summarize(&stats);
        assert_eq!(summary.days, 5);
        assert_eq!(summary.total_pomodoros, 15);
        assert_eq!(summary.total_work_minutes, 375);
        assert_eq!(summary.active_days, 4);
        assert_eq!(summary.average_per_active_day, 3.8);
        assert_eq!(summary.best_day, Some(day(3, 5)));
        assert_eq!(summary.current_streak, 3);
    }

    #[test]
    fn test_summarize_empty_and_idle_today() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_pomodoros, 0);
        assert_eq!(summary.best_day, None);
        assert_eq!(summary.average_per_active_day, 0.0);

        let summary = summarize(&[day(1, 4), day(2, 0)]);
        assert_eq!(summary.current_streak, 0);
    }

    #[test]
    fn test_focus_minutes_and_completion_rate() {
        let mut log = SessionLog::new();
        let task_id = Uuid::new_v4();
        let record = |mode, task_id, duration_seconds, was_completed| SessionRecord {
            mode,
            task_id,
            started_at: at(),
            completed_at: None,
            duration_seconds,
            was_completed,
        };
        log.add_session(record(TimerMode::Work, Some(task_id), 1500, true));
        log.add_session(record(TimerMode::Work, Some(task_id), 1500, true));
        log.add_session(record(TimerMode::Work, Some(task_id), 700, false));
        log.add_session(record(TimerMode::ShortBreak, None, 300, true));

        let minutes = focus_minutes_by_task(&log);
        assert_eq!(minutes.get(&task_id), Some(&50));
        assert_eq!(completion_rate(&log), Some(67));
        assert_eq!(completion_rate(&SessionLog::new()), None);
    }
}
