//! Console command parsing and handling.

use std::fmt::Write as _;

use thiserror::Error;

use crate::app::{App, AppError, CompletionEvent};
use crate::insights::{self, average_accuracy};
use crate::models::{NewTask, SettingsPatch, TaskPatch, TaskStatus, Theme, TimerMode};
use crate::sessions::MAX_STATS_DAYS;
use crate::timer::format_status_line;

/// Default window for the `stats` command.
pub const DEFAULT_STATS_DAYS: u32 = 7;

/// A parsed console command. Task positions are 0-based here and 1-based
/// on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Mode(TimerMode),
    Sync,
    Status,
    AddTask { estimate: u32, title: String },
    EditTask { index: usize, title: String },
    EstimateTask { index: usize, estimate: u32 },
    CompleteTask(usize),
    ReopenTask(usize),
    DeleteTask(usize),
    MoveTask { from: usize, to: usize },
    AssignTask(usize),
    Unassign,
    AssignNext,
    ListTasks,
    ClearCompleted,
    Stats(u32),
    Accuracy,
    Settings(SettingsPatch),
    ShowSettings,
    Wipe,
    Help,
    Quit,
}

/// Result of handling a command.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// User requested quit.
    Quit,
    /// Timer state changed, status line needs update.
    StateChanged,
    /// State changed with a completion event.
    StateChangedWithCompletion(CompletionEvent),
    /// Text to print.
    Output(String),
}

/// Reasons a line could not be turned into a [`Command`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
Timer:    start | pause | reset | mode work|short|long | sync | status
Tasks:    add <estimate> <title> | edit <n> <title> | estimate <n> <count>
          done <n> | reopen <n> | delete <n> | move <from> <to>
          assign <n> | unassign | next | tasks | clear-done
Insights: stats [days] | accuracy
Settings: settings | set work|short|long|interval <n>
          set auto-breaks|auto-work|auto-complete|notify|sound|vibrate on|off
          set theme light|dark|system
Data:     wipe | help | quit";

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err(ParseError::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let command = match word {
        "start" | "resume" => Command::Start,
        "pause" => Command::Pause,
        "reset" => Command::Reset,
        "mode" => Command::Mode(parse_mode(&rest).ok_or(ParseError::Usage("mode work|short|long"))?),
        "sync" => Command::Sync,
        "status" => Command::Status,
        "add" => {
            const USAGE: &str = "add <estimate> <title>";
            let estimate = rest.first().and_then(|s| s.parse().ok());
            match (estimate, rest.len() > 1) {
                (Some(estimate), true) => Command::AddTask {
                    estimate,
                    title: rest[1..].join(" "),
                },
                _ => return Err(ParseError::Usage(USAGE)),
            }
        }
        "edit" => {
            const USAGE: &str = "edit <n> <title>";
            let index = rest.first().and_then(|s| parse_position(s));
            match (index, rest.len() > 1) {
                (Some(index), true) => Command::EditTask {
                    index,
                    title: rest[1..].join(" "),
                },
                _ => return Err(ParseError::Usage(USAGE)),
            }
        }
        "estimate" => {
            let index = rest.first().and_then(|s| parse_position(s));
            let estimate = rest.get(1).and_then(|s| s.parse().ok());
            match (index, estimate) {
                (Some(index), Some(estimate)) => Command::EstimateTask { index, estimate },
                _ => return Err(ParseError::Usage("estimate <n> <count>")),
            }
        }
        "done" => Command::CompleteTask(single_position(&rest, "done <n>")?),
        "reopen" => Command::ReopenTask(single_position(&rest, "reopen <n>")?),
        "delete" => Command::DeleteTask(single_position(&rest, "delete <n>")?),
        "assign" => Command::AssignTask(single_position(&rest, "assign <n>")?),
        "move" => {
            let from = rest.first().and_then(|s| parse_position(s));
            let to = rest.get(1).and_then(|s| parse_position(s));
            match (from, to) {
                (Some(from), Some(to)) => Command::MoveTask { from, to },
                _ => return Err(ParseError::Usage("move <from> <to>")),
            }
        }
        "unassign" => Command::Unassign,
        "next" => Command::AssignNext,
        "tasks" => Command::ListTasks,
        "clear-done" => Command::ClearCompleted,
        "stats" => match rest.first() {
            Some(days) => Command::Stats(
                days.parse()
                    .ok()
                    .filter(|d| (1..=MAX_STATS_DAYS).contains(d))
                    .ok_or(ParseError::Usage("stats [days], at most 365"))?,
            ),
            None => Command::Stats(DEFAULT_STATS_DAYS),
        },
        "accuracy" => Command::Accuracy,
        "settings" => Command::ShowSettings,
        "set" => Command::Settings(parse_setting(&rest)?),
        "wipe" => Command::Wipe,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn parse_mode(rest: &[&str]) -> Option<TimerMode> {
    match rest.first().copied()? {
        "work" | "focus" => Some(TimerMode::Work),
        "short" => Some(TimerMode::ShortBreak),
        "long" => Some(TimerMode::LongBreak),
        _ => None,
    }
}

/// 1-based position to 0-based index.
fn parse_position(s: &str) -> Option<usize> {
    s.parse::<usize>().ok()?.checked_sub(1)
}

fn single_position(rest: &[&str], usage: &'static str) -> Result<usize, ParseError> {
    rest.first()
        .and_then(|s| parse_position(s))
        .ok_or(ParseError::Usage(usage))
}

fn parse_switch(value: Option<&&str>) -> Option<bool> {
    match *value? {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_setting(rest: &[&str]) -> Result<SettingsPatch, ParseError> {
    const USAGE: &str = "set <setting> <value>, see 'help'";
    let key = *rest.first().ok_or(ParseError::Usage(USAGE))?;
    let value = rest.get(1);
    let number = || {
        value
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or(ParseError::Usage(USAGE))
    };
    let switch = || parse_switch(value).ok_or(ParseError::Usage(USAGE));

    let mut patch = SettingsPatch::default();
    match key {
        "work" => patch.work_duration = Some(number()?),
        "short" => patch.short_break_duration = Some(number()?),
        "long" => patch.long_break_duration = Some(number()?),
        "interval" => patch.long_break_interval = Some(number()?),
        "auto-breaks" => patch.auto_start_breaks = Some(switch()?),
        "auto-work" => patch.auto_start_work = Some(switch()?),
        "auto-complete" => patch.auto_complete_tasks = Some(switch()?),
        "notify" => patch.notifications_enabled = Some(switch()?),
        "sound" => patch.notification_sound = Some(switch()?),
        "vibrate" => patch.notification_vibration = Some(switch()?),
        "theme" => {
            patch.theme = Some(match value.copied() {
                Some("light") => Theme::Light,
                Some("dark") => Theme::Dark,
                Some("system") => Theme::System,
                _ => return Err(ParseError::Usage("set theme light|dark|system")),
            })
        }
        _ => return Err(ParseError::Usage(USAGE)),
    }
    Ok(patch)
}

/// Applies a command to the app.
pub fn handle_command(app: &mut App, command: Command) -> Result<EventResult, AppError> {
    let result = match command {
        Command::Start => {
            app.start();
            EventResult::StateChanged
        }
        Command::Pause => match app.pause() {
            Some(event) => EventResult::StateChangedWithCompletion(event),
            None => EventResult::StateChanged,
        },
        Command::Reset => {
            app.reset();
            EventResult::StateChanged
        }
        Command::Mode(mode) => {
            app.set_mode(mode);
            EventResult::StateChanged
        }
        Command::Sync => match app.visibility_regained() {
            Some(event) => EventResult::StateChangedWithCompletion(event),
            None => EventResult::StateChanged,
        },
        Command::Status => EventResult::Output(format_status(app)),
        Command::AddTask { estimate, title } => {
            app.add_task(NewTask::new(title, estimate));
            EventResult::Output(format_tasks(app))
        }
        Command::EditTask { index, title } => with_task(app, index, |app, id| {
            app.update_task(
                id,
                TaskPatch {
                    title: Some(title),
                    ..TaskPatch::default()
                },
            )
        }),
        Command::EstimateTask { index, estimate } => with_task(app, index, |app, id| {
            app.update_task(
                id,
                TaskPatch {
                    estimated_pomodoros: Some(estimate),
                    ..TaskPatch::default()
                },
            )
        }),
        Command::CompleteTask(index) => with_task(app, index, App::complete_task),
        Command::ReopenTask(index) => with_task(app, index, App::reopen_task),
        Command::DeleteTask(index) => with_task(app, index, App::delete_task),
        Command::AssignTask(index) => {
            with_task(app, index, |app, id| app.assign_task(Some(id)))
        }
        Command::MoveTask { from, to } => {
            app.reorder_tasks(from, to);
            EventResult::Output(format_tasks(app))
        }
        Command::Unassign => {
            app.assign_task(None);
            EventResult::Output(format_tasks(app))
        }
        Command::AssignNext => {
            app.assign_next_available();
            EventResult::Output(format_tasks(app))
        }
        Command::ListTasks => EventResult::Output(format_tasks(app)),
        Command::ClearCompleted => {
            let removed = app.clear_completed_tasks();
            EventResult::Output(format!("Removed {} completed task(s).", removed))
        }
        Command::Stats(days) => EventResult::Output(format_stats(app, days)),
        Command::Accuracy => EventResult::Output(format_accuracy(app)),
        Command::Settings(patch) => {
            app.update_settings(patch);
            EventResult::Output(format_settings(app))
        }
        Command::ShowSettings => EventResult::Output(format_settings(app)),
        Command::Wipe => {
            app.wipe_all_data()?;
            EventResult::Output("All data deleted.".to_string())
        }
        Command::Help => EventResult::Output(HELP.to_string()),
        Command::Quit => EventResult::Quit,
    };
    Ok(result)
}

/// Runs `f` on the task at `index`; an out-of-range index does nothing.
fn with_task<F>(app: &mut App, index: usize, f: F) -> EventResult
where
    F: FnOnce(&mut App, crate::models::TaskId),
{
    if let Some(id) = app.tasks().id_at(index) {
        f(app, id);
    }
    EventResult::Output(format_tasks(app))
}

pub fn format_status(app: &App) -> String {
    let timer = app.timer();
    let mut out = format_status_line(timer);
    let interval = app.settings().timer.long_break_interval;
    let _ = write!(
        out,
        "\nCycle: {}/{}  Today: {} pomodoro(s)",
        timer.pomodoros_in_cycle() % interval,
        interval,
        app.today_stat().completed_pomodoros
    );
    if let Some(task) = timer.assigned_task_id().and_then(|id| app.tasks().get(id)) {
        let _ = write!(
            out,
            "\nWorking on: {} ({}/{})",
            task.title, task.completed_pomodoros, task.estimated_pomodoros
        );
    }
    out
}

pub fn format_tasks(app: &App) -> String {
    let tasks = app.tasks().tasks();
    if tasks.is_empty() {
        return "No tasks. Add one with: add <estimate> <title>".to_string();
    }
    let assigned = app.timer().assigned_task_id();
    let focus = insights::focus_minutes_by_task(app.sessions());
    let mut out = String::new();
    for (i, task) in tasks.iter().enumerate() {
        let mark = match task.status {
            TaskStatus::Pending => "[ ]",
            TaskStatus::InProgress => "[~]",
            TaskStatus::Completed => "[x]",
        };
        let pointer = if assigned == Some(task.id) { "▶" } else { " " };
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "{} {:>2}. {} {} ({}/{})",
            pointer,
            i + 1,
            mark,
            task.title,
            task.completed_pomodoros,
            task.estimated_pomodoros
        );
        if let Some(minutes) = focus.get(&task.id).filter(|m| **m > 0) {
            let _ = write!(out, " {} min", minutes);
        }
    }
    out
}

pub fn format_stats(app: &App, days: u32) -> String {
    let stats = app.daily_stats(days);
    let summary = insights::summarize(&stats);
    let mut out = String::new();
    for stat in &stats {
        let _ = writeln!(
            out,
            "{}  {:>3} pomodoro(s)  {:>4} min  {:>2} task(s)",
            stat.date, stat.completed_pomodoros, stat.total_work_minutes, stat.tasks_completed
        );
    }
    let _ = write!(
        out,
        "Total: {} pomodoro(s), {} min focused over {} day(s). Streak: {} day(s).",
        summary.total_pomodoros,
        summary.total_work_minutes,
        summary.active_days,
        summary.current_streak
    );
    if let Some(best) = summary.best_day {
        let _ = write!(
            out,
            "\nBest day: {} ({} pomodoro(s))",
            best.date, best.completed_pomodoros
        );
    }
    if let Some(rate) = insights::completion_rate(app.sessions()) {
        let _ = write!(out, "\nCompletion rate: {}%", rate);
    }
    out
}

pub fn format_accuracy(app: &App) -> String {
    let report = app.accuracy_report();
    if report.is_empty() {
        return "No completed tasks with pomodoros yet.".to_string();
    }
    let mut out = String::new();
    for entry in &report {
        let _ = writeln!(
            out,
            "{}: estimated {}, took {} ({:+}), accuracy {}% {}",
            entry.title,
            entry.estimated_pomodoros,
            entry.completed_pomodoros,
            entry.over_under,
            entry.accuracy,
            entry.rating.label()
        );
    }
    if let Some(average) = average_accuracy(&report) {
        let _ = write!(out, "Average accuracy: {}%", average);
    }
    out
}

pub fn format_settings(app: &App) -> String {
    let s = app.settings();
    let on = |b: bool| if b { "on" } else { "off" };
    format!(
        "Work {} min, short break {} min, long break {} min every {} pomodoros\n\
         Auto-start breaks: {}  Auto-start work: {}  Auto-complete tasks: {}\n\
         Notifications: {}  Sound: {}  Vibration: {}  Theme: {:?}",
        s.timer.work_duration,
        s.timer.short_break_duration,
        s.timer.long_break_duration,
        s.timer.long_break_interval,
        on(s.timer.auto_start_breaks),
        on(s.timer.auto_start_work),
        on(s.auto_complete_tasks),
        on(s.notifications.enabled),
        on(s.notifications.sound),
        on(s.notifications.vibration),
        s.theme
    )
}
