//! End-to-end flows through the public API with a manual clock.

use chrono::{Local, TimeZone, Utc};

use pomotask::models::{NewTask, SettingsPatch, TaskStatus};
use pomotask::{App, Database, ManualClock, NullNotifier, TimerMode, TimerStatus};

fn create_app() -> (App, ManualClock) {
    let start = Local
        .with_ymd_and_hms(2024, 3, 4, 9, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let clock = ManualClock::new(start);
    let db = Database::new_in_memory().unwrap();
    let app = App::new(db, Box::new(clock.clone()), Box::new(NullNotifier)).unwrap();
    (app, clock)
}

/// Starts the current interval and lets it run out.
fn run_interval(app: &mut App, clock: &ManualClock) -> pomotask::CompletionEvent {
    app.start();
    clock.advance_secs(i64::from(app.timer().remaining_secs()));
    app.tick().expect("interval should complete")
}

#[test]
fn test_long_break_after_every_fourth_pomodoro() {
    use TimerMode::*;
    let (mut app, clock) = create_app();

    let mut completed = Vec::new();
    let mut cycle_after = Vec::new();
    for _ in 0..8 {
        let event = run_interval(&mut app, &clock);
        completed.push(event.completed_mode);
        cycle_after.push(app.timer().pomodoros_in_cycle());
    }

    assert_eq!(
        completed,
        vec![Work, ShortBreak, Work, ShortBreak, Work, ShortBreak, Work, LongBreak]
    );
    assert_eq!(cycle_after, vec![1, 1, 2, 2, 3, 3, 4, 0]);
    // Reset happens as the long break completes, before any new work starts.
    assert_eq!(app.timer().mode(), Work);
    assert!(app.timer().is_idle());

    let event = run_interval(&mut app, &clock);
    assert_eq!(event.next_mode, ShortBreak);
    assert_eq!(app.timer().pomodoros_in_cycle(), 1);
}

#[test]
fn test_custom_interval() {
    let (mut app, clock) = create_app();
    app.update_settings(SettingsPatch {
        long_break_interval: Some(2),
        ..SettingsPatch::default()
    });
    run_interval(&mut app, &clock);
    run_interval(&mut app, &clock);
    let event = run_interval(&mut app, &clock);
    assert_eq!(event.completed_mode, TimerMode::Work);
    assert_eq!(event.next_mode, TimerMode::LongBreak);
}

#[test]
fn test_completion_is_reported_once() {
    let (mut app, clock) = create_app();
    app.start();
    clock.advance_secs(25 * 60);
    assert!(app.tick().is_some());
    clock.advance_secs(5);
    assert!(app.tick().is_none());
    assert!(app.visibility_regained().is_none());
    assert!(app.complete_pomodoro().is_none());
    assert_eq!(app.sessions().len(), 1);
}

#[test]
fn test_pause_and_resume_keeps_remaining_time() {
    let (mut app, clock) = create_app();
    app.start();
    clock.advance_secs(600);
    app.pause();
    assert_eq!(app.timer().status(), TimerStatus::Paused);
    assert_eq!(app.timer().remaining_secs(), 900);

    // Time spent paused does not count.
    clock.advance_secs(3600);
    app.tick();
    assert_eq!(app.timer().remaining_secs(), 900);

    app.start();
    clock.advance_secs(899);
    assert!(app.tick().is_none());
    assert_eq!(app.timer().remaining_secs(), 1);
    clock.advance_secs(1);
    assert!(app.tick().is_some());
}

#[test]
fn test_suspension_completes_on_wake() {
    let (mut app, clock) = create_app();
    app.start();
    clock.advance_secs(2 * 3600);
    let event = app.visibility_regained().expect("overdue interval completes");
    assert_eq!(event.completed_mode, TimerMode::Work);
    assert_eq!(app.timer().mode(), TimerMode::ShortBreak);
    assert!(app.timer().is_idle());
}

#[test]
fn test_pomodoros_credit_assigned_task() {
    let (mut app, clock) = create_app();
    let id = app.add_task(NewTask::new("write report", 2));
    app.assign_task(Some(id));

    let event = run_interval(&mut app, &clock);
    assert_eq!(event.task_id, Some(id));
    run_interval(&mut app, &clock); // break credits nothing
    run_interval(&mut app, &clock);

    let task = app.tasks().get(id).unwrap();
    assert_eq!(task.completed_pomodoros, 2);
    assert_ne!(task.status, TaskStatus::Completed);
    assert_eq!(app.today_stat().completed_pomodoros, 2);
    assert_eq!(app.today_stat().total_work_minutes, 50);
}

#[test]
fn test_auto_complete_moves_to_next_task() {
    let (mut app, clock) = create_app();
    app.update_settings(SettingsPatch {
        auto_complete_tasks: Some(true),
        ..SettingsPatch::default()
    });
    let first = app.add_task(NewTask::new("first", 1));
    let second = app.add_task(NewTask::new("second", 3));
    app.assign_task(Some(first));

    run_interval(&mut app, &clock);

    assert!(app.tasks().get(first).unwrap().is_completed());
    assert_eq!(app.timer().assigned_task_id(), Some(second));
    assert_eq!(app.today_stat().tasks_completed, 1);
}

#[test]
fn test_auto_start_chains_intervals() {
    let (mut app, clock) = create_app();
    app.update_settings(SettingsPatch {
        auto_start_breaks: Some(true),
        auto_start_work: Some(true),
        ..SettingsPatch::default()
    });
    let event = run_interval(&mut app, &clock);
    assert!(event.auto_started);
    assert!(app.timer().is_running());
    assert_eq!(app.timer().mode(), TimerMode::ShortBreak);

    clock.advance_secs(5 * 60);
    let event = app.tick().expect("break completes");
    assert_eq!(event.next_mode, TimerMode::Work);
    assert!(app.timer().is_running());
}

#[test]
fn test_settings_and_tasks_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let clock = ManualClock::new(Utc::now());
    {
        let db = Database::open(dir.path()).unwrap();
        let mut app = App::new(db, Box::new(clock.clone()), Box::new(NullNotifier)).unwrap();
        app.add_task(NewTask::new("persisted", 4));
        app.update_settings(SettingsPatch {
            work_duration: Some(45),
            ..SettingsPatch::default()
        });
    }

    let db = Database::open(dir.path()).unwrap();
    let app = App::new(db, Box::new(clock), Box::new(NullNotifier)).unwrap();
    assert_eq!(app.settings().timer.work_duration, 45);
    assert_eq!(app.timer().remaining_secs(), 45 * 60);
    assert_eq!(app.tasks().len(), 1);
    assert_eq!(app.tasks().tasks()[0].title, "persisted");
    // Sessions are runtime only.
    assert!(app.sessions().is_empty());
}
