//! Pomotask - a Pomodoro timer with task tracking and focus insights.
//!
//! The timer derives remaining time from a wall-clock anchor, so it stays
//! correct however irregularly it is polled. [`app::App`] ties the timer to
//! the task list, the session log and persistence.

pub mod app;
pub mod clock;
pub mod config;
pub mod event;
pub mod insights;
pub mod models;
pub mod notifications;
pub mod persistence;
pub mod scheduler;
pub mod sessions;
pub mod tasks;
pub mod timer;

pub use app::{App, AppError, CompletionEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use models::{TimerMode, TimerStatus};
pub use notifications::{DesktopNotifier, Notifier, NullNotifier};
pub use persistence::Database;
