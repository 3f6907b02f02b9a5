//! Background trigger loop driving the timer.
//!
//! The loop only decides *when* to look at the timer; how much time passed
//! is always worked out by the timer from its wall-clock anchor. A wake-up
//! that arrives far later than scheduled means the process was suspended,
//! and is handled as "visibility regained".

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::app::{App, CompletionEvent};
use crate::timer::format_status_line;

/// Message sent from the timer thread to the main thread.
#[derive(Debug, Clone)]
pub enum TimerMessage {
    /// Remaining time changed, display needs an update.
    StateChanged { line: String, remaining_secs: u32 },
    /// An interval completed.
    Completed(CompletionEvent),
}

/// Kind of wake-up the loop observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Regular heartbeat.
    Tick,
    /// Heartbeat after a gap, e.g. system sleep.
    Resumed,
}

/// A gap this many times the tick interval is treated as a suspension.
const RESUME_GAP_FACTOR: u32 = 5;

pub fn classify_wake(gap: Duration, tick_interval: Duration) -> Wake {
    if gap > tick_interval * RESUME_GAP_FACTOR {
        Wake::Resumed
    } else {
        Wake::Tick
    }
}

/// Applies one wake-up to the app.
/// Returns (state_changed, optional_completion_event).
pub fn drive(app: &mut App, wake: Wake) -> (bool, Option<CompletionEvent>) {
    if !app.timer().is_running() {
        return (false, None);
    }
    let completion = match wake {
        Wake::Tick => app.tick(),
        Wake::Resumed => app.visibility_regained(),
    };
    (true, completion)
}

/// Runs the trigger loop until the receiving side hangs up.
pub fn run_timer_loop(app: Arc<Mutex<App>>, tx: Sender<TimerMessage>, tick_interval: Duration) {
    let mut last_wake = Instant::now();
    loop {
        thread::sleep(tick_interval);
        let now = Instant::now();
        let wake = classify_wake(now.duration_since(last_wake), tick_interval);
        last_wake = now;
        if wake == Wake::Resumed {
            debug!("Wake-up after a long gap, syncing timer");
        }

        let messages = {
            let Ok(mut app) = app.lock() else {
                error!("App state lock poisoned, stopping timer loop");
                return;
            };
            let (changed, completion) = drive(&mut app, wake);
            let mut messages = Vec::new();
            if let Some(event) = completion {
                messages.push(TimerMessage::Completed(event));
            }
            if changed {
                messages.push(TimerMessage::StateChanged {
                    line: format_status_line(app.timer()),
                    remaining_secs: app.timer().remaining_secs(),
                });
            }
            messages
        };

        for msg in messages {
            if tx.send(msg).is_err() {
                debug!("Receiver gone, stopping timer loop");
                return;
            }
        }
    }
}
