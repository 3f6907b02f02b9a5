//! Completion alerts.
//!
//! The orchestrator talks to a [`Notifier`] whose [`Capabilities`] were probed
//! once at construction. Delivery failures are logged and dropped; they never
//! reach the timer.

use std::thread;

use notify_rust::Notification;
use tracing::{debug, warn};

use crate::app::CompletionEvent;
use crate::models::{NotificationSettings, TimerMode};

/// What the current environment can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub notifications: bool,
    pub sound: bool,
    pub vibration: bool,
}

impl Capabilities {
    /// Intersects user flags with what is available.
    pub fn gate(&self, flags: NotificationSettings) -> NotificationSettings {
        let enabled = flags.enabled && self.notifications;
        NotificationSettings {
            enabled,
            sound: enabled && flags.sound && self.sound,
            vibration: flags.vibration && self.vibration,
        }
    }
}

pub trait Notifier: Send {
    fn capabilities(&self) -> Capabilities;

    /// Alerts the user that an interval ended. `flags` are the user's
    /// current settings; implementations gate them by their capabilities.
    fn notify(&self, event: &CompletionEvent, flags: NotificationSettings);
}

/// Drops every alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn notify(&self, _event: &CompletionEvent, _flags: NotificationSettings) {}
}

/// Desktop notifications through the platform notification service.
/// The sound cue is the notification's sound hint; desktops cannot vibrate.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    capabilities: Capabilities,
}

impl DesktopNotifier {
    pub fn probe() -> Self {
        let available = notification_service_available();
        let capabilities = Capabilities {
            notifications: available,
            sound: available,
            vibration: false,
        };
        debug!(?capabilities, "Probed notification capabilities");
        Self { capabilities }
    }
}

impl Notifier for DesktopNotifier {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Runs in a background thread to avoid blocking.
    fn notify(&self, event: &CompletionEvent, flags: NotificationSettings) {
        let flags = self.capabilities.gate(flags);
        if !flags.enabled {
            return;
        }
        let (summary, body) = notification_text(event);
        thread::spawn(move || {
            let mut notification = Notification::new();
            notification.summary(&summary).body(&body);
            if flags.sound {
                notification.sound_name("default");
            }
            if let Err(e) = notification.show() {
                warn!(error = %e, "Failed to show notification");
            }
        });
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notification_service_available() -> bool {
    match notify_rust::get_server_information() {
        Ok(info) => {
            debug!(server = %info.name, "Notification server found");
            true
        }
        Err(e) => {
            debug!(error = %e, "No notification server");
            false
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn notification_service_available() -> bool {
    true
}

/// Title and body for a completion alert.
pub fn notification_text(event: &CompletionEvent) -> (String, String) {
    match event.completed_mode {
        TimerMode::Work => {
            let count = event.pomodoros_today;
            let done = if count == 1 {
                "You've completed 1 pomodoro today.".to_string()
            } else {
                format!("You've completed {} pomodoros today.", count)
            };
            let next = match event.next_mode {
                TimerMode::LongBreak => "You've earned a long break!",
                _ => "Time for a break.",
            };
            (
                "Pomodoro Complete! 🍅".to_string(),
                format!("Great work! {}\n{}", done, next),
            )
        }
        TimerMode::ShortBreak | TimerMode::LongBreak => (
            "Break Over! ☕".to_string(),
            "Ready to start another pomodoro?".to_string(),
        ),
    }
}
