//! Pomotask - a console Pomodoro timer with a task list.
//!
//! Commands are read from stdin one per line; `help` lists them. The timer
//! runs on a background thread and reports through a channel.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pomotask::config::Config;
use pomotask::event::{self, EventResult};
use pomotask::notifications::{notification_text, DesktopNotifier, Notifier, NullNotifier};
use pomotask::scheduler::{self, TimerMessage};
use pomotask::timer::format_status_line;
use pomotask::{App, CompletionEvent, Database, SystemClock};

/// How long the main loop waits for input before checking timer messages.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Pomodoro timer with task tracking and focus insights.
#[derive(Parser, Debug)]
#[command(name = "pomotask")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    POMOTASK_DATA_DIR   Data directory (default: platform data dir)
    POMOTASK_TICK_MS    Timer heartbeat in milliseconds (default: 1000)
    POMOTASK_LOG        Log filter (default: warn)

Type 'help' once running to list commands.")]
struct Cli {
    /// Directory holding the database; overrides POMOTASK_DATA_DIR.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Delete all stored settings and tasks before starting.
    #[arg(long)]
    wipe: bool,

    /// Disable desktop notifications for this run.
    #[arg(long)]
    no_notify: bool,
}

/// Console front end. Owns the receiving side of
/// the timer channel and renders whatever happens.
struct Pomotask {
    app: Arc<Mutex<App>>,
    timer_rx: Receiver<TimerMessage>,
    input_rx: Receiver<String>,
    last_line: String,
    /// Minute of the last heartbeat shown, rounded up.
    last_minute: Option<u32>,
}

/// Whole minutes left, rounded up, so 24:01 still counts as minute 25.
fn minute_of(remaining_secs: u32) -> u32 {
    remaining_secs.div_ceil(60)
}

impl Pomotask {
    fn print_status(&mut self, line: String) {
        // The heartbeat repeats itself while idle; only print changes.
        if line != self.last_line {
            println!("{}", line);
            self.last_line = line;
        }
    }

    /// Prints the current status line after a command.
    fn show_status(&mut self) {
        let Some((line, remaining_secs)) = self
            .app
            .lock()
            .ok()
            .map(|app| (format_status_line(app.timer()), app.timer().remaining_secs()))
        else {
            return;
        };
        self.last_minute = Some(minute_of(remaining_secs));
        self.print_status(line);
    }

    fn handle_completion(&self, event: CompletionEvent) {
        let (summary, body) = notification_text(&event);
        println!("{}", summary);
        println!("{}", body);
        if event.auto_started {
            println!("{} started automatically.", event.next_mode);
        }
    }

    fn process_timer_messages(&mut self) {
        while let Ok(msg) = self.timer_rx.try_recv() {
            match msg {
                // Heartbeats are shown once per minute crossed, even when a
                // late tick skips the exact boundary.
                TimerMessage::StateChanged {
                    line,
                    remaining_secs,
                } => {
                    let minute = minute_of(remaining_secs);
                    if self.last_minute != Some(minute) {
                        self.last_minute = Some(minute);
                        self.print_status(line);
                    }
                }
                TimerMessage::Completed(event) => self.handle_completion(event),
            }
        }
    }

    /// Returns false once the user quits.
    fn process_line(&mut self, line: &str) -> bool {
        let command = match event::parse_command(line) {
            Ok(command) => command,
            Err(event::ParseError::Empty) => return true,
            Err(e) => {
                println!("{}", e);
                return true;
            }
        };

        let result = {
            let Ok(mut app) = self.app.lock() else {
                error!("App state lock poisoned");
                return false;
            };
            event::handle_command(&mut app, command)
        };

        match result {
            Ok(EventResult::Quit) => return false,
            Ok(EventResult::StateChanged) => self.show_status(),
            Ok(EventResult::StateChangedWithCompletion(completion)) => {
                self.handle_completion(completion);
                self.show_status();
            }
            Ok(EventResult::Output(text)) => println!("{}", text),
            Err(e) => {
                error!(error = %e, "Command failed");
                println!("Error: {}", e);
            }
        }
        true
    }

    fn run(&mut self) {
        prompt();
        loop {
            match self.input_rx.recv_timeout(INPUT_POLL) {
                Ok(line) => {
                    self.process_timer_messages();
                    if !self.process_line(&line) {
                        break;
                    }
                    prompt();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.process_timer_messages();
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });
    rx
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    init_logging(&config.log_filter);
    info!(data_dir = %config.data_dir.display(), "Starting pomotask");

    let db = Database::open(&config.data_dir)?;
    if cli.wipe {
        db.wipe()?;
    }

    let notifier: Box<dyn Notifier> = if cli.no_notify {
        Box::new(NullNotifier)
    } else {
        Box::new(DesktopNotifier::probe())
    };

    let app = match App::new(db, Box::new(SystemClock), notifier) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Failed to load stored data");
            eprintln!("Stored data could not be loaded ({}). Run with --wipe to start fresh.", e);
            return Err(e.into());
        }
    };
    let app = Arc::new(Mutex::new(app));

    let (tx, timer_rx) = mpsc::channel();
    let app_clone = Arc::clone(&app);
    let tick_interval = config.tick_interval;
    thread::spawn(move || {
        scheduler::run_timer_loop(app_clone, tx, tick_interval);
    });

    let mut pomotask = Pomotask {
        app,
        timer_rx,
        input_rx: spawn_input_reader(),
        last_line: String::new(),
        last_minute: None,
    };
    pomotask.show_status();
    pomotask.run();

    info!("Exiting");
    Ok(())
}
