use crate::core::config::data::path_display;
use crate::core::log_sink::LogSink;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Activity log shown to the user: progress lines from the conversation
/// core plus front-end events, each stamped with the local time. Lines are
/// echoed to stderr when `echo` is set and appended to a log file while
/// file logging is active.
pub struct ActivityLog {
    state: Mutex<LogState>,
    echo: bool,
}

struct LogState {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl ActivityLog {
    pub fn new(log_file: Option<PathBuf>, echo: bool) -> io::Result<Self> {
        if let Some(path) = &log_file {
            test_file_access(path)?;
        }
        let is_active = log_file.is_some();

        Ok(Self {
            state: Mutex::new(LogState {
                file_path: log_file,
                is_active,
            }),
            echo,
        })
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_log_file(&self, path: PathBuf) -> io::Result<String> {
        test_file_access(&path)?;

        let message = format!("Logging enabled to: {}", path_display(&path));
        let mut state = self.state();
        state.file_path = Some(path);
        state.is_active = true;
        Ok(message)
    }

    pub fn toggle_logging(&self) -> Result<String, String> {
        let mut state = self.state();
        let Some(path) = state.file_path.clone() else {
            return Err(
                "No log file specified. Use /log <filename> to enable logging first.".to_string(),
            );
        };

        state.is_active = !state.is_active;
        if state.is_active {
            Ok(format!("Logging resumed to: {}", path_display(&path)))
        } else {
            Ok(format!("Logging paused (file: {})", path_display(&path)))
        }
    }

    /// Short status shown by `/help`: `disabled`, `active (file)` or
    /// `paused (file)`.
    pub fn get_status_string(&self) -> String {
        let state = self.state();
        let file_name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&state.file_path, state.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }

    pub fn log(&self, line: &str) {
        self.log_at(Local::now(), line);
    }

    fn log_at(&self, now: DateTime<Local>, line: &str) {
        let stamped = format_line(now, line);
        tracing::debug!(target: "parley::activity", "{line}");
        if self.echo {
            eprintln!("{stamped}");
        }

        let state = self.state();
        if !state.is_active {
            return;
        }
        if let Some(path) = &state.file_path {
            if let Err(err) = append_to_file(path, &stamped) {
                tracing::warn!("Failed to write activity log {}: {err}", path_display(path));
            }
        }
    }
}

impl LogSink for ActivityLog {
    fn write_line(&self, line: &str) {
        self.log(line);
    }
}

fn format_line(now: DateTime<Local>, line: &str) -> String {
    format!("[{}] {}", now.format("%H:%M:%S"), line)
}

fn append_to_file(path: &Path, stamped: &str) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for line in stamped.lines() {
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

fn test_file_access(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.flush()
}
