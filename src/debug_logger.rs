// Debug logging module for per-turn decision logging
//
// Appends one JSONL entry per move decision so games can be inspected after
// the fact. Writes happen on a blocking task, fire-and-forget, so the
// request path never waits on disk.

use log::error;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;

use crate::types::Board;

/// A single decision log entry
#[derive(Debug, Serialize)]
struct DebugLogEntry<'a> {
    turn: i32,
    chosen_move: &'a str,
    board: &'a Board,
    timestamp: String,
}

/// Shared handle to the decision log file. Cloning shares the file.
#[derive(Clone)]
pub struct DebugLogger {
    file: Option<Arc<Mutex<File>>>,
}

impl DebugLogger {
    /// Creates a logger writing to `log_file_path` (truncated on startup).
    /// A disabled logger, or one whose file cannot be created, is a no-op.
    pub fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Some(Arc::new(Mutex::new(file))),
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger { file: None }
    }

    /// Logs a move decision asynchronously (fire-and-forget). The entry is
    /// serialized up front; only the file write leaves the caller's turn.
    pub fn log_move(&self, turn: i32, board: &Board, chosen_move: &str) {
        let Some(file) = &self.file else {
            return;
        };

        let entry = DebugLogEntry {
            turn,
            chosen_move,
            board,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let line = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize debug log entry: {}", e);
                return;
            }
        };

        let file = Arc::clone(file);
        tokio::task::spawn_blocking(move || {
            let mut guard = file.lock();
            if let Err(e) = writeln!(guard, "{}", line).and_then(|_| guard.flush()) {
                error!("Failed to write debug log entry: {}", e);
            }
        });
    }
}
