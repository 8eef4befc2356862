//! Append-only JSONL event journal.
//!
//! An ordinary bus subscriber that writes one JSON line per published
//! event, tailable via `tail -f`. This is a debug log, not a store: the
//! core never reads it back.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use synthmob_types::CoreEvent;

use crate::bus::Subscriber;

#[derive(Serialize)]
struct SessionHeader {
    event: &'static str,
    epoch_ms: u128,
    pid: u32,
}

#[derive(Serialize)]
struct JournalEntry<'a> {
    t_ms: u128,
    event: &'a str,
    payload: &'a serde_json::Value,
}

/// JSONL writer for the published event stream.
pub struct EventJournal {
    writer: Mutex<BufWriter<File>>,
    opened: Instant,
}

impl EventJournal {
    /// Open (append) the journal at `path`, writing a session header.
    /// Returns `None` if the file cannot be opened: journaling degrades
    /// to "off", never to an error.
    pub fn open(path: &Path) -> Option<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && std::fs::create_dir_all(parent).is_err() {
                return None;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path).ok()?;
        let mut writer = BufWriter::new(file);

        let header = SessionHeader {
            event: "session_start",
            epoch_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            pid: std::process::id(),
        };
        if let Ok(json) = serde_json::to_string(&header) {
            let _ = writeln!(writer, "{}", json);
            let _ = writer.flush();
        }

        Some(Self {
            writer: Mutex::new(writer),
            opened: Instant::now(),
        })
    }
}

impl Subscriber for EventJournal {
    fn deliver(&self, event: &CoreEvent) -> bool {
        let entry = JournalEntry {
            t_ms: self.opened.elapsed().as_millis(),
            event: &event.name,
            payload: &event.payload,
        };
        let Ok(json) = serde_json::to_string(&entry) else {
            return true;
        };
        let Ok(mut writer) = self.writer.lock() else {
            return false;
        };
        let _ = writeln!(writer, "{}", json);
        let _ = writer.flush();
        true
    }
}
