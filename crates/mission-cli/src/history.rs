//! Chat history persisted as JSONL

use async_trait::async_trait;
use mission_ai::Message;
use mission_core::{Error, HistoryStore, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// History entry types for JSONL format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// File header
    Metadata { id: String, created_at: i64 },
    /// A message in the conversation
    Message { message: Message, timestamp: i64 },
}

struct Inner {
    id: String,
    messages: Vec<Message>,
    writer: BufWriter<File>,
}

/// Append-only history file.
///
/// Every message is kept in memory as well, so reads never touch the disk.
pub struct JsonlHistory {
    path: PathBuf,
    inner: Mutex<Inner>,
}

fn io_error(e: impl std::fmt::Display) -> Error {
    Error::History(e.to_string())
}

fn write_entry(writer: &mut BufWriter<File>, entry: &HistoryEntry) -> std::io::Result<()> {
    writeln!(writer, "{}", serde_json::to_string(entry)?)?;
    writer.flush()
}

fn create_file(path: &Path) -> std::io::Result<(String, BufWriter<File>)> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let id = uuid::Uuid::new_v4().to_string();
    let mut writer = BufWriter::new(File::create(path)?);
    let metadata = HistoryEntry::Metadata {
        id: id.clone(),
        created_at: chrono::Utc::now().timestamp_millis(),
    };
    write_entry(&mut writer, &metadata)?;
    Ok((id, writer))
}

impl JsonlHistory {
    /// Default history file location
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mission-control")
            .join("history.jsonl")
    }

    /// Open a history file, creating it if missing.
    ///
    /// Lines that fail to parse are skipped.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();

        if !path.exists() {
            let (id, writer) = create_file(&path)?;
            return Ok(Self {
                path,
                inner: Mutex::new(Inner {
                    id,
                    messages: Vec::new(),
                    writer,
                }),
            });
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut id = String::new();
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(HistoryEntry::Metadata { id: file_id, .. }) => id = file_id,
                Ok(HistoryEntry::Message { message, .. }) => messages.push(message),
                Err(e) => tracing::warn!("Skipping unreadable history line: {}", e),
            }
        }

        let writer = BufWriter::new(File::options().append(true).open(&path)?);
        tracing::debug!(
            "Loaded {} messages from {}",
            messages.len(),
            path.display()
        );

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                id,
                messages,
                writer,
            }),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Id from the file header, empty if the header was missing
    pub fn id(&self) -> String {
        self.inner.lock().id.clone()
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.inner.lock().messages.is_empty()
    }

    /// Start over with an empty file
    pub fn reset(&self) -> Result<()> {
        // Hold the lock across the truncate so no append lands in between
        let mut inner = self.inner.lock();
        let (id, writer) = create_file(&self.path).map_err(io_error)?;
        inner.id = id;
        inner.messages.clear();
        inner.writer = writer;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonlHistory {
    async fn recent(&self, limit: usize) -> Result<Vec<Message>> {
        let inner = self.inner.lock();
        let start = inner.messages.len().saturating_sub(limit);
        Ok(inner.messages[start..].to_vec())
    }

    async fn append(&self, message: Message) -> Result<()> {
        let mut inner = self.inner.lock();
        let entry = HistoryEntry::Message {
            message: message.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        write_entry(&mut inner.writer, &entry).map_err(io_error)?;
        inner.messages.push(message);
        Ok(())
    }
}
