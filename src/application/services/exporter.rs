use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::errors::ExportError;
use crate::domain::entities::{format_timestamp, parse_timestamp, Message};
use crate::domain::traits::MessageStore;

/// Attachment name for every export
pub const EXPORT_FILENAME: &str = "messages.csv";

/// Fixed column order
pub const EXPORT_HEADER: [&str; 4] = ["id", "sender", "text", "timestamp"];

/// A finished snapshot on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    pub filename: String,
    pub rows: usize,
}

/// Renders the whole message log to CSV
pub struct Exporter {
    store: Arc<dyn MessageStore>,
    path: PathBuf,
}

impl Exporter {
    pub fn new(store: Arc<dyn MessageStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a full snapshot, replacing any previous one.
    ///
    /// Messages appended while the snapshot is being taken may or may not be
    /// included.
    pub async fn snapshot(&self) -> Result<ExportFile, ExportError> {
        let messages = self.store.all().await?;
        let rows = messages.len();

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &messages))
            .await
            .map_err(|e| ExportError::Worker(e.to_string()))??;

        tracing::info!(rows, path = %self.path.display(), "Export written");

        Ok(ExportFile {
            path: self.path.clone(),
            filename: EXPORT_FILENAME.to_string(),
            rows,
        })
    }
}

/// Write `messages` as CSV to `path` atomically.
///
/// Rows go to a temporary file next to `path`, which is then renamed over
/// it, so readers see either the old snapshot or the complete new one.
pub fn write_snapshot(path: &Path, messages: &[Message]) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer.write_record(EXPORT_HEADER)?;
        for message in messages {
            writer.write_record([
                message.id.to_string(),
                message.sender.clone(),
                message.text.clone(),
                format_timestamp(&message.timestamp),
            ])?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    Ok(())
}

/// Parse a snapshot back into messages
pub fn read_snapshot(path: &Path) -> Result<Vec<Message>, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?;
    if headers.iter().ne(EXPORT_HEADER) {
        return Err(ExportError::InvalidRow(format!("unexpected header: {:?}", headers)));
    }

    let mut messages = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != EXPORT_HEADER.len() {
            return Err(ExportError::InvalidRow(format!("expected 4 fields, got {}", record.len())));
        }

        let id = record[0]
            .parse::<i64>()
            .map_err(|e| ExportError::InvalidRow(format!("id {:?}: {}", &record[0], e)))?;
        let timestamp = parse_timestamp(&record[3])
            .map_err(|e| ExportError::InvalidRow(format!("timestamp {:?}: {}", &record[3], e)))?;

        messages.push(Message::new(id, &record[1], &record[2], timestamp));
    }

    Ok(messages)
}
