//! Bounded chat transcript for the admin view, stored as one JSON array.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::resume_store::{read_json_file, write_json_file, StoreError};

/// Oldest entries are dropped past this many.
pub const MAX_CONVERSATIONS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub response: String,
    pub mode: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct ConversationLog {
    path: PathBuf,
    /// Appends are read-modify-write on a single file.
    write_lock: Arc<Mutex<()>>,
}

impl ConversationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries oldest first; empty when nothing has been logged yet.
    pub async fn load(&self) -> Result<Vec<ConversationEntry>, StoreError> {
        Ok(read_json_file(&self.path).await?.unwrap_or_default())
    }

    pub async fn append(&self, entry: ConversationEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.push(entry);
        if entries.len() > MAX_CONVERSATIONS {
            let excess = entries.len() - MAX_CONVERSATIONS;
            entries.drain(..excess);
        }
        write_json_file(&self.path, &entries).await
    }
}
