//! FileQueueClient - appends every accepted entry to a JSON-lines file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, error, instrument};

use contracts::{
    BatchEntry, BatchSendRequest, BatchSendResponse, ClientError, ContractError, QueueClient,
    QueueError,
};

/// Configuration for FileQueueClient
#[derive(Debug, Clone)]
pub struct FileClientConfig {
    /// Output file, created if missing and appended to otherwise
    pub path: PathBuf,
}

impl FileClientConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ContractError::client_setup("file", "missing 'path' param"))?;

        Ok(Self {
            path: PathBuf::from(path),
        })
    }
}

#[derive(Serialize)]
struct EntryRecord<'a> {
    sent_at: &'a str,
    queue_url: &'a str,
    #[serde(flatten)]
    entry: &'a BatchEntry,
}

/// Client that persists entries locally, one JSON object per line
pub struct FileQueueClient {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileQueueClient {
    /// Open (or create) the output file
    pub fn new(name: impl Into<String>, config: FileClientConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            file: Mutex::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileClientConfig::from_params(params)?;
        Ok(Self::new(name, config)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_entries(&self, request: &BatchSendRequest) -> std::io::Result<()> {
        let sent_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = BufWriter::new(&*file);
        for entry in &request.entries {
            let record = EntryRecord {
                sent_at: &sent_at,
                queue_url: &request.queue_url,
                entry,
            };
            serde_json::to_writer(&mut writer, &record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl QueueClient for FileQueueClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_client_send_batch",
        skip(self, request),
        fields(client = %self.name, entries = request.entries.len())
    )]
    async fn send_batch(&self, request: &BatchSendRequest) -> Result<BatchSendResponse, QueueError> {
        self.append_entries(request).map_err(|e| {
            error!(client = %self.name, path = %self.path.display(), error = %e, "Write failed");
            ClientError::Local(e.to_string())
        })?;

        debug!(client = %self.name, entries = request.entries.len(), "Entries appended");
        Ok(BatchSendResponse::accept_all(request))
    }
}
