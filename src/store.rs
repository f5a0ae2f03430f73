use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::warn;

use crate::transcript::Transcript;

/// Storage key for the conversation snapshot.
pub const TRANSCRIPT_KEY: &str = "mortgage_chat";

/// Key-value storage of string blobs.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// File-backed storage: one file per key under a base directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn in_user_data_dir() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("could not determine data directory"))?
            .join("loanchat");
        Ok(Self::new(dir))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Mediates between the transcript and its key-value snapshot. All storage
/// failures stay here: callers always get a usable transcript back.
pub struct TranscriptStore<S: Storage> {
    storage: S,
}

impl<S: Storage> TranscriptStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Loads the stored conversation. A missing or unreadable snapshot falls
    /// back to the single welcome message.
    pub fn load(&self) -> Transcript {
        match self.storage.get(TRANSCRIPT_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(%err, "stored transcript unreadable, starting fresh");
                Transcript::welcome()
            }),
            None => Transcript::welcome(),
        }
    }

    /// Overwrites the snapshot. Called after every transcript mutation.
    pub fn persist(&mut self, transcript: &Transcript) {
        let raw = match serde_json::to_string(transcript) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "could not serialize transcript");
                return;
            }
        };
        if let Err(err) = self.storage.set(TRANSCRIPT_KEY, &raw) {
            warn!(%err, "could not persist transcript");
        }
    }

    /// Clears the snapshot and hands back a fresh conversation.
    pub fn reset(&mut self) -> Transcript {
        if let Err(err) = self.storage.remove(TRANSCRIPT_KEY) {
            warn!(%err, "could not clear stored transcript");
        }
        Transcript::welcome()
    }
}
