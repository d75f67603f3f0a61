use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::warn;

use crate::error::StoreError;

/// Key the engine stores its high score under.
pub const HIGH_SCORE_KEY: &str = "highScore";

/// Integer key-value persistence.
pub trait HighScoreStore {
    fn get(&self, key: &str) -> Result<Option<u32>, StoreError>;
    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: u32) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value);
        store
    }
}

impl HighScoreStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.values.get(key).copied())
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Plain-text store of `key=value` lines. A missing file reads as empty.
/// A lone integer line is read as the high score.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, u32>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut values = BTreeMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').unwrap_or((HIGH_SCORE_KEY, line));
            let value = value
                .trim()
                .parse()
                .map_err(|_| StoreError::Parse { line: index + 1 })?;
            values.insert(key.trim().to_string(), value);
        }
        Ok(values)
    }
}

impl HighScoreStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.load()?.get(key).copied())
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        let mut values = match self.load() {
            Ok(values) => values,
            Err(StoreError::Parse { line }) => {
                warn!("Overwriting {} (unreadable line {})", self.path.display(), line);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value);
        let text: String = values
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect();
        fs::write(&self.path, text)?;
        Ok(())
    }
}
