use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use collector_logging::collector_warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

use collector_core::{BatchInfo, BatchSource, Entry};

use crate::refine::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const KEY_COLLECTION: &str = "markdownData";
pub const KEY_ENABLE_CLEANUP: &str = "enableCleanup";
pub const KEY_ENABLE_LLM: &str = "enableLLM";
pub const KEY_API_KEY: &str = "apiKey";
pub const KEY_MODEL: &str = "model";
pub const KEY_BASE_URL: &str = "baseUrl";
pub const KEY_ENABLE_MULTITAB: &str = "enableMultitab";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store directory missing or not writable: {0}")]
    DataDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt value for key {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Durable key-value persistence. Values are whole JSON documents; a save
/// always rewrites the key's full value.
pub trait Store: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn save(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// One `<key>.json` file per store key, written atomically by writing a temp
/// file in the same directory and renaming it over the target.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if self.dir.exists() {
            let meta = fs::metadata(&self.dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
            if !meta.is_dir() {
                return Err(StoreError::DataDir("path is not a directory".into()));
            }
        } else {
            fs::create_dir_all(&self.dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
        }
        Ok(())
    }
}

impl Store for FileStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = serde_json::from_str(&content).map_err(|err| StoreError::Corrupt {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let target = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, value).map_err(io::Error::from)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

/// Persisted shape of one entry; the on-disk layout keeps the original
/// camelCase key names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedEntry {
    url: String,
    title: String,
    markdown: String,
    saved_at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_batch_processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_info: Option<PersistedBatchInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedBatchInfo {
    prompt: String,
    sources: Vec<PersistedBatchSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedBatchSource {
    url: String,
    title: String,
}

impl From<&Entry> for PersistedEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            url: entry.url.clone(),
            title: entry.title.clone(),
            markdown: entry.markdown.clone(),
            saved_at: entry.saved_at.clone(),
            is_batch_processed: entry.batch.is_some(),
            batch_info: entry.batch.as_ref().map(|batch| PersistedBatchInfo {
                prompt: batch.prompt.clone(),
                sources: batch
                    .sources
                    .iter()
                    .map(|s| PersistedBatchSource {
                        url: s.url.clone(),
                        title: s.title.clone(),
                    })
                    .collect(),
            }),
        }
    }
}

impl From<PersistedEntry> for Entry {
    fn from(persisted: PersistedEntry) -> Self {
        let batch = match (persisted.is_batch_processed, persisted.batch_info) {
            (true, Some(info)) => Some(BatchInfo {
                prompt: info.prompt,
                sources: info
                    .sources
                    .into_iter()
                    .map(|s| BatchSource {
                        url: s.url,
                        title: s.title,
                    })
                    .collect(),
            }),
            _ => None,
        };
        Entry {
            url: persisted.url,
            title: persisted.title,
            markdown: persisted.markdown,
            saved_at: persisted.saved_at,
            batch,
        }
    }
}

/// Load the whole collection. `Ok(None)` means the key has never been
/// written, which the caller treats as "seed with example data".
pub fn load_collection(store: &dyn Store) -> Result<Option<Vec<Entry>>, StoreError> {
    let Some(value) = store.load(KEY_COLLECTION)? else {
        return Ok(None);
    };
    let persisted: Vec<PersistedEntry> =
        serde_json::from_value(value).map_err(|err| StoreError::Corrupt {
            key: KEY_COLLECTION.to_string(),
            message: err.to_string(),
        })?;
    Ok(Some(persisted.into_iter().map(Entry::from).collect()))
}

/// Rewrite the whole collection under its single key.
pub fn save_collection(store: &dyn Store, entries: &[Entry]) -> Result<(), StoreError> {
    let persisted: Vec<PersistedEntry> = entries.iter().map(PersistedEntry::from).collect();
    let value = serde_json::to_value(persisted).map_err(io::Error::from)?;
    store.save(KEY_COLLECTION, &value)
}

/// User settings as stored under their individual keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enable_cleanup: bool,
    pub enable_llm: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub enable_multitab: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_cleanup: false,
            enable_llm: false,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            enable_multitab: false,
        }
    }
}

/// Load settings leniently: a missing or malformed key falls back to its
/// default with a warning rather than failing startup.
pub fn load_settings(store: &dyn Store) -> Settings {
    let defaults = Settings::default();
    Settings {
        enable_cleanup: load_bool(store, KEY_ENABLE_CLEANUP, defaults.enable_cleanup),
        enable_llm: load_bool(store, KEY_ENABLE_LLM, defaults.enable_llm),
        api_key: load_string(store, KEY_API_KEY, None),
        model: load_string(store, KEY_MODEL, None).unwrap_or(defaults.model),
        base_url: load_string(store, KEY_BASE_URL, None).unwrap_or(defaults.base_url),
        enable_multitab: load_bool(store, KEY_ENABLE_MULTITAB, defaults.enable_multitab),
    }
}

pub fn save_settings(store: &dyn Store, settings: &Settings) -> Result<(), StoreError> {
    store.save(KEY_ENABLE_CLEANUP, &Value::Bool(settings.enable_cleanup))?;
    store.save(KEY_ENABLE_LLM, &Value::Bool(settings.enable_llm))?;
    match &settings.api_key {
        Some(api_key) => store.save(KEY_API_KEY, &Value::String(api_key.clone()))?,
        None => store.save(KEY_API_KEY, &Value::Null)?,
    }
    store.save(KEY_MODEL, &Value::String(settings.model.clone()))?;
    store.save(KEY_BASE_URL, &Value::String(settings.base_url.clone()))?;
    store.save(KEY_ENABLE_MULTITAB, &Value::Bool(settings.enable_multitab))
}

fn load_bool(store: &dyn Store, key: &str, default: bool) -> bool {
    match store.load(key) {
        Ok(Some(Value::Bool(value))) => value,
        Ok(Some(other)) => {
            collector_warn!("ignoring non-boolean value for {key}: {other}");
            default
        }
        Ok(None) => default,
        Err(err) => {
            collector_warn!("failed to load {key}: {err}");
            default
        }
    }
}

fn load_string(store: &dyn Store, key: &str, default: Option<String>) -> Option<String> {
    match store.load(key) {
        Ok(Some(Value::String(value))) if !value.is_empty() => Some(value),
        Ok(Some(Value::Null)) | Ok(None) | Ok(Some(Value::String(_))) => default,
        Ok(Some(other)) => {
            collector_warn!("ignoring non-string value for {key}: {other}");
            default
        }
        Err(err) => {
            collector_warn!("failed to load {key}: {err}");
            default
        }
    }
}
