//! Settings store selection: a TOML file when `--store` is given, memory otherwise.
use std::path::Path;
use std::sync::Arc;

use lift_core::LiftError;
use lift_core::mocks::MemoryStore;
use lift_hardware::FileStore;
use lift_traits::KvStore;

#[derive(Debug, Clone)]
pub enum StoreHandle {
    Memory(Arc<MemoryStore>),
    File(Arc<FileStore>),
}

impl StoreHandle {
    pub fn open(path: Option<&Path>) -> eyre::Result<Self> {
        match path {
            None => Ok(Self::Memory(Arc::new(MemoryStore::new()))),
            Some(p) => {
                let store = FileStore::open(p).map_err(|e| LiftError::Storage(e.to_string()))?;
                Ok(Self::File(Arc::new(store)))
            }
        }
    }

    pub fn kv(&self) -> Arc<dyn KvStore> {
        let kv: Arc<dyn KvStore> = match self {
            Self::Memory(m) => m.clone(),
            Self::File(f) => f.clone(),
        };
        kv
    }

    /// `"memory"` or the file path.
    pub fn describe(&self) -> String {
        match self {
            Self::Memory(_) => "memory".to_string(),
            Self::File(f) => f.path().display().to_string(),
        }
    }

    /// Keys currently persisted; always empty for the in-memory store.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::Memory(_) => Vec::new(),
            Self::File(f) => f.keys(),
        }
    }
}
