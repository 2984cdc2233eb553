//! File-backed `KvStore`: one flat TOML table, rewritten atomically on
//! every save.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lift_traits::{BoxError, KvStore};
use toml::{Table, Value};

use crate::error::{HwError, Result};

/// Write to `<path>.new`, sync, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    table: Mutex<Table>,
}

impl FileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(s) => s
                .parse::<Table>()
                .map_err(|e| HwError::Store(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Table::new(),
            Err(e) => return Err(HwError::Io(e)),
        };
        tracing::debug!(path = %path.display(), keys = table.len(), "store opened");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored keys in file order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut table = self.lock();
        table.insert(key.to_string(), value);
        let text = toml::to_string(&*table).map_err(|e| HwError::Store(e.to_string()))?;
        write_atomic(&self.path, text.as_bytes())?;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }
}

fn mismatch(key: &str, want: &str) -> BoxError {
    Box::new(HwError::Store(format!("{key} is not {want}")))
}

impl KvStore for FileStore {
    fn save_float(&self, key: &str, value: f32) -> std::result::Result<(), BoxError> {
        Ok(self.put(key, Value::Float(f64::from(value)))?)
    }

    fn load_float(&self, key: &str) -> std::result::Result<Option<f32>, BoxError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Float(f)) => Ok(Some(f as f32)),
            Some(Value::Integer(i)) => Ok(Some(i as f32)),
            Some(_) => Err(mismatch(key, "a float")),
        }
    }

    fn save_int(&self, key: &str, value: i32) -> std::result::Result<(), BoxError> {
        Ok(self.put(key, Value::Integer(i64::from(value)))?)
    }

    fn load_int(&self, key: &str) -> std::result::Result<Option<i32>, BoxError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Integer(i)) => i32::try_from(i)
                .map(Some)
                .map_err(|_| mismatch(key, "a 32-bit integer")),
            Some(_) => Err(mismatch(key, "an integer")),
        }
    }

    fn save_string(&self, key: &str, value: &str) -> std::result::Result<(), BoxError> {
        Ok(self.put(key, Value::String(value.to_string()))?)
    }

    fn load_string(&self, key: &str) -> std::result::Result<Option<String>, BoxError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(mismatch(key, "a string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lift.toml");
        {
            let s = FileStore::open(&path).unwrap();
            s.save_float("limit_bottom", 4.25).unwrap();
            s.save_int("theme", 2).unwrap();
            s.save_string("device_name", "desk").unwrap();
        }
        let s = FileStore::open(&path).unwrap();
        assert_eq!(s.load_float("limit_bottom").unwrap(), Some(4.25));
        assert_eq!(s.load_int("theme").unwrap(), Some(2));
        assert_eq!(s.load_string("device_name").unwrap().as_deref(), Some("desk"));
        assert_eq!(s.load_int("preset1").unwrap(), None);
        assert!(!path.with_extension("new").exists());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = FileStore::open(dir.path().join("lift.toml")).unwrap();
        s.save_string("theme", "dark").unwrap();
        let err = s.load_int("theme").unwrap_err();
        assert!(err.downcast_ref::<HwError>().is_some());
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lift.toml");
        fs::write(&path, "limit_bottom = [").unwrap();
        assert!(matches!(FileStore::open(&path), Err(HwError::Store(_))));
    }
}
