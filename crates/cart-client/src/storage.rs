//! Local storage for the anonymous cart.
//!
//! Mirrors browser local storage: synchronous, owned by one client, and
//! "missing" simply means "empty".

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use lashaz_core::CartLineItem;

use crate::error::ClientError;

/// Synchronous key-value style storage for the anonymous cart lines.
pub trait LocalCartStorage: Send + Sync {
    /// Read stored lines. A store that was never written is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or decoded.
    fn load(&self) -> Result<Vec<CartLineItem>, ClientError>;

    /// Replace the stored lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the lines cannot be written.
    fn save(&self, items: &[CartLineItem]) -> Result<(), ClientError>;

    /// Drop the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be removed.
    fn clear(&self) -> Result<(), ClientError>;
}

/// Cart lines stored as a JSON array in one file.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    /// Store the cart at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LocalCartStorage for FileCartStorage {
    fn load(&self) -> Result<Vec<CartLineItem>, ClientError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, items: &[CartLineItem]) -> Result<(), ClientError> {
        let json = serde_json::to_vec(items)?;

        // Write then rename so a crash never leaves a half-written cart
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&temp, &self.path)?;

        tracing::trace!(path = %self.path.display(), lines = items.len(), "Local cart saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cart lines held in memory.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    items: Mutex<Vec<CartLineItem>>,
    fail_writes: AtomicBool,
}

impl MemoryCartStorage {
    /// Start with the given lines.
    #[must_use]
    pub fn with_items(items: Vec<CartLineItem>) -> Self {
        Self {
            items: Mutex::new(items),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent `save` and `clear` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), ClientError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::Storage(std::io::Error::other(
                "local storage is read-only",
            )));
        }
        Ok(())
    }

    fn items(&self) -> std::sync::MutexGuard<'_, Vec<CartLineItem>> {
        // Lines are replaced wholesale, so a poisoned lock still holds a whole cart
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl LocalCartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Vec<CartLineItem>, ClientError> {
        Ok(self.items().clone())
    }

    fn save(&self, items: &[CartLineItem]) -> Result<(), ClientError> {
        self.check_writable()?;
        *self.items() = items.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.check_writable()?;
        self.items().clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lashaz_core::{ProductId, Quantity};

    use super::*;

    fn line(quantity: i64) -> CartLineItem {
        let mut line = CartLineItem::bare(ProductId::generate(), Quantity::new(quantity).unwrap());
        line.display_name = "Lash Glue".to_string();
        line
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileCartStorage::new(dir.path().join("cart.json"));
        assert!(storage.load().unwrap().is_empty());
        storage.clear().unwrap();
    }

    #[test]
    fn test_file_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileCartStorage::new(dir.path().join("cart.json"));
        let items = vec![line(2), line(1)];

        storage.save(&items).unwrap();
        assert_eq!(storage.load().unwrap(), items);
        assert!(!storage.temp_path().exists());

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        fs::write(&path, b"{not json").unwrap();

        let err = FileCartStorage::new(path).load().unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }

    #[test]
    fn test_memory_write_failure() {
        let storage = MemoryCartStorage::with_items(vec![line(1)]);
        storage.set_fail_writes(true);

        assert!(storage.save(&[]).is_err());
        assert!(storage.clear().is_err());
        assert_eq!(storage.load().unwrap().len(), 1);
    }
}
