//! File-backed [`EncryptedStore`] that keeps the sealed blob as base64 text.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	store::{EncryptedStore, StoreError, StoreFuture},
};

/// Persists the sealed blob to a single file, replacing it atomically on every save.
///
/// Writes go to a sibling `.tmp` file which is synced and then renamed over the target,
/// so readers observe either the old blob or the new one.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Binds a store to `path`, creating parent directories as needed.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, write_lock: Default::default() })
	}

	/// Binds a store to `<dir>/<key>.tok`.
	pub fn in_dir(dir: impl AsRef<Path>, key: &str) -> Result<Self, StoreError> {
		Self::open(dir.as_ref().join(format!("{key}.tok")))
	}

	/// Path of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn tmp_path(&self) -> PathBuf {
		let mut tmp_path = self.path.clone().into_os_string();

		tmp_path.push(".tmp");

		tmp_path.into()
	}

	fn create_private(path: &Path) -> std::io::Result<File> {
		let mut options = OpenOptions::new();

		options.write(true).create(true).truncate(true);

		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;

			options.mode(0o600);
		}

		options.open(path)
	}

	fn persist(&self, blob: &[u8]) -> Result<(), StoreError> {
		let _guard = self.write_lock.lock();

		Self::ensure_parent_exists(&self.path)?;

		let encoded = STANDARD.encode(blob);
		let tmp_path = self.tmp_path();
		let written = Self::write_synced(&tmp_path, encoded.as_bytes())
			.and_then(|()| {
				fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
					message: format!("Failed to replace {}: {e}", self.path.display()),
				})
			});

		if written.is_err() {
			let _ = fs::remove_file(&tmp_path);
		}

		written
	}

	fn write_synced(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
		let mut file = Self::create_private(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", path.display()),
		})?;

		file.write_all(contents).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", path.display()),
		})
	}

	fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
		let text = match fs::read_to_string(&self.path) {
			Ok(text) => text,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) if e.kind() == ErrorKind::InvalidData =>
				return Err(StoreError::Serialization {
					message: format!("{} is not text: {e}", self.path.display()),
				}),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};
		let trimmed = text.trim();

		if trimmed.is_empty() {
			return Ok(None);
		}

		STANDARD.decode(trimmed).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to decode {}: {e}", self.path.display()),
		})
	}

	fn remove(&self) -> Result<(), StoreError> {
		let _guard = self.write_lock.lock();

		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
impl EncryptedStore for FileStore {
	fn save<'a>(&'a self, blob: &'a [u8]) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.persist(blob) })
	}

	fn load(&self) -> StoreFuture<'_, Option<Vec<u8>>> {
		Box::pin(async move { self.read() })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.remove() })
	}
}
