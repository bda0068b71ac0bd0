//! Thread-safe in-memory [`EncryptedStore`] for tests and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	store::{EncryptedStore, STORAGE_KEY, StoreError, StoreFuture},
};

type SlotMap = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// Keeps sealed blobs in-process; clones share the same slots.
#[derive(Clone, Debug)]
pub struct MemoryStore {
	key: String,
	slots: SlotMap,
}
impl MemoryStore {
	/// Creates a store that reads and writes under `key`.
	pub fn with_key(key: impl Into<String>) -> Self {
		Self { key: key.into(), slots: Default::default() }
	}

	/// Returns a handle bound to `key` that shares this store's slots.
	pub fn scoped(&self, key: impl Into<String>) -> Self {
		Self { key: key.into(), slots: self.slots.clone() }
	}

	/// Storage key this handle is bound to.
	pub fn key(&self) -> &str {
		&self.key
	}

	fn save_now(&self, blob: &[u8]) -> Result<(), StoreError> {
		self.slots.write().insert(self.key.clone(), blob.to_vec());

		Ok(())
	}

	fn load_now(&self) -> Option<Vec<u8>> {
		self.slots.read().get(&self.key).cloned()
	}

	fn clear_now(&self) {
		self.slots.write().remove(&self.key);
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::with_key(STORAGE_KEY)
	}
}
impl EncryptedStore for MemoryStore {
	fn save<'a>(&'a self, blob: &'a [u8]) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.save_now(blob) })
	}

	fn load(&self) -> StoreFuture<'_, Option<Vec<u8>>> {
		Box::pin(async move { Ok(self.load_now()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.clear_now();

			Ok(())
		})
	}
}
