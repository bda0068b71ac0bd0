//! Storage contract and built-in backends for the single sealed token blob.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Logical storage key the sealed token blob lives under.
pub const STORAGE_KEY: &str = "secure_tokens";

/// Boxed future returned by [`EncryptedStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for one opaque ciphertext blob.
///
/// Implementations know nothing about token structure. `save` must replace the previous
/// blob atomically: on failure the old blob stays readable.
pub trait EncryptedStore
where
	Self: Send + Sync,
{
	/// Persists `blob`, replacing any previous value.
	fn save<'a>(&'a self, blob: &'a [u8]) -> StoreFuture<'a, ()>;

	/// Loads the current blob, if present.
	fn load(&self) -> StoreFuture<'_, Option<Vec<u8>>>;

	/// Removes the current blob; clearing an empty store succeeds.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`EncryptedStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Stored bytes could not be decoded by the backend (e.g. invalid base64 text).
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure (quota, permissions, I/O).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Returns `true` when the stored value exists but is unreadable, i.e. corrupted.
	pub fn is_corruption(&self) -> bool {
		matches!(self, Self::Serialization { .. })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "quota exceeded".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("quota exceeded"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn only_serialization_failures_count_as_corruption() {
		assert!(StoreError::Serialization { message: "bad base64".into() }.is_corruption());
		assert!(!StoreError::Backend { message: "permission denied".into() }.is_corruption());
	}
}
