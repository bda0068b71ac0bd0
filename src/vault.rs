//! Sealing and opening of the current token record.
//!
//! The vault is the only place that knows a stored blob is an encrypted JSON
//! [`TokenRecord`]. Anything that cannot be turned back into a record is treated as
//! corruption: the blob is dropped and callers see an empty session.
//!
//! Writes are serialized behind an epoch that every login and logout advances. A refresh
//! remembers the epoch it started from and only persists when no login or logout happened
//! in between, so a logout is never undone by a late refresh.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	crypto::{CryptoError, CryptoProvider},
	obs::{self, OpKind},
	store::{EncryptedStore, StoreError},
	telemetry::{TelemetryEvent, TelemetrySink},
};

pub(crate) struct Vault {
	crypto: Arc<dyn CryptoProvider>,
	store: Arc<dyn EncryptedStore>,
	telemetry: Arc<dyn TelemetrySink>,
	epoch: AsyncMutex<u64>,
}
impl Vault {
	pub(crate) fn new(
		crypto: Arc<dyn CryptoProvider>,
		store: Arc<dyn EncryptedStore>,
		telemetry: Arc<dyn TelemetrySink>,
	) -> Self {
		Self { crypto, store, telemetry, epoch: AsyncMutex::new(0) }
	}

	/// Current session epoch.
	pub(crate) async fn epoch(&self) -> u64 {
		*self.epoch.lock().await
	}

	/// Persists `record` as a new session, replacing the current blob.
	pub(crate) async fn seal<E>(&self, record: &TokenRecord) -> Result<(), E>
	where
		E: From<CryptoError> + From<StoreError>,
	{
		let mut epoch = self.epoch.lock().await;

		self.write::<E>(record).await?;
		*epoch = epoch.wrapping_add(1);

		Ok(())
	}

	/// Persists `record` only while the session is still at `expected`.
	///
	/// Returns `false` without writing when a login or logout happened since.
	pub(crate) async fn seal_if_current<E>(
		&self,
		record: &TokenRecord,
		expected: u64,
	) -> Result<bool, E>
	where
		E: From<CryptoError> + From<StoreError>,
	{
		let epoch = self.epoch.lock().await;

		if *epoch != expected {
			return Ok(false);
		}

		self.write::<E>(record).await?;

		Ok(true)
	}

	/// Returns the current record, or `None` when nothing usable is stored.
	///
	/// Corrupted blobs are cleared and reported; backend failures leave the store untouched.
	pub(crate) async fn open(&self) -> Option<TokenRecord> {
		let sealed = match self.store.load().await {
			Ok(Some(sealed)) => sealed,
			Ok(None) => return None,
			Err(e) if e.is_corruption() => {
				self.discard(e.to_string()).await;

				return None;
			},
			Err(e) => {
				obs::warn_recovered(
					OpKind::GetTokens,
					"Token store is unreadable; reporting no session.",
					&e,
				);

				return None;
			},
		};
		let plaintext = match self.crypto.decrypt(&sealed).await {
			Ok(plaintext) => plaintext,
			Err(e) => {
				self.discard(e.to_string()).await;

				return None;
			},
		};

		match serde_json::from_slice::<TokenRecord>(&plaintext) {
			Ok(record) => Some(record),
			Err(e) => {
				self.discard(format!("Decrypted token data is malformed: {e}")).await;

				None
			},
		}
	}

	/// Ends the session and removes the current blob.
	pub(crate) async fn clear(&self) -> Result<(), StoreError> {
		let mut epoch = self.epoch.lock().await;

		*epoch = epoch.wrapping_add(1);

		self.store.clear().await
	}

	pub(crate) fn track(&self, event: TelemetryEvent) {
		self.telemetry.track(&event);
	}

	async fn write<E>(&self, record: &TokenRecord) -> Result<(), E>
	where
		E: From<CryptoError> + From<StoreError>,
	{
		let plaintext = serde_json::to_vec(record).map_err(|_| CryptoError::Encryption)?;
		let sealed = self.crypto.encrypt(&plaintext).await?;

		self.store.save(&sealed).await?;

		Ok(())
	}

	async fn discard(&self, error: String) {
		obs::warn_recovered(OpKind::GetTokens, "Discarding corrupted token blob.", &error);

		if let Err(e) = self.store.clear().await {
			obs::warn_recovered(OpKind::GetTokens, "Failed to clear corrupted token blob.", &e);
		}

		self.track(TelemetryEvent::TokenDecryptionFailed { error });
	}
}
