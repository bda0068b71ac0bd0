//! Authenticated encryption for opaque payloads.
//!
//! [`CryptoProvider`] is the async seam: hardware-backed keystores can implement it
//! directly, while [`AesGcmCrypto`] covers the in-process case with AES-256-GCM. Sealed
//! payloads are laid out as `nonce || ciphertext || tag`, with a fresh 96-bit nonce drawn
//! for every call.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
// self
use crate::_prelude::*;

/// Boxed future returned by [`CryptoProvider`] operations.
pub type CryptoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CryptoError>> + 'a + Send>>;

/// Length of the AES-GCM authentication tag appended to each payload.
pub const TAG_LEN: usize = 16;
/// Length of the symmetric key in bytes.
pub const KEY_LEN: usize = 32;

/// Authenticated symmetric encryption of opaque byte payloads.
pub trait CryptoProvider
where
	Self: Send + Sync,
{
	/// Seals `plaintext`, returning the nonce-prefixed ciphertext.
	fn encrypt<'a>(&'a self, plaintext: &'a [u8]) -> CryptoFuture<'a, Vec<u8>>;

	/// Opens a payload produced by [`CryptoProvider::encrypt`].
	///
	/// Fails with [`CryptoError::Decryption`] when the payload is truncated or the
	/// authentication tag does not verify (tampering or a different key).
	fn decrypt<'a>(&'a self, ciphertext: &'a [u8]) -> CryptoFuture<'a, Vec<u8>>;
}

/// Cryptographic failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CryptoError {
	/// Key material has the wrong shape.
	#[error("Invalid encryption key: {reason}.")]
	InvalidKey {
		/// What was wrong with the key.
		reason: String,
	},
	/// Sealing failed.
	#[error("Failed to encrypt token data")]
	Encryption,
	/// Opening failed.
	#[error("Failed to decrypt token data: {reason}")]
	Decryption {
		/// Short description of the failure.
		reason: &'static str,
	},
}

/// In-memory symmetric key; never persisted or printed by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct CryptoKey([u8; KEY_LEN]);
impl CryptoKey {
	/// Draws a fresh random key.
	pub fn generate() -> Self {
		let mut bytes = [0; KEY_LEN];

		rand::rng().fill_bytes(&mut bytes);

		Self(bytes)
	}

	/// Wraps raw key bytes supplied by a keystore.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
		let bytes = <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| CryptoError::InvalidKey {
			reason: format!("expected {KEY_LEN} bytes, got {}", bytes.len()),
		})?;

		Ok(Self(bytes))
	}

	/// Decodes a standard base64 key, as commonly handed out by platform keystores.
	pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
		let bytes = STANDARD
			.decode(encoded.trim())
			.map_err(|e| CryptoError::InvalidKey { reason: format!("not valid base64: {e}") })?;

		Self::from_bytes(&bytes)
	}
}
impl Debug for CryptoKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CryptoKey").field(&"<redacted>").finish()
	}
}

/// AES-256-GCM provider backed by `ring`.
pub struct AesGcmCrypto {
	key: LessSafeKey,
}
impl AesGcmCrypto {
	/// Builds a provider around the injected key.
	pub fn new(key: &CryptoKey) -> Result<Self, CryptoError> {
		let unbound = UnboundKey::new(&AES_256_GCM, &key.0)
			.map_err(|_| CryptoError::InvalidKey { reason: "rejected by AES-256-GCM".into() })?;

		Ok(Self { key: LessSafeKey::new(unbound) })
	}

	fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
		let mut nonce = [0; NONCE_LEN];

		rand::rng().fill_bytes(&mut nonce);

		let mut in_out = plaintext.to_vec();

		self.key
			.seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
			.map_err(|_| CryptoError::Encryption)?;

		let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());

		sealed.extend_from_slice(&nonce);
		sealed.extend_from_slice(&in_out);

		Ok(sealed)
	}

	fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
		if sealed.len() < NONCE_LEN + TAG_LEN {
			return Err(CryptoError::Decryption { reason: "payload is truncated" });
		}

		let (nonce, body) = sealed.split_at(NONCE_LEN);
		let nonce = Nonce::try_assume_unique_for_key(nonce)
			.map_err(|_| CryptoError::Decryption { reason: "nonce is malformed" })?;
		let mut in_out = body.to_vec();
		let plaintext = self
			.key
			.open_in_place(nonce, Aad::empty(), &mut in_out)
			.map_err(|_| CryptoError::Decryption { reason: "authentication tag mismatch" })?;

		Ok(plaintext.to_vec())
	}
}
impl CryptoProvider for AesGcmCrypto {
	fn encrypt<'a>(&'a self, plaintext: &'a [u8]) -> CryptoFuture<'a, Vec<u8>> {
		Box::pin(async move { self.seal(plaintext) })
	}

	fn decrypt<'a>(&'a self, ciphertext: &'a [u8]) -> CryptoFuture<'a, Vec<u8>> {
		Box::pin(async move { self.open(ciphertext) })
	}
}
impl Debug for AesGcmCrypto {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AesGcmCrypto").field("algorithm", &"AES-256-GCM").finish_non_exhaustive()
	}
}
