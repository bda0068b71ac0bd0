//! Bearer credential strings that never print themselves.

// crates.io
use serde::{Deserializer, Serializer};
// self
use crate::_prelude::*;

/// Access or refresh token value.
///
/// Clones share one allocation, which keeps fan-out to coalesced refresh waiters cheap.
/// `Debug` and `Display` are redacted and equality runs in constant time for equal lengths.
#[derive(Clone)]
pub struct TokenSecret(Arc<str>);
impl TokenSecret {
	/// Wraps a token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Arc::from(value.into()))
	}

	/// Returns the raw value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` for an empty value.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Renders the value as an `Authorization` header credential.
	pub fn to_bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl PartialEq for TokenSecret {
	fn eq(&self, other: &Self) -> bool {
		let (lhs, rhs) = (self.0.as_bytes(), other.0.as_bytes());

		lhs.len() == rhs.len() && lhs.iter().zip(rhs).fold(0, |acc, (l, r)| acc | (l ^ r)) == 0
	}
}
impl Eq for TokenSecret {}
impl Serialize for TokenSecret {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.0)
	}
}
impl<'de> Deserialize<'de> for TokenSecret {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(Self::new)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<redacted; {} bytes>)", self.0.len())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
