//! Immutable token record struct and its builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Reasons a [`TokenRecordBuilder`] cannot produce a record.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordBuilderError {
	/// `access_token` was never set.
	#[error("A token record needs an access token.")]
	MissingAccessToken,
	/// Neither `expires_at` nor `expires_in` was set.
	#[error("A token record needs an expiry instant or lifetime.")]
	MissingExpiry,
	/// `issued_at + expires_in` does not fit the clock.
	#[error("The token lifetime overflows the supported clock range.")]
	ExpiryOutOfRange,
}

/// Immutable credential bundle issued at login or by a refresh.
///
/// Fields are read through accessors; a refresh always produces a new record instead of
/// touching the old one. The `expires_at > issued_at` invariant is not enforced here, the
/// validator reports violations as malformed records.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	access_token: TokenSecret,
	refresh_token: Option<TokenSecret>,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
	user_id: Option<String>,
	scope: Option<String>,
}
impl TokenRecord {
	/// Starts an empty [`TokenRecordBuilder`].
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Bearer credential; never log the exposed value.
	pub fn access_token(&self) -> &TokenSecret {
		&self.access_token
	}

	/// Renewal credential, if one was issued.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}

	/// When the credential was issued.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// When the credential stops being accepted.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Opaque user identifier carried alongside the credential.
	pub fn user_id(&self) -> Option<&str> {
		self.user_id.as_deref()
	}

	/// Opaque scope string carried alongside the credential.
	pub fn scope(&self) -> Option<&str> {
		self.scope.as_deref()
	}

	/// A non-empty refresh token is present.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}

	/// `at` is on or past the expiry instant.
	pub fn is_expired_at(&self, at: OffsetDateTime) -> bool {
		at >= self.expires_at
	}

	/// Lifetime left at `at`, never negative.
	pub fn remaining_at(&self, at: OffsetDateTime) -> Duration {
		(self.expires_at - at).max(Duration::ZERO)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &self.access_token)
			.field("can_refresh", &self.can_refresh())
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("user_id", &self.user_id)
			.field("scope", &self.scope)
			.finish()
	}
}

#[derive(Clone, Copy, Debug)]
enum Expiry {
	At(OffsetDateTime),
	After(Duration),
}

/// Step-by-step constructor for [`TokenRecord`].
///
/// `issued_at` defaults to the current clock; the expiry is either absolute or relative to
/// `issued_at`, whichever was set last.
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expiry: Option<Expiry>,
	user_id: Option<String>,
	scope: Option<String>,
}
impl TokenRecordBuilder {
	/// Access token value.
	pub fn access_token(mut self, value: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(value));

		self
	}

	/// Refresh token value.
	pub fn refresh_token(mut self, value: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(value));

		self
	}

	/// Refresh token carried over from another record; `None` drops it.
	pub fn refresh_secret(mut self, secret: Option<TokenSecret>) -> Self {
		self.refresh_token = secret;

		self
	}

	/// Issue instant.
	pub fn issued_at(mut self, at: OffsetDateTime) -> Self {
		self.issued_at = Some(at);

		self
	}

	/// Stamps the issue instant with the current clock.
	pub fn issued_now(self) -> Self {
		self.issued_at(OffsetDateTime::now_utc())
	}

	/// Absolute expiry instant.
	pub fn expires_at(mut self, at: OffsetDateTime) -> Self {
		self.expiry = Some(Expiry::At(at));

		self
	}

	/// Lifetime counted from the issue instant.
	pub fn expires_in(mut self, lifetime: Duration) -> Self {
		self.expiry = Some(Expiry::After(lifetime));

		self
	}

	/// Opaque user identifier.
	pub fn user_id(mut self, user_id: Option<String>) -> Self {
		self.user_id = user_id;

		self
	}

	/// Opaque scope string.
	pub fn scope(mut self, scope: Option<String>) -> Self {
		self.scope = scope;

		self
	}

	/// Produces the record.
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let Some(access_token) = self.access_token else {
			return Err(TokenRecordBuilderError::MissingAccessToken);
		};
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match self.expiry.ok_or(TokenRecordBuilderError::MissingExpiry)? {
			Expiry::At(at) => at,
			Expiry::After(lifetime) =>
				issued_at.checked_add(lifetime).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?,
		};

		Ok(TokenRecord {
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			user_id: self.user_id,
			scope: self.scope,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn relative_expiry_counts_from_the_issue_instant() {
		let record = TokenRecord::builder()
			.access_token("access")
			.expires_in(Duration::minutes(30))
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.build()
			.expect("A relative expiry should resolve against issued_at.");

		assert_eq!(record.expires_at(), macros::datetime!(2025-01-01 00:30 UTC));
		assert!(!record.can_refresh());
	}

	#[test]
	fn builder_requires_access_token_and_expiry() {
		let err = TokenRecord::builder()
			.expires_in(Duration::minutes(5))
			.build()
			.expect_err("Builder should reject records without an access token.");

		assert_eq!(err, TokenRecordBuilderError::MissingAccessToken);

		let err = TokenRecord::builder()
			.access_token("a")
			.build()
			.expect_err("Builder should reject records without an expiry.");

		assert_eq!(err, TokenRecordBuilderError::MissingExpiry);

		let err = TokenRecord::builder()
			.access_token("a")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::MAX)
			.build()
			.expect_err("Builder should reject expiries beyond the clock range.");

		assert_eq!(err, TokenRecordBuilderError::ExpiryOutOfRange);
	}

	#[test]
	fn remaining_lifetime_clamps_at_zero() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let record = TokenRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(issued)
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed.");

		assert_eq!(record.remaining_at(macros::datetime!(2025-01-01 00:45 UTC)), Duration::minutes(15));
		assert_eq!(record.remaining_at(macros::datetime!(2025-01-01 02:00 UTC)), Duration::ZERO);
		assert!(record.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(record.can_refresh());
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let record = TokenRecord::builder()
			.access_token("very-secret-access")
			.refresh_token("very-secret-refresh")
			.user_id(Some("user-7".into()))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token record builder should succeed.");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(rendered.contains("user-7"));
	}
}
