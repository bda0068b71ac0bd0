//! Pure validity, expiry, and refresh-need evaluation for token records.
//!
//! Evaluation order matters: absence first, then the age ceiling, then expiry, then the
//! inverted-lifetime check. Every function here is deterministic in its `now` argument so
//! callers can pin the clock.

// self
use crate::{_prelude::*, auth::token::record::TokenRecord};

/// Age and refresh windows applied by the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenPolicy {
	/// Records issued longer ago than this are invalid regardless of `expires_at`.
	pub max_age: Duration,
	/// Valid records closer than this to expiry need a refresh when they can refresh.
	pub refresh_window: Duration,
}
impl TokenPolicy {
	/// Default age ceiling (24 hours).
	pub const DEFAULT_MAX_AGE: Duration = Duration::hours(24);
	/// Default needs-refresh window (5 minutes).
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::minutes(5);

	/// Evaluates `record` against this policy at `now`.
	pub fn validate(&self, record: Option<&TokenRecord>, now: OffsetDateTime) -> ValidationResult {
		let Some(record) = record else {
			return ValidationResult::invalid(InvalidReason::MissingAccessToken, false);
		};

		if record.access_token().is_empty() {
			return ValidationResult::invalid(InvalidReason::MissingAccessToken, false);
		}
		if now - record.issued_at() > self.max_age {
			return ValidationResult::invalid(InvalidReason::TooOld, true);
		}
		if record.is_expired_at(now) {
			return ValidationResult::invalid(InvalidReason::Expired, true);
		}
		// Only reachable when `issued_at` lies in the future.
		if record.expires_at() <= record.issued_at() {
			return ValidationResult::invalid(InvalidReason::Malformed, true);
		}

		let expires_in = record.expires_at() - now;

		ValidationResult {
			is_valid: true,
			is_expired: false,
			expires_in,
			needs_refresh: expires_in <= self.refresh_window && record.can_refresh(),
			reason: None,
		}
	}
}
impl Default for TokenPolicy {
	fn default() -> Self {
		Self { max_age: Self::DEFAULT_MAX_AGE, refresh_window: Self::DEFAULT_REFRESH_WINDOW }
	}
}

/// Why a record failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidReason {
	/// No record, or a record with an empty access token.
	MissingAccessToken,
	/// `expires_at` does not come after `issued_at`.
	Malformed,
	/// Issued longer ago than the policy's age ceiling.
	TooOld,
	/// Past its expiry instant.
	Expired,
}
impl InvalidReason {
	/// Returns the stable human-readable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			InvalidReason::MissingAccessToken => "Missing access token",
			InvalidReason::Malformed => "Token malformed",
			InvalidReason::TooOld => "Token too old",
			InvalidReason::Expired => "Token expired",
		}
	}
}
impl Display for InvalidReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Derived validation state; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationResult {
	/// Record is usable right now.
	pub is_valid: bool,
	/// Record is past expiry or past the age ceiling.
	pub is_expired: bool,
	/// Remaining lifetime; zero for every invalid record.
	pub expires_in: Duration,
	/// Record is valid, inside the refresh window, and carries a refresh token.
	pub needs_refresh: bool,
	/// Failure reason for invalid records.
	pub reason: Option<InvalidReason>,
}
impl ValidationResult {
	fn invalid(reason: InvalidReason, is_expired: bool) -> Self {
		Self {
			is_valid: false,
			is_expired,
			expires_in: Duration::ZERO,
			needs_refresh: false,
			reason: Some(reason),
		}
	}
}

/// Evaluates `record` at `now` using the default [`TokenPolicy`].
pub fn validate(record: Option<&TokenRecord>, now: OffsetDateTime) -> ValidationResult {
	TokenPolicy::default().validate(record, now)
}
