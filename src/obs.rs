//! Optional observability helpers for manager operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `secure_token_manager.op` with the `op`
//!   (facade operation), `stage` (call site), and `elapsed_ms` fields, plus `warn!` records
//!   whenever a corrupted or unreadable store is recovered locally.
//! - Enable `metrics` to feed the `secure_token_manager_op_total` counter (labeled by `op` +
//!   `outcome`), the `secure_token_manager_op_duration_seconds` histogram, and the
//!   `secure_token_manager_recovered_total` counter.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Manager operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Sealing and persisting a fresh record.
	StoreTokens,
	/// Loading and opening the current record.
	GetTokens,
	/// Passive access-token read, possibly refreshing.
	AccessToken,
	/// Single-flight refresh.
	Refresh,
	/// Clearing the store.
	ClearTokens,
	/// Authorized request with one refresh-and-retry.
	AuthenticatedCall,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::StoreTokens => "store_tokens",
			OpKind::GetTokens => "get_tokens",
			OpKind::AccessToken => "access_token",
			OpKind::Refresh => "refresh",
			OpKind::ClearTokens => "clear_tokens",
			OpKind::AuthenticatedCall => "authenticated_call",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a manager operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an [`OpSpan`] and records its attempt plus success or failure.
pub(crate) async fn observe<F, T, E>(kind: OpKind, stage: &'static str, fut: F) -> Result<T, E>
where
	F: Future<Output = Result<T, E>>,
{
	let span = OpSpan::new(kind, stage);

	record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.run(fut).await;

	match &result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(_) => record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}
