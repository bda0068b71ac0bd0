// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{OpKind, OpOutcome};

/// Counter of attempts, successes, and failures, labeled by `op` + `outcome`.
pub const OP_TOTAL: &str = "secure_token_manager_op_total";
/// Histogram of wall-clock seconds per operation, labeled by `op`.
pub const OP_DURATION_SECONDS: &str = "secure_token_manager_op_duration_seconds";
/// Counter of corrupted or unreadable stores recovered locally, labeled by `op`.
pub const RECOVERED_TOTAL: &str = "secure_token_manager_recovered_total";

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(OP_TOTAL, "op" => kind.as_str(), "outcome" => outcome.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records how long one operation took.
pub fn record_op_duration(kind: OpKind, elapsed: StdDuration) {
	#[cfg(feature = "metrics")]
	metrics::histogram!(OP_DURATION_SECONDS, "op" => kind.as_str()).record(elapsed.as_secs_f64());
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, elapsed);
}

pub(crate) fn record_recovery(kind: OpKind) {
	#[cfg(feature = "metrics")]
	metrics::counter!(RECOVERED_TOTAL, "op" => kind.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = kind;
}
