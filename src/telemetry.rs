//! Fire-and-forget lifecycle events for an external analytics sink.
//!
//! Events carry non-sensitive metadata only: raw access or refresh tokens never appear in a
//! payload. Sinks must not block; a slow or failing sink never affects token operations.

// crates.io
use serde_json::{Map, Value, json};
// self
use crate::_prelude::*;

/// Consumer of [`TelemetryEvent`]s, e.g. an analytics client exposing `track(name, payload)`.
pub trait TelemetrySink
where
	Self: Send + Sync,
{
	/// Records one event; must return promptly and never panic.
	fn track(&self, event: &TelemetryEvent);
}

/// Lifecycle events emitted by the manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryEvent {
	/// A fresh record was sealed and persisted.
	TokensStored {
		/// Whether the record can be silently renewed.
		has_refresh_token: bool,
		/// Remaining lifetime at store time.
		expires_in: Duration,
		/// Opaque user identifier, if provided.
		user_id: Option<String>,
	},
	/// A refresh completed and the new record was persisted.
	TokensRefreshed {
		/// Opaque user identifier of the new record.
		user_id: Option<String>,
		/// Lifetime granted by the refresh endpoint.
		expires_in: Duration,
	},
	/// A refresh attempt failed.
	TokenRefreshFailed {
		/// Rendered failure message.
		error: String,
	},
	/// The stored blob could not be opened and was discarded.
	TokenDecryptionFailed {
		/// Rendered failure message.
		error: String,
	},
	/// The store was cleared.
	TokensCleared,
}
impl TelemetryEvent {
	/// Stable event name.
	pub const fn name(&self) -> &'static str {
		match self {
			TelemetryEvent::TokensStored { .. } => "tokens_stored",
			TelemetryEvent::TokensRefreshed { .. } => "tokens_refreshed",
			TelemetryEvent::TokenRefreshFailed { .. } => "token_refresh_failed",
			TelemetryEvent::TokenDecryptionFailed { .. } => "token_decryption_failed",
			TelemetryEvent::TokensCleared => "tokens_cleared",
		}
	}

	/// JSON payload with camelCase keys; durations are whole seconds.
	pub fn payload(&self) -> Value {
		match self {
			TelemetryEvent::TokensStored { has_refresh_token, expires_in, user_id } => json!({
				"hasRefreshToken": has_refresh_token,
				"expiresIn": expires_in.whole_seconds(),
				"userId": user_id,
			}),
			TelemetryEvent::TokensRefreshed { user_id, expires_in } => json!({
				"userId": user_id,
				"expiresIn": expires_in.whole_seconds(),
			}),
			TelemetryEvent::TokenRefreshFailed { error }
			| TelemetryEvent::TokenDecryptionFailed { error } => json!({ "error": error }),
			TelemetryEvent::TokensCleared => Value::Object(Map::new()),
		}
	}
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTelemetry;
impl TelemetrySink for NoopTelemetry {
	fn track(&self, _: &TelemetryEvent) {}
}

/// Sink that forwards events to `tracing` at `INFO` level under the
/// `secure_token_manager::telemetry` target.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;
#[cfg(feature = "tracing")]
impl TelemetrySink for TracingTelemetry {
	fn track(&self, event: &TelemetryEvent) {
		tracing::info!(
			target: "secure_token_manager::telemetry",
			event = event.name(),
			payload = %event.payload()
		);
	}
}
