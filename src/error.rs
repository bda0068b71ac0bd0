//! Manager-level error types shared across the vault, refresh, and request layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Reference-counted error source that can be cloned into every coalesced refresh caller.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Malformed input supplied by the caller.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Encryption or decryption failure.
	#[error(transparent)]
	Crypto(#[from] crate::crypto::CryptoError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Refresh endpoint or refresh protocol failure.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Transport failure (DNS, TCP, TLS) outside the refresh path.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Request still unauthorized after one refresh-and-retry; tokens were cleared.
	#[error("Authentication failed")]
	Authentication {
		/// Refresh failure that ended the retry, when the refresh itself failed.
		#[source]
		source: Option<RefreshError>,
	},
}

/// Caller input rejected before any cryptographic or storage work.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// The record to store carries an empty access token.
	#[error("Access token is required")]
	MissingAccessToken,
}

/// Configuration and validation failures raised while assembling a manager.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Refresh endpoint uses plain HTTP against a non-loopback host.
	#[error("The refresh endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A policy window is zero or negative.
	#[error("The {name} window must be positive.")]
	NonPositiveWindow {
		/// Policy window label.
		name: &'static str,
	},
}

/// Refresh failures; cloneable so one outcome can be delivered to every waiting caller.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// No decryptable record or no refresh token is available.
	#[error("No tokens available to refresh")]
	NoTokens,
	/// Refresh endpoint answered with a non-success status.
	#[error("Token refresh failed: {status}")]
	Status {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The request could not be built or the transport failed before a response arrived.
	#[error("Token refresh request failed.")]
	Transport {
		/// Underlying transport failure.
		#[source]
		source: SharedError,
	},
	/// Refresh endpoint returned a body that does not match the response schema.
	#[error("Token refresh response is invalid: {message}.")]
	InvalidResponse {
		/// Parser-supplied description, including the offending field path.
		message: String,
	},
	/// Refresh endpoint returned a non-positive `expiresIn`.
	#[error("The expiresIn value must be positive.")]
	NonPositiveExpiresIn,
	/// Refresh endpoint returned an `expiresIn` that overflows the clock.
	#[error("The expiresIn value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// The session was cleared or replaced while the refresh was in flight.
	#[error("The session changed while the refresh was in flight.")]
	Superseded,
	/// Refreshed tokens could not be encrypted.
	#[error(transparent)]
	Crypto(#[from] crate::crypto::CryptoError),
	/// Refreshed tokens could not be persisted.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl RefreshError {
	/// Wraps a transport-specific failure.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Arc::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
