//! Manager configuration: refresh endpoint and validation windows.

// self
use crate::{_prelude::*, auth::TokenPolicy, error::ConfigError};

/// Validated settings shared by the manager and its refresh coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
	refresh_endpoint: Url,
	policy: TokenPolicy,
}
impl ManagerConfig {
	/// Starts a builder for the given default refresh endpoint.
	pub fn builder(refresh_endpoint: Url) -> ManagerConfigBuilder {
		ManagerConfigBuilder {
			refresh_endpoint,
			max_token_age: TokenPolicy::DEFAULT_MAX_AGE,
			refresh_window: TokenPolicy::DEFAULT_REFRESH_WINDOW,
		}
	}

	/// Endpoint used when `refresh_tokens` is called without an override.
	pub fn refresh_endpoint(&self) -> &Url {
		&self.refresh_endpoint
	}

	/// Age ceiling and refresh window applied to every validation.
	pub fn policy(&self) -> TokenPolicy {
		self.policy
	}
}

/// Builder for [`ManagerConfig`].
#[derive(Clone, Debug)]
pub struct ManagerConfigBuilder {
	refresh_endpoint: Url,
	max_token_age: Duration,
	refresh_window: Duration,
}
impl ManagerConfigBuilder {
	/// Overrides the age ceiling (default 24 hours).
	pub fn max_token_age(mut self, max_token_age: Duration) -> Self {
		self.max_token_age = max_token_age;

		self
	}

	/// Overrides the needs-refresh window (default 5 minutes).
	pub fn refresh_window(mut self, refresh_window: Duration) -> Self {
		self.refresh_window = refresh_window;

		self
	}

	/// Validates the settings and produces a [`ManagerConfig`].
	pub fn build(self) -> Result<ManagerConfig, ConfigError> {
		validate_endpoint(&self.refresh_endpoint)?;

		if !self.max_token_age.is_positive() {
			return Err(ConfigError::NonPositiveWindow { name: "max token age" });
		}
		if !self.refresh_window.is_positive() {
			return Err(ConfigError::NonPositiveWindow { name: "refresh" });
		}

		Ok(ManagerConfig {
			refresh_endpoint: self.refresh_endpoint,
			policy: TokenPolicy {
				max_age: self.max_token_age,
				refresh_window: self.refresh_window,
			},
		})
	}
}

/// Requires HTTPS, except for plain HTTP against a loopback host.
pub(crate) fn validate_endpoint(url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
