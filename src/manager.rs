//! The token manager facade.
//!
//! [`TokenManager`] is the only type other subsystems talk to. It is built once by the
//! application's composition root and shared by reference (typically behind an [`Arc`]);
//! there is no global instance.

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	config::{self, ManagerConfig},
	crypto::CryptoProvider,
	error::ValidationError,
	http::HttpTransport,
	obs::{self, OpKind, OpOutcome, OpSpan},
	refresh::{RefreshCoordinator, RefreshMetrics},
	store::EncryptedStore,
	telemetry::{TelemetryEvent, TelemetrySink},
	vault::Vault,
};

/// Token manager backed by the reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestTokenManager = TokenManager<ReqwestTransport>;

/// Snapshot of the current session for UI gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenInfo {
	/// The stored record is currently valid.
	pub is_authenticated: bool,
	/// Remaining lifetime; zero when invalid.
	pub expires_in: Duration,
	/// The record should be renewed soon.
	pub needs_refresh: bool,
}

/// Encrypts, persists, validates, and refreshes the current bearer credential.
pub struct TokenManager<T>
where
	T: HttpTransport,
{
	config: ManagerConfig,
	vault: Arc<Vault>,
	refresher: RefreshCoordinator<T>,
	transport: Arc<T>,
}
impl<T> TokenManager<T>
where
	T: HttpTransport,
{
	/// Assembles a manager from its collaborators.
	pub fn with_transport(
		config: ManagerConfig,
		crypto: Arc<dyn CryptoProvider>,
		store: Arc<dyn EncryptedStore>,
		telemetry: Arc<dyn TelemetrySink>,
		transport: T,
	) -> Self {
		let vault = Arc::new(Vault::new(crypto, store, telemetry));
		let transport = Arc::new(transport);
		let refresher = RefreshCoordinator::new(vault.clone(), transport.clone());

		Self { config, vault, refresher, transport }
	}

	/// Configuration the manager was built with.
	pub fn config(&self) -> &ManagerConfig {
		&self.config
	}

	/// Transport shared by refreshes and authenticated requests.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Single-flight refresh coordinator.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator<T> {
		&self.refresher
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresher.metrics()
	}

	/// Seals and persists `record` as the current session.
	///
	/// Fails with [`ValidationError::MissingAccessToken`] before touching storage when the
	/// access token is empty.
	pub async fn store_tokens(&self, record: &TokenRecord) -> Result<()> {
		obs::observe(OpKind::StoreTokens, "store_tokens", async move {
			if record.access_token().is_empty() {
				return Err(ValidationError::MissingAccessToken.into());
			}

			self.vault.seal::<Error>(record).await?;
			self.vault.track(TelemetryEvent::TokensStored {
				has_refresh_token: record.can_refresh(),
				expires_in: record.remaining_at(OffsetDateTime::now_utc()),
				user_id: record.user_id().map(ToOwned::to_owned),
			});

			Ok(())
		})
		.await
	}

	/// Returns the current record; unreadable storage reads as `None`.
	pub async fn get_tokens(&self) -> Option<TokenRecord> {
		const KIND: OpKind = OpKind::GetTokens;

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let record = OpSpan::new(KIND, "get_tokens").run(self.vault.open()).await;

		obs::record_op_outcome(KIND, OpOutcome::Success);

		record
	}

	/// Returns a usable access token, refreshing silently when inside the refresh window.
	///
	/// Invalid records and failed refreshes both yield `None`.
	pub async fn get_access_token(&self) -> Option<TokenSecret> {
		const KIND: OpKind = OpKind::AccessToken;

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let token = OpSpan::new(KIND, "get_access_token")
			.run(async {
				let record = self.vault.open().await?;
				let validation = self.config.policy().validate(Some(&record), OffsetDateTime::now_utc());

				if !validation.is_valid {
					return None;
				}
				if !validation.needs_refresh {
					return Some(record.access_token().clone());
				}

				match self.refresher.refresh(self.config.refresh_endpoint()).await {
					Ok(refreshed) => Some(refreshed.access_token().clone()),
					Err(e) => {
						obs::warn_recovered(KIND, "Silent refresh failed; reporting no token.", &e);

						None
					},
				}
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::Success);

		token
	}

	/// Refreshes the session, joining any refresh already in flight.
	///
	/// `endpoint` overrides the configured refresh endpoint for this call and must pass the
	/// same HTTPS check.
	pub async fn refresh_tokens(&self, endpoint: Option<&Url>) -> Result<TokenRecord> {
		obs::observe(OpKind::Refresh, "refresh_tokens", async move {
			let endpoint = match endpoint {
				Some(endpoint) => {
					config::validate_endpoint(endpoint)?;

					endpoint
				},
				None => self.config.refresh_endpoint(),
			};

			Ok(self.refresher.refresh(endpoint).await?)
		})
		.await
	}

	/// Removes the current session.
	pub async fn clear_tokens(&self) -> Result<()> {
		obs::observe(OpKind::ClearTokens, "clear_tokens", async {
			self.vault.clear().await?;
			self.vault.track(TelemetryEvent::TokensCleared);

			Ok(())
		})
		.await
	}

	/// Returns `true` when any readable record is stored, valid or not.
	pub async fn is_authenticated(&self) -> bool {
		self.get_tokens().await.is_some()
	}

	/// Summarizes the stored record, or `None` without one.
	pub async fn get_token_info(&self) -> Option<TokenInfo> {
		let record = self.get_tokens().await?;
		let validation = self.config.policy().validate(Some(&record), OffsetDateTime::now_utc());

		Some(TokenInfo {
			is_authenticated: validation.is_valid,
			expires_in: validation.expires_in,
			needs_refresh: validation.needs_refresh,
		})
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestTransport> {
	/// Assembles a manager that talks to the refresh endpoint through a default reqwest client.
	pub fn new(
		config: ManagerConfig,
		crypto: Arc<dyn CryptoProvider>,
		store: Arc<dyn EncryptedStore>,
		telemetry: Arc<dyn TelemetrySink>,
	) -> Self {
		Self::with_transport(config, crypto, store, telemetry, ReqwestTransport::default())
	}
}
impl<T> Debug for TokenManager<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("config", &self.config)
			.field("refresh_in_flight", &self.refresher.is_in_flight())
			.finish_non_exhaustive()
	}
}
