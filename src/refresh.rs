//! Single-flight token refresh.
//!
//! [`RefreshCoordinator`] keeps at most one refresh in flight per manager. The first caller
//! starts the exchange and parks a shared handle to it in a mutex-guarded slot; every caller
//! arriving while that handle is present awaits the same future instead of issuing another
//! request, so N concurrent callers cost exactly one POST and all observe one outcome. The
//! slot is emptied by the exchange itself once it settles, success or failure, before any
//! waiter is woken.
//!
//! Persistence only happens after the response has been fully parsed and validated, so a
//! failed or abandoned refresh never leaves a half-written record behind. A refresh that
//! settles after a logout or a new login is dropped instead of persisted.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshSnapshot};

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	error::RefreshError,
	http::{self, HttpRequest, HttpTransport},
	telemetry::TelemetryEvent,
	vault::Vault,
};

type RefreshOutcome = Result<TokenRecord, RefreshError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
	generation: u64,
	future: SharedRefresh,
}

#[derive(Default)]
struct RefreshSlot {
	next_generation: u64,
	in_flight: Option<InFlight>,
}

struct RefreshContext<T>
where
	T: HttpTransport,
{
	vault: Arc<Vault>,
	transport: Arc<T>,
	metrics: Arc<RefreshMetrics>,
}
impl<T> RefreshContext<T>
where
	T: HttpTransport,
{
	async fn run(&self, endpoint: Url) -> RefreshOutcome {
		let outcome = self.exchange(endpoint).await;

		match &outcome {
			Ok(record) => self.vault.track(TelemetryEvent::TokensRefreshed {
				user_id: record.user_id().map(ToOwned::to_owned),
				expires_in: record.expires_at() - record.issued_at(),
			}),
			Err(e) => self.vault.track(TelemetryEvent::TokenRefreshFailed { error: e.to_string() }),
		}

		outcome
	}

	async fn exchange(&self, endpoint: Url) -> RefreshOutcome {
		let epoch = self.vault.epoch().await;
		let current = self.vault.open().await.ok_or(RefreshError::NoTokens)?;
		let refresh_token = current
			.refresh_token()
			.filter(|secret| !secret.is_empty())
			.ok_or(RefreshError::NoTokens)?;
		let request = build_request(&endpoint, refresh_token)?;

		self.metrics.record_network_call();

		let (response, meta) =
			http::send(self.transport.as_ref(), request).await.map_err(RefreshError::transport)?;
		let status = response.status();

		if !status.is_success() {
			return Err(RefreshError::Status {
				status: status.as_u16(),
				retry_after: meta.and_then(|meta| meta.retry_after),
			});
		}

		let payload = parse_response(response.body())?;
		let record = next_record(&current, payload, OffsetDateTime::now_utc())?;

		if !self.vault.seal_if_current::<RefreshError>(&record, epoch).await? {
			return Err(RefreshError::Superseded);
		}

		Ok(record)
	}
}

/// Coalesces concurrent refresh requests into one network exchange.
pub struct RefreshCoordinator<T>
where
	T: HttpTransport,
{
	context: Arc<RefreshContext<T>>,
	slot: Arc<Mutex<RefreshSlot>>,
}
impl<T> RefreshCoordinator<T>
where
	T: HttpTransport,
{
	pub(crate) fn new(vault: Arc<Vault>, transport: Arc<T>) -> Self {
		Self {
			context: Arc::new(RefreshContext {
				vault,
				transport,
				metrics: Default::default(),
			}),
			slot: Default::default(),
		}
	}

	/// Counters describing refresh traffic so far.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.context.metrics.clone()
	}

	/// Returns `true` while a refresh exchange is outstanding.
	pub fn is_in_flight(&self) -> bool {
		self.slot.lock().in_flight.is_some()
	}

	/// Refreshes against `endpoint`, or joins the refresh already in flight.
	///
	/// A joined refresh keeps the endpoint chosen by the caller that started it.
	pub async fn refresh(&self, endpoint: &Url) -> RefreshOutcome {
		let metrics = &self.context.metrics;

		metrics.record_attempt();

		let future = {
			let mut slot = self.slot.lock();

			match &slot.in_flight {
				Some(in_flight) => {
					metrics.record_join();

					in_flight.future.clone()
				},
				None => {
					let generation = slot.next_generation;

					slot.next_generation = generation.wrapping_add(1);

					let future = self.start(endpoint.clone(), generation);

					slot.in_flight = Some(InFlight { generation, future: future.clone() });

					future
				},
			}
		};
		let outcome = future.await;

		metrics.record_outcome(outcome.is_ok());

		outcome
	}

	fn start(&self, endpoint: Url, generation: u64) -> SharedRefresh {
		let context = Arc::clone(&self.context);
		let slot = Arc::clone(&self.slot);

		async move {
			let outcome = context.run(endpoint).await;

			{
				let mut slot = slot.lock();

				if slot.in_flight.as_ref().is_some_and(|in_flight| in_flight.generation == generation)
				{
					slot.in_flight = None;
				}
			}

			outcome
		}
		.boxed()
		.shared()
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	expires_in: i64,
	#[serde(default)]
	user_id: Option<String>,
	#[serde(default)]
	scope: Option<String>,
}

fn build_request(endpoint: &Url, refresh_token: &TokenSecret) -> Result<HttpRequest, RefreshError> {
	let body = serde_json::to_vec(&RefreshRequest { refresh_token: refresh_token.expose() })
		.map_err(RefreshError::transport)?;

	Request::builder()
		.method(Method::POST)
		.uri(endpoint.as_str())
		.header(CONTENT_TYPE, "application/json")
		.header(ACCEPT, "application/json")
		.body(body)
		.map_err(RefreshError::transport)
}

fn parse_response(body: &[u8]) -> Result<RefreshResponse, RefreshError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| RefreshError::InvalidResponse { message: e.to_string() })
}

/// Builds the successor of `current`; omitted optional fields carry over.
fn next_record(
	current: &TokenRecord,
	payload: RefreshResponse,
	now: OffsetDateTime,
) -> Result<TokenRecord, RefreshError> {
	if payload.access_token.is_empty() {
		return Err(RefreshError::InvalidResponse {
			message: "accessToken: must not be empty".into(),
		});
	}
	if payload.expires_in <= 0 {
		return Err(RefreshError::NonPositiveExpiresIn);
	}

	let expires_at = now
		.checked_add(Duration::seconds(payload.expires_in))
		.ok_or(RefreshError::ExpiresInOutOfRange)?;
	let refresh_token = payload
		.refresh_token
		.filter(|token| !token.is_empty())
		.map(TokenSecret::new)
		.or_else(|| current.refresh_token().cloned());

	TokenRecord::builder()
		.access_token(payload.access_token)
		.refresh_secret(refresh_token)
		.issued_at(now)
		.expires_at(expires_at)
		.user_id(payload.user_id.or_else(|| current.user_id().map(ToOwned::to_owned)))
		.scope(payload.scope.or_else(|| current.scope().map(ToOwned::to_owned)))
		.build()
		.map_err(|e| RefreshError::InvalidResponse { message: e.to_string() })
}
