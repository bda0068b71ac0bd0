//! Shared fixtures for the integration suites: a scripted in-process transport, a recording
//! telemetry sink, and a manager builder over [`MemoryStore`].

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use serde_json::Value;
use time::Duration;
// self
use secure_token_manager::{
	auth::TokenRecord,
	config::ManagerConfig,
	crypto::{AesGcmCrypto, CryptoKey},
	http::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, HttpTransport,
		ResponseMetadata, ResponseMetadataSlot, http::StatusCode,
	},
	manager::TokenManager,
	store::MemoryStore,
	telemetry::{TelemetryEvent, TelemetrySink},
	url::Url,
};

pub const REFRESH_ENDPOINT: &str = "https://auth.example.com/refresh";

pub type TestManager = TokenManager<ScriptedTransport>;

#[derive(Debug)]
pub struct ScriptedError(pub String);
impl Display for ScriptedError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Scripted transport failure: {}.", self.0)
	}
}
impl StdError for ScriptedError {}

enum Step {
	Respond { status: u16, body: Vec<u8>, retry_after: Option<Duration> },
	Fail(String),
}

/// Request as observed by the transport.
#[derive(Clone, Debug)]
pub struct SeenRequest {
	pub method: String,
	pub uri: String,
	pub authorization: Option<String>,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}
impl SeenRequest {
	pub fn json(&self) -> Value {
		serde_json::from_slice(&self.body).expect("Recorded request body should be JSON.")
	}
}

#[derive(Default)]
struct Script {
	steps: Mutex<VecDeque<Step>>,
	seen: Mutex<Vec<SeenRequest>>,
	delay: Mutex<Option<StdDuration>>,
}

/// Replays queued responses in order and records every request it receives.
#[derive(Clone, Default)]
pub struct ScriptedTransport(Arc<Script>);
impl ScriptedTransport {
	/// Every call sleeps for `delay` before answering, keeping it in flight.
	pub fn with_delay(self, delay: StdDuration) -> Self {
		*self.0.delay.lock() = Some(delay);

		self
	}

	pub fn push_json(&self, status: u16, body: Value) -> &Self {
		let body = serde_json::to_vec(&body).expect("Scripted JSON body should serialize.");

		self.0.steps.lock().push_back(Step::Respond { status, body, retry_after: None });

		self
	}

	pub fn push_status(&self, status: u16) -> &Self {
		self.0.steps.lock().push_back(Step::Respond { status, body: Vec::new(), retry_after: None });

		self
	}

	pub fn push_throttled(&self, retry_after: Duration) -> &Self {
		self.0.steps.lock().push_back(Step::Respond {
			status: 429,
			body: Vec::new(),
			retry_after: Some(retry_after),
		});

		self
	}

	pub fn push_body(&self, status: u16, body: &str) -> &Self {
		self.0.steps.lock().push_back(Step::Respond {
			status,
			body: body.as_bytes().to_vec(),
			retry_after: None,
		});

		self
	}

	pub fn push_failure(&self, message: &str) -> &Self {
		self.0.steps.lock().push_back(Step::Fail(message.into()));

		self
	}

	pub fn calls(&self) -> usize {
		self.0.seen.lock().len()
	}

	pub fn requests(&self) -> Vec<SeenRequest> {
		self.0.seen.lock().clone()
	}
}
impl HttpTransport for ScriptedTransport {
	type Handle = ScriptedHandle;
	type TransportError = ScriptedError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { script: self.0.clone(), slot }
	}
}

pub struct ScriptedHandle {
	script: Arc<Script>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<ScriptedError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let script = self.script.clone();
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.take();

			let header = |name: &str| {
				request.headers().get(name).and_then(|value| value.to_str().ok()).map(String::from)
			};
			let seen = SeenRequest {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				authorization: header("authorization"),
				content_type: header("content-type"),
				body: request.body().clone(),
			};

			script.seen.lock().push(seen);

			let delay = *script.delay.lock();

			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			let step = script.steps.lock().pop_front();

			match step {
				Some(Step::Respond { status, body, retry_after }) => {
					slot.store(ResponseMetadata { status: Some(status), retry_after });

					let mut response = HttpResponse::new(body);

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					Ok(response)
				},
				Some(Step::Fail(message)) =>
					Err(HttpClientError::Reqwest(Box::new(ScriptedError(message)))),
				None => Err(HttpClientError::Other("No scripted response left.".into())),
			}
		})
	}
}

/// Telemetry sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingTelemetry(Mutex<Vec<TelemetryEvent>>);
impl RecordingTelemetry {
	pub fn events(&self) -> Vec<TelemetryEvent> {
		self.0.lock().clone()
	}

	pub fn names(&self) -> Vec<&'static str> {
		self.0.lock().iter().map(TelemetryEvent::name).collect()
	}

	pub fn count(&self, name: &str) -> usize {
		self.0.lock().iter().filter(|event| event.name() == name).count()
	}
}
impl TelemetrySink for RecordingTelemetry {
	fn track(&self, event: &TelemetryEvent) {
		self.0.lock().push(event.clone());
	}
}

pub struct Harness {
	pub manager: Arc<TestManager>,
	pub store: Arc<MemoryStore>,
	pub telemetry: Arc<RecordingTelemetry>,
	pub transport: ScriptedTransport,
	pub key: CryptoKey,
}

pub fn default_config() -> ManagerConfig {
	ManagerConfig::builder(Url::parse(REFRESH_ENDPOINT).expect("Refresh endpoint should parse."))
		.build()
		.expect("Default test configuration should be valid.")
}

pub fn harness() -> Harness {
	harness_with(default_config(), ScriptedTransport::default())
}

pub fn harness_with(config: ManagerConfig, transport: ScriptedTransport) -> Harness {
	let key = CryptoKey::generate();
	let crypto = Arc::new(AesGcmCrypto::new(&key).expect("Generated key should be accepted."));
	let store = Arc::new(MemoryStore::default());
	let telemetry = Arc::new(RecordingTelemetry::default());
	let manager = Arc::new(TokenManager::with_transport(
		config,
		crypto,
		store.clone(),
		telemetry.clone(),
		transport.clone(),
	));

	Harness { manager, store, telemetry, transport, key }
}

/// Record issued now that lives for `lifetime`.
pub fn record(access: &str, refresh: Option<&str>, lifetime: Duration) -> TokenRecord {
	let builder = TokenRecord::builder().access_token(access).issued_now().expires_in(lifetime);
	let builder = match refresh {
		Some(refresh) => builder.refresh_token(refresh),
		None => builder,
	};

	builder.build().expect("Token record fixture should build.")
}
