//! Bearer-authorized HTTP calls with one refresh-and-retry on `401`.
//!
//! A call moves through three states: it is sent normally; a `401 Unauthorized` answer moves
//! it to refreshing, which triggers exactly one refresh; a successful refresh replays the
//! original request once. If the refresh fails or the replay is still unauthorized, the
//! session is cleared and the caller gets [`Error::Authentication`].

// crates.io
use oauth2::http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
	http::{self, HttpRequest, HttpResponse, HttpTransport},
	manager::TokenManager,
	obs::{self, OpKind},
};

/// Attaches the current access token to outbound requests.
pub struct AuthenticatedRequestHelper<T>
where
	T: HttpTransport,
{
	manager: Arc<TokenManager<T>>,
}
impl<T> AuthenticatedRequestHelper<T>
where
	T: HttpTransport,
{
	/// Wraps a shared manager; requests go through the manager's transport.
	pub fn new(manager: Arc<TokenManager<T>>) -> Self {
		Self { manager }
	}

	/// Manager backing this helper.
	pub fn manager(&self) -> &Arc<TokenManager<T>> {
		&self.manager
	}

	/// Returns `Authorization: Bearer <token>`, or an empty map without a usable token.
	pub async fn build_auth_header(&self) -> Result<HeaderMap> {
		let mut headers = HeaderMap::new();

		if let Some(token) = self.manager.get_access_token().await {
			headers.insert(AUTHORIZATION, bearer(&token)?);
		}

		Ok(headers)
	}

	/// Sends `request` with the current bearer token, refreshing and retrying once on `401`.
	///
	/// The replay carries the access token returned by that refresh. Non-`401` responses are
	/// returned as-is, whatever their status.
	pub async fn call(&self, request: HttpRequest) -> Result<HttpResponse> {
		obs::observe(OpKind::AuthenticatedCall, "call", async move {
			let token = self.manager.get_access_token().await;
			let response =
				self.send_with(http::duplicate_request(&request), token.as_ref()).await?;

			if response.status() != StatusCode::UNAUTHORIZED {
				return Ok(response);
			}

			let refreshed = match self.manager.refresh_tokens(None).await {
				Ok(refreshed) => refreshed,
				Err(e) => {
					self.abandon_session().await;

					let source = match e {
						Error::Refresh(e) => Some(e),
						_ => None,
					};

					return Err(Error::Authentication { source });
				},
			};
			let retried = self.send_with(request, Some(refreshed.access_token())).await?;

			if retried.status() == StatusCode::UNAUTHORIZED {
				self.abandon_session().await;

				return Err(Error::Authentication { source: None });
			}

			Ok(retried)
		})
		.await
	}

	/// Replaces any `Authorization` header with `token` (or drops it) and sends once.
	async fn send_with(
		&self,
		mut request: HttpRequest,
		token: Option<&TokenSecret>,
	) -> Result<HttpResponse> {
		let headers = request.headers_mut();

		headers.remove(AUTHORIZATION);

		if let Some(token) = token {
			headers.insert(AUTHORIZATION, bearer(token)?);
		}

		let (response, _) = http::send(self.manager.transport(), request)
			.await
			.map_err(TransportError::network)?;

		Ok(response)
	}

	async fn abandon_session(&self) {
		if let Err(e) = self.manager.clear_tokens().await {
			obs::warn_recovered(
				OpKind::AuthenticatedCall,
				"Failed to clear tokens after authentication failure.",
				&e,
			);
		}
	}
}

fn bearer(token: &TokenSecret) -> Result<HeaderValue> {
	let mut value = HeaderValue::from_str(&token.to_bearer())
		.map_err(|e| ConfigError::HttpRequest(e.into()))?;

	value.set_sensitive(true);

	Ok(value)
}
