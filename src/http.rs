//! Transport primitives for provider calls.
//!
//! The module exposes [`ProviderHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can inject custom HTTP clients (test doubles,
//! proxies, clients with deadlines) without losing the status information the broker echoes in
//! its errors. Token exchanges run through the `oauth2` crate with these handles; profile and
//! OpenID verification calls use the same handles directly.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Abstraction over HTTP transports capable of reaching provider endpoints while publishing
/// response metadata to the broker's error mapping.
///
/// The trait is the broker's only dependency on an HTTP stack. Providers hold an `Arc<T>` and
/// request short-lived [`AsyncHttpClient`] handles that each carry a clone of a
/// [`ResponseMetadataSlot`]. Handles must own whatever state they need so their request futures
/// stay `Send` for the lifetime of the in-flight call.
///
/// Deadlines and cancellation belong here; the broker propagates any failure as
/// [`TransportError`] and never retries.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across calls.
	/// - Once an HTTP response provides a status, save it with [`ResponseMetadataSlot::store`].
	///   Include the raw body for non-2xx responses so error mapping can echo it verbatim.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Raw body of a non-2xx response, if the transport kept it.
	pub error_body: Option<Vec<u8>>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints return results directly, so configure any custom client to disable
/// redirect following.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}
}

#[cfg(feature = "reqwest")]
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that records response status codes.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), error_body: None });

			let body = response.bytes().await.map_err(Box::new)?.to_vec();

			if !status.is_success() {
				client.slot.store(ResponseMetadata {
					status: Some(status.as_u16()),
					error_body: Some(body.clone()),
				});
			}

			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Dispatches a request through a fresh handle and maps transport failures.
pub(crate) async fn send<C>(http_client: &C, request: HttpRequest) -> Result<HttpResponse>
where
	C: ?Sized + ProviderHttpClient,
{
	let handle = http_client.with_metadata(ResponseMetadataSlot::default());

	handle.call(request).await.map_err(map_transport_error)
}

/// Builds a `GET` request that expects JSON, optionally carrying a bearer token.
pub(crate) fn get_json(url: &Url, bearer: Option<&str>) -> Result<HttpRequest> {
	let mut builder = Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, "application/json");

	if let Some(token) = bearer {
		builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
	}

	builder.body(Vec::new()).map_err(|e| ConfigError::from(e).into())
}

/// Builds a form-encoded `POST` request.
pub(crate) fn post_form<'a, I>(url: &Url, pairs: I) -> Result<HttpRequest>
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

	Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.body(body.into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

/// Converts an [`HttpClientError`] emitted by any transport into a broker error.
pub(crate) fn map_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		_ => TransportError::Other { message: "unrecognized transport failure".into() }.into(),
	}
}
