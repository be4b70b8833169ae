//! Broker-level error types shared across providers, sessions, and the assertion builder.

// self
use crate::{_prelude::*, auth::AssertionError, provider::ProviderDescriptorError};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Every variant carries enough context (provider name, HTTP status) for the host to log or
/// render it. Nothing is retried internally.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, deadlines injected by the transport).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Signed client assertion could not be produced.
	#[error(transparent)]
	Assertion(#[from] AssertionError),

	/// Operation invoked on a session that is missing required prior state.
	#[error("{reason}.")]
	Precondition {
		/// Human-readable description of the missing state.
		reason: String,
	},
	/// Token or assertion endpoint rejected the exchange.
	#[error("{provider} rejected the exchange (HTTP status {}): {body}.", display_status(.status))]
	Exchange {
		/// Provider display name.
		provider: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Raw endpoint response body, or the re-encoded OAuth error payload when the transport
		/// did not keep the bytes.
		body: String,
	},
	/// Provider response failed an integrity check (nonce, signature, audience, etc.).
	#[error("{provider} returned an assertion that failed validation: {reason}.")]
	Validation {
		/// Provider display name.
		provider: String,
		/// Which check failed.
		reason: String,
	},
	/// Profile endpoint answered with a non-success status.
	#[error("{provider} responded with a {status} trying to fetch user information.")]
	Fetch {
		/// Provider display name.
		provider: String,
		/// HTTP status code returned by the profile endpoint.
		status: u16,
	},
	/// Provider response body could not be parsed.
	#[error("{provider} returned a malformed response body.")]
	Parse {
		/// Provider display name.
		provider: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Serialized session text is malformed.
	#[error("Session payload is malformed.")]
	Deserialization(#[source] serde_json::Error),
	/// Capability not offered by the provider's dialect.
	#[error("{provider} does not support {capability}.")]
	NotSupported {
		/// Provider display name.
		provider: String,
		/// Capability label.
		capability: &'static str,
	},
}
impl Error {
	pub(crate) fn precondition(reason: impl Into<String>) -> Self {
		Self::Precondition { reason: reason.into() }
	}

	pub(crate) fn validation(provider: &str, reason: impl Into<String>) -> Self {
		Self::Validation { provider: provider.to_owned(), reason: reason.into() }
	}

	pub(crate) fn not_supported(provider: &str, capability: &'static str) -> Self {
		Self::NotSupported { provider: provider.to_owned(), capability }
	}
}

/// Configuration and validation failures raised while wiring providers.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] ProviderDescriptorError),
	/// A configured endpoint cannot be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Callback URL cannot be parsed.
	#[error("Callback URL is invalid.")]
	InvalidCallback {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure that carries only a message.
	#[error("HTTP client error occurred while calling the provider: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

fn display_status(status: &Option<u16>) -> String {
	status.map(|code| code.to_string()).unwrap_or_else(|| "unknown".into())
}
