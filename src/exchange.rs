//! Authorization-code and refresh-token exchanges for the OAuth 2.0 dialects.
//!
//! Requests are built and parsed by the `oauth2` crate and dispatched through a
//! [`ProviderHttpClient`] handle so the endpoint's HTTP status can be echoed in
//! [`Error::Exchange`].

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ExtraTokenFields, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{self, ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

type ExchangeTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	ExchangeTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Credential material returned by a token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
	/// Access token.
	pub access_token: String,
	/// Refresh token, when the provider issued (or kept) one.
	pub refresh_token: Option<String>,
	/// Absolute expiry derived from `expires_in`, when supplied.
	pub expires_at: Option<OffsetDateTime>,
	/// OpenID Connect id_token, when supplied.
	pub id_token: Option<String>,
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("expires_at", &self.expires_at)
			.field("id_token_set", &self.id_token.is_some())
			.finish()
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct IdTokenFields {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

/// One configured token endpoint client, built per exchange.
pub(crate) struct TokenExchange<'a> {
	provider: &'a str,
	client: ConfiguredClient,
}
impl<'a> TokenExchange<'a> {
	pub(crate) fn new(
		provider: &'a str,
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: &str,
		redirect_uri: &Url,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidCallback { source })?;
		let mut client: ConfiguredClient = Client::new(ClientId::new(client_id.to_owned()))
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		if !client_secret.is_empty() {
			client = client.set_client_secret(ClientSecret::new(client_secret.to_owned()));
		}
		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			client = client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { provider, client })
	}

	/// Exchanges an authorization code for tokens.
	pub(crate) async fn exchange_code<C>(
		&self,
		http_client: &C,
		code: &str,
		now: OffsetDateTime,
	) -> Result<TokenGrant>
	where
		C: ?Sized + ProviderHttpClient,
	{
		let meta = ResponseMetadataSlot::default();
		let instrumented = http_client.with_metadata(meta.clone());
		let response = self
			.client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(self.provider, meta.take(), err))?;

		map_token_response(response, now, None)
	}

	/// Exchanges a refresh token for a new access token, keeping the old refresh token when the
	/// provider does not rotate it.
	pub(crate) async fn refresh<C>(
		&self,
		http_client: &C,
		refresh_token: &str,
		now: OffsetDateTime,
	) -> Result<TokenGrant>
	where
		C: ?Sized + ProviderHttpClient,
	{
		let meta = ResponseMetadataSlot::default();
		let instrumented = http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.to_owned());
		let response = self
			.client
			.exchange_refresh_token(&refresh_secret)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(self.provider, meta.take(), err))?;

		map_token_response(response, now, Some(refresh_token))
	}
}

fn map_token_response(
	response: ExchangeTokenResponse,
	now: OffsetDateTime,
	previous_refresh: Option<&str>,
) -> Result<TokenGrant> {
	let expires_at = match response.expires_in() {
		Some(expires_in) => {
			let secs = i64::try_from(expires_in.as_secs())
				.map_err(|_| ConfigError::ExpiresInOutOfRange)?;

			Some(
				now.checked_add(Duration::seconds(secs))
					.ok_or(ConfigError::ExpiresInOutOfRange)?,
			)
		},
		None => None,
	};
	let refresh_token = response
		.refresh_token()
		.map(|token| token.secret().to_owned())
		.or_else(|| previous_refresh.map(str::to_owned));

	Ok(TokenGrant {
		access_token: response.access_token().secret().to_owned(),
		refresh_token,
		expires_at,
		id_token: response.extra_fields().id_token.clone(),
	})
}

fn map_request_error<E>(
	provider: &str,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let (status, error_body) = match meta {
		Some(meta) => (meta.status, meta.error_body),
		None => (None, None),
	};

	match err {
		RequestTokenError::ServerResponse(response) => Error::Exchange {
			provider: provider.to_owned(),
			status,
			body: match error_body {
				Some(raw) => String::from_utf8_lossy(&raw).into_owned(),
				None => serde_json::to_string(&response).unwrap_or_default(),
			},
		},
		RequestTokenError::Request(error) => http::map_transport_error(error),
		RequestTokenError::Parse(source, body) => match status {
			Some(code) if !(200..300).contains(&code) => Error::Exchange {
				provider: provider.to_owned(),
				status,
				body: String::from_utf8_lossy(&body).into_owned(),
			},
			_ => Error::Parse { provider: provider.to_owned(), source },
		},
		RequestTokenError::Other(message) =>
			Error::Exchange { provider: provider.to_owned(), status, body: message },
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::GrantType;

	fn descriptor(method: ClientAuthMethod) -> ProviderDescriptor {
		ProviderDescriptor::builder()
			.authorization_endpoint(
				Url::parse("https://example.com/oauth2/authorize")
					.expect("Failed to parse authorization endpoint URL."),
			)
			.token_endpoint(
				Url::parse("https://example.com/oauth2/token")
					.expect("Failed to parse token endpoint URL."),
			)
			.support_grant(GrantType::AuthorizationCode)
			.preferred_client_auth_method(method)
			.build()
			.expect("Failed to build provider descriptor.")
	}

	fn redirect() -> Url {
		Url::parse("https://app.example.com/callback").expect("Failed to parse redirect URI.")
	}

	#[test]
	fn builds_basic_and_post_clients() {
		for method in [ClientAuthMethod::ClientSecretBasic, ClientAuthMethod::ClientSecretPost] {
			let result =
				TokenExchange::new("idp", &descriptor(method), "client-id", "secret", &redirect());

			assert!(result.is_ok());
		}
	}

	#[test]
	fn builds_client_without_secret() {
		let result = TokenExchange::new(
			"idp",
			&descriptor(ClientAuthMethod::ClientSecretPost),
			"public-client",
			"",
			&redirect(),
		);

		assert!(result.is_ok());
	}

	#[test]
	fn server_errors_become_exchange_errors_with_status() {
		let response: BasicErrorResponse = serde_json::from_str(
			"{\"error\":\"invalid_grant\",\"error_description\":\"already used\"}",
		)
		.expect("Error response fixture should parse.");
		let err = map_request_error::<std::io::Error>(
			"idp",
			Some(ResponseMetadata { status: Some(400), error_body: None }),
			RequestTokenError::ServerResponse(response),
		);

		match err {
			Error::Exchange { provider, status, body } => {
				assert_eq!(provider, "idp");
				assert_eq!(status, Some(400));
				assert!(body.contains("invalid_grant"));
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn server_errors_echo_the_raw_body_with_vendor_fields() {
		let raw = "{\"error\":\"invalid_grant\",\"vendor_trace\":\"t-42\"}";
		let response: BasicErrorResponse =
			serde_json::from_str(raw).expect("Error response fixture should parse.");
		let err = map_request_error::<std::io::Error>(
			"idp",
			Some(ResponseMetadata { status: Some(400), error_body: Some(raw.as_bytes().to_vec()) }),
			RequestTokenError::ServerResponse(response),
		);

		match err {
			Error::Exchange { status, body, .. } => {
				assert_eq!(status, Some(400));
				assert_eq!(body, raw);
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}
}
