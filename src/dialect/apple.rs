//! Authorization-code login where the client secret is a signed ES256 assertion.
//!
//! Apple-style identity services reject static secrets: every token exchange presents a
//! short-lived JWT minted by [`ClientSecretSigner`]. The user's identity travels in the id_token
//! returned alongside the access token, so [`AppleProvider::fetch_user`](Provider::fetch_user)
//! reads its claims instead of calling a profile endpoint (unless one is configured). The
//! id_token arrives over the TLS-protected token endpoint response; its issuer, audience, and
//! expiry are checked, its signature is not.
//!
//! Refresh is not offered. Hosts re-run the authorization flow instead.

mod session;

pub use session::*;

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{APPLE_AUDIENCE, ClientSecretSigner, ScopeList, Secret},
	clock::{self, Clock},
	dialect,
	error::ConfigError,
	exchange::TokenExchange,
	http::ProviderHttpClient,
	obs::{self, FlowStep},
	provider::{
		CallbackParams, ClientAuthMethod, GrantType, Provider, ProviderDescriptor, ProviderFuture,
	},
	user::{self, ProfileFields, User},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Default authorization endpoint.
pub const APPLE_AUTHORIZATION_ENDPOINT: &str = "https://appleid.apple.com/auth/authorize";
/// Default token endpoint.
pub const APPLE_TOKEN_ENDPOINT: &str = "https://appleid.apple.com/auth/token";
/// Scope requesting the user's name.
pub const SCOPE_NAME: &str = "name";
/// Scope requesting the user's email.
pub const SCOPE_EMAIL: &str = "email";

/// [`AppleProvider`] specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestAppleProvider = AppleProvider<ReqwestHttpClient>;

/// Credential presented as `client_secret` on the token endpoint.
#[derive(Clone, Debug)]
pub enum ClientCredential {
	/// Pre-minted secret, used verbatim until it expires.
	Static(Secret),
	/// Signer that mints a fresh assertion for every exchange.
	Signed(ClientSecretSigner),
}
impl ClientCredential {
	/// Returns the secret to present for one exchange.
	pub fn secret(&self) -> Result<Secret> {
		match self {
			Self::Static(secret) => Ok(secret.clone()),
			Self::Signed(signer) => Ok(Secret::new(signer.sign()?)),
		}
	}
}
impl From<Secret> for ClientCredential {
	fn from(secret: Secret) -> Self {
		Self::Static(secret)
	}
}
impl From<ClientSecretSigner> for ClientCredential {
	fn from(signer: ClientSecretSigner) -> Self {
		Self::Signed(signer)
	}
}

/// Client registration for an [`AppleProvider`].
#[derive(Clone, Debug)]
pub struct AppleConfig {
	/// Services id (the OAuth 2.0 client id).
	pub client_id: String,
	/// Client secret source.
	pub credential: ClientCredential,
	/// Redirect URI registered with the provider.
	pub callback_url: Url,
	/// Requested scopes; any scope switches the response mode to `form_post`.
	pub scopes: ScopeList,
	/// Endpoints, defaulting to Apple's.
	pub descriptor: ProviderDescriptor,
	/// Expected `iss` claim of returned id_tokens.
	pub issuer: String,
}
impl AppleConfig {
	/// Creates a registration against the default endpoints with no scopes.
	pub fn new(
		client_id: impl Into<String>,
		credential: impl Into<ClientCredential>,
		callback_url: &str,
	) -> Result<Self> {
		let callback_url =
			Url::parse(callback_url).map_err(|source| ConfigError::InvalidCallback { source })?;

		Ok(Self {
			client_id: client_id.into(),
			credential: credential.into(),
			callback_url,
			scopes: ScopeList::default(),
			descriptor: Self::default_descriptor()?,
			issuer: APPLE_AUDIENCE.into(),
		})
	}

	/// Descriptor for Apple's production endpoints.
	pub fn default_descriptor() -> Result<ProviderDescriptor> {
		let parse = |url: &str| {
			Url::parse(url).map_err(|source| Error::from(ConfigError::InvalidEndpoint { source }))
		};
		let descriptor = ProviderDescriptor::builder()
			.authorization_endpoint(parse(APPLE_AUTHORIZATION_ENDPOINT)?)
			.token_endpoint(parse(APPLE_TOKEN_ENDPOINT)?)
			.support_grant(GrantType::AuthorizationCode)
			.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
			.build()
			.map_err(ConfigError::from)?;

		Ok(descriptor)
	}

	/// Replaces the requested scopes.
	pub fn with_scopes(mut self, scopes: ScopeList) -> Self {
		self.scopes = scopes;

		self
	}

	/// Replaces the endpoints.
	pub fn with_descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
		self.descriptor = descriptor;

		self
	}

	/// Replaces the expected id_token issuer.
	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = issuer.into();

		self
	}
}

/// Provider for the signed-assertion dialect.
pub struct AppleProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// HTTP client used for token (and optional profile) calls.
	pub http_client: Arc<C>,
	/// Client registration.
	pub config: AppleConfig,
	/// Clock used for expiry math and id_token freshness.
	pub clock: Arc<dyn Clock>,
	name: String,
}
impl<C> AppleProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a provider named `apple` that reuses the caller-provided transport.
	pub fn with_http_client(config: AppleConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			config,
			clock: clock::system_clock(),
			name: "apple".into(),
		}
	}

	/// Overrides the clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Decodes the id_token payload and checks its issuer and audience.
	fn id_token_claims(&self, id_token: &str) -> Result<Map<String, Value>> {
		let mut parts = id_token.split('.');
		let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(Error::validation(&self.name, "id_token is not a compact JWT")),
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(|_| Error::validation(&self.name, "id_token payload is not base64url"))?;
		let claims = user::parse_object(&self.name, &bytes)?;

		if user::string_field(&claims, "iss") != self.config.issuer {
			return Err(Error::validation(&self.name, "id_token issuer mismatch"));
		}

		let audience_matches = match claims.get("aud") {
			Some(Value::String(aud)) => aud == &self.config.client_id,
			Some(Value::Array(auds)) =>
				auds.iter().any(|aud| aud.as_str() == Some(self.config.client_id.as_str())),
			_ => false,
		};

		if !audience_matches {
			return Err(Error::validation(&self.name, "id_token audience mismatch"));
		}
		if user::string_field(&claims, "sub").is_empty() {
			return Err(Error::validation(&self.name, "id_token has no subject"));
		}

		Ok(claims)
	}

	fn check_expiry(&self, claims: &Map<String, Value>) -> Result<()> {
		let exp = claims
			.get("exp")
			.and_then(Value::as_i64)
			.ok_or_else(|| Error::validation(&self.name, "id_token has no expiry"))?;

		if exp <= self.clock.now().unix_timestamp() {
			Err(Error::validation(&self.name, "id_token has expired"))
		} else {
			Ok(())
		}
	}

	async fn exchange(&self, session: &mut AppleSession, params: &CallbackParams) -> Result<String> {
		dialect::require_grant(&self.name, &self.config.descriptor, GrantType::AuthorizationCode)?;

		let code = dialect::authorization_code(&self.name, params)?;
		let secret = self.config.credential.secret()?;
		let grant = TokenExchange::new(
			&self.name,
			&self.config.descriptor,
			&self.config.client_id,
			secret.expose(),
			&self.config.callback_url,
		)?
		.exchange_code(&*self.http_client, code, self.clock.now())
		.await?;

		if let Some(id_token) = grant.id_token.as_deref() {
			self.check_expiry(&self.id_token_claims(id_token)?)?;
		}

		session.apply(&grant);

		Ok(grant.access_token)
	}

	async fn fetch(&self, session: &AppleSession) -> Result<User> {
		dialect::require_credential(&self.name, &session.access_token, "accessToken")?;

		let mut user = User::new(&self.name);

		if let Some(endpoint) = self.config.descriptor.endpoints.profile.as_ref() {
			let raw = dialect::fetch_profile(
				&self.name,
				&*self.http_client,
				endpoint,
				&session.access_token,
				self.config.descriptor.quirks.profile_token_placement,
			)
			.await?;

			ProfileFields::default().apply(&raw, &mut user);

			user.raw_data = raw;
		} else {
			if session.id_token.is_empty() {
				return Err(Error::validation(
					&self.name,
					"no id_token was returned by the token endpoint",
				));
			}

			let claims = self.id_token_claims(&session.id_token)?;

			user.user_id = user::string_field(&claims, "sub");
			user.email = user::string_field(&claims, "email");
			user.raw_data = claims;
		}

		user.access_token = session.access_token.clone();
		user.refresh_token = session.refresh_token.clone();
		user.expires_at = session.expires_at;
		user.id_token = session.id_token.clone();

		Ok(user)
	}
}
#[cfg(feature = "reqwest")]
impl AppleProvider<ReqwestHttpClient> {
	/// Creates a provider backed by the default reqwest transport.
	pub fn new(config: AppleConfig) -> Self {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}
}
impl<C> Provider for AppleProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	type Session = AppleSession;

	fn name(&self) -> &str {
		&self.name
	}

	fn set_name(&mut self, name: String) {
		self.name = name;
	}

	fn begin_auth(&self, state: &str) -> Result<Self::Session> {
		obs::observe_sync(FlowStep::BeginAuth, &self.name, || {
			let extra: &[(&str, &str)] =
				if self.config.scopes.is_empty() { &[] } else { &[("response_mode", "form_post")] };
			let url = dialect::authorization_url(
				&self.config.descriptor,
				&self.config.client_id,
				&self.config.callback_url,
				&self.config.scopes,
				state,
				extra,
			);

			Ok(AppleSession { auth_url: url.into(), ..Default::default() })
		})
	}

	fn authorize<'a>(
		&'a self,
		session: &'a mut Self::Session,
		params: &'a CallbackParams,
	) -> ProviderFuture<'a, String> {
		Box::pin(obs::observe(FlowStep::Authorize, &self.name, self.exchange(session, params)))
	}

	fn fetch_user<'a>(&'a self, session: &'a Self::Session) -> ProviderFuture<'a, User> {
		Box::pin(obs::observe(FlowStep::FetchUser, &self.name, self.fetch(session)))
	}
}
impl<C> Debug for AppleProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppleProvider")
			.field("name", &self.name)
			.field("config", &self.config)
			.finish()
	}
}
