//! OAuth 2.0 authorization-code providers authenticated with a static client secret.

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, Secret},
	clock::{self, Clock},
	dialect,
	error::ConfigError,
	exchange::{TokenExchange, TokenGrant},
	http::ProviderHttpClient,
	obs::{self, FlowStep},
	provider::{CallbackParams, GrantType, Provider, ProviderDescriptor, ProviderFuture},
	user::{ProfileFields, User},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// [`OAuth2Provider`] specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestOAuth2Provider = OAuth2Provider<ReqwestHttpClient>;

/// Client registration for an OAuth 2.0 provider.
#[derive(Clone, Debug)]
pub struct OAuth2Config {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Static client secret; empty for public clients.
	pub client_secret: Secret,
	/// Redirect URI registered with the provider.
	pub callback_url: Url,
	/// Scopes requested in the authorization URL.
	pub scopes: ScopeList,
	/// Payload keys mapped onto [`User`].
	pub profile_fields: ProfileFields,
}
impl OAuth2Config {
	/// Creates a registration with no scopes and the OpenID Connect profile mapping.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
		callback_url: &str,
	) -> Result<Self> {
		let callback_url =
			Url::parse(callback_url).map_err(|source| ConfigError::InvalidCallback { source })?;

		Ok(Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			callback_url,
			scopes: ScopeList::default(),
			profile_fields: ProfileFields::default(),
		})
	}

	/// Replaces the requested scopes.
	pub fn with_scopes(mut self, scopes: ScopeList) -> Self {
		self.scopes = scopes;

		self
	}

	/// Replaces the profile key mapping.
	pub fn with_profile_fields(mut self, fields: ProfileFields) -> Self {
		self.profile_fields = fields;

		self
	}
}

/// Generic OAuth 2.0 authorization-code provider.
///
/// Endpoints and quirks come from a validated [`ProviderDescriptor`]; refresh is offered when the
/// descriptor enables [`GrantType::RefreshToken`].
pub struct OAuth2Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// HTTP client used for token and profile calls.
	pub http_client: Arc<C>,
	/// Endpoints, grants, and quirks.
	pub descriptor: ProviderDescriptor,
	/// Client registration.
	pub config: OAuth2Config,
	/// Clock used to turn `expires_in` into an absolute expiry.
	pub clock: Arc<dyn Clock>,
	name: String,
}
impl<C> OAuth2Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a provider that reuses the caller-provided transport.
	pub fn with_http_client(
		name: impl Into<String>,
		descriptor: ProviderDescriptor,
		config: OAuth2Config,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			descriptor,
			config,
			clock: clock::system_clock(),
			name: name.into(),
		}
	}

	/// Overrides the clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	fn token_exchange(&self) -> Result<TokenExchange<'_>> {
		TokenExchange::new(
			&self.name,
			&self.descriptor,
			&self.config.client_id,
			self.config.client_secret.expose(),
			&self.config.callback_url,
		)
	}

	async fn fetch(&self, session: &OAuth2Session) -> Result<User> {
		dialect::require_credential(&self.name, &session.access_token, "accessToken")?;

		let endpoint = self
			.descriptor
			.endpoints
			.profile
			.as_ref()
			.ok_or_else(|| Error::not_supported(&self.name, "profile lookup"))?;
		let raw = dialect::fetch_profile(
			&self.name,
			&*self.http_client,
			endpoint,
			&session.access_token,
			self.descriptor.quirks.profile_token_placement,
		)
		.await?;
		let mut user = User::new(&self.name);

		user.access_token = session.access_token.clone();
		user.refresh_token = session.refresh_token.clone();
		user.expires_at = session.expires_at;

		self.config.profile_fields.apply(&raw, &mut user);

		user.raw_data = raw;

		Ok(user)
	}
}
#[cfg(feature = "reqwest")]
impl OAuth2Provider<ReqwestHttpClient> {
	/// Creates a provider backed by the default reqwest transport.
	pub fn new(
		name: impl Into<String>,
		descriptor: ProviderDescriptor,
		config: OAuth2Config,
	) -> Self {
		Self::with_http_client(name, descriptor, config, ReqwestHttpClient::default())
	}
}
impl<C> Provider for OAuth2Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	type Session = OAuth2Session;

	fn name(&self) -> &str {
		&self.name
	}

	fn set_name(&mut self, name: String) {
		self.name = name;
	}

	fn begin_auth(&self, state: &str) -> Result<Self::Session> {
		obs::observe_sync(FlowStep::BeginAuth, &self.name, || {
			let url = dialect::authorization_url(
				&self.descriptor,
				&self.config.client_id,
				&self.config.callback_url,
				&self.config.scopes,
				state,
				&[],
			);

			Ok(OAuth2Session { auth_url: url.into(), ..Default::default() })
		})
	}

	fn authorize<'a>(
		&'a self,
		session: &'a mut Self::Session,
		params: &'a CallbackParams,
	) -> ProviderFuture<'a, String> {
		Box::pin(obs::observe(FlowStep::Authorize, &self.name, async move {
			dialect::require_grant(&self.name, &self.descriptor, GrantType::AuthorizationCode)?;

			let code = dialect::authorization_code(&self.name, params)?;
			let grant = self
				.token_exchange()?
				.exchange_code(&*self.http_client, code, self.clock.now())
				.await?;

			session.apply(&grant);

			Ok(grant.access_token)
		}))
	}

	fn fetch_user<'a>(&'a self, session: &'a Self::Session) -> ProviderFuture<'a, User> {
		Box::pin(obs::observe(FlowStep::FetchUser, &self.name, self.fetch(session)))
	}

	fn refresh_token_available(&self) -> bool {
		self.descriptor.supports(GrantType::RefreshToken)
	}

	fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> ProviderFuture<'a, TokenGrant> {
		Box::pin(obs::observe(FlowStep::RefreshToken, &self.name, async move {
			dialect::require_grant(&self.name, &self.descriptor, GrantType::RefreshToken)?;

			if refresh_token.is_empty() {
				return Err(Error::precondition(format!(
					"{} cannot refresh without a refresh token",
					self.name
				)));
			}

			self.token_exchange()?.refresh(&*self.http_client, refresh_token, self.clock.now()).await
		}))
	}
}
impl<C> Debug for OAuth2Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Provider")
			.field("name", &self.name)
			.field("descriptor", &self.descriptor)
			.field("config", &self.config)
			.finish()
	}
}
