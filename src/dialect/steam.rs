//! OpenID 2.0 login against Steam.
//!
//! Steam issues positive assertions rather than tokens. `authorize` checks the assertion locally
//! (mode, `return_to`, signed-field coverage, claimed id shape, nonce freshness) and then asks the
//! provider to confirm it with a `check_authentication` request. The verified nonce stands in for
//! the access credential. Remembering spent nonces across requests is left to the host.

mod session;

pub use session::*;

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	clock::{self, Clock},
	dialect,
	error::ConfigError,
	http::{self, ProviderHttpClient},
	obs::{self, FlowStep},
	provider::{CallbackParams, Provider, ProviderFuture},
	user::{self, ProfileFields, User},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Default OpenID 2.0 login endpoint.
pub const STEAM_LOGIN_ENDPOINT: &str = "https://steamcommunity.com/openid/login";
/// Default player summaries endpoint.
pub const STEAM_SUMMARIES_ENDPOINT: &str =
	"https://api.steampowered.com/ISteamUser/GetPlayerSummaries/v0002/";
/// OpenID 2.0 namespace.
pub const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
/// Identifier asking the provider to choose the identity.
pub const OPENID_IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

const CLAIMED_ID_PATH: &str = "steamcommunity.com/openid/id/";
const SIGNED_FIELDS: [&str; 3] = ["claimed_id", "return_to", "response_nonce"];

/// [`SteamProvider`] specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestSteamProvider = SteamProvider<ReqwestHttpClient>;

/// Registration for a [`SteamProvider`].
#[derive(Clone, Debug)]
pub struct SteamConfig {
	/// Steam Web API key used for player summaries.
	pub api_key: Secret,
	/// Callback URL; `state` is appended to it to form `openid.return_to`.
	pub callback_url: Url,
	/// OpenID login endpoint.
	pub login_endpoint: Url,
	/// Player summaries endpoint.
	pub summaries_endpoint: Url,
	/// Oldest `openid.response_nonce` accepted, measured from its embedded timestamp.
	pub nonce_max_age: Duration,
}
impl SteamConfig {
	const DEFAULT_NONCE_MAX_AGE: Duration = Duration::minutes(5);

	/// Creates a registration against Steam's production endpoints.
	pub fn new(api_key: impl Into<Secret>, callback_url: &str) -> Result<Self> {
		let parse = |url: &str| {
			Url::parse(url).map_err(|source| Error::from(ConfigError::InvalidEndpoint { source }))
		};

		Ok(Self {
			api_key: api_key.into(),
			callback_url: Url::parse(callback_url)
				.map_err(|source| ConfigError::InvalidCallback { source })?,
			login_endpoint: parse(STEAM_LOGIN_ENDPOINT)?,
			summaries_endpoint: parse(STEAM_SUMMARIES_ENDPOINT)?,
			nonce_max_age: Self::DEFAULT_NONCE_MAX_AGE,
		})
	}

	/// Overrides the OpenID login endpoint.
	pub fn with_login_endpoint(mut self, url: Url) -> Self {
		self.login_endpoint = url;

		self
	}

	/// Overrides the player summaries endpoint.
	pub fn with_summaries_endpoint(mut self, url: Url) -> Self {
		self.summaries_endpoint = url;

		self
	}

	/// Overrides the nonce freshness window.
	pub fn with_nonce_max_age(mut self, max_age: Duration) -> Self {
		self.nonce_max_age = max_age;

		self
	}
}

#[derive(Debug, Deserialize)]
struct SummariesEnvelope {
	response: SummariesBody,
}

#[derive(Debug, Deserialize)]
struct SummariesBody {
	#[serde(default)]
	players: Vec<Map<String, Value>>,
}

/// Provider for the OpenID 2.0 dialect.
pub struct SteamProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// HTTP client used for verification and summary calls.
	pub http_client: Arc<C>,
	/// Registration.
	pub config: SteamConfig,
	/// Clock used for nonce freshness.
	pub clock: Arc<dyn Clock>,
	name: String,
}
impl<C> SteamProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a provider named `steam` that reuses the caller-provided transport.
	pub fn with_http_client(config: SteamConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			config,
			clock: clock::system_clock(),
			name: "steam".into(),
		}
	}

	/// Overrides the clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	fn check_nonce(&self, nonce: &str) -> Result<()> {
		let issued_at = nonce
			.get(..20)
			.and_then(|stamp| OffsetDateTime::parse(stamp, &Rfc3339).ok())
			.ok_or_else(|| {
				Error::validation(&self.name, "openid.response_nonce has no UTC timestamp")
			})?;
		let age = self.clock.now() - issued_at;

		if age > self.config.nonce_max_age || -age > self.config.nonce_max_age {
			Err(Error::validation(
				&self.name,
				"openid.response_nonce is outside the accepted window",
			))
		} else {
			Ok(())
		}
	}

	async fn verify(&self, session: &mut SteamSession, params: &CallbackParams) -> Result<String> {
		if session.callback_url.is_empty() {
			return Err(Error::precondition(format!(
				"{} cannot verify an assertion for a session without a CallbackURL",
				self.name
			)));
		}

		let field = |key: &str| params.get(key).unwrap_or_default();
		let mode = field("openid.mode");

		if mode != "id_res" {
			return Err(Error::validation(
				&self.name,
				format!("openid.mode must equal \"id_res\", got \"{mode}\""),
			));
		}
		if field("openid.return_to") != session.callback_url {
			return Err(Error::validation(
				&self.name,
				"openid.return_to does not match the session callback",
			));
		}

		let signed = field("openid.signed").split(',').collect::<Vec<_>>();

		if let Some(missing) = SIGNED_FIELDS.into_iter().find(|name| !signed.contains(name)) {
			return Err(Error::validation(
				&self.name,
				format!("openid.{missing} is not covered by the signature"),
			));
		}

		let steam_id = steam_id_from_claimed_id(field("openid.claimed_id"))
			.ok_or_else(|| Error::validation(&self.name, "invalid Steam ID pattern"))?;
		let nonce = field("openid.response_nonce");

		self.check_nonce(nonce)?;

		let mut form = BTreeMap::new();

		for key in ["openid.assoc_handle", "openid.signed", "openid.sig", "openid.ns"] {
			form.insert(key.to_owned(), field(key).to_owned());
		}
		for name in &signed {
			let key = format!("openid.{name}");
			let value = field(&key).to_owned();

			form.insert(key, value);
		}

		form.insert("openid.mode".into(), "check_authentication".into());

		let request = http::post_form(
			&self.config.login_endpoint,
			form.iter().map(|(key, value)| (key.as_str(), value.as_str())),
		)?;
		let response = http::send(&*self.http_client, request).await?;
		let body = String::from_utf8_lossy(response.body());

		if !response.status().is_success() {
			return Err(Error::Exchange {
				provider: self.name.clone(),
				status: Some(response.status().as_u16()),
				body: body.into_owned(),
			});
		}

		let fields =
			body.lines().filter_map(|line| line.split_once(':')).collect::<BTreeMap<_, _>>();

		if fields.get("ns") != Some(&OPENID_NS) {
			return Err(Error::validation(&self.name, "wrong ns in the verification response"));
		}
		if fields.get("is_valid") != Some(&"true") {
			return Err(Error::validation(&self.name, "provider did not confirm the assertion"));
		}

		session.steam_id = steam_id.to_owned();
		session.response_nonce = nonce.to_owned();

		Ok(session.response_nonce.clone())
	}

	async fn fetch(&self, session: &SteamSession) -> Result<User> {
		dialect::require_credential(&self.name, &session.steam_id, "SteamID")?;

		let mut url = self.config.summaries_endpoint.clone();

		url.query_pairs_mut()
			.append_pair("key", self.config.api_key.expose())
			.append_pair("steamids", &session.steam_id);

		let response = http::send(&*self.http_client, http::get_json(&url, None)?).await?;

		if !response.status().is_success() {
			return Err(Error::Fetch {
				provider: self.name.clone(),
				status: response.status().as_u16(),
			});
		}

		let envelope = user::parse_json::<SummariesEnvelope>(&self.name, response.body())?;
		let player = envelope.response.players.into_iter().next().ok_or_else(|| {
			Error::validation(&self.name, format!("no player summary for {}", session.steam_id))
		})?;
		let mut user = User::new(&self.name);

		player_fields().apply(&player, &mut user);

		user.access_token = session.response_nonce.clone();
		user.raw_data = player;

		Ok(user)
	}
}
#[cfg(feature = "reqwest")]
impl SteamProvider<ReqwestHttpClient> {
	/// Creates a provider backed by the default reqwest transport.
	pub fn new(config: SteamConfig) -> Self {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}
}
impl<C> Provider for SteamProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	type Session = SteamSession;

	fn name(&self) -> &str {
		&self.name
	}

	fn set_name(&mut self, name: String) {
		self.name = name;
	}

	fn begin_auth(&self, state: &str) -> Result<Self::Session> {
		obs::observe_sync(FlowStep::BeginAuth, &self.name, || {
			let mut return_to = self.config.callback_url.clone();

			if !state.is_empty() {
				return_to.query_pairs_mut().append_pair("state", state);
			}

			let realm = return_to.origin().ascii_serialization();
			let mut url = self.config.login_endpoint.clone();

			url.query_pairs_mut()
				.append_pair("openid.claimed_id", OPENID_IDENTIFIER_SELECT)
				.append_pair("openid.identity", OPENID_IDENTIFIER_SELECT)
				.append_pair("openid.mode", "checkid_setup")
				.append_pair("openid.ns", OPENID_NS)
				.append_pair("openid.realm", &realm)
				.append_pair("openid.return_to", return_to.as_str());

			Ok(SteamSession {
				auth_url: url.into(),
				callback_url: return_to.into(),
				..Default::default()
			})
		})
	}

	fn authorize<'a>(
		&'a self,
		session: &'a mut Self::Session,
		params: &'a CallbackParams,
	) -> ProviderFuture<'a, String> {
		Box::pin(obs::observe(FlowStep::Authorize, &self.name, self.verify(session, params)))
	}

	fn fetch_user<'a>(&'a self, session: &'a Self::Session) -> ProviderFuture<'a, User> {
		Box::pin(obs::observe(FlowStep::FetchUser, &self.name, self.fetch(session)))
	}
}
impl<C> Debug for SteamProvider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SteamProvider")
			.field("name", &self.name)
			.field("config", &self.config)
			.finish()
	}
}

/// Returns the decimal id of a `http(s)://steamcommunity.com/openid/id/<15-25 digits>` claim.
fn steam_id_from_claimed_id(claimed_id: &str) -> Option<&str> {
	let rest = claimed_id.strip_prefix("https://").or_else(|| claimed_id.strip_prefix("http://"))?;
	let id = rest.strip_prefix(CLAIMED_ID_PATH)?;

	if (15..=25).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit()) {
		Some(id)
	} else {
		None
	}
}

fn player_fields() -> ProfileFields {
	ProfileFields {
		user_id: "steamid".into(),
		// Steam never discloses an email address.
		email: String::new(),
		name: "realname".into(),
		nick_name: "personaname".into(),
		avatar_url: "avatarfull".into(),
		location: "loccountrycode".into(),
	}
}
