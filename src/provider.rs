//! The provider contract every dialect implements, plus descriptor data shared by the
//! OAuth 2.0 dialects.
//!
//! A provider walks one login attempt through `Fresh -> AuthorizationIssued -> Authorized ->
//! UserFetched`: [`Provider::begin_auth`] returns a session carrying the authorization URL,
//! [`Provider::authorize`] resumes it with the callback payload, and [`Provider::fetch_user`]
//! turns the authorized session into a [`User`]. Providers are immutable after construction
//! (apart from their display name) and can be shared across concurrent flows; a single session
//! must only be driven by one call at a time.

pub mod descriptor;

pub use descriptor::*;

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, exchange::TokenGrant, session::Session, user::User};

/// Boxed future returned by [`Provider`] steps that may touch the network.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

const STATE_LEN: usize = 32;

/// Authentication contract for one identity service.
pub trait Provider
where
	Self: Send + Sync,
{
	/// Dialect-specific session shape.
	type Session: Session;

	/// Name the host registered the provider under.
	fn name(&self) -> &str;

	/// Rebinds the display name, e.g. to register two instances of one provider type.
	fn set_name(&mut self, name: String);

	/// Builds the authorization URL for `state` and returns a session holding only that URL.
	///
	/// Never contacts the network.
	fn begin_auth(&self, state: &str) -> Result<Self::Session>;

	/// Resumes `session` with the provider's callback payload.
	///
	/// Returns the access credential (the access token, or the response nonce for OpenID 2.0).
	/// The session is only mutated when the exchange succeeds.
	fn authorize<'a>(
		&'a self,
		session: &'a mut Self::Session,
		params: &'a CallbackParams,
	) -> ProviderFuture<'a, String>;

	/// Fetches the canonical identity for an authorized session.
	///
	/// Fails with [`Error::Precondition`] without any network call when the session carries no
	/// access credential.
	fn fetch_user<'a>(&'a self, session: &'a Self::Session) -> ProviderFuture<'a, User>;

	/// Whether [`Provider::refresh_token`] is supported.
	fn refresh_token_available(&self) -> bool {
		false
	}

	/// Exchanges a refresh token for a new access credential.
	fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> ProviderFuture<'a, TokenGrant> {
		let _ = refresh_token;
		let err = Error::not_supported(self.name(), "token refresh");

		Box::pin(async move { Err(err) })
	}

	/// Rebuilds a session from its serialized form.
	fn unmarshal_session(&self, text: &str) -> Result<Self::Session> {
		Self::Session::unmarshal(text)
	}
}

/// Parameters delivered to the callback URL (query string or form body).
///
/// Repeated keys keep their first value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams(BTreeMap<String, String>);
impl CallbackParams {
	/// Creates an empty parameter set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses an `application/x-www-form-urlencoded` query string or body.
	pub fn from_query(query: &str) -> Self {
		url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()).collect()
	}

	/// Adds or replaces a parameter.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.0.insert(key.into(), value.into());

		self
	}

	/// Returns the value for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	/// Iterates over all parameters in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
	}

	/// Compares the returned `state` with the value the host issued.
	pub fn verify_state(&self, expected: &str) -> Result<()> {
		if self.get("state") == Some(expected) {
			Ok(())
		} else {
			Err(Error::Validation {
				provider: "host".into(),
				reason: "authorization state mismatch".into(),
			})
		}
	}
}
impl<K, V> FromIterator<(K, V)> for CallbackParams
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut map = BTreeMap::new();

		for (key, value) in iter {
			map.entry(key.into()).or_insert_with(|| value.into());
		}

		Self(map)
	}
}

/// Generates a random anti-forgery `state` value.
pub fn generate_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}
