// self
use crate::{
	_prelude::*,
	exchange::TokenGrant,
	session::{self, Session, ZERO_INSTANT},
};

/// Session state for the OAuth 2.0 authorization-code dialect.
///
/// Serializes as `{"AuthURL":…,"AccessToken":…,"RefreshToken":…,"ExpiresAt":…}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2Session {
	/// Authorization URL produced by `begin_auth`.
	#[serde(rename = "AuthURL")]
	pub auth_url: String,
	/// Access token, empty until `authorize` succeeds.
	#[serde(rename = "AccessToken")]
	pub access_token: String,
	/// Refresh token, empty unless the provider issued one.
	#[serde(rename = "RefreshToken")]
	pub refresh_token: String,
	/// Access token expiry, [`ZERO_INSTANT`] until a token response sets it.
	#[serde(rename = "ExpiresAt", with = "session::instant")]
	pub expires_at: OffsetDateTime,
}
impl OAuth2Session {
	pub(crate) fn apply(&mut self, grant: &TokenGrant) {
		self.access_token = grant.access_token.clone();
		self.refresh_token = grant.refresh_token.clone().unwrap_or_default();
		self.expires_at = grant.expires_at.map_or(ZERO_INSTANT, session::instant::normalize);
	}
}
impl Session for OAuth2Session {
	fn auth_url(&self) -> Result<&str> {
		session::require_auth_url(&self.auth_url)
	}
}
impl Default for OAuth2Session {
	fn default() -> Self {
		Self {
			auth_url: String::new(),
			access_token: String::new(),
			refresh_token: String::new(),
			expires_at: ZERO_INSTANT,
		}
	}
}
impl Debug for OAuth2Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth2Session")
			.field("auth_url", &self.auth_url)
			.field("access_token_set", &!self.access_token.is_empty())
			.field("refresh_token_set", &!self.refresh_token.is_empty())
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
impl Display for OAuth2Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		session::write_json(self, f)
	}
}
