// self
use crate::{
	_prelude::*,
	session::{self, Session},
};

/// Session state for the OpenID 2.0 dialect.
///
/// Serializes as `{"AuthURL":…,"CallbackURL":…,"SteamID":…,"ResponseNonce":…}`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamSession {
	/// Login URL produced by `begin_auth`.
	#[serde(rename = "AuthURL")]
	pub auth_url: String,
	/// `openid.return_to` value the provider must echo back.
	#[serde(rename = "CallbackURL")]
	pub callback_url: String,
	/// Verified 64-bit Steam id, in decimal.
	#[serde(rename = "SteamID")]
	pub steam_id: String,
	/// `openid.response_nonce` of the verified assertion.
	#[serde(rename = "ResponseNonce")]
	pub response_nonce: String,
}
impl Session for SteamSession {
	fn auth_url(&self) -> Result<&str> {
		session::require_auth_url(&self.auth_url)
	}
}
impl Debug for SteamSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SteamSession")
			.field("auth_url", &self.auth_url)
			.field("callback_url", &self.callback_url)
			.field("steam_id", &self.steam_id)
			.field("response_nonce_set", &!self.response_nonce.is_empty())
			.finish()
	}
}
impl Display for SteamSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		session::write_json(self, f)
	}
}
