// self
use crate::{
	_prelude::*,
	exchange::TokenGrant,
	session::{self, Session, ZERO_INSTANT},
};

/// Session state for the signed-assertion dialect.
///
/// Carries the OAuth 2.0 fields plus the raw id_token the token endpoint returned.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleSession {
	/// Authorization URL produced by `begin_auth`.
	#[serde(rename = "AuthURL")]
	pub auth_url: String,
	/// Access token, empty until `authorize` succeeds.
	#[serde(rename = "AccessToken")]
	pub access_token: String,
	/// Refresh token, empty unless issued.
	#[serde(rename = "RefreshToken")]
	pub refresh_token: String,
	/// Access token expiry.
	#[serde(rename = "ExpiresAt", with = "session::instant")]
	pub expires_at: OffsetDateTime,
	/// Compact id_token from the token response.
	#[serde(rename = "IDToken")]
	pub id_token: String,
}
impl AppleSession {
	pub(crate) fn apply(&mut self, grant: &TokenGrant) {
		self.access_token = grant.access_token.clone();
		self.refresh_token = grant.refresh_token.clone().unwrap_or_default();
		self.expires_at = grant.expires_at.map_or(ZERO_INSTANT, session::instant::normalize);
		self.id_token = grant.id_token.clone().unwrap_or_default();
	}
}
impl Session for AppleSession {
	fn auth_url(&self) -> Result<&str> {
		session::require_auth_url(&self.auth_url)
	}
}
impl Default for AppleSession {
	fn default() -> Self {
		Self {
			auth_url: String::new(),
			access_token: String::new(),
			refresh_token: String::new(),
			expires_at: ZERO_INSTANT,
			id_token: String::new(),
		}
	}
}
impl Debug for AppleSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppleSession")
			.field("auth_url", &self.auth_url)
			.field("access_token_set", &!self.access_token.is_empty())
			.field("refresh_token_set", &!self.refresh_token.is_empty())
			.field("expires_at", &self.expires_at)
			.field("id_token_set", &!self.id_token.is_empty())
			.finish()
	}
}
impl Display for AppleSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		session::write_json(self, f)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_session_marshals_every_key() {
		assert_eq!(
			AppleSession::default().marshal(),
			"{\"AuthURL\":\"\",\"AccessToken\":\"\",\"RefreshToken\":\"\",\"ExpiresAt\":\"0001-01-01T00:00:00Z\",\"IDToken\":\"\"}"
		);
	}

	#[test]
	fn legacy_payload_without_id_token_loads() {
		let session = AppleSession::unmarshal(
			"{\"AuthURL\":\"https://appleid.apple.com/auth/authorize\",\"AccessToken\":\"1234567890\"}",
		)
		.expect("Partial payload should load.");

		assert_eq!(session.auth_url, "https://appleid.apple.com/auth/authorize");
		assert_eq!(session.access_token, "1234567890");
		assert_eq!(session.id_token, "");
		assert_eq!(AppleSession::unmarshal(&session.marshal()).expect("Round trip."), session);
	}

	#[test]
	fn display_matches_marshal() {
		let session = AppleSession { id_token: "a.b.c".into(), ..Default::default() };

		assert_eq!(session.to_string(), session.marshal());
		assert!(!format!("{session:?}").contains("a.b.c"));
	}
}
