//! Canonical identity record and the typed extraction pass that fills it from provider payloads.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, session::ZERO_INSTANT};

/// Provider-agnostic representation of an authenticated user.
///
/// Built fresh by every `fetch_user` call and never mutated by the broker afterward.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	/// Display name of the provider that produced the record.
	pub provider: String,
	/// Provider-scoped user identifier.
	pub user_id: String,
	/// Email address, empty when the provider withholds it.
	pub email: String,
	/// Full name.
	pub name: String,
	/// Handle or login name.
	pub nick_name: String,
	/// Avatar image URL.
	pub avatar_url: String,
	/// Free-form location.
	pub location: String,
	/// Access token the record was fetched with.
	pub access_token: String,
	/// Refresh token, if one was issued.
	pub refresh_token: String,
	/// Access token expiry, [`ZERO_INSTANT`] when unknown.
	#[serde(with = "crate::session::instant")]
	pub expires_at: OffsetDateTime,
	/// Raw id_token, for dialects that receive one.
	pub id_token: String,
	/// Original profile payload, for fields the canonical shape omits.
	pub raw_data: Map<String, Value>,
}
impl User {
	/// Creates an empty record attributed to `provider`.
	pub fn new(provider: impl Into<String>) -> Self {
		Self {
			provider: provider.into(),
			user_id: String::new(),
			email: String::new(),
			name: String::new(),
			nick_name: String::new(),
			avatar_url: String::new(),
			location: String::new(),
			access_token: String::new(),
			refresh_token: String::new(),
			expires_at: ZERO_INSTANT,
			id_token: String::new(),
			raw_data: Map::new(),
		}
	}
}
impl Debug for User {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("User")
			.field("provider", &self.provider)
			.field("user_id", &self.user_id)
			.field("email", &self.email)
			.field("name", &self.name)
			.field("nick_name", &self.nick_name)
			.field("avatar_url", &self.avatar_url)
			.field("location", &self.location)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("raw_data", &self.raw_data)
			.finish()
	}
}

/// Payload keys mapped onto the canonical [`User`] fields.
///
/// Defaults follow the OpenID Connect userinfo claim names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
	/// Key holding the user identifier.
	pub user_id: String,
	/// Key holding the email address.
	pub email: String,
	/// Key holding the full name.
	pub name: String,
	/// Key holding the handle.
	pub nick_name: String,
	/// Key holding the avatar URL.
	pub avatar_url: String,
	/// Key holding the location.
	pub location: String,
}
impl ProfileFields {
	/// Copies every mapped field from `raw` into `user`, defaulting absent keys to `""`.
	pub fn apply(&self, raw: &Map<String, Value>, user: &mut User) {
		user.user_id = string_field(raw, &self.user_id);
		user.email = string_field(raw, &self.email);
		user.name = string_field(raw, &self.name);
		user.nick_name = string_field(raw, &self.nick_name);
		user.avatar_url = string_field(raw, &self.avatar_url);
		user.location = string_field(raw, &self.location);
	}
}
impl Default for ProfileFields {
	fn default() -> Self {
		Self {
			user_id: "sub".into(),
			email: "email".into(),
			name: "name".into(),
			nick_name: "preferred_username".into(),
			avatar_url: "picture".into(),
			location: "locale".into(),
		}
	}
}

/// Reads `key` as a string without failing.
///
/// Strings are copied, numbers and booleans are rendered in their JSON form, and anything else
/// (absent keys, `null`, arrays, objects) yields `""`.
pub fn string_field(raw: &Map<String, Value>, key: &str) -> String {
	match raw.get(key) {
		Some(Value::String(value)) => value.clone(),
		Some(Value::Number(value)) => value.to_string(),
		Some(Value::Bool(value)) => value.to_string(),
		_ => String::new(),
	}
}

/// Parses a JSON object body, attributing failures to `provider`.
pub(crate) fn parse_object(provider: &str, body: &[u8]) -> Result<Map<String, Value>> {
	parse_json(provider, body)
}

/// Parses a JSON body into `T`, keeping the path of the first mismatch.
pub(crate) fn parse_json<T>(provider: &str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| Error::Parse { provider: provider.to_owned(), source })
}
