// self
use crate::_prelude::*;

/// Where the access token travels when calling the profile endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTokenPlacement {
	#[default]
	/// `Authorization: Bearer <token>` header.
	Header,
	/// `access_token=<token>` query parameter.
	Query,
}

/// Provider-specific quirks that influence URL construction and profile calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
	/// How the profile endpoint expects the access token.
	pub profile_token_placement: ProfileTokenPlacement,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { scope_delimiter: ' ', profile_token_placement: ProfileTokenPlacement::Header }
	}
}
