//! Provider descriptor data shared by the OAuth 2.0 dialects.
//!
//! The module exposes validated metadata, supporting builder utilities, and grant helpers so
//! providers can describe their endpoints in a transport-agnostic way.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant helpers wired into provider descriptors.
pub mod grant;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use grant::*;
pub use quirks::*;

// self
use crate::_prelude::*;

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the end user is redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Profile (userinfo) endpoint; optional for dialects that read identity from an id_token.
	pub profile: Option<Url>,
}

/// Immutable provider descriptor consumed by the OAuth 2.0 dialects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Supported grant flags.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new()
	}

	/// Checks whether the descriptor supports a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}
}
