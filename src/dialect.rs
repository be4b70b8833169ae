//! Concrete providers, one per protocol dialect.
//!
//! - [`generic`]: OAuth 2.0 authorization code with a static client secret.
//! - [`apple`]: OAuth 2.0 authorization code with a signed ES256 client assertion.
//! - [`steam`]: OpenID 2.0 positive assertions verified with `check_authentication`.

pub mod apple;
pub mod generic;
pub mod steam;

pub use apple::{AppleConfig, AppleProvider, AppleSession, ClientCredential};
pub use generic::{OAuth2Config, OAuth2Provider, OAuth2Session};
pub use steam::{SteamConfig, SteamProvider, SteamSession};

// self
use crate::{
	_prelude::*,
	auth::ScopeList,
	http::{self, ProviderHttpClient},
	provider::{CallbackParams, GrantType, ProfileTokenPlacement, ProviderDescriptor},
	user,
};

/// Builds an authorization-code request URL.
pub(crate) fn authorization_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	callback_url: &Url,
	scopes: &ScopeList,
	state: &str,
	extra: &[(&str, &str)],
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();

	{
		let mut pairs = url.query_pairs_mut();

		pairs
			.append_pair("client_id", client_id)
			.append_pair("redirect_uri", callback_url.as_str())
			.append_pair("response_type", "code");

		if let Some(scope) = scopes.join(descriptor.quirks.scope_delimiter) {
			pairs.append_pair("scope", &scope);
		}

		pairs.append_pair("state", state);

		for (key, value) in extra {
			pairs.append_pair(key, value);
		}
	}

	url
}

/// Extracts the authorization code from a callback, surfacing provider-reported errors.
pub(crate) fn authorization_code<'a>(
	provider: &str,
	params: &'a CallbackParams,
) -> Result<&'a str> {
	if let Some(error) = params.get("error") {
		let body = match params.get("error_description") {
			Some(description) => format!("{error}: {description}"),
			None => error.to_owned(),
		};

		return Err(Error::Exchange { provider: provider.to_owned(), status: None, body });
	}

	match params.get("code") {
		Some(code) if !code.is_empty() => Ok(code),
		_ => Err(Error::validation(provider, "callback is missing the authorization code")),
	}
}

/// Fails with [`Error::NotSupported`] when the descriptor leaves `grant` disabled.
pub(crate) fn require_grant(
	provider: &str,
	descriptor: &ProviderDescriptor,
	grant: GrantType,
) -> Result<()> {
	if descriptor.supports(grant) {
		Ok(())
	} else {
		Err(Error::not_supported(
			provider,
			match grant {
				GrantType::AuthorizationCode => "authorization code exchange",
				GrantType::RefreshToken => "token refresh",
			},
		))
	}
}

/// Fails with [`Error::Precondition`] when `credential` is empty.
pub(crate) fn require_credential(provider: &str, credential: &str, label: &str) -> Result<()> {
	if credential.is_empty() {
		Err(Error::precondition(format!("{provider} cannot get user information without {label}")))
	} else {
		Ok(())
	}
}

/// Calls a JSON profile endpoint with an access token and returns the payload object.
pub(crate) async fn fetch_profile<C>(
	provider: &str,
	http_client: &C,
	endpoint: &Url,
	access_token: &str,
	placement: ProfileTokenPlacement,
) -> Result<Map<String, Value>>
where
	C: ?Sized + ProviderHttpClient,
{
	let request = match placement {
		ProfileTokenPlacement::Header => http::get_json(endpoint, Some(access_token))?,
		ProfileTokenPlacement::Query => {
			let mut url = endpoint.clone();

			url.query_pairs_mut().append_pair("access_token", access_token);

			http::get_json(&url, None)?
		},
	};
	let response = http::send(http_client, request).await?;

	if !response.status().is_success() {
		return Err(Error::Fetch {
			provider: provider.to_owned(),
			status: response.status().as_u16(),
		});
	}

	user::parse_object(provider, response.body())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::GrantType;

	fn descriptor() -> ProviderDescriptor {
		ProviderDescriptor::builder()
			.authorization_endpoint(
				Url::parse("https://idp.example/auth/authorize?prompt=login")
					.expect("Authorization endpoint fixture should parse."),
			)
			.token_endpoint(
				Url::parse("https://idp.example/auth/token")
					.expect("Token endpoint fixture should parse."),
			)
			.support_grant(GrantType::AuthorizationCode)
			.build()
			.expect("Descriptor fixture should build.")
	}

	#[test]
	fn authorization_url_keeps_existing_query_and_appends_parameters() {
		let callback =
			Url::parse("https://app.example/callback").expect("Callback fixture should parse.");
		let scopes = ScopeList::new(["openid", "email"]).expect("Scopes should be valid.");
		let url = authorization_url(
			&descriptor(),
			"client-1",
			&callback,
			&scopes,
			"st",
			&[("response_mode", "form_post")],
		);
		let pairs = url.query_pairs().into_owned().collect::<Vec<_>>();

		assert_eq!(pairs[0], ("prompt".into(), "login".into()));
		assert!(pairs.contains(&("client_id".into(), "client-1".into())));
		assert!(pairs.contains(&("redirect_uri".into(), "https://app.example/callback".into())));
		assert!(pairs.contains(&("scope".into(), "openid email".into())));
		assert!(pairs.contains(&("state".into(), "st".into())));
		assert!(pairs.contains(&("response_mode".into(), "form_post".into())));
	}

	#[test]
	fn authorization_url_omits_empty_scope() {
		let callback =
			Url::parse("https://app.example/callback").expect("Callback fixture should parse.");
		let url =
			authorization_url(&descriptor(), "c", &callback, &ScopeList::default(), "s", &[]);

		assert!(!url.query_pairs().any(|(key, _)| key == "scope"));
	}

	#[test]
	fn authorization_code_reports_denials_and_missing_codes() {
		let denied = CallbackParams::new()
			.with("error", "access_denied")
			.with("error_description", "user cancelled");

		match authorization_code("idp", &denied) {
			Err(Error::Exchange { status: None, body, .. }) =>
				assert_eq!(body, "access_denied: user cancelled"),
			other => panic!("Unexpected result: {other:?}"),
		}

		assert!(matches!(
			authorization_code("idp", &CallbackParams::new()),
			Err(Error::Validation { .. })
		));
		assert_eq!(
			authorization_code("idp", &CallbackParams::new().with("code", "abc"))
				.expect("Code should be extracted."),
			"abc"
		);
	}

	#[test]
	fn missing_credentials_are_preconditions() {
		let err = require_credential("idp", "", "accessToken")
			.expect_err("Empty credential must be rejected.");

		assert_eq!(err.to_string(), "idp cannot get user information without accessToken.");
		assert!(require_credential("idp", "token", "accessToken").is_ok());
	}
}
