//! Pluggable third-party login for Rust: one provider/session contract spanning OAuth 2.0
//! authorization-code, signed-assertion OAuth 2.0, and OpenID 2.0 identity providers.
//!
//! A host asks a [`provider::Provider`] to begin authentication, persists the returned
//! [`session::Session`] across the redirect (usually as [`session::Session::marshal`] text inside
//! a cookie), resumes it with the callback payload, and finally fetches a canonical
//! [`user::User`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod dialect;
pub mod error;
pub mod exchange;
pub mod http;
pub mod obs;
pub mod provider;
pub mod session;
pub mod user;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		provider::{GrantType, ProviderDescriptor},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose authorization, token, and profile endpoints live under `base`.
	pub fn mock_descriptor(base: &str, grants: &[GrantType]) -> ProviderDescriptor {
		let endpoint = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Failed to parse mock provider URL.")
		};

		ProviderDescriptor::builder()
			.authorization_endpoint(endpoint("/authorize"))
			.token_endpoint(endpoint("/token"))
			.profile_endpoint(endpoint("/userinfo"))
			.support_grants(grants.iter().copied())
			.build()
			.expect("Mock provider descriptor should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
