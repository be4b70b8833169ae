//! Signed client assertions (ES256 JWTs) that stand in for a static client secret.
//!
//! [`make_secret`] is the pure builder: PKCS#8 P-256 key + identity claims + explicit
//! `iat`/`exp` in, compact `header.claims.signature` token out. [`ClientSecretSigner`] layers an
//! injectable [`Clock`], a lifetime, and a caller-configurable [`AssertionPolicy`] on top so a
//! provider can mint a fresh credential for every token exchange.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	clock::{self, Clock},
};

/// Token-issuing authority every assertion is addressed to.
pub const APPLE_AUDIENCE: &str = "https://appleid.apple.com";
/// Longest assertion lifetime Apple accepts (about six months).
pub const APPLE_MAX_LIFETIME: Duration = Duration::seconds(15_777_000);

/// Failures raised while building a signed client assertion.
#[derive(Debug, ThisError)]
pub enum AssertionError {
	/// PEM text does not decode to a PKCS#8 elliptic-curve private key.
	#[error("Private key is not a PKCS#8 elliptic-curve key.")]
	KeyParse {
		/// Underlying decoding failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Signing the encoded header and claims failed.
	#[error("Failed to sign the client assertion.")]
	Signing {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Expiry is not strictly after issued-at.
	#[error("Assertion expiry {expires_at} must be later than issued-at {issued_at}.")]
	InvalidLifetime {
		/// Issued-at instant (epoch seconds).
		issued_at: i64,
		/// Expiry instant (epoch seconds).
		expires_at: i64,
	},
	/// Requested lifetime exceeds the configured policy ceiling.
	#[error("Assertion lifetime of {lifetime} exceeds the allowed maximum of {max}.")]
	LifetimeExceedsPolicy {
		/// Requested lifetime.
		lifetime: Duration,
		/// Policy ceiling.
		max: Duration,
	},
}

/// Inputs for [`make_secret`].
#[derive(Clone, Debug)]
pub struct SecretParams {
	/// PKCS#8-encoded P-256 private key in PEM text form.
	pub pkcs8_private_key: Secret,
	/// Issuer identifier (Apple team id).
	pub team_id: String,
	/// Key identifier placed in the JWT header.
	pub key_id: String,
	/// Subject identifier (the client id / services id).
	pub client_id: String,
	/// Issued-at instant (epoch seconds).
	pub issued_at: i64,
	/// Expiry instant (epoch seconds).
	pub expires_at: i64,
}

/// Claims carried by a signed client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer (team id).
	pub iss: String,
	/// Issued-at (epoch seconds).
	pub iat: i64,
	/// Expiry (epoch seconds).
	pub exp: i64,
	/// Audience, always [`APPLE_AUDIENCE`].
	pub aud: String,
	/// Subject (client id).
	pub sub: String,
}

/// Builds a compact ES256 client assertion from explicit parameters.
///
/// No maximum lifetime is enforced here; see [`AssertionPolicy`] for that.
pub fn make_secret(params: &SecretParams) -> Result<String, AssertionError> {
	if params.expires_at <= params.issued_at {
		return Err(AssertionError::InvalidLifetime {
			issued_at: params.issued_at,
			expires_at: params.expires_at,
		});
	}

	let key = EncodingKey::from_ec_pem(params.pkcs8_private_key.expose().as_bytes())
		.map_err(|source| AssertionError::KeyParse { source })?;
	let mut header = Header::new(Algorithm::ES256);

	header.kid = Some(params.key_id.clone());

	let claims = AssertionClaims {
		iss: params.team_id.clone(),
		iat: params.issued_at,
		exp: params.expires_at,
		aud: APPLE_AUDIENCE.into(),
		sub: params.client_id.clone(),
	};

	jsonwebtoken::encode(&header, &claims, &key).map_err(|source| AssertionError::Signing { source })
}

/// Caller-owned ceiling on assertion lifetimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssertionPolicy {
	/// Longest lifetime allowed; `None` disables the check.
	pub max_lifetime: Option<Duration>,
}
impl AssertionPolicy {
	/// Policy that accepts any positive lifetime.
	pub const fn unbounded() -> Self {
		Self { max_lifetime: None }
	}

	/// Checks the lifetime against the ceiling.
	pub fn check(&self, lifetime: Duration) -> Result<(), AssertionError> {
		match self.max_lifetime {
			Some(max) if lifetime > max =>
				Err(AssertionError::LifetimeExceedsPolicy { lifetime, max }),
			_ => Ok(()),
		}
	}
}
impl Default for AssertionPolicy {
	fn default() -> Self {
		Self { max_lifetime: Some(APPLE_MAX_LIFETIME) }
	}
}

/// Mints short-lived client assertions on demand.
#[derive(Clone)]
pub struct ClientSecretSigner {
	pkcs8_private_key: Secret,
	team_id: String,
	key_id: String,
	client_id: String,
	lifetime: Duration,
	policy: AssertionPolicy,
	clock: Arc<dyn Clock>,
}
impl ClientSecretSigner {
	const DEFAULT_LIFETIME: Duration = Duration::minutes(5);

	/// Creates a signer with a five-minute lifetime, the default policy, and the system clock.
	pub fn new(
		pkcs8_private_key: impl Into<Secret>,
		team_id: impl Into<String>,
		key_id: impl Into<String>,
		client_id: impl Into<String>,
	) -> Self {
		Self {
			pkcs8_private_key: pkcs8_private_key.into(),
			team_id: team_id.into(),
			key_id: key_id.into(),
			client_id: client_id.into(),
			lifetime: Self::DEFAULT_LIFETIME,
			policy: AssertionPolicy::default(),
			clock: clock::system_clock(),
		}
	}

	/// Overrides the lifetime of minted assertions.
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime;

		self
	}

	/// Overrides the lifetime policy.
	pub fn with_policy(mut self, policy: AssertionPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Overrides the clock used for `iat`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Client id placed in the `sub` claim.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Parameters the signer would use if asked to sign at `now`.
	pub fn params_at(&self, now: OffsetDateTime) -> SecretParams {
		let issued_at = now.unix_timestamp();

		SecretParams {
			pkcs8_private_key: self.pkcs8_private_key.clone(),
			team_id: self.team_id.clone(),
			key_id: self.key_id.clone(),
			client_id: self.client_id.clone(),
			issued_at,
			expires_at: issued_at.saturating_add(self.lifetime.whole_seconds()),
		}
	}

	/// Mints a fresh assertion valid from the clock's current instant.
	pub fn sign(&self) -> Result<String, AssertionError> {
		self.policy.check(self.lifetime)?;

		make_secret(&self.params_at(self.clock.now()))
	}
}
impl Debug for ClientSecretSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSecretSigner")
			.field("team_id", &self.team_id)
			.field("key_id", &self.key_id)
			.field("client_id", &self.client_id)
			.field("lifetime", &self.lifetime)
			.field("policy", &self.policy)
			.finish()
	}
}
