//! Session contract shared by every dialect.
//!
//! A session is the mutable state of one login attempt. It must survive a stateless request
//! boundary, so each dialect serializes to a fixed-key JSON object: every key is always present,
//! strings default to `""`, timestamps default to [`ZERO_INSTANT`] (`0001-01-01T00:00:00Z`), and
//! keys appear in declaration order. Hosts that persist the text (cookies, KV stores) depend on
//! those key names staying stable.

// crates.io
use serde::de::DeserializeOwned;
use time::macros::datetime;
// self
use crate::_prelude::*;

/// Zero value for session and identity timestamps.
pub const ZERO_INSTANT: OffsetDateTime = datetime!(0001-01-01 0:00 UTC);

/// RFC 3339 timestamps that always format.
///
/// Instants are written in UTC and clamped to the four-digit years RFC 3339 can express, so a
/// session holding an odd offset or a far-off expiry still marshals.
pub mod instant {
	// crates.io
	use serde::{Deserializer, Serializer};
	use time::{UtcOffset, macros::datetime};
	// self
	use crate::_prelude::*;

	const MIN: OffsetDateTime = datetime!(0000-01-01 0:00 UTC);
	const MAX: OffsetDateTime = datetime!(9999-12-31 23:59:59.999999999 UTC);

	/// Moves `value` to UTC within the representable range.
	pub fn normalize(value: OffsetDateTime) -> OffsetDateTime {
		value.clamp(MIN, MAX).to_offset(UtcOffset::UTC)
	}

	/// Serializes a normalized instant.
	pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		time::serde::rfc3339::serialize(&normalize(*value), serializer)
	}

	/// Deserializes any RFC 3339 instant.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		time::serde::rfc3339::deserialize(deserializer)
	}
}

/// Serializable per-login-attempt state.
///
/// [`Display`] renders the same text as [`Session::marshal`].
pub trait Session
where
	Self: 'static + Clone + Debug + Default + Display + Send + Sync + Serialize + DeserializeOwned,
{
	/// Authorization URL the end user must visit.
	///
	/// Fails with [`Error::Precondition`] until `begin_auth` has populated it.
	fn auth_url(&self) -> Result<&str>;

	/// Canonical JSON form of the session.
	fn marshal(&self) -> String {
		self.to_string()
	}

	/// Rebuilds a session from [`Session::marshal`] output.
	///
	/// Missing keys fall back to their zero value so older, partial payloads still load.
	fn unmarshal(text: &str) -> Result<Self> {
		serde_json::from_str(text).map_err(Error::Deserialization)
	}
}

pub(crate) fn require_auth_url(auth_url: &str) -> Result<&str> {
	if auth_url.is_empty() {
		Err(Error::precondition("An AuthURL has not been set; the session is empty"))
	} else {
		Ok(auth_url)
	}
}

pub(crate) fn write_json<T>(value: &T, f: &mut Formatter) -> FmtResult
where
	T: Serialize,
{
	let text = serde_json::to_string(value).map_err(|_| std::fmt::Error)?;

	f.write_str(&text)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn zero_instant_formats_as_rfc3339_year_one() {
		let formatted = ZERO_INSTANT
			.format(&time::format_description::well_known::Rfc3339)
			.expect("Zero instant should format as RFC 3339.");

		assert_eq!(formatted, "0001-01-01T00:00:00Z");
	}

	#[test]
	fn instants_normalize_to_formattable_utc() {
		let odd_offset = datetime!(2024-05-01 12:30:15 +01:00:30);
		let normalized = instant::normalize(odd_offset);

		assert_eq!(normalized, odd_offset);
		assert!(normalized.offset().is_utc());

		let before_year_zero = instant::normalize(ZERO_INSTANT - Duration::days(800));

		assert_eq!(before_year_zero, datetime!(0000-01-01 0:00 UTC));
		assert!(before_year_zero.format(&time::format_description::well_known::Rfc3339).is_ok());
	}

	#[test]
	fn empty_auth_url_is_a_precondition_failure() {
		assert!(matches!(require_auth_url(""), Err(Error::Precondition { .. })));
		assert_eq!(require_auth_url("/foo").expect("Non-empty URL should pass."), "/foo");
	}
}
