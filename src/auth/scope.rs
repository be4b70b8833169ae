//! Scope modeling helpers used when building authorization URLs.

// std
use std::slice::Iter;
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Deduplicated list of requested scopes.
///
/// Unlike token-cache keys, authorization requests are sensitive to the order a provider
/// documents its scopes in, so the list keeps first-seen order and only drops repeats.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeList(Vec<String>);
impl ScopeList {
	/// Creates a validated scope list from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut list = Vec::new();

		for scope in scopes {
			let scope = scope.into();

			if scope.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if scope.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope });
			}
			if !list.contains(&scope) {
				list.push(scope);
			}
		}

		Ok(Self(list))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are requested.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over the scopes in request order.
	pub fn iter(&self) -> ScopeIter<'_> {
		ScopeIter { inner: self.0.iter() }
	}

	/// Joins the scopes with the provider's delimiter, or `None` when empty.
	pub fn join(&self, delimiter: char) -> Option<String> {
		if self.is_empty() {
			return None;
		}

		let mut buf = String::new();

		for (idx, value) in self.0.iter().enumerate() {
			if idx > 0 {
				buf.push(delimiter);
			}

			buf.push_str(value);
		}

		Some(buf)
	}
}
impl TryFrom<Vec<String>> for ScopeList {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<ScopeList> for Vec<String> {
	fn from(value: ScopeList) -> Self {
		value.0
	}
}
impl Debug for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeList").field(&self.0).finish()
	}
}
impl Display for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0.join(" "))
	}
}
impl<'a> IntoIterator for &'a ScopeList {
	type IntoIter = ScopeIter<'a>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(String::as_str)
	}
}
