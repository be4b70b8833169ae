//! Injectable time sources for time-bound claims, token expiry, and nonce freshness checks.

// self
use crate::_prelude::*;

/// Source of the current instant.
///
/// Providers and the client-secret signer never read the wall clock directly; they ask their
/// configured clock so tests can pin time.
pub trait Clock
where
	Self: Debug + Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall-clock source backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Clock pinned to a single instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub OffsetDateTime);
impl FixedClock {
	/// Pins the clock to the provided Unix timestamp (seconds).
	pub fn from_unix(secs: i64) -> Result<Self, time::error::ComponentRange> {
		OffsetDateTime::from_unix_timestamp(secs).map(Self)
	}
}
impl Clock for FixedClock {
	fn now(&self) -> OffsetDateTime {
		self.0
	}
}

/// Shared handle to the default wall clock.
pub fn system_clock() -> Arc<dyn Clock> {
	Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn fixed_clock_returns_pinned_instant() {
		let clock = FixedClock::from_unix(1_570_636_633).expect("Timestamp should be in range.");

		assert_eq!(clock.now().unix_timestamp(), 1_570_636_633);
		assert_eq!(clock.now(), clock.now());
	}
}
