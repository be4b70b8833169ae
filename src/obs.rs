//! Optional observability helpers for provider steps.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `identity_broker.flow` with the `step` and
//!   `provider` fields.
//! - Enable `metrics` to increment the `identity_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `step` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Provider contract steps observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStep {
	/// Building the authorization URL.
	BeginAuth,
	/// Resuming a session with the callback payload.
	Authorize,
	/// Fetching the canonical user.
	FetchUser,
	/// Exchanging a refresh token.
	RefreshToken,
}
impl FlowStep {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowStep::BeginAuth => "begin_auth",
			FlowStep::Authorize => "authorize",
			FlowStep::FetchUser => "fetch_user",
			FlowStep::RefreshToken => "refresh_token",
		}
	}
}
impl Display for FlowStep {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a provider step.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the attempt, runs `fut` inside a [`FlowSpan`], and records the outcome.
pub(crate) async fn observe<T, Fut>(step: FlowStep, provider: &str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(step, provider);

	record_flow_outcome(step, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_result(step, &result);

	result
}

/// Synchronous counterpart of [`observe`].
pub(crate) fn observe_sync<T>(
	step: FlowStep,
	provider: &str,
	f: impl FnOnce() -> Result<T>,
) -> Result<T> {
	let _guard = FlowSpan::new(step, provider).entered();

	record_flow_outcome(step, FlowOutcome::Attempt);

	let result = f();

	record_result(step, &result);

	result
}

fn record_result<T>(step: FlowStep, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(step, FlowOutcome::Success),
		Err(_err) => {
			#[cfg(feature = "tracing")]
			::tracing::debug!(step = step.as_str(), error = %_err, "provider step failed");

			record_flow_outcome(step, FlowOutcome::Failure);
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn observe_sync_passes_results_through() {
		let ok = observe_sync(FlowStep::BeginAuth, "idp", || Ok(7));
		let err: Result<()> =
			observe_sync(FlowStep::BeginAuth, "idp", || Err(Error::precondition("nope")));

		assert_eq!(ok.expect("Closure result should pass through."), 7);
		assert!(matches!(err, Err(Error::Precondition { .. })));
	}

	#[tokio::test]
	async fn observe_passes_async_results_through() {
		let value = observe(FlowStep::FetchUser, "idp", async { Ok("done") })
			.await
			.expect("Future result should pass through.");

		assert_eq!(value, "done");
		assert_eq!(FlowStep::RefreshToken.to_string(), "refresh_token");
	}
}
