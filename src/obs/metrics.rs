// self
use crate::obs::{FlowOutcome, FlowStep};

/// Records a step outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(step: FlowStep, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"identity_broker_flow_total",
			"step" => step.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (step, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_noop_without_metrics() {
		record_flow_outcome(FlowStep::Authorize, FlowOutcome::Failure);
	}
}
