// self
use crate::obs::{FlowKind, FlowOutcome, SecurityEvent};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_rotor_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a security event via the global metrics recorder (when enabled).
pub fn record_security_event(event: &SecurityEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_rotor_security_total", "event" => event.as_str()).increment(1);

		if let SecurityEvent::ReplayDetected { .. } = event {
			metrics::counter!("token_rotor_replay_total").increment(1);
		}
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_flow_outcome(FlowKind::Rotate, FlowOutcome::Failure);
		record_security_event(&SecurityEvent::ClientRefreshTimedOut);
	}
}
