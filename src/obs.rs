//! Structured pipeline events and optional observability helpers.
//!
//! The pipeline never formats or persists logs itself: every gate decision, bucket update,
//! and drift report is delivered as a [`PipelineEvent`] to the configured [`EventSink`].
//!
//! # Feature Flags
//!
//! - Enable `tracing` to get [`TracingSink`] plus spans named `statline.request` with the
//!   `endpoint` and `stage` fields.
//! - Enable `metrics` to increment the `statline_request_total` counter for every
//!   attempt/success/failure, labeled by `endpoint` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, limit::EndpointKey};

/// Outcome of one rate-limit gate evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOutcome {
	/// The call proceeded immediately.
	Proceed,
	/// The caller was suspended until the window ended.
	Wait,
	/// The call was refused pre-emptively.
	Throw,
}
impl GateOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateOutcome::Proceed => "proceed",
			GateOutcome::Wait => "wait",
			GateOutcome::Throw => "throw",
		}
	}
}
impl Display for GateOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Structured event emitted by the pipeline to the logging collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
	/// A rate-limit gate decision was made.
	Gate {
		/// Endpoint the decision applies to.
		endpoint: EndpointKey,
		/// Decision outcome.
		outcome: GateOutcome,
		/// Wait duration incurred or refused, when the bucket was exhausted.
		wait: Option<Duration>,
	},
	/// A bucket was updated from a completed exchange.
	BucketUpdate {
		/// Endpoint whose bucket changed.
		endpoint: EndpointKey,
		/// Calls spent inside the current window.
		used: u32,
		/// Window capacity.
		limit: u32,
	},
	/// A response carried fields the target type did not recognize.
	Drift {
		/// Rust type the body was decoded into.
		type_name: &'static str,
		/// Endpoint the response came from.
		endpoint: EndpointKey,
		/// Deduplicated drifted field names.
		fields: Vec<String>,
	},
}

/// Abstract sink receiving structured pipeline events.
///
/// Storage and formatting are the implementor's concern; implementations must be cheap and
/// non-blocking since they run inline with request processing.
pub trait EventSink
where
	Self: Send + Sync,
{
	/// Delivers one event.
	fn record(&self, event: PipelineEvent);
}

/// Sink that drops every event; the default for pipelines built without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;
impl EventSink for NullSink {
	fn record(&self, _event: PipelineEvent) {}
}

/// Sink that forwards events to `tracing` at debug level.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;
#[cfg(feature = "tracing")]
impl EventSink for TracingSink {
	fn record(&self, event: PipelineEvent) {
		match event {
			PipelineEvent::Gate { endpoint, outcome, wait } => {
				::tracing::debug!(
					endpoint = %endpoint,
					outcome = %outcome,
					wait_ms = wait.map(|w| w.whole_milliseconds() as i64),
					"rate-limit gate decision",
				);
			},
			PipelineEvent::BucketUpdate { endpoint, used, limit } => {
				::tracing::debug!(endpoint = %endpoint, used, limit, "bucket update");
			},
			PipelineEvent::Drift { type_name, endpoint, fields } => {
				::tracing::warn!(
					type_name,
					endpoint = %endpoint,
					fields = ?fields,
					"response schema drift detected",
				);
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn null_sink_accepts_events() {
		NullSink.record(PipelineEvent::Gate {
			endpoint: EndpointKey::new("/users/1"),
			outcome: GateOutcome::Proceed,
			wait: None,
		});
	}

	#[test]
	fn gate_outcome_labels_are_stable() {
		assert_eq!(GateOutcome::Proceed.as_str(), "proceed");
		assert_eq!(GateOutcome::Wait.to_string(), "wait");
		assert_eq!(GateOutcome::Throw.as_str(), "throw");
	}
}
