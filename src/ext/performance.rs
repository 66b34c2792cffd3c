//! Call contract for the native performance-point calculator.

// self
use crate::_prelude::*;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Fixed metric set returned by a performance calculation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceMetrics {
	/// Total performance-point value.
	pub total: f64,
	/// Aim component.
	pub aim: f64,
	/// Speed component.
	pub speed: f64,
	/// Accuracy component.
	pub accuracy: f64,
}

/// Raised when the native calculator rejects its input or fails internally.
#[derive(Debug, ThisError)]
#[error("Performance calculation failed.")]
pub struct PerformanceError {
	/// Underlying calculator failure.
	#[source]
	pub source: BoxError,
}
impl PerformanceError {
	/// Wraps a calculator-specific failure.
	pub fn new(src: impl 'static + Send + Sync + StdError) -> Self {
		Self { source: Box::new(src) }
	}
}

/// Pure function contract over the native performance-point library.
///
/// Implementations load whatever shared library their platform provides; the core only relies
/// on this signature: beatmap byte data in, a fixed set of floating-point metrics out, with no
/// side effects and no retained state between calls.
pub trait PerformanceCalculator
where
	Self: Send + Sync,
{
	/// Computes metrics for the given beatmap bytes, accuracy in `[0, 100]`, and mod flags.
	fn calculate(
		&self,
		beatmap: &[u8],
		accuracy: f64,
		mods: u32,
	) -> Result<PerformanceMetrics, PerformanceError>;
}
