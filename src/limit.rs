//! Per-endpoint rate-limit accounting: bucket state, keyed registry, and gate policies.

pub mod bucket;
pub mod registry;

pub use bucket::*;
pub use registry::*;

// self
use crate::_prelude::*;

/// Normalized endpoint key used to group requests into one rate-limit bucket.
///
/// Normalization strips the query string and fragment so, e.g., paginated calls to the same
/// resource share one bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointKey(String);
impl EndpointKey {
	/// Normalizes a route into a bucket key.
	pub fn new(route: impl AsRef<str>) -> Self {
		let route = route.as_ref();
		let end = route.find(['?', '#']).unwrap_or(route.len());

		Self(route[..end].to_owned())
	}

	/// Returns the normalized key string.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for EndpointKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// How the pipeline reacts when a bucket has no remaining capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LimitPolicy {
	/// Suspend the caller until the bucket's window ends, then proceed.
	#[default]
	Wait,
	/// Fail immediately with [`Error::PreemptiveRateLimit`](crate::error::Error::PreemptiveRateLimit).
	Throw,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn normalization_ignores_query_parameters() {
		assert_eq!(EndpointKey::new("/users/42/scores?limit=50&offset=100"), EndpointKey::new(
			"/users/42/scores"
		));
		assert_eq!(EndpointKey::new("/beatmaps#section").as_str(), "/beatmaps");
		assert_eq!(EndpointKey::new("/rankings").as_str(), "/rankings");
	}
}
