//! Keyed store of rate-limit buckets, created lazily per normalized endpoint.

// self
use crate::{
	_prelude::*,
	http::WireResponse,
	limit::{EndpointKey, RateLimitBucket},
};

/// Header carrying the window capacity.
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
/// Header carrying the calls left inside the current window.
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";

/// Decision produced by [`BucketRegistry::gate_at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
	/// The call may be sent immediately.
	Proceed,
	/// The bucket is exhausted; the window has this much time left.
	Deny {
		/// Remaining window duration.
		wait: Duration,
	},
}

/// Lazily-populated map of [`RateLimitBucket`] values keyed by normalized endpoint.
///
/// Buckets live for the lifetime of the owning pipeline and are never deleted; growth is
/// bounded in practice by the service's small fixed endpoint catalogue. All reads and
/// mutations happen under one short-lived sync lock—the registry never holds it across a
/// suspension point, so a caller waiting out one endpoint's window cannot block unrelated
/// endpoints.
#[derive(Debug)]
pub struct BucketRegistry {
	buckets: Mutex<HashMap<EndpointKey, RateLimitBucket>>,
	window: Duration,
	default_limit: u32,
}
impl BucketRegistry {
	/// Creates an empty registry with the given window length and conservative default limit.
	pub fn new(window: Duration, default_limit: u32) -> Self {
		Self { buckets: Mutex::new(HashMap::new()), window, default_limit }
	}

	/// Checks whether a call to `key` may proceed at `now`.
	///
	/// An expired bucket is reset to full capacity on the spot. The gate itself never
	/// consumes capacity; accounting happens in [`BucketRegistry::update_at`] once the
	/// exchange completes.
	pub fn gate_at(&self, key: &EndpointKey, now: OffsetDateTime) -> GateDecision {
		let mut buckets = self.buckets.lock();
		let bucket = buckets
			.entry(key.clone())
			.or_insert_with(|| RateLimitBucket::fresh(self.default_limit, self.window, now));

		if bucket.is_expired_at(now) {
			bucket.reset(self.default_limit, now);

			return GateDecision::Proceed;
		}
		if bucket.remaining > 0 {
			return GateDecision::Proceed;
		}

		GateDecision::Deny { wait: bucket.remaining_window_at(now) }
	}

	/// Applies one completed HTTP exchange to `key`'s bucket and returns the updated state.
	///
	/// Called unconditionally for every completed exchange, 2xx or not. Header-reported
	/// `limit`/`remaining` values win whenever present; when the response omits them the
	/// local `remaining` is decremented by one to approximate server-side accounting. An
	/// expired window is restarted first.
	pub fn update_at(
		&self,
		key: &EndpointKey,
		limit: Option<u32>,
		remaining: Option<u32>,
		now: OffsetDateTime,
	) -> RateLimitBucket {
		let mut buckets = self.buckets.lock();
		let bucket = buckets
			.entry(key.clone())
			.or_insert_with(|| RateLimitBucket::fresh(self.default_limit, self.window, now));

		if bucket.is_expired_at(now) {
			bucket.reset(limit.unwrap_or(self.default_limit), now);
		} else if let Some(limit) = limit {
			bucket.limit = limit;
		}

		match remaining {
			Some(remaining) => {
				// The header is authoritative even when it exceeds the known capacity.
				bucket.limit = bucket.limit.max(remaining);
				bucket.remaining = remaining;
			},
			None => bucket.consume_one(),
		}

		*bucket
	}

	/// Returns a copy of the bucket for `key`, if one has been created.
	pub fn snapshot(&self, key: &EndpointKey) -> Option<RateLimitBucket> {
		self.buckets.lock().get(key).copied()
	}

	/// Extracts `(limit, remaining)` from the rate-limit response headers.
	///
	/// Malformed values are treated as absent.
	pub fn parse_headers(response: &WireResponse) -> (Option<u32>, Option<u32>) {
		let parse = |name: &str| response.header(name).and_then(|raw| raw.trim().parse().ok());

		(parse(HEADER_LIMIT), parse(HEADER_REMAINING))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn registry() -> BucketRegistry {
		BucketRegistry::new(Duration::seconds(60), 60)
	}

	fn key(route: &str) -> EndpointKey {
		EndpointKey::new(route)
	}

	#[test]
	fn fresh_endpoint_proceeds_immediately() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);

		assert_eq!(registry.gate_at(&key("/users/1"), now), GateDecision::Proceed);
	}

	#[test]
	fn exhausted_bucket_denies_with_remaining_window() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let endpoint = key("/users/1");

		registry.update_at(&endpoint, Some(60), Some(0), now);

		let decision = registry.gate_at(&endpoint, now + Duration::seconds(15));

		assert_eq!(decision, GateDecision::Deny { wait: Duration::seconds(45) });
	}

	#[test]
	fn expired_bucket_resets_and_proceeds() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let endpoint = key("/users/1");

		registry.update_at(&endpoint, Some(60), Some(0), now);

		assert_eq!(registry.gate_at(&endpoint, now + Duration::seconds(61)), GateDecision::Proceed);
		assert_eq!(
			registry
				.snapshot(&endpoint)
				.expect("Bucket should exist after gating.")
				.remaining,
			60,
		);
	}

	#[test]
	fn header_values_win_over_local_accounting() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let endpoint = key("/scores");
		let bucket = registry.update_at(&endpoint, Some(60), Some(5), now);

		assert_eq!(bucket.limit, 60);
		assert_eq!(bucket.remaining, 5);
	}

	#[test]
	fn header_parsing_is_idempotent() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let endpoint = key("/scores");
		let first = registry.update_at(&endpoint, Some(60), Some(5), now);
		let second = registry.update_at(&endpoint, Some(60), Some(5), now);

		assert_eq!(first, second);
	}

	#[test]
	fn header_remaining_wins_even_beyond_the_known_limit() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let endpoint = key("/scores");
		let bucket = registry.update_at(&endpoint, None, Some(80), now);

		assert_eq!(bucket.remaining, 80);
		assert_eq!(bucket.limit, 80);
		assert_eq!(bucket.used(), 0);
	}

	#[test]
	fn absent_headers_decrement_locally() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);
		let endpoint = key("/scores");

		registry.update_at(&endpoint, Some(10), Some(10), now);

		let bucket = registry.update_at(&endpoint, None, None, now + Duration::seconds(1));

		assert_eq!(bucket.remaining, 9);

		// Saturates at zero rather than going negative.
		for _ in 0..20 {
			registry.update_at(&endpoint, None, None, now + Duration::seconds(2));
		}

		assert_eq!(
			registry
				.snapshot(&endpoint)
				.expect("Bucket should exist after updates.")
				.remaining,
			0,
		);
	}

	#[test]
	fn paginated_routes_share_one_bucket() {
		let registry = registry();
		let now = macros::datetime!(2025-06-01 12:00 UTC);

		registry.update_at(&key("/users/1/scores?offset=0"), Some(10), Some(3), now);

		let bucket = registry
			.snapshot(&key("/users/1/scores?offset=50"))
			.expect("Normalized keys should resolve to the same bucket.");

		assert_eq!(bucket.remaining, 3);
	}

	#[test]
	fn malformed_headers_fall_back_to_decrement() {
		let response = WireResponse::new(200, Vec::new())
			.with_header(HEADER_LIMIT, "sixty")
			.with_header(HEADER_REMAINING, " 12 ");
		let (limit, remaining) = BucketRegistry::parse_headers(&response);

		assert_eq!(limit, None);
		assert_eq!(remaining, Some(12));
	}
}
