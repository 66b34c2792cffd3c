//! Sliding-window rate-limit bucket state for one endpoint.

// self
use crate::_prelude::*;

/// Rate-limit accounting for one normalized endpoint over one fixed-length window.
///
/// `remaining` is only meaningful inside `[window_started_at, window_started_at + window)`;
/// outside that interval the bucket counts as expired and must be reset before use.
/// `remaining` can never go negative: accounting saturates at zero, and would-be-negative
/// transitions are turned into gate denials instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitBucket {
	/// Window capacity last reported by the service (or the conservative default).
	pub limit: u32,
	/// Calls still allowed inside the current window.
	pub remaining: u32,
	/// Instant the current window started.
	pub window_started_at: OffsetDateTime,
	/// Fixed window length.
	pub window: Duration,
}
impl RateLimitBucket {
	/// Creates a fresh bucket with full capacity and a window starting now.
	pub fn fresh(limit: u32, window: Duration, now: OffsetDateTime) -> Self {
		Self { limit, remaining: limit, window_started_at: now, window }
	}

	/// Instant the current window ends.
	pub fn window_ends_at(&self) -> OffsetDateTime {
		self.window_started_at + self.window
	}

	/// Returns `true` once `now` falls outside the current window.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now < self.window_started_at || now >= self.window_ends_at()
	}

	/// Duration until the current window ends; zero once expired.
	pub fn remaining_window_at(&self, now: OffsetDateTime) -> Duration {
		let left = self.window_ends_at() - now;

		if left.is_negative() { Duration::ZERO } else { left }
	}

	/// Starts a new window with the provided capacity.
	pub(crate) fn reset(&mut self, limit: u32, now: OffsetDateTime) {
		*self = Self::fresh(limit, self.window, now);
	}

	/// Consumes one unit of capacity, saturating at zero.
	pub(crate) fn consume_one(&mut self) {
		self.remaining = self.remaining.saturating_sub(1);
	}

	/// Calls already spent inside the current window.
	pub fn used(&self) -> u32 {
		self.limit.saturating_sub(self.remaining)
	}
}
