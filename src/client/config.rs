// self
use crate::_prelude::*;

/// Timing knobs for [`RefreshCoordinator`](crate::client::RefreshCoordinator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
	/// Window before expiry in which a credential is refreshed before sending.
	pub refresh_margin: Duration,
	/// Deadline for one refresh call; exceeding it counts as a failed refresh.
	pub refresh_timeout: Duration,
}
impl CoordinatorConfig {
	const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(30);
	const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(10);

	/// Overrides the refresh margin (defaults to 30 seconds). Negative values clamp to zero.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the refresh deadline (defaults to 10 seconds). Negative values clamp to zero.
	pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}

	pub(crate) fn refresh_deadline(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.refresh_timeout).unwrap_or_default()
	}
}
impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self {
			refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
			refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
		}
	}
}
