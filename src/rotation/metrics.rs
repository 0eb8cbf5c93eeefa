// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for server-side session operations.
#[derive(Debug, Default)]
pub struct RotationMetrics {
	issued: AtomicU64,
	rotations: AtomicU64,
	rejections: AtomicU64,
	replays: AtomicU64,
	revocations: AtomicU64,
}
impl RotationMetrics {
	/// Returns the number of sessions started via sign-in.
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Relaxed)
	}

	/// Returns the number of successful rotations.
	pub fn rotations(&self) -> u64 {
		self.rotations.load(Ordering::Relaxed)
	}

	/// Returns the number of refused refresh tokens, replays included.
	pub fn rejections(&self) -> u64 {
		self.rejections.load(Ordering::Relaxed)
	}

	/// Returns the number of detected replays.
	pub fn replays(&self) -> u64 {
		self.replays.load(Ordering::Relaxed)
	}

	/// Returns the number of records revoked by logout, revoke-all, or replay containment.
	pub fn revocations(&self) -> u64 {
		self.revocations.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issued(&self) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rotation(&self) {
		self.rotations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejection(&self) {
		self.rejections.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_replay(&self) {
		self.replays.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_revocations(&self, count: usize) {
		self.revocations.fetch_add(u64::try_from(count).unwrap_or(u64::MAX), Ordering::Relaxed);
	}
}
