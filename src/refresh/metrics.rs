// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
	/// Refresh requests, coalesced or not.
	pub attempts: u64,
	/// Requests that joined a refresh already in flight.
	pub joins: u64,
	/// Requests actually sent to the refresh endpoint.
	pub network_calls: u64,
	/// Requests that resolved to a new record.
	pub successes: u64,
	/// Requests that resolved to an error.
	pub failures: u64,
}

/// Lock-free counters kept by the refresh coordinator.
///
/// Joins count once per waiting caller, so `attempts == joins + network_calls` holds
/// whenever every attempt got past loading the stored record.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	joins: AtomicU64,
	network_calls: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Total refresh requests.
	pub fn attempts(&self) -> u64 {
		read(&self.attempts)
	}

	/// Requests that joined an in-flight refresh.
	pub fn joins(&self) -> u64 {
		read(&self.joins)
	}

	/// Requests sent over the network.
	pub fn network_calls(&self) -> u64 {
		read(&self.network_calls)
	}

	/// Requests that ended with a new record, joins included.
	pub fn successes(&self) -> u64 {
		read(&self.successes)
	}

	/// Requests that ended with an error, joins included.
	pub fn failures(&self) -> u64 {
		read(&self.failures)
	}

	/// Copies every counter at once.
	pub fn snapshot(&self) -> RefreshSnapshot {
		RefreshSnapshot {
			attempts: self.attempts(),
			joins: self.joins(),
			network_calls: self.network_calls(),
			successes: self.successes(),
			failures: self.failures(),
		}
	}

	pub(crate) fn record_attempt(&self) {
		bump(&self.attempts);
	}

	pub(crate) fn record_join(&self) {
		bump(&self.joins);
	}

	pub(crate) fn record_network_call(&self) {
		bump(&self.network_calls);
	}

	pub(crate) fn record_outcome(&self, ok: bool) {
		bump(if ok { &self.successes } else { &self.failures });
	}
}

fn read(counter: &AtomicU64) -> u64 {
	counter.load(Ordering::Relaxed)
}

fn bump(counter: &AtomicU64) {
	counter.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_events() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_network_call();
		metrics.record_join();
		metrics.record_outcome(true);
		metrics.record_outcome(false);

		assert_eq!(
			metrics.snapshot(),
			RefreshSnapshot { attempts: 2, joins: 1, network_calls: 1, successes: 1, failures: 1 }
		);
	}
}
