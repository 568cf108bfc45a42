//! Adjacent-duplicate suppression for log deliveries.

/// Remembers the last log identifier seen by one stream or query.
///
/// Suppression is adjacent-only: a log identifier may legitimately reappear
/// later (a reorg replay after other logs), and then it passes again. State
/// is owned by exactly one consumer; two streams never share a gate.
#[derive(Debug, Default)]
pub struct DedupState {
	last_seen: Option<String>,
}

impl DedupState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true when the log should be delivered.
	pub fn observe(&mut self, log_id: &str) -> bool {
		if self.last_seen.as_deref() == Some(log_id) {
			return false;
		}
		self.last_seen = Some(log_id.to_string());
		true
	}
}
