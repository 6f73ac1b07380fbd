//! Live session registry with coalesced refresh signals.
//!
//! Connected clients subscribe here and receive [`RefreshSignal`]s telling
//! them which orders changed. Signals carry ids only, never order data, so
//! a client always re-reads fresh state after waking up. Bursts of changes
//! inside the coalescing window collapse into a single signal.

use atelier_types::RefreshSignal;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// One live session holding its signal channel and pending order ids.
struct Session {
	/// User the session belongs to.
	user: String,
	/// Channel the coalesced signals go out on.
	tx: mpsc::UnboundedSender<RefreshSignal>,
	/// Order ids collected since the last flush. Non-empty means a flush
	/// is already scheduled.
	pending: Mutex<HashSet<String>>,
}

/// Registry of live sessions keyed by session id.
pub struct SessionRegistry {
	sessions: DashMap<String, Arc<Session>>,
	coalesce_window: Duration,
}

impl SessionRegistry {
	/// Creates a registry with the given coalescing window.
	pub fn new(coalesce_window: Duration) -> Self {
		Self {
			sessions: DashMap::new(),
			coalesce_window,
		}
	}

	/// Registers a live session for a user.
	///
	/// Returns the session id and the receiving end of the signal channel.
	/// A user may hold several sessions at once, one per open client.
	pub fn subscribe(&self, user: &str) -> (String, mpsc::UnboundedReceiver<RefreshSignal>) {
		let session_id = uuid::Uuid::new_v4().to_string();
		let (tx, rx) = mpsc::unbounded_channel();
		self.sessions.insert(
			session_id.clone(),
			Arc::new(Session {
				user: user.to_string(),
				tx,
				pending: Mutex::new(HashSet::new()),
			}),
		);
		(session_id, rx)
	}

	/// Removes a session, dropping anything still pending for it.
	pub fn unsubscribe(&self, session_id: &str) {
		self.sessions.remove(session_id);
	}

	/// Number of currently registered sessions.
	pub fn session_count(&self) -> usize {
		self.sessions.len()
	}

	/// Records a touched order for every live session.
	///
	/// The first order inside a window schedules a flush; anything recorded
	/// until the flush fires rides along in the same signal.
	pub fn broadcast(self: &Arc<Self>, order_id: &str) {
		for entry in self.sessions.iter() {
			self.push_to_session(entry.key(), entry.value(), order_id);
		}
	}

	fn push_to_session(self: &Arc<Self>, session_id: &str, session: &Arc<Session>, order_id: &str) {
		let mut pending = match session.pending.lock() {
			Ok(guard) => guard,
			Err(_) => return,
		};
		let flush_needed = pending.is_empty();
		pending.insert(order_id.to_string());
		drop(pending);

		if flush_needed {
			let registry = Arc::clone(self);
			let session_id = session_id.to_string();
			let window = self.coalesce_window;
			tokio::spawn(async move {
				tokio::time::sleep(window).await;
				registry.flush(&session_id);
			});
		}
	}

	/// Sends the pending signal for one session.
	///
	/// A failed send means the receiver is gone, so the session is removed
	/// and its pending ids are dropped rather than retried.
	fn flush(&self, session_id: &str) {
		let Some(session) = self.sessions.get(session_id).map(|s| Arc::clone(s.value())) else {
			return;
		};

		let mut order_ids: Vec<String> = match session.pending.lock() {
			Ok(mut pending) => pending.drain().collect(),
			Err(_) => return,
		};
		if order_ids.is_empty() {
			return;
		}
		order_ids.sort();

		if session.tx.send(RefreshSignal { order_ids }).is_err() {
			tracing::debug!(
				user = %session.user,
				"Dropping live session with closed receiver"
			);
			self.sessions.remove(session_id);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn coalesces_a_burst_into_one_signal() {
		let registry = Arc::new(SessionRegistry::new(Duration::from_millis(300)));
		let (_id, mut rx) = registry.subscribe("maryam");

		registry.broadcast("order-a");
		registry.broadcast("order-b");
		registry.broadcast("order-a");

		let signal = rx.recv().await.unwrap();
		assert_eq!(signal.order_ids, vec!["order-a", "order-b"]);

		// Nothing else queued
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn separate_windows_produce_separate_signals() {
		let registry = Arc::new(SessionRegistry::new(Duration::from_millis(300)));
		let (_id, mut rx) = registry.subscribe("maryam");

		registry.broadcast("order-a");
		let first = rx.recv().await.unwrap();
		assert_eq!(first.order_ids, vec!["order-a"]);

		registry.broadcast("order-b");
		let second = rx.recv().await.unwrap();
		assert_eq!(second.order_ids, vec!["order-b"]);
	}

	#[tokio::test(start_paused = true)]
	async fn every_session_gets_the_signal() {
		let registry = Arc::new(SessionRegistry::new(Duration::from_millis(300)));
		let (_id1, mut rx1) = registry.subscribe("maryam");
		let (_id2, mut rx2) = registry.subscribe("omid");

		registry.broadcast("order-a");

		assert_eq!(rx1.recv().await.unwrap().order_ids, vec!["order-a"]);
		assert_eq!(rx2.recv().await.unwrap().order_ids, vec!["order-a"]);
	}

	#[tokio::test(start_paused = true)]
	async fn closed_receiver_drops_the_session() {
		let registry = Arc::new(SessionRegistry::new(Duration::from_millis(300)));
		let (_id, rx) = registry.subscribe("maryam");
		drop(rx);

		registry.broadcast("order-a");
		tokio::time::sleep(Duration::from_millis(600)).await;

		assert_eq!(registry.session_count(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn unsubscribe_drops_pending_ids() {
		let registry = Arc::new(SessionRegistry::new(Duration::from_millis(300)));
		let (id, mut rx) = registry.subscribe("maryam");

		registry.broadcast("order-a");
		registry.unsubscribe(&id);
		tokio::time::sleep(Duration::from_millis(600)).await;

		assert!(rx.try_recv().is_err());
	}
}
