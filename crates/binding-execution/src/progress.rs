//! Per-invocation progress reporting.
//!
//! Every invocation hands back a [`ProgressHandle`] immediately; the pipeline
//! drives it from a spawned task through a [`ProgressEmitter`]. The handle is
//! an explicit state machine: the transaction hash fires at most once, a
//! single terminal event (resolved or failed) follows it, and subscribers who
//! attach after the fact receive the cached events exactly once.

use crate::error::ExecutionError;
use alloy_primitives::B256;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// One observable step of an invocation.
#[derive(Debug)]
pub enum ProgressEvent<T> {
	/// The transaction was accepted by the node under this hash.
	TransactionHash(B256),
	/// Terminal success.
	Resolved(Arc<T>),
	/// Terminal failure.
	Failed(Arc<ExecutionError>),
}

impl<T> Clone for ProgressEvent<T> {
	fn clone(&self) -> Self {
		match self {
			ProgressEvent::TransactionHash(hash) => ProgressEvent::TransactionHash(*hash),
			ProgressEvent::Resolved(value) => ProgressEvent::Resolved(value.clone()),
			ProgressEvent::Failed(error) => ProgressEvent::Failed(error.clone()),
		}
	}
}

enum State<T> {
	Pending,
	Resolved(Arc<T>),
	Rejected(Arc<ExecutionError>),
}

struct Inner<T> {
	state: State<T>,
	transaction_hash: Option<B256>,
	listeners: Vec<mpsc::UnboundedSender<ProgressEvent<T>>>,
}

/// Observer side of an invocation's progress.
pub struct ProgressHandle<T> {
	inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ProgressHandle<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

/// Emitter side; held only by the invocation's pipeline task.
pub struct ProgressEmitter<T> {
	inner: Arc<Mutex<Inner<T>>>,
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
	inner.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T> ProgressHandle<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				state: State::Pending,
				transaction_hash: None,
				listeners: Vec::new(),
			})),
		}
	}

	pub fn emitter(&self) -> ProgressEmitter<T> {
		ProgressEmitter {
			inner: self.inner.clone(),
		}
	}

	/// The recorded transaction hash, if one has fired.
	pub fn transaction_hash(&self) -> Option<B256> {
		lock(&self.inner).transaction_hash
	}

	/// Subscribes to progress events with replay.
	///
	/// A subscriber attaching after events already fired receives the cached
	/// hash (if any) followed by the terminal event, each exactly once. The
	/// channel closes after the terminal event.
	pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProgressEvent<T>> {
		let (tx, rx) = mpsc::unbounded_channel();
		let mut inner = lock(&self.inner);
		if let Some(hash) = inner.transaction_hash {
			let _ = tx.send(ProgressEvent::TransactionHash(hash));
		}
		match &inner.state {
			State::Pending => inner.listeners.push(tx),
			State::Resolved(value) => {
				let _ = tx.send(ProgressEvent::Resolved(value.clone()));
			}
			State::Rejected(error) => {
				let _ = tx.send(ProgressEvent::Failed(error.clone()));
			}
		}
		rx
	}

	/// Awaits the terminal state. May be called any number of times.
	pub async fn wait(&self) -> Result<Arc<T>, Arc<ExecutionError>> {
		let mut events = self.subscribe();
		while let Some(event) = events.recv().await {
			match event {
				ProgressEvent::TransactionHash(_) => {}
				ProgressEvent::Resolved(value) => return Ok(value),
				ProgressEvent::Failed(error) => return Err(error),
			}
		}
		Err(Arc::new(ExecutionError::Submission(
			"invocation dropped before completion".to_string(),
		)))
	}
}

impl<T> Default for ProgressHandle<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> ProgressEmitter<T> {
	/// Records the transaction hash and notifies subscribers.
	///
	/// Fires at most once; calls after the first, or after a terminal state,
	/// are ignored.
	pub fn set_transaction_hash(&self, hash: B256) {
		let mut inner = lock(&self.inner);
		if !matches!(inner.state, State::Pending) || inner.transaction_hash.is_some() {
			return;
		}
		inner.transaction_hash = Some(hash);
		inner
			.listeners
			.retain(|tx| tx.send(ProgressEvent::TransactionHash(hash)).is_ok());
	}

	/// Terminal success. Ignored if a terminal state was already reached.
	pub fn resolve(&self, value: T) {
		let mut inner = lock(&self.inner);
		if !matches!(inner.state, State::Pending) {
			return;
		}
		let value = Arc::new(value);
		inner.state = State::Resolved(value.clone());
		for tx in inner.listeners.drain(..) {
			let _ = tx.send(ProgressEvent::Resolved(value.clone()));
		}
	}

	/// Terminal failure. Ignored if a terminal state was already reached.
	pub fn reject(&self, error: ExecutionError) {
		let mut inner = lock(&self.inner);
		if !matches!(inner.state, State::Pending) {
			return;
		}
		let error = Arc::new(error);
		inner.state = State::Rejected(error.clone());
		for tx in inner.listeners.drain(..) {
			let _ = tx.send(ProgressEvent::Failed(error.clone()));
		}
	}
}
