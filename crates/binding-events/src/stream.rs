//! Live event streams and historical queries.

use crate::dedup::DedupState;
use crate::normalize::normalize_event;
use crate::{EventError, LogDecoder};
use binding_provider::{LogSubscription, NodeInterface};
use binding_types::{DecodedEvent, LogFilter, NumberFormat};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A live stream of decoded events.
///
/// One subscription, one decoder, one fresh dedup gate. Both new and
/// reorg-changed deliveries pass through the same gate; a decode failure is
/// yielded as an item and the stream keeps going.
pub struct EventStream {
	inner: BoxStream<'static, Result<DecodedEvent, EventError>>,
}

impl EventStream {
	pub fn new(
		mut subscription: LogSubscription,
		decoder: Arc<dyn LogDecoder>,
		format: NumberFormat,
	) -> Self {
		let inner = async_stream::stream! {
			let mut dedup = DedupState::new();
			while let Some(delivery) = subscription.recv().await {
				let log = delivery.log().clone();
				if !decoder.matches(&log) {
					continue;
				}
				let log_id = log.log_id();
				if !dedup.observe(&log_id) {
					tracing::debug!(%log_id, "suppressed duplicate delivery");
					continue;
				}
				match decoder.decode(&log) {
					Ok(mut event) => {
						normalize_event(&mut event, format);
						yield Ok(event);
					}
					Err(error) => yield Err(error),
				}
			}
		};
		Self {
			inner: inner.boxed(),
		}
	}

	/// Callback-style consumption, draining the stream to completion.
	pub async fn for_each<F>(mut self, mut callback: F)
	where
		F: FnMut(Result<DecodedEvent, EventError>),
	{
		while let Some(item) = self.next().await {
			callback(item);
		}
	}
}

impl Stream for EventStream {
	type Item = Result<DecodedEvent, EventError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.inner.as_mut().poll_next(cx)
	}
}

/// Historical event query.
///
/// A fresh dedup gate per call: results are never deduplicated against a
/// previous query, only against adjacent duplicates within this batch.
pub async fn past_events(
	provider: &dyn NodeInterface,
	filter: &LogFilter,
	decoder: &dyn LogDecoder,
	format: NumberFormat,
) -> Result<Vec<DecodedEvent>, EventError> {
	let logs = provider.logs(filter).await?;
	let mut dedup = DedupState::new();
	let mut events = Vec::with_capacity(logs.len());
	for log in logs {
		if !decoder.matches(&log) {
			continue;
		}
		if !dedup.observe(&log.log_id()) {
			continue;
		}
		let mut event = decoder.decode(&log)?;
		normalize_event(&mut event, format);
		events.push(event);
	}
	Ok(events)
}
