//! Event decoding, duplicate suppression, and delivery.
//!
//! Live subscriptions and historical queries share the same shape: raw logs
//! from the provider pass a per-stream duplicate gate, decode through the
//! external [`LogDecoder`] seam, and have their numeric values normalized to
//! the configured representation. Each stream or query owns its own dedup
//! state; nothing is shared across instances.

pub mod dedup;
pub mod normalize;
pub mod stream;

use binding_provider::ProviderError;
use binding_types::{DecodedEvent, RawLog};
use thiserror::Error;

pub use dedup::DedupState;
pub use normalize::normalize_event;
pub use stream::{past_events, EventStream};

/// Errors surfaced by event decoding and delivery.
#[derive(Debug, Error)]
pub enum EventError {
	/// The log did not decode against the expected signature.
	#[error("Decode failed: {0}")]
	Decode(String),
	/// No event with the requested name exists on the contract.
	#[error("Unknown event: {0}")]
	UnknownEvent(String),
	#[error(transparent)]
	Provider(#[from] ProviderError),
}

/// Decodes raw logs against a contract's event signatures.
///
/// Collaborator seam; ABI decoding stays external to this workspace. A
/// decoder scoped to a single event reports non-matching logs through
/// [`LogDecoder::matches`] so streams skip them instead of erroring.
pub trait LogDecoder: Send + Sync {
	/// True when this decoder handles the given log.
	fn matches(&self, _log: &RawLog) -> bool {
		true
	}

	fn decode(&self, log: &RawLog) -> Result<DecodedEvent, EventError>;
}
