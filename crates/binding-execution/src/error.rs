//! Errors surfaced by the execution pipeline.

use binding_account::AccountError;
use binding_provider::ProviderError;
use binding_types::Receipt;
use thiserror::Error;

/// Fatal invocation errors.
///
/// Each invocation surfaces at most one of these, through the terminal
/// channel of its progress handle. Gas-estimation failure is deliberately
/// not represented: the estimator absorbs it so a reverting send still
/// reaches the chain and fails with a classified receipt.
#[derive(Debug, Error)]
pub enum ExecutionError {
	/// The node rejected the submission before a receipt existed.
	#[error("Submission failed: {0}")]
	Submission(String),
	/// The transaction was mined but did not succeed.
	#[error("Transaction failed{}", reason_suffix(.reason))]
	Status {
		reason: Option<String>,
		receipt: Box<Receipt>,
	},
	/// A deployment was mined but left no code at the contract address.
	#[error("Contract code not stored{}", reason_suffix(.reason))]
	CodeNotStored { reason: Option<String> },
	/// The argument list does not match the method's declared inputs.
	#[error("Expected {expected} argument(s), got {actual}")]
	ArgumentMismatch { expected: usize, actual: usize },
	/// The contract ABI declares no method with the requested name.
	#[error("Unknown method: {0}")]
	UnknownMethod(String),
	/// A human-readable name could not be resolved to an address.
	#[error("Name resolution failed: {0}")]
	NameResolution(String),
	/// Network detection or another transport-level step failed.
	#[error("Network error: {0}")]
	Network(String),
	#[error(transparent)]
	Provider(#[from] ProviderError),
	#[error(transparent)]
	Account(#[from] AccountError),
}

fn reason_suffix(reason: &Option<String>) -> String {
	match reason {
		Some(reason) => format!(": {}", reason),
		None => String::new(),
	}
}
