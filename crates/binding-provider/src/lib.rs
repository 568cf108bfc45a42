//! Node access module for the contract binding layer.
//!
//! This module defines the abstract node capabilities the execution pipeline
//! and event subsystem consume, together with the raw JSON-RPC envelope used
//! by the manual submission path. Concrete implementations cover an HTTP
//! JSON-RPC transport and a scriptable in-memory node for tests.

use async_trait::async_trait;
use alloy_primitives::{Address, Bytes, B256, U256};
use binding_types::{BlockRef, LogFilter, NetworkInfo, RawLog, Receipt, TransactionParameters};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

pub use implementations::http::HttpProvider;
pub use implementations::mock::{MockNode, ReceiptStep};

/// Errors that can occur when talking to a node.
#[derive(Debug, Error)]
pub enum ProviderError {
	/// Transport-level failure (connection, timeout, malformed body).
	#[error("Network error: {0}")]
	Network(String),
	/// Error envelope returned by the node.
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	/// A response that parsed but did not have the expected shape.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The log subscription's delivery channel has closed.
	#[error("Subscription closed")]
	SubscriptionClosed,
}

/// Raw JSON-RPC request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
	pub jsonrpc: String,
	pub id: u64,
	pub method: String,
	pub params: Vec<serde_json::Value>,
}

impl RpcRequest {
	pub fn new(id: u64, method: impl Into<String>, params: Vec<serde_json::Value>) -> Self {
		Self {
			jsonrpc: "2.0".to_string(),
			id,
			method: method.into(),
			params,
		}
	}
}

/// Error object inside a JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
	pub code: i64,
	pub message: String,
}

/// Raw JSON-RPC response envelope.
///
/// Send primitives hand the whole envelope back to the caller: the manual
/// submission path needs to observe `error` even when `result` carries a
/// transaction hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcResponse {
	#[serde(default)]
	pub result: Option<serde_json::Value>,
	#[serde(default)]
	pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
	/// Builds a success envelope around a result value.
	pub fn from_result(result: serde_json::Value) -> Self {
		Self {
			result: Some(result),
			error: None,
		}
	}

	/// Collapses the envelope into a result, mapping the error object.
	pub fn into_result(self) -> Result<serde_json::Value, ProviderError> {
		if let Some(err) = self.error {
			return Err(ProviderError::Rpc {
				code: err.code,
				message: err.message,
			});
		}
		self.result
			.ok_or_else(|| ProviderError::InvalidResponse("missing result".to_string()))
	}

	/// Extracts a transaction hash from the result field, if present.
	pub fn transaction_hash(&self) -> Option<B256> {
		self.result
			.as_ref()
			.and_then(|v| v.as_str())
			.and_then(|s| s.parse().ok())
	}
}

/// One delivery on a log subscription.
///
/// `Changed` models the upstream redelivery of a log that was removed by a
/// reorganization; both variants flow through the same dedup gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDelivery {
	New(RawLog),
	Changed(RawLog),
}

impl LogDelivery {
	pub fn log(&self) -> &RawLog {
		match self {
			LogDelivery::New(log) | LogDelivery::Changed(log) => log,
		}
	}
}

/// Handle to a live log subscription.
///
/// Dropping the handle tears down whatever task feeds it.
pub struct LogSubscription {
	receiver: mpsc::UnboundedReceiver<LogDelivery>,
	_stop: Option<oneshot::Sender<()>>,
}

impl LogSubscription {
	pub fn new(
		receiver: mpsc::UnboundedReceiver<LogDelivery>,
		stop: Option<oneshot::Sender<()>>,
	) -> Self {
		Self {
			receiver,
			_stop: stop,
		}
	}

	/// Receives the next delivery; `None` once the feed is gone.
	pub async fn recv(&mut self) -> Option<LogDelivery> {
		self.receiver.recv().await
	}
}

/// Trait defining the node capabilities the binding layer consumes.
///
/// One implementation per transport. The pipeline only ever holds this
/// trait object, which is what lets the tests script a whole node.
#[async_trait]
pub trait NodeInterface: Send + Sync {
	/// Asks the node for a gas estimate of the prepared call.
	async fn estimate_gas(&self, params: &TransactionParameters) -> Result<U256, ProviderError>;

	/// Executes a read-only call against the given block.
	async fn call(
		&self,
		params: &TransactionParameters,
		block: &BlockRef,
	) -> Result<Bytes, ProviderError>;

	/// Standard transaction-send primitive. Returns the full envelope.
	async fn send_transaction(
		&self,
		params: &TransactionParameters,
	) -> Result<RpcResponse, ProviderError>;

	/// Submits a pre-signed raw transaction. Returns the full envelope.
	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<RpcResponse, ProviderError>;

	/// Fetches the receipt for a transaction, `None` while unmined.
	async fn transaction_receipt(&self, hash: &B256) -> Result<Option<Receipt>, ProviderError>;

	/// Fetches the code deployed at an address.
	async fn code_at(&self, address: &Address, block: &BlockRef) -> Result<Bytes, ProviderError>;

	/// Fetches the transaction count (next nonce) for an address.
	async fn transaction_count(
		&self,
		address: &Address,
		block: &BlockRef,
	) -> Result<u64, ProviderError>;

	/// Fetches the node's current gas price.
	async fn gas_price(&self) -> Result<U256, ProviderError>;

	/// Detects the network: chain id plus latest block gas limit.
	async fn network_info(&self) -> Result<NetworkInfo, ProviderError>;

	/// Queries historical logs.
	async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError>;

	/// Opens a live log subscription.
	async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogSubscription, ProviderError>;

	/// Sends a raw request envelope unchanged.
	async fn request(&self, request: RpcRequest) -> Result<RpcResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_envelope_error_takes_precedence() {
		let response = RpcResponse {
			result: Some(serde_json::json!("0x1234")),
			error: Some(RpcErrorObject {
				code: -32000,
				message: "nonce too low".to_string(),
			}),
		};
		assert!(matches!(
			response.into_result(),
			Err(ProviderError::Rpc { code: -32000, .. })
		));
	}

	#[test]
	fn test_transaction_hash_extraction() {
		let response = RpcResponse::from_result(serde_json::json!(
			"0x2222222222222222222222222222222222222222222222222222222222222222"
		));
		assert_eq!(
			response.transaction_hash(),
			Some(B256::repeat_byte(0x22))
		);
		assert_eq!(RpcResponse::default().transaction_hash(), None);
	}
}
