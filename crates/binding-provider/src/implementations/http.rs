//! HTTP JSON-RPC node implementation.
//!
//! This implementation speaks the raw JSON-RPC envelope directly over
//! reqwest. Live log subscriptions are emulated with a cursor-based
//! `eth_getLogs` polling task, which is also how historical queries and
//! the polling receipt loop reach the node.

use crate::{
	LogDelivery, LogSubscription, NodeInterface, ProviderError, RpcRequest, RpcResponse,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use binding_types::{
	parse_quantity, parse_quantity_u64, BlockRef, LogFilter, NetworkInfo, RawLog, Receipt,
	TransactionParameters,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// JSON-RPC over HTTP.
#[derive(Clone)]
pub struct HttpProvider {
	client: reqwest::Client,
	url: reqwest::Url,
	next_id: Arc<AtomicU64>,
	poll_interval: Duration,
}

impl HttpProvider {
	/// Creates a provider for the given RPC endpoint.
	pub fn new(url: &str) -> Result<Self, ProviderError> {
		let url = url
			.parse()
			.map_err(|e| ProviderError::Network(format!("Invalid RPC URL: {}", e)))?;
		Ok(Self {
			client: reqwest::Client::new(),
			url,
			next_id: Arc::new(AtomicU64::new(1)),
			poll_interval: Duration::from_secs(1),
		})
	}

	/// Overrides the interval used by the subscription polling task.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	fn next_id(&self) -> u64 {
		self.next_id.fetch_add(1, Ordering::Relaxed)
	}

	/// Posts one envelope and parses the response envelope.
	async fn execute_envelope(&self, request: RpcRequest) -> Result<RpcResponse, ProviderError> {
		tracing::debug!(method = %request.method, id = request.id, "RPC request");
		let response = self
			.client
			.post(self.url.clone())
			.json(&request)
			.send()
			.await
			.map_err(|e| ProviderError::Network(e.to_string()))?;
		response
			.json::<RpcResponse>()
			.await
			.map_err(|e| ProviderError::InvalidResponse(e.to_string()))
	}

	/// Posts one call and collapses the envelope into its result.
	async fn execute(
		&self,
		method: &str,
		params: Vec<serde_json::Value>,
	) -> Result<serde_json::Value, ProviderError> {
		self.execute_envelope(RpcRequest::new(self.next_id(), method, params))
			.await?
			.into_result()
	}

	async fn block_number(&self) -> Result<u64, ProviderError> {
		let value = self.execute("eth_blockNumber", vec![]).await?;
		quantity_u64(&value)
	}
}

fn quantity(value: &serde_json::Value) -> Result<U256, ProviderError> {
	value
		.as_str()
		.ok_or_else(|| ProviderError::InvalidResponse("expected hex quantity".to_string()))
		.and_then(|s| {
			parse_quantity(s).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
		})
}

fn quantity_u64(value: &serde_json::Value) -> Result<u64, ProviderError> {
	value
		.as_str()
		.ok_or_else(|| ProviderError::InvalidResponse("expected hex quantity".to_string()))
		.and_then(|s| {
			parse_quantity_u64(s).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
		})
}

#[async_trait]
impl NodeInterface for HttpProvider {
	async fn estimate_gas(&self, params: &TransactionParameters) -> Result<U256, ProviderError> {
		let value = self
			.execute("eth_estimateGas", vec![params.to_rpc_value()])
			.await?;
		quantity(&value)
	}

	async fn call(
		&self,
		params: &TransactionParameters,
		block: &BlockRef,
	) -> Result<Bytes, ProviderError> {
		let value = self
			.execute(
				"eth_call",
				vec![params.to_rpc_value(), serde_json::json!(block.as_rpc())],
			)
			.await?;
		serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
	}

	async fn send_transaction(
		&self,
		params: &TransactionParameters,
	) -> Result<RpcResponse, ProviderError> {
		self.execute_envelope(RpcRequest::new(
			self.next_id(),
			"eth_sendTransaction",
			vec![params.to_rpc_value()],
		))
		.await
	}

	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<RpcResponse, ProviderError> {
		self.execute_envelope(RpcRequest::new(
			self.next_id(),
			"eth_sendRawTransaction",
			vec![serde_json::json!(format!("{}", raw))],
		))
		.await
	}

	async fn transaction_receipt(&self, hash: &B256) -> Result<Option<Receipt>, ProviderError> {
		let response = self
			.execute_envelope(RpcRequest::new(
				self.next_id(),
				"eth_getTransactionReceipt",
				vec![serde_json::json!(format!("{:#x}", hash))],
			))
			.await?;
		if let Some(err) = response.error {
			return Err(ProviderError::Rpc {
				code: err.code,
				message: err.message,
			});
		}
		// An unmined transaction answers with a null result; serde folds the
		// JSON null into `None`, so both shapes mean "not mined yet" rather
		// than a malformed response.
		match response.result {
			None | Some(serde_json::Value::Null) => Ok(None),
			Some(value) => serde_json::from_value(value)
				.map(Some)
				.map_err(|e| ProviderError::InvalidResponse(e.to_string())),
		}
	}

	async fn code_at(&self, address: &Address, block: &BlockRef) -> Result<Bytes, ProviderError> {
		let value = self
			.execute(
				"eth_getCode",
				vec![
					serde_json::json!(format!("{:#x}", address)),
					serde_json::json!(block.as_rpc()),
				],
			)
			.await?;
		serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
	}

	async fn transaction_count(
		&self,
		address: &Address,
		block: &BlockRef,
	) -> Result<u64, ProviderError> {
		let value = self
			.execute(
				"eth_getTransactionCount",
				vec![
					serde_json::json!(format!("{:#x}", address)),
					serde_json::json!(block.as_rpc()),
				],
			)
			.await?;
		quantity_u64(&value)
	}

	async fn gas_price(&self) -> Result<U256, ProviderError> {
		let value = self.execute("eth_gasPrice", vec![]).await?;
		quantity(&value)
	}

	async fn network_info(&self) -> Result<NetworkInfo, ProviderError> {
		let chain_id = quantity_u64(&self.execute("eth_chainId", vec![]).await?)?;
		let block = self
			.execute(
				"eth_getBlockByNumber",
				vec![serde_json::json!("latest"), serde_json::json!(false)],
			)
			.await?;
		let block_gas_limit = quantity(block.get("gasLimit").unwrap_or(&serde_json::Value::Null))?;
		Ok(NetworkInfo {
			chain_id,
			block_gas_limit,
		})
	}

	async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError> {
		let value = self
			.execute(
				"eth_getLogs",
				vec![serde_json::to_value(filter)
					.map_err(|e| ProviderError::InvalidResponse(e.to_string()))?],
			)
			.await?;
		serde_json::from_value(value).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
	}

	async fn subscribe_logs(&self, filter: &LogFilter) -> Result<LogSubscription, ProviderError> {
		let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
		let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

		// First block the poll has not yet covered. A pinned numeric or
		// earliest starting point is honored; otherwise only blocks past the
		// current head are delivered.
		let mut next_from = match filter.from_block {
			Some(BlockRef::Number(n)) => n,
			Some(BlockRef::Earliest) => 0,
			_ => self.block_number().await?.saturating_add(1),
		};

		let provider = self.clone();
		let filter = filter.clone();
		tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = &mut stop_rx => break,
					_ = tokio::time::sleep(provider.poll_interval) => {}
				}

				let head = match provider.block_number().await {
					Ok(head) => head,
					Err(e) => {
						tracing::warn!(error = %e, "Log poll failed to fetch head");
						continue;
					}
				};
				if head < next_from {
					continue;
				}

				let mut range = filter.clone();
				range.from_block = Some(BlockRef::Number(next_from));
				range.to_block = Some(BlockRef::Number(head));
				match provider.logs(&range).await {
					Ok(batch) => {
						for log in batch {
							let delivery = if log.removed {
								LogDelivery::Changed(log)
							} else {
								LogDelivery::New(log)
							};
							if delivery_tx.send(delivery).is_err() {
								// Subscriber is gone
								return;
							}
						}
						next_from = head.saturating_add(1);
					}
					Err(e) => {
						tracing::warn!(error = %e, "Log poll failed, keeping cursor");
					}
				}
			}
		});

		Ok(LogSubscription::new(delivery_rx, Some(stop_tx)))
	}

	async fn request(&self, request: RpcRequest) -> Result<RpcResponse, ProviderError> {
		self.execute_envelope(request).await
	}
}
