//! Scriptable in-memory node implementation.
//!
//! Used by the execution and core tests to drive the pipeline without a
//! ledger: every capability can be preloaded with responses or failures,
//! and the call sequence is recorded for ordering assertions. Receipts are
//! keyed by transaction hash so concurrent invocations never observe each
//! other's script.

use crate::{
	LogDelivery, LogSubscription, NodeInterface, ProviderError, RpcRequest, RpcResponse,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use binding_types::{BlockRef, LogFilter, NetworkInfo, RawLog, Receipt, TransactionParameters};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// One step of a scripted receipt-poll sequence.
#[derive(Debug, Clone)]
pub enum ReceiptStep {
	/// Not mined yet; the poller sleeps and retries.
	Pending,
	/// Mined with this receipt.
	Mined(Receipt),
	/// The fetch itself fails.
	Fail(String),
}

#[derive(Default)]
struct MockState {
	chain_id: u64,
	block_gas_limit: U256,
	network_failure: Option<String>,
	gas_estimate: Option<Result<U256, String>>,
	call_results: VecDeque<Result<Bytes, String>>,
	send_responses: VecDeque<RpcResponse>,
	raw_responses: VecDeque<RpcResponse>,
	receipts: HashMap<B256, VecDeque<ReceiptStep>>,
	code: HashMap<Address, Bytes>,
	nonce: u64,
	gas_price: U256,
	logs: Vec<RawLog>,
	subscribers: Vec<mpsc::UnboundedSender<LogDelivery>>,
	auto_hash: u64,
}

/// In-memory node with per-capability scripts.
pub struct MockNode {
	state: Arc<Mutex<MockState>>,
	calls: Arc<Mutex<Vec<String>>>,
}

impl MockNode {
	pub fn new() -> Self {
		let state = MockState {
			chain_id: 1337,
			block_gas_limit: U256::from(30_000_000u64),
			gas_price: U256::from(1_000_000_000u64),
			..Default::default()
		};
		Self {
			state: Arc::new(Mutex::new(state)),
			calls: Arc::new(Mutex::new(Vec::new())),
		}
	}

	fn lock(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn record(&self, name: &str) {
		self.calls
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.push(name.to_string());
	}

	/// All capability invocations, in order.
	pub fn recorded_calls(&self) -> Vec<String> {
		self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	/// Number of invocations of one capability.
	pub fn call_count(&self, name: &str) -> usize {
		self.recorded_calls().iter().filter(|c| *c == name).count()
	}

	pub fn set_network(&self, chain_id: u64, block_gas_limit: U256) {
		let mut state = self.lock();
		state.chain_id = chain_id;
		state.block_gas_limit = block_gas_limit;
		state.network_failure = None;
	}

	pub fn fail_network_info(&self, message: &str) {
		self.lock().network_failure = Some(message.to_string());
	}

	pub fn set_gas_estimate(&self, estimate: U256) {
		self.lock().gas_estimate = Some(Ok(estimate));
	}

	pub fn fail_gas_estimate(&self, message: &str) {
		self.lock().gas_estimate = Some(Err(message.to_string()));
	}

	pub fn push_call_result(&self, result: Bytes) {
		self.lock().call_results.push_back(Ok(result));
	}

	pub fn fail_next_call(&self, message: &str) {
		self.lock().call_results.push_back(Err(message.to_string()));
	}

	/// Scripts the next send-transaction response as a plain hash result.
	pub fn push_send_hash(&self, hash: B256) {
		self.lock()
			.send_responses
			.push_back(RpcResponse::from_result(serde_json::json!(format!(
				"{:#x}",
				hash
			))));
	}

	/// Scripts the next send-transaction response as a full envelope.
	pub fn push_send_response(&self, response: RpcResponse) {
		self.lock().send_responses.push_back(response);
	}

	pub fn push_raw_response(&self, response: RpcResponse) {
		self.lock().raw_responses.push_back(response);
	}

	/// Appends one step to the receipt script for a hash.
	pub fn push_receipt_step(&self, hash: B256, step: ReceiptStep) {
		self.lock().receipts.entry(hash).or_default().push_back(step);
	}

	pub fn set_code(&self, address: Address, code: Bytes) {
		self.lock().code.insert(address, code);
	}

	pub fn set_nonce(&self, nonce: u64) {
		self.lock().nonce = nonce;
	}

	pub fn set_logs(&self, logs: Vec<RawLog>) {
		self.lock().logs = logs;
	}

	/// Feeds a delivery to every open subscription.
	pub fn push_log(&self, delivery: LogDelivery) {
		let mut state = self.lock();
		state
			.subscribers
			.retain(|tx| tx.send(delivery.clone()).is_ok());
	}
}

impl Default for MockNode {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl NodeInterface for MockNode {
	async fn estimate_gas(&self, _params: &TransactionParameters) -> Result<U256, ProviderError> {
		self.record("estimate_gas");
		match self.lock().gas_estimate.clone() {
			None => Ok(U256::from(21_000u64)),
			Some(Ok(estimate)) => Ok(estimate),
			Some(Err(message)) => Err(ProviderError::Rpc {
				code: -32000,
				message,
			}),
		}
	}

	async fn call(
		&self,
		_params: &TransactionParameters,
		_block: &BlockRef,
	) -> Result<Bytes, ProviderError> {
		self.record("call");
		match self.lock().call_results.pop_front() {
			None => Ok(Bytes::new()),
			Some(Ok(bytes)) => Ok(bytes),
			Some(Err(message)) => Err(ProviderError::Rpc {
				code: 3,
				message,
			}),
		}
	}

	async fn send_transaction(
		&self,
		_params: &TransactionParameters,
	) -> Result<RpcResponse, ProviderError> {
		self.record("send_transaction");
		let mut state = self.lock();
		if let Some(response) = state.send_responses.pop_front() {
			return Ok(response);
		}
		state.auto_hash += 1;
		let hash = B256::from(U256::from(state.auto_hash));
		Ok(RpcResponse::from_result(serde_json::json!(format!(
			"{:#x}",
			hash
		))))
	}

	async fn send_raw_transaction(&self, _raw: &Bytes) -> Result<RpcResponse, ProviderError> {
		self.record("send_raw_transaction");
		let mut state = self.lock();
		if let Some(response) = state.raw_responses.pop_front() {
			return Ok(response);
		}
		state.auto_hash += 1;
		let hash = B256::from(U256::from(state.auto_hash));
		Ok(RpcResponse::from_result(serde_json::json!(format!(
			"{:#x}",
			hash
		))))
	}

	async fn transaction_receipt(&self, hash: &B256) -> Result<Option<Receipt>, ProviderError> {
		self.record("transaction_receipt");
		let step = self
			.lock()
			.receipts
			.get_mut(hash)
			.and_then(|steps| steps.pop_front());
		match step {
			Some(ReceiptStep::Pending) => Ok(None),
			Some(ReceiptStep::Mined(receipt)) => Ok(Some(receipt)),
			Some(ReceiptStep::Fail(message)) => Err(ProviderError::Network(message)),
			None => Err(ProviderError::Network(format!(
				"mock: receipt script exhausted for {:#x}",
				hash
			))),
		}
	}

	async fn code_at(&self, address: &Address, _block: &BlockRef) -> Result<Bytes, ProviderError> {
		self.record("code_at");
		Ok(self.lock().code.get(address).cloned().unwrap_or_default())
	}

	async fn transaction_count(
		&self,
		_address: &Address,
		_block: &BlockRef,
	) -> Result<u64, ProviderError> {
		self.record("transaction_count");
		Ok(self.lock().nonce)
	}

	async fn gas_price(&self) -> Result<U256, ProviderError> {
		self.record("gas_price");
		Ok(self.lock().gas_price)
	}

	async fn network_info(&self) -> Result<NetworkInfo, ProviderError> {
		self.record("network_info");
		let state = self.lock();
		if let Some(message) = &state.network_failure {
			return Err(ProviderError::Network(message.clone()));
		}
		Ok(NetworkInfo {
			chain_id: state.chain_id,
			block_gas_limit: state.block_gas_limit,
		})
	}

	async fn logs(&self, _filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError> {
		self.record("logs");
		Ok(self.lock().logs.clone())
	}

	async fn subscribe_logs(&self, _filter: &LogFilter) -> Result<LogSubscription, ProviderError> {
		self.record("subscribe_logs");
		let (tx, rx) = mpsc::unbounded_channel();
		self.lock().subscribers.push(tx);
		Ok(LogSubscription::new(rx, None))
	}

	async fn request(&self, request: RpcRequest) -> Result<RpcResponse, ProviderError> {
		self.record("request");
		Ok(RpcResponse::from_result(serde_json::json!({
			"echo": request.method,
		})))
	}
}
