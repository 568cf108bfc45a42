//! Transaction submission and receipt polling.
//!
//! Two mutually exclusive paths, selected once per invocation: the delegated
//! path hands the unsigned transaction straight to the node, while the manual
//! path picks a [`SubmissionStrategy`] by key-store lookup of the sender and
//! broadcasts through the raw RPC envelope. In both, the transaction hash is
//! recorded on the progress handle before any further await, a populated
//! error envelope is fatal regardless of other content, and the receipt is
//! polled with no independent timeout.

use crate::error::ExecutionError;
use crate::progress::ProgressEmitter;
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use binding_account::KeyStore;
use binding_config::BindingConfig;
use binding_provider::{NodeInterface, RpcResponse};
use binding_types::{BlockRef, NetworkInfo, Receipt, TransactionParameters};
use std::sync::Arc;
use std::time::Duration;

/// How a manually assembled transaction reaches the node.
#[async_trait]
pub trait SubmissionStrategy: Send + Sync {
	async fn submit(
		&self,
		params: &mut TransactionParameters,
	) -> Result<RpcResponse, ExecutionError>;
}

/// Signs locally and broadcasts the raw encoded transaction.
pub struct LocalSigning {
	pub provider: Arc<dyn NodeInterface>,
	pub keystore: Arc<KeyStore>,
	pub chain_id: u64,
}

#[async_trait]
impl SubmissionStrategy for LocalSigning {
	async fn submit(
		&self,
		params: &mut TransactionParameters,
	) -> Result<RpcResponse, ExecutionError> {
		if params.nonce.is_none() {
			let from = params
				.from
				.ok_or_else(|| ExecutionError::Submission("no sender for signing".to_string()))?;
			let nonce = self
				.provider
				.transaction_count(&from, &BlockRef::Pending)
				.await?;
			params.nonce = Some(nonce);
		}
		if params.gas_price.is_none() {
			params.gas_price = Some(self.provider.gas_price().await?);
		}
		let raw = self.keystore.sign_transaction(params, self.chain_id)?;
		tracing::debug!(sender = ?params.from, "broadcasting locally signed transaction");
		Ok(self.provider.send_raw_transaction(&raw).await?)
	}
}

/// Leaves signing to the node's own account management.
pub struct NodeManaged {
	pub provider: Arc<dyn NodeInterface>,
}

#[async_trait]
impl SubmissionStrategy for NodeManaged {
	async fn submit(
		&self,
		params: &mut TransactionParameters,
	) -> Result<RpcResponse, ExecutionError> {
		if params.value.is_none() {
			params.value = Some(U256::ZERO);
		}
		tracing::debug!(sender = ?params.from, "delegating signature to node");
		Ok(self.provider.send_transaction(params).await?)
	}
}

/// Drives one transaction from submission to a mined receipt.
pub struct TransactionSubmitter {
	provider: Arc<dyn NodeInterface>,
	keystore: Arc<KeyStore>,
	config: BindingConfig,
}

impl TransactionSubmitter {
	pub fn new(
		provider: Arc<dyn NodeInterface>,
		keystore: Arc<KeyStore>,
		config: BindingConfig,
	) -> Self {
		Self {
			provider,
			keystore,
			config,
		}
	}

	/// Submits and waits for inclusion.
	///
	/// The hash is recorded on the progress handle as soon as the response
	/// envelope carries one, before the error check and before polling, so
	/// observers learn it even when the invocation later fails.
	pub async fn submit<T>(
		&self,
		params: &mut TransactionParameters,
		network: &NetworkInfo,
		emitter: &ProgressEmitter<T>,
	) -> Result<Receipt, ExecutionError> {
		let response = if self.config.tracing_enabled {
			self.submit_manual(params, network).await?
		} else {
			tracing::debug!("submitting via delegated path");
			self.provider.send_transaction(params).await?
		};

		if let Some(hash) = response.transaction_hash() {
			emitter.set_transaction_hash(hash);
		}
		if let Some(error) = &response.error {
			return Err(ExecutionError::Submission(format!(
				"{} (code {})",
				error.message, error.code
			)));
		}
		let hash = response.transaction_hash().ok_or_else(|| {
			ExecutionError::Submission("node returned no transaction hash".to_string())
		})?;

		self.poll_receipt(hash).await
	}

	async fn submit_manual(
		&self,
		params: &mut TransactionParameters,
		network: &NetworkInfo,
	) -> Result<RpcResponse, ExecutionError> {
		if params.from.is_none() {
			params.from = self.config.default_account;
		}
		let signs_locally = params
			.from
			.map(|from| self.keystore.contains(&from))
			.unwrap_or(false);

		let strategy: Box<dyn SubmissionStrategy> = if signs_locally {
			Box::new(LocalSigning {
				provider: self.provider.clone(),
				keystore: self.keystore.clone(),
				chain_id: network.chain_id,
			})
		} else {
			Box::new(NodeManaged {
				provider: self.provider.clone(),
			})
		};
		strategy.submit(params).await
	}

	async fn poll_receipt(&self, hash: B256) -> Result<Receipt, ExecutionError> {
		let interval = Duration::from_millis(self.config.receipt_poll_interval_ms);
		loop {
			match self.provider.transaction_receipt(&hash).await? {
				Some(receipt) => {
					tracing::info!(
						transaction_hash = %hash,
						block_number = ?receipt.block_number,
						"transaction mined"
					);
					return Ok(receipt);
				}
				None => {
					tracing::debug!(transaction_hash = %hash, "receipt not yet available");
					tokio::time::sleep(interval).await;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::progress::{ProgressEvent, ProgressHandle};
	use alloy_primitives::Address;
	use binding_provider::{MockNode, RpcErrorObject};
	use binding_types::SecretString;

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn config(manual: bool) -> BindingConfig {
		BindingConfig {
			tracing_enabled: manual,
			receipt_poll_interval_ms: 1,
			..Default::default()
		}
	}

	fn network() -> NetworkInfo {
		NetworkInfo {
			chain_id: 1337,
			block_gas_limit: U256::from(30_000_000u64),
		}
	}

	fn mined_receipt(hash: B256) -> Receipt {
		Receipt {
			transaction_hash: hash,
			status: Some(true),
			contract_address: None,
			block_number: Some(7),
			gas_used: Some(U256::from(21_000u64)),
			logs: vec![],
		}
	}

	#[tokio::test]
	async fn test_delegated_path_polls_until_mined() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x01);
		node.push_send_hash(hash);
		node.push_receipt_step(hash, binding_provider::ReceiptStep::Pending);
		node.push_receipt_step(
			hash,
			binding_provider::ReceiptStep::Mined(mined_receipt(hash)),
		);

		let submitter =
			TransactionSubmitter::new(node.clone(), Arc::new(KeyStore::empty()), config(false));
		let handle: ProgressHandle<()> = ProgressHandle::new();
		let mut params = TransactionParameters::default();

		let receipt = submitter
			.submit(&mut params, &network(), &handle.emitter())
			.await
			.unwrap();
		assert_eq!(receipt.transaction_hash, hash);
		assert_eq!(node.call_count("transaction_receipt"), 2);
		assert_eq!(handle.transaction_hash(), Some(hash));
	}

	#[tokio::test]
	async fn test_manual_hash_recorded_before_receipt_failure() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x02);
		node.push_send_hash(hash);
		// no receipt script: the first poll fails

		let submitter =
			TransactionSubmitter::new(node.clone(), Arc::new(KeyStore::empty()), config(true));
		let handle: ProgressHandle<()> = ProgressHandle::new();
		let mut events = handle.subscribe();
		let mut params = TransactionParameters::default();

		let result = submitter
			.submit(&mut params, &network(), &handle.emitter())
			.await;
		assert!(result.is_err());
		assert!(matches!(
			events.recv().await,
			Some(ProgressEvent::TransactionHash(h)) if h == hash
		));
	}

	#[tokio::test]
	async fn test_error_envelope_fatal_despite_hash() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x03);
		node.push_send_response(RpcResponse {
			result: Some(serde_json::json!(format!("{:#x}", hash))),
			error: Some(RpcErrorObject {
				code: -32000,
				message: "nonce too low".to_string(),
			}),
		});

		let submitter =
			TransactionSubmitter::new(node.clone(), Arc::new(KeyStore::empty()), config(true));
		let handle: ProgressHandle<()> = ProgressHandle::new();
		let mut params = TransactionParameters::default();

		let result = submitter
			.submit(&mut params, &network(), &handle.emitter())
			.await;
		assert!(matches!(result, Err(ExecutionError::Submission(_))));
		// hash still reached the handle before the failure surfaced
		assert_eq!(handle.transaction_hash(), Some(hash));
		assert_eq!(node.call_count("transaction_receipt"), 0);
	}

	#[tokio::test]
	async fn test_manual_path_signs_locally_for_known_sender() {
		let node = Arc::new(MockNode::new());
		let keystore =
			Arc::new(KeyStore::from_keys(&[SecretString::from(TEST_KEY)]).unwrap());
		let sender: Address = TEST_ADDRESS.parse().unwrap();

		let mut cfg = config(true);
		cfg.default_account = Some(sender);
		let submitter = TransactionSubmitter::new(node.clone(), keystore, cfg);

		let hash = B256::repeat_byte(0x04);
		node.push_raw_response(RpcResponse::from_result(serde_json::json!(format!(
			"{:#x}",
			hash
		))));
		node.push_receipt_step(
			hash,
			binding_provider::ReceiptStep::Mined(mined_receipt(hash)),
		);

		let handle: ProgressHandle<()> = ProgressHandle::new();
		let mut params = TransactionParameters {
			to: Some(Address::ZERO),
			gas: Some(U256::from(21_000u64)),
			..Default::default()
		};

		let receipt = submitter
			.submit(&mut params, &network(), &handle.emitter())
			.await
			.unwrap();
		assert_eq!(receipt.transaction_hash, hash);
		assert_eq!(node.call_count("send_raw_transaction"), 1);
		assert_eq!(node.call_count("send_transaction"), 0);
		// nonce and gas price were filled before signing
		assert_eq!(node.call_count("transaction_count"), 1);
		assert_eq!(node.call_count("gas_price"), 1);
	}

	#[tokio::test]
	async fn test_manual_path_delegates_unknown_sender() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x05);
		node.push_send_hash(hash);
		node.push_receipt_step(
			hash,
			binding_provider::ReceiptStep::Mined(mined_receipt(hash)),
		);

		let mut cfg = config(true);
		cfg.default_account = Some(Address::repeat_byte(0x42));
		let submitter = TransactionSubmitter::new(node.clone(), Arc::new(KeyStore::empty()), cfg);

		let handle: ProgressHandle<()> = ProgressHandle::new();
		let mut params = TransactionParameters::default();
		submitter
			.submit(&mut params, &network(), &handle.emitter())
			.await
			.unwrap();
		assert_eq!(node.call_count("send_transaction"), 1);
		assert_eq!(params.from, Some(Address::repeat_byte(0x42)));
		assert_eq!(params.value, Some(U256::ZERO));
	}
}
