//! Contract binding surface.
//!
//! [`ContractBinding`] ties the pipeline together for one contract: argument
//! preparation, ABI encoding through the external codec seam, gas policy,
//! submission, receipt classification, and event delivery. Each operation
//! hands back its progress handle synchronously and drives the pipeline on a
//! spawned task, so concurrent invocations on one binding run independently.
//! The only cross-invocation state is the read-only key store and the
//! single-flight network memo.

use alloy_primitives::{Address, Bytes, B256, U256};
use binding_account::KeyStore;
use binding_config::BindingConfig;
use binding_events::{past_events, EventError, EventStream, LogDecoder};
use binding_execution::{
	classify, estimate_gas, CallPreparer, DebuggerSession, ExecutionError, NameResolver,
	NetworkDetector, ProgressEmitter, ProgressHandle, TransactionSubmitter,
};
use binding_provider::{NodeInterface, RpcRequest};
use binding_types::{
	CallArg, CallKind, ContractAbi, DecodedEvent, LogFilter, MethodAbi, NetworkInfo, RawLog,
	Receipt, TransactionParameters,
};
use std::sync::Arc;

/// Encodes calls and deployments against the contract ABI.
///
/// Collaborator seam; no codec implementation ships in this workspace.
pub trait AbiCodec: Send + Sync {
	fn encode_call(&self, method: &MethodAbi, args: &[CallArg]) -> Result<Bytes, ExecutionError>;

	fn encode_deploy(
		&self,
		constructor: &MethodAbi,
		bytecode: &Bytes,
		args: &[CallArg],
	) -> Result<Bytes, ExecutionError>;
}

/// Terminal result of a successful send or deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
	pub transaction_hash: B256,
	pub receipt: Receipt,
}

/// Per-invocation record; created at invocation start, never shared.
struct ExecutionContext {
	params: TransactionParameters,
	network: NetworkInfo,
	is_deployment: bool,
}

/// One contract's binding: deployed address, ABI surface, and the shared
/// pipeline components behind every invocation.
pub struct ContractBinding {
	provider: Arc<dyn NodeInterface>,
	keystore: Arc<KeyStore>,
	config: BindingConfig,
	abi: ContractAbi,
	address: Option<Address>,
	bytecode: Option<Bytes>,
	codec: Arc<dyn AbiCodec>,
	decoder: Arc<dyn LogDecoder>,
	debugger: Option<Arc<dyn DebuggerSession>>,
	detector: Arc<NetworkDetector>,
	preparer: Arc<CallPreparer>,
	submitter: Arc<TransactionSubmitter>,
}

impl ContractBinding {
	pub fn new(
		provider: Arc<dyn NodeInterface>,
		config: BindingConfig,
		abi: ContractAbi,
		codec: Arc<dyn AbiCodec>,
		decoder: Arc<dyn LogDecoder>,
	) -> Result<Self, ExecutionError> {
		let keystore = Arc::new(KeyStore::from_keys(&config.keys)?);
		let detector = Arc::new(NetworkDetector::new(provider.clone()));
		let preparer = Arc::new(CallPreparer::new(config.clone(), None));
		let submitter = Arc::new(TransactionSubmitter::new(
			provider.clone(),
			keystore.clone(),
			config.clone(),
		));
		Ok(Self {
			provider,
			keystore,
			config,
			abi,
			address: None,
			bytecode: None,
			codec,
			decoder,
			debugger: None,
			detector,
			preparer,
			submitter,
		})
	}

	/// Points the binding at a deployed instance.
	pub fn at(mut self, address: Address) -> Self {
		self.address = Some(address);
		self
	}

	/// Attaches deploy bytecode.
	pub fn with_bytecode(mut self, bytecode: Bytes) -> Self {
		self.bytecode = Some(bytecode);
		self
	}

	/// Attaches a name resolver; name arguments then resolve when the
	/// configuration enables resolution.
	pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
		self.preparer = Arc::new(CallPreparer::new(self.config.clone(), Some(resolver)));
		self
	}

	/// Attaches a debugger; failed manual-path invocations with a known hash
	/// then open a session on that transaction.
	pub fn with_debugger(mut self, debugger: Arc<dyn DebuggerSession>) -> Self {
		self.debugger = Some(debugger);
		self
	}

	pub fn address(&self) -> Option<Address> {
		self.address
	}

	/// Addresses the binding can sign for locally.
	pub fn local_accounts(&self) -> Vec<Address> {
		self.keystore.addresses()
	}

	/// Read-only invocation; resolves the raw output bytes.
	pub fn call(&self, method: &str, args: Vec<CallArg>) -> ProgressHandle<Bytes> {
		let handle = ProgressHandle::new();
		let emitter = handle.emitter();
		let method_abi = match self.abi.method(method) {
			Some(found) => found.clone(),
			None => {
				emitter.reject(ExecutionError::UnknownMethod(method.to_string()));
				return handle;
			}
		};
		let Some(address) = self.address else {
			emitter.reject(ExecutionError::Submission(
				"binding has no deployed address".to_string(),
			));
			return handle;
		};

		let provider = self.provider.clone();
		let preparer = self.preparer.clone();
		let detector = self.detector.clone();
		let codec = self.codec.clone();
		let default_block = self.config.default_block;
		tokio::spawn(async move {
			let result = async {
				let prepared = preparer
					.prepare(args, &method_abi, CallKind::Read, &detector)
					.await?;
				let mut params = prepared.params;
				params.to = Some(address);
				params.data = Some(codec.encode_call(&method_abi, &prepared.args)?);
				let block = prepared.block.unwrap_or(default_block);
				Ok::<Bytes, ExecutionError>(provider.call(&params, &block).await?)
			}
			.await;
			match result {
				Ok(output) => emitter.resolve(output),
				Err(error) => emitter.reject(error),
			}
		});
		handle
	}

	/// State-changing invocation; resolves once the receipt classifies as
	/// successful.
	pub fn send(&self, method: &str, args: Vec<CallArg>) -> ProgressHandle<ExecutionOutcome> {
		let handle = ProgressHandle::new();
		let emitter = handle.emitter();
		let method_abi = match self.abi.method(method) {
			Some(found) => found.clone(),
			None => {
				emitter.reject(ExecutionError::UnknownMethod(method.to_string()));
				return handle;
			}
		};
		let Some(address) = self.address else {
			emitter.reject(ExecutionError::Submission(
				"binding has no deployed address".to_string(),
			));
			return handle;
		};

		let provider = self.provider.clone();
		let preparer = self.preparer.clone();
		let detector = self.detector.clone();
		let codec = self.codec.clone();
		let config = self.config.clone();
		let submitter = self.submitter.clone();
		let debugger = self.debugger.clone();
		let observer = handle.clone();
		tokio::spawn(async move {
			let outcome = async {
				let prepared = preparer
					.prepare(args, &method_abi, CallKind::Send, &detector)
					.await?;
				let mut params = prepared.params;
				params.to = Some(address);
				params.data = Some(codec.encode_call(&method_abi, &prepared.args)?);
				params.gas =
					estimate_gas(&params, &prepared.network, &config, provider.as_ref()).await;
				let ctx = ExecutionContext {
					params,
					network: prepared.network,
					is_deployment: false,
				};
				run_transaction(&provider, &submitter, ctx, &emitter).await
			}
			.await;
			finish(outcome, emitter, observer, debugger, config.tracing_enabled).await;
		});
		handle
	}

	/// Deploys a new instance; the resolved receipt carries the contract
	/// address.
	pub fn deploy(&self, args: Vec<CallArg>) -> ProgressHandle<ExecutionOutcome> {
		let handle = ProgressHandle::new();
		let emitter = handle.emitter();
		let Some(bytecode) = self.bytecode.clone() else {
			emitter.reject(ExecutionError::Submission(
				"binding has no deploy bytecode".to_string(),
			));
			return handle;
		};
		let constructor = self.abi.constructor.clone().unwrap_or(MethodAbi {
			name: "constructor".to_string(),
			inputs: vec![],
			constant: false,
		});

		let provider = self.provider.clone();
		let preparer = self.preparer.clone();
		let detector = self.detector.clone();
		let codec = self.codec.clone();
		let config = self.config.clone();
		let submitter = self.submitter.clone();
		let debugger = self.debugger.clone();
		let observer = handle.clone();
		tokio::spawn(async move {
			let outcome = async {
				let prepared = preparer
					.prepare(args, &constructor, CallKind::Send, &detector)
					.await?;
				let mut params = prepared.params;
				params.to = None;
				params.data = Some(codec.encode_deploy(&constructor, &bytecode, &prepared.args)?);
				params.gas =
					estimate_gas(&params, &prepared.network, &config, provider.as_ref()).await;
				let ctx = ExecutionContext {
					params,
					network: prepared.network,
					is_deployment: true,
				};
				run_transaction(&provider, &submitter, ctx, &emitter).await
			}
			.await;
			finish(outcome, emitter, observer, debugger, config.tracing_enabled).await;
		});
		handle
	}

	/// Raw node gas estimate for an invocation: no multiplier, no cap.
	pub async fn estimate(&self, method: &str, args: Vec<CallArg>) -> Result<U256, ExecutionError> {
		let method_abi = self
			.abi
			.method(method)
			.cloned()
			.ok_or_else(|| ExecutionError::UnknownMethod(method.to_string()))?;
		let prepared = self
			.preparer
			.prepare(args, &method_abi, CallKind::Send, &self.detector)
			.await?;
		let mut params = prepared.params;
		params.to = self.address;
		params.data = Some(self.codec.encode_call(&method_abi, &prepared.args)?);
		Ok(self.provider.estimate_gas(&params).await?)
	}

	/// Builds the raw RPC envelope for an invocation without sending it.
	pub async fn request(
		&self,
		method: &str,
		args: Vec<CallArg>,
	) -> Result<RpcRequest, ExecutionError> {
		let method_abi = self
			.abi
			.method(method)
			.cloned()
			.ok_or_else(|| ExecutionError::UnknownMethod(method.to_string()))?;
		let kind = if method_abi.constant {
			CallKind::Read
		} else {
			CallKind::Send
		};
		let prepared = self
			.preparer
			.prepare(args, &method_abi, kind, &self.detector)
			.await?;
		let mut params = prepared.params;
		params.to = self.address;
		params.data = Some(self.codec.encode_call(&method_abi, &prepared.args)?);

		let request = if method_abi.constant {
			let block = prepared.block.unwrap_or(self.config.default_block);
			RpcRequest::new(
				0,
				"eth_call",
				vec![
					params.to_rpc_value(),
					serde_json::Value::String(block.as_rpc()),
				],
			)
		} else {
			RpcRequest::new(0, "eth_sendTransaction", vec![params.to_rpc_value()])
		};
		Ok(request)
	}

	/// Live stream of one named event.
	pub async fn event(&self, name: &str, mut filter: LogFilter) -> Result<EventStream, EventError> {
		let event_abi = self
			.abi
			.event(name)
			.ok_or_else(|| EventError::UnknownEvent(name.to_string()))?;
		let topic = event_abi.signature_topic;
		if filter.address.is_none() {
			filter.address = self.address;
		}
		if filter.topics.is_none() {
			filter.topics = Some(vec![Some(topic)]);
		}
		let subscription = self.provider.subscribe_logs(&filter).await?;
		let decoder = Arc::new(ScopedDecoder {
			inner: self.decoder.clone(),
			topic,
		});
		Ok(EventStream::new(
			subscription,
			decoder,
			self.config.number_format,
		))
	}

	/// Live stream of every event the binding's decoder understands.
	pub async fn all_events(&self, mut filter: LogFilter) -> Result<EventStream, EventError> {
		if filter.address.is_none() {
			filter.address = self.address;
		}
		let subscription = self.provider.subscribe_logs(&filter).await?;
		Ok(EventStream::new(
			subscription,
			self.decoder.clone(),
			self.config.number_format,
		))
	}

	/// Historical query of one named event.
	pub async fn past_events(
		&self,
		name: &str,
		mut filter: LogFilter,
	) -> Result<Vec<DecodedEvent>, EventError> {
		let event_abi = self
			.abi
			.event(name)
			.ok_or_else(|| EventError::UnknownEvent(name.to_string()))?;
		let topic = event_abi.signature_topic;
		if filter.address.is_none() {
			filter.address = self.address;
		}
		if filter.topics.is_none() {
			filter.topics = Some(vec![Some(topic)]);
		}
		let scoped = ScopedDecoder {
			inner: self.decoder.clone(),
			topic,
		};
		past_events(
			self.provider.as_ref(),
			&filter,
			&scoped,
			self.config.number_format,
		)
		.await
	}
}

/// Restricts a decoder to logs carrying one signature topic.
struct ScopedDecoder {
	inner: Arc<dyn LogDecoder>,
	topic: B256,
}

impl LogDecoder for ScopedDecoder {
	fn matches(&self, log: &RawLog) -> bool {
		log.topics.first() == Some(&self.topic) && self.inner.matches(log)
	}

	fn decode(&self, log: &RawLog) -> Result<DecodedEvent, EventError> {
		self.inner.decode(log)
	}
}

async fn run_transaction(
	provider: &Arc<dyn NodeInterface>,
	submitter: &Arc<TransactionSubmitter>,
	mut ctx: ExecutionContext,
	emitter: &ProgressEmitter<ExecutionOutcome>,
) -> Result<ExecutionOutcome, ExecutionError> {
	tracing::debug!(
		is_deployment = ctx.is_deployment,
		chain_id = ctx.network.chain_id,
		"submitting transaction"
	);
	let receipt = submitter
		.submit(&mut ctx.params, &ctx.network, emitter)
		.await?;
	classify(&receipt, &ctx.params, provider.as_ref()).await?;
	Ok(ExecutionOutcome {
		transaction_hash: receipt.transaction_hash,
		receipt,
	})
}

async fn finish(
	outcome: Result<ExecutionOutcome, ExecutionError>,
	emitter: ProgressEmitter<ExecutionOutcome>,
	observer: ProgressHandle<ExecutionOutcome>,
	debugger: Option<Arc<dyn DebuggerSession>>,
	manual_path: bool,
) {
	match outcome {
		Ok(outcome) => emitter.resolve(outcome),
		Err(error) => {
			if manual_path {
				if let (Some(debugger), Some(hash)) = (debugger, observer.transaction_hash()) {
					tracing::info!(
						transaction_hash = %hash,
						"opening debugger session on failed transaction"
					);
					if let Err(session_error) = debugger.begin_session(hash).await {
						tracing::warn!(error = %session_error, "debugger session failed to open");
					}
				}
			}
			emitter.reject(error);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use binding_provider::{MockNode, ReceiptStep, RpcResponse};
	use binding_types::{AbiInput, AbiType, EventAbi, SecretString};

	// Well-known test vector key; derives 0xf39F...2266.
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	struct StubCodec;

	impl AbiCodec for StubCodec {
		fn encode_call(
			&self,
			method: &MethodAbi,
			_args: &[CallArg],
		) -> Result<Bytes, ExecutionError> {
			Ok(Bytes::from(method.name.clone().into_bytes()))
		}

		fn encode_deploy(
			&self,
			_constructor: &MethodAbi,
			bytecode: &Bytes,
			_args: &[CallArg],
		) -> Result<Bytes, ExecutionError> {
			Ok(bytecode.clone())
		}
	}

	struct StubDecoder;

	impl LogDecoder for StubDecoder {
		fn decode(&self, log: &RawLog) -> Result<DecodedEvent, EventError> {
			Ok(DecodedEvent {
				name: "Ping".to_string(),
				args: vec![],
				raw: log.clone(),
				log_id: log.log_id(),
			})
		}
	}

	fn abi() -> ContractAbi {
		ContractAbi {
			methods: vec![
				MethodAbi {
					name: "get".to_string(),
					inputs: vec![],
					constant: true,
				},
				MethodAbi {
					name: "set".to_string(),
					inputs: vec![AbiInput {
						name: "value".to_string(),
						kind: AbiType::Uint(256),
					}],
					constant: false,
				},
			],
			events: vec![EventAbi {
				name: "Ping".to_string(),
				inputs: vec![],
				signature_topic: B256::repeat_byte(0xee),
			}],
			constructor: None,
		}
	}

	fn binding(node: Arc<MockNode>, config: BindingConfig) -> ContractBinding {
		ContractBinding::new(
			node,
			config,
			abi(),
			Arc::new(StubCodec),
			Arc::new(StubDecoder),
		)
		.unwrap()
		.at(Address::repeat_byte(0x0c))
	}

	fn fast_config() -> BindingConfig {
		BindingConfig {
			receipt_poll_interval_ms: 1,
			..Default::default()
		}
	}

	fn mined(hash: B256, status: bool) -> Receipt {
		Receipt {
			transaction_hash: hash,
			status: Some(status),
			contract_address: None,
			block_number: Some(9),
			gas_used: Some(U256::from(21_000u64)),
			logs: vec![],
		}
	}

	#[tokio::test]
	async fn test_call_resolves_raw_output() {
		let node = Arc::new(MockNode::new());
		node.push_call_result(Bytes::from(vec![0x01, 0x02]));
		let binding = binding(node, fast_config());

		let output = binding.call("get", vec![]).wait().await.unwrap();
		assert_eq!(*output, Bytes::from(vec![0x01, 0x02]));
	}

	#[tokio::test]
	async fn test_unknown_method_rejects() {
		let node = Arc::new(MockNode::new());
		let binding = binding(node, fast_config());
		let result = binding.call("missing", vec![]).wait().await;
		assert!(matches!(
			result.unwrap_err().as_ref(),
			ExecutionError::UnknownMethod(_)
		));
	}

	#[tokio::test]
	async fn test_send_resolves_outcome() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x01);
		node.push_send_hash(hash);
		node.push_receipt_step(hash, ReceiptStep::Mined(mined(hash, true)));
		let binding = binding(node, fast_config());

		let outcome = binding
			.send("set", vec![CallArg::Uint(U256::from(5u64))])
			.wait()
			.await
			.unwrap();
		assert_eq!(outcome.transaction_hash, hash);
		assert_eq!(outcome.receipt.status, Some(true));
	}

	#[tokio::test]
	async fn test_concurrent_sends_resolve_independently() {
		let node = Arc::new(MockNode::new());
		let succeeding = B256::repeat_byte(0x01);
		let reverting = B256::repeat_byte(0x02);
		node.push_send_hash(reverting);
		node.push_send_hash(succeeding);
		node.push_receipt_step(reverting, ReceiptStep::Mined(mined(reverting, false)));
		node.push_receipt_step(succeeding, ReceiptStep::Mined(mined(succeeding, true)));
		let binding = binding(node, fast_config());

		let first = binding.send("set", vec![CallArg::Uint(U256::from(1u64))]);
		let second = binding.send("set", vec![CallArg::Uint(U256::from(2u64))]);
		let results = [first.wait().await, second.wait().await];

		let successes: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
		assert_eq!(successes.len(), 1);
		let outcome = successes[0].as_ref().unwrap();
		assert_eq!(outcome.transaction_hash, succeeding);
		let failure = results.iter().find(|r| r.is_err()).unwrap();
		assert!(matches!(
			failure.as_ref().unwrap_err().as_ref(),
			ExecutionError::Status { .. }
		));
	}

	#[tokio::test]
	async fn test_manual_send_signs_with_local_account() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x06);
		node.push_raw_response(RpcResponse::from_result(serde_json::json!(format!(
			"{:#x}",
			hash
		))));
		node.push_receipt_step(hash, ReceiptStep::Mined(mined(hash, true)));

		let sender: Address = TEST_ADDRESS.parse().unwrap();
		let config = BindingConfig {
			tracing_enabled: true,
			default_account: Some(sender),
			keys: vec![SecretString::from(TEST_KEY)],
			receipt_poll_interval_ms: 1,
			..Default::default()
		};
		let binding = binding(node.clone(), config);
		// the configured key is visible as a locally signable account
		assert_eq!(binding.local_accounts(), vec![sender]);

		let outcome = binding
			.send("set", vec![CallArg::Uint(U256::from(3u64))])
			.wait()
			.await
			.unwrap();
		assert_eq!(outcome.transaction_hash, hash);
		assert_eq!(node.call_count("send_raw_transaction"), 1);
		assert_eq!(node.call_count("send_transaction"), 0);
	}

	#[tokio::test]
	async fn test_deploy_resolves_contract_address() {
		let node = Arc::new(MockNode::new());
		let hash = B256::repeat_byte(0x03);
		let deployed = Address::repeat_byte(0x77);
		node.push_send_hash(hash);
		node.push_receipt_step(
			hash,
			ReceiptStep::Mined(Receipt {
				transaction_hash: hash,
				status: Some(true),
				contract_address: Some(deployed),
				block_number: Some(3),
				gas_used: None,
				logs: vec![],
			}),
		);
		node.set_code(deployed, Bytes::from(vec![0x60, 0x80]));
		let binding =
			binding(node, fast_config()).with_bytecode(Bytes::from(vec![0xde, 0xad]));

		let outcome = binding.deploy(vec![]).wait().await.unwrap();
		assert_eq!(outcome.receipt.contract_address, Some(deployed));
	}

	#[tokio::test]
	async fn test_estimate_returns_raw_node_value() {
		let node = Arc::new(MockNode::new());
		node.set_gas_estimate(U256::from(50_000u64));
		let binding = binding(node, fast_config());

		let estimate = binding
			.estimate("set", vec![CallArg::Uint(U256::from(1u64))])
			.await
			.unwrap();
		// no multiplier, no cap
		assert_eq!(estimate, U256::from(50_000u64));
	}

	#[tokio::test]
	async fn test_request_builds_call_envelope() {
		let node = Arc::new(MockNode::new());
		let binding = binding(node, fast_config());

		let request = binding.request("get", vec![]).await.unwrap();
		assert_eq!(request.method, "eth_call");
		assert_eq!(request.params.len(), 2);
		assert_eq!(request.params[1], serde_json::json!("latest"));

		let request = binding
			.request("set", vec![CallArg::Uint(U256::from(1u64))])
			.await
			.unwrap();
		assert_eq!(request.method, "eth_sendTransaction");
		assert_eq!(request.params.len(), 1);
	}

	#[tokio::test]
	async fn test_event_stream_scoped_to_signature_topic() {
		use binding_provider::LogDelivery;
		use futures::StreamExt;

		let node = Arc::new(MockNode::new());
		let binding = binding(node.clone(), fast_config());
		let mut stream = binding.event("Ping", LogFilter::default()).await.unwrap();

		let matching = RawLog {
			address: Address::repeat_byte(0x0c),
			topics: vec![B256::repeat_byte(0xee)],
			data: Bytes::new(),
			block_number: Some(1),
			transaction_hash: Some(B256::repeat_byte(0x09)),
			log_index: Some(0),
			removed: false,
		};
		let foreign = RawLog {
			topics: vec![B256::repeat_byte(0x11)],
			log_index: Some(1),
			..matching.clone()
		};
		node.push_log(LogDelivery::New(foreign));
		node.push_log(LogDelivery::New(matching));
		drop(node);
		drop(binding);

		let mut names = Vec::new();
		while let Some(item) = stream.next().await {
			names.push(item.unwrap().name);
		}
		assert_eq!(names, vec!["Ping".to_string()]);
	}

	#[tokio::test]
	async fn test_past_events_uses_configured_number_format() {
		let node = Arc::new(MockNode::new());
		node.set_logs(vec![RawLog {
			address: Address::repeat_byte(0x0c),
			topics: vec![B256::repeat_byte(0xee)],
			data: Bytes::new(),
			block_number: Some(2),
			transaction_hash: Some(B256::repeat_byte(0x08)),
			log_index: Some(0),
			removed: false,
		}]);
		let binding = binding(node, fast_config());

		let events = binding
			.past_events("Ping", LogFilter::default())
			.await
			.unwrap();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].name, "Ping");
	}

	#[tokio::test]
	async fn test_unknown_event_rejected() {
		let node = Arc::new(MockNode::new());
		let binding = binding(node, fast_config());
		let result = binding.past_events("Missing", LogFilter::default()).await;
		assert!(matches!(result, Err(EventError::UnknownEvent(_))));
	}
}
