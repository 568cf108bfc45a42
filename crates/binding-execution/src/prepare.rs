//! Argument preparation and network detection.
//!
//! Turns a caller's positional argument list into a [`PreparedCall`]: a
//! trailing parameters object is detached, a trailing block reference is
//! popped on the read path only, the remaining count is checked against the
//! declared ABI inputs, and resolvable names are replaced by addresses.
//! Network detection runs through a per-binding single-flight memo so that
//! concurrent invocations share one round trip.

use crate::error::ExecutionError;
use alloy_primitives::Address;
use async_trait::async_trait;
use binding_config::BindingConfig;
use binding_provider::NodeInterface;
use binding_types::{
	AbiType, BlockRef, CallArg, CallKind, MethodAbi, NetworkInfo, TransactionParameters,
};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::{Arc, Mutex};

/// Resolves human-readable names to addresses.
///
/// Collaborator seam; no implementation ships in this workspace.
#[async_trait]
pub trait NameResolver: Send + Sync {
	async fn resolve(&self, name: &str) -> Result<Address, ExecutionError>;
}

/// The outcome of preparation, ready for encoding and submission.
#[derive(Debug, Clone)]
pub struct PreparedCall {
	/// Positional arguments, names already resolved.
	pub args: Vec<CallArg>,
	/// Detached transaction parameters (default if none were passed).
	pub params: TransactionParameters,
	/// Network snapshot shared by the rest of the pipeline.
	pub network: NetworkInfo,
	/// Block reference popped from a read call's argument list.
	pub block: Option<BlockRef>,
}

type DetectionFuture = Shared<BoxFuture<'static, Result<NetworkInfo, String>>>;

/// Single-flight, memoizing network detection.
///
/// The first caller issues the `network_info` round trip; concurrent callers
/// await the same in-flight future. A successful result stays memoized for
/// the life of the binding; a failed detection clears the slot so the next
/// invocation retries.
pub struct NetworkDetector {
	provider: Arc<dyn NodeInterface>,
	inflight: Mutex<Option<DetectionFuture>>,
}

impl NetworkDetector {
	pub fn new(provider: Arc<dyn NodeInterface>) -> Self {
		Self {
			provider,
			inflight: Mutex::new(None),
		}
	}

	pub async fn detect(&self) -> Result<NetworkInfo, ExecutionError> {
		let shared = {
			let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
			match slot.as_ref() {
				Some(existing) => existing.clone(),
				None => {
					let provider = self.provider.clone();
					let future = async move {
						provider
							.network_info()
							.await
							.map_err(|e| e.to_string())
					}
					.boxed()
					.shared();
					*slot = Some(future.clone());
					future
				}
			}
		};

		match shared.clone().await {
			Ok(network) => Ok(network),
			Err(message) => {
				let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
				if slot.as_ref().is_some_and(|f| f.ptr_eq(&shared)) {
					*slot = None;
				}
				tracing::warn!(error = %message, "network detection failed");
				Err(ExecutionError::Network(message))
			}
		}
	}
}

/// Prepares argument lists for one binding.
pub struct CallPreparer {
	config: BindingConfig,
	resolver: Option<Arc<dyn NameResolver>>,
}

impl CallPreparer {
	pub fn new(config: BindingConfig, resolver: Option<Arc<dyn NameResolver>>) -> Self {
		Self { config, resolver }
	}

	pub async fn prepare(
		&self,
		mut args: Vec<CallArg>,
		method: &MethodAbi,
		kind: CallKind,
		detector: &NetworkDetector,
	) -> Result<PreparedCall, ExecutionError> {
		let network = detector.detect().await?;

		// A trailing parameters object is a structured record by construction;
		// numeric trailing values stay in the argument list.
		let mut params = TransactionParameters::default();
		if args.last().is_some_and(CallArg::is_params) {
			if let Some(CallArg::Params(detached)) = args.pop() {
				params = detached;
			}
		}

		// Read calls only: one surplus trailing argument is a block reference.
		// The send path never pops; a surplus there is a mismatch.
		let mut block = None;
		if kind == CallKind::Read && args.len() == method.inputs.len() + 1 {
			match args.pop() {
				Some(CallArg::Block(block_ref)) => block = Some(block_ref),
				Some(CallArg::Uint(number)) => {
					let number = u64::try_from(number).map_err(|_| {
						ExecutionError::Network("block number overflows u64".to_string())
					})?;
					block = Some(BlockRef::Number(number));
				}
				Some(other) => {
					args.push(other);
				}
				None => {}
			}
		}

		if args.len() != method.inputs.len() {
			return Err(ExecutionError::ArgumentMismatch {
				expected: method.inputs.len(),
				actual: args.len(),
			});
		}

		if self.config.name_resolution {
			self.resolve_names(&mut args, method).await?;
		}

		Ok(PreparedCall {
			args,
			params,
			network,
			block,
		})
	}

	async fn resolve_names(
		&self,
		args: &mut [CallArg],
		method: &MethodAbi,
	) -> Result<(), ExecutionError> {
		for (position, arg) in args.iter_mut().enumerate() {
			let name = match arg {
				CallArg::Name(name) => name.clone(),
				_ => continue,
			};
			if method.inputs.get(position).map(|input| &input.kind) != Some(&AbiType::Address) {
				continue;
			}
			let resolver = self.resolver.as_ref().ok_or_else(|| {
				ExecutionError::NameResolution(format!("no resolver configured for '{}'", name))
			})?;
			let address = resolver.resolve(&name).await?;
			tracing::debug!(%name, %address, "resolved name argument");
			*arg = CallArg::Address(address);
		}
		Ok(())
	}
}
