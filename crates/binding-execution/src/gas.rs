//! Gas estimation policy.
//!
//! An explicit `gas` value always wins. With automatic estimation enabled,
//! the node's estimate is scaled by the configured multiplier and capped just
//! below the block gas limit. Estimation failure is absorbed: the send
//! proceeds without an explicit gas value so a reverting transaction still
//! reaches the chain and fails with a classified receipt.

use alloy_primitives::U256;
use binding_config::BindingConfig;
use binding_provider::NodeInterface;
use binding_types::{NetworkInfo, TransactionParameters};

const MULTIPLIER_SCALE: u64 = 1_000_000;

pub async fn estimate_gas(
	params: &TransactionParameters,
	network: &NetworkInfo,
	config: &BindingConfig,
	provider: &dyn NodeInterface,
) -> Option<U256> {
	if let Some(gas) = params.gas {
		return Some(gas);
	}
	if !config.auto_gas {
		return None;
	}
	match provider.estimate_gas(params).await {
		Ok(estimate) => {
			let boosted = apply_multiplier(estimate, config.gas_multiplier);
			let cap = network.block_gas_limit.saturating_sub(U256::from(1u64));
			Some(boosted.min(cap))
		}
		Err(error) => {
			tracing::debug!(%error, "gas estimation failed, submitting without explicit gas");
			None
		}
	}
}

/// Scales by a fractional multiplier using six-decimal fixed point.
fn apply_multiplier(value: U256, multiplier: f64) -> U256 {
	let scaled = U256::from((multiplier * MULTIPLIER_SCALE as f64) as u128);
	value.saturating_mul(scaled) / U256::from(MULTIPLIER_SCALE)
}

#[cfg(test)]
mod tests {
	use super::*;
	use binding_provider::MockNode;

	fn network() -> NetworkInfo {
		NetworkInfo {
			chain_id: 1337,
			block_gas_limit: U256::from(30_000_000u64),
		}
	}

	#[tokio::test]
	async fn test_explicit_gas_passes_through_unchanged() {
		let node = MockNode::new();
		let params = TransactionParameters {
			gas: Some(U256::from(9_999_999u64)),
			..Default::default()
		};
		let gas = estimate_gas(&params, &network(), &BindingConfig::default(), &node).await;
		assert_eq!(gas, Some(U256::from(9_999_999u64)));
		assert_eq!(node.call_count("estimate_gas"), 0);
	}

	#[tokio::test]
	async fn test_disabled_estimation_yields_none() {
		let node = MockNode::new();
		let config = BindingConfig {
			auto_gas: false,
			..Default::default()
		};
		let params = TransactionParameters::default();
		assert_eq!(estimate_gas(&params, &network(), &config, &node).await, None);
		assert_eq!(node.call_count("estimate_gas"), 0);
	}

	#[tokio::test]
	async fn test_estimate_scaled_by_multiplier() {
		let node = MockNode::new();
		node.set_gas_estimate(U256::from(100_000u64));
		let params = TransactionParameters::default();
		let gas = estimate_gas(&params, &network(), &BindingConfig::default(), &node).await;
		// default multiplier 1.25
		assert_eq!(gas, Some(U256::from(125_000u64)));
	}

	#[tokio::test]
	async fn test_estimate_capped_below_block_gas_limit() {
		let node = MockNode::new();
		node.set_gas_estimate(U256::from(29_000_000u64));
		let params = TransactionParameters::default();
		let gas = estimate_gas(&params, &network(), &BindingConfig::default(), &node).await;
		assert_eq!(gas, Some(U256::from(29_999_999u64)));
	}

	#[tokio::test]
	async fn test_estimation_failure_absorbed() {
		let node = MockNode::new();
		node.fail_gas_estimate("execution reverted");
		let params = TransactionParameters::default();
		assert_eq!(
			estimate_gas(&params, &network(), &BindingConfig::default(), &node).await,
			None
		);
	}
}
