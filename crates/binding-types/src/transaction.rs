//! Transaction, receipt, and log wire types for the binding layer.
//!
//! These structures serialize to the JSON-RPC shapes the node expects:
//! quantities as minimal hex strings, payloads as 0x-prefixed hex. The
//! parameters record is built once per invocation and mutated in place as
//! the pipeline fills in gas and deployment fields.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Parameters of a pending invocation, in node wire shape.
///
/// Built by the call preparer from a trailing parameters argument (or empty),
/// then filled in by the gas estimator (`gas`) and the submitter
/// (`to`/`data`/`from` for deployments and manual sends).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParameters {
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub to: Option<Address>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub from: Option<Address>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub gas: Option<U256>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub gas_price: Option<U256>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub value: Option<U256>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub data: Option<Bytes>,
	#[serde(
		with = "crate::util::opt_hex_u64",
		skip_serializing_if = "Option::is_none",
		default
	)]
	pub nonce: Option<u64>,
}

impl TransactionParameters {
	/// True when the parameters describe a contract creation.
	pub fn is_creation(&self) -> bool {
		self.to.is_none()
	}

	/// Wire representation for raw RPC envelopes.
	pub fn to_rpc_value(&self) -> serde_json::Value {
		// Serialization of this struct is infallible: every field maps to a
		// plain JSON string.
		serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
	}
}

/// Read-only network snapshot fetched once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
	/// Chain identifier reported by the node.
	pub chain_id: u64,
	/// Gas limit of the most recent block.
	pub block_gas_limit: U256,
}

/// Post-inclusion record of a transaction's outcome.
///
/// Immutable once fetched. `status` is absent on ledgers that predate typed
/// receipt status; the classifier falls back to a deployed-code probe there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
	pub transaction_hash: B256,
	#[serde(with = "crate::util::opt_status", default)]
	pub status: Option<bool>,
	#[serde(default)]
	pub contract_address: Option<Address>,
	#[serde(with = "crate::util::opt_hex_u64", default)]
	pub block_number: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub gas_used: Option<U256>,
	#[serde(default)]
	pub logs: Vec<RawLog>,
}

/// A single log entry as delivered by a subscription or query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
	pub address: Address,
	#[serde(default)]
	pub topics: Vec<B256>,
	#[serde(default)]
	pub data: Bytes,
	#[serde(with = "crate::util::opt_hex_u64", default)]
	pub block_number: Option<u64>,
	#[serde(default)]
	pub transaction_hash: Option<B256>,
	#[serde(with = "crate::util::opt_hex_u64", default)]
	pub log_index: Option<u64>,
	#[serde(default)]
	pub removed: bool,
}

impl RawLog {
	/// Stable identifier used for per-stream duplicate suppression.
	///
	/// Derived from the delivery coordinates of the log; two deliveries of
	/// the same log compare equal even when one arrives as a reorg replay.
	pub fn log_id(&self) -> String {
		match self.transaction_hash {
			Some(tx) => format!("log_{:x}_{}", tx, self.log_index.unwrap_or(0)),
			None => format!(
				"log_{:x}_{}_{}",
				self.address,
				self.block_number.unwrap_or(0),
				self.log_index.unwrap_or(0)
			),
		}
	}
}

/// Filter for log queries and subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub address: Option<Address>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub topics: Option<Vec<Option<B256>>>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub from_block: Option<BlockRef>,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub to_block: Option<BlockRef>,
}

/// Reference to a ledger block for read calls and queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockRef {
	#[default]
	Latest,
	Pending,
	Earliest,
	Number(u64),
}

impl BlockRef {
	/// JSON-RPC string form ("latest", "pending", "earliest", or a hex number).
	pub fn as_rpc(&self) -> String {
		match self {
			BlockRef::Latest => "latest".to_string(),
			BlockRef::Pending => "pending".to_string(),
			BlockRef::Earliest => "earliest".to_string(),
			BlockRef::Number(n) => crate::util::encode_quantity_u64(*n),
		}
	}
}

impl fmt::Display for BlockRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.as_rpc())
	}
}

impl Serialize for BlockRef {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.as_rpc())
	}
}

impl<'de> Deserialize<'de> for BlockRef {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		match raw.as_str() {
			"latest" => Ok(BlockRef::Latest),
			"pending" => Ok(BlockRef::Pending),
			"earliest" => Ok(BlockRef::Earliest),
			other => crate::util::parse_quantity_u64(other)
				.map(BlockRef::Number)
				.map_err(serde::de::Error::custom),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_parameters_wire_shape() {
		let params = TransactionParameters {
			to: Some(address!("5fbdb2315678afecb367f032d93f642f64180aa3")),
			gas: Some(U256::from(21000u64)),
			nonce: Some(7),
			..Default::default()
		};
		let value = params.to_rpc_value();
		assert_eq!(value["gas"], "0x5208");
		assert_eq!(value["nonce"], "0x7");
		// Unset fields never reach the wire
		assert!(value.get("gasPrice").is_none());
		assert!(value.get("data").is_none());
	}

	#[test]
	fn test_receipt_status_parsing() {
		let json = r#"{
			"transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
			"status": "0x1",
			"blockNumber": "0x10",
			"logs": []
		}"#;
		let receipt: Receipt = serde_json::from_str(json).unwrap();
		assert_eq!(receipt.status, Some(true));
		assert_eq!(receipt.block_number, Some(16));
		assert!(receipt.contract_address.is_none());

		// Legacy ledgers omit the field entirely
		let json = r#"{
			"transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111"
		}"#;
		let receipt: Receipt = serde_json::from_str(json).unwrap();
		assert_eq!(receipt.status, None);
	}

	#[test]
	fn test_log_id_is_stable_across_redelivery() {
		let mut log = RawLog {
			address: Address::ZERO,
			topics: vec![],
			data: Bytes::new(),
			block_number: Some(5),
			transaction_hash: Some(B256::repeat_byte(0xab)),
			log_index: Some(2),
			removed: false,
		};
		let first = log.log_id();
		log.removed = true;
		assert_eq!(first, log.log_id());
	}

	#[test]
	fn test_block_ref_rpc_forms() {
		assert_eq!(BlockRef::Latest.as_rpc(), "latest");
		assert_eq!(BlockRef::Number(255).as_rpc(), "0xff");
		let parsed: BlockRef = serde_json::from_str("\"0xff\"").unwrap();
		assert_eq!(parsed, BlockRef::Number(255));
	}
}
