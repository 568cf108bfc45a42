//! ABI fragments and tagged call arguments.
//!
//! The binding layer consumes ABI *shape* only: input names, type tags, and
//! event signature topics. Full ABI encoding and decoding stay behind the
//! codec collaborator seam. Call arguments are a tagged enum so that
//! trailing-argument disambiguation (parameters object vs. numeric value vs.
//! block reference) is an explicit variant match rather than runtime shape
//! inspection.

use crate::transaction::{BlockRef, TransactionParameters};
use alloy_primitives::{Address, Bytes, B256, I256, U256};
use serde::{Deserialize, Serialize};

/// Type tag for a method or event input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbiType {
	Address,
	Bool,
	String,
	Bytes,
	FixedBytes(usize),
	Uint(usize),
	Int(usize),
	Array(Box<AbiType>),
}

/// A single declared input of a method or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiInput {
	pub name: String,
	pub kind: AbiType,
}

/// Function ABI fragment with the fields the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodAbi {
	pub name: String,
	pub inputs: Vec<AbiInput>,
	/// True for read-only methods (view/pure).
	pub constant: bool,
}

/// Event ABI fragment: name, inputs, and the signature topic used to filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAbi {
	pub name: String,
	pub inputs: Vec<AbiInput>,
	pub signature_topic: B256,
}

/// The ABI surface of one contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAbi {
	#[serde(default)]
	pub methods: Vec<MethodAbi>,
	#[serde(default)]
	pub events: Vec<EventAbi>,
	#[serde(default)]
	pub constructor: Option<MethodAbi>,
}

impl ContractAbi {
	/// Looks up a method fragment by name.
	pub fn method(&self, name: &str) -> Option<&MethodAbi> {
		self.methods.iter().find(|m| m.name == name)
	}

	/// Looks up an event fragment by name.
	pub fn event(&self, name: &str) -> Option<&EventAbi> {
		self.events.iter().find(|e| e.name == name)
	}
}

/// Whether an invocation is a read-only call or a state-changing send.
///
/// Only the read path accepts a trailing block reference; the send path
/// treats any surplus argument as a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
	Read,
	Send,
}

/// A positional call argument, tagged by concrete type.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
	Uint(U256),
	Int(I256),
	Address(Address),
	Bool(bool),
	Bytes(Bytes),
	String(String),
	/// A human-readable name to be resolved to an address before encoding.
	Name(String),
	Array(Vec<CallArg>),
	/// A trailing transaction-parameters object.
	Params(TransactionParameters),
	/// A trailing block reference (read calls only).
	Block(BlockRef),
}

impl CallArg {
	/// True for the structured parameters-object variant. Numeric variants
	/// never qualify, however "structured" a big-number value may look in a
	/// loosely-typed binding.
	pub fn is_params(&self) -> bool {
		matches!(self, CallArg::Params(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_params_detection_excludes_numbers() {
		let params = CallArg::Params(TransactionParameters::default());
		let number = CallArg::Uint(U256::from(42u64));
		assert!(params.is_params());
		assert!(!number.is_params());
	}

	#[test]
	fn test_abi_lookup() {
		let abi = ContractAbi {
			methods: vec![MethodAbi {
				name: "transfer".to_string(),
				inputs: vec![
					AbiInput {
						name: "to".to_string(),
						kind: AbiType::Address,
					},
					AbiInput {
						name: "amount".to_string(),
						kind: AbiType::Uint(256),
					},
				],
				constant: false,
			}],
			events: vec![],
			constructor: None,
		};
		assert_eq!(abi.method("transfer").unwrap().inputs.len(), 2);
		assert!(abi.method("mint").is_none());
	}
}
