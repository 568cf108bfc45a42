//! Decoded event types and numeric representation options.

use crate::transaction::RawLog;
use alloy_primitives::{Address, Bytes, I256, U256};
use serde::{Deserialize, Serialize};

/// Representation chosen for numeric fields in decoded event arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
	/// Native 256-bit integers, untouched.
	#[default]
	Uint,
	/// Decimal strings ("1000000000000000000").
	DecimalString,
	/// Minimal hex quantities ("0xde0b6b3a7640000").
	HexString,
}

/// A decoded argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecodedValue {
	Uint(U256),
	Int(I256),
	Address(Address),
	Bool(bool),
	Bytes(Bytes),
	String(String),
	Array(Vec<DecodedValue>),
}

/// One decoded argument, optionally named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedParam {
	pub name: Option<String>,
	pub value: DecodedValue,
}

/// A log decoded against the contract's event signatures.
///
/// Derived data, never mutated after creation. Arguments are reachable both
/// positionally and by declared name, mirroring the original binding's
/// decoded-event shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
	pub name: String,
	pub args: Vec<DecodedParam>,
	pub raw: RawLog,
	pub log_id: String,
}

impl DecodedEvent {
	/// Positional argument access.
	pub fn arg(&self, index: usize) -> Option<&DecodedValue> {
		self.args.get(index).map(|p| &p.value)
	}

	/// Named argument access.
	pub fn arg_by_name(&self, name: &str) -> Option<&DecodedValue> {
		self.args
			.iter()
			.find(|p| p.name.as_deref() == Some(name))
			.map(|p| &p.value)
	}
}
