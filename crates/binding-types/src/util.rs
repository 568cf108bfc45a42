//! Conversion utilities for JSON-RPC quantity and data encodings.
//!
//! Ethereum nodes exchange numbers as minimally-encoded hex strings
//! ("0x0", "0x1b4") and byte payloads as 0x-prefixed hex. These helpers
//! convert between those wire shapes and native types, and provide serde
//! adapters for struct fields that carry quantities.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors that can occur when parsing wire quantities.
#[derive(Debug, Error)]
pub enum QuantityError {
	/// The string is missing the 0x prefix or is empty.
	#[error("Malformed quantity: {0}")]
	Malformed(String),
	/// The hex digits could not be parsed into the target type.
	#[error("Quantity out of range or not hex: {0}")]
	Invalid(String),
}

/// Strips a leading "0x" prefix if present.
pub fn without_0x_prefix(s: &str) -> &str {
	s.strip_prefix("0x")
		.or_else(|| s.strip_prefix("0X"))
		.unwrap_or(s)
}

/// Encodes a u64 as a minimal JSON-RPC hex quantity.
pub fn encode_quantity_u64(value: u64) -> String {
	format!("{:#x}", value)
}

/// Parses a JSON-RPC hex quantity into a u64.
pub fn parse_quantity_u64(s: &str) -> Result<u64, QuantityError> {
	let digits = without_0x_prefix(s);
	if digits.is_empty() {
		return Err(QuantityError::Malformed(s.to_string()));
	}
	u64::from_str_radix(digits, 16).map_err(|_| QuantityError::Invalid(s.to_string()))
}

/// Parses a JSON-RPC hex quantity into a U256.
pub fn parse_quantity(s: &str) -> Result<U256, QuantityError> {
	let digits = without_0x_prefix(s);
	if digits.is_empty() {
		return Err(QuantityError::Malformed(s.to_string()));
	}
	U256::from_str_radix(digits, 16).map_err(|_| QuantityError::Invalid(s.to_string()))
}

/// Serde adapter for `Option<u64>` fields carried as hex quantities.
pub mod opt_hex_u64 {
	use super::{encode_quantity_u64, parse_quantity_u64};
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(v) => serializer.serialize_str(&encode_quantity_u64(*v)),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = Option::<String>::deserialize(deserializer)?;
		raw.map(|s| parse_quantity_u64(&s).map_err(serde::de::Error::custom))
			.transpose()
	}
}

/// Serde adapter for the receipt status flag, carried as "0x1"/"0x0".
pub mod opt_status {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(true) => serializer.serialize_str("0x1"),
			Some(false) => serializer.serialize_str("0x0"),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = Option::<String>::deserialize(deserializer)?;
		match raw.as_deref() {
			None => Ok(None),
			Some("0x0") => Ok(Some(false)),
			Some(s) => super::parse_quantity_u64(s)
				.map(|v| Some(v != 0))
				.map_err(serde::de::Error::custom),
		}
	}
}
