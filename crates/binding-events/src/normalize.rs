//! Numeric normalization of decoded values.
//!
//! Consumers pick one representation for 256-bit quantities; normalization
//! rewrites `Uint` and `Int` values (recursing into arrays) into the
//! configured shape. Everything else passes through untouched.

use binding_types::{DecodedEvent, DecodedValue, NumberFormat};

pub fn normalize_event(event: &mut DecodedEvent, format: NumberFormat) {
	if format == NumberFormat::Uint {
		return;
	}
	for param in &mut event.args {
		normalize_value(&mut param.value, format);
	}
}

fn normalize_value(value: &mut DecodedValue, format: NumberFormat) {
	match value {
		DecodedValue::Uint(v) => {
			*value = match format {
				NumberFormat::Uint => return,
				NumberFormat::DecimalString => DecodedValue::String(v.to_string()),
				NumberFormat::HexString => DecodedValue::String(format!("{:#x}", v)),
			};
		}
		DecodedValue::Int(v) => {
			*value = match format {
				NumberFormat::Uint => return,
				NumberFormat::DecimalString => DecodedValue::String(v.to_string()),
				NumberFormat::HexString => DecodedValue::String(format!("{:#x}", v)),
			};
		}
		DecodedValue::Array(items) => {
			for item in items {
				normalize_value(item, format);
			}
		}
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, U256};
	use binding_types::{DecodedParam, RawLog};

	fn event_with(value: DecodedValue) -> DecodedEvent {
		DecodedEvent {
			name: "Probe".to_string(),
			args: vec![DecodedParam { name: None, value }],
			raw: RawLog {
				address: Address::ZERO,
				topics: vec![],
				data: Default::default(),
				block_number: Some(1),
				transaction_hash: None,
				log_index: Some(0),
				removed: false,
			},
			log_id: "log_1".to_string(),
		}
	}

	#[test]
	fn test_uint_format_is_identity() {
		let mut event = event_with(DecodedValue::Uint(U256::from(42u64)));
		normalize_event(&mut event, NumberFormat::Uint);
		assert_eq!(event.arg(0), Some(&DecodedValue::Uint(U256::from(42u64))));
	}

	#[test]
	fn test_decimal_string_format() {
		let mut event = event_with(DecodedValue::Uint(U256::from(1_000u64)));
		normalize_event(&mut event, NumberFormat::DecimalString);
		assert_eq!(
			event.arg(0),
			Some(&DecodedValue::String("1000".to_string()))
		);
	}

	#[test]
	fn test_hex_string_format_recurses_into_arrays() {
		let mut event = event_with(DecodedValue::Array(vec![
			DecodedValue::Uint(U256::from(255u64)),
			DecodedValue::Bool(true),
		]));
		normalize_event(&mut event, NumberFormat::HexString);
		assert_eq!(
			event.arg(0),
			Some(&DecodedValue::Array(vec![
				DecodedValue::String("0xff".to_string()),
				DecodedValue::Bool(true),
			]))
		);
	}

	#[test]
	fn test_addresses_untouched() {
		let address = Address::repeat_byte(0x01);
		let mut event = event_with(DecodedValue::Address(address));
		normalize_event(&mut event, NumberFormat::DecimalString);
		assert_eq!(event.arg(0), Some(&DecodedValue::Address(address)));
	}
}
