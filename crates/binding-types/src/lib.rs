//! Common types module for the contract binding layer.
//!
//! This module defines the core data types shared by the execution pipeline
//! and the event subsystem. It provides a centralized location for wire
//! structures, ABI fragments, and call arguments to ensure consistency
//! across all binding components.

/// ABI fragments and tagged call arguments.
pub mod abi;
/// Decoded event types and numeric representation options.
pub mod events;
/// Secure string type for private keys.
pub mod secret_string;
/// Transaction, receipt, and log wire types.
pub mod transaction;
/// Hex-quantity conversion and formatting utilities.
pub mod util;

// Re-export all types for convenient access
pub use abi::*;
pub use events::*;
pub use secret_string::SecretString;
pub use transaction::*;
pub use util::{
	encode_quantity_u64, parse_quantity, parse_quantity_u64, without_0x_prefix, QuantityError,
};
