//! Key management and local transaction signing.
//!
//! A [`KeyStore`] holds the signers derived from the configured private keys.
//! When the sender of a transaction resolves to one of these addresses, the
//! submitter signs locally and broadcasts the raw encoded transaction instead
//! of delegating the signature to the node.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use binding_types::{without_0x_prefix, SecretString, TransactionParameters};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during key handling and signing.
#[derive(Debug, Error)]
pub enum AccountError {
	/// A configured private key could not be parsed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// No signer is held for the requested sender address.
	#[error("No key for sender {0}")]
	UnknownSender(Address),
	/// The transaction is missing a field that signing requires.
	#[error("Cannot sign transaction: missing {0}")]
	Incomplete(&'static str),
	/// The signing operation itself failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
}

/// Set of locally held signers, keyed by their derived address.
pub struct KeyStore {
	signers: HashMap<Address, PrivateKeySigner>,
}

impl KeyStore {
	/// Builds a store from hex-encoded private keys.
	///
	/// Keys may carry a `0x` prefix. An unparseable key fails the whole
	/// build rather than being silently skipped.
	pub fn from_keys(keys: &[SecretString]) -> Result<Self, AccountError> {
		let mut signers = HashMap::with_capacity(keys.len());
		for key in keys {
			let signer = key.with_exposed(|raw| {
				without_0x_prefix(raw)
					.parse::<PrivateKeySigner>()
					.map_err(|e| AccountError::InvalidKey(e.to_string()))
			})?;
			signers.insert(signer.address(), signer);
		}
		Ok(Self { signers })
	}

	/// Empty store; every sender falls through to node-managed signing.
	pub fn empty() -> Self {
		Self {
			signers: HashMap::new(),
		}
	}

	/// True when a signer is held for this address.
	pub fn contains(&self, address: &Address) -> bool {
		self.signers.contains_key(address)
	}

	/// Addresses of all held signers, in arbitrary order.
	pub fn addresses(&self) -> Vec<Address> {
		self.signers.keys().copied().collect()
	}

	/// Signs fully populated parameters into a raw broadcastable transaction.
	///
	/// The caller fills nonce, gas, and gas price before signing; absent
	/// fields are an error here, not something to silently default.
	pub fn sign_transaction(
		&self,
		params: &TransactionParameters,
		chain_id: u64,
	) -> Result<Bytes, AccountError> {
		let from = params.from.ok_or(AccountError::Incomplete("from"))?;
		let signer = self
			.signers
			.get(&from)
			.ok_or(AccountError::UnknownSender(from))?;

		let nonce = params.nonce.ok_or(AccountError::Incomplete("nonce"))?;
		let gas = params.gas.ok_or(AccountError::Incomplete("gas"))?;
		let gas_price = params
			.gas_price
			.ok_or(AccountError::Incomplete("gasPrice"))?;

		let tx = TxLegacy {
			chain_id: Some(chain_id),
			nonce,
			gas_price: u128::try_from(gas_price)
				.map_err(|_| AccountError::SigningFailed("gas price overflows u128".into()))?,
			gas_limit: u64::try_from(gas)
				.map_err(|_| AccountError::SigningFailed("gas limit overflows u64".into()))?,
			to: match params.to {
				Some(address) => TxKind::Call(address),
				None => TxKind::Create,
			},
			value: params.value.unwrap_or(U256::ZERO),
			input: params.data.clone().unwrap_or_default(),
		};

		let signature = signer
			.sign_hash_sync(&tx.signature_hash())
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		let envelope = TxEnvelope::Legacy(tx.into_signed(signature));

		let mut encoded = Vec::new();
		envelope.encode_2718(&mut encoded);
		Ok(Bytes::from(encoded))
	}
}
