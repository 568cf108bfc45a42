//! Receipt classification.
//!
//! A mined receipt is not an outcome by itself. The classifier maps the
//! status field, the invocation shape (call vs. deployment), and a deployed
//! code probe onto success or a typed failure, and on failure attempts a
//! best-effort revert-reason recovery by re-simulating the call. It never
//! retries the transaction.

use crate::error::ExecutionError;
use binding_provider::NodeInterface;
use binding_types::{BlockRef, Receipt, TransactionParameters};

/// Classifies a mined receipt into success or a fatal error.
///
/// Deployments additionally probe `code_at` on the reported contract
/// address: a receipt can read as successful on ledgers without a status
/// field while the code was never stored.
pub async fn classify(
	receipt: &Receipt,
	params: &TransactionParameters,
	provider: &dyn NodeInterface,
) -> Result<(), ExecutionError> {
	let is_deployment = params.is_creation();

	match receipt.status {
		Some(true) => {
			if is_deployment {
				verify_code_stored(receipt, params, provider).await
			} else {
				Ok(())
			}
		}
		Some(false) => {
			let reason = recover_reason(receipt, params, provider).await;
			tracing::warn!(
				transaction_hash = %receipt.transaction_hash,
				reason = ?reason,
				"transaction reverted"
			);
			// A failed creation stored no code; the likely cause (gas limit)
			// differs from a plain revert, so it gets its own error class.
			if is_deployment {
				Err(ExecutionError::CodeNotStored { reason })
			} else {
				Err(ExecutionError::Status {
					reason,
					receipt: Box::new(receipt.clone()),
				})
			}
		}
		// Ledgers without receipt status: calls are taken at face value,
		// deployments still get the code probe.
		None => {
			if is_deployment {
				verify_code_stored(receipt, params, provider).await
			} else {
				Ok(())
			}
		}
	}
}

async fn verify_code_stored(
	receipt: &Receipt,
	params: &TransactionParameters,
	provider: &dyn NodeInterface,
) -> Result<(), ExecutionError> {
	let address = match receipt.contract_address {
		Some(address) => address,
		None => {
			return Err(ExecutionError::CodeNotStored {
				reason: recover_reason(receipt, params, provider).await,
			})
		}
	};
	let code = provider.code_at(&address, &BlockRef::Latest).await?;
	if code.is_empty() {
		return Err(ExecutionError::CodeNotStored {
			reason: recover_reason(receipt, params, provider).await,
		});
	}
	Ok(())
}

/// Best-effort revert-reason recovery.
///
/// Re-simulates the call against the block preceding the failing one (the
/// state the transaction actually executed on), falling back to the latest
/// state when the receipt carries no block number. Any failure here yields
/// `None`; the classification result stands either way.
async fn recover_reason(
	receipt: &Receipt,
	params: &TransactionParameters,
	provider: &dyn NodeInterface,
) -> Option<String> {
	let block = match receipt.block_number {
		Some(number) if number > 0 => BlockRef::Number(number - 1),
		_ => BlockRef::Latest,
	};
	let output = provider.call(params, &block).await.ok()?;
	decode_revert_reason(&output)
}

/// Decodes a standard `Error(string)` revert payload.
///
/// Layout: 4-byte selector `0x08c379a0`, 32-byte head holding the offset of
/// the string, then the 32-byte length and the UTF-8 bytes.
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
	const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

	if output.len() < 4 || output[..4] != ERROR_SELECTOR {
		return None;
	}
	// Offsets and lengths come straight off the wire; checked arithmetic so
	// a malformed payload degrades to None instead of overflowing.
	let body = &output[4..];
	let offset = read_usize_word(body.get(..32)?)?;
	let data_start = offset.checked_add(32)?;
	let length = read_usize_word(body.get(offset..data_start)?)?;
	let data_end = data_start.checked_add(length)?;
	let bytes = body.get(data_start..data_end)?;
	String::from_utf8(bytes.to_vec()).ok()
}

fn read_usize_word(word: &[u8]) -> Option<usize> {
	if word.len() != 32 || word[..24].iter().any(|b| *b != 0) {
		return None;
	}
	let mut value = [0u8; 8];
	value.copy_from_slice(&word[24..]);
	usize::try_from(u64::from_be_bytes(value)).ok()
}
