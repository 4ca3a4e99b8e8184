//! Random single-use identifiers.

use sentinel_contracts::ledger::ConfirmationToken;

/// `confirm_<32 hex>`, 128 bits of randomness.
pub fn new_confirmation_token() -> ConfirmationToken {
    ConfirmationToken(prefixed("confirm"))
}

/// `idem_<32 hex>`, used once per issued purchase.
pub fn new_idempotency_key() -> String {
    prefixed("idem")
}

fn prefixed(prefix: &str) -> String {
    let bytes: [u8; 16] = rand::random();
    format!("{prefix}_{}", hex::encode(bytes))
}
