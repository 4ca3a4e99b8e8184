//! Purchase execution against the commerce services.
//!
//! Order of operations:
//!
//!   idempotency lookup → availability + price → reserve stock → debit → insert
//!
//! A debit failure after a successful reservation leaves the stock
//! decremented. There is no compensating release.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use sentinel_contracts::commerce::{purchase_total, CommerceError, Transaction, TransactionStatus};

use crate::traits::CommerceServices;

/// Execute one purchase, at most once per `(user_id, idempotency_key)`.
///
/// A repeated key returns the original transaction without touching stock or
/// funds.
pub fn execute_purchase(
    services: &CommerceServices,
    user_id: &str,
    product_id: &str,
    qty: u32,
    idempotency_key: &str,
) -> Result<Transaction, CommerceError> {
    if let Some(existing) = services.transactions.find_by_key(user_id, idempotency_key)? {
        info!(
            user_id = %user_id,
            transaction_id = %existing.id,
            "idempotency key replayed, returning original transaction"
        );
        return Ok(existing);
    }

    let (unit_price, currency) = services.catalog.check_available(product_id, qty)?;
    let total = purchase_total(unit_price, qty);

    services.catalog.reserve(product_id, qty)?;
    let remaining_balance = services.accounts.debit(user_id, total)?;

    let tx = Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        product_id: product_id.to_string(),
        qty,
        unit_price,
        total_amount: total,
        currency,
        status: TransactionStatus::Confirmed,
        idempotency_key: idempotency_key.to_string(),
        remaining_balance,
        created_at: Utc::now(),
    };

    debug!(
        user_id = %user_id,
        product_id = %product_id,
        total = %total,
        "purchase debited, recording transaction"
    );
    services.transactions.insert(tx)
}
