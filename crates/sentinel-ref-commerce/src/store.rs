//! In-memory commerce backend.
//!
//! `CommerceStore` stands in for the account, catalog, and transaction
//! tables. All three live behind one `Mutex`, so each service call is atomic
//! on its own; sequences of calls are not.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use sentinel_contracts::commerce::{
    round_money, Account, CommerceError, Product, Transaction, User,
};
use sentinel_core::traits::{AccountService, CatalogService, TransactionStore};

#[derive(Default)]
struct ShopState {
    users: Vec<User>,
    accounts: HashMap<String, Account>,
    products: Vec<Product>,
    transactions: Vec<Transaction>,
}

/// A point-in-time copy of the store, for listings and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopSnapshot {
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    pub products: Vec<Product>,
    pub transactions: Vec<Transaction>,
}

#[derive(Default)]
pub struct CommerceStore {
    state: Mutex<ShopState>,
}

impl CommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ShopState>, CommerceError> {
        self.state
            .lock()
            .map_err(|e| CommerceError::Storage(format!("commerce store lock poisoned: {e}")))
    }

    /// Drop every user, account, product, and transaction.
    pub fn reset(&self) -> Result<(), CommerceError> {
        *self.lock()? = ShopState::default();
        debug!("commerce store reset");
        Ok(())
    }

    /// Create a user with a USD account holding `balance`.
    pub fn add_user(
        &self,
        full_name: &str,
        email: Option<&str>,
        balance: Decimal,
    ) -> Result<User, CommerceError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            email: email.map(str::to_string),
        };
        let mut state = self.lock()?;
        state.accounts.insert(
            user.id.clone(),
            Account { user_id: user.id.clone(), balance: round_money(balance), currency: "USD".to_string() },
        );
        state.users.push(user.clone());
        Ok(user)
    }

    /// Create an active USD product.
    pub fn add_product(
        &self,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        inventory_qty: u32,
    ) -> Result<Product, CommerceError> {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            price: round_money(price),
            currency: "USD".to_string(),
            inventory_qty,
            is_active: true,
        };
        self.lock()?.products.push(product.clone());
        Ok(product)
    }

    pub fn set_balance(&self, user_id: &str, balance: Decimal) -> Result<(), CommerceError> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| CommerceError::AccountNotFound(user_id.to_string()))?;
        account.balance = round_money(balance);
        Ok(())
    }

    /// Take a product off the catalog without deleting it.
    pub fn deactivate_product(&self, product_id: &str) -> Result<(), CommerceError> {
        let mut state = self.lock()?;
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))?;
        product.is_active = false;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<ShopSnapshot, CommerceError> {
        let state = self.lock()?;
        let accounts: Vec<Account> = state
            .users
            .iter()
            .filter_map(|u| state.accounts.get(&u.id).cloned())
            .collect();
        Ok(ShopSnapshot {
            users: state.users.clone(),
            accounts,
            products: state.products.clone(),
            transactions: state.transactions.clone(),
        })
    }

    pub fn transaction_count(&self) -> Result<usize, CommerceError> {
        Ok(self.lock()?.transactions.len())
    }
}

fn active<'a>(products: &'a [Product], product_id: &str) -> Result<&'a Product, CommerceError> {
    products
        .iter()
        .find(|p| p.id == product_id && p.is_active)
        .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))
}

// ── Service impls ─────────────────────────────────────────────────────────────

impl AccountService for CommerceStore {
    fn account(&self, user_id: &str) -> Result<Account, CommerceError> {
        self.lock()?
            .accounts
            .get(user_id)
            .cloned()
            .ok_or_else(|| CommerceError::AccountNotFound(user_id.to_string()))
    }

    fn debit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, CommerceError> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| CommerceError::AccountNotFound(user_id.to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(CommerceError::InvalidAmount);
        }
        if account.balance < amount {
            return Err(CommerceError::InsufficientFunds);
        }
        account.balance = round_money(account.balance - amount);
        debug!(user_id = %user_id, amount = %amount, balance = %account.balance, "account debited");
        Ok(account.balance)
    }
}

impl CatalogService for CommerceStore {
    fn product(&self, product_id: &str) -> Result<Product, CommerceError> {
        let state = self.lock()?;
        active(&state.products, product_id).cloned()
    }

    fn reserve(&self, product_id: &str, qty: u32) -> Result<(), CommerceError> {
        let mut state = self.lock()?;
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id && p.is_active)
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.to_string()))?;
        if qty == 0 {
            return Err(CommerceError::InvalidQuantity);
        }
        if product.inventory_qty < qty {
            return Err(CommerceError::OutOfStock {
                product_id: product.id.clone(),
                requested: qty,
                available: product.inventory_qty,
            });
        }
        product.inventory_qty -= qty;
        debug!(product_id = %product_id, qty, left = product.inventory_qty, "inventory reserved");
        Ok(())
    }

    fn search(&self, tokens: &[String], limit: usize) -> Result<Vec<Product>, CommerceError> {
        let tokens: Vec<String> = tokens
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let state = self.lock()?;
        let mut hits: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| {
                let name = p.name.to_lowercase();
                let description = p.description.as_deref().unwrap_or_default().to_lowercase();
                tokens.iter().any(|t| name.contains(t) || description.contains(t))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.inventory_qty.cmp(&a.inventory_qty));
        hits.truncate(limit);
        Ok(hits)
    }
}

impl TransactionStore for CommerceStore {
    fn find_by_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<Transaction>, CommerceError> {
        Ok(self
            .lock()?
            .transactions
            .iter()
            .find(|t| t.user_id == user_id && t.idempotency_key == idempotency_key)
            .cloned())
    }

    fn insert(&self, tx: Transaction) -> Result<Transaction, CommerceError> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .transactions
            .iter()
            .find(|t| t.user_id == tx.user_id && t.idempotency_key == tx.idempotency_key)
        {
            debug!(transaction_id = %existing.id, "duplicate idempotency key, keeping original");
            return Ok(existing.clone());
        }
        state.transactions.push(tx.clone());
        Ok(tx)
    }
}
