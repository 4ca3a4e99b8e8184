//! Synthetic seed data for the reference runtime.
//!
//! All names are fictional. Balances and prices are random within fixed
//! ranges; pass a seeded RNG to `seed_with_rng` for a repeatable catalogue.

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use sentinel_contracts::commerce::CommerceError;

use crate::store::CommerceStore;

/// Product names and descriptions the seeder draws from.
pub const PRODUCT_CATALOGUE: [(&str, &str); 8] = [
    ("Laptop Stand", "Ergonomic aluminum stand"),
    ("Mechanical Keyboard", "Tactile switches, backlit"),
    ("Noise Cancelling Headphones", "Over-ear, ANC"),
    ("USB-C Hub", "HDMI + USB + Ethernet"),
    ("Portable SSD 1TB", "Fast external storage"),
    ("Webcam 1080p", "Autofocus webcam"),
    ("Monitor 27-inch", "1440p IPS display"),
    ("Desk Lamp", "Adjustable brightness"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users_created: usize,
    pub products_created: usize,
}

/// Reset `store` and fill it with random users and products.
pub fn seed_synthetic_data(
    store: &CommerceStore,
    num_users: usize,
    num_products: usize,
) -> Result<SeedSummary, CommerceError> {
    seed_with_rng(store, num_users, num_products, &mut rand::rng())
}

/// `seed_synthetic_data` with a caller-supplied RNG.
///
/// Users get balances of 50..=2000 USD. At most `PRODUCT_CATALOGUE.len()`
/// products are created, priced 20.99..=350.99 with 1..=30 in stock.
pub fn seed_with_rng<R: Rng + ?Sized>(
    store: &CommerceStore,
    num_users: usize,
    num_products: usize,
    rng: &mut R,
) -> Result<SeedSummary, CommerceError> {
    store.reset()?;

    for i in 1..=num_users {
        let balance = Decimal::from(rng.random_range(50..=2000_i64));
        store.add_user(
            &format!("Test User {i}"),
            Some(&format!("user{i}@example.com")),
            balance,
        )?;
    }

    let mut catalogue = PRODUCT_CATALOGUE.to_vec();
    catalogue.shuffle(rng);
    catalogue.truncate(num_products);

    for (name, description) in &catalogue {
        let price = Decimal::from(rng.random_range(20..=350_i64)) + Decimal::new(99, 2);
        let stock = rng.random_range(1..=30_u32);
        store.add_product(name, Some(description), price, stock)?;
    }

    let summary = SeedSummary { users_created: num_users, products_created: catalogue.len() };
    info!(
        users = summary.users_created,
        products = summary.products_created,
        "synthetic data seeded"
    );
    Ok(summary)
}
