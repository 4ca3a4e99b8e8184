//! Policy limits, loadable from TOML.
//!
//! ```toml
//! max_single_purchase = "1500.00"
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sentinel_contracts::error::{SentinelError, SentinelResult};

/// Fixed thresholds the purchase policy enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyLimits {
    /// Hard ceiling on the total of one purchase, regardless of funds.
    pub max_single_purchase: Decimal,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self { max_single_purchase: Decimal::new(150_000, 2) }
    }
}

impl PolicyLimits {
    pub fn validate(&self) -> SentinelResult<()> {
        if self.max_single_purchase <= Decimal::ZERO {
            return Err(SentinelError::Config {
                reason: "max_single_purchase must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
