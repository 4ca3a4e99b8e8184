//! Per-session resolution state.
//!
//! Last value wins; there is no history. Typed fields replace an open
//! string-keyed bag so a misspelt key is a compile error.

use serde::{Deserialize, Serialize};

use crate::commerce::ProductCandidate;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionMemory {
    /// The numbered product list most recently shown to the user.
    #[serde(default)]
    pub candidates: Vec<ProductCandidate>,
    /// Product chosen from `candidates`, if any.
    #[serde(default)]
    pub selected_product_id: Option<String>,
    /// Quantity to use when the user picks a candidate.
    #[serde(default)]
    pub pending_qty: Option<u32>,
}

impl SessionMemory {
    /// Forget candidates and selection (the "cancel" command).
    pub fn clear_selection(&mut self) {
        self.candidates.clear();
        self.selected_product_id = None;
        self.pending_qty = None;
    }
}
