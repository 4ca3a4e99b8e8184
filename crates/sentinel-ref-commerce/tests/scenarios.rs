//! The five reference conversations, each asserted to meet its expected
//! outcome.

use sentinel_ref_commerce::scenarios::{
    confirm_purchase, insufficient_funds, invalid_token, missing_identity, run_all,
    select_candidate,
};

#[test]
fn test_scenario_a_purchase_by_product_id() {
    assert!(confirm_purchase::run_scenario().unwrap());
}

#[test]
fn test_scenario_b_balance_without_identity() {
    assert!(missing_identity::run_scenario().unwrap());
}

#[test]
fn test_scenario_c_candidate_selection() {
    assert!(select_candidate::run_scenario().unwrap());
}

#[test]
fn test_scenario_d_unknown_token() {
    assert!(invalid_token::run_scenario().unwrap());
}

#[test]
fn test_scenario_e_insufficient_funds() {
    assert!(insufficient_funds::run_scenario().unwrap());
}

#[test]
fn test_run_all_meets_every_outcome() {
    assert_eq!(run_all().unwrap(), 5);
}
