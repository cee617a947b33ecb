//! Numeric and address helpers shared by reducers and the query client.

pub mod address;
pub mod numeric;

pub use address::{check_prefix, operator_to_account, pubkey_to_consensus_address, AddressError};
pub use numeric::{
    display_amount, expected_returns_per_token, fixed, fraction, parse_decimal, tokens_from_shares,
    ParseDecimalError, DISPLAY_SCALE, MICRO_FACTOR, VOTING_POWER_SCALE,
};
