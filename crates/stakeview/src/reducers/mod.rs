//! Pure transforms from raw upstream shapes to domain records.
//!
//! Reducers never read the clock or the network; the only ambient input,
//! "now", is passed in explicitly.

pub mod account;
pub mod block;
pub mod coin;
pub mod proposal;
pub mod validator;

use crate::tools::{parse_decimal, ParseDecimalError};
use rust_decimal::Decimal;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub use account::{delegation, overview, reward, undelegations};
pub use block::{block, group_for, transaction, undelegation_end_time};
pub use coin::{coin, denom_lookup};
pub use proposal::{governance_parameters, parse_status, proposal, tally};
pub use validator::{normalize_website, validator, validator_status, ValidatorInput};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReduceError {
    #[error(transparent)]
    Decimal(#[from] ParseDecimalError),
    #[error("invalid integer in {field}: {value:?}")]
    Integer { field: &'static str, value: String },
    #[error("unknown proposal status {0:?}")]
    UnknownProposalStatus(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("transaction shape: {0}")]
    Shape(String),
}

/// Decimal field that may be absent; absent or empty reads as zero.
pub(crate) fn optional_decimal(value: Option<&str>) -> Result<Decimal, ReduceError> {
    match value.map(str::trim) {
        None | Some("") => Ok(Decimal::ZERO),
        Some(s) => Ok(parse_decimal(s)?),
    }
}

pub(crate) fn parse_u64(field: &'static str, value: &str) -> Result<u64, ReduceError> {
    value.trim().parse().map_err(|_| ReduceError::Integer {
        field,
        value: value.to_string(),
    })
}

/// RFC 3339 timestamp as the node emits it; `None` when unparseable.
pub(crate) fn parse_time(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok()
}
