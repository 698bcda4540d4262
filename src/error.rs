//! Error types returned at the edges of the library.
//!
//! The engines themselves never fail: degenerate inputs give an empty or
//! minimal result. Errors only appear when validating host input or when
//! reading a share token.

use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a share token can be rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is not valid base64url: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("token payload is not a valid share object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported share token version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

/// Out-of-range simulation parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("loan amount must be positive, got {0}")]
    NonPositivePrincipal(Decimal),

    #[error("annual rate cannot be negative, got {0}")]
    NegativeRate(Decimal),

    #[error("monthly installment must be positive, got {0}")]
    NonPositiveInstallment(Decimal),

    #[error("total months cannot be zero.")]
    ZeroMonths,

    #[error("monthly income cannot be negative, got {0}")]
    NegativeIncome(Decimal),

    #[error("debt `{name}` has a negative amount {amount}")]
    NegativeDebt { name: String, amount: Decimal },
}
