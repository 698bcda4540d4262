//! Early-repayment commission caps set by the Portuguese regulator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::EarlyRepayment;

/// Kind of credit contract. Drives which commission cap applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditType {
    /// Housing credit with variable rate. Early repayment is exempt.
    HousingVariable,
    /// Housing credit with fixed rate.
    HousingFixed,
    /// Consumer credit.
    #[default]
    Consumer,
}

impl CreditType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditType::HousingVariable => "housing_variable",
            CreditType::HousingFixed => "housing_fixed",
            CreditType::Consumer => "consumer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "housing_variable" => Some(CreditType::HousingVariable),
            "housing_fixed" => Some(CreditType::HousingFixed),
            "consumer" => Some(CreditType::Consumer),
            _ => None,
        }
    }
}

pub const HOUSING_VARIABLE_RATE: Decimal = dec!(0.005);
pub const HOUSING_FIXED_RATE: Decimal = dec!(0.02);
pub const CONSUMER_LONG_RATE: Decimal = dec!(0.005);
pub const CONSUMER_SHORT_RATE: Decimal = dec!(0.0025);

/// Consumer credit with more than this many months left pays the higher cap.
pub const CONSUMER_SHORT_TERM_MONTHS: i64 = 12;

/// Commission rate as a fraction plus whether the contract is exempt from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRate {
    pub rate: Decimal,
    pub exempt: bool,
}

impl CommissionRate {
    /// Commission owed on `amount`. Zero when exempt.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        if self.exempt { Decimal::ZERO } else { amount * self.rate }
    }
}

/// Looks up the commission cap for an early repayment made in `repayment_month`.
///
/// The remaining term is always measured against the contract's original
/// `total_months`, even when earlier repayments already shortened the schedule.
pub fn commission_rate(credit_type: CreditType, repayment_month: u32, total_months: u32) -> CommissionRate {
    match credit_type {
        CreditType::HousingVariable => CommissionRate { rate: HOUSING_VARIABLE_RATE, exempt: true },
        CreditType::HousingFixed => CommissionRate { rate: HOUSING_FIXED_RATE, exempt: false },
        CreditType::Consumer => {
            let remaining = i64::from(total_months) - i64::from(repayment_month);
            let rate = if remaining > CONSUMER_SHORT_TERM_MONTHS {
                CONSUMER_LONG_RATE
            } else {
                CONSUMER_SHORT_RATE
            };
            CommissionRate { rate, exempt: false }
        }
    }
}

/// Previews the commission for a single early repayment, before the schedule runs.
///
/// Uses the full requested amount, so it can exceed what the schedule
/// charges when the balance left at that month is smaller.
pub fn estimate_commission(credit_type: CreditType, repayment: &EarlyRepayment, total_months: u32) -> Decimal {
    commission_rate(credit_type, repayment.month, total_months).apply(repayment.amount)
}

pub fn total_estimated_commission(
    credit_type: CreditType,
    repayments: &[EarlyRepayment],
    total_months: u32,
) -> Decimal {
    repayments
        .iter()
        .map(|repayment| estimate_commission(credit_type, repayment, total_months))
        .sum()
}
