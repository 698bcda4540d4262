//! Debt-to-income ("taxa de esforço") risk classification.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::percentage;
use crate::error::ParameterError;

/// Effort rates up to this value (inclusive) are low risk.
pub const LOW_RISK_LIMIT: Decimal = dec!(30);
/// Effort rates up to this value (inclusive) are moderate risk.
pub const MODERATE_RISK_LIMIT: Decimal = dec!(50);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub name: String,
    /// Monthly obligation.
    pub amount: Decimal,
}

impl Default for Debt {
    fn default() -> Self {
        Self { name: String::new(), amount: dec!(300) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortInputs {
    /// Net monthly income. May be zero.
    pub monthly_income: Decimal,
    pub debts: Vec<Debt>,
}

impl Default for EffortInputs {
    fn default() -> Self {
        Self { monthly_income: dec!(1500), debts: Vec::new() }
    }
}

impl EffortInputs {
    pub fn evaluate(&self) -> EffortResult {
        evaluate(self.monthly_income, &self.debts)
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.monthly_income < Decimal::ZERO {
            return Err(ParameterError::NegativeIncome(self.monthly_income));
        }
        if let Some(debt) = self.debts.iter().find(|debt| debt.amount < Decimal::ZERO) {
            return Err(ParameterError::NegativeDebt {
                name: debt.name.clone(),
                amount: debt.amount,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Classifies an effort rate given in percent. Both limits are inclusive.
    pub fn from_effort_rate(effort_rate: Decimal) -> Self {
        if effort_rate <= LOW_RISK_LIMIT {
            RiskLevel::Low
        } else if effort_rate <= MODERATE_RISK_LIMIT {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortResult {
    pub total_debts: Decimal,
    /// Debts as a percentage of income, unrounded. Zero when there is no income.
    pub effort_rate: Decimal,
    /// Income left after debts. Negative when debts exceed income.
    pub available_income: Decimal,
    /// Available income as a percentage of income, one decimal.
    pub available_income_share: Decimal,
    pub risk_level: RiskLevel,
}

/// Computes the effort rate for `monthly_income` against the given debts.
pub fn evaluate(monthly_income: Decimal, debts: &[Debt]) -> EffortResult {
    let total_debts: Decimal = debts.iter().map(|debt| debt.amount).sum();
    let effort_rate = if monthly_income > Decimal::ZERO {
        total_debts / monthly_income * dec!(100)
    } else {
        Decimal::ZERO
    };
    let available_income = monthly_income - total_debts;

    EffortResult {
        total_debts,
        effort_rate,
        available_income,
        available_income_share: percentage(available_income, monthly_income),
        risk_level: RiskLevel::from_effort_rate(effort_rate),
    }
}
