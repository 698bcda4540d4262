//! Month-by-month schedule for a French-method (constant installment) loan
//! with optional early repayments.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::commission::{CreditType, commission_rate};
use crate::error::ParameterError;

/// How an early repayment is absorbed by the rest of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmortizationMode {
    /// Keep the installment, finish sooner.
    #[default]
    ReduceTerm,
    /// Keep the end date, shrink the installment in proportion to the balance.
    ReducePayment,
}

impl AmortizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmortizationMode::ReduceTerm => "reduce_term",
            AmortizationMode::ReducePayment => "reduce_payment",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reduce_term" => Some(AmortizationMode::ReduceTerm),
            "reduce_payment" => Some(AmortizationMode::ReducePayment),
            _ => None,
        }
    }
}

/// Input parameters for a credit simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    /// The principal amount of the loan.
    pub principal: Decimal,
    /// Nominal annual rate (TAN) as a percentage, e.g. 4.13 for 4.13%.
    pub tan: Decimal,
    /// Annual percentage rate (TAEG). Informative only, never used in the schedule.
    pub taeg: Decimal,
    /// Installment the borrower intends to pay every month.
    pub monthly_installment: Decimal,
    /// Contract length in months.
    pub months: u32,
    pub credit_type: CreditType,
    pub amortization_mode: AmortizationMode,
}

impl Default for LoanParameters {
    fn default() -> Self {
        Self {
            principal: dec!(42975),
            tan: dec!(4.13),
            taeg: dec!(5.08),
            monthly_installment: dec!(593),
            months: 36,
            credit_type: CreditType::Consumer,
            amortization_mode: AmortizationMode::ReduceTerm,
        }
    }
}

impl LoanParameters {
    /// Range checks a host can run before calling [`generate_schedule`].
    /// The engine itself accepts anything.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.principal <= Decimal::ZERO {
            return Err(ParameterError::NonPositivePrincipal(self.principal));
        }
        if self.tan < Decimal::ZERO {
            return Err(ParameterError::NegativeRate(self.tan));
        }
        if self.monthly_installment <= Decimal::ZERO {
            return Err(ParameterError::NonPositiveInstallment(self.monthly_installment));
        }
        if self.months == 0 {
            return Err(ParameterError::ZeroMonths);
        }
        Ok(())
    }
}

/// An extraordinary payment against principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyRepayment {
    pub amount: Decimal,
    /// 1-based month in which the repayment is made.
    pub month: u32,
}

impl Default for EarlyRepayment {
    fn default() -> Self {
        Self { amount: dec!(5000), month: 12 }
    }
}

/// One month of the schedule. All amounts are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    /// Installment actually paid (the last one is capped at what is owed).
    pub payment: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub early_repayment: Decimal,
    pub commission: Decimal,
    /// Balance after the installment and any early repayment.
    pub balance: Decimal,
    /// Interest share of the installment, in percent with one decimal.
    pub interest_pct: Decimal,
    pub principal_pct: Decimal,
}

/// Generated schedule plus the principal it started from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub initial_principal: Decimal,
    pub rows: Vec<AmortizationRow>,
}

/// Aggregate totals over a [`Schedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_interest: Decimal,
    pub total_principal: Decimal,
    pub total_early_repayment: Decimal,
    pub total_commission: Decimal,
    /// Installments plus early repayments plus commissions.
    pub total_paid: Decimal,
    pub final_balance: Decimal,
    pub months_used: u32,
    /// Interest as a percentage of `total_paid`.
    pub interest_share_of_paid: Decimal,
    /// Regular plus early principal as a percentage of the loan amount.
    pub amortized_share_of_principal: Decimal,
}

impl Schedule {
    pub fn summary(&self) -> ScheduleSummary {
        let mut total_interest = Decimal::ZERO;
        let mut total_principal = Decimal::ZERO;
        let mut total_early_repayment = Decimal::ZERO;
        let mut total_commission = Decimal::ZERO;
        let mut total_installments = Decimal::ZERO;

        for row in &self.rows {
            total_interest += row.interest;
            total_principal += row.principal;
            total_early_repayment += row.early_repayment;
            total_commission += row.commission;
            total_installments += row.payment;
        }

        let total_paid = total_installments + total_early_repayment + total_commission;
        let final_balance = self
            .rows
            .last()
            .map(|row| row.balance)
            .unwrap_or(self.initial_principal);

        ScheduleSummary {
            total_interest,
            total_principal,
            total_early_repayment,
            total_commission,
            total_paid,
            final_balance,
            months_used: self.rows.len() as u32,
            interest_share_of_paid: percentage(total_interest, total_paid),
            amortized_share_of_principal: percentage(
                total_principal + total_early_repayment,
                self.initial_principal,
            ),
        }
    }
}

/// Rounds to cents, half away from zero.
pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole` in percent with one decimal; zero when `whole` is not positive.
pub(crate) fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (part / whole * dec!(100)).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a nominal annual percentage (TAN) to the monthly rate as a fraction.
pub fn monthly_rate(tan: Decimal) -> Decimal {
    tan / dec!(100) / dec!(12)
}

/// Installment that repays `principal` in exactly `months` at nominal rate `tan`.
///
/// PMT = P * [r(1 + r)^n] / [(1 + r)^n – 1], rounded to cents.
pub fn standard_installment(principal: Decimal, tan: Decimal, months: u32) -> Decimal {
    if months == 0 {
        return Decimal::ZERO;
    }
    let rate = monthly_rate(tan);
    if rate.is_zero() {
        return round_cents(principal / Decimal::from(months));
    }
    let growth = (Decimal::ONE + rate).powu(months.into());
    round_cents(principal * (rate * growth) / (growth - Decimal::ONE))
}

/// Sums early repayments per month, dropping non-positive amounts and months
/// outside `1..=months`.
fn aggregate_early_repayments(repayments: &[EarlyRepayment], months: u32) -> BTreeMap<u32, Decimal> {
    let mut by_month = BTreeMap::new();
    for repayment in repayments {
        if repayment.amount <= Decimal::ZERO || repayment.month < 1 || repayment.month > months {
            trace!(amount = %repayment.amount, month = repayment.month, "ignoring early repayment");
            continue;
        }
        *by_month.entry(repayment.month).or_insert(Decimal::ZERO) += repayment.amount;
    }
    by_month
}

/// Generates the amortization schedule.
///
/// Runs for at most `params.months` rows and stops as soon as the balance
/// reaches zero. Early repayments are applied after that month's
/// installment; in [`AmortizationMode::ReducePayment`] the installment is
/// rescaled by the ratio of balances around each repayment.
///
/// Never fails: out-of-range inputs produce an empty or minimal schedule.
pub fn generate_schedule(params: &LoanParameters, early_repayments: &[EarlyRepayment]) -> Schedule {
    let extra_by_month = aggregate_early_repayments(early_repayments, params.months);
    let rate = monthly_rate(params.tan);

    let mut balance = params.principal;
    let mut payment = params.monthly_installment;
    let mut rows = Vec::new();

    for month in 1..=params.months {
        if balance <= Decimal::ZERO {
            break;
        }

        let interest = balance * rate;
        let owed = balance + interest;
        // Capped installment clears the balance exactly.
        let (effective_payment, amortization) = if payment >= owed {
            (owed, balance)
        } else {
            (payment, payment - interest)
        };
        balance = (balance - amortization).max(Decimal::ZERO);

        let mut early_repayment = Decimal::ZERO;
        let mut commission = Decimal::ZERO;
        if let Some(&requested) = extra_by_month.get(&month) {
            early_repayment = requested.min(balance);
            commission = commission_rate(params.credit_type, month, params.months).apply(early_repayment);

            let balance_before_early = balance;
            balance = (balance - early_repayment).max(Decimal::ZERO);

            if params.amortization_mode == AmortizationMode::ReducePayment
                && balance > Decimal::ZERO
                && balance_before_early > Decimal::ZERO
            {
                payment = payment * balance / balance_before_early;
            }
        }

        rows.push(AmortizationRow {
            month,
            payment: round_cents(effective_payment),
            interest: round_cents(interest),
            principal: round_cents(amortization),
            early_repayment: round_cents(early_repayment),
            commission: round_cents(commission),
            balance: round_cents(balance),
            interest_pct: percentage(interest, effective_payment),
            principal_pct: percentage(amortization, effective_payment),
        });

        if balance <= Decimal::ZERO {
            break;
        }
    }

    debug!(
        months_used = rows.len(),
        final_balance = %round_cents(balance),
        mode = params.amortization_mode.as_str(),
        "generated amortization schedule"
    );

    Schedule { initial_principal: params.principal, rows }
}
