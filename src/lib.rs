//! `pt_financial` is a Rust library for simulating credit repayment in Portugal.
//!
//! It provides:
//! - **Amortization schedule**: month-by-month table for the French method
//!   (constant installment), with extraordinary early repayments handled either
//!   by keeping the installment and shortening the term (`reduce_term`) or by
//!   keeping the term and lowering the installment (`reduce_payment`).
//! - **Commission caps**: the early-repayment commission limits for housing
//!   (variable and fixed rate) and consumer credit.
//! - **Effort rate**: debt-to-income ratio and its risk tier.
//! - **Share tokens**: a compact base64url encoding of all simulator inputs.
//!
//! Every engine is a pure function of its inputs. Hosts own the inputs, call
//! the engines whenever they change and render the results.
//!
//! ## Usage
//!
//! Add `pt_financial` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pt_financial = "0.1.0"
//! rust_decimal = "1.39.0"
//! rust_decimal_macros = "1.39.0"
//! ```
//!
//! Then generate a schedule and summarize it:
//!
//! ```rust
//! use pt_financial::{generate_schedule, AmortizationMode, EarlyRepayment, LoanParameters};
//! use rust_decimal_macros::dec;
//!
//! let params = LoanParameters {
//!     amortization_mode: AmortizationMode::ReducePayment,
//!     ..LoanParameters::default()
//! };
//! let repayments = [EarlyRepayment { amount: dec!(5000), month: 12 }];
//!
//! let schedule = generate_schedule(&params, &repayments);
//! let summary = schedule.summary();
//!
//! assert_eq!(schedule.rows[11].commission, dec!(25.00));
//! println!("Total interest:  {:.2}", summary.total_interest);
//! println!("Total paid:      {:.2}", summary.total_paid);
//! println!("Remaining debt:  {:.2}", summary.final_balance);
//! ```
//!
//! And the effort rate:
//!
//! ```rust
//! use pt_financial::{evaluate_effort, Debt, RiskLevel};
//! use rust_decimal_macros::dec;
//!
//! let debts = [
//!     Debt { name: "car".to_string(), amount: dec!(300) },
//!     Debt { name: "card".to_string(), amount: dec!(200) },
//! ];
//! let result = evaluate_effort(dec!(1500), &debts);
//! assert_eq!(result.risk_level, RiskLevel::Moderate);
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod amortization;
pub mod commission;
pub mod effort;
pub mod error;
pub mod share;
pub mod storage;

pub use amortization::{
    AmortizationMode, AmortizationRow, EarlyRepayment, LoanParameters, Schedule, ScheduleSummary,
    generate_schedule, monthly_rate, standard_installment,
};
pub use commission::{
    CommissionRate, CreditType, commission_rate, estimate_commission, total_estimated_commission,
};
pub use effort::{Debt, EffortInputs, EffortResult, RiskLevel, evaluate as evaluate_effort};
pub use error::{DecodeError, ParameterError};
pub use share::{
    ActiveTab, CreditSnapshot, ShareSnapshot, decode as decode_share, decode_token as decode_share_token,
    encode as encode_share,
};
pub use storage::{
    CreditState, KeyValueStore, MemoryStore, load_credit_state, load_effort_inputs, save_credit_state,
    save_effort_inputs,
};
