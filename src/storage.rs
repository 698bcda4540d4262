//! Persistence of raw simulator inputs through a host-provided key-value store.
//!
//! The engines never touch storage. Hosts load the last inputs on start-up,
//! feed them to the engines and save them back on change. Loading never
//! fails: anything missing or unreadable falls back to the defaults, field by
//! field.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::amortization::{AmortizationMode, EarlyRepayment, LoanParameters};
use crate::commission::CreditType;
use crate::effort::{Debt, EffortInputs};

pub const CREDIT_STATE_KEY: &str = "credit-sim-credit";
pub const EFFORT_STATE_KEY: &str = "credit-sim-effort";

/// Minimal string key-value store, e.g. browser local storage or a file.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Everything the credit simulator tab persists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreditState {
    pub parameters: LoanParameters,
    pub early_repayments: Vec<EarlyRepayment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedCredit {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    loan_amount: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    tan: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    taeg: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    monthly_payment: Decimal,
    months: u32,
    credit_type: CreditType,
    amortization_mode: AmortizationMode,
    early_repayments: Vec<PersistedRepayment>,
}

#[derive(Serialize)]
struct PersistedRepayment {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    amount: Decimal,
    month: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedEffort<'a> {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    monthly_income: Decimal,
    debts: Vec<PersistedDebt<'a>>,
}

#[derive(Serialize)]
struct PersistedDebt<'a> {
    name: &'a str,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    amount: Decimal,
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn decimal_field(object: &Map<String, Value>, key: &str) -> Option<Decimal> {
    match object.get(key)? {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text),
        _ => None,
    }
}

fn month_field(object: &Map<String, Value>, key: &str) -> Option<u32> {
    object
        .get(key)?
        .as_u64()
        .and_then(|value| u32::try_from(value).ok())
}

fn load_object(store: &dyn KeyValueStore, key: &str) -> Option<Map<String, Value>> {
    let raw = store.get(key)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => {
            warn!(key, "persisted state is not an object, using defaults");
            None
        }
        Err(err) => {
            warn!(key, error = %err, "persisted state is not valid JSON, using defaults");
            None
        }
    }
}

/// Loads the credit tab state. Each missing or invalid field takes its default.
pub fn load_credit_state(store: &dyn KeyValueStore) -> CreditState {
    let defaults = CreditState::default();
    let Some(object) = load_object(store, CREDIT_STATE_KEY) else {
        return defaults;
    };
    let fallback = defaults.parameters;

    let parameters = LoanParameters {
        principal: decimal_field(&object, "loanAmount").unwrap_or(fallback.principal),
        tan: decimal_field(&object, "tan").unwrap_or(fallback.tan),
        taeg: decimal_field(&object, "taeg").unwrap_or(fallback.taeg),
        monthly_installment: decimal_field(&object, "monthlyPayment").unwrap_or(fallback.monthly_installment),
        months: month_field(&object, "months").unwrap_or(fallback.months),
        credit_type: object
            .get("creditType")
            .and_then(Value::as_str)
            .and_then(CreditType::from_name)
            .unwrap_or(fallback.credit_type),
        amortization_mode: object
            .get("amortizationMode")
            .and_then(Value::as_str)
            .and_then(AmortizationMode::from_name)
            .unwrap_or(fallback.amortization_mode),
    };

    // Unreadable entries are skipped; the rest of the list is kept.
    let early_repayments = match object.get("earlyRepayments") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|item| {
                Some(EarlyRepayment {
                    amount: decimal_field(item, "amount")?,
                    month: month_field(item, "month")?,
                })
            })
            .collect(),
        _ => defaults.early_repayments,
    };

    CreditState { parameters, early_repayments }
}

pub fn save_credit_state(store: &mut dyn KeyValueStore, state: &CreditState) -> anyhow::Result<()> {
    let params = &state.parameters;
    let persisted = PersistedCredit {
        loan_amount: params.principal,
        tan: params.tan,
        taeg: params.taeg,
        monthly_payment: params.monthly_installment,
        months: params.months,
        credit_type: params.credit_type,
        amortization_mode: params.amortization_mode,
        early_repayments: state
            .early_repayments
            .iter()
            .map(|repayment| PersistedRepayment { amount: repayment.amount, month: repayment.month })
            .collect(),
    };
    let json = serde_json::to_string(&persisted).context("failed to serialize credit state")?;
    store
        .set(CREDIT_STATE_KEY, json)
        .with_context(|| format!("failed to persist {CREDIT_STATE_KEY}"))
}

/// Loads the effort tab state. Each missing or invalid field takes its default.
pub fn load_effort_inputs(store: &dyn KeyValueStore) -> EffortInputs {
    let defaults = EffortInputs::default();
    let Some(object) = load_object(store, EFFORT_STATE_KEY) else {
        return defaults;
    };

    let debts = match object.get("debts") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|item| {
                Some(Debt {
                    name: item.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    amount: decimal_field(item, "amount")?,
                })
            })
            .collect(),
        _ => defaults.debts,
    };

    EffortInputs {
        monthly_income: decimal_field(&object, "monthlyIncome").unwrap_or(defaults.monthly_income),
        debts,
    }
}

pub fn save_effort_inputs(store: &mut dyn KeyValueStore, inputs: &EffortInputs) -> anyhow::Result<()> {
    let persisted = PersistedEffort {
        monthly_income: inputs.monthly_income,
        debts: inputs
            .debts
            .iter()
            .map(|debt| PersistedDebt { name: &debt.name, amount: debt.amount })
            .collect(),
    };
    let json = serde_json::to_string(&persisted).context("failed to serialize effort inputs")?;
    store
        .set(EFFORT_STATE_KEY, json)
        .with_context(|| format!("failed to persist {EFFORT_STATE_KEY}"))
}
