//! Compact, URL-safe share tokens carrying the full simulator state.
//!
//! A token is a versioned JSON object with single-letter keys, encoded as
//! base64url without padding so it can live in a URL fragment:
//!
//! ```text
//! {"v":1,"t":"credit",
//!  "c":{"a":42975,"r":4.13,"g":5.08,"m":36,"k":"consumer","d":"reduce_term","e":[{"a":5000,"m":12}],"p":593},
//!  "f":{"i":1500,"d":[{"n":"car","a":300}]}}
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::amortization::{AmortizationMode, EarlyRepayment, LoanParameters};
use crate::commission::CreditType;
use crate::effort::{Debt, EffortInputs};
use crate::error::DecodeError;

pub const SHARE_TOKEN_VERSION: u32 = 1;

/// Simulator tab that was active when the token was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Credit,
    Effort,
}

/// Credit simulator inputs as carried by a share token.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditSnapshot {
    pub loan_amount: Decimal,
    pub tan: Decimal,
    pub taeg: Decimal,
    pub months: u32,
    pub credit_type: CreditType,
    pub amortization_mode: AmortizationMode,
    pub early_repayments: Vec<EarlyRepayment>,
    /// Absent in tokens from encoders that did not carry the installment.
    pub monthly_installment: Option<Decimal>,
}

impl CreditSnapshot {
    pub fn from_parameters(params: &LoanParameters, early_repayments: &[EarlyRepayment]) -> Self {
        Self {
            loan_amount: params.principal,
            tan: params.tan,
            taeg: params.taeg,
            months: params.months,
            credit_type: params.credit_type,
            amortization_mode: params.amortization_mode,
            early_repayments: early_repayments.to_vec(),
            monthly_installment: Some(params.monthly_installment),
        }
    }

    /// Rebuilds engine parameters, using `fallback_installment` when the
    /// token did not carry one.
    pub fn to_loan_parameters(&self, fallback_installment: Decimal) -> LoanParameters {
        LoanParameters {
            principal: self.loan_amount,
            tan: self.tan,
            taeg: self.taeg,
            monthly_installment: self.monthly_installment.unwrap_or(fallback_installment),
            months: self.months,
            credit_type: self.credit_type,
            amortization_mode: self.amortization_mode,
        }
    }
}

/// Everything a share token restores.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareSnapshot {
    pub active_tab: ActiveTab,
    pub credit: CreditSnapshot,
    pub effort: EffortInputs,
}

#[derive(Serialize, Deserialize)]
struct ShareToken {
    v: u32,
    t: ActiveTab,
    c: CreditToken,
    f: EffortToken,
}

#[derive(Serialize, Deserialize)]
struct CreditToken {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    a: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    r: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    g: Decimal,
    m: u32,
    k: CreditType,
    #[serde(default)]
    d: AmortizationMode,
    #[serde(default, deserialize_with = "null_as_empty")]
    e: Vec<RepaymentToken>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::arbitrary_precision_option"
    )]
    p: Option<Decimal>,
}

#[derive(Serialize, Deserialize)]
struct RepaymentToken {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    a: Decimal,
    m: u32,
}

#[derive(Serialize, Deserialize)]
struct EffortToken {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    i: Decimal,
    #[serde(default, deserialize_with = "null_as_empty")]
    d: Vec<DebtToken>,
}

#[derive(Serialize, Deserialize)]
struct DebtToken {
    n: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    a: Decimal,
}

#[derive(Deserialize)]
struct VersionProbe {
    v: u32,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ShareToken {
    fn new(credit: &CreditSnapshot, effort: &EffortInputs, active_tab: ActiveTab) -> Self {
        Self {
            v: SHARE_TOKEN_VERSION,
            t: active_tab,
            c: CreditToken {
                a: credit.loan_amount,
                r: credit.tan,
                g: credit.taeg,
                m: credit.months,
                k: credit.credit_type,
                d: credit.amortization_mode,
                e: credit
                    .early_repayments
                    .iter()
                    .map(|repayment| RepaymentToken { a: repayment.amount, m: repayment.month })
                    .collect(),
                p: credit.monthly_installment,
            },
            f: EffortToken {
                i: effort.monthly_income,
                d: effort
                    .debts
                    .iter()
                    .map(|debt| DebtToken { n: debt.name.clone(), a: debt.amount })
                    .collect(),
            },
        }
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.c.m == 0 {
            return Err(DecodeError::InvalidField { field: "c.m", reason: "months must be at least 1" });
        }
        if self.c.a <= Decimal::ZERO {
            return Err(DecodeError::InvalidField { field: "c.a", reason: "loan amount must be positive" });
        }
        if self.f.i < Decimal::ZERO {
            return Err(DecodeError::InvalidField { field: "f.i", reason: "income cannot be negative" });
        }
        Ok(())
    }

    fn into_snapshot(self) -> ShareSnapshot {
        ShareSnapshot {
            active_tab: self.t,
            credit: CreditSnapshot {
                loan_amount: self.c.a,
                tan: self.c.r,
                taeg: self.c.g,
                months: self.c.m,
                credit_type: self.c.k,
                amortization_mode: self.c.d,
                early_repayments: self
                    .c
                    .e
                    .into_iter()
                    .map(|repayment| EarlyRepayment { amount: repayment.a, month: repayment.m })
                    .collect(),
                monthly_installment: self.c.p,
            },
            effort: EffortInputs {
                monthly_income: self.f.i,
                debts: self
                    .f
                    .d
                    .into_iter()
                    .map(|debt| Debt { name: debt.n, amount: debt.a })
                    .collect(),
            },
        }
    }
}

/// Encodes the simulator state into a URL-safe token.
pub fn encode(
    credit: &CreditSnapshot,
    effort: &EffortInputs,
    active_tab: ActiveTab,
) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(&ShareToken::new(credit, effort, active_tab))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Strict decode: any malformed, mistyped or foreign-version token is an error.
///
/// Accepts a leading `#` (raw URL fragment), trailing `=` padding and the
/// standard `+`/`/` alphabet alongside the URL-safe one.
pub fn decode_token(token: &str) -> Result<ShareSnapshot, DecodeError> {
    let normalized: String = token
        .trim()
        .trim_start_matches('#')
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD.decode(normalized)?;
    // Browser encoders emit Latin-1 bytes rather than UTF-8.
    let json = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    };

    let probe: VersionProbe = serde_json::from_str(&json)?;
    if probe.v != SHARE_TOKEN_VERSION {
        return Err(DecodeError::UnsupportedVersion(probe.v));
    }

    let token: ShareToken = serde_json::from_str(&json)?;
    token.validate()?;
    Ok(token.into_snapshot())
}

/// Decodes a token, returning `None` for anything that cannot be restored.
pub fn decode(token: &str) -> Option<ShareSnapshot> {
    match decode_token(token) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            debug!(error = %err, "rejected share token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn snapshot() -> ShareSnapshot {
        ShareSnapshot {
            active_tab: ActiveTab::Effort,
            credit: CreditSnapshot {
                loan_amount: dec!(42975),
                tan: dec!(4.13),
                taeg: dec!(5.08),
                months: 36,
                credit_type: CreditType::HousingFixed,
                amortization_mode: AmortizationMode::ReducePayment,
                early_repayments: vec![
                    EarlyRepayment { amount: dec!(5000), month: 12 },
                    EarlyRepayment { amount: dec!(1250.55), month: 24 },
                ],
                monthly_installment: Some(dec!(593)),
            },
            effort: EffortInputs {
                monthly_income: dec!(1500),
                debts: vec![
                    Debt { name: "Cartão de crédito".to_string(), amount: dec!(300) },
                    Debt { name: "car".to_string(), amount: dec!(200.5) },
                ],
            },
        }
    }

    fn encode_json(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    #[test]
    fn test_round_trip() {
        let original = snapshot();
        let token = encode(&original.credit, &original.effort, original.active_tab).unwrap();

        assert!(!token.contains('+') && !token.contains('/') && !token.contains('='));
        assert_eq!(decode(&token), Some(original));
    }

    #[test]
    fn test_token_uses_short_keys_and_numbers() {
        let original = snapshot();
        let token = encode(&original.credit, &original.effort, original.active_tab).unwrap();
        let json = String::from_utf8(URL_SAFE_NO_PAD.decode(token).unwrap()).unwrap();

        assert!(json.starts_with(r#"{"v":1,"t":"effort","c":{"a":42975,"r":4.13,"g":5.08,"m":36"#));
        assert!(json.contains(r#""k":"housing_fixed","d":"reduce_payment""#));
        assert!(json.contains(r#""e":[{"a":5000,"m":12},{"a":1250.55,"m":24}]"#));
        assert!(json.contains(r#""p":593"#));
        assert!(json.contains(r#""f":{"i":1500,"d":[{"n":"Cartão de crédito","a":300}"#));
    }

    #[test]
    fn test_decodes_token_without_optional_fields() {
        let token = encode_json(
            r#"{"v":1,"t":"credit","c":{"a":10000,"r":3.5,"g":4,"m":60,"k":"consumer"},"f":{"i":2000,"d":null}}"#,
        );
        let decoded = decode(&token).unwrap();

        assert_eq!(decoded.active_tab, ActiveTab::Credit);
        assert_eq!(decoded.credit.amortization_mode, AmortizationMode::ReduceTerm);
        assert!(decoded.credit.early_repayments.is_empty());
        assert_eq!(decoded.credit.monthly_installment, None);
        assert!(decoded.effort.debts.is_empty());

        let params = decoded.credit.to_loan_parameters(dec!(180));
        assert_eq!(params.principal, dec!(10000));
        assert_eq!(params.monthly_installment, dec!(180));
        assert_eq!(params.months, 60);
    }

    #[test]
    fn test_accepts_padding_fragment_and_standard_alphabet() {
        let original = snapshot();
        let token = encode(&original.credit, &original.effort, original.active_tab).unwrap();
        let padding = "=".repeat((4 - token.len() % 4) % 4);
        let standard: String = token
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();

        assert_eq!(decode(&format!("#{token}{padding}")), Some(original.clone()));
        assert_eq!(decode(&standard), Some(original));
    }

    #[test]
    fn test_latin1_payload_is_accepted() {
        let json = r#"{"v":1,"t":"effort","c":{"a":1000,"r":1,"g":1,"m":12,"k":"consumer","d":"reduce_term","e":[]},"f":{"i":900,"d":[{"n":"Cartão","a":50}]}}"#
;
        let latin1: Vec<u8> = json.chars().map(|c| c as u8).collect();
        assert!(String::from_utf8(latin1.clone()).is_err());
        let decoded = decode(&URL_SAFE_NO_PAD.encode(latin1)).unwrap();

        assert_eq!(decoded.effort.debts[0].name, "Cartão");
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let token = encode_json(
            r#"{"v":2,"t":"credit","c":{"a":1000,"r":1,"g":1,"m":12,"k":"consumer","d":"reduce_term","e":[]},"f":{"i":900,"d":[]}}"#,
        );

        assert!(matches!(decode_token(&token), Err(DecodeError::UnsupportedVersion(2))));
        assert_eq!(decode(&token), None);
    }

    #[rstest]
    #[case::not_base64("!!!not a token!!!")]
    #[case::empty("")]
    #[case::not_json("bm90IGpzb24")]
    #[case::missing_version(r#"{"t":"credit"}"#)]
    #[case::unknown_credit_type(r#"{"v":1,"t":"credit","c":{"a":1000,"r":1,"g":1,"m":12,"k":"leasing"},"f":{"i":900}}"#)]
    #[case::unknown_tab(r#"{"v":1,"t":"mortgage","c":{"a":1000,"r":1,"g":1,"m":12,"k":"consumer"},"f":{"i":900}}"#)]
    #[case::missing_effort(r#"{"v":1,"t":"credit","c":{"a":1000,"r":1,"g":1,"m":12,"k":"consumer"}}"#)]
    #[case::zero_months(r#"{"v":1,"t":"credit","c":{"a":1000,"r":1,"g":1,"m":0,"k":"consumer"},"f":{"i":900}}"#)]
    #[case::zero_amount(r#"{"v":1,"t":"credit","c":{"a":0,"r":1,"g":1,"m":12,"k":"consumer"},"f":{"i":900}}"#)]
    #[case::negative_income(r#"{"v":1,"t":"credit","c":{"a":1000,"r":1,"g":1,"m":12,"k":"consumer"},"f":{"i":-1}}"#)]
    fn test_malformed_tokens_are_rejected(#[case] input: &str) {
        let token = if input.starts_with('{') { encode_json(input) } else { input.to_string() };
        assert_eq!(decode(&token), None);
    }

    fn credit_strategy() -> impl Strategy<Value = CreditSnapshot> {
        (
            1i64..100_000_000,
            0i64..2_000,
            0i64..2_000,
            1u32..480,
            prop_oneof![
                Just(CreditType::HousingVariable),
                Just(CreditType::HousingFixed),
                Just(CreditType::Consumer),
            ],
            prop_oneof![Just(AmortizationMode::ReduceTerm), Just(AmortizationMode::ReducePayment)],
            prop::collection::vec((0i64..10_000_000, 0u32..500), 0..4),
            prop::option::of(1i64..1_000_000),
        )
            .prop_map(|(amount, tan, taeg, months, credit_type, mode, repayments, installment)| CreditSnapshot {
                loan_amount: Decimal::new(amount, 2),
                tan: Decimal::new(tan, 2),
                taeg: Decimal::new(taeg, 2),
                months,
                credit_type,
                amortization_mode: mode,
                early_repayments: repayments
                    .into_iter()
                    .map(|(cents, month)| EarlyRepayment { amount: Decimal::new(cents, 2), month })
                    .collect(),
                monthly_installment: installment.map(|cents| Decimal::new(cents, 2)),
            })
    }

    fn effort_strategy() -> impl Strategy<Value = EffortInputs> {
        (0i64..10_000_000, prop::collection::vec(("\\PC{0,16}", 0i64..1_000_000), 0..4)).prop_map(
            |(income, debts)| EffortInputs {
                monthly_income: Decimal::new(income, 2),
                debts: debts
                    .into_iter()
                    .map(|(name, cents)| Debt { name, amount: Decimal::new(cents, 2) })
                    .collect(),
            },
        )
    }

    fn snapshot_strategy() -> impl Strategy<Value = ShareSnapshot> {
        (
            prop_oneof![Just(ActiveTab::Credit), Just(ActiveTab::Effort)],
            credit_strategy(),
            effort_strategy(),
        )
            .prop_map(|(active_tab, credit, effort)| ShareSnapshot { active_tab, credit, effort })
    }

    #[test]
    fn test_shared_state_drives_the_schedule() {
        let params = LoanParameters { credit_type: CreditType::HousingFixed, ..LoanParameters::default() };
        let repayments = [EarlyRepayment::default()];
        let credit = CreditSnapshot::from_parameters(&params, &repayments);
        let token = encode(&credit, &EffortInputs::default(), ActiveTab::Credit).unwrap();

        let restored = decode(&token).unwrap();
        let restored_params = restored.credit.to_loan_parameters(dec!(1));

        assert_eq!(restored_params, params);
        assert_eq!(
            crate::generate_schedule(&restored_params, &restored.credit.early_repayments),
            crate::generate_schedule(&params, &repayments)
        );
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(original in snapshot_strategy()) {
            let token = encode(&original.credit, &original.effort, original.active_tab).unwrap();
            prop_assert_eq!(decode_token(&token).ok(), Some(original));
        }
    }
}
