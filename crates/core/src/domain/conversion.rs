use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use crate::errors::DomainError;

pub const SOURCE_CURRENCY: &str = "INR";
pub const TARGET_CURRENCY: &str = "USD";

/// Largest magnitude at which every whole `f64` is still an exact integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A finite, non-negative amount of rupees.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::InvalidAmount(format!("{value} is not a finite number")));
        }
        if value < 0.0 {
            return Err(DomainError::InvalidAmount(format!("{value} is negative")));
        }
        // normalise -0.0 so it renders as "0"
        Ok(Self(value + 0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionResult {
    pub inr_amount: f64,
    pub usd_amount: f64,
}

impl ConversionResult {
    pub fn compute(amount: Amount, usd_rate: f64) -> Self {
        Self { inr_amount: amount.value(), usd_amount: amount.value() * usd_rate }
    }

    pub fn usd_display(&self) -> String {
        format_two_decimals(self.usd_amount)
    }

    /// Human-readable one-liner, e.g. `100 INR = 1.20 USD`.
    pub fn summary(&self) -> String {
        format!(
            "{} {SOURCE_CURRENCY} = {} {TARGET_CURRENCY}",
            display_number(self.inr_amount),
            self.usd_display()
        )
    }
}

/// Renders `value` with exactly two decimals, rounding ties away from zero on the
/// exact binary value.
pub fn format_two_decimals(value: f64) -> String {
    match Decimal::from_f64_retain(value) {
        Some(decimal) => {
            let mut rounded =
                decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(2);
            rounded.to_string()
        }
        None => format!("{value:.2}"),
    }
}

/// Shortest text form of a number, whole values without a fractional part.
pub fn display_number(value: f64) -> String {
    if is_whole(value) {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Serializes whole numbers as JSON integers (`100`) and everything else as floats.
pub fn serialize_js_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if is_whole(*value) {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::{
        display_number, format_two_decimals, serialize_js_number, Amount, ConversionResult,
    };
    use crate::errors::DomainError;

    #[test]
    fn amount_rejects_negative_and_non_finite_values() {
        assert!(matches!(Amount::new(-0.01), Err(DomainError::InvalidAmount(_))));
        assert!(matches!(Amount::new(f64::NAN), Err(DomainError::InvalidAmount(_))));
        assert!(matches!(Amount::new(f64::INFINITY), Err(DomainError::InvalidAmount(_))));
        assert_eq!(Amount::new(0.0).expect("zero is valid").value(), 0.0);
    }

    #[test]
    fn conversion_multiplies_amount_by_rate_without_rounding() {
        let amount = Amount::new(1234.5).expect("valid amount");
        let result = ConversionResult::compute(amount, 0.011987);

        assert_eq!(result.inr_amount, 1234.5);
        assert_eq!(result.usd_amount, 1234.5 * 0.011987);
    }

    #[test]
    fn worked_example_renders_summary() {
        let result = ConversionResult::compute(Amount::new(100.0).expect("valid"), 0.012);

        assert_eq!(result.usd_display(), "1.20");
        assert_eq!(result.summary(), "100 INR = 1.20 USD");
    }

    #[test]
    fn two_decimal_rendering_pads_and_rounds() {
        assert_eq!(format_two_decimals(0.0), "0.00");
        assert_eq!(format_two_decimals(3.0), "3.00");
        assert_eq!(format_two_decimals(2.5), "2.50");
        assert_eq!(format_two_decimals(1.005), "1.00");
        assert_eq!(format_two_decimals(0.125), "0.13");
        assert_eq!(format_two_decimals(1234.5678), "1234.57");
    }

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(display_number(100.0), "100");
        assert_eq!(display_number(100.5), "100.5");
        assert_eq!(display_number(0.0), "0");
    }

    #[test]
    fn js_number_serialization_keeps_integers_integral() {
        #[derive(Serialize)]
        struct Payload {
            #[serde(serialize_with = "serialize_js_number")]
            value: f64,
        }

        let whole = serde_json::to_string(&Payload { value: 100.0 }).expect("serialize");
        let fractional = serde_json::to_string(&Payload { value: 99.25 }).expect("serialize");

        assert_eq!(whole, r#"{"value":100}"#);
        assert_eq!(fractional, r#"{"value":99.25}"#);
    }
}
