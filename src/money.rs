use rust_decimal::Decimal;

use crate::error::LedgerError;

/// Minor-unit precision of every stored amount (NUMERIC(18, 2)).
pub const SCALE: u32 = 2;

/// Largest magnitude a NUMERIC(18, 2) column can hold.
const MAX_WHOLE_DIGITS: u32 = 16;

/// Strictly positive amount, e.g. a payment or webhook credit.
pub fn positive_amount(field: &'static str, value: Decimal) -> Result<Decimal, LedgerError> {
    if value <= Decimal::ZERO {
        return Err(LedgerError::validation(field, "must be greater than 0"));
    }
    normalize(field, value)
}

/// Zero or positive amount, e.g. an opening balance.
pub fn non_negative_amount(field: &'static str, value: Decimal) -> Result<Decimal, LedgerError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(LedgerError::validation(field, "must be greater than or equal to 0"));
    }
    normalize(field, value)
}

/// Whether `value` can be stored in a NUMERIC(18, 2) column.
pub fn fits_column(value: Decimal) -> bool {
    value.abs() < Decimal::from(10_i64.pow(MAX_WHOLE_DIGITS))
}

/// A credit that would push a balance past what the column can hold.
pub fn balance_overflow() -> LedgerError {
    LedgerError::validation("amount", "would exceed the maximum account balance")
}

fn normalize(field: &'static str, value: Decimal) -> Result<Decimal, LedgerError> {
    let value = value.normalize();
    if value.scale() > SCALE {
        return Err(LedgerError::validation(
            field,
            format!("at most {SCALE} decimal places allowed"),
        ));
    }
    if !fits_column(value) {
        return Err(LedgerError::validation(field, "amount is too large"));
    }
    let mut out = value;
    out.rescale(SCALE);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn positive_amount_is_rescaled() {
        let v = positive_amount("amount", dec("100")).unwrap();
        assert_eq!(v.to_string(), "100.00");
        assert_eq!(positive_amount("amount", dec("0.1")).unwrap().to_string(), "0.10");
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        assert_eq!(positive_amount("amount", dec("12.5000")).unwrap().to_string(), "12.50");
    }

    #[test]
    fn zero_and_negative_rejected_for_positive() {
        for raw in ["0", "0.00", "-1"] {
            let err = positive_amount("amount", dec(raw)).unwrap_err();
            assert!(matches!(err, LedgerError::Validation { field: "amount", .. }));
        }
    }

    #[test]
    fn sub_cent_rejected() {
        let err = positive_amount("amount", dec("1.001")).unwrap_err();
        assert!(err.to_string().contains("decimal places"));
    }

    #[test]
    fn oversized_rejected() {
        assert!(positive_amount("amount", dec("10000000000000000")).is_err());
        assert!(positive_amount("amount", dec("9999999999999999.99")).is_ok());
    }

    #[test]
    fn column_bounds() {
        assert!(fits_column(dec("9999999999999999.99")));
        assert!(fits_column(dec("-9999999999999999.99")));
        assert!(!fits_column(dec("10000000000000000.00")));
    }

    #[test]
    fn opening_balance_may_be_zero() {
        assert_eq!(non_negative_amount("balance", Decimal::ZERO).unwrap().to_string(), "0.00");
        assert!(non_negative_amount("balance", dec("-0.01")).is_err());
    }
}
