use bigdecimal::BigDecimal;

/// Money columns are `NUMERIC(14,2)`.
const MAX_SCALE: i64 = 2;
const MAX_INTEGER_DIGITS: u32 = 12;

/// Rejects amounts the money columns cannot store without overflow or rounding.
pub(crate) fn check_amount(field: &str, amount: &BigDecimal) -> Result<(), String> {
    if amount.normalized().fractional_digit_count() > MAX_SCALE {
        return Err(format!(
            "{} cannot have more than {} decimal places",
            field, MAX_SCALE
        ));
    }
    if amount.abs() >= BigDecimal::from(10_i64.pow(MAX_INTEGER_DIGITS)) {
        return Err(format!("{} is too large", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amount(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn test_accepts_storable_amounts() {
        assert!(check_amount("amount", &amount("10.01")).is_ok());
        assert!(check_amount("amount", &amount("10.500")).is_ok());
        assert!(check_amount("amount", &amount("999999999999.99")).is_ok());
        assert!(check_amount("amount", &amount("-42")).is_ok());
    }

    #[test]
    fn test_rejects_extra_decimal_places() {
        assert_eq!(
            check_amount("amount", &amount("10.005")).unwrap_err(),
            "amount cannot have more than 2 decimal places"
        );
    }

    #[test]
    fn test_rejects_overflowing_amounts() {
        assert_eq!(
            check_amount("amount", &amount("1e15")).unwrap_err(),
            "amount is too large"
        );
        assert!(check_amount("amount", &amount("-1000000000000")).is_err());
    }
}
