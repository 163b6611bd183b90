//! Money helpers using decimal arithmetic.
//!
//! Amounts are plain [`Decimal`] values in the store currency's standard unit.
//! Nothing here rounds: totals are exact, and rounding is a display concern.

use rust_decimal::Decimal;

/// Errors for out-of-range monetary inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Price below zero.
    #[error("price cannot be negative")]
    NegativePrice,
    /// Discount outside 0..=100.
    #[error("discount percentage must be between 0 and 100")]
    DiscountOutOfRange,
}

/// Price after applying a percentage discount.
///
/// `price - price * discount_pct / 100`, used by both the cart and the server
/// so that client and server totals agree to the last digit.
///
/// ```
/// use rust_decimal::Decimal;
/// use storehouse_core::discounted_unit_price;
///
/// assert_eq!(
///     discounted_unit_price(Decimal::from(1000), Decimal::from(10)),
///     Decimal::from(900)
/// );
/// ```
#[must_use]
pub fn discounted_unit_price(price: Decimal, discount_pct: Decimal) -> Decimal {
    price - price * discount_pct / Decimal::ONE_HUNDRED
}

/// Check that a price is non-negative.
///
/// # Errors
///
/// Returns [`MoneyError::NegativePrice`] for negative amounts.
pub fn validate_price(price: Decimal) -> Result<(), MoneyError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(MoneyError::NegativePrice);
    }
    Ok(())
}

/// Check that a discount percentage lies in `0..=100`.
///
/// # Errors
///
/// Returns [`MoneyError::DiscountOutOfRange`] otherwise.
pub fn validate_discount(discount_pct: Decimal) -> Result<(), MoneyError> {
    if discount_pct < Decimal::ZERO || discount_pct > Decimal::ONE_HUNDRED {
        return Err(MoneyError::DiscountOutOfRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_discount_is_exact() {
        let price = Decimal::new(1999, 2); // 19.99
        let net = discounted_unit_price(price, Decimal::new(125, 1)); // 12.5%
        assert_eq!(net, Decimal::new(17_49125, 5));
    }

    #[test]
    fn test_zero_and_full_discount() {
        let price = Decimal::from(500);
        assert_eq!(discounted_unit_price(price, Decimal::ZERO), price);
        assert_eq!(
            discounted_unit_price(price, Decimal::ONE_HUNDRED),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_validation_bounds() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert_eq!(
            validate_price(Decimal::from(-1)),
            Err(MoneyError::NegativePrice)
        );
        assert!(validate_discount(Decimal::ONE_HUNDRED).is_ok());
        assert_eq!(
            validate_discount(Decimal::new(1001, 1)),
            Err(MoneyError::DiscountOutOfRange)
        );
        assert_eq!(
            validate_discount(Decimal::from(-5)),
            Err(MoneyError::DiscountOutOfRange)
        );
    }
}
