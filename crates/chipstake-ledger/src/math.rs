use chipstake_types::{BasisPoints, LedgerError, LedgerResult, BASIS_POINTS_DENOMINATOR};
use ethers::types::U256;

// Products of two u128 values fit in 256 bits, so intermediates never wrap.

fn narrow(value: U256) -> LedgerResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(LedgerError::ArithmeticOverflow);
    }
    Ok(value.low_u128())
}

/// `floor(a * b / d)`.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> LedgerResult<u128> {
    if d == 0 {
        return Err(LedgerError::ArithmeticOverflow);
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(d))
}

/// `ceil(a * b / d)`.
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> LedgerResult<u128> {
    if d == 0 {
        return Err(LedgerError::ArithmeticOverflow);
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(d);
    let (quotient, remainder) = product.div_mod(divisor);
    let rounded = if remainder.is_zero() { quotient } else { quotient + U256::one() };
    narrow(rounded)
}

/// `floor(amount * rate / 10000)`.
pub fn apply_rate(rate: BasisPoints, amount: u128) -> LedgerResult<u128> {
    mul_div_floor(amount, u128::from(rate.0), u128::from(BASIS_POINTS_DENOMINATOR))
}

/// Splits `amount` into `(taken, remainder)` at `rate`.
pub fn split_rate(rate: BasisPoints, amount: u128) -> LedgerResult<(u128, u128)> {
    let taken = apply_rate(rate, amount)?;
    Ok((taken, sub(amount, taken)?))
}

pub fn div_ceil(a: u128, d: u128) -> LedgerResult<u128> {
    if d == 0 {
        return Err(LedgerError::ArithmeticOverflow);
    }
    Ok(a / d + u128::from(a % d != 0))
}

pub fn add(a: u128, b: u128) -> LedgerResult<u128> {
    a.checked_add(b).ok_or(LedgerError::ArithmeticOverflow)
}

pub fn sub(a: u128, b: u128) -> LedgerResult<u128> {
    a.checked_sub(b).ok_or(LedgerError::ArithmeticOverflow)
}

pub fn sum<I: IntoIterator<Item = u128>>(values: I) -> LedgerResult<u128> {
    values.into_iter().try_fold(0u128, add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_floor(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div_ceil(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_ceil(9, 10, 3).unwrap(), 30);
        assert_eq!(div_ceil(7, 2).unwrap(), 4);
        assert_eq!(div_ceil(8, 2).unwrap(), 4);
    }

    #[test]
    fn test_wide_intermediate() {
        let big = u128::MAX / 2;
        assert_eq!(mul_div_floor(big, big, big).unwrap(), big);
        assert_eq!(mul_div_ceil(big, 3, 3).unwrap(), big);
    }

    #[test]
    fn test_overflow_and_zero_divisor() {
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(mul_div_floor(1, 1, 0), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(add(u128::MAX, 1), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(sub(0, 1), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(sum([1, 2, 3]).unwrap(), 6);
    }

    #[test]
    fn test_rate_split() {
        assert_eq!(split_rate(BasisPoints(500), 100).unwrap(), (5, 95));
        assert_eq!(split_rate(BasisPoints::MAX, 7).unwrap(), (7, 0));
        assert_eq!(split_rate(BasisPoints::ZERO, 7).unwrap(), (0, 7));
    }

    #[test]
    fn test_rate_on_amounts_near_u128_max() {
        assert_eq!(apply_rate(BasisPoints(2), u128::MAX).unwrap(), u128::MAX / 5_000);
        assert_eq!(apply_rate(BasisPoints::MAX, u128::MAX).unwrap(), u128::MAX);
        let (taken, rest) = split_rate(BasisPoints(9_999), u128::MAX).unwrap();
        assert_eq!(taken + rest, u128::MAX);
        assert_eq!(apply_rate(BasisPoints(10_001), u128::MAX), Err(LedgerError::ArithmeticOverflow));
    }

    proptest! {
        #[test]
        fn prop_rate_split_conserves(amount in any::<u128>(), rate in 0u64..=10_000) {
            let (taken, rest) = split_rate(BasisPoints(rate), amount).unwrap();
            prop_assert_eq!(taken + rest, amount);
            prop_assert!(taken <= amount);
        }
    }
}
