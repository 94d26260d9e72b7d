//! PunchEngine — Arithmetic Primitives
//!
//! Counters are u64. Requested amounts arrive as i64 from the
//! dispatcher and are validated here before any counter is touched.

use crate::error::EngineError;

/// Checked counter addition. Overflow is an error, never a wrap.
pub fn checked_add(a: u64, b: u64) -> Result<u64, EngineError> {
    a.checked_add(b).ok_or(EngineError::Overflow { a, b })
}

/// Accept a strictly positive amount and return it as a counter delta.
pub fn validate_amount(amount: i64) -> Result<u64, EngineError> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount { amount });
    }
    Ok(amount.unsigned_abs())
}

/// Accept a non-zero signed delta and return its magnitude.
///
/// The sign picks the direction; zero is rejected as `InvalidAmount`.
pub fn validate_delta(delta: i64) -> Result<u64, EngineError> {
    if delta == 0 {
        return Err(EngineError::InvalidAmount { amount: delta });
    }
    Ok(delta.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_ok() {
        assert_eq!(checked_add(3, 4), Ok(7));
    }

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(
            checked_add(u64::MAX, 1),
            Err(EngineError::Overflow { a: u64::MAX, b: 1 })
        );
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(12), Ok(12));
        assert_eq!(
            validate_amount(0),
            Err(EngineError::InvalidAmount { amount: 0 })
        );
        assert_eq!(
            validate_amount(-3),
            Err(EngineError::InvalidAmount { amount: -3 })
        );
    }

    #[test]
    fn test_validate_delta() {
        assert_eq!(validate_delta(-5), Ok(5));
        assert_eq!(validate_delta(2), Ok(2));
        assert_eq!(validate_delta(i64::MIN), Ok(1u64 << 63));
        assert!(validate_delta(0).is_err());
    }
}
