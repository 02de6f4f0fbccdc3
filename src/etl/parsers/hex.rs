/// Hex Quantity Parser
///
/// Converts `0x`-prefixed hex strings from untrusted chain data into integers
/// and 18-decimal fixed-point amounts. Everything here is pure.
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};

use super::DecodeError;

/// Number of decimals of the chain's native and token amounts
pub const AMOUNT_DECIMALS: i64 = 18;

/// Strip an optional `0x`/`0X` prefix
pub fn strip_hex_prefix(hex: &str) -> &str {
    hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex)
}

/// Parse a hex string into an unbounded unsigned integer. `""` and `"0x"` are zero.
pub fn parse_hex_uint(hex: &str) -> Result<BigUint, DecodeError> {
    let digits = strip_hex_prefix(hex.trim());
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }

    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| DecodeError::InvalidHex(truncate(hex)))
}

/// Parse a hex string into a `u64`, rejecting values that do not fit
pub fn parse_hex_u64(hex: &str) -> Result<u64, DecodeError> {
    parse_hex_uint(hex)?.to_u64().ok_or_else(|| DecodeError::Overflow(truncate(hex)))
}

/// Lenient form of [`parse_hex_uint`]: malformed input decodes to zero
pub fn hex_to_uint(hex: &str) -> BigUint {
    parse_hex_uint(hex).unwrap_or_default()
}

/// Scale a raw 18-decimal integer into a decimal amount
pub fn to_amount(raw: BigUint) -> BigDecimal {
    BigDecimal::new(BigInt::from(raw), AMOUNT_DECIMALS)
}

/// Decode a hex amount (native value or a single ABI word) divided by 10^18
pub fn try_decode_amount(hex: &str) -> Result<BigDecimal, DecodeError> {
    parse_hex_uint(hex).map(to_amount)
}

/// Lenient form of [`try_decode_amount`]
pub fn decode_amount(hex: &str) -> BigDecimal {
    try_decode_amount(hex).unwrap_or_else(|_| BigDecimal::zero())
}

/// Keep error payloads short, calldata can be kilobytes
fn truncate(s: &str) -> String {
    if s.len() <= 24 {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(24).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_and_bare_prefix_are_zero() {
        assert_eq!(parse_hex_uint("").unwrap(), BigUint::zero());
        assert_eq!(parse_hex_uint("0x").unwrap(), BigUint::zero());
        assert_eq!(parse_hex_u64("0x2a").unwrap(), 42);
        assert_eq!(parse_hex_u64("2A").unwrap(), 42);
    }

    #[test]
    fn test_malformed_hex_is_an_error_not_a_panic() {
        assert!(matches!(parse_hex_uint("0xzz"), Err(DecodeError::InvalidHex(_))));
        assert_eq!(hex_to_uint("0xnot-hex"), BigUint::zero());
    }

    #[test]
    fn test_u64_overflow() {
        let word = format!("0x1{}", "0".repeat(63));
        assert!(matches!(parse_hex_u64(&word), Err(DecodeError::Overflow(_))));
        assert!(parse_hex_uint(&word).is_ok());
    }

    #[test]
    fn test_decode_amount_is_exact() {
        // 1.5 * 10^18
        assert_eq!(decode_amount("0x14d1120d7b160000"), BigDecimal::from_str("1.5").unwrap());
        assert_eq!(decode_amount("0x1"), BigDecimal::from_str("0.000000000000000001").unwrap());
        assert_eq!(decode_amount("0x"), BigDecimal::zero());
        assert_eq!(decode_amount("garbage"), BigDecimal::zero());
    }

    #[test]
    fn test_decode_amount_full_word() {
        let max = format!("0x{}", "f".repeat(64));
        let amount = try_decode_amount(&max).unwrap();
        assert!(amount > BigDecimal::from(10u64.pow(18)));
    }
}
