/// ABI Payload Parser
///
/// Fixed-offset decoding of call-data and event-log payloads. ABI payloads are
/// sequences of 32-byte big-endian words, i.e. 64 hex characters per word.
///
/// Each field has a `try_` form that reports why decoding failed and a lenient
/// form that substitutes the safe default. Callers that want to record anomalies
/// use the `try_` form; nothing in here logs.
use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};

use super::hex::{parse_hex_uint, strip_hex_prefix, to_amount};
use super::DecodeError;

/// Hex characters per 32-byte ABI word
pub const WORD_HEX_LEN: usize = 64;

/// Card counts above this are decode anomalies
pub const MAX_CARD_COUNT: u64 = 1_000_000;

/// `0x` + 4-byte selector + first argument word
const INPUT_CARD_COUNT_OFFSET: usize = 2 + 8 + WORD_HEX_LEN;

/// Fourth word of the log data, after stripping `0x`
const LOG_CARD_COUNT_OFFSET: usize = 3 * WORD_HEX_LEN;

/// Index of the bet/claim id among the core event topics
const BET_ID_TOPIC: usize = 2;

/// The word starting at hex offset `start`
fn word_at(digits: &str, start: usize) -> Result<&str, DecodeError> {
    let end = start + WORD_HEX_LEN;
    digits.get(start..end).ok_or(DecodeError::TooShort { needed: end, actual: digits.len() })
}

fn bounded_card_count(word: &str) -> Result<u64, DecodeError> {
    let value = parse_hex_uint(word)?;
    match value.to_u64() {
        Some(count) if count <= MAX_CARD_COUNT => Ok(count),
        _ => Err(DecodeError::OutOfBounds { value: value.to_string(), max: MAX_CARD_COUNT }),
    }
}

/// Card count from the native-token call-data: second argument word, hex offset 74..138
pub fn try_card_count_from_input(input_hex: &str) -> Result<u64, DecodeError> {
    let word = word_at(input_hex.trim(), INPUT_CARD_COUNT_OFFSET)?;
    bounded_card_count(word)
}

pub fn decode_card_count_from_input(input_hex: &str) -> u64 {
    try_card_count_from_input(input_hex).unwrap_or(0)
}

/// Card count from the core event log data: fourth word, hex offset 192..256 after `0x`
pub fn try_card_count_from_log(data_hex: &str) -> Result<u64, DecodeError> {
    let word = word_at(strip_hex_prefix(data_hex.trim()), LOG_CARD_COUNT_OFFSET)?;
    bounded_card_count(word)
}

pub fn decode_card_count_from_log(data_hex: &str) -> u64 {
    try_card_count_from_log(data_hex).unwrap_or(0)
}

/// Bet/claim id carried as `topics[2]` of the core event. A missing topic is not an anomaly.
///
/// Ids must fit SQLite's signed INTEGER column.
pub fn try_bet_id(topics: &[String]) -> Result<u64, DecodeError> {
    let Some(topic) = topics.get(BET_ID_TOPIC).filter(|t| !strip_hex_prefix(t).is_empty()) else {
        return Ok(0);
    };

    let value = parse_hex_uint(topic)?;
    value.to_i64().and_then(|id| id.to_u64()).ok_or_else(|| DecodeError::Overflow(topic.clone()))
}

pub fn decode_bet_id(topics: &[String]) -> u64 {
    try_bet_id(topics).unwrap_or(0)
}

/// Amount held in the first data word of a log (transfer value, claim payout) / 10^18.
///
/// Payloads shorter than a word are decoded whole.
pub fn try_amount_from_log_data(data_hex: &str) -> Result<BigDecimal, DecodeError> {
    let digits = strip_hex_prefix(data_hex.trim());
    let word = digits.get(..WORD_HEX_LEN).unwrap_or(digits);
    parse_hex_uint(word).map(to_amount)
}

pub fn decode_amount_from_log_data(data_hex: &str) -> BigDecimal {
    try_amount_from_log_data(data_hex).unwrap_or_else(|_| BigDecimal::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn word(value: u64) -> String {
        format!("{:064x}", value)
    }

    fn input_with_card_count(count: u64) -> String {
        format!("0x5029defb{}{}{}", word(0x40), word(count), word(7))
    }

    #[test]
    fn test_card_count_from_input_fixed_vector() {
        let input = input_with_card_count(5);
        assert_eq!(&input[74..138], word(5));
        assert_eq!(decode_card_count_from_input(&input), 5);
    }

    #[test]
    fn test_card_count_from_input_sanity_bound() {
        let input = input_with_card_count(2_000_000);
        assert!(matches!(try_card_count_from_input(&input), Err(DecodeError::OutOfBounds { .. })));
        assert_eq!(decode_card_count_from_input(&input), 0);

        assert_eq!(decode_card_count_from_input(&input_with_card_count(MAX_CARD_COUNT)), MAX_CARD_COUNT);
    }

    #[test]
    fn test_card_count_from_input_huge_word() {
        let input = format!("0x5029defb{}{}", word(0), "f".repeat(64));
        assert_eq!(decode_card_count_from_input(&input), 0);
    }

    #[test]
    fn test_card_count_from_input_short_or_malformed() {
        assert!(matches!(try_card_count_from_input("0x5029defb"), Err(DecodeError::TooShort { .. })));
        assert_eq!(decode_card_count_from_input(""), 0);

        let bad = format!("0x5029defb{}{}", word(0), "zz".repeat(32));
        assert!(matches!(try_card_count_from_input(&bad), Err(DecodeError::InvalidHex(_))));
    }

    #[test]
    fn test_card_count_from_log_fourth_word() {
        let data = format!("0x{}{}{}{}", word(9), word(8), word(7), word(3));
        assert_eq!(decode_card_count_from_log(&data), 3);
        // prefix is optional
        assert_eq!(decode_card_count_from_log(&data[2..]), 3);
        assert_eq!(decode_card_count_from_log(&format!("0x{}", word(1))), 0);
    }

    #[test]
    fn test_bet_id_from_third_topic() {
        let topics = vec!["0xefc5".to_string(), "0x01".to_string(), format!("0x{}", word(42))];
        assert_eq!(decode_bet_id(&topics), 42);
        assert_eq!(decode_bet_id(&["0xefc5".to_string(), "0x01".to_string(), "0x2a".to_string()]), 42);
        assert_eq!(decode_bet_id(&topics[..2]), 0);
        assert_eq!(decode_bet_id(&[]), 0);
    }

    #[test]
    fn test_bet_id_overflow_is_anomaly() {
        let topics = vec!["0x".to_string(), "0x".to_string(), format!("0x{}", "f".repeat(64))];
        assert!(matches!(try_bet_id(&topics), Err(DecodeError::Overflow(_))));
        assert_eq!(decode_bet_id(&topics), 0);
    }

    #[test]
    fn test_amount_from_log_data_first_word() {
        let data = format!("0x{:064x}{}", 2_500_000_000_000_000_000u128, word(99));
        assert_eq!(decode_amount_from_log_data(&data), BigDecimal::from_str("2.5").unwrap());
        assert_eq!(decode_amount_from_log_data("0xde0b6b3a7640000"), BigDecimal::from(1));
        assert_eq!(decode_amount_from_log_data("0x"), BigDecimal::zero());
        assert_eq!(decode_amount_from_log_data("0xqq"), BigDecimal::zero());
    }
}
