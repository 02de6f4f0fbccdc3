/// Parsers Module
///
/// Pure decoders for hex quantities and fixed-offset ABI payloads.
/// Upstream data is untrusted: every decoder has a lenient form that
/// returns a safe default instead of failing.
pub mod hex;
pub mod payload;

// Re-export commonly used parsers
pub use hex::{decode_amount, hex_to_uint, try_decode_amount};
pub use payload::{
    decode_bet_id, decode_card_count_from_input, decode_card_count_from_log, try_amount_from_log_data, try_bet_id,
    try_card_count_from_input, try_card_count_from_log,
};

/// Why a field could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("payload too short: need {needed} hex chars, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("value does not fit: {0}")]
    Overflow(String),

    #[error("value {value} exceeds sanity bound {max}")]
    OutOfBounds { value: String, max: u64 },
}
