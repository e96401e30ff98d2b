//! Conversion of numeric literal text into values.
//!
//! The lexer classifies literals but leaves conversion to its consumers;
//! these helpers take the token's source text (via its span) and produce
//! integer or float values. Hex floats go through `fhex` so that f32 and f64
//! round independently and correctly; NaN payloads are placed directly into
//! the significand bits.

use fhex::FromHex;

/// Strip `_` digit separators. Placement has already been validated by the
/// lexer.
fn clean(text: &str) -> String {
    text.chars().filter(|&c| c != '_').collect()
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

/// Parse an unsigned integer literal (`Nat` token text).
pub fn parse_nat(text: &str) -> Option<u64> {
    let text = clean(text);
    if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse::<u64>().ok()
    }
}

/// Parse a signed integer literal (`Int` or `Nat` token text).
///
/// The magnitude `0x8000000000000000` with a minus sign is `i64::MIN`;
/// anything larger overflows.
pub fn parse_int(text: &str) -> Option<i64> {
    let (negative, magnitude_text) = split_sign(text);
    let magnitude = parse_nat(magnitude_text)?;
    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return None;
        }
        Some((magnitude as i64).wrapping_neg())
    } else {
        if magnitude > i64::MAX as u64 {
            return None;
        }
        Some(magnitude as i64)
    }
}

macro_rules! parse_float_impl {
    ($name:ident, $fty:ty, $uty:ty,
     $exp_bits:expr, $canon_nan:expr, $max_payload:expr, $sign_bit:expr) => {
        /// Parse a float literal, including `inf`, `nan`, `nan:0x...`, and
        /// hex float forms. Returns `None` for out-of-range NaN payloads.
        pub fn $name(text: &str) -> Option<$fty> {
            let (negative, body) = split_sign(text);
            let body = clean(body);

            let bits: Option<$uty> = if body == "inf" {
                Some($exp_bits)
            } else if body == "nan" {
                Some($canon_nan)
            } else if let Some(payload_hex) = body.strip_prefix("nan:0x") {
                let payload = u64::from_str_radix(payload_hex, 16).ok()?;
                if payload == 0 || payload > $max_payload {
                    return None;
                }
                Some($exp_bits | payload as $uty)
            } else {
                None
            };

            if let Some(bits) = bits {
                let bits = if negative { bits | $sign_bit } else { bits };
                return Some(<$fty>::from_bits(bits));
            }

            let value = if body.starts_with("0x") {
                <$fty>::from_hex(&body)?
            } else {
                body.parse::<$fty>().ok()?
            };
            Some(if negative { -value } else { value })
        }
    };
}

parse_float_impl!(
    parse_f32,
    f32,
    u32,
    0x7F80_0000u32,
    0x7FC0_0000u32,
    0x7F_FFFFu64,
    0x8000_0000u32
);
parse_float_impl!(
    parse_f64,
    f64,
    u64,
    0x7FF0_0000_0000_0000u64,
    0x7FF8_0000_0000_0000u64,
    0xF_FFFF_FFFF_FFFFu64,
    0x8000_0000_0000_0000u64
);
