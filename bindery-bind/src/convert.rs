//! Built-in string conversions for scalar shapes and durations.

use std::time::Duration;

use serde_json::{Number, Value};
use thiserror::Error;

use crate::shape::Primitive;

/// Failure of a built-in conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Input is not a well-formed literal of the requested kind.
    #[error("invalid {kind} literal `{input}`")]
    Syntax {
        /// Literal kind, e.g. `integer`.
        kind: &'static str,
        /// Offending input.
        input: String,
    },

    /// Input is well formed but does not fit the target type.
    #[error("`{input}` is out of range for {target}")]
    Range {
        /// Target type name, e.g. `u8`.
        target: String,
        /// Offending input.
        input: String,
    },
}

impl ParseError {
    fn syntax(kind: &'static str, input: &str) -> Self {
        Self::Syntax {
            kind,
            input: input.to_owned(),
        }
    }

    fn range(target: String, input: &str) -> Self {
        Self::Range {
            target,
            input: input.to_owned(),
        }
    }
}

/// Parses `text` according to a built-in scalar rule.
///
/// Integers accept an optional sign and the `0x`, `0o`, `0b` and leading `0`
/// (octal) prefixes; `_` separators are allowed only after a prefix.
/// Booleans accept `1 t T TRUE true True` and `0 f F FALSE false False`.
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] for malformed input and
/// [`ParseError::Range`] when the value does not fit the bit width.
pub fn parse_primitive(primitive: Primitive, text: &str) -> Result<Value, ParseError> {
    match primitive {
        Primitive::Int { bits } => parse_int(text, bits).map(Value::from),
        Primitive::Uint { bits } => parse_uint(text, bits).map(Value::from),
        Primitive::Float { bits } => parse_float(text, bits),
        Primitive::Bool => parse_bool(text).map(Value::Bool),
        Primitive::String => Ok(Value::String(text.to_owned())),
    }
}

fn parse_int(text: &str, bits: u32) -> Result<i64, ParseError> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = parse_magnitude(digits, text, bits, "i")?;
    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };
    let shift = 64 - bits;
    value
        .filter(|v| (i64::MIN >> shift..=i64::MAX >> shift).contains(v))
        .ok_or_else(|| ParseError::range(format!("i{bits}"), text))
}

fn parse_uint(text: &str, bits: u32) -> Result<u64, ParseError> {
    if text.starts_with(['+', '-']) {
        return Err(ParseError::syntax("unsigned integer", text));
    }
    let value = parse_magnitude(text, text, bits, "u")?;
    if value > u64::MAX >> (64 - bits) {
        return Err(ParseError::range(format!("u{bits}"), text));
    }
    Ok(value)
}

fn parse_magnitude(digits: &str, input: &str, bits: u32, sign: &str) -> Result<u64, ParseError> {
    let lower = digits.get(..2).map(str::to_ascii_lowercase);
    let (radix, body, prefixed) = match lower.as_deref() {
        Some("0x") => (16, &digits[2..], true),
        Some("0o") => (8, &digits[2..], true),
        Some("0b") => (2, &digits[2..], true),
        _ if digits.len() > 1 && digits.starts_with('0') => (8, &digits[1..], true),
        _ => (10, digits, false),
    };

    if body.contains('_') && (!prefixed || body.ends_with('_') || body.contains("__")) {
        return Err(ParseError::syntax("integer", input));
    }
    let cleaned: String = body.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_digit(radix)) {
        return Err(ParseError::syntax("integer", input));
    }
    u64::from_str_radix(&cleaned, radix)
        .map_err(|_| ParseError::range(format!("{sign}{bits}"), input))
}

fn parse_float(text: &str, bits: u32) -> Result<Value, ParseError> {
    let value = if bits == 32 {
        text.parse::<f32>().map(f64::from)
    } else {
        text.parse::<f64>()
    }
    .map_err(|_| ParseError::syntax("float", text))?;
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ParseError::range(format!("f{bits}"), text))
}

fn parse_bool(text: &str) -> Result<bool, ParseError> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ParseError::syntax("boolean", text)),
    }
}

/// Parses a duration such as `150ms`, `10s`, `1h30m` or a plain number of seconds.
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; components may carry
/// a fractional part.
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] for malformed input and
/// [`ParseError::Range`] when the total overflows a [`Duration`].
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ParseError::range("Duration".into(), text));
    }

    let mut rest = text;
    let mut total = Duration::ZERO;
    if rest.is_empty() {
        return Err(ParseError::syntax("duration", text));
    }
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ParseError::syntax("duration", text))?;
        let (number, tail) = rest.split_at(split);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let amount: f64 = number
            .parse()
            .map_err(|_| ParseError::syntax("duration", text))?;
        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(ParseError::syntax("duration", text)),
        };
        let part = Duration::try_from_secs_f64(amount * scale)
            .map_err(|_| ParseError::range("Duration".into(), text))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| ParseError::range("Duration".into(), text))?;
        rest = tail;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(text: &str, bits: u32) -> Result<Value, ParseError> {
        parse_primitive(Primitive::Int { bits }, text)
    }

    fn uint(text: &str, bits: u32) -> Result<Value, ParseError> {
        parse_primitive(Primitive::Uint { bits }, text)
    }

    #[test]
    fn integers_honour_prefixes() {
        assert_eq!(int("42", 64).unwrap(), 42);
        assert_eq!(int("-0x1F", 64).unwrap(), -31);
        assert_eq!(int("0o17", 64).unwrap(), 15);
        assert_eq!(int("017", 64).unwrap(), 15);
        assert_eq!(int("0b1010", 64).unwrap(), 10);
        assert_eq!(int("0x_ff_ff", 64).unwrap(), 65535);
        assert_eq!(int("0", 8).unwrap(), 0);
        assert_eq!(int("-9223372036854775808", 64).unwrap(), i64::MIN);
    }

    #[test]
    fn integers_reject_bad_digits_and_separators() {
        for input in ["", "-", "12a", "1_000", "0x", "0x1__0", "0x1_", "09", "1.5"] {
            let err = int(input, 64).expect_err(input);
            assert!(matches!(err, ParseError::Syntax { .. }), "{input}");
        }
    }

    #[test]
    fn range_errors_name_the_type() {
        let err = int("128", 8).expect_err("i8 overflow");
        assert_eq!(err.to_string(), "`128` is out of range for i8");
        assert_eq!(int("-128", 8).unwrap(), -128);

        let err = uint("256", 8).expect_err("u8 overflow");
        assert!(matches!(err, ParseError::Range { ref target, .. } if target == "u8"));
        assert_eq!(uint("0xFFFFFFFFFFFFFFFF", 64).unwrap(), u64::MAX);
        assert!(uint("-1", 64).is_err());
        assert!(uint("+1", 64).is_err());
    }

    #[test]
    fn floats_and_bools() {
        let value = parse_primitive(Primitive::Float { bits: 64 }, "2.5e3").unwrap();
        assert_eq!(value.as_f64(), Some(2500.0));
        assert!(parse_primitive(Primitive::Float { bits: 64 }, "inf").is_err());
        assert!(parse_primitive(Primitive::Float { bits: 32 }, "1e39").is_err());

        for input in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_primitive(Primitive::Bool, input).unwrap(), true);
        }
        for input in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_primitive(Primitive::Bool, input).unwrap(), false);
        }
        assert!(parse_primitive(Primitive::Bool, "yes").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(" 30 ").unwrap(), Duration::from_secs(30));
        for input in ["", "ms", "5x", "1h30", "--1s"] {
            assert!(parse_duration(input).is_err(), "{input}");
        }
    }
}
