//! Canonical JSON serialisation
//!
//! Produces the single deterministic byte form of a JSON value that the
//! seal signature is computed over. The rules follow RFC 8785: object keys
//! sorted by UTF-16 code unit, arrays in order, no inter-token whitespace,
//! the minimal escape set (forward slash stays unescaped), and ECMAScript
//! `Number::toString` rendering for numbers.
//!
//! Lone surrogates in string escapes are rejected by the JSON parser, which
//! this module surfaces as [`CanonicalizeError::InvalidJson`].

use serde_json::Value;
use thiserror::Error;

/// Errors raised while canonicalising a JSON value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanonicalizeError {
    /// The input text is not parseable JSON (including lone surrogates)
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// A number is not finite and cannot be canonicalised
    #[error("invalid number: {0}")]
    InvalidNumber(f64),

    /// An object key is not a string
    #[error("object keys must be strings")]
    KeyMustBeString,

    /// A value outside the JSON data model was reached
    #[error("unsupported value in JSON tree")]
    InvalidObject,
}

/// Canonicalise a parsed JSON value into its deterministic UTF-8 bytes
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalizeError> {
    let mut out = Vec::new();
    write_value(value, &mut out)?;
    Ok(out)
}

/// Parse `text` and canonicalise the resulting value
pub fn canonicalize_str(text: &str) -> Result<Vec<u8>, CanonicalizeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CanonicalizeError::InvalidJson(e.to_string()))?;
    canonicalize(&value)
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalizeError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(number) => {
            if let Some(i) = number.as_i64() {
                out.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = number.as_u64() {
                out.extend_from_slice(u.to_string().as_bytes());
            } else {
                let f = number.as_f64().ok_or(CanonicalizeError::InvalidObject)?;
                out.extend_from_slice(format_number(f)?.as_bytes());
            }
        }
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            // UTF-16 code-unit order: case- and diacritic-sensitive, no locale
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));
            out.push(b'{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_value(item, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\u{0008}' => out.extend_from_slice(b"\\b"),
            '\u{000c}' => out.extend_from_slice(b"\\f"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            // Forward slash stays unescaped per RFC 8785
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

/// Render a finite double the way ECMAScript `Number::toString` does:
/// shortest round-trip digits, decimal notation for `1e-6 <= |x| < 1e21`,
/// exponent form with an explicit sign otherwise.
fn format_number(x: f64) -> Result<String, CanonicalizeError> {
    if !x.is_finite() {
        return Err(CanonicalizeError::InvalidNumber(x));
    }
    if x == 0.0 {
        return Ok("0".to_string()); // covers -0.0
    }

    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format_finite(x);
    let (negative, body) = match formatted.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, formatted),
    };

    // Normalise ryu output into (digits, n) with value == 0.digits * 10^n
    let (mantissa, exponent) = match body.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().map_err(|_| CanonicalizeError::InvalidNumber(x))?),
        None => (body, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits: String = format!("{int_part}{frac_part}");
    let mut n = int_part.len() as i32 + exponent;
    while digits.starts_with('0') && digits.len() > 1 {
        digits.remove(0);
        n -= 1;
    }
    while digits.ends_with('0') && digits.len() > 1 {
        digits.pop();
    }
    let k = digits.len() as i32;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if k <= n && n <= 21 {
        // Integer with trailing zeros
        out.push_str(&digits);
        for _ in 0..(n - k) {
            out.push('0');
        }
    } else if 0 < n && n <= 21 {
        // Decimal point inside the digit run
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        // Leading zeros after "0."
        out.push_str("0.");
        for _ in 0..(-n) {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        // Exponent notation d.ddd e±k
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        let e = n - 1;
        if e >= 0 {
            out.push('+');
        }
        out.push_str(&e.to_string());
    }
    Ok(out)
}
