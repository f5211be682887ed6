//! Hexadecimal identifier normalization.
//!
//! Everything in the id database is keyed by fixed-width hexadecimal text,
//! but the values that arrive here are anything but: integers, `0x`-prefixed
//! strings, mixed case, stray whitespace or punctuation pasted from a forum
//! post. [`normalize_hex`] turns all of that into canonical text.
//!
//! An empty result means "no valid identifier" and must be treated as absent
//! by callers, never as zero.

use serde_json::Value;

/// Letter case of the normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Case {
    #[default]
    Lower,
    Upper,
}

/// Normalize arbitrary text into hex digits.
///
/// 1. Surrounding whitespace and an optional `0x`/`0X` prefix are removed.
/// 2. Every character that isn't `0-9A-Fa-f` is dropped.
/// 3. With a `width`, over-long values keep their **rightmost** digits and
///    short values are left-padded with `0`.
/// 4. The requested [`Case`] is applied.
///
/// ```
/// use titledb_model::hex::{Case, normalize_hex};
/// assert_eq!(normalize_hex("0x4541000D", Some(8), Case::Lower), "4541000d");
/// assert_eq!(normalize_hex("123456789", Some(8), Case::Lower), "23456789");
/// assert_eq!(normalize_hex("ab", Some(8), Case::Upper), "000000AB");
/// assert_eq!(normalize_hex("xyz!", Some(8), Case::Lower), "");
/// ```
pub fn normalize_hex(input: impl AsRef<str>, width: Option<usize>, case: Case) -> String {
    let text = strip_prefix(input.as_ref().trim());
    let mut out: String = text.chars().filter(char::is_ascii_hexdigit).collect();
    if out.is_empty() {
        return out;
    }
    if let Some(width) = width {
        if out.len() > width {
            // Only ASCII remains, so byte offsets are char offsets.
            out = out.split_off(out.len() - width);
        } else if out.len() < width {
            out = format!("{out:0>width$}");
        }
    }
    match case {
        Case::Lower => out.make_ascii_lowercase(),
        Case::Upper => out.make_ascii_uppercase(),
    }
    out
}

/// Normalize an integer, formatted as hex before the usual cleaning.
pub fn normalize_int(value: u64, width: Option<usize>, case: Case) -> String {
    normalize_hex(format!("{value:X}"), width, case)
}

/// Normalize a JSON value as found in the database file.
///
/// Strings are text, integers are integers (the sign of a negative number is
/// discarded), booleans count as `0`/`1` and `null` is absent. Anything else
/// is normalized from its JSON text.
pub fn normalize_value(value: &Value, width: Option<usize>, case: Case) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => normalize_int(u64::from(*b), width, case),
        Value::String(s) => normalize_hex(s, width, case),
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => normalize_int(u, width, case),
            (None, Some(i)) => normalize_int(i.unsigned_abs(), width, case),
            (None, None) => normalize_hex(n.to_string(), width, case),
        },
        other => normalize_hex(other.to_string(), width, case),
    }
}

/// `true` if `s` (ignoring surrounding whitespace) is non-empty and made of
/// nothing but hex digits.
pub fn is_hex(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn strip_prefix(s: &str) -> &str {
    match s.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("0x") => &s[2..],
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("4541000d", Some(8), "4541000d")]
    #[case("4541000D", Some(8), "4541000d")]
    #[case("0x4541000D", Some(8), "4541000d")]
    #[case("0X4541000D", Some(8), "4541000d")]
    #[case("  45-41-00-0d  ", Some(8), "4541000d")]
    #[case("123456789", Some(8), "23456789")]
    #[case("ab", Some(8), "000000ab")]
    #[case("ab", None, "ab")]
    #[case("", Some(8), "")]
    #[case("0x", Some(8), "")]
    #[case("zzzz", Some(16), "")]
    #[case("Halo: Combat Evolved", Some(8), "0acbaeed")]
    fn test_normalize_hex(#[case] input: &str, #[case] width: Option<usize>, #[case] expected: &str) {
        assert_eq!(normalize_hex(input, width, Case::Lower), expected);
    }

    #[test]
    fn test_upper_case() {
        assert_eq!(normalize_hex("4541000d", Some(8), Case::Upper), "4541000D");
    }

    #[rstest]
    #[case(0x4541000d, Some(8), "4541000d")]
    #[case(0, Some(8), "00000000")]
    #[case(0, None, "0")]
    #[case(0x1_0000_0000, Some(8), "00000000")]
    fn test_normalize_int(#[case] input: u64, #[case] width: Option<usize>, #[case] expected: &str) {
        assert_eq!(normalize_int(input, width, Case::Lower), expected);
    }

    #[rstest]
    #[case(json!("0x4541000D"), "4541000d")]
    #[case(json!(1161887757u64), "4541000d")]
    #[case(json!(-255), "000000ff")]
    #[case(json!(true), "00000001")]
    #[case(json!(null), "")]
    #[case(json!(["ab"]), "000000ab")]
    fn test_normalize_value(#[case] input: Value, #[case] expected: &str) {
        assert_eq!(normalize_value(&input, Some(8), Case::Lower), expected);
    }

    #[rstest]
    #[case("123456789")]
    #[case("0xDEADbeef")]
    #[case("  g00d c0ffee  ")]
    #[case("ab")]
    #[case("")]
    #[case("çà-ß")]
    fn test_idempotent(#[case] input: &str) {
        for width in [None, Some(8), Some(16), Some(40)] {
            let once = normalize_hex(input, width, Case::Lower);
            assert_eq!(normalize_hex(&once, width, Case::Lower), once);
        }
    }

    #[rstest]
    #[case("4541000d", true)]
    #[case(" ABCDEF ", true)]
    #[case("", false)]
    #[case("   ", false)]
    #[case("0x12", false)]
    #[case("12 34", false)]
    fn test_is_hex(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_hex(input), expected);
    }
}
