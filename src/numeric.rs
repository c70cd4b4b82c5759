//! Number <-> text conversions with C library semantics: `%.14g` for
//! formatting and `atof` for parsing.

use alloc::string::String;
use core::fmt;
use core::fmt::Write;

/// Significant digits used for every float conversion.
pub const SIGNIFICANT_DIGITS: usize = 14;

/// Writes `value` the way `printf("%.14g", value)` does.
///
/// Fixed notation is used when the decimal exponent `x` of the rounded value
/// satisfies `-4 <= x < 14`, scientific notation (`1.5e+20`) otherwise.
/// Trailing zeros and a trailing decimal point are removed.
pub fn write_g14<W: Write + ?Sized>(out: &mut W, value: f64) -> fmt::Result {
    if value.is_nan() {
        return out.write_str(if value.is_sign_negative() { "-nan" } else { "nan" });
    }
    if value.is_infinite() {
        return out.write_str(if value < 0.0 { "-inf" } else { "inf" });
    }
    if value == 0.0 {
        return out.write_str(if value.is_sign_negative() { "-0" } else { "0" });
    }

    let mut sci = String::new();
    write!(sci, "{:.*e}", SIGNIFICANT_DIGITS - 1, value)?;
    let (mantissa, exp) = sci.split_once('e').ok_or(fmt::Error)?;
    let exp: i32 = exp.parse().map_err(|_| fmt::Error)?;

    if (-4..SIGNIFICANT_DIGITS as i32).contains(&exp) {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exp) as usize;
        let mut fixed = String::new();
        write!(fixed, "{:.*}", decimals, value)?;
        out.write_str(strip_fraction_zeros(&fixed))
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        write!(
            out,
            "{}e{}{:02}",
            strip_fraction_zeros(mantissa),
            sign,
            exp.unsigned_abs()
        )
    }
}

/// Formats `value` as `%.14g` into a new `String`.
pub fn format_g14(value: f64) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_g14(&mut out, value);
    out
}

fn strip_fraction_zeros(digits: &str) -> &str {
    if !digits.contains('.') {
        return digits;
    }
    digits.trim_end_matches('0').trim_end_matches('.')
}

/// Parses the longest numeric prefix of `bytes`, like C `atof`.
///
/// Leading whitespace is skipped. Returns `0.0` when no number is present.
/// Accepts an optional sign, decimal digits with an optional fraction, an
/// optional exponent, and the words `inf`, `infinity` and `nan` in any case.
pub fn parse_f64_prefix(bytes: &[u8]) -> f64 {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r'))
        .unwrap_or(bytes.len());
    let rest = &bytes[start..];

    let end = numeric_prefix_len(rest);
    core::str::from_utf8(&rest[..end])
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

fn numeric_prefix_len(s: &[u8]) -> usize {
    let mut i = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let word = |w: &[u8]| {
        s.len() >= i + w.len() && s[i..i + w.len()].eq_ignore_ascii_case(w)
    };
    if word(b"infinity") {
        return i + 8;
    }
    if word(b"inf") || word(b"nan") {
        return i + 3;
    }

    let int_digits = count_digits(&s[i..]);
    i += int_digits;
    let mut frac_digits = 0;
    if s.get(i) == Some(&b'.') {
        frac_digits = count_digits(&s[i + 1..]);
        if int_digits + frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(s.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(s.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = count_digits(&s[j.min(s.len())..]);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }
    i
}

fn count_digits(s: &[u8]) -> usize {
    s.iter().take_while(|b| b.is_ascii_digit()).count()
}
