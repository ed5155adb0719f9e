//! Best-effort coercion of submitted values.
//!
//! Nothing here fails: malformed numbers become `NaN`, unparseable dates and
//! JSON are handed back untouched.

use std::fmt::Write;

use chrono::NaiveDate;
use serde_json::Value;

/// Format submitted by the browser's date picker.
const SUBMITTED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Numeric value of a submitted field, `NaN` when it is not a number.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }

    // Rust accepts `inf`/`nan` spellings that a form value never means.
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }

    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Text rendering of a submitted value.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| if v.is_null() { String::new() } else { to_text(v) })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Parse a JSON-encoded list of choices, keeping the raw string on failure.
pub fn parse_choices(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Reformat a `yyyy-MM-dd` date into `format`, a date-token pattern such as
/// `dd/MM/yyyy`. Returns `None` when the date or the pattern is unusable.
pub fn reformat_date(raw: &str, format: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), SUBMITTED_DATE_FORMAT).ok()?;
    let at_midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    let pattern = to_strftime(format);

    let mut out = String::new();
    write!(out, "{}", at_midnight.format(&pattern)).ok()?;
    Some(out)
}

/// Translate a date-token pattern into a `strftime` pattern.
///
/// Letters form tokens by repetition (`yyyy`, `MM`); text inside single
/// quotes is literal and `''` is an escaped quote. Unknown tokens are kept
/// as literal text.
fn to_strftime(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        match token(c, run) {
            Some(spec) => out.push_str(spec),
            None => (0..run).for_each(|_| push_literal(&mut out, c)),
        }
        i += run;
    }

    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn token(c: char, run: usize) -> Option<&'static str> {
    let spec = match (c, run) {
        ('y', 4) | ('y', 1) => "%Y",
        ('y', 2) => "%y",
        ('M' | 'L', 4) => "%B",
        ('M' | 'L', 3) => "%b",
        ('M' | 'L', 2) => "%m",
        ('M' | 'L', 1) => "%-m",
        ('d', 2) => "%d",
        ('d', 1) => "%-d",
        ('E' | 'c', 4) => "%A",
        ('E' | 'c', 3) => "%a",
        ('E' | 'c', 1) => "%u",
        ('H', 2) => "%H",
        ('H', 1) => "%-H",
        ('h', 2) => "%I",
        ('h', 1) => "%-I",
        ('m', 2) => "%M",
        ('m', 1) => "%-M",
        ('s', 2) => "%S",
        ('s', 1) => "%-S",
        ('S', 3) => "%3f",
        ('a', 1) => "%p",
        ('o', 3) => "%j",
        ('W', 2) => "%V",
        ('Z', 2) => "%:z",
        ('Z', 3) => "%z",
        ('D', 1) => "%-m/%-d/%Y",
        ('D', 2) => "%b %-d, %Y",
        ('D', 3) => "%B %-d, %Y",
        _ => return None,
    };
    Some(spec)
}
