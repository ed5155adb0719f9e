//! Raw-data resolver for templated strings such as completion pages.
//!
//! A value starting with `=` is an expression template; every `{{ ... }}`
//! placeholder in it is evaluated once and replaced by its result.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::context::ExpressionEvaluator;
use crate::FormError;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{\{.*?\}\}").expect("placeholder pattern is valid"))
}

/// Expand the placeholders of an `=`-prefixed template.
///
/// Literal strings (no leading `=`) are returned unchanged. Substituted text
/// is never scanned again, so a resolved value that looks like a placeholder
/// stays as it is.
pub fn resolve_raw_data(
    raw: &str,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<String, FormError> {
    let Some(template) = raw.strip_prefix('=') else {
        return Ok(raw.to_string());
    };
    let template = template.trim_start_matches('=');

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for placeholder in placeholder_pattern().find_iter(template) {
        out.push_str(&template[last..placeholder.start()]);
        let resolved = evaluator.evaluate(placeholder.as_str())?;
        out.push_str(&substitution_text(&resolved)?);
        last = placeholder.end();
    }
    out.push_str(&template[last..]);

    Ok(out)
}

fn substitution_text(value: &Value) -> Result<String, FormError> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)?,
    })
}
