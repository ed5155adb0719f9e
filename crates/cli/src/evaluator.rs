//! Minimal `$json` evaluator for trying out templates from the command line.
//!
//! Supports `{{ $json }}`, dotted keys and numeric indexes:
//! `{{ $json.user.tags[0] }}`. Anything else is rejected.

use forms::{ExpressionEvaluator, FormError};
use serde_json::Value;

pub struct JsonEvaluator {
    data: Value,
}

impl JsonEvaluator {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

impl ExpressionEvaluator for JsonEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Value, FormError> {
        let unsupported = |message: &str| FormError::Expression {
            expression: expression.to_string(),
            message: message.to_string(),
        };

        let inner = expression
            .strip_prefix("{{")
            .and_then(|e| e.strip_suffix("}}"))
            .ok_or_else(|| unsupported("not a placeholder"))?
            .trim();
        let path = inner
            .strip_prefix("$json")
            .ok_or_else(|| unsupported("only $json paths are supported"))?;

        let mut current = &self.data;
        for segment in segments(path).ok_or_else(|| unsupported("malformed path"))? {
            let next = match segment {
                Segment::Key(key) => current.get(key),
                Segment::Index(index) => current.get(index),
            };
            match next {
                Some(value) => current = value,
                None => return Ok(Value::Null),
            }
        }

        Ok(current.clone())
    }
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut out = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            if end == 0 {
                return None;
            }
            out.push(Segment::Key(&after[..end]));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']')?;
            out.push(Segment::Index(after[..end].trim().parse().ok()?));
            rest = &after[end + 1..];
        } else {
            return None;
        }
    }

    Some(out)
}
