//! Coercion of model-provided leaves into bounded integers and cleaned text.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use regex::Regex;

/// Maximum length (in characters) of any sanitized string.
pub const MAX_TEXT_LEN: usize = 500;

/// Characters removed from every string before it leaves the filter.
const FORBIDDEN: &[char] = &['<', '>', '"', '\'', ';', '{', '}', '(', ')', '='];

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit pattern"));

/// Inclusive range a numeric field is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: &Value) -> i64 {
        sanitize_number(value, self)
    }
}

pub const DURATION: Bounds = Bounds::new(0, 180);
pub const SETS: Bounds = Bounds::new(1, 10);
pub const MEAL_CALORIES: Bounds = Bounds::new(0, 2000);
pub const SNACK_CALORIES: Bounds = Bounds::new(0, 500);
pub const DAILY_CALORIES: Bounds = Bounds::new(0, 5000);
pub const DAILY_PROTEIN: Bounds = Bounds::new(0, 300);
pub const DAILY_CARBS: Bounds = Bounds::new(0, 500);
pub const DAILY_FAT: Bounds = Bounds::new(0, 200);
pub const DAILY_FIBER: Bounds = Bounds::new(0, 100);
pub const WORKOUT_DAYS: Bounds = Bounds::new(10, 31);
pub const REST_DAYS: Bounds = Bounds::new(0, 21);
pub const AVERAGE_DAILY_CALORIES: Bounds = Bounds::new(1200, 4000);

/// Coerce `value` into `bounds`.
///
/// Numbers are truncated toward zero. Strings contribute their first run of
/// ASCII digits, so `"45 minutes"` yields 45 and `"-5"` yields 5; a digit run
/// too large for `i64` saturates to `bounds.max`. Anything else, including
/// strings without digits, yields `bounds.min`.
pub fn sanitize_number(value: &Value, bounds: Bounds) -> i64 {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DIGITS
            .find(s)
            .map(|m| m.as_str().parse::<i64>().unwrap_or(i64::MAX)),
        _ => None,
    };
    raw.map(|n| n.clamp(bounds.min, bounds.max))
        .unwrap_or(bounds.min)
}

/// Strip markup-significant characters, collapse whitespace and cap the length.
pub fn sanitize_text(s: &str) -> String {
    let stripped: String = s.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_TEXT_LEN) {
        Some((idx, _)) => collapsed[..idx].trim_end().to_string(),
        None => collapsed,
    }
}

/// Sanitize any JSON value as text; `null` becomes the empty string.
pub fn sanitize_string(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize_text(s),
        Value::Null => String::new(),
        other => sanitize_text(&other.to_string()),
    }
}

/// Recursively sanitize every string leaf. Object keys are left untouched.
pub fn sanitize_tree(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_tree).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_tree(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Text field with a default used only when the key is absent.
pub(crate) fn text_field(obj: &Map<String, Value>, key: &str, default: &str) -> Value {
    let text = obj
        .get(key)
        .map(sanitize_string)
        .unwrap_or_else(|| sanitize_text(default));
    Value::String(text)
}

/// Numeric field with a default used only when the key is absent.
pub(crate) fn number_field(obj: &Map<String, Value>, key: &str, default: i64, bounds: Bounds) -> Value {
    let n = match obj.get(key) {
        Some(v) => bounds.clamp(v),
        None => default.clamp(bounds.min, bounds.max),
    };
    Value::from(n)
}

/// Non-blank string items of a list field, sanitized. Non-lists yield `[]`.
pub(crate) fn text_list(obj: &Map<String, Value>, key: &str) -> Value {
    let items = match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| Value::String(sanitize_text(s)))
            .collect(),
        _ => Vec::new(),
    };
    Value::Array(items)
}
