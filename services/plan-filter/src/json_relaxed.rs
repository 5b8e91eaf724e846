//! Parsing of loosely formatted JSON returned by LLMs: code fences, comments,
//! surrounding prose and cut-off documents are tolerated.

use std::fs;
use std::path::Path;

use serde_json::Value;
use strum_macros::Display;
use time::{macros::format_description, OffsetDateTime};
use tracing::{debug, info, warn};

use shared::error::{FilterError, Result};

use crate::repair::repair_json_text;
use crate::truncation::{looks_truncated, repair_truncated};

/// Characters of the last attempted text kept in the error.
const PREVIEW_CHARS: usize = 200;

/// Which attempt produced the parsed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    AsIs,
    Repaired,
    Sliced,
    TruncationRepaired,
}

#[derive(Debug, Clone)]
pub struct Relaxed {
    pub value: Value,
    pub strategy: Strategy,
}

/// Attempt to parse JSON even when the response contains code fences, extra
/// text or was truncated. Strategies run in a fixed order and the first one
/// that parses wins.
///
/// When every strategy fails the raw input is written to `dump_dir` (if
/// given) before returning [`FilterError::JsonUnparsable`].
pub fn parse_json_relaxed(input: &str, dump_dir: Option<&Path>) -> Result<Relaxed> {
    let mut last = Attempt::default();

    // 1) direct
    if let Some(found) = last.try_parse(input.to_string(), Strategy::AsIs) {
        return Ok(found);
    }
    // 2) text repair
    let repaired = repair_json_text(input);
    if let Some(found) = last.try_parse(repaired, Strategy::Repaired) {
        return Ok(found);
    }
    // 3) first opener up to last closer
    if let Some(slice) = slice_outer(input) {
        if let Some(found) = last.try_parse(repair_json_text(slice), Strategy::Sliced) {
            return Ok(found);
        }
    }
    // 4) first opener to the end, closing whatever was cut off
    if let Some(start) = input.find(['{', '[']) {
        let mut text = repair_json_text(&input[start..]);
        if looks_truncated(&text) {
            debug!(len = text.len(), "response looks truncated");
            text = repair_json_text(&repair_truncated(&text));
        }
        if let Some(found) = last.try_parse(text, Strategy::TruncationRepaired) {
            return Ok(found);
        }
    }

    let (line, column) = last.error.as_ref().map(|e| (e.line(), e.column())).unwrap_or((0, 0));
    warn!(
        content_length = input.len(),
        line, column, "JSON unparsable after all repair strategies"
    );
    if let Some(dir) = dump_dir {
        dump_failed(dir, input);
    }
    Err(FilterError::JsonUnparsable {
        content_length: input.len(),
        preview: last.text.chars().take(PREVIEW_CHARS).collect(),
        line,
        column,
    })
}

/// Last attempted text and its parse error.
#[derive(Default)]
struct Attempt {
    text: String,
    error: Option<serde_json::Error>,
}

impl Attempt {
    fn try_parse(&mut self, text: String, strategy: Strategy) -> Option<Relaxed> {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                if strategy != Strategy::AsIs {
                    info!(%strategy, "parsed model response after repair");
                }
                Some(Relaxed { value, strategy })
            }
            Err(e) => {
                debug!(%strategy, error = %e, "parse attempt failed");
                self.text = text;
                self.error = Some(e);
                None
            }
        }
    }
}

/// Text between the first `{`/`[` and the last `}`/`]`, both included.
fn slice_outer(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let end = s.rfind(['}', ']'])?;
    (end > start).then(|| &s[start..=end])
}

/// Best effort: failures are logged and otherwise ignored.
fn dump_failed(dir: &Path, input: &str) {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_else(|_| "unknown".into());
    let path = dir.join(format!("failed_json_{stamp}.txt"));
    let body = format!("Content length: {}\n\n{}", input.len(), input);

    match fs::create_dir_all(dir).and_then(|_| fs::write(&path, body)) {
        Ok(()) => info!(path = %path.display(), "wrote failed response dump"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not write failed response dump"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_parses_as_is() {
        let r = parse_json_relaxed(r#"{"a": [1, 2]}"#, None).unwrap();
        assert_eq!(r.strategy, Strategy::AsIs);
        assert_eq!(r.value, json!({"a": [1, 2]}));
    }

    #[test]
    fn first_successful_strategy_wins() {
        let r = parse_json_relaxed("{foo: 1}", None).unwrap();
        assert_eq!(r.strategy, Strategy::Repaired);
        assert_eq!(r.value, json!({"foo": 1}));
    }

    #[test]
    fn surrounding_prose_is_sliced_away() {
        let r = parse_json_relaxed(r#"Sure! {"a": 1} Hope it helps."#, None).unwrap();
        assert_eq!(r.strategy, Strategy::Sliced);
        assert_eq!(r.value, json!({"a": 1}));
    }

    #[test]
    fn truncated_document_is_closed() {
        let src = r#"Here is the plan: {"daily_meals": {"1": {"breakfast": {"name": "Oats""#;
        let r = parse_json_relaxed(src, None).unwrap();
        assert_eq!(r.strategy, Strategy::TruncationRepaired);
        assert_eq!(r.value["daily_meals"]["1"]["breakfast"]["name"], "Oats");
    }

    #[test]
    fn prose_without_json_is_unparsable_and_dumped() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_json_relaxed("I cannot generate this.", Some(dir.path())).unwrap_err();
        match err {
            FilterError::JsonUnparsable {
                content_length,
                preview,
                line,
                ..
            } => {
                assert_eq!(content_length, 23);
                assert_eq!(preview, "I cannot generate this.");
                assert_eq!(line, 1);
            }
        }

        let dumps: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(dumps.len(), 1);
        let path = dumps[0].as_ref().unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("failed_json_") && name.ends_with(".txt"), "{name}");
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, "Content length: 23\n\nI cannot generate this.");
    }

    #[test]
    fn dump_failures_do_not_mask_the_parse_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = parse_json_relaxed("nothing here", Some(file.path())).unwrap_err();
        assert!(matches!(err, FilterError::JsonUnparsable { content_length: 12, .. }));
    }

    #[test]
    fn preview_is_capped() {
        let src = format!("{{\"a\": {}", "1 ".repeat(500));
        let err = parse_json_relaxed(&src, None).unwrap_err();
        let FilterError::JsonUnparsable { preview, content_length, .. } = err;
        assert_eq!(content_length, 1006);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::TruncationRepaired.to_string(), "truncation_repaired");
        assert_eq!(Strategy::AsIs.to_string(), "as_is");
    }
}
