//! Detection and repair of responses that were cut off mid-document.
//!
//! Repair discards whatever fragment sits at the cut point (an unterminated
//! string, a dangling key, a half-written literal) and then rebalances the
//! brackets. The result parses but may lose the last partial record.

use std::ops::Range;

use tracing::debug;

/// Bracket and string state of a text, ignoring anything inside strings.
#[derive(Debug, Default)]
struct Scan {
    /// Openers still waiting for their closer, innermost last.
    stack: Vec<char>,
    /// Byte offset of the opening quote of an unterminated string.
    open_string: Option<usize>,
    /// Byte range of the last complete string literal, quotes included.
    last_string: Option<Range<usize>>,
    /// Byte offsets of every closer, in order.
    closers: Vec<(usize, char)>,
    open_braces: usize,
    close_braces: usize,
    open_brackets: usize,
    close_brackets: usize,
}

impl Scan {
    fn of(s: &str) -> Self {
        let mut scan = Scan::default();
        let mut esc = false;
        let mut str_start: Option<usize> = None;

        for (i, ch) in s.char_indices() {
            if let Some(start) = str_start {
                if esc {
                    esc = false;
                } else if ch == '\\' {
                    esc = true;
                } else if ch == '"' {
                    scan.last_string = Some(start..i + 1);
                    str_start = None;
                }
                continue;
            }

            match ch {
                '"' => str_start = Some(i),
                '{' => {
                    scan.open_braces += 1;
                    scan.stack.push(ch);
                }
                '[' => {
                    scan.open_brackets += 1;
                    scan.stack.push(ch);
                }
                '}' | ']' => {
                    if ch == '}' {
                        scan.close_braces += 1;
                    } else {
                        scan.close_brackets += 1;
                    }
                    scan.closers.push((i, ch));
                    if scan.stack.last() == Some(&opener_of(ch)) {
                        scan.stack.pop();
                    }
                }
                _ => {}
            }
        }
        scan.open_string = str_start;
        scan
    }

    fn balanced(&self) -> bool {
        self.open_braces == self.close_braces && self.open_brackets == self.close_brackets
    }
}

fn opener_of(closer: char) -> char {
    if closer == '}' {
        '{'
    } else {
        '['
    }
}

fn closer_of(opener: char) -> char {
    if opener == '{' {
        '}'
    } else {
        ']'
    }
}

/// Whether `s` looks like it was cut off: it ends on a character that cannot
/// end a document, or its brackets do not balance.
pub fn looks_truncated(s: &str) -> bool {
    let t = s.trim_end();
    if t.ends_with(['"', ':', ',', '[', '{']) {
        return true;
    }
    let scan = Scan::of(t);
    scan.open_string.is_some() || !scan.balanced()
}

/// Lossy repair of cut-off JSON text. See the module docs.
pub fn repair_truncated(s: &str) -> String {
    let mut out = s.trim_end().to_string();

    if let Some(start) = Scan::of(&out).open_string {
        debug!(at = start, "dropping unterminated string");
        out.truncate(start);
    }

    while drop_dangling_tail(&mut out) {}

    remove_excess_closers(&mut out);

    let scan = Scan::of(&out);
    for &open in scan.stack.iter().rev() {
        out.push(closer_of(open));
    }
    out
}

/// Remove one dangling fragment from the end of `out`. Returns false when the
/// tail can legitimately precede a closer.
fn drop_dangling_tail(out: &mut String) -> bool {
    let len = out.trim_end().len();
    out.truncate(len);

    let Some(last) = out.chars().last() else {
        return false;
    };
    match last {
        ',' | '.' | '-' | '+' => {
            out.pop();
            true
        }
        ':' => {
            out.pop();
            let len = out.trim_end().len();
            out.truncate(len);
            if out.ends_with('"') {
                if let Some(key) = Scan::of(out).last_string {
                    out.truncate(key.start);
                }
            }
            true
        }
        '"' => {
            let scan = Scan::of(out);
            match scan.last_string {
                Some(key) if scan.stack.last() == Some(&'{') && is_key_position(out, key.start) => {
                    out.truncate(key.start);
                    true
                }
                _ => false,
            }
        }
        '{' | '[' => {
            let before = out[..out.len() - 1].trim_end();
            if before.ends_with(',') {
                out.pop();
                true
            } else {
                false
            }
        }
        c if c.is_ascii_alphabetic() => {
            let word_start = out
                .trim_end_matches(|c: char| c.is_ascii_alphabetic())
                .len();
            if matches!(&out[word_start..], "true" | "false" | "null") {
                false
            } else {
                out.truncate(word_start);
                true
            }
        }
        _ => false,
    }
}

/// A string directly after `{` or `,` inside an object is a key.
fn is_key_position(s: &str, string_start: usize) -> bool {
    s[..string_start].trim_end().ends_with(['{', ','])
}

fn remove_excess_closers(out: &mut String) {
    let scan = Scan::of(out);
    let mut excess_braces = scan.close_braces.saturating_sub(scan.open_braces);
    let mut excess_brackets = scan.close_brackets.saturating_sub(scan.open_brackets);
    if excess_braces == 0 && excess_brackets == 0 {
        return;
    }

    let mut drop_at = Vec::new();
    for &(idx, ch) in scan.closers.iter().rev() {
        if ch == '}' && excess_braces > 0 {
            excess_braces -= 1;
            drop_at.push(idx);
        } else if ch == ']' && excess_brackets > 0 {
            excess_brackets -= 1;
            drop_at.push(idx);
        }
    }
    // `drop_at` is descending, so earlier offsets stay valid.
    for idx in drop_at {
        out.remove(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn repaired(s: &str) -> Value {
        let out = repair_truncated(s);
        serde_json::from_str(&out).unwrap_or_else(|e| panic!("{out:?} does not parse: {e}"))
    }

    #[test]
    fn complete_trailing_value_is_kept() {
        let src = r#"{"daily_meals": {"1": {"breakfast": {"name": "Oats""#;
        assert!(looks_truncated(src));
        assert_eq!(repair_truncated(src), format!("{src}{}", "}}}}"));
        assert_eq!(repaired(src)["daily_meals"]["1"]["breakfast"]["name"], "Oats");
    }

    #[test]
    fn partial_value_is_dropped_with_its_key() {
        let src = r#"{"daily_meals": {"1": {"breakfast": {"name": "Oa"#;
        assert_eq!(
            repaired(src),
            json!({"daily_meals": {"1": {"breakfast": {}}}})
        );
    }

    #[test]
    fn closers_follow_nesting_order() {
        assert_eq!(repair_truncated(r#"{"a": [1"#), r#"{"a": [1]}"#);
        assert_eq!(repaired(r#"[{"a": {"b": [1, 2"#), json!([{"a": {"b": [1, 2]}}]));
    }

    #[test]
    fn dangling_keys_and_separators() {
        assert_eq!(repaired(r#"{"a": 1, "b""#), json!({"a": 1}));
        assert_eq!(repaired(r#"{"a": 1, "b":"#), json!({"a": 1}));
        assert_eq!(repaired(r#"{"a": 1,"#), json!({"a": 1}));
        assert_eq!(repaired(r#"{"a": {"b":  "#), json!({"a": {}}));
        assert_eq!(repaired(r#"["x", "y""#), json!(["x", "y"]));
    }

    #[test]
    fn empty_openers_after_comma() {
        assert_eq!(repaired(r#"[{"a": 1}, {"#), json!([{"a": 1}]));
        assert_eq!(repaired(r#"{"a": [1], "b": [[1], ["#), json!({"a": [1], "b": [[1]]}));
    }

    #[test]
    fn partial_literals_and_numbers() {
        assert_eq!(repaired(r#"{"a": tr"#), json!({}));
        assert_eq!(repaired(r#"{"a": [true, nu"#), json!({"a": [true]}));
        assert_eq!(repaired(r#"{"a": [true, null"#), json!({"a": [true, null]}));
        assert_eq!(repaired(r#"{"a": 1."#), json!({"a": 1}));
        assert_eq!(repaired(r#"{"a": 2e"#), json!({"a": 2}));
        assert_eq!(repaired(r#"{"a": 1, "b": -"#), json!({"a": 1}));
    }

    #[test]
    fn excess_closers_are_removed_from_the_end() {
        assert_eq!(repair_truncated(r#"{"a": 1}}"#), r#"{"a": 1}"#);
        assert_eq!(repair_truncated("[1, 2]]]"), "[1, 2]");
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        let src = r#"{"a": "}}{[""#;
        assert_eq!(repaired(src), json!({"a": "}}{["}));
        assert!(!looks_truncated(r#"{"a": "}"}"#));
    }

    #[test]
    fn detection() {
        assert!(!looks_truncated(r#"{"a": 1}"#));
        assert!(!looks_truncated("[1, 2]\n"));
        assert!(looks_truncated(r#"{"a":"#));
        assert!(looks_truncated(r#"{"a": [1,"#));
        assert!(looks_truncated(r#"{"a": [1]"#));
        assert!(looks_truncated(r#"{"a": "tex"#));
    }
}
