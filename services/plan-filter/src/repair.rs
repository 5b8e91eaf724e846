//! Text-level fixes that turn the almost-JSON emitted by a model into JSON
//! text. Every transform is a no-op when its trigger is absent, and applying
//! [`repair_json_text`] twice yields the same text as applying it once.

use once_cell::sync::Lazy;
use regex::Regex;

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("control char pattern"));
static FENCES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("fence pattern"));

/// Run every transform in order.
///
/// Markdown fences and control characters go first; they would otherwise
/// confuse the structural passes (and later the bracket counts of the
/// truncation repair). Comments are removed before trailing commas so a
/// comment sitting between a comma and a closer cannot survive one pass.
pub fn repair_json_text(input: &str) -> String {
    let s = input.trim();
    let s = strip_control_chars(s);
    let s = strip_code_fences(&s);
    let s = normalize_tokens(&s);
    let s = remove_trailing_commas(&s);
    s.trim().to_string()
}

/// Remove ASCII control characters except `\n`, `\r` and `\t`.
pub fn strip_control_chars(s: &str) -> String {
    CONTROL_CHARS.replace_all(s, "").into_owned()
}

/// Remove ```` ```json ```` and ```` ``` ```` markers wherever they occur.
pub fn strip_code_fences(s: &str) -> String {
    FENCES.replace_all(s, "").into_owned()
}

/// Single pass over the text outside of double-quoted strings that
/// - drops `//` line comments and `/* */` block comments,
/// - rewrites single-quoted keys and values to double-quoted strings,
/// - quotes bare keys (`{day: 1}` or `{1: ...}`) that are followed by a colon.
///
/// Single quotes and bare words only count as keys/values right after one of
/// `{ [ , :`, so apostrophes in surrounding prose are left alone.
pub fn normalize_tokens(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 16);
    let mut last_sig: Option<char> = None;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => {
                let end = scan_string(&chars, i, '"');
                out.extend(&chars[i..end]);
                last_sig = Some('"');
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            '\'' if matches!(last_sig, Some('{' | '[' | ',' | ':')) => {
                let end = scan_string(&chars, i, '\'');
                let closed = end - i >= 2 && chars[end - 1] == '\'';
                let body_end = if closed { end - 1 } else { end };
                out.push('"');
                let mut escaped = false;
                for &c in &chars[i + 1..body_end] {
                    match c {
                        '\\' if !escaped => escaped = true,
                        '\'' if escaped => {
                            out.push('\'');
                            escaped = false;
                        }
                        _ => {
                            if escaped {
                                out.push('\\');
                                escaped = false;
                            }
                            if c == '"' {
                                out.push('\\');
                            }
                            out.push(c);
                        }
                    }
                }
                if escaped {
                    out.push('\\');
                }
                if closed {
                    out.push('"');
                }
                last_sig = Some('"');
                i = end;
            }
            c if is_key_start(c) && matches!(last_sig, Some('{' | ',')) => {
                let mut end = i;
                while end < chars.len() && is_key_char(chars[end]) {
                    end += 1;
                }
                let next = skip_trivia(&chars, end);
                let word = &chars[i..end];
                if chars.get(next) == Some(&':') {
                    out.push('"');
                    out.extend(word);
                    out.push('"');
                    last_sig = Some('"');
                } else {
                    out.extend(word);
                    last_sig = word.last().copied();
                }
                i = end;
            }
            c => {
                out.push(c);
                if !c.is_whitespace() {
                    last_sig = Some(c);
                }
                i += 1;
            }
        }
    }
    out
}

/// Drop commas that are only followed by whitespace, further commas, and a
/// closing `}` or `]`.
pub fn remove_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                let end = scan_string(&chars, i, '"');
                out.extend(&chars[i..end]);
                i = end;
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && (chars[j].is_whitespace() || chars[j] == ',') {
                    j += 1;
                }
                let run = &chars[i..j];
                if matches!(chars.get(j), Some('}' | ']')) {
                    out.extend(run.iter().filter(|c| **c != ','));
                } else {
                    out.extend(run);
                }
                i = j;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Index one past the closing `quote` of the string starting at `start`, or
/// the end of input when the string is unterminated.
fn scan_string(chars: &[char], start: usize, quote: char) -> usize {
    let mut esc = false;
    for (offset, &c) in chars[start + 1..].iter().enumerate() {
        if esc {
            esc = false;
        } else if c == '\\' {
            esc = true;
        } else if c == quote {
            return start + 1 + offset + 1;
        }
    }
    chars.len()
}

/// Index of the first character at or after `from` that is neither
/// whitespace nor part of a `//` or `/* */` comment.
fn skip_trivia(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            _ => break,
        }
    }
    i
}

fn is_key_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_key_char(c: char) -> bool {
    is_key_start(c) || c == '-'
}
