//! JSON recovery for model responses
//!
//! Models wrap JSON in code fences, surround it with prose and produce
//! near-JSON (trailing commas, bare keys, single quotes). Recovery strips the
//! fences, cuts out the first balanced object and parses it, repairing the
//! common malformations if the plain parse fails.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::retry::first_ok;

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"```[A-Za-z]*").unwrap();
}

pub fn strip_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

/// First `{` and its matching `}`, ignoring braces inside strings
pub fn extract_object(text: &str) -> Result<&str, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoJson)?;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    Err(ParseError::Unbalanced)
}

/// Rewrite common near-JSON into JSON
///
/// Only text outside string literals is touched: trailing commas are dropped,
/// bare keys are quoted and single-quoted strings become double-quoted.
pub fn repair(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => i = copy_string(&chars, i, &mut out),
            ',' if matches!(next_significant(&chars, i + 1), Some('}' | ']')) => i += 1,
            '\r' | '\n' => {
                out.push(' ');
                i += 1;
            }
            c if is_key_start(c) && expects_key(&out) => {
                let end = key_end(&chars, i);
                let quoted = next_significant(&chars, end) == Some(':');
                if quoted {
                    out.push('"');
                }
                out.extend(&chars[i..end]);
                if quoted {
                    out.push('"');
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy the string literal opening at `start` as a JSON string, returning
/// the index just past its closing quote
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');

    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            match chars[i + 1] {
                '\'' => out.push('\''),
                next => {
                    out.push('\\');
                    out.push(next);
                }
            }
            i += 2;
            continue;
        }
        if c == quote {
            out.push('"');
            return i + 1;
        }
        match c {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }

    i
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars.iter().skip(from).find(|c| !c.is_whitespace()).copied()
}

fn is_key_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn key_end(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&c| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .map_or(chars.len(), |n| start + n)
}

fn expects_key(out: &str) -> bool {
    out.trim_end().ends_with(|c: char| c == '{' || c == ',')
}

#[derive(Debug, Clone, Copy)]
enum Pass {
    AsIs,
    Repaired,
}

/// Recover a value of type `T` from a raw model response
pub fn recover<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let stripped = strip_fences(raw);
    let object = extract_object(&stripped)?;

    first_ok([Pass::AsIs, Pass::Repaired], |pass| {
        let candidate = match pass {
            Pass::AsIs => object.to_string(),
            Pass::Repaired => repair(object),
        };
        serde_json::from_str::<T>(&candidate).map_err(|e| {
            log::debug!("JSON parse ({:?}) failed: {}", pass, e);
            e.to_string()
        })
    })
    .map_err(|mut e| ParseError::Malformed(e.failures.pop().unwrap_or_default()))
}
