//! `.properties` parsing

use crate::domain::{ConfigValue, FlatConfigMap};
use crate::normalize::sanitize_key;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+#.*$").expect("valid regex"));

/// Parse `.properties` text into a flat map.
///
/// Supports `=` and `:` separators (the first unescaped one wins), `#`/`!` comment lines,
/// backslash line continuations, trailing ` # comments` on values, and the `\:`, `\=`, `\ `
/// escapes in both keys and values. Later duplicates overwrite earlier ones; lines without a
/// separator are ignored.
pub fn parse_properties(text: &str) -> FlatConfigMap {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text).replace("\r\n", "\n");
    let mut map = FlatConfigMap::new();

    for line in logical_lines(&text) {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        let Some(idx) = find_separator(line) else {
            continue;
        };

        let key = sanitize_key(&unescape(line[..idx].trim()));
        if key.is_empty() {
            continue;
        }
        let value = INLINE_COMMENT.replace(line[idx + 1..].trim(), "");
        map.insert(key, ConfigValue::Text(unescape(&value)));
    }

    map
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

/// Join physical lines ending in an unescaped backslash with the line that follows.
///
/// Leading whitespace of a continuation line is dropped, as Java does.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf = String::new();
    let mut joining = false;

    for raw in text.split('\n') {
        let line = raw.trim_end();
        if !joining && is_comment(line.trim_start()) {
            lines.push(line.to_string());
            continue;
        }

        let continues = ends_with_continuation(line);
        let body = if continues { &line[..line.len() - 1] } else { line };
        if joining {
            buf.push_str(body.trim_start());
        } else {
            buf.push_str(body);
        }

        joining = continues;
        if !continues {
            lines.push(std::mem::take(&mut buf));
        }
    }

    if !buf.is_empty() {
        lines.push(buf);
    }
    lines
}

/// An odd number of trailing backslashes means the last one is a continuation marker.
fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.bytes().rev().take_while(|b| *b == b'\\').count();
    trailing % 2 == 1
}

fn find_separator(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ':' | '=' => return Some(idx),
            _ => {}
        }
    }
    None
}

fn unescape(s: &str) -> String {
    s.replace("\\:", ":").replace("\\=", "=").replace("\\ ", " ")
}
