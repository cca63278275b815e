//! In-place editing of the `img-src` list inside a policy file.
//!
//! The file can be anything that holds the list as a bracketed sequence of
//! quoted strings, e.g. a JS config module:
//!
//! ```text
//! 'img-src': [
//!   "'self'",
//!   'data:',
//!   'https://images.example-van.test',
//! ],
//! ```
//!
//! Only the bytes between the last entry and the closing bracket are ever
//! rewritten.

use std::sync::LazyLock;

use regex::Regex;
use vanbuilder_shared::{Result, VanBuilderError};

use crate::allowlist::{AllowList, normalize_entry};

/// Key of the list, quoted or bare, followed by `:` or `=` and the opening bracket.
static LIST_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'`]?(?:img-src|imgSrc)["'`]?\s*[:=]\s*\["#).expect("valid regex")
});

const DEFAULT_QUOTE: char = '"';

/// A quoted entry with its byte span (quotes included).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    value: String,
    start: usize,
    end: usize,
    quote: char,
}

/// A policy file with the `img-src` list located.
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    text: String,
    open: usize,
    close: usize,
    entries: Vec<Entry>,
}

impl PolicyDocument {
    /// Locate and parse the `img-src` list.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let m = LIST_START
            .find(&text)
            .ok_or_else(|| VanBuilderError::parse("policy file has no img-src list"))?;
        let open = m.end() - 1;
        let (entries, close) = scan_list(&text, open)?;
        Ok(Self {
            text,
            open,
            close,
            entries,
        })
    }

    /// Entry values in file order, without their quotes.
    pub fn entries(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.value.as_str()).collect()
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.entries.iter().map(|e| e.value.clone()))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Append the origins not already listed. Returns the ones added, in
    /// input order; existing entries are never moved or rewritten.
    pub fn append(&mut self, origins: &[String]) -> Result<Vec<String>> {
        let mut seen: Vec<String> = self.entries.iter().map(|e| normalize_entry(&e.value)).collect();
        let mut added = Vec::new();
        for origin in origins {
            let key = normalize_entry(origin);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            added.push(origin.trim().trim_end_matches('/').to_string());
        }
        if added.is_empty() {
            return Ok(added);
        }

        let (pos, insertion) = self.insertion(&added);
        let mut text = String::with_capacity(self.text.len() + insertion.len());
        text.push_str(&self.text[..pos]);
        text.push_str(&insertion);
        text.push_str(&self.text[pos..]);

        *self = Self::parse(text)?;
        Ok(added)
    }

    /// Where and what to insert so the new entries match the list's layout.
    fn insertion(&self, added: &[String]) -> (usize, String) {
        let Some(last) = self.entries.last() else {
            let q = DEFAULT_QUOTE;
            let joined = added
                .iter()
                .map(|o| format!("{q}{o}{q}"))
                .collect::<Vec<_>>()
                .join(", ");
            return (self.open + 1, joined);
        };

        let q = last.quote;
        let multiline = self.text[self.open..self.close].contains('\n');
        let tail = &self.text[last.end..self.close];
        let comma = tail
            .find(|c: char| !c.is_whitespace())
            .filter(|&i| tail[i..].starts_with(','))
            .map(|i| last.end + i);

        if multiline {
            let indent = line_indent(&self.text, last.start);
            match comma {
                Some(c) => (
                    c + 1,
                    added.iter().map(|o| format!("\n{indent}{q}{o}{q},")).collect(),
                ),
                None => (
                    last.end,
                    added.iter().map(|o| format!(",\n{indent}{q}{o}{q}")).collect(),
                ),
            }
        } else {
            match comma {
                Some(c) => (c + 1, added.iter().map(|o| format!(" {q}{o}{q},")).collect()),
                None => (last.end, added.iter().map(|o| format!(", {q}{o}{q}")).collect()),
            }
        }
    }
}

/// Scan from the opening bracket to its matching close, collecting quoted
/// entries and skipping `//` comments.
fn scan_list(text: &str, open: usize) -> Result<(Vec<Entry>, usize)> {
    let bytes = text.as_bytes();
    let mut entries = Vec::new();
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b']' => return Ok((entries, i)),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = text[i..].find('\n').map_or(bytes.len(), |n| i + n);
            }
            q @ (b'"' | b'\'' | b'`') => {
                let end = closing_quote(bytes, i + 1, q).ok_or_else(|| {
                    VanBuilderError::parse(format!("unterminated string at byte {i} in img-src list"))
                })?;
                entries.push(Entry {
                    value: text[i + 1..end].to_string(),
                    start: i,
                    end: end + 1,
                    quote: q as char,
                });
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    Err(VanBuilderError::parse("img-src list is not closed"))
}

fn closing_quote(bytes: &[u8], from: usize, quote: u8) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Leading whitespace of the line containing byte `pos`.
fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |n| n + 1);
    let line = &text[line_start..];
    let width = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..width]
}

#[cfg(test)]
mod tests {
    use super::*;

    const JS_POLICY: &str = r#"// Content-Security-Policy for the directory app.
export const cspPolicy = {
  'default-src': ["'self'"],
  'img-src': [
    "'self'",
    'data:',
    'https://images.example-van.test',
  ],
  'script-src': ["'self'"],
};
"#;

    fn origins(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_entries() {
        let doc = PolicyDocument::parse(JS_POLICY).unwrap();
        assert_eq!(
            doc.entries(),
            vec!["'self'", "data:", "https://images.example-van.test"]
        );
        assert!(doc.allow_list().allows("https://images.example-van.test"));
    }

    #[test]
    fn appends_in_file_style() {
        let mut doc = PolicyDocument::parse(JS_POLICY).unwrap();
        let added = doc
            .append(&origins(&["https://cdn.example-van.test", "https://img.other.test"]))
            .unwrap();
        assert_eq!(added.len(), 2);

        let expected = JS_POLICY.replace(
            "    'https://images.example-van.test',\n",
            "    'https://images.example-van.test',\n    'https://cdn.example-van.test',\n    'https://img.other.test',\n",
        );
        assert_eq!(doc.text(), expected);
    }

    #[test]
    fn append_is_idempotent() {
        let mut once = PolicyDocument::parse(JS_POLICY).unwrap();
        once.append(&origins(&["https://cdn.example-van.test"])).unwrap();

        let mut twice = once.clone();
        let added = twice
            .append(&origins(&["https://cdn.example-van.test", "https://CDN.example-van.test/"]))
            .unwrap();
        assert!(added.is_empty());
        assert_eq!(once.text(), twice.text());
    }

    #[test]
    fn single_line_list_without_trailing_comma() {
        let text = r#"{ "img-src": ["'self'", "data:"], "font-src": ["'self'"] }"#;
        let mut doc = PolicyDocument::parse(text).unwrap();
        doc.append(&origins(&["https://cdn.example-van.test"])).unwrap();
        assert_eq!(
            doc.text(),
            r#"{ "img-src": ["'self'", "data:", "https://cdn.example-van.test"], "font-src": ["'self'"] }"#
        );
    }

    #[test]
    fn empty_list() {
        let mut doc = PolicyDocument::parse("imgSrc = [];").unwrap();
        doc.append(&origins(&["https://a.test", "https://b.test"])).unwrap();
        assert_eq!(doc.text(), r#"imgSrc = ["https://a.test", "https://b.test"];"#);
    }

    #[test]
    fn comments_inside_list_are_skipped() {
        let text = "'img-src': [\n  // legacy CDN's bucket\n  'https://old.test',\n]";
        let doc = PolicyDocument::parse(text).unwrap();
        assert_eq!(doc.entries(), vec!["https://old.test"]);
    }

    #[test]
    fn missing_list_is_a_parse_error() {
        let err = PolicyDocument::parse("export default {};").unwrap_err();
        assert!(matches!(err, VanBuilderError::Parse { .. }));
        let err = PolicyDocument::parse("'img-src': ['data:',").unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }
}
