//! HTML tag stripping for result strings
//!
//! Removes markup from text read back from the database, keeping only the tags
//! named in an allow-list. Comments are always removed. A `<` that does not
//! open a tag (`a < b`) is kept as text.
//!
//! [`escape_html`] is the opposite approach for text headed into a page:
//! nothing is removed, the markup characters are encoded.

use std::collections::HashSet;

/// Set of tag names that survive sanitization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedTags {
    names: HashSet<String>,
}

impl AllowedTags {
    /// Strip every tag
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse an allow-list written either as `<b><i>` or as `b, i`
    pub fn parse(list: &str) -> Self {
        let names = list
            .split(|c: char| c == '<' || c == '>' || c == ',' || c.is_whitespace())
            .map(|name| name.trim_start_matches('/').to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    /// Whether `tag` (case-insensitive) is allowed
    pub fn allows(&self, tag: &str) -> bool {
        self.names.contains(&tag.to_ascii_lowercase())
    }

    /// Remove disallowed tags from `input`
    pub fn strip(&self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find('<') {
            output.push_str(&rest[..start]);
            let candidate = &rest[start..];

            if let Some(body) = candidate.strip_prefix("<!--") {
                rest = match body.find("-->") {
                    Some(end) => &body[end + 3..],
                    None => "",
                };
                continue;
            }

            let opens_tag = candidate[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?');
            if !opens_tag {
                output.push('<');
                rest = &candidate[1..];
                continue;
            }

            match candidate.find('>') {
                Some(end) => {
                    let tag = &candidate[..=end];
                    if self.allows(tag_name(tag)) {
                        output.push_str(tag);
                    }
                    rest = &candidate[end + 1..];
                }
                None => {
                    // unterminated tag swallows the remainder
                    rest = "";
                }
            }
        }

        output.push_str(rest);
        output
    }
}

fn tag_name(tag: &str) -> &str {
    let inner = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .trim_end_matches('>');
    let end = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Trim `data` and encode `&`, `<`, `>` and both quote characters as entities
pub fn escape_html(data: &str) -> String {
    let data = data.trim();
    let mut escaped = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
