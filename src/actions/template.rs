//! Placeholder substitution for command templates.
//!
//! A placeholder is `{name}` where `name` is any run of characters other
//! than `}`. Substituted values get a minimal quoting pass: empty values
//! become `""`, values containing a space or tab are wrapped in double
//! quotes, everything else is inserted verbatim.
//!
//! Double quotes inside a value are not escaped. A value such as `a "b" c`
//! therefore yields unbalanced quoting in the resolved command; this is a
//! known limitation of the catalog format, not full shell quoting.

use std::collections::HashMap;

/// Substitutes every `{name}` in `template` with the matching entry of
/// `inputs`. Unknown names resolve to the empty-value token.
pub fn resolve(template: &str, inputs: &HashMap<String, String>) -> String {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((before, name, after)) = next_placeholder(rest) {
        resolved.push_str(before);
        let value = inputs.get(name).map(String::as_str).unwrap_or("");
        resolved.push_str(&quote_value(value));
        rest = after;
    }

    resolved.push_str(rest);
    resolved
}

/// Placeholder names in order of appearance, duplicates included.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some((_, name, after)) = next_placeholder(rest) {
        names.push(name);
        rest = after;
    }
    names
}

pub fn has_placeholder(template: &str, name: &str) -> bool {
    placeholders(template).contains(&name)
}

/// Quoting applied to substituted values.
pub fn quote_value(value: &str) -> String {
    if value.is_empty() {
        "\"\"".to_string()
    } else if value.contains([' ', '\t']) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

/// Splits `text` around the first `{name}`. The name may be empty (`{}`).
fn next_placeholder(text: &str) -> Option<(&str, &str, &str)> {
    let open = text.find('{')?;
    let close = text[open + 1..].find('}')? + open + 1;
    Some((&text[..open], &text[open + 1..close], &text[close + 1..]))
}
