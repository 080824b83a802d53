//! Multi-valued profile columns
//!
//! Forum profiles store travel documents and loyalty memberships as JSON
//! lists. Entries are either plain strings or objects such as
//! `{"Programm": "SU", "Status": "Gold", "Number": "SU 123"}`. A column is
//! only read as JSON when it opens like a JSON list, object or string.
//! Anything else is comma/semicolon separated text, so bare numbers and
//! words such as `true` stay verbatim.

use serde_json::Value;

/// One element of a multi-valued column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntry {
    /// Identifier (document or membership number)
    pub value: String,
    pub program: Option<String>,
    pub status: Option<String>,
}

impl ListEntry {
    fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }
}

/// Parse a list column into entries; blanks are dropped
pub fn parse_list(raw: &str) -> Vec<ListEntry> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    match json_value(trimmed) {
        Some(value) => collect_entries(&value, &mut entries),
        None => {
            entries.extend(
                trimmed
                    .split([',', ';'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ListEntry::plain),
            );
        }
    }

    entries.retain(|e| !e.value.trim().is_empty());
    entries
}

fn json_value(text: &str) -> Option<Value> {
    if !text.starts_with(['[', '{', '"']) {
        return None;
    }
    serde_json::from_str(text).ok()
}

fn collect_entries(value: &Value, out: &mut Vec<ListEntry>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_entries(item, out);
            }
        }
        Value::Object(map) => {
            let member = |needle: &str| {
                map.iter()
                    .find(|(key, _)| key.to_lowercase().contains(needle))
                    .and_then(|(_, v)| scalar_text(v))
            };

            match member("number") {
                Some(number) => out.push(ListEntry {
                    value: number,
                    program: member("program"),
                    status: member("status"),
                }),
                None => {
                    for nested in map.values() {
                        collect_entries(nested, out);
                    }
                }
            }
        }
        other => {
            if let Some(text) = scalar_text(other) {
                out.push(ListEntry::plain(text));
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
