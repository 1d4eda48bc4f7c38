use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

/// The `---` delimited metadata block at the top of a note.
///
/// Only the flat subset Obsidian properties use is understood: `key: value`,
/// inline lists (`key: [a, b]`) and block lists (`key:` followed by `- item`
/// lines). Nested mappings are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: BTreeMap<String, FieldValue>,
}

impl FrontMatter {
    pub fn parse(text: &str) -> Self {
        let len = block_len(text);
        if len == 0 {
            return Self::default();
        }

        let mut fields = BTreeMap::new();
        let mut list_key: Option<String> = None;

        for line in text.lines().skip(1).take(len - 2) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(item) = list_item(line) {
                if let Some(key) = &list_key {
                    if let Some(FieldValue::List(items)) = fields.get_mut(key) {
                        let item = unquote(item);
                        if !item.is_empty() {
                            items.push(item);
                        }
                    }
                }
                continue;
            }

            if line.starts_with(char::is_whitespace) {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                list_key = None;
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim();

            if value.is_empty() {
                fields.insert(key.clone(), FieldValue::List(Vec::new()));
                list_key = Some(key);
            } else if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
                let items = inner
                    .split(',')
                    .map(unquote)
                    .filter(|item| !item.is_empty())
                    .collect();
                fields.insert(key, FieldValue::List(items));
                list_key = None;
            } else {
                fields.insert(key, FieldValue::Scalar(unquote(value)));
                list_key = None;
            }
        }

        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn values(&self, key: &str) -> Vec<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Scalar(value)) => vec![value.as_str()],
            Some(FieldValue::List(items)) => items.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// `tags` (or legacy `tag`); scalar values may hold several tags
    /// separated by commas or spaces.
    pub fn tags(&self) -> Vec<&str> {
        ["tags", "tag"]
            .iter()
            .flat_map(|key| self.values(key))
            .flat_map(|value| value.split([',', ' ']))
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }

    pub fn aliases(&self) -> Vec<&str> {
        ["aliases", "alias"]
            .iter()
            .flat_map(|key| self.values(key))
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .collect()
    }

    pub fn is_entry_point(&self) -> bool {
        ["entry_point", "entry-point"].iter().any(|key| {
            matches!(
                self.fields.get(*key),
                Some(FieldValue::Scalar(value))
                    if matches!(value.to_ascii_lowercase().as_str(), "true" | "yes")
            )
        })
    }
}

/// Number of lines taken by the front-matter block, delimiters included.
/// Zero when the note has none (or the block is never closed).
pub(crate) fn block_len(text: &str) -> usize {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim_start_matches('\u{feff}').trim_end() == "---" => {}
        _ => return 0,
    }

    for (idx, line) in lines.enumerate() {
        let line = line.trim_end();
        if line == "---" || line == "..." {
            return idx + 2;
        }
    }
    0
}

fn list_item(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('-')?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    let stripped = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
        .unwrap_or(raw);
    stripped.trim().to_string()
}
