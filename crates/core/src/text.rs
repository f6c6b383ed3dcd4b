//! Generic two-token placeholder substitution
//!
//! [`TokenSubstitutor`] scans text left to right for `open...close` spans
//! and replaces each span through a caller-supplied resolver. Escaping
//! rules:
//!
//! - an open token preceded by a backslash is literal; the backslash is
//!   consumed and scanning continues after the token
//! - a close token preceded by a backslash is literal; the backslash is
//!   consumed and the token accumulates into the expression while the close
//!   search continues
//! - an open token with no unescaped close token copies the remainder of
//!   the text verbatim
//!
//! [`resolve_placeholders`] layers `${key}` / `${key:default}` property
//! lookup on top of the scanner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Separator between a placeholder key and its default value
const DEFAULT_VALUE_SEPARATOR: char = ':';

/// Two-token span scanner with a pluggable per-expression resolver
#[derive(Debug, Clone)]
pub struct TokenSubstitutor {
    open: String,
    close: String,
}

impl TokenSubstitutor {
    /// A substitutor for `open...close` delimited spans
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Replace every unescaped `open...close` span via `resolver`
    ///
    /// Produces a single output string; a resolver error aborts the whole
    /// substitution.
    pub fn substitute(
        &self,
        text: &str,
        resolver: &mut dyn FnMut(&str) -> Result<String>,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        let mut start = match text.find(&self.open) {
            Some(pos) => pos,
            None => return Ok(text.to_string()),
        };

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut expression = String::new();
        let mut offset = 0;

        loop {
            if start > 0 && bytes[start - 1] == b'\\' {
                // escaped open token: drop the backslash, keep the token
                out.push_str(&text[offset..start - 1]);
                out.push_str(&self.open);
                offset = start + self.open.len();
            } else {
                expression.clear();
                out.push_str(&text[offset..start]);
                offset = start + self.open.len();

                let mut end = find_from(text, &self.close, offset);
                while let Some(pos) = end {
                    if pos > offset && bytes[pos - 1] == b'\\' {
                        // escaped close token: literal, keep searching
                        expression.push_str(&text[offset..pos - 1]);
                        expression.push_str(&self.close);
                        offset = pos + self.close.len();
                        end = find_from(text, &self.close, offset);
                    } else {
                        expression.push_str(&text[offset..pos]);
                        break;
                    }
                }

                match end {
                    None => {
                        // unmatched open token, copy the remainder verbatim
                        out.push_str(&text[start..]);
                        offset = text.len();
                    }
                    Some(pos) => {
                        out.push_str(&resolver(&expression)?);
                        offset = pos + self.close.len();
                    }
                }
            }
            match find_from(text, &self.open, offset) {
                Some(pos) => start = pos,
                None => break,
            }
        }
        out.push_str(&text[offset..]);
        Ok(out)
    }
}

fn find_from(text: &str, needle: &str, from: usize) -> Option<usize> {
    if from > text.len() {
        return None;
    }
    text[from..].find(needle).map(|pos| pos + from)
}

/// Free-form string properties attached to descriptors and caches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    /// Empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// True when no properties are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Resolve `${key}` placeholders against a property set
///
/// Supports the `${key:default}` form. A key with no property and no
/// default renders back as `${key}` unchanged, so downstream consumers can
/// still see the unresolved placeholder.
pub fn resolve_placeholders(text: &str, properties: &Properties) -> String {
    let substitutor = TokenSubstitutor::new("${", "}");
    let resolved = substitutor.substitute(text, &mut |expression| {
        let (key, default) = match expression.split_once(DEFAULT_VALUE_SEPARATOR) {
            Some((key, default)) => (key, Some(default)),
            None => (expression, None),
        };
        Ok(match properties.get(key) {
            Some(value) => value.to_string(),
            None => match default {
                Some(default) => default.to_string(),
                None => format!("${{{expression}}}"),
            },
        })
    });
    // the resolver above is infallible
    resolved.unwrap_or_else(|_| text.to_string())
}
