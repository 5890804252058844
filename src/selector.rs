// Selector Builder primitives
// Legacy query parameters become `path=value` field selector clauses joined with
// ','. The selector language only has AND: there is no way to express "a OR b",
// so a legacy filter that needs OR semantics cannot be pushed down to the store.
// Values are escaped (`\\`, `\,`, `\=`) so one parameter is always one clause.

use serde::{Deserialize, Serialize};

use crate::resource::ListOptions;

/// Ordered field selector under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    clauses: Vec<String>,
}

impl FieldSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path=value` when the value is present and non-empty
    pub fn eq_str(mut self, path: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.clauses.push(format!("{path}={}", escape_value(value)));
        }
        self
    }

    /// Add `path=value` unless the value is zero ("0 means absent")
    pub fn eq_nonzero(mut self, path: &str, value: i64) -> Self {
        if value != 0 {
            self.clauses.push(format!("{path}={value}"));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// Joined selector string, or None when no clause was added
    pub fn build(self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(","))
        }
    }
}

/// Escape a selector value so `,` and `=` inside it cannot start a new clause
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ',' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Comparison of one selector clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOp {
    Equals,
    NotEquals,
}

/// One parsed clause: key, operator and the unescaped value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub key: String,
    pub op: SelectorOp,
    pub value: String,
}

/// Split a selector into clauses on unescaped commas and parse each one.
/// Accepts `=`, `==` and `!=`; None for a clause with no operator, a stray
/// unescaped `=` in the value or a dangling escape.
pub fn parse_selector(selector: &str) -> Option<Vec<Clause>> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in selector.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' => {
                current.push(c);
                escaped = true;
            }
            ',' => clauses.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if escaped {
        return None;
    }
    clauses.push(current);

    clauses
        .iter()
        .map(|clause| clause.trim())
        .filter(|clause| !clause.is_empty())
        .map(parse_clause)
        .collect()
}

fn parse_clause(clause: &str) -> Option<Clause> {
    let chars: Vec<char> = clause.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let (op, width) = match (chars[i], chars.get(i + 1)) {
            // keys never carry escapes; skip the escaped char all the same
            ('\\', _) => {
                i += 2;
                continue;
            }
            ('!', Some('=')) => (SelectorOp::NotEquals, 2),
            ('=', Some('=')) => (SelectorOp::Equals, 2),
            ('=', _) => (SelectorOp::Equals, 1),
            _ => {
                i += 1;
                continue;
            }
        };
        let key: String = chars[..i].iter().collect();
        let value = unescape(&chars[i + width..])?;
        return Some(Clause {
            key: key.trim().to_string(),
            op,
            value,
        });
    }
    None
}

fn unescape(chars: &[char]) -> Option<String> {
    let mut value = String::with_capacity(chars.len());
    let mut iter = chars.iter();
    while let Some(&c) = iter.next() {
        match c {
            '\\' => value.push(*iter.next()?),
            '=' => return None,
            _ => value.push(c),
        }
    }
    Some(value)
}

/// Default and maximum page size for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl PageLimits {
    pub const fn new(default_limit: u64, max_limit: u64) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    /// Positive requested limits pass through clamped to the maximum;
    /// anything else gets the default
    pub fn resolve(&self, requested: Option<i64>) -> u64 {
        match requested {
            Some(limit) if limit > 0 => (limit as u64).min(self.max_limit),
            _ => self.default_limit,
        }
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::new(100, 1000)
    }
}

/// Assemble list options from the builder outputs
pub fn list_options(
    selector: FieldSelector,
    limit: u64,
    continue_token: Option<&str>,
) -> ListOptions {
    ListOptions {
        field_selector: selector.build(),
        label_selector: None,
        limit,
        continue_token: continue_token
            .filter(|token| !token.is_empty())
            .map(str::to_string),
    }
}
