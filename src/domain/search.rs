//! Search filters and their canonical textual form.
//!
//! A filter is an ordered list of predicates over whitelisted columns. The
//! same list drives SQL generation and cache signatures, so two requests that
//! apply the same predicates share cache entries regardless of how their
//! query strings were spelled.

use std::fmt::Write as _;

use super::conditions::Range;
use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column >= min AND column < max`, either side optional.
    Range {
        column: &'static str,
        range: Range,
    },
    /// `column = value`
    Equals { column: &'static str, value: String },
    /// `column` contains `value` as a substring.
    Contains { column: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    predicates: Vec<Predicate>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn range(&mut self, column: &'static str, range: Range) {
        self.push(Predicate::Range { column, range });
    }

    pub fn equals(&mut self, column: &'static str, value: impl Into<String>) {
        self.push(Predicate::Equals {
            column,
            value: value.into(),
        });
    }

    /// One `Contains` predicate per comma separated item, empty items skipped.
    pub fn contains_each(&mut self, column: &'static str, list: &str) {
        for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            self.push(Predicate::Contains {
                column,
                value: item.to_string(),
            });
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Canonical text of the predicates; values are JSON-quoted so the
    /// encoding is unambiguous.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        for (index, predicate) in self.predicates.iter().enumerate() {
            if index > 0 {
                out.push('&');
            }
            match predicate {
                Predicate::Range { column, range } => {
                    let _ = write!(out, "{column}[{}]", range.id);
                }
                Predicate::Equals { column, value } => {
                    let _ = write!(out, "{column}={}", quote(value));
                }
                Predicate::Contains { column, value } => {
                    let _ = write!(out, "{column}~{}", quote(value));
                }
            }
        }
        out
    }
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// A validated `page` / `perPage` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageWindow {
    page: i64,
    per_page: i64,
}

impl PageWindow {
    pub fn new(page: i64, per_page: i64) -> Result<Self, DomainError> {
        if page < 0 {
            return Err(DomainError::validation("`page` must not be negative"));
        }
        if per_page < 0 {
            return Err(DomainError::validation("`perPage` must not be negative"));
        }
        page.checked_mul(per_page)
            .ok_or_else(|| DomainError::validation("`page` * `perPage` overflows"))?;
        Ok(Self { page, per_page })
    }

    /// Parse the raw query values; both are required.
    pub fn parse(page: Option<&str>, per_page: Option<&str>) -> Result<Self, DomainError> {
        let page = parse_required(page, "page")?;
        let per_page = parse_required(per_page, "perPage")?;
        Self::new(page, per_page)
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        self.page * self.per_page
    }
}

fn parse_required(raw: Option<&str>, name: &'static str) -> Result<i64, DomainError> {
    let raw = raw.ok_or_else(|| DomainError::validation(format!("`{name}` is required")))?;
    raw.trim()
        .parse()
        .map_err(|_| DomainError::validation(format!("`{name}` must be an integer, got `{raw}`")))
}
