//! # models::ticker
//!
//! Canonical ticker symbols. The exchange suffix (`.JK` for IDX) is part of
//! the canonical form, so `BBRI` and `bbri.jk` compare equal once parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A ticker in canonical form: upper-case, suffix included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Normalise user input into the canonical form.
    ///
    /// Returns `None` for empty input or characters that never occur in an
    /// exchange symbol.
    pub fn canonical(raw: &str, suffix: &str) -> Option<Self> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return None;
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
            return None;
        }

        let suffix = suffix.to_uppercase();
        if suffix.is_empty() || code.ends_with(&suffix) {
            if code == suffix {
                return None;
            }
            Some(Self(code))
        } else {
            Some(Self(format!("{code}{suffix}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare code without the exchange suffix, for display.
    pub fn short(&self, suffix: &str) -> &str {
        let suffix = suffix.to_uppercase();
        self.0.strip_suffix(suffix.as_str()).unwrap_or(&self.0)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_appended_once() {
        let a = Ticker::canonical("bbri", ".JK").unwrap();
        let b = Ticker::canonical(" BBRI.JK ", ".JK").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "BBRI.JK");
        assert_eq!(a.short(".JK"), "BBRI");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Ticker::canonical("", ".JK").is_none());
        assert!(Ticker::canonical("   ", ".JK").is_none());
        assert!(Ticker::canonical("BB RI", ".JK").is_none());
        assert!(Ticker::canonical("<b>", ".JK").is_none());
        assert!(Ticker::canonical(".jk", ".JK").is_none());
    }
}
