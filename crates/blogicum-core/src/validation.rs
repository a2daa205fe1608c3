//! Field validation shared by submission handlers.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Maximum length of titles and names.
pub const MAX_TITLE_CHARS: usize = 256;

/// Maximum length of usernames and personal names.
pub const MAX_USERNAME_CHARS: usize = 150;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Non-blank check; trims nothing, only rejects whitespace-only values.
    pub fn require(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        }
        self
    }

    /// Presence check for fields that are not strings.
    pub fn require_some<T>(&mut self, field: &str, value: &Option<T>) -> &mut Self {
        if value.is_none() {
            self.add(field, "This field is required.");
        }
        self
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        let count = value.chars().count();
        if count > max {
            self.add(
                field,
                format!("Ensure this value has at most {max} characters (it has {count})."),
            );
        }
        self
    }

    /// Letters, digits and `@.+-_` only.
    pub fn username(&mut self, field: &str, value: &str) -> &mut Self {
        self.require(field, value);
        self.max_chars(field, value, MAX_USERNAME_CHARS);
        if !value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            self.add(
                field,
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        self
    }

    /// Empty is accepted; otherwise `local@domain.tld` with no spaces.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            return self;
        }
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            self.add(field, "Enter a valid email address.");
        }
        self
    }

    /// Latin letters, digits, hyphens and underscores.
    pub fn slug(&mut self, field: &str, value: &str) -> &mut Self {
        self.require(field, value);
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.add(
                field,
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }
        self
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
