//! Field validation rules shared by the services.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{DomainError, Result};

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+]?[(]?[0-9]{1,4}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,9}$")
        .expect("Invalid regex")
});

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("Invalid regex"));

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

/// `HH:MM`, 24-hour clock.
pub fn is_valid_time(time: &str) -> bool {
    TIME_OF_DAY.is_match(time)
}

/// An absolute `http` or `https` URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Collects rule violations so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` unless `ok` holds.
    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    /// Trimmed length, counted in characters, must be in `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        self.check(
            (min..=max).contains(&len),
            format!("{field} must be between {min} and {max} characters"),
        )
    }

    pub fn min_length(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        let len = value.trim().chars().count();
        self.check(len >= min, format!("{field} must be at least {min} characters"))
    }

    pub fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            is_valid_phone(value.trim()),
            format!("{field} must be a valid phone number"),
        )
    }

    pub fn url(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            is_valid_url(value.trim()),
            format!("{field} must be a valid http(s) URL"),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Validation` with every recorded message, if any.
    pub fn finish(&self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.errors.join("; ")))
        }
    }
}
