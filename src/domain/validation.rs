//! Payload validation producing field → messages maps.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use super::PasswordStrength;

pub const USERNAME_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 50;
pub const BIO_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 180;

/// Validation failures keyed by field name, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .expect("Invalid regex pattern defined in code")
    })
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid regex pattern defined in code"))
}

pub fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "Email can not be empty");
    } else if email.chars().count() > EMAIL_MAX_LEN || !email_regex().is_match(email) {
        errors.add("email", "Email format is invalid");
    }
}

/// Blank check plus the minimum strength for new passwords.
pub fn check_new_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.is_empty() {
        errors.add(field, "Password can not be empty");
    } else if !PasswordStrength::is_acceptable(password) {
        errors.add(field, "The password strength is too low. Please use a stronger password.");
    }
}

pub fn check_required(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This value should not be blank.");
    }
}

fn check_max_len(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value
        && value.chars().count() > max
    {
        errors.add(
            field,
            format!("This value is too long. It should have {max} characters or less."),
        );
    }
}

/// Username must be non-empty, short, and URL-safe.
pub fn check_username(errors: &mut FieldErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", "This value should not be blank.");
        return;
    }
    check_max_len(errors, "username", Some(username), USERNAME_MAX_LEN);
    if !username_regex().is_match(username) {
        errors.add(
            "username",
            "Username may only contain letters, digits, '_', '.' and '-'.",
        );
    }
}

pub fn check_profile_text(
    errors: &mut FieldErrors,
    first_name: Option<&str>,
    last_name: Option<&str>,
    bio: Option<&str>,
) {
    check_max_len(errors, "first_name", first_name, NAME_MAX_LEN);
    check_max_len(errors, "last_name", last_name, NAME_MAX_LEN);
    check_max_len(errors, "bio", bio, BIO_MAX_LEN);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "ada@example.com");
        assert!(errors.is_empty());

        for bad in ["", "   ", "no-at-sign", "a@b", "a@@example.com", "a b@example.com"] {
            let mut errors = FieldErrors::new();
            check_email(&mut errors, bad);
            assert_eq!(errors.get("email").map(<[String]>::len), Some(1), "{bad}");
        }
    }

    #[test]
    fn password_rules() {
        let mut errors = FieldErrors::new();
        check_new_password(&mut errors, "password", "");
        check_new_password(&mut errors, "new_password", "password");
        check_new_password(&mut errors, "other", "Sup3r$ecret-Passw0rd!");

        assert_eq!(errors.get("password").unwrap()[0], "Password can not be empty");
        assert!(errors.get("new_password").is_some());
        assert!(errors.get("other").is_none());
    }

    #[test]
    fn username_rules() {
        let mut errors = FieldErrors::new();
        check_username(&mut errors, "grace.hopper-1_");
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        check_username(&mut errors, &"x".repeat(51));
        assert_eq!(errors.get("username").unwrap().len(), 1);

        let mut errors = FieldErrors::new();
        check_username(&mut errors, "white space");
        assert_eq!(errors.get("username").unwrap().len(), 1);
    }

    #[test]
    fn profile_lengths_count_characters() {
        let mut errors = FieldErrors::new();
        let bio = "é".repeat(255);
        check_profile_text(&mut errors, Some(&"n".repeat(50)), None, Some(&bio));
        assert!(errors.is_empty());

        check_profile_text(&mut errors, None, Some(&"n".repeat(51)), Some(&"b".repeat(256)));
        assert!(errors.get("last_name").is_some());
        assert!(errors.get("bio").is_some());
    }

    #[test]
    fn errors_serialize_as_map_and_display_in_order() {
        let mut errors = FieldErrors::single("password", "weak");
        errors.add("email", "bad");
        errors.add("email", "taken");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["email"], serde_json::json!(["bad", "taken"]));
        assert_eq!(errors.to_string(), "email: bad; email: taken; password: weak");
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
