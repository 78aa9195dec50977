//! Entropy-based password strength estimate.
//!
//! The character pool is the union of the classes present in the password,
//! and only distinct characters contribute full pool entropy; repeated
//! characters add `log2(distinct)` bits each.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    VeryWeak,
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

impl PasswordStrength {
    /// Minimum strength accepted for new passwords.
    pub const REQUIRED: Self = Self::Medium;

    #[must_use]
    pub fn estimate(password: &str) -> Self {
        let entropy = entropy_bits(password);

        if entropy >= 120.0 {
            Self::VeryStrong
        } else if entropy >= 100.0 {
            Self::Strong
        } else if entropy >= 80.0 {
            Self::Medium
        } else if entropy >= 60.0 {
            Self::Weak
        } else {
            Self::VeryWeak
        }
    }

    #[must_use]
    pub fn is_acceptable(password: &str) -> bool {
        Self::estimate(password) >= Self::REQUIRED
    }
}

#[allow(clippy::cast_precision_loss)]
fn entropy_bits(password: &str) -> f64 {
    let length = password.chars().count();
    if length == 0 {
        return 0.0;
    }

    let distinct: HashSet<char> = password.chars().collect();

    let (mut control, mut digit, mut upper, mut lower, mut symbol, mut other) =
        (0u32, 0u32, 0u32, 0u32, 0u32, 0u32);

    for c in &distinct {
        match *c {
            c if c.is_ascii_control() => control = 33,
            '0'..='9' => digit = 10,
            'A'..='Z' => upper = 26,
            'a'..='z' => lower = 26,
            c if !c.is_ascii() => other = 128,
            _ => symbol = 33,
        }
    }

    let pool = f64::from(control + digit + upper + lower + symbol + other);
    let chars = distinct.len() as f64;
    let repeats = (length - distinct.len()) as f64;

    let repeat_bits = if chars > 1.0 { chars.log2() } else { 0.0 };
    chars * pool.log2() + repeats * repeat_bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_is_very_weak() {
        assert_eq!(PasswordStrength::estimate(""), PasswordStrength::VeryWeak);
    }

    #[test]
    fn short_or_repetitive_passwords_are_rejected() {
        assert!(!PasswordStrength::is_acceptable("password"));
        assert!(!PasswordStrength::is_acceptable("aaaaaaaaaaaaaaaaaaaa"));
        assert!(!PasswordStrength::is_acceptable("12345678"));
    }

    #[test]
    fn mixed_class_passphrases_are_accepted() {
        assert!(PasswordStrength::is_acceptable("Correct-Horse-Battery-9"));
        assert!(PasswordStrength::is_acceptable("Sup3r$ecret-Passw0rd!"));
    }

    #[test]
    fn strength_is_ordered() {
        assert!(PasswordStrength::VeryStrong > PasswordStrength::Medium);
        assert!(PasswordStrength::Weak < PasswordStrength::REQUIRED);
    }
}
