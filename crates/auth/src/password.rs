//! Password strength scoring shown next to password inputs.

use serde::Serialize;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    /// 0..=5
    pub score: u8,
    pub feedback: Vec<String>,
}

impl PasswordStrength {
    pub fn is_acceptable(&self) -> bool {
        self.score >= 3
    }
}

/// Score a password: one point each for length >= 8, a digit, a lowercase
/// letter, an uppercase letter and a special character.
pub fn check_password_strength(password: &str) -> PasswordStrength {
    let mut feedback = Vec::new();
    let mut score = 0u8;

    let len = password.chars().count();
    if len < 6 {
        feedback.push("use at least 6 characters".to_string());
    } else if len >= 8 {
        score += 1;
    }

    let classes: [(fn(char) -> bool, &str); 4] = [
        (|c| c.is_ascii_digit(), "add a digit"),
        (|c| c.is_ascii_lowercase(), "add a lowercase letter"),
        (|c| c.is_ascii_uppercase(), "add an uppercase letter"),
        (|c| SPECIAL_CHARACTERS.contains(c), "add a special character"),
    ];

    for (matches, hint) in classes {
        if password.chars().any(matches) {
            score += 1;
        } else {
            feedback.push(hint.to_string());
        }
    }

    if feedback.is_empty() {
        feedback.push("password strength is good".to_string());
    }

    PasswordStrength { score, feedback }
}
