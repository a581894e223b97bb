//! Username and quest-field validation for registration and accepted input.

use std::collections::HashSet;

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error)]
pub enum UsernameError {
    #[error("Username is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Username is a reserved system name")]
    Reserved,
}

/// Username validation rules configuration
#[derive(Debug, Clone)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_unicode: bool,
}

impl UsernameRules {
    /// Default rules for registered users: short, display-safe handles that
    /// sort predictably on leaderboards.
    pub fn user() -> Self {
        UsernameRules {
            min_length: 2,
            max_length: 24,
            allow_unicode: false,
        }
    }
}

impl Default for UsernameRules {
    fn default() -> Self {
        Self::user()
    }
}

/// Get set of reserved usernames that should not be allowed
fn reserved_names() -> HashSet<&'static str> {
    [
        // System/admin terms
        "admin",
        "administrator",
        "root",
        "system",
        "operator",
        "moderator",
        "guest",
        "anonymous",
        "user",
        "test",
        "demo",
        // Service terms that would confuse leaderboards and grants
        "leaderboard",
        "shop",
        "inventory",
        "quest",
        "stamina",
        "coin",
        "register",
        "delete",
        "remove",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username according to the given rules. Returns the accepted
/// form (trimmed) on success.
pub fn validate_username(username: &str, rules: &UsernameRules) -> Result<String, UsernameError> {
    let trimmed = username.trim();

    // Length checks
    if trimmed.chars().count() < rules.min_length {
        return Err(UsernameError::TooShort {
            min: rules.min_length,
        });
    }
    if trimmed.chars().count() > rules.max_length {
        return Err(UsernameError::TooLong {
            max: rules.max_length,
        });
    }

    // Whitespace checks
    if trimmed != username {
        return Err(UsernameError::InvalidWhitespace);
    }

    // Reserved name check (case-insensitive)
    if reserved_names().contains(&trimmed.to_lowercase().as_str()) {
        return Err(UsernameError::Reserved);
    }

    // Character type validation
    let mut invalid_chars = Vec::new();
    for ch in trimmed.chars() {
        let valid = if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.' {
            true
        } else if !ch.is_ascii() && (ch.is_alphabetic() || ch.is_numeric()) {
            rules.allow_unicode
        } else {
            false
        };
        if !valid {
            invalid_chars.push(ch);
        }
    }

    if !invalid_chars.is_empty() {
        let unique_chars: HashSet<char> = invalid_chars.into_iter().collect();
        let chars_str: String = unique_chars.into_iter().collect();
        return Err(UsernameError::InvalidCharacters { chars: chars_str });
    }

    Ok(trimmed.to_string())
}

/// Validate a username with the default user rules
pub fn validate_user_name(name: &str) -> Result<String, UsernameError> {
    validate_username(name, &UsernameRules::user())
}

/// Maximum accepted quest title length (characters).
pub const MAX_QUEST_TITLE_LEN: usize = 80;
/// Maximum accepted quest description length (characters).
pub const MAX_QUEST_DESCRIPTION_LEN: usize = 500;

/// Clamp a client-supplied text field to `max` characters. Quest titles and
/// descriptions are display-only, so oversized input is truncated rather than
/// rejected.
pub fn clamp_text(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    trimmed.chars().take(max).collect()
}
