// SPDX-License-Identifier: MIT

//! Input validation helpers.
//!
//! Pure functions shared by the user lifecycle and password workflows:
//! email/phone format checks, required-field presence, text sanitization,
//! and password strength rules.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of sanitized text fields.
const MAX_TEXT_LENGTH: usize = 5000;

/// Inline formatting tags preserved by `sanitize_input`.
const SAFE_TAGS: [&str; 5] = ["b", "i", "u", "em", "strong"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Strict pattern: local part must start and end with an alphanumeric,
    // domain labels likewise, TLD at least two letters.
    Regex::new(
        r"^[a-zA-Z0-9](?:[a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$",
    )
    .unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Accepts (123) 456-7890, 123-456-7890, 123.456.7890, 123 456 7890,
    // 1234567890, each with an optional +CC prefix.
    Regex::new(r"^(\+\d{1,3}\s?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}$").unwrap()
});

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?>.*?</script>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap());

/// Precompiled per-tag patterns for the safe-tag marker pass.
struct SafeTagPatterns {
    wrap: Regex,
    wrap_with: String,
    restore: Regex,
    restore_with: String,
}

static SAFE_TAG_PATTERNS: LazyLock<Vec<SafeTagPatterns>> = LazyLock::new(|| {
    SAFE_TAGS
        .iter()
        .map(|tag| SafeTagPatterns {
            wrap: Regex::new(&format!(r"(?is)<{tag}>(.*?)</{tag}>")).unwrap(),
            wrap_with: format!("__SAFE_TAG_{tag}_START__${{1}}__SAFE_TAG_{tag}_END__"),
            restore: Regex::new(&format!(
                r"(?s)__SAFE_TAG_{tag}_START__(.*?)__SAFE_TAG_{tag}_END__"
            ))
            .unwrap(),
            restore_with: format!("<{tag}>$1</{tag}>"),
        })
        .collect()
});

/// Validate email format.
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && EMAIL_RE.is_match(email)
}

/// Validate phone number format.
pub fn validate_phone_number(phone: &str) -> bool {
    !phone.is_empty() && PHONE_RE.is_match(phone)
}

/// Check that all required fields are present and non-empty.
///
/// Returns the list of missing field names; an empty list means valid.
pub fn missing_required_fields<'a>(fields: &[(&'a str, Option<&str>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, value)| value.is_none_or(|v| v.is_empty()))
        .map(|(name, _)| *name)
        .collect()
}

/// Sanitize input text to prevent markup injection.
///
/// Strips `<script>` blocks and all HTML tags except a small allow-list of
/// inline formatting tags, then truncates to 5000 characters and trims.
pub fn sanitize_input(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut sanitized = SCRIPT_RE.replace_all(text, "").into_owned();

    // Temporarily replace safe tags with markers so the generic tag strip
    // below does not remove them.
    for patterns in SAFE_TAG_PATTERNS.iter() {
        sanitized = patterns
            .wrap
            .replace_all(&sanitized, patterns.wrap_with.as_str())
            .into_owned();
    }

    sanitized = TAG_RE.replace_all(&sanitized, "").into_owned();

    for patterns in SAFE_TAG_PATTERNS.iter() {
        sanitized = patterns
            .restore
            .replace_all(&sanitized, patterns.restore_with.as_str())
            .into_owned();
    }

    if sanitized.chars().count() > MAX_TEXT_LENGTH {
        sanitized = sanitized.chars().take(MAX_TEXT_LENGTH).collect();
    }

    sanitized.trim().to_string()
}

/// Re-titlecase a name that was entered fully uppercase.
///
/// `"DOE"` becomes `"Doe"`, `"MARY JANE"` becomes `"Mary Jane"`. Mixed-case
/// names are left untouched.
pub fn normalize_name_case(name: &str) -> String {
    let has_letters = name.chars().any(|c| c.is_alphabetic());
    let all_upper = has_letters && !name.chars().any(|c| c.is_lowercase());
    if !all_upper {
        return name.to_string();
    }

    name.split_inclusive([' ', '-'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Minimum password length accepted anywhere in the system.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate password strength.
///
/// Requires at least 8 characters with one uppercase letter, one lowercase
/// letter, one digit and one special character. The error message names the
/// first missing class.
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Err("Password must contain at least one special character");
    }
    Ok(())
}
