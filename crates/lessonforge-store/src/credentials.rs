//! Password hashing and account field checks.

use crate::error::StoreError;

/// bcrypt cost used for new passwords.
pub use bcrypt::DEFAULT_COST;

/// Shortest password accepted at registration or on change.
pub const MIN_PASSWORD_LEN: usize = 6;

const MAX_USERNAME_LEN: usize = 64;

/// Public webmail providers; registration requires an organization address.
const PUBLIC_EMAIL_DOMAINS: &[&str] = &[
    "@gmail.", "@yahoo.", "@hotmail.", "@outlook.", "@aol.", "@icloud.", "@proton.", "@mail.",
    "@zoho.", "@yandex.", "@live.", "@msn.",
];

/// Hash `password` with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, StoreError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Check `password` against a stored bcrypt hash.
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("unreadable password hash: {e}");
            false
        }
    }
}

/// Usernames become part of stored records and log lines, so they are
/// limited to letters, digits, `_`, `-` and `.` (not leading).
pub fn validate_username(username: &str) -> Result<(), StoreError> {
    let invalid = || Err(StoreError::InvalidUsername(username.to_string()));

    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return invalid();
    }
    if username.starts_with('.') {
        return invalid();
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return invalid();
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), StoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StoreError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Accept only well-formed organization email addresses.
pub fn validate_email(email: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidEmail {
        email: email.to_string(),
        reason: reason.to_string(),
    };

    let email_lower = email.trim().to_lowercase();
    let Some((local, domain)) = email_lower.split_once('@') else {
        return Err(invalid("missing '@'"));
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(invalid("malformed address"));
    }
    if PUBLIC_EMAIL_DOMAINS
        .iter()
        .any(|public| email_lower.contains(public))
    {
        return Err(invalid("public email providers are not accepted"));
    }
    Ok(())
}
